use std::collections::HashSet;

use proptest::prelude::*;
use survey_normalize::{
    resolve::{NameOrigin, resolve},
    rules::{RuleSet, RuleSpec},
    synthesize::DEFAULT_TOKEN_CAP,
};

const CARING_HEADER: &str = "How many hours would you spend doing the following activities? - Caring and domestic responsibilities (please estimate)";

fn names(headers: &[&str], rules: &RuleSet) -> Vec<String> {
    resolve(headers, rules, DEFAULT_TOKEN_CAP).names()
}

#[test]
fn detailed_and_repeated_industry_headers() {
    let rules = RuleSet::builtin("2020").expect("builtin 2020 rules");
    let headers = ["Response ID", "Industry? (detailed)", "Industry", "Industry"];
    assert_eq!(
        names(&headers, &rules),
        vec!["id", "ind_detail", "industry", "industry_2"]
    );
}

#[test]
fn second_occurrence_in_column_order_gets_suffix() {
    // Both headers contain "industry", and the generic rule is listed first.
    let rules = RuleSet::new(
        "misordered",
        vec![
            RuleSpec::substring("industry", "industry"),
            RuleSpec::substring("industry (detailed)", "ind_detail"),
        ],
    )
    .unwrap();
    let resolution = resolve(&["Industry", "INDUSTRY (detailed)"], &rules, 4);
    assert_eq!(resolution.names(), vec!["industry", "industry_2"]);
    let suffixed: Vec<usize> = resolution.collisions().map(|c| c.position).collect();
    assert_eq!(suffixed, vec![2]);
}

#[test]
fn caring_header_without_rule_falls_back_to_capped_tokens() {
    let rules = RuleSet::empty("2020");
    let resolution = resolve(&[CARING_HEADER], &rules, 4);
    let column = &resolution.columns[0];
    assert_eq!(column.name, "how_many_hours_would");
    assert_eq!(column.origin, NameOrigin::Fallback);

    let wider = resolve(&[CARING_HEADER], &rules, 6).names();
    assert_eq!(wider, vec!["how_many_hours_would_you_spend"]);
}

#[test]
fn caring_header_with_builtin_rules_matches() {
    let rules = RuleSet::builtin("2021").unwrap();
    assert_eq!(names(&[CARING_HEADER], &rules), vec!["caring_time"]);
}

#[test]
fn improved_barrier_block_shares_one_base_name() {
    let rules = RuleSet::builtin("2021").unwrap();
    let headers = [
        "barrier_improved_connectivity",
        "barrier_improved_workspace",
        "Biggest barriers",
    ];
    let resolution = resolve(&headers, &rules, DEFAULT_TOKEN_CAP);
    assert_eq!(
        resolution.names(),
        vec!["barrier_improved", "barrier_improved_2", "barriers_major"]
    );
    assert!(matches!(
        resolution.columns[0].origin,
        NameOrigin::Rule { ref pattern, .. } if pattern == "barrier_improved_"
    ));

    let rules_2020 = RuleSet::builtin("2020").unwrap();
    assert_eq!(
        names(&["barrier_improved_connectivity"], &rules_2020),
        vec!["barrier_improved_connectivity"]
    );
}

#[test]
fn literal_suffix_header_does_not_clash() {
    let rules = RuleSet::empty("2020");
    let headers = ["x", "x_2", "x"];
    assert_eq!(names(&headers, &rules), vec!["x", "x_2", "x_3"]);
}

#[test]
fn blank_headers_get_positional_names() {
    let rules = RuleSet::builtin("2020").unwrap();
    let resolution = resolve(&["Gender", "  ", "", "Gender"], &rules, 4);
    assert_eq!(
        resolution.names(),
        vec!["gender", "column_2", "column_3", "gender_2"]
    );
    assert_eq!(resolution.columns[1].origin, NameOrigin::Positional);
}

#[test]
fn multiline_headers_normalize_before_matching() {
    let rules = RuleSet::builtin("2020").unwrap();
    let header = "What year were you\r\n   born?";
    assert_eq!(names(&[header], &rules), vec!["birth_year"]);
}

#[test]
fn rule_order_decides_overlapping_2021_questions() {
    let rules = RuleSet::builtin("2021").unwrap();
    let headers = [
        "How much of your time would you have preferred to work remotely during the last quarter of last year?",
        "Thinking about the last quarter of last year, how much of your time did you spend working remotely?",
        "My manager is able to manage poor performers remotely",
        "It is easy to manage employees remotely",
        "I am well prepared to manage employees remotely",
    ];
    assert_eq!(
        names(&headers, &rules),
        vec![
            "pref_time_q4_2020",
            "time_q4_2020",
            "mgmt_poor_performers",
            "mgmt_ease_remote",
            "mgmt_prepared_remote"
        ]
    );
}

fn header_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("Industry".to_string()),
        Just("Industry? (detailed)".to_string()),
        Just("Gender".to_string()),
        Just(String::new()),
        Just("x_2".to_string()),
        "[ -~]{0,40}",
        "\\PC{0,20}",
    ]
}

proptest! {
    #[test]
    fn resolution_is_deterministic_unique_and_ordered(
        headers in proptest::collection::vec(header_strategy(), 0..24),
        cap in 1usize..8,
    ) {
        let rules = RuleSet::builtin("2020").unwrap();
        let first = resolve(&headers, &rules, cap);
        let second = resolve(&headers, &rules, cap);
        prop_assert_eq!(&first, &second);

        let output = first.names();
        prop_assert_eq!(output.len(), headers.len());
        let unique: HashSet<&String> = output.iter().collect();
        prop_assert_eq!(unique.len(), output.len());

        for (idx, column) in first.columns.iter().enumerate() {
            prop_assert_eq!(column.position, idx + 1);
            prop_assert_eq!(&column.raw, &headers[idx]);
            prop_assert!(!column.name.is_empty());
        }
    }

    #[test]
    fn fallback_names_respect_token_cap(header in "[ -~]{1,80}", cap in 1usize..6) {
        let rules = RuleSet::empty("2020");
        let resolution = resolve(&[header.as_str()], &rules, cap);
        let column = &resolution.columns[0];
        if column.origin == NameOrigin::Fallback {
            prop_assert!(column.name.split('_').count() <= cap);
        }
    }
}
