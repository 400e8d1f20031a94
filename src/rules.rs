//! Ordered header-matching rules, one [`RuleSet`] per survey dialect.
//!
//! A rule pairs a pattern with the canonical column name it produces. Patterns
//! are tested against the normalized header (see
//! [`normalize_header`](crate::resolve::normalize_header)) and the first rule
//! that matches wins, so the order of each table is part of its meaning:
//! qualified patterns such as `industry? (detailed)` must precede the generic
//! `industry` they contain.
//!
//! Built-in tables for the `2020` and `2021` remote-work surveys are declared
//! below as plain data. Configuration may extend or replace them; every table
//! passes through [`RuleSet::new`], which rejects malformed input before any
//! file is read.

use std::{collections::HashMap, fmt};

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::{
    error::{NormalizeError, Result},
    resolve::normalize_header,
};

pub const DIALECT_2020: &str = "2020";
pub const DIALECT_2021: &str = "2021";

/// Demographic and job questions asked with identical wording in both years.
/// `(detailed)` variants precede their generic forms.
const SHARED_PROFILE_RULES: &[(&str, &str)] = &[
    ("response id", "id"),
    ("worst aspect", "worst_aspect"),
    ("best aspect", "best_aspect"),
    ("work-life balance", "work_life_balance"),
    ("number of hours worked", "hours_worked"),
    ("year were you born", "birth_year"),
    ("gender", "gender"),
    ("industry? (detailed)", "ind_detail"),
    ("industry", "industry"),
    ("occupation? (detailed)", "occ_detail"),
    ("occupation", "occupation"),
    ("manage people", "manages_people"),
    ("household", "household"),
    ("employed by your organisation", "org_size"),
    ("long have you been in your current job", "tenure"),
    ("metro / regional", "location"),
    ("metro_or_regional", "location"),
];

/// Attitude, productivity and time-use questions shared by both years. The
/// activity rules sit after the dialect tables so a dialect can claim a more
/// specific phrasing first.
const SHARED_ATTITUDE_RULES: &[(&str, &str)] = &[
    ("encouraged people to work remotely", "org_encouraged"),
    ("well prepared for me to work remotely", "org_prepared"),
    ("common for people in my organisation", "org_common"),
    ("collaborate with colleagues", "collaboration"),
    ("easy to get permission", "permission"),
    ("prefer to work remotely", "pref_time_future"),
    ("encourage more remote working", "org_encourage_future"),
    ("changes to support remote working", "org_support_future"),
    ("choice about whether i work remotely", "choice_future"),
    ("prepare better for remote working", "org_prepared_future"),
    ("recommend remote working", "recommend"),
    ("productivity when you work remotely", "productivity"),
    ("preparing for work and commuting", "commute_time"),
    (
        "how many hours would you spend doing the following activities? - working",
        "work_time",
    ),
    ("personal and family time", "family_time"),
    ("caring and domestic responsibilities", "caring_time"),
    ("other activities", "other_time"),
    ("feel better", "feel_better"),
    ("more active", "more_active"),
];

/// 2020 survey: compares the previous calendar year with the last three months
/// and ranks barriers individually.
const RULES_2020: &[(&str, &str)] = &[
    ("preferred to work remotely last year", "pref_time_ly"),
    ("spend remote working last year", "time_ly"),
    ("preferred to work remotely in the last 3 months", "pref_time_3m"),
    ("remote working in the last 3 months", "time_3m"),
    ("most significant barrier", "major_barrier"),
    ("least significant barrier", "minor_barrier"),
];

/// 2021 survey: compares the last quarter of 2020 with the current year, adds
/// manager and policy questions, and ranks barriers as a group. Some exports
/// already carry snake_case headers for the policy block.
const RULES_2021: &[(&str, &str)] = &[
    (
        "preferred to work remotely during the last quarter",
        "pref_time_q4_2020",
    ),
    ("last quarter of last year", "time_q4_2020"),
    ("preferred to work remotely so far this year", "pref_time_2021"),
    ("spent working remotely this year", "time_rem_2021"),
    ("discretion to offer or deny", "mgmt_discretion"),
    ("retain employees", "mgmt_retain"),
    ("recruit employees", "mgmt_recruit"),
    ("team works well together", "team_collab"),
    ("easy to manage employees remotely", "mgmt_ease_remote"),
    ("manage poor performers remotely", "mgmt_poor_performers"),
    ("manage employees remotely", "mgmt_prepared_remote"),
    ("more focused on results", "mgmt_focus_results"),
    ("contact my employees", "mgmt_contact"),
    ("biggest barriers", "barriers_major"),
    ("smallest barriers", "barriers_minor"),
    ("policy_updated_covid", "policy_updated"),
    (
        "has_your_employer_changed_or_updated_their_policy",
        "policy_updated",
    ),
    ("hybrid_day_usage", "hybrid_usage"),
    ("worked_part_of_your_day_remotely", "hybrid_usage"),
    ("policy_required_office", "policy_office_required"),
    ("policy_office_required", "policy_office_required"),
    ("policy_suits_me", "policy_suits_me"),
    ("policy_choice_amount", "policy_choice_amount"),
    ("policy_choice_days", "policy_choice_days"),
    ("policy_mgr_discretion", "policy_mgr_discretion"),
    ("policy_sentiment", "policy_sentiment"),
    ("promotion_impact", "promotion_impact"),
    ("breaks_usage", "breaks_usage"),
    ("impact_on_employer", "impact_on_employer"),
    ("org_support_who", "org_support_who"),
    ("pay_cut_interest", "pay_cut_interest"),
    ("pay_cut_max", "pay_cut_max"),
    ("barrier_improved_", "barrier_improved"),
];

pub fn builtin_dialects() -> &'static [&'static str] {
    &[DIALECT_2020, DIALECT_2021]
}

/// Rule declarations for a built-in dialect, in evaluation order.
pub fn builtin_rule_specs(dialect: &str) -> Option<Vec<RuleSpec>> {
    let specific = match dialect {
        DIALECT_2020 => RULES_2020,
        DIALECT_2021 => RULES_2021,
        _ => return None,
    };
    Some(
        SHARED_PROFILE_RULES
            .iter()
            .chain(specific)
            .chain(SHARED_ATTITUDE_RULES)
            .map(|(pattern, name)| RuleSpec::substring(pattern, name))
            .collect(),
    )
}

/// Declarative form of a rule, as written in configuration files.
///
/// Exactly one of `pattern` (literal substring) or `regex` must be set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RuleSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regex: Option<String>,
    pub name: String,
}

impl RuleSpec {
    pub fn substring(pattern: &str, name: &str) -> Self {
        Self {
            pattern: Some(pattern.to_string()),
            regex: None,
            name: name.to_string(),
        }
    }

    pub fn regex(pattern: &str, name: &str) -> Self {
        Self {
            pattern: None,
            regex: Some(pattern.to_string()),
            name: name.to_string(),
        }
    }

    fn display_pattern(&self) -> String {
        match (&self.pattern, &self.regex) {
            (Some(p), _) => p.clone(),
            (None, Some(r)) => format!("/{r}/"),
            (None, None) => String::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum Pattern {
    /// Literal text, stored in normalized form.
    Substring(String),
    Regex(Regex),
}

impl Pattern {
    pub fn is_match(&self, normalized_header: &str) -> bool {
        match self {
            Pattern::Substring(needle) => normalized_header.contains(needle.as_str()),
            Pattern::Regex(regex) => regex.is_match(normalized_header),
        }
    }

    /// Identity used for duplicate detection across a table.
    fn key(&self) -> String {
        match self {
            Pattern::Substring(needle) => format!("s:{needle}"),
            Pattern::Regex(regex) => format!("r:{}", regex.as_str()),
        }
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pattern::Substring(needle) => write!(f, "{needle}"),
            Pattern::Regex(regex) => write!(f, "/{}/", regex.as_str()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MatchRule {
    pub pattern: Pattern,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct RuleSet {
    dialect: String,
    rules: Vec<MatchRule>,
}

impl RuleSet {
    /// Validates and compiles `specs` in order.
    ///
    /// Fails on an empty pattern, a spec with both or neither of
    /// `pattern`/`regex`, an invalid regex, a canonical name that is not a
    /// lowercase ASCII token, or two rules sharing a pattern but naming
    /// different columns.
    pub fn new<I>(dialect: &str, specs: I) -> Result<Self>
    where
        I: IntoIterator<Item = RuleSpec>,
    {
        let mut rules = Vec::new();
        let mut seen: HashMap<String, (usize, String)> = HashMap::new();

        for (idx, spec) in specs.into_iter().enumerate() {
            let position = idx + 1;
            let malformed = |reason: String| NormalizeError::MalformedRuleSet {
                dialect: dialect.to_string(),
                position,
                pattern: spec.display_pattern(),
                reason,
            };

            let pattern = match (&spec.pattern, &spec.regex) {
                (Some(_), Some(_)) => {
                    return Err(malformed(
                        "set either 'pattern' or 'regex', not both".to_string(),
                    ));
                }
                (None, None) => return Err(malformed("rule has no pattern".to_string())),
                (Some(text), None) => {
                    let normalized = normalize_header(text);
                    if normalized.is_empty() {
                        return Err(malformed("pattern is empty".to_string()));
                    }
                    Pattern::Substring(normalized)
                }
                (None, Some(source)) => {
                    if source.trim().is_empty() {
                        return Err(malformed("regex is empty".to_string()));
                    }
                    let regex = RegexBuilder::new(source)
                        .case_insensitive(true)
                        .build()
                        .map_err(|err| malformed(format!("invalid regex: {err}")))?;
                    Pattern::Regex(regex)
                }
            };

            if !is_canonical_token(&spec.name) {
                return Err(malformed(format!(
                    "canonical name '{}' must be a non-empty [a-z0-9_] token",
                    spec.name
                )));
            }

            let key = pattern.key();
            if let Some((first_position, first_name)) = seen.get(&key) {
                if *first_name != spec.name {
                    return Err(malformed(format!(
                        "pattern already maps to '{first_name}' at rule {first_position}; cannot also map to '{}'",
                        spec.name
                    )));
                }
            } else {
                seen.insert(key, (position, spec.name.clone()));
            }

            rules.push(MatchRule {
                pattern,
                name: spec.name.clone(),
            });
        }

        Ok(Self {
            dialect: dialect.to_string(),
            rules,
        })
    }

    pub fn builtin(dialect: &str) -> Result<Self> {
        let specs = builtin_rule_specs(dialect)
            .ok_or_else(|| NormalizeError::UnknownDialect(dialect.to_string()))?;
        Self::new(dialect, specs)
    }

    pub fn empty(dialect: &str) -> Self {
        Self {
            dialect: dialect.to_string(),
            rules: Vec::new(),
        }
    }

    pub fn dialect(&self) -> &str {
        &self.dialect
    }

    pub fn rules(&self) -> &[MatchRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// First matching rule and its zero-based position.
    pub fn first_match(&self, normalized_header: &str) -> Option<(usize, &MatchRule)> {
        self.rules
            .iter()
            .enumerate()
            .find(|(_, rule)| rule.pattern.is_match(normalized_header))
    }
}

pub(crate) fn is_canonical_token(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_tables_compile() {
        for dialect in builtin_dialects() {
            let rules = RuleSet::builtin(dialect).expect("builtin rule set");
            assert!(!rules.is_empty());
        }
    }

    #[test]
    fn unknown_builtin_dialect_is_rejected() {
        let err = RuleSet::builtin("1999").unwrap_err();
        assert!(matches!(err, NormalizeError::UnknownDialect(name) if name == "1999"));
    }

    #[test]
    fn empty_pattern_fails_at_construction() {
        let err = RuleSet::new("x", vec![RuleSpec::substring("   ", "blank")]).unwrap_err();
        assert!(matches!(
            err,
            NormalizeError::MalformedRuleSet { position: 1, .. }
        ));
    }

    #[test]
    fn conflicting_duplicate_pattern_fails() {
        let err = RuleSet::new(
            "x",
            vec![
                RuleSpec::substring("Industry", "industry"),
                RuleSpec::substring("industry", "sector"),
            ],
        )
        .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("rule 2"), "{message}");
        assert!(message.contains("'industry'"), "{message}");
    }

    #[test]
    fn repeated_pattern_with_same_name_is_accepted() {
        let rules = RuleSet::new(
            "x",
            vec![
                RuleSpec::substring("gender", "gender"),
                RuleSpec::substring("GENDER", "gender"),
            ],
        )
        .expect("same target is not a conflict");
        assert_eq!(rules.len(), 2);
    }

    #[test]
    fn invalid_regex_and_bad_names_fail() {
        assert!(RuleSet::new("x", vec![RuleSpec::regex("(", "paren")]).is_err());
        assert!(RuleSet::new("x", vec![RuleSpec::substring("age", "Age")]).is_err());
        assert!(RuleSet::new("x", vec![RuleSpec::substring("age", "")]).is_err());
    }

    #[test]
    fn regex_rules_are_case_insensitive() {
        let rules = RuleSet::new("x", vec![RuleSpec::regex(r"^Q\d+$", "question")]).unwrap();
        assert!(rules.first_match("q12").is_some());
        assert!(rules.first_match("q12 extra").is_none());
    }

    #[test]
    fn detailed_rules_precede_generic_rules() {
        for dialect in builtin_dialects() {
            let rules = RuleSet::builtin(dialect).unwrap();
            let position = |name: &str| {
                rules
                    .rules()
                    .iter()
                    .position(|rule| rule.name == name)
                    .unwrap()
            };
            assert!(position("ind_detail") < position("industry"));
            assert!(position("occ_detail") < position("occupation"));
        }
    }

    #[test]
    fn quarter_preference_is_not_captured_by_quarter_time() {
        let rules = RuleSet::builtin(DIALECT_2021).unwrap();
        let header = normalize_header(
            "How much of your time would you have preferred to work remotely during the last quarter of last year?",
        );
        let (_, rule) = rules.first_match(&header).unwrap();
        assert_eq!(rule.name, "pref_time_q4_2020");
    }

    #[test]
    fn specific_manager_rules_precede_generic_manager_rule() {
        let rules = RuleSet::builtin(DIALECT_2021).unwrap();
        let header = normalize_header("It is easy to manage employees remotely");
        assert_eq!(rules.first_match(&header).unwrap().1.name, "mgmt_ease_remote");
        let header = normalize_header("My organisation helped me manage employees remotely");
        assert_eq!(
            rules.first_match(&header).unwrap().1.name,
            "mgmt_prepared_remote"
        );
    }
}
