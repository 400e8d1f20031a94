//! Fallback column names for headers that no rule claims.
//!
//! The synthesized name is a truncation, not a summary: only the first
//! `token_cap` words survive. Two long headers sharing their opening words
//! therefore produce the same base name, and the resolver's collision suffixes
//! tell them apart.

use std::sync::OnceLock;

use regex::Regex;

pub const DEFAULT_TOKEN_CAP: usize = 4;

/// Base name for headers with no ASCII letters or digits at all.
pub const PLACEHOLDER_NAME: &str = "unnamed";

const SEPARATOR: char = '_';

fn parenthetical() -> &'static Regex {
    static PARENTHETICAL: OnceLock<Regex> = OnceLock::new();
    // Non-greedy and non-nested: "(a (b) c)" only loses "(a (b)".
    PARENTHETICAL.get_or_init(|| Regex::new(r"\([^)]*\)").expect("static regex compiles"))
}

/// Word tokens of `header` after parenthetical stripping, lower-cased, ASCII only.
pub fn header_tokens(header: &str) -> Vec<String> {
    let stripped = parenthetical().replace_all(header, " ");
    stripped
        .to_lowercase()
        .split(|ch: char| !ch.is_ascii_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

/// Derives a candidate canonical name for `header`, keeping at most
/// `token_cap` leading words (a cap of zero is treated as one).
pub fn synthesize(header: &str, token_cap: usize) -> String {
    let cap = token_cap.max(1);
    let tokens = header_tokens(header);
    if tokens.is_empty() {
        // Headers made only of a parenthetical still carry words worth keeping.
        let unwrapped = header.replace(['(', ')'], " ");
        let inner = header_tokens(&unwrapped);
        if inner.is_empty() {
            return PLACEHOLDER_NAME.to_string();
        }
        return join_tokens(&inner, cap);
    }
    join_tokens(&tokens, cap)
}

fn join_tokens(tokens: &[String], cap: usize) -> String {
    let mut name = String::new();
    for (idx, token) in tokens.iter().take(cap).enumerate() {
        if idx > 0 {
            name.push(SEPARATOR);
        }
        name.push_str(token);
    }
    name
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const CARING: &str = "How many hours would you spend doing the following activities? - Caring and domestic responsibilities (please estimate)";

    #[test]
    fn long_header_is_truncated_to_cap() {
        assert_eq!(synthesize(CARING, 4), "how_many_hours_would");
        assert_eq!(synthesize(CARING, 5), "how_many_hours_would_you");
    }

    #[test]
    fn parenthetical_content_is_removed() {
        assert_eq!(synthesize("Team size (approx.)", 4), "team_size");
        assert_eq!(synthesize("Hours (weekly) worked", 4), "hours_worked");
    }

    #[test]
    fn nested_parentheses_are_only_partially_stripped() {
        assert_eq!(synthesize("Rate (a (b) c) now", 4), "rate_c_now");
    }

    #[test]
    fn punctuation_newlines_and_non_ascii_become_separators() {
        assert_eq!(synthesize("  Work–life\r\nbalance?? ", 4), "work_life_balance");
        assert_eq!(synthesize("Café Owner", 4), "caf_owner");
    }

    #[test]
    fn symbol_only_headers_use_placeholder() {
        assert_eq!(synthesize("?!—", 4), PLACEHOLDER_NAME);
        assert_eq!(synthesize("", 4), PLACEHOLDER_NAME);
    }

    #[test]
    fn header_that_is_only_parenthetical_keeps_its_words() {
        assert_eq!(synthesize("(Optional comments)", 4), "optional_comments");
    }

    #[test]
    fn shared_prefix_headers_share_a_base_name() {
        let first = synthesize("How many hours would you spend working", 4);
        let second = synthesize("How many hours would you spend caring", 4);
        assert_eq!(first, second);
    }

    proptest! {
        #[test]
        fn alphanumeric_headers_never_synthesize_empty(
            header in "[ -~]{0,40}[A-Za-z0-9][ -~]{0,40}",
            cap in 1usize..8,
        ) {
            let name = synthesize(&header, cap);
            prop_assert!(!name.is_empty());
            prop_assert!(name.split('_').count() <= cap);
            prop_assert!(name.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_'));
        }
    }
}
