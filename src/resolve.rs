//! Header resolution: raw survey headers to unique canonical column names.
//!
//! One [`resolve`] call is one pass. Each header is normalized, matched against
//! the dialect's ordered [`RuleSet`] (first match wins), synthesized when no
//! rule applies, and finally de-duplicated by a [`CollisionTracker`] that lives
//! only for the duration of the pass. Output order always equals input order,
//! and suffixes are assigned in column order, so the second `industry` column
//! becomes `industry_2` regardless of how the rules were written.

use std::collections::{HashMap, HashSet};

use log::{info, warn};

use crate::{rules::RuleSet, synthesize::synthesize};

/// Lower-cases `header` and folds every whitespace run, embedded newlines
/// included, into a single space.
pub fn normalize_header(header: &str) -> String {
    header
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameOrigin {
    /// Matched the rule at `index` (zero-based) in the dialect table.
    Rule { index: usize, pattern: String },
    Fallback,
    /// Header was blank; the name encodes the 1-based column position.
    Positional,
}

impl NameOrigin {
    pub fn label(&self) -> String {
        match self {
            NameOrigin::Rule { index, .. } => format!("rule #{}", index + 1),
            NameOrigin::Fallback => "fallback".to_string(),
            NameOrigin::Positional => "positional".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedColumn {
    pub position: usize,
    pub raw: String,
    pub base: String,
    pub name: String,
    pub origin: NameOrigin,
}

impl ResolvedColumn {
    pub fn was_suffixed(&self) -> bool {
        self.base != self.name
    }
}

/// Tracks names handed out during a single resolution pass.
#[derive(Debug, Default)]
pub struct CollisionTracker {
    occurrences: HashMap<String, usize>,
    assigned: HashSet<String>,
}

impl CollisionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `base` on first use, otherwise `base_{n}` where `n` starts at
    /// the occurrence count plus one and skips names already taken.
    pub fn assign(&mut self, base: &str) -> String {
        let prior = self.occurrences.entry(base.to_string()).or_insert(0);
        *prior += 1;
        let name = if *prior == 1 && !self.assigned.contains(base) {
            base.to_string()
        } else {
            let mut n = (*prior).max(2);
            loop {
                let candidate = format!("{base}_{n}");
                if !self.assigned.contains(&candidate) {
                    break candidate;
                }
                n += 1;
            }
        };
        self.assigned.insert(name.clone());
        name
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub dialect: String,
    pub columns: Vec<ResolvedColumn>,
}

impl Resolution {
    pub fn names(&self) -> Vec<String> {
        self.columns.iter().map(|column| column.name.clone()).collect()
    }

    pub fn collisions(&self) -> impl Iterator<Item = &ResolvedColumn> {
        self.columns.iter().filter(|column| column.was_suffixed())
    }

    pub fn fallbacks(&self) -> impl Iterator<Item = &ResolvedColumn> {
        self.columns
            .iter()
            .filter(|column| !matches!(column.origin, NameOrigin::Rule { .. }))
    }

    /// Logs every suffixed and every synthesized name so the rule table can be
    /// audited and extended.
    pub fn log_audit(&self) {
        for column in self.collisions() {
            warn!(
                "[{}] column {} '{}' collided on '{}' and was renamed '{}'",
                self.dialect,
                column.position,
                printable_header(&column.raw),
                column.base,
                column.name
            );
        }
        for column in self.fallbacks() {
            warn!(
                "[{}] column {} '{}' matched no rule; using {} name '{}'",
                self.dialect,
                column.position,
                printable_header(&column.raw),
                column.origin.label(),
                column.name
            );
        }
        info!(
            "[{}] resolved {} header(s): {} by rule, {} synthesized, {} suffixed",
            self.dialect,
            self.columns.len(),
            self.columns.len() - self.fallbacks().count(),
            self.fallbacks().count(),
            self.collisions().count()
        );
    }
}

/// Resolves `headers` against `rules`; the result has one unique name per
/// header, in the same order.
pub fn resolve<S>(headers: &[S], rules: &RuleSet, token_cap: usize) -> Resolution
where
    S: AsRef<str>,
{
    let mut tracker = CollisionTracker::new();
    let columns = headers
        .iter()
        .enumerate()
        .map(|(idx, raw)| {
            let raw = raw.as_ref();
            let position = idx + 1;
            let normalized = normalize_header(raw);
            let (base, origin) = if normalized.is_empty() {
                (format!("column_{position}"), NameOrigin::Positional)
            } else if let Some((index, rule)) = rules.first_match(&normalized) {
                (
                    rule.name.clone(),
                    NameOrigin::Rule {
                        index,
                        pattern: rule.pattern.to_string(),
                    },
                )
            } else {
                (synthesize(&normalized, token_cap), NameOrigin::Fallback)
            };
            let name = tracker.assign(&base);
            ResolvedColumn {
                position,
                raw: raw.to_string(),
                base,
                name,
                origin,
            }
        })
        .collect();
    Resolution {
        dialect: rules.dialect().to_string(),
        columns,
    }
}

/// Single-line rendering of a raw header for logs and tables.
pub fn printable_header(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}
