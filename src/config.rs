//! YAML configuration: rule overrides per dialect, fallback and consolidation
//! knobs, cleaning switches, and the cross-dialect alias table.
//!
//! Every field has a built-in default, so an absent config file and an empty
//! one behave the same. [`Config::validate`] runs before any input is opened.

use std::{collections::HashSet, fs::File, io::BufReader, path::Path};

use anyhow::{Context, Result as AnyResult};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    consolidate::FamilySpec,
    error::{NormalizeError, Result},
    reconcile::{AliasSpec, AliasTable},
    rules::{RuleSet, RuleSpec, builtin_rule_specs, is_canonical_token},
    synthesize::DEFAULT_TOKEN_CAP,
};

/// Survey year that ages are computed against unless a dialect overrides it.
pub const DEFAULT_AGE_REFERENCE_YEAR: i32 = 2021;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub fallback_token_cap: usize,
    pub consolidation_families: Vec<FamilySpec>,
    pub missing_tokens: Vec<String>,
    pub strip_non_ascii: bool,
    pub drop_empty: bool,
    pub dialects: Vec<DialectConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aliases: Option<Vec<AliasSpec>>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            fallback_token_cap: DEFAULT_TOKEN_CAP,
            consolidation_families: vec![
                FamilySpec::new("major_barrier", 3),
                FamilySpec::new("minor_barrier", 3),
                FamilySpec::new("barriers_major", 3),
                FamilySpec::new("barriers_minor", 3),
            ],
            missing_tokens: vec!["NA".to_string(), "N/A".to_string(), "nan".to_string()],
            strip_non_ascii: true,
            drop_empty: true,
            dialects: Vec::new(),
            aliases: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct DialectConfig {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age_reference_year: Option<i32>,
    /// Append the built-in table of the same name after `rules`.
    #[serde(default = "DialectConfig::default_inherit_builtin")]
    pub inherit_builtin: bool,
    #[serde(default)]
    pub rules: Vec<RuleSpec>,
}

impl DialectConfig {
    const fn default_inherit_builtin() -> bool {
        true
    }
}

/// A fully constructed dialect: validated rules plus derivation settings.
#[derive(Debug, Clone)]
pub struct Dialect {
    pub name: String,
    pub rules: RuleSet,
    pub age_reference_year: i32,
}

impl Config {
    pub fn load(path: &Path) -> AnyResult<Self> {
        let file = File::open(path).with_context(|| format!("Opening config file {path:?}"))?;
        let reader = BufReader::new(file);
        let config: Config =
            serde_yaml::from_reader(reader).context("Parsing configuration YAML")?;
        config
            .validate()
            .with_context(|| format!("Validating configuration {path:?}"))?;
        Ok(config)
    }

    pub fn load_or_default(path: Option<&Path>) -> AnyResult<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn to_yaml_string(&self) -> AnyResult<String> {
        serde_yaml::to_string(self).context("Serializing configuration to YAML")
    }

    pub fn validate(&self) -> Result<()> {
        if self.fallback_token_cap == 0 {
            return Err(NormalizeError::InvalidConfig(
                "fallback_token_cap must be at least 1".to_string(),
            ));
        }
        let mut families = HashSet::new();
        for family in &self.consolidation_families {
            if !is_canonical_token(&family.pattern) {
                return Err(NormalizeError::InvalidConfig(format!(
                    "consolidation family '{}' is not a canonical column name",
                    family.pattern
                )));
            }
            if family.max_slots == 0 {
                return Err(NormalizeError::InvalidConfig(format!(
                    "consolidation family '{}' needs max_slots of at least 1",
                    family.pattern
                )));
            }
            if !families.insert(family.pattern.as_str()) {
                return Err(NormalizeError::InvalidConfig(format!(
                    "consolidation family '{}' is listed twice",
                    family.pattern
                )));
            }
        }
        let mut names = HashSet::new();
        for dialect in &self.dialects {
            if dialect.name.trim().is_empty() {
                return Err(NormalizeError::InvalidConfig(
                    "dialect name cannot be empty".to_string(),
                ));
            }
            if !names.insert(dialect.name.as_str()) {
                return Err(NormalizeError::InvalidConfig(format!(
                    "dialect '{}' is configured twice",
                    dialect.name
                )));
            }
            // Surface malformed rules now rather than when a file arrives.
            self.dialect(&dialect.name)?;
        }
        self.alias_table()?;
        Ok(())
    }

    /// Builds the named dialect. Configured rules are evaluated before any
    /// inherited built-in rules.
    pub fn dialect(&self, name: &str) -> Result<Dialect> {
        let configured = self.dialects.iter().find(|dialect| dialect.name == name);
        let builtin = builtin_rule_specs(name);

        let (specs, age_reference_year) = match (configured, builtin) {
            (Some(config), builtin) => {
                let mut specs = config.rules.clone();
                if config.inherit_builtin
                    && let Some(builtin) = builtin
                {
                    specs.extend(builtin);
                }
                (specs, config.age_reference_year)
            }
            (None, Some(builtin)) => (builtin, None),
            (None, None) => return Err(NormalizeError::UnknownDialect(name.to_string())),
        };

        let rules = RuleSet::new(name, specs)?;
        debug!("Dialect '{name}' uses {} rule(s)", rules.len());
        Ok(Dialect {
            name: name.to_string(),
            rules,
            age_reference_year: age_reference_year.unwrap_or(DEFAULT_AGE_REFERENCE_YEAR),
        })
    }

    pub fn alias_table(&self) -> Result<AliasTable> {
        match &self.aliases {
            Some(entries) => AliasTable::new(entries.clone()),
            None => Ok(AliasTable::builtin()),
        }
    }
}
