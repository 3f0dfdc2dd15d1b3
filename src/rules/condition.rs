//! Declarative check conditions.
//!
//! A condition describes the healthy state of a target. It is a closed set
//! of variants deserialized straight from catalog documents, so evaluation
//! never inspects types at runtime beyond the JSON fact values themselves.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use thiserror::Error;

use crate::engine::ProbeRegistry;
use crate::target::{EngineEdition, TargetMetadata, Version};

/// Facts a check looked at, keyed by fact name. Ordered so rendered
/// results are identical across runs.
pub type Evidence = BTreeMap<String, String>;

/// Why a single check could not be evaluated.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EvalFault {
    #[error("fact '{0}' is not available for this target")]
    MissingFact(String),

    #[error("fact '{fact}' is not {expected}")]
    TypeMismatch { fact: String, expected: &'static str },

    #[error("no probe registered as '{0}'")]
    UnknownProbe(String),

    #[error("probe '{probe}' failed: {message}")]
    Probe { probe: String, message: String },

    #[error("check panicked: {0}")]
    Panicked(String),
}

/// A compiled regular expression that round-trips through serde as its
/// source text.
#[derive(Debug, Clone)]
pub struct Pattern(Regex);

impl Pattern {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Regex::new(pattern).map(Self)
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.0.is_match(text)
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Serialize for Pattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Pattern {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Pattern::new(&raw).map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Condition {
    VersionAtLeast { version: Version },
    VersionBelow { version: Version },
    EditionIn { editions: BTreeSet<EngineEdition> },
    PlatformIs { platform: String },
    FactEquals { fact: String, value: Value },
    FactAtLeast { fact: String, value: f64 },
    FactAtMost { fact: String, value: f64 },
    FactPresent { fact: String },
    FactMatches { fact: String, pattern: Pattern },
    All { conditions: Vec<Condition> },
    Any { conditions: Vec<Condition> },
    Not { condition: Box<Condition> },
    /// Delegate to a native evaluator registered under `name`.
    Probe { name: String },
}

impl Condition {
    /// Structural checks serde cannot express.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            Self::All { conditions } | Self::Any { conditions } => {
                if conditions.is_empty() {
                    return Err("'all'/'any' needs at least one condition".into());
                }
                conditions.iter().try_for_each(Condition::validate)
            }
            Self::Not { condition } => condition.validate(),
            Self::EditionIn { editions } if editions.is_empty() => {
                Err("'edition_in' needs at least one edition".into())
            }
            Self::FactEquals { fact, .. }
            | Self::FactAtLeast { fact, .. }
            | Self::FactAtMost { fact, .. }
            | Self::FactPresent { fact }
            | Self::FactMatches { fact, .. }
                if fact.trim().is_empty() =>
            {
                Err("fact name must not be empty".into())
            }
            Self::Probe { name } if name.trim().is_empty() => {
                Err("probe name must not be empty".into())
            }
            _ => Ok(()),
        }
    }

    /// Evaluate against `meta`. `Ok(true)` means the target is healthy.
    pub fn evaluate(
        &self,
        meta: &TargetMetadata,
        probes: &ProbeRegistry,
        evidence: &mut Evidence,
    ) -> Result<bool, EvalFault> {
        let target = &meta.target;
        match self {
            Self::VersionAtLeast { version } => {
                record(evidence, "version", target.version);
                record(evidence, "required_version", version);
                Ok(target.version >= *version)
            }
            Self::VersionBelow { version } => {
                record(evidence, "version", target.version);
                record(evidence, "version_limit", version);
                Ok(target.version < *version)
            }
            Self::EditionIn { editions } => {
                record(evidence, "edition", target.edition);
                Ok(editions.contains(&target.edition))
            }
            Self::PlatformIs { platform } => {
                record(evidence, "platform", &target.platform);
                Ok(target.platform.eq_ignore_ascii_case(platform))
            }
            Self::FactEquals { fact, value } => {
                let actual = lookup(meta, fact, evidence)?;
                record(evidence, &format!("expected_{fact}"), display_value(value));
                Ok(values_equal(&actual, value))
            }
            Self::FactAtLeast { fact, value } => {
                let actual = number(fact, &lookup(meta, fact, evidence)?)?;
                Ok(actual >= *value)
            }
            Self::FactAtMost { fact, value } => {
                let actual = number(fact, &lookup(meta, fact, evidence)?)?;
                Ok(actual <= *value)
            }
            Self::FactPresent { fact } => Ok(match meta.fact(fact) {
                Some(Value::Null) | None => false,
                Some(value) => {
                    record(evidence, fact, display_value(&value));
                    true
                }
            }),
            Self::FactMatches { fact, pattern } => match lookup(meta, fact, evidence)? {
                Value::String(text) => Ok(pattern.is_match(&text)),
                _ => Err(EvalFault::TypeMismatch {
                    fact: fact.clone(),
                    expected: "a string",
                }),
            },
            Self::All { conditions } => {
                for condition in conditions {
                    if !condition.evaluate(meta, probes, evidence)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Self::Any { conditions } => {
                for condition in conditions {
                    if condition.evaluate(meta, probes, evidence)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Self::Not { condition } => Ok(!condition.evaluate(meta, probes, evidence)?),
            Self::Probe { name } => {
                let probe = probes
                    .get(name)
                    .ok_or_else(|| EvalFault::UnknownProbe(name.clone()))?;
                probe.evaluate(meta, evidence)
            }
        }
    }
}

fn record(evidence: &mut Evidence, key: &str, value: impl fmt::Display) {
    evidence.insert(key.to_owned(), value.to_string());
}

fn lookup(meta: &TargetMetadata, fact: &str, evidence: &mut Evidence) -> Result<Value, EvalFault> {
    match meta.fact(fact) {
        Some(Value::Null) | None => Err(EvalFault::MissingFact(fact.to_owned())),
        Some(value) => {
            record(evidence, fact, display_value(&value));
            Ok(value)
        }
    }
}

fn number(fact: &str, value: &Value) -> Result<f64, EvalFault> {
    value.as_f64().ok_or_else(|| EvalFault::TypeMismatch {
        fact: fact.to_owned(),
        expected: "a number",
    })
}

/// Numbers compare by value so `4` equals `4.0`; everything else structurally.
fn values_equal(actual: &Value, expected: &Value) -> bool {
    match (actual.as_f64(), expected.as_f64()) {
        (Some(a), Some(b)) => a == b,
        _ => actual == expected,
    }
}

/// Render a fact value for messages: strings without quotes.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
