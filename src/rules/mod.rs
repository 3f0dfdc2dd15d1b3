pub mod catalog;
pub mod condition;
pub mod policy;
pub mod result;
pub mod selector;

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::target::{EngineEdition, Target, TargetKind, Version};

pub use catalog::{CatalogSource, RuleCatalog, RulesetInfo};
pub use condition::{Condition, EvalFault, Evidence};
pub use result::{AssessmentResult, Status};

/// Level a failing check reports at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    #[serde(alias = "info")]
    Information,
    Warning,
    Error,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Information => write!(f, "information"),
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Which targets a check is relevant to. Empty sets match anything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Applicability {
    #[serde(default)]
    pub kinds: BTreeSet<TargetKind>,
    /// Inclusive lower bound.
    #[serde(default)]
    pub min_version: Option<Version>,
    /// Exclusive upper bound.
    #[serde(default)]
    pub max_version: Option<Version>,
    /// Host platforms, compared case-insensitively.
    #[serde(default)]
    pub platforms: Vec<String>,
    #[serde(default)]
    pub editions: BTreeSet<EngineEdition>,
}

impl Applicability {
    pub fn matches_kind(&self, kind: TargetKind) -> bool {
        self.kinds.is_empty() || self.kinds.contains(&kind)
    }

    pub fn matches(&self, target: &Target) -> bool {
        self.matches_kind(target.kind)
            && self.min_version.map_or(true, |min| target.version >= min)
            && self.max_version.map_or(true, |max| target.version < max)
            && (self.platforms.is_empty()
                || self
                    .platforms
                    .iter()
                    .any(|p| p.eq_ignore_ascii_case(&target.platform)))
            && (self.editions.is_empty() || self.editions.contains(&target.edition))
    }
}

/// A loaded check. Immutable once the catalog is built.
#[derive(Debug, Clone)]
pub struct Check {
    pub id: String,
    pub display_name: String,
    /// Message template shown when the condition does not hold.
    /// `{fact}` placeholders are filled from evidence and target facts.
    pub message: String,
    pub help_link: Option<String>,
    /// Never empty.
    pub tags: BTreeSet<String>,
    pub level: Level,
    pub applies: Applicability,
    /// What a healthy target looks like.
    pub condition: Condition,
}

impl Check {
    pub fn applies_to(&self, target: &Target) -> bool {
        self.applies.matches(target)
    }

    pub fn has_any_tag(&self, categories: &[String]) -> bool {
        categories.iter().any(|c| self.tags.contains(c))
    }
}

/// Summary of a check for `list-rules` output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckMetadata {
    pub id: String,
    pub display_name: String,
    pub level: Level,
    pub tags: BTreeSet<String>,
    pub help_link: Option<String>,
}

impl From<&Check> for CheckMetadata {
    fn from(check: &Check) -> Self {
        Self {
            id: check.id.clone(),
            display_name: check.display_name.clone(),
            level: check.level,
            tags: check.tags.clone(),
            help_link: check.help_link.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::TargetHandle;

    fn target(kind: TargetKind, version: &str, platform: &str) -> Target {
        Target {
            kind,
            name: "SQL01".into(),
            version: version.parse().unwrap(),
            platform: platform.into(),
            edition: EngineEdition::Standard,
            handle: TargetHandle::new("SQL01"),
        }
    }

    #[test]
    fn empty_applicability_matches_everything() {
        let any = Applicability::default();
        assert!(any.matches(&target(TargetKind::Server, "11.0", "Windows")));
        assert!(any.matches(&target(TargetKind::Database, "16.0", "Linux")));
    }

    #[test]
    fn version_range_is_half_open() {
        let applies = Applicability {
            min_version: Some("13.0".parse().unwrap()),
            max_version: Some("15.0".parse().unwrap()),
            ..Default::default()
        };
        assert!(!applies.matches(&target(TargetKind::Server, "12.0.6024.0", "Windows")));
        assert!(applies.matches(&target(TargetKind::Server, "13.0", "Windows")));
        assert!(applies.matches(&target(TargetKind::Server, "14.0.3000.1", "Windows")));
        assert!(!applies.matches(&target(TargetKind::Server, "15.0.2000.5", "Windows")));
    }

    #[test]
    fn platform_match_ignores_case() {
        let applies = Applicability {
            platforms: vec!["linux".into()],
            ..Default::default()
        };
        assert!(applies.matches(&target(TargetKind::Server, "15.0", "Linux")));
        assert!(!applies.matches(&target(TargetKind::Server, "15.0", "Windows")));
    }

    #[test]
    fn edition_and_kind_restrict() {
        let applies = Applicability {
            kinds: BTreeSet::from([TargetKind::Database]),
            editions: BTreeSet::from([EngineEdition::Enterprise]),
            ..Default::default()
        };
        let mut t = target(TargetKind::Database, "15.0", "Windows");
        assert!(!applies.matches(&t));
        t.edition = EngineEdition::Enterprise;
        assert!(applies.matches(&t));
        t.kind = TargetKind::Server;
        assert!(!applies.matches(&t));
    }
}
