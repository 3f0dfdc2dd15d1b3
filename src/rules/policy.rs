use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use super::{Level, RuleCatalog};

/// Local policy loaded from `.sqlassess.toml`: which checks to turn off
/// and which levels to change.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Policy {
    /// Check IDs that never run.
    #[serde(default)]
    pub disabled_checks: HashSet<String>,
    /// Per-check level overrides.
    #[serde(default)]
    pub overrides: HashMap<String, Level>,
}

impl Policy {
    pub fn is_empty(&self) -> bool {
        self.disabled_checks.is_empty() && self.overrides.is_empty()
    }

    /// Drop disabled checks and apply level overrides.
    pub fn apply(&self, catalog: &RuleCatalog) -> RuleCatalog {
        for id in self.disabled_checks.iter().chain(self.overrides.keys()) {
            if catalog.get(id).is_none() {
                tracing::warn!(check = %id, "policy references a check that is not in the catalog");
            }
        }

        catalog.filter_map(|check| {
            if self.disabled_checks.contains(&check.id) {
                return None;
            }
            let mut check = check.clone();
            if let Some(&level) = self.overrides.get(&check.id) {
                check.level = level;
            }
            Some(check)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOG: &str = r#"
[[rule]]
id = "TraceFlag1118"
message = "m"
tags = ["TempDB"]
level = "warning"
condition = { op = "fact_present", fact = "x" }

[[rule]]
id = "AutoShrink"
message = "m"
tags = ["Storage"]
level = "error"
condition = { op = "fact_present", fact = "x" }
"#;

    fn catalog() -> RuleCatalog {
        RuleCatalog::from_toml_str("policy-test", CATALOG).unwrap()
    }

    #[test]
    fn default_policy_keeps_everything() {
        let policy = Policy::default();
        assert!(policy.is_empty());
        let applied = policy.apply(&catalog());
        assert_eq!(applied.len(), 2);
        assert_eq!(applied.get("AutoShrink").unwrap().level, Level::Error);
    }

    #[test]
    fn disabled_check_is_removed() {
        let mut policy = Policy::default();
        policy.disabled_checks.insert("TraceFlag1118".into());
        let applied = policy.apply(&catalog());
        assert_eq!(applied.len(), 1);
        assert!(applied.get("TraceFlag1118").is_none());
    }

    #[test]
    fn override_changes_level() {
        let mut policy = Policy::default();
        policy
            .overrides
            .insert("AutoShrink".into(), Level::Information);
        let applied = policy.apply(&catalog());
        assert_eq!(applied.get("AutoShrink").unwrap().level, Level::Information);
    }

    #[test]
    fn unknown_ids_are_ignored() {
        let mut policy = Policy::default();
        policy.disabled_checks.insert("DoesNotExist".into());
        assert_eq!(policy.apply(&catalog()).len(), 2);
    }
}
