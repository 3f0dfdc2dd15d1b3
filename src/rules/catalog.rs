//! Rule catalog loading.
//!
//! Catalogs are TOML documents with an optional `[ruleset]` header and any
//! number of `[[rule]]` tables:
//!
//! ```toml
//! [ruleset]
//! name = "baseline"
//! version = "1.2"
//!
//! [[rule]]
//! id = "MaxDopSet"
//! message = "MAXDOP is {max_dop}; set it to the number of cores per NUMA node"
//! help_link = "https://example.com/maxdop"
//! tags = ["Performance", "Configuration"]
//! level = "warning"
//! applies = { kinds = ["server"], min_version = "13.0" }
//! condition = { op = "fact_at_least", fact = "max_dop", value = 1 }
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use super::{Applicability, Check, Condition, Level};
use crate::error::{AssessError, Result};
use crate::target::{Target, TargetKind};

/// Where rule definitions come from.
#[derive(Debug, Clone)]
pub enum CatalogSource {
    File(PathBuf),
    /// Every `*.toml` below the directory, in path order.
    Directory(PathBuf),
    Inline { name: String, content: String },
}

impl CatalogSource {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        if path.is_dir() {
            Self::Directory(path)
        } else {
            Self::File(path)
        }
    }

    pub fn inline(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self::Inline {
            name: name.into(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RulesetInfo {
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct CatalogDocument {
    #[serde(default)]
    ruleset: Option<RulesetInfo>,
    #[serde(default)]
    rule: Vec<RuleDefinition>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RuleDefinition {
    id: String,
    #[serde(default)]
    display_name: Option<String>,
    message: String,
    #[serde(default)]
    help_link: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default = "default_level")]
    level: Level,
    #[serde(default = "default_enabled")]
    enabled: bool,
    #[serde(default)]
    applies: Applicability,
    condition: Condition,
}

fn default_level() -> Level {
    Level::Warning
}

fn default_enabled() -> bool {
    true
}

impl RuleDefinition {
    fn into_check(self, origin: &str) -> Result<Check> {
        let id = self.id.trim().to_owned();
        if id.is_empty() {
            return Err(AssessError::catalog(origin, None, "rule id must not be empty"));
        }
        let fail = |message: String| AssessError::catalog(origin, Some(id.as_str()), message);

        let tags: BTreeSet<String> = self.tags.iter().map(|t| t.trim().to_owned()).collect();
        if tags.is_empty() {
            return Err(fail("rule must have at least one tag".into()));
        }
        if tags.contains("") {
            return Err(fail("tags must not be empty strings".into()));
        }

        if let Some(link) = &self.help_link {
            url::Url::parse(link).map_err(|e| fail(format!("invalid help_link '{link}': {e}")))?;
        }

        if let (Some(min), Some(max)) = (self.applies.min_version, self.applies.max_version) {
            if min >= max {
                return Err(fail(format!("empty version range {min}..{max}")));
            }
        }

        self.condition.validate().map_err(fail)?;

        Ok(Check {
            display_name: self.display_name.unwrap_or_else(|| id.clone()),
            id,
            message: self.message,
            help_link: self.help_link,
            tags,
            level: self.level,
            applies: self.applies,
            condition: self.condition,
        })
    }
}

/// Parsed, validated checks keyed by identifier. Read-only once built and
/// safe to share between threads.
#[derive(Debug, Clone, Default)]
pub struct RuleCatalog {
    checks: BTreeMap<String, Arc<Check>>,
    ruleset: Option<RulesetInfo>,
}

impl RuleCatalog {
    /// Load every source in order. A check defined more than once keeps
    /// its last definition.
    pub fn load(sources: &[CatalogSource]) -> Result<Self> {
        let mut catalog = Self::default();
        for source in sources {
            match source {
                CatalogSource::File(path) => catalog.load_file(path)?,
                CatalogSource::Directory(dir) => {
                    for path in toml_files(dir)? {
                        catalog.load_file(&path)?;
                    }
                }
                CatalogSource::Inline { name, content } => catalog.load_document(name, content)?,
            }
        }

        tracing::info!(
            checks = catalog.checks.len(),
            ruleset = catalog.ruleset.as_ref().map(|r| r.name.as_str()).unwrap_or("-"),
            "rule catalog loaded"
        );
        Ok(catalog)
    }

    pub fn from_toml_str(name: &str, content: &str) -> Result<Self> {
        Self::load(&[CatalogSource::inline(name, content)])
    }

    /// Build a catalog from already constructed checks.
    pub fn from_checks(checks: impl IntoIterator<Item = Check>) -> Self {
        let mut catalog = Self::default();
        for check in checks {
            catalog.insert(check);
        }
        catalog
    }

    fn load_file(&mut self, path: &Path) -> Result<()> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            AssessError::catalog(path.display().to_string(), None, format!("cannot read: {e}"))
        })?;
        self.load_document(&path.display().to_string(), &content)
    }

    fn load_document(&mut self, origin: &str, content: &str) -> Result<()> {
        let doc: CatalogDocument = toml::from_str(content)
            .map_err(|e| AssessError::catalog(origin, None, e.to_string().trim_end()))?;

        if let Some(info) = doc.ruleset {
            self.ruleset = Some(info);
        }

        for def in doc.rule {
            if !def.enabled {
                tracing::debug!(check = %def.id, origin, "rule disabled in catalog");
                self.checks.remove(def.id.trim());
                continue;
            }
            let check = def.into_check(origin)?;
            self.insert(check);
        }
        Ok(())
    }

    fn insert(&mut self, check: Check) {
        if self.checks.contains_key(&check.id) {
            tracing::debug!(check = %check.id, "replacing earlier definition");
        }
        self.checks.insert(check.id.clone(), Arc::new(check));
    }

    pub fn len(&self) -> usize {
        self.checks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Arc<Check>> {
        self.checks.get(id)
    }

    /// All checks in identifier order.
    pub fn checks(&self) -> impl Iterator<Item = &Arc<Check>> {
        self.checks.values()
    }

    pub fn ruleset(&self) -> Option<&RulesetInfo> {
        self.ruleset.as_ref()
    }

    /// Union of tags over checks applicable to `kind`.
    pub fn tags_for(&self, kind: TargetKind) -> BTreeSet<String> {
        self.checks()
            .filter(|c| c.applies.matches_kind(kind))
            .flat_map(|c| c.tags.iter().cloned())
            .collect()
    }

    /// Union of tags over checks applicable to `target` (kind, version,
    /// platform and edition).
    pub fn tags_for_target(&self, target: &Target) -> BTreeSet<String> {
        self.checks()
            .filter(|c| c.applies_to(target))
            .flat_map(|c| c.tags.iter().cloned())
            .collect()
    }

    /// Rebuild the catalog with each check passed through `f`; `None` drops it.
    pub(crate) fn filter_map(&self, mut f: impl FnMut(&Check) -> Option<Check>) -> Self {
        let checks = self
            .checks
            .values()
            .filter_map(|c| f(c.as_ref()))
            .map(|c| (c.id.clone(), Arc::new(c)))
            .collect();
        Self {
            checks,
            ruleset: self.ruleset.clone(),
        }
    }
}

fn toml_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            AssessError::catalog(dir.display().to_string(), None, e.to_string())
        })?;
        if entry.file_type().is_file()
            && entry.path().extension().is_some_and(|ext| ext == "toml")
        {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}
