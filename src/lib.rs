//! Rule-based health assessment for database servers.
//!
//! Fetches a metadata snapshot of a target, selects the catalog checks that
//! apply to it (optionally narrowed to categories), evaluates them in
//! isolation and collects the results into a report.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use sqlassess::provider::SnapshotSource;
//! use sqlassess::target::TargetHandle;
//! use sqlassess::{AssessOptions, Session};
//!
//! let options = AssessOptions {
//!     catalog_paths: vec!["rules".into()],
//!     ..Default::default()
//! };
//! let source = Arc::new(SnapshotSource::new("snapshots"));
//! let session = Session::open(&TargetHandle::new("SQL01"), source, &options).unwrap();
//! println!("categories: {:?}", session.categories());
//! let report = session.run(&[], &Default::default());
//! println!("{} results", report.total());
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod output;
pub mod provider;
pub mod report;
pub mod rules;
pub mod target;

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use config::Config;
use engine::{CancellationToken, EngineOptions, EvaluationEngine, ProbeRegistry};
use error::{AssessError, Result};
use output::OutputFormat;
use provider::{MetadataProvider, MetadataSource};
use report::{AssessmentReport, RunContext};
use rules::{selector, CatalogSource, Check, RuleCatalog};
use target::{Target, TargetHandle, TargetMetadata};

/// Options for an assessment session.
#[derive(Debug, Clone, Default)]
pub struct AssessOptions {
    /// Path to config file (defaults to `.sqlassess.toml` in the working directory).
    pub config_path: Option<PathBuf>,
    /// Rule files or directories. When non-empty, replaces the configured paths.
    pub catalog_paths: Vec<PathBuf>,
    /// CLI override for evaluation workers.
    pub concurrency: Option<usize>,
    /// CLI override for the metadata timeout.
    pub timeout: Option<Duration>,
    /// Native probes available to `probe` conditions.
    pub probes: ProbeRegistry,
}

/// One target, its metadata, and the catalog prepared for it.
///
/// Opening a session loads the catalog and fetches metadata; after that,
/// listing categories, selecting and running are pure functions of the
/// session's data and can be repeated.
pub struct Session {
    catalog: RuleCatalog,
    metadata: TargetMetadata,
    engine: EvaluationEngine,
}

impl Session {
    /// Load config and catalog, then fetch target metadata.
    ///
    /// The catalog is loaded first so a broken rule set fails before any
    /// connection is attempted.
    pub fn open(
        handle: &TargetHandle,
        source: Arc<dyn MetadataSource>,
        options: &AssessOptions,
    ) -> Result<Self> {
        let config_path = options
            .config_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(".sqlassess.toml"));
        let config = Config::load(&config_path)?;

        let catalog_paths = if options.catalog_paths.is_empty() {
            &config.catalog.paths
        } else {
            &options.catalog_paths
        };
        if catalog_paths.is_empty() {
            return Err(AssessError::catalog(
                config_path.display().to_string(),
                None,
                "no rule catalog configured",
            ));
        }
        let sources: Vec<CatalogSource> = catalog_paths
            .iter()
            .map(|p| CatalogSource::from_path(p.clone()))
            .collect();
        let catalog = config.policy.apply(&RuleCatalog::load(&sources)?);

        let timeout = options.timeout.unwrap_or_else(|| config.engine.timeout());
        let metadata = MetadataProvider::new(source).fetch(handle, timeout)?;

        let engine = EvaluationEngine::with_probes(
            EngineOptions {
                concurrency: options.concurrency.unwrap_or(config.engine.concurrency),
            },
            options.probes.clone(),
        )?;

        Ok(Self::from_parts(catalog, metadata, engine))
    }

    /// Assemble a session from already prepared parts.
    pub fn from_parts(catalog: RuleCatalog, metadata: TargetMetadata, engine: EvaluationEngine) -> Self {
        Self {
            catalog,
            metadata,
            engine,
        }
    }

    pub fn target(&self) -> &Target {
        &self.metadata.target
    }

    pub fn metadata(&self) -> &TargetMetadata {
        &self.metadata
    }

    pub fn catalog(&self) -> &RuleCatalog {
        &self.catalog
    }

    /// Categories offered for this target: tags of the applicable checks only.
    pub fn categories(&self) -> BTreeSet<String> {
        self.catalog.tags_for_target(self.target())
    }

    pub fn select(&self, categories: &[String]) -> Vec<Arc<Check>> {
        selector::select(&self.catalog, self.target(), Some(categories))
    }

    /// Select and evaluate. An empty `categories` slice runs every
    /// applicable check.
    pub fn run(&self, categories: &[String], cancel: &CancellationToken) -> AssessmentReport {
        let ctx = RunContext::start(
            self.target().clone(),
            self.catalog.ruleset().cloned(),
            categories.to_vec(),
        );
        let checks = self.select(categories);
        let evaluation = self.engine.run(&checks, &self.metadata, cancel);
        report::collect(ctx, evaluation.results, evaluation.partial)
    }
}

/// Open a session and run it once, non-interactively.
pub fn assess(
    handle: &TargetHandle,
    source: Arc<dyn MetadataSource>,
    options: &AssessOptions,
    categories: &[String],
) -> Result<AssessmentReport> {
    let session = Session::open(handle, source, options)?;
    Ok(session.run(categories, &CancellationToken::new()))
}

/// Render an assessment report in the specified format.
pub fn render_report(report: &AssessmentReport, format: OutputFormat) -> Result<String> {
    output::render(report, format)
}

#[cfg(test)]
mod integration_tests {
    use super::*;
    use provider::SnapshotSource;
    use rules::Status;

    fn options() -> AssessOptions {
        AssessOptions {
            config_path: Some(PathBuf::from("tests/fixtures/no-config.toml")),
            catalog_paths: vec![PathBuf::from("tests/fixtures/rules")],
            ..Default::default()
        }
    }

    fn source() -> Arc<dyn MetadataSource> {
        Arc::new(SnapshotSource::new("tests/fixtures/snapshots"))
    }

    #[test]
    fn windows_enterprise_categories_exclude_linux_checks() {
        let session = Session::open(&TargetHandle::new("SQL01"), source(), &options()).unwrap();
        let categories = session.categories();
        assert!(categories.contains("Security"));
        assert!(categories.contains("Performance"));
        assert!(!categories.contains("Linux"));
    }

    #[test]
    fn full_run_produces_one_result_per_applicable_check() {
        let session = Session::open(&TargetHandle::new("SQL01"), source(), &options()).unwrap();
        let applicable = session.select(&[]).len();
        let report = session.run(&[], &CancellationToken::new());
        assert_eq!(report.total(), applicable);
        assert!(!report.partial);
        assert!(report.results().any(|r| r.status == Status::Warning));
    }

    #[test]
    fn category_filter_limits_results() {
        let report = assess(
            &TargetHandle::new("SQL01"),
            source(),
            &options(),
            &["Security".to_string()],
        )
        .unwrap();
        assert!(report.total() > 0);
        assert_eq!(report.categories, vec!["Security".to_string()]);
        assert!(report.results().all(|r| r.check_id.starts_with("Security.")
            || r.check_id == "Storage.BackupEncryption"));
    }

    #[test]
    fn unknown_edition_stops_before_evaluation() {
        let err = Session::open(&TargetHandle::new("BADEDITION"), source(), &options())
            .err()
            .unwrap();
        assert!(matches!(err, AssessError::UnsupportedTarget { .. }));
    }

    #[test]
    fn missing_catalog_is_reported() {
        let mut opts = options();
        opts.catalog_paths.clear();
        let err = Session::open(&TargetHandle::new("SQL01"), source(), &opts)
            .err()
            .unwrap();
        assert_eq!(err.exit_code(), 5);
    }
}
