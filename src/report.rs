use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::rules::{AssessmentResult, RulesetInfo, Status};
use crate::target::Target;

/// Read-only view over one run's results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssessmentReport {
    pub run_id: Uuid,
    pub target: Target,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ruleset: Option<RulesetInfo>,
    /// Categories the run was filtered to; empty means all.
    #[serde(default)]
    pub categories: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Set when cancellation stopped some checks from running.
    pub partial: bool,
    results: Vec<AssessmentResult>,
}

/// Report metadata gathered before evaluation starts.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub target: Target,
    pub ruleset: Option<RulesetInfo>,
    pub categories: Vec<String>,
    pub started_at: DateTime<Utc>,
}

impl RunContext {
    pub fn start(target: Target, ruleset: Option<RulesetInfo>, categories: Vec<String>) -> Self {
        Self {
            target,
            ruleset,
            categories,
            started_at: Utc::now(),
        }
    }
}

/// Assemble the report. Results are kept exactly as given.
pub fn collect(ctx: RunContext, results: Vec<AssessmentResult>, partial: bool) -> AssessmentReport {
    AssessmentReport {
        run_id: Uuid::new_v4(),
        target: ctx.target,
        ruleset: ctx.ruleset,
        categories: ctx.categories,
        started_at: ctx.started_at,
        finished_at: Utc::now(),
        partial,
        results,
    }
}

impl AssessmentReport {
    pub fn total(&self) -> usize {
        self.results.len()
    }

    /// Counts per status. Statuses with no results are omitted.
    pub fn counts_by_status(&self) -> BTreeMap<Status, usize> {
        let mut counts = BTreeMap::new();
        for result in &self.results {
            *counts.entry(result.status).or_insert(0) += 1;
        }
        counts
    }

    pub fn count(&self, status: Status) -> usize {
        self.results.iter().filter(|r| r.status == status).count()
    }

    /// Results in evaluation order. Each call starts a fresh pass.
    pub fn results(&self) -> std::slice::Iter<'_, AssessmentResult> {
        self.results.iter()
    }

    pub fn as_slice(&self) -> &[AssessmentResult] {
        &self.results
    }

    /// Results that need attention (anything but pass and skipped).
    pub fn issues(&self) -> impl Iterator<Item = &AssessmentResult> {
        self.results.iter().filter(|r| r.is_issue())
    }
}
