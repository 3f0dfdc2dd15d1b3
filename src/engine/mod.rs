//! Check evaluation.
//!
//! Every check runs inside its own fault boundary: evaluation errors and
//! panics become `Skipped` results, so one bad check never aborts a run.
//! Checks are independent and read the same immutable metadata, which lets
//! the engine fan them out over a bounded rayon pool.

pub mod cancel;
pub mod probe;
pub mod stream;
pub mod template;

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use rayon::prelude::*;

use crate::error::{AssessError, Result};
use crate::rules::{AssessmentResult, Check, EvalFault, Evidence, Status};
use crate::target::TargetMetadata;

pub use cancel::CancellationToken;
pub use probe::{Probe, ProbeRegistry};
pub use stream::ResultStream;

#[derive(Debug, Clone, Default)]
pub struct EngineOptions {
    /// Worker threads for evaluation. 0 means one per available core.
    pub concurrency: usize,
}

/// Results of one run. `partial` is set when cancellation stopped some
/// checks from starting; only completed results are included.
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub results: Vec<AssessmentResult>,
    pub partial: bool,
}

pub struct EvaluationEngine {
    probes: ProbeRegistry,
    pool: rayon::ThreadPool,
}

impl EvaluationEngine {
    pub fn new(options: EngineOptions) -> Result<Self> {
        Self::with_probes(options, ProbeRegistry::new())
    }

    pub fn with_probes(options: EngineOptions, probes: ProbeRegistry) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(options.concurrency)
            .thread_name(|i| format!("sqlassess-eval-{i}"))
            .build()
            .map_err(|e| AssessError::Internal(format!("cannot start evaluation pool: {e}")))?;
        Ok(Self { probes, pool })
    }

    pub fn probes(&self) -> &ProbeRegistry {
        &self.probes
    }

    pub fn concurrency(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Evaluate every check, one result per check, in input order.
    pub fn evaluate(&self, checks: &[Arc<Check>], meta: &TargetMetadata) -> Vec<AssessmentResult> {
        self.run(checks, meta, &CancellationToken::new()).results
    }

    /// Evaluate with cancellation. Once `cancel` fires no further checks
    /// start; checks already running finish and keep their results.
    pub fn run(
        &self,
        checks: &[Arc<Check>],
        meta: &TargetMetadata,
        cancel: &CancellationToken,
    ) -> Evaluation {
        tracing::info!(
            server = %meta.target.name,
            checks = checks.len(),
            workers = self.concurrency(),
            "evaluation started"
        );

        let slots: Vec<Option<AssessmentResult>> = self.pool.install(|| {
            checks
                .par_iter()
                .map(|check| {
                    if cancel.is_cancelled() {
                        return None;
                    }
                    Some(evaluate_check(check, meta, &self.probes))
                })
                .collect()
        });

        let partial = slots.iter().any(Option::is_none);
        let results: Vec<AssessmentResult> = slots.into_iter().flatten().collect();

        if partial {
            tracing::warn!(
                completed = results.len(),
                requested = checks.len(),
                "evaluation cancelled"
            );
        } else {
            tracing::info!(results = results.len(), "evaluation finished");
        }

        Evaluation { results, partial }
    }

    /// Lazily evaluate checks one at a time, in order. The stream can be
    /// cloned or restarted to replay the run.
    pub fn stream<'a>(
        &'a self,
        checks: &'a [Arc<Check>],
        meta: &'a TargetMetadata,
    ) -> ResultStream<'a> {
        ResultStream::new(checks, meta, &self.probes)
    }
}

/// Evaluate a single check inside a fault boundary.
pub fn evaluate_check(check: &Check, meta: &TargetMetadata, probes: &ProbeRegistry) -> AssessmentResult {
    let mut evidence = Evidence::new();
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        check.condition.evaluate(meta, probes, &mut evidence)
    }))
    .unwrap_or_else(|payload| Err(EvalFault::Panicked(panic_message(payload.as_ref()))));

    let (status, message, fault) = match outcome {
        Ok(true) => (Status::Pass, "No issues found".to_string(), None),
        Ok(false) => (
            Status::from(check.level),
            template::render(&check.message, &evidence, meta),
            None,
        ),
        Err(fault) => {
            tracing::warn!(check = %check.id, error = %fault, "check skipped");
            evidence.clear();
            (
                Status::Skipped,
                format!("Check skipped: {fault}"),
                Some(fault.to_string()),
            )
        }
    };

    AssessmentResult {
        check_id: check.id.clone(),
        display_name: check.display_name.clone(),
        target: meta.target.name.clone(),
        status,
        message,
        help_link: check.help_link.clone(),
        evidence,
        fault,
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
