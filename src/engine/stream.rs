use std::sync::Arc;

use super::{evaluate_check, ProbeRegistry};
use crate::rules::{AssessmentResult, Check};
use crate::target::TargetMetadata;

/// Lazy, sequential evaluation. Nothing runs until the iterator is
/// advanced; cloning or calling `restart` replays from the first check.
#[derive(Clone)]
pub struct ResultStream<'a> {
    checks: &'a [Arc<Check>],
    meta: &'a TargetMetadata,
    probes: &'a ProbeRegistry,
    next: usize,
}

impl<'a> ResultStream<'a> {
    pub(crate) fn new(
        checks: &'a [Arc<Check>],
        meta: &'a TargetMetadata,
        probes: &'a ProbeRegistry,
    ) -> Self {
        Self {
            checks,
            meta,
            probes,
            next: 0,
        }
    }

    pub fn restart(&mut self) {
        self.next = 0;
    }
}

impl Iterator for ResultStream<'_> {
    type Item = AssessmentResult;

    fn next(&mut self) -> Option<Self::Item> {
        let check = self.checks.get(self.next)?;
        self.next += 1;
        Some(evaluate_check(check, self.meta, self.probes))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.checks.len() - self.next;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for ResultStream<'_> {}
