use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::rules::{EvalFault, Evidence};
use crate::target::TargetMetadata;

/// Native evaluation logic for checks that cannot be written as a
/// declarative condition. Referenced from catalogs by name.
pub trait Probe: Send + Sync {
    /// Returns `Ok(true)` when the target is healthy. Facts worth showing
    /// in the result message go into `evidence`.
    fn evaluate(&self, meta: &TargetMetadata, evidence: &mut Evidence) -> Result<bool, EvalFault>;
}

impl<F> Probe for F
where
    F: Fn(&TargetMetadata, &mut Evidence) -> Result<bool, EvalFault> + Send + Sync,
{
    fn evaluate(&self, meta: &TargetMetadata, evidence: &mut Evidence) -> Result<bool, EvalFault> {
        self(meta, evidence)
    }
}

/// Named probes available to `probe` conditions.
#[derive(Clone, Default)]
pub struct ProbeRegistry {
    probes: BTreeMap<String, Arc<dyn Probe>>,
}

impl ProbeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, probe: impl Probe + 'static) -> &mut Self {
        self.probes.insert(name.into(), Arc::new(probe));
        self
    }

    pub fn get(&self, name: &str) -> Option<&dyn Probe> {
        self.probes.get(name).map(|p| p.as_ref())
    }
}

impl fmt::Debug for ProbeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.probes.keys()).finish()
    }
}
