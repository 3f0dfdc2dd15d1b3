use std::collections::HashMap;

use crate::error::ConnectionError;
use crate::target::{ServerProperties, TargetHandle};

/// Serves property rows registered up front. Used when the caller already
/// holds the metadata (embedding, tests).
#[derive(Debug, Default, Clone)]
pub struct InMemorySource {
    rows: HashMap<TargetHandle, ServerProperties>,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_target(mut self, handle: impl Into<String>, props: ServerProperties) -> Self {
        self.rows.insert(TargetHandle::new(handle), props);
        self
    }
}

impl super::MetadataSource for InMemorySource {
    fn name(&self) -> &str {
        "memory"
    }

    fn query(&self, handle: &TargetHandle) -> Result<ServerProperties, ConnectionError> {
        self.rows
            .get(handle)
            .cloned()
            .ok_or_else(|| ConnectionError::Unreachable(format!("no target registered as '{handle}'")))
    }
}
