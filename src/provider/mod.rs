pub mod memory;
pub mod snapshot;

use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::RecvTimeoutError;

use crate::error::{AssessError, ConnectionError, Result};
use crate::target::{ServerProperties, Target, TargetHandle, TargetMetadata};

pub use memory::InMemorySource;
pub use snapshot::SnapshotSource;

/// A metadata source answers the one property query a run needs.
///
/// Implementations do the I/O (a SQL round-trip, a file read) and return
/// the raw row. Translation into a `Target` happens in `MetadataProvider`.
pub trait MetadataSource: Send + Sync {
    /// Short label used in logs.
    fn name(&self) -> &str;

    /// Fetch the property row for `handle`.
    fn query(&self, handle: &TargetHandle) -> std::result::Result<ServerProperties, ConnectionError>;
}

/// Fetches and translates target metadata with a bounded wait.
pub struct MetadataProvider {
    source: Arc<dyn MetadataSource>,
}

impl MetadataProvider {
    pub fn new(source: Arc<dyn MetadataSource>) -> Self {
        Self { source }
    }

    /// Fetch metadata for `handle`, giving up after `timeout`.
    ///
    /// The query runs on its own thread so a stuck source cannot hang the
    /// caller. A timed-out query is abandoned, not interrupted.
    pub fn fetch(&self, handle: &TargetHandle, timeout: Duration) -> Result<TargetMetadata> {
        let (tx, rx) = crossbeam_channel::bounded(1);
        let source = Arc::clone(&self.source);
        let query_handle = handle.clone();

        std::thread::Builder::new()
            .name("metadata-fetch".into())
            .spawn(move || {
                let _ = tx.send(source.query(&query_handle));
            })?;

        let connection_error = |error| AssessError::Connection {
            target: handle.to_string(),
            error,
        };

        let props = match rx.recv_timeout(timeout) {
            Ok(Ok(props)) => props,
            Ok(Err(ConnectionError::InvalidRow(reason))) => {
                return Err(AssessError::unsupported(handle.to_string(), reason))
            }
            Ok(Err(e)) => return Err(connection_error(e)),
            Err(RecvTimeoutError::Timeout) => {
                tracing::warn!(
                    server = %handle,
                    source = self.source.name(),
                    ?timeout,
                    "metadata query timed out"
                );
                return Err(connection_error(ConnectionError::Timeout(timeout)));
            }
            Err(RecvTimeoutError::Disconnected) => {
                return Err(connection_error(ConnectionError::Unreachable(
                    "metadata source stopped without answering".into(),
                )))
            }
        };

        let target = Target::from_properties(handle, &props)?;
        tracing::debug!(
            server = %target.name,
            version = %target.version,
            edition = %target.edition,
            platform = %target.platform,
            facts = props.facts.len(),
            "fetched target metadata"
        );

        Ok(TargetMetadata::new(target, props.facts))
    }
}
