use std::path::{Path, PathBuf};

use crate::error::ConnectionError;
use crate::target::{ServerProperties, TargetHandle};

/// Snapshot source.
///
/// Reads the property row from a JSON document:
/// - the handle itself, when it names an existing file
/// - otherwise `<root>/<handle>.json`
/// - or `root` directly when it is a file
pub struct SnapshotSource {
    root: PathBuf,
}

impl SnapshotSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, handle: &TargetHandle) -> PathBuf {
        let direct = Path::new(handle.as_str());
        if direct.is_file() {
            return direct.to_path_buf();
        }
        if self.root.is_file() {
            return self.root.clone();
        }
        self.root.join(format!("{}.json", handle.as_str()))
    }
}

impl super::MetadataSource for SnapshotSource {
    fn name(&self) -> &str {
        "snapshot"
    }

    fn query(&self, handle: &TargetHandle) -> Result<ServerProperties, ConnectionError> {
        let path = self.resolve(handle);
        let content = std::fs::read_to_string(&path).map_err(|e| {
            ConnectionError::Unreachable(format!("cannot read {}: {e}", path.display()))
        })?;
        let row: serde_json::Value = serde_json::from_str(&content).map_err(|e| {
            ConnectionError::Unreachable(format!("malformed snapshot {}: {e}", path.display()))
        })?;
        serde_json::from_value(row).map_err(|e| {
            ConnectionError::InvalidRow(format!("{}: {e}", path.display()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::MetadataSource;

    const SNAPSHOT: &str = r#"{
        "version": "15.0.2000.5",
        "edition": 2,
        "name": "SQL01",
        "platform": "Linux",
        "facts": { "tempdb_files": 4 }
    }"#;

    #[test]
    fn reads_handle_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("SQL01.json"), SNAPSHOT).unwrap();

        let source = SnapshotSource::new(dir.path());
        let row = source.query(&TargetHandle::new("SQL01")).unwrap();
        assert_eq!(row.name, "SQL01");
        assert_eq!(row.edition, 2);
        assert_eq!(row.facts["tempdb_files"], serde_json::json!(4));
    }

    #[test]
    fn root_file_answers_any_handle() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("snapshot.json");
        std::fs::write(&file, SNAPSHOT).unwrap();

        let source = SnapshotSource::new(&file);
        assert!(source.query(&TargetHandle::new("whatever")).is_ok());
    }

    #[test]
    fn missing_snapshot_is_unreachable() {
        let dir = tempfile::tempdir().unwrap();
        let source = SnapshotSource::new(dir.path());
        let err = source.query(&TargetHandle::new("SQL02")).unwrap_err();
        assert!(matches!(err, ConnectionError::Unreachable(_)));
    }

    #[test]
    fn malformed_snapshot_is_unreachable() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("SQL01.json"), "{ not json").unwrap();
        let source = SnapshotSource::new(dir.path());
        let err = source.query(&TargetHandle::new("SQL01")).unwrap_err();
        assert!(err.to_string().contains("malformed snapshot"));
    }

    #[test]
    fn wrong_row_shape_is_invalid_row() {
        let dir = tempfile::tempdir().unwrap();
        let row = SNAPSHOT.replace("\"edition\": 2", "\"edition\": 1e40");
        std::fs::write(dir.path().join("SQL01.json"), row).unwrap();
        let source = SnapshotSource::new(dir.path());
        let err = source.query(&TargetHandle::new("SQL01")).unwrap_err();
        assert!(matches!(err, ConnectionError::InvalidRow(_)));
    }
}
