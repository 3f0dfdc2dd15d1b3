//! The assessed object and the facts collected about it.
//!
//! Providers produce a `TargetMetadata`. The selector and the engine only
//! ever read it, so one snapshot can be shared by every check in a run.

pub mod version;

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{AssessError, Result};

pub use version::Version;

/// Connection target used to reach the object under assessment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TargetHandle(String);

impl TargetHandle {
    pub fn new(handle: impl Into<String>) -> Self {
        Self(handle.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TargetHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What kind of object is being assessed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    Server,
    Database,
    Instance,
}

impl TargetKind {
    pub fn from_str_lenient(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "server" => Some(Self::Server),
            "database" | "db" => Some(Self::Database),
            "instance" => Some(Self::Instance),
            _ => None,
        }
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Server => write!(f, "Server"),
            Self::Database => write!(f, "Database"),
            Self::Instance => write!(f, "Instance"),
        }
    }
}

/// Engine edition reported by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineEdition {
    PersonalOrDesktopEngine,
    Standard,
    Enterprise,
    Express,
    AzureDatabase,
    DataWarehouse,
    StretchDatabase,
    ManagedInstance,
}

impl EngineEdition {
    /// Translate a raw edition code. Unknown codes are rejected, never defaulted.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(Self::PersonalOrDesktopEngine),
            2 => Some(Self::Standard),
            3 => Some(Self::Enterprise),
            4 => Some(Self::Express),
            5 => Some(Self::AzureDatabase),
            6 => Some(Self::DataWarehouse),
            7 => Some(Self::StretchDatabase),
            8 => Some(Self::ManagedInstance),
            _ => None,
        }
    }

    pub fn code(self) -> i64 {
        match self {
            Self::PersonalOrDesktopEngine => 1,
            Self::Standard => 2,
            Self::Enterprise => 3,
            Self::Express => 4,
            Self::AzureDatabase => 5,
            Self::DataWarehouse => 6,
            Self::StretchDatabase => 7,
            Self::ManagedInstance => 8,
        }
    }
}

impl fmt::Display for EngineEdition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PersonalOrDesktopEngine => write!(f, "Personal/Desktop"),
            Self::Standard => write!(f, "Standard"),
            Self::Enterprise => write!(f, "Enterprise"),
            Self::Express => write!(f, "Express"),
            Self::AzureDatabase => write!(f, "Azure SQL Database"),
            Self::DataWarehouse => write!(f, "Data Warehouse"),
            Self::StretchDatabase => write!(f, "Stretch Database"),
            Self::ManagedInstance => write!(f, "Managed Instance"),
        }
    }
}

/// The object under assessment. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    pub kind: TargetKind,
    pub name: String,
    pub version: Version,
    /// Host platform, e.g. "Windows" or "Linux".
    pub platform: String,
    pub edition: EngineEdition,
    /// Handle the target was fetched through.
    pub handle: TargetHandle,
}

/// Raw property row as returned by a metadata source.
///
/// This is the untranslated shape: the edition is still a code and the
/// version still a string. `Target::from_properties` validates it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerProperties {
    pub version: String,
    pub edition: i64,
    pub name: String,
    pub platform: String,
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub facts: BTreeMap<String, Value>,
}

impl Target {
    /// Translate a raw property row. Fails fast on anything unrecognized.
    pub fn from_properties(handle: &TargetHandle, props: &ServerProperties) -> Result<Self> {
        let edition = EngineEdition::from_code(props.edition).ok_or_else(|| {
            AssessError::unsupported(
                &props.name,
                format!("unknown engine edition code {}", props.edition),
            )
        })?;

        let version = props
            .version
            .parse::<Version>()
            .map_err(|e| AssessError::unsupported(&props.name, e.to_string()))?;

        let kind = match props.kind.as_deref() {
            None => TargetKind::Server,
            Some(raw) => TargetKind::from_str_lenient(raw).ok_or_else(|| {
                AssessError::unsupported(&props.name, format!("unknown target kind '{raw}'"))
            })?,
        };

        Ok(Self {
            kind,
            name: props.name.clone(),
            version,
            platform: props.platform.clone(),
            edition,
            handle: handle.clone(),
        })
    }
}

/// A target plus the facts checks evaluate against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetMetadata {
    pub target: Target,
    #[serde(default)]
    pub facts: BTreeMap<String, Value>,
}

impl TargetMetadata {
    pub fn new(target: Target, facts: BTreeMap<String, Value>) -> Self {
        Self { target, facts }
    }

    /// Look up a fact. Built-in target attributes cannot be shadowed.
    pub fn fact(&self, name: &str) -> Option<Value> {
        let t = &self.target;
        match name {
            "name" => Some(Value::String(t.name.clone())),
            "version" => Some(Value::String(t.version.to_string())),
            "platform" => Some(Value::String(t.platform.clone())),
            "edition" => Some(Value::String(t.edition.to_string())),
            "kind" => Some(Value::String(t.kind.to_string())),
            _ => self.facts.get(name).cloned(),
        }
    }
}
