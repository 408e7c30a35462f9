use std::path::Path;

use anyhow::{Context, Result};
use ipaschema_types::SchemaDocument;
use serde_json::{Map, Value};

use crate::{RemoteApi, RemoteError};

/// Serves a schema document without a server.
///
/// Useful for inspecting a saved schema. Default computation needs the server
/// and fails with [`RemoteError::Offline`].
#[derive(Debug, Clone)]
pub struct OfflineApi {
    document: SchemaDocument,
}

impl OfflineApi {
    pub fn new(document: SchemaDocument) -> Self {
        Self { document }
    }

    /// Loads a schema saved as JSON or YAML (chosen by file extension).
    ///
    /// Both the wire form (entry lists) and the keyed form are accepted.
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).with_context(|| format!("read schema file {}", path.display()))?;
        let is_yaml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));
        let raw: Value = if is_yaml {
            serde_yaml::from_str(&content).with_context(|| format!("parse YAML schema {}", path.display()))?
        } else {
            serde_json::from_str(&content).with_context(|| format!("parse JSON schema {}", path.display()))?
        };
        // Saved responses may still carry the JSON-RPC command output wrapper.
        let raw = match raw {
            Value::Object(mut map) if !map.contains_key("fingerprint") && map.contains_key("result") => map.remove("result").unwrap_or_default(),
            other => other,
        };
        let document = SchemaDocument::from_wire(raw).with_context(|| format!("decode schema {}", path.display()))?;
        Ok(Self::new(document))
    }
}

impl RemoteApi for OfflineApi {
    fn fetch_schema(&self) -> Result<SchemaDocument, RemoteError> {
        Ok(self.document.clone())
    }

    fn command_defaults(&self, _command: &str, _params: &[String], _kw: &Map<String, Value>) -> Result<Map<String, Value>, RemoteError> {
        Err(RemoteError::Offline {
            operation: "command_defaults".into(),
        })
    }
}
