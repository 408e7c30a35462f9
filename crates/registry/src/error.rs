//! Error types for schema compilation and registry access.

use ipaschema_api::RemoteError;
use serde_json::Value;
use thiserror::Error;

use crate::catalog::ParamKind;

/// Structural problem in one schema entity.
///
/// Compile errors are scoped to the command or class they were found in; the
/// namespace build records them and carries on with the remaining entities.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    #[error("{entity}: missing mandatory field '{field}'")]
    MissingField { entity: String, field: String },

    #[error("{entity}: invalid default for parameter '{param}': {source}")]
    InvalidDefault {
        entity: String,
        param: String,
        #[source]
        source: ConversionError,
    },
}

impl CompileError {
    /// Name of the command or class the error belongs to.
    pub fn entity(&self) -> &str {
        match self {
            CompileError::MissingField { entity, .. } | CompileError::InvalidDefault { entity, .. } => entity,
        }
    }
}

/// A raw value could not be converted by a parameter kind.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("cannot convert {value} to {kind:?}: {reason}")]
pub struct ConversionError {
    pub kind: ParamKind,
    pub value: Value,
    pub reason: String,
}

/// Output returned by the server does not match a command's declared outputs.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OutputError {
    #[error("{command}: output must be an object")]
    NotAnObject { command: String },

    #[error("{command}: missing output '{output}'")]
    Missing { command: String, output: String },

    #[error("{command}: unexpected output '{output}'")]
    Unexpected { command: String, output: String },

    #[error("{command}: output '{output}' has the wrong type, expected {expected}")]
    WrongType { command: String, output: String, expected: String },
}

/// Failures surfaced by the schema registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("failed to fetch schema: {0}")]
    Fetch(#[from] RemoteError),

    #[error("computing default for '{param}' failed: {source}")]
    Default {
        param: String,
        #[source]
        source: RemoteError,
    },

    #[error("schema registry lock poisoned")]
    Poisoned,
}
