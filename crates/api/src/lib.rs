//! Transport boundary for the schema-driven client.
//!
//! The registry needs exactly two things from a server:
//!
//! - the schema document, fetched once per connection
//! - a "compute command defaults" call, made each time a parameter's default
//!   depends on the values of other parameters
//!
//! Both are expressed by the [`RemoteApi`] trait. [`JsonRpcClient`] speaks
//! JSON-RPC over HTTP to a live server; [`OfflineApi`] serves a schema from a
//! file and refuses remote default computation.
//!
//! # Example
//!
//! ```ignore
//! use ipaschema_api::{JsonRpcClient, RemoteApi};
//!
//! let client = JsonRpcClient::new("https://ipa.example.test", "2.170")?;
//! let schema = client.fetch_schema()?;
//! println!("fingerprint: {}", schema.fingerprint);
//! ```

pub mod client;
pub mod config;
pub mod offline;

pub use client::{JsonRpcClient, validate_server_url};
pub use config::{ClientConfig, DEFAULT_API_VERSION, default_config_path, expand_tilde};
pub use offline::OfflineApi;

use ipaschema_types::{SchemaDecodeError, SchemaDocument};
use serde_json::{Map, Value};
use thiserror::Error;

/// Failure of a remote call: the schema fetch or a default computation.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("transport error: {message}")]
    Transport { message: String },

    #[error("server answered with HTTP status {status}")]
    Http { status: u16 },

    #[error("server error {code} ({name}): {message}")]
    Server { code: i64, name: String, message: String },

    #[error("malformed response: {message}")]
    Decode { message: String },

    #[error("invalid server url '{url}': {reason}")]
    InvalidServer { url: String, reason: String },

    #[error("'{operation}' requires a live server connection")]
    Offline { operation: String },
}

impl From<reqwest::Error> for RemoteError {
    fn from(error: reqwest::Error) -> Self {
        match error.status() {
            Some(status) => RemoteError::Http { status: status.as_u16() },
            None => RemoteError::Transport { message: error.to_string() },
        }
    }
}

impl From<SchemaDecodeError> for RemoteError {
    fn from(error: SchemaDecodeError) -> Self {
        RemoteError::Decode { message: error.to_string() }
    }
}

/// Operations the registry consumes from a server connection.
pub trait RemoteApi: Send + Sync {
    /// Fetches the full schema document.
    fn fetch_schema(&self) -> Result<SchemaDocument, RemoteError>;

    /// Asks the server to compute defaults for `params` of `command`, given the
    /// parameter values already known in `kw`.
    ///
    /// The returned map only contains the requested parameters the server
    /// could compute a value for.
    fn command_defaults(&self, command: &str, params: &[String], kw: &Map<String, Value>) -> Result<Map<String, Value>, RemoteError>;
}
