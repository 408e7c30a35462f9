use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use std::{env, fmt};

use ipaschema_types::SchemaDocument;
use reqwest::{Client, header};
use serde_json::{Map, Value, json};
use tokio::runtime::{Builder, Runtime};
use tracing::{debug, info};
use url::Url;

use crate::{RemoteApi, RemoteError};

/// Hostnames allowed to use plain HTTP.
const LOCALHOST_DOMAINS: &[&str] = &["localhost", "127.0.0.1"];

/// Path of the JSON-RPC endpoint relative to the server URL.
const JSON_RPC_PATH: &str = "/ipa/json";

/// Blocking JSON-RPC client for a live server.
///
/// Requests run on a private current-thread runtime so callers stay
/// synchronous; do not call it from inside another async runtime.
pub struct JsonRpcClient {
    server: String,
    endpoint: String,
    api_version: String,
    http: Client,
    runtime: Runtime,
    next_id: AtomicU64,
}

impl fmt::Debug for JsonRpcClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonRpcClient")
            .field("endpoint", &self.endpoint)
            .field("api_version", &self.api_version)
            .finish()
    }
}

impl JsonRpcClient {
    /// Creates a client for `server` (e.g. `https://ipa.example.test`).
    ///
    /// The URL is validated with [`validate_server_url`].
    pub fn new(server: &str, api_version: &str) -> Result<Self, RemoteError> {
        let server = server.trim_end_matches('/').to_string();
        validate_server_url(&server)?;

        let mut default_headers = header::HeaderMap::new();
        default_headers.insert(header::ACCEPT, header::HeaderValue::from_static("application/json"));
        let referer = header::HeaderValue::from_str(&format!("{server}/ipa")).map_err(|error| RemoteError::InvalidServer {
            url: server.clone(),
            reason: error.to_string(),
        })?;
        default_headers.insert(header::REFERER, referer);

        let http = Client::builder()
            .default_headers(default_headers)
            .user_agent(format!("ipaschema/{}; {}", env!("CARGO_PKG_VERSION"), env::consts::OS))
            .cookie_store(true)
            .timeout(Duration::from_secs(30))
            .build()?;
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|error| RemoteError::Transport { message: error.to_string() })?;

        Ok(Self {
            endpoint: format!("{server}{JSON_RPC_PATH}"),
            server,
            api_version: api_version.to_string(),
            http,
            runtime,
            next_id: AtomicU64::new(0),
        })
    }

    pub fn server(&self) -> &str {
        &self.server
    }

    /// Performs one JSON-RPC call and returns the command's `result` member.
    pub fn call(&self, method: &str, args: Vec<Value>, mut options: Map<String, Value>) -> Result<Value, RemoteError> {
        options
            .entry("version")
            .or_insert_with(|| Value::String(self.api_version.clone()));
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "method": method,
            "params": [args, options],
            "id": id,
        });
        debug!(%method, id, endpoint = %self.endpoint, "json-rpc request");

        let response: Value = self.runtime.block_on(async {
            let response = self.http.post(&self.endpoint).json(&body).send().await?;
            let response = response.error_for_status()?;
            response.json::<Value>().await
        })?;
        command_result(unwrap_envelope(response)?)
    }
}

impl RemoteApi for JsonRpcClient {
    fn fetch_schema(&self) -> Result<SchemaDocument, RemoteError> {
        let result = self.call("schema", Vec::new(), Map::new())?;
        let document = SchemaDocument::from_wire(result)?;
        info!(
            server = %self.server,
            fingerprint = %document.fingerprint,
            commands = document.commands.len(),
            classes = document.classes.len(),
            "fetched schema"
        );
        Ok(document)
    }

    fn command_defaults(&self, command: &str, params: &[String], kw: &Map<String, Value>) -> Result<Map<String, Value>, RemoteError> {
        let mut options = Map::new();
        options.insert("params".into(), Value::from(params.to_vec()));
        options.insert("kw".into(), Value::Object(kw.clone()));
        match self.call("command_defaults", vec![Value::String(command.to_string())], options)? {
            Value::Object(map) => Ok(map),
            Value::Null => Ok(Map::new()),
            other => Err(RemoteError::Decode {
                message: format!("command_defaults returned {other}"),
            }),
        }
    }
}

/// Splits a JSON-RPC response envelope into its result or its error.
fn unwrap_envelope(response: Value) -> Result<Value, RemoteError> {
    let Value::Object(mut envelope) = response else {
        return Err(RemoteError::Decode {
            message: "response is not a JSON object".into(),
        });
    };
    match envelope.remove("error") {
        None | Some(Value::Null) => {}
        Some(error) => {
            return Err(RemoteError::Server {
                code: error.get("code").and_then(Value::as_i64).unwrap_or_default(),
                name: error.get("name").and_then(Value::as_str).unwrap_or("UnknownError").to_string(),
                message: error.get("message").and_then(Value::as_str).unwrap_or_default().to_string(),
            });
        }
    }
    envelope.remove("result").ok_or_else(|| RemoteError::Decode {
        message: "response has neither result nor error".into(),
    })
}

/// Commands answer with an output dictionary; the payload sits under `result`.
fn command_result(output: Value) -> Result<Value, RemoteError> {
    match output {
        Value::Object(mut map) => map.remove("result").ok_or_else(|| RemoteError::Decode {
            message: "command output has no result member".into(),
        }),
        other => Err(RemoteError::Decode {
            message: format!("command output is not an object: {other}"),
        }),
    }
}

/// Validate that a server URL is acceptable.
///
/// Rules:
/// - `localhost` or `127.0.0.1`: any scheme is allowed
/// - otherwise: the scheme must be HTTPS
pub fn validate_server_url(server: &str) -> Result<(), RemoteError> {
    let invalid = |reason: String| RemoteError::InvalidServer {
        url: server.to_string(),
        reason,
    };
    let parsed = Url::parse(server).map_err(|error| invalid(error.to_string()))?;
    let host_name = parsed.host_str().ok_or_else(|| invalid("missing host".into()))?;

    if LOCALHOST_DOMAINS
        .iter()
        .any(|&allowed| host_name.eq_ignore_ascii_case(allowed))
    {
        return Ok(());
    }
    if parsed.scheme() != "https" {
        return Err(invalid(format!("non-localhost hosts must use https, got '{}://'", parsed.scheme())));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn localhost_may_use_http() {
        assert!(validate_server_url("http://localhost:8080").is_ok());
        assert!(validate_server_url("http://127.0.0.1").is_ok());
    }

    #[test]
    fn remote_hosts_require_https() {
        assert!(validate_server_url("https://ipa.example.test").is_ok());
        let err = validate_server_url("http://ipa.example.test").unwrap_err();
        assert!(matches!(err, RemoteError::InvalidServer { .. }));
        assert!(validate_server_url("not a url").is_err());
    }

    #[test]
    fn envelope_error_becomes_server_error() {
        let err = unwrap_envelope(json!({
            "result": null,
            "error": {"code": 2100, "name": "ACIError", "message": "denied"},
            "id": 0
        }))
        .unwrap_err();
        match err {
            RemoteError::Server { code, name, message } => {
                assert_eq!(code, 2100);
                assert_eq!(name, "ACIError");
                assert_eq!(message, "denied");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn client_owns_a_current_thread_runtime() {
        let client = JsonRpcClient::new("https://ipa.example.test/", "2.170").expect("client");
        assert_eq!(client.server(), "https://ipa.example.test");
        assert_eq!(client.runtime.block_on(async { 1 + 1 }), 2);
    }

    #[test]
    fn envelope_result_is_unwrapped_twice() {
        let output = unwrap_envelope(json!({
            "result": {"result": {"cn": "John Doe"}, "summary": null},
            "error": null,
            "id": 3
        }))
        .expect("envelope result");
        let result = command_result(output).expect("command result");
        assert_eq!(result, json!({"cn": "John Doe"}));
    }

    #[test]
    fn output_without_result_is_a_decode_error() {
        assert!(matches!(command_result(json!({"summary": "x"})), Err(RemoteError::Decode { .. })));
        assert!(matches!(unwrap_envelope(json!({"id": 1})), Err(RemoteError::Decode { .. })));
    }
}
