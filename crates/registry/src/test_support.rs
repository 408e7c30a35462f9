//! Recording `RemoteApi` used by unit tests.

use std::sync::{
    Mutex,
    atomic::{AtomicUsize, Ordering},
};

use ipaschema_api::{RemoteApi, RemoteError};
use ipaschema_types::SchemaDocument;
use serde_json::{Map, Value};

#[derive(Debug, Clone)]
pub(crate) struct DefaultsCall {
    pub command: String,
    pub params: Vec<String>,
    pub kw: Map<String, Value>,
}

pub(crate) struct RecordingRemote {
    schema: Option<SchemaDocument>,
    defaults: Option<Map<String, Value>>,
    fetches: AtomicUsize,
    calls: Mutex<Vec<DefaultsCall>>,
}

impl RecordingRemote {
    pub fn with_defaults(defaults: Value) -> Self {
        Self {
            schema: None,
            defaults: defaults.as_object().cloned(),
            fetches: AtomicUsize::new(0),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_defaults() -> Self {
        Self {
            schema: None,
            defaults: None,
            fetches: AtomicUsize::new(0),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_schema(schema: SchemaDocument) -> Self {
        Self {
            schema: Some(schema),
            ..Self::with_defaults(Value::Object(Map::new()))
        }
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn default_calls(&self) -> Vec<DefaultsCall> {
        self.calls.lock().expect("calls lock").clone()
    }
}

impl RemoteApi for RecordingRemote {
    fn fetch_schema(&self) -> Result<SchemaDocument, RemoteError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.schema.clone().ok_or_else(|| RemoteError::Transport {
            message: "no schema configured".into(),
        })
    }

    fn command_defaults(&self, command: &str, params: &[String], kw: &Map<String, Value>) -> Result<Map<String, Value>, RemoteError> {
        self.calls.lock().expect("calls lock").push(DefaultsCall {
            command: command.to_string(),
            params: params.to_vec(),
            kw: kw.clone(),
        });
        let defaults = self.defaults.as_ref().ok_or_else(|| RemoteError::Transport {
            message: "connection refused".into(),
        })?;
        Ok(params
            .iter()
            .filter_map(|param| defaults.get(param).map(|value| (param.clone(), value.clone())))
            .collect())
    }
}
