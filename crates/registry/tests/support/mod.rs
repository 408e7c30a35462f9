use std::sync::{
    Mutex,
    atomic::{AtomicUsize, Ordering},
};

use ipaschema_api::{RemoteApi, RemoteError};
use ipaschema_types::SchemaDocument;
use serde_json::{Map, Value};

pub fn load_fixture() -> SchemaDocument {
    let raw: Value = serde_json::from_str(include_str!("../data/schema_fixture.json")).expect("parse fixture");
    SchemaDocument::from_wire(raw["result"].clone()).expect("decode fixture")
}

/// Serves the fixture schema and answers `command_defaults` by joining the
/// known values with a space, the way the server fills `cn` from
/// `givenname` and `sn`.
#[derive(Default)]
pub struct FixtureServer {
    pub fetches: AtomicUsize,
    pub default_calls: Mutex<Vec<(String, Vec<String>, Map<String, Value>)>>,
}

impl FixtureServer {
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn default_call_count(&self) -> usize {
        self.default_calls.lock().expect("calls lock").len()
    }
}

impl RemoteApi for FixtureServer {
    fn fetch_schema(&self) -> Result<SchemaDocument, RemoteError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(load_fixture())
    }

    fn command_defaults(&self, command: &str, params: &[String], kw: &Map<String, Value>) -> Result<Map<String, Value>, RemoteError> {
        self.default_calls
            .lock()
            .expect("calls lock")
            .push((command.to_string(), params.to_vec(), kw.clone()));
        let joined = kw.values().filter_map(Value::as_str).collect::<Vec<_>>().join(" ");
        Ok(params.iter().map(|param| (param.clone(), Value::String(joined.clone()))).collect())
    }
}
