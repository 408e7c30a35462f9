//! Normalisation of the schema as the server sends it.
//!
//! The `schema` call returns `commands`, `classes` and `topics` as lists of
//! entries that each carry a `name`. Callers want them keyed by name, so the
//! lists are folded into ordered maps here. A malformed entry is dropped with
//! a warning; only a missing fingerprint rejects the whole document.

use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::warn;

use crate::schema::{ClassSpec, CommandSpec, SchemaDocument, TopicSpec};

/// Errors raised while decoding a schema document.
#[derive(Debug, Error)]
pub enum SchemaDecodeError {
    #[error("schema document is not a JSON object")]
    NotAnObject,

    #[error("schema document has no fingerprint")]
    MissingFingerprint,

    #[error("schema section '{section}' must be a list or a map")]
    InvalidSection { section: &'static str },
}

/// Entries that can be keyed by their own `name` field.
trait NamedEntry: DeserializeOwned {
    fn set_name(&mut self, name: String);
}

impl NamedEntry for CommandSpec {
    fn set_name(&mut self, name: String) {
        self.name = name;
    }
}

impl NamedEntry for ClassSpec {
    fn set_name(&mut self, name: String) {
        self.name = name;
    }
}

impl NamedEntry for TopicSpec {
    fn set_name(&mut self, name: String) {
        self.name = name;
    }
}

impl SchemaDocument {
    /// Builds a document from the raw `result` of the server's `schema` call.
    ///
    /// Sections may be given either in wire form (a list of entries with a
    /// `name`) or already keyed by name. A later duplicate name replaces an
    /// earlier one.
    pub fn from_wire(value: Value) -> Result<Self, SchemaDecodeError> {
        let Value::Object(mut root) = value else {
            return Err(SchemaDecodeError::NotAnObject);
        };
        let fingerprint = match root.remove("fingerprint") {
            Some(Value::String(s)) if !s.is_empty() => s,
            Some(Value::Number(n)) => n.to_string(),
            _ => return Err(SchemaDecodeError::MissingFingerprint),
        };

        Ok(SchemaDocument {
            commands: keyed_section(&mut root, "commands")?,
            classes: keyed_section(&mut root, "classes")?,
            topics: keyed_section(&mut root, "topics")?,
            fingerprint,
        })
    }
}

impl TryFrom<Value> for SchemaDocument {
    type Error = SchemaDecodeError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        SchemaDocument::from_wire(value)
    }
}

fn keyed_section<T: NamedEntry>(root: &mut Map<String, Value>, section: &'static str) -> Result<IndexMap<String, T>, SchemaDecodeError> {
    let entries: Vec<(Option<String>, Value)> = match root.remove(section) {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items.into_iter().map(|item| (None, item)).collect(),
        Some(Value::Object(map)) => map.into_iter().map(|(key, item)| (Some(key), item)).collect(),
        Some(_) => return Err(SchemaDecodeError::InvalidSection { section }),
    };

    let mut keyed = IndexMap::with_capacity(entries.len());
    for (position, (key, item)) in entries.into_iter().enumerate() {
        let name = item
            .get("name")
            .and_then(Value::as_str)
            .map(str::to_string)
            .or(key);
        let Some(name) = name else {
            warn!(section, position, "dropping schema entry without a name");
            continue;
        };
        match serde_json::from_value::<T>(item) {
            Ok(mut entry) => {
                entry.set_name(name.clone());
                keyed.insert(name, entry);
            }
            Err(error) => warn!(section, name = %name, %error, "dropping malformed schema entry"),
        }
    }
    Ok(keyed)
}
