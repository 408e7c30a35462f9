//! Defaults computed by the server from other parameter values.
//!
//! A parameter declaring `default_from_param` gets a [`DefaultFrom`] resolver.
//! Each call is a fresh `command_defaults` round trip; nothing is memoized
//! because the dependency values change between invocations.

use std::{fmt, sync::Arc};

use ipaschema_api::{RemoteApi, RemoteError};
use serde::{Serialize, Serializer, ser::SerializeStruct};
use serde_json::{Map, Value};
use tracing::debug;

/// Hands out default resolvers for the parameters of one command or class.
#[derive(Clone)]
pub struct DefaultSource {
    remote: Arc<dyn RemoteApi>,
    owner: String,
}

impl fmt::Debug for DefaultSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefaultSource").field("owner", &self.owner).finish()
    }
}

impl DefaultSource {
    pub fn new(remote: Arc<dyn RemoteApi>, owner: impl Into<String>) -> Self {
        Self {
            remote,
            owner: owner.into(),
        }
    }

    /// Name of the command (or class) defaults are computed for.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Resolver for `param`, fed by the ordered dependency `keys`.
    pub fn resolver(&self, param: &str, keys: Vec<String>) -> DefaultFrom {
        DefaultFrom {
            remote: Arc::clone(&self.remote),
            command: self.owner.clone(),
            param: param.to_string(),
            keys,
        }
    }
}

/// Deferred server-side default for a single parameter.
#[derive(Clone)]
pub struct DefaultFrom {
    remote: Arc<dyn RemoteApi>,
    command: String,
    param: String,
    keys: Vec<String>,
}

impl DefaultFrom {
    /// Stable callback name, `<command>_<param>_default`.
    pub fn name(&self) -> String {
        format!("{}_{}_default", self.command, self.param)
    }

    /// Dependency parameter names, in call order.
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn param(&self) -> &str {
        &self.param
    }

    /// Asks the server for this parameter's default given the dependency
    /// values in [`keys`](Self::keys) order.
    ///
    /// Extra values beyond the number of keys are ignored. Returns `Ok(None)`
    /// when the server has no value for this parameter.
    pub fn call(&self, values: &[Value]) -> Result<Option<Value>, RemoteError> {
        let kw: Map<String, Value> = self.keys.iter().cloned().zip(values.iter().cloned()).collect();
        debug!(command = %self.command, param = %self.param, keys = ?self.keys, "computing default");
        let mut computed = self
            .remote
            .command_defaults(&self.command, std::slice::from_ref(&self.param), &kw)?;
        Ok(computed.remove(&self.param).filter(|value| !value.is_null()))
    }

    /// Like [`call`](Self::call), pulling dependency values out of `known`.
    ///
    /// When any dependency is unknown there is nothing to compute from, so no
    /// request is made and `Ok(None)` is returned.
    pub fn resolve(&self, known: &Map<String, Value>) -> Result<Option<Value>, RemoteError> {
        let mut values = Vec::with_capacity(self.keys.len());
        for key in &self.keys {
            match known.get(key) {
                Some(value) if !value.is_null() => values.push(value.clone()),
                _ => return Ok(None),
            }
        }
        self.call(&values)
    }
}

impl fmt::Debug for DefaultFrom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefaultFrom")
            .field("name", &self.name())
            .field("keys", &self.keys)
            .finish()
    }
}

/// Two resolvers are equal when they ask for the same thing.
impl PartialEq for DefaultFrom {
    fn eq(&self, other: &Self) -> bool {
        self.command == other.command && self.param == other.param && self.keys == other.keys
    }
}

impl Serialize for DefaultFrom {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("DefaultFrom", 2)?;
        state.serialize_field("name", &self.name())?;
        state.serialize_field("keys", &self.keys)?;
        state.end()
    }
}
