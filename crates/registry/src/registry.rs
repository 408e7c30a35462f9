//! Fingerprint-keyed cache of built namespaces.
//!
//! Each schema fingerprint is built at most once per registry. Concurrent
//! requests for the same fingerprint wait for the first build and then share
//! its result. Different fingerprints get independent namespaces that live
//! side by side, e.g. while a server is being upgraded.

use std::{
    collections::HashMap,
    fmt,
    sync::{Arc, Mutex},
};

use ipaschema_api::{RemoteApi, RemoteError};
use ipaschema_types::SchemaDocument;
use once_cell::sync::{Lazy, OnceCell};
use tracing::debug;

use crate::{error::RegistryError, namespace::Namespace};

/// A server connection together with its schema, fetched at most once.
pub struct Connection {
    remote: Arc<dyn RemoteApi>,
    schema: OnceCell<Arc<SchemaDocument>>,
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("fingerprint", &self.schema.get().map(|schema| schema.fingerprint.as_str()))
            .finish()
    }
}

impl Connection {
    pub fn new(remote: Arc<dyn RemoteApi>) -> Self {
        Self {
            remote,
            schema: OnceCell::new(),
        }
    }

    /// A connection whose schema is already known; no fetch will happen.
    pub fn with_schema(remote: Arc<dyn RemoteApi>, schema: SchemaDocument) -> Self {
        Self {
            remote,
            schema: OnceCell::with_value(Arc::new(schema)),
        }
    }

    pub fn remote(&self) -> &Arc<dyn RemoteApi> {
        &self.remote
    }

    /// The connection's schema, fetching it on first use.
    ///
    /// A failed fetch is not remembered; the next call tries again.
    pub fn schema(&self) -> Result<Arc<SchemaDocument>, RemoteError> {
        self.schema
            .get_or_try_init(|| self.remote.fetch_schema().map(Arc::new))
            .cloned()
    }
}

type NamespaceSlot = Arc<OnceCell<Arc<Namespace>>>;

static GLOBAL: Lazy<SchemaRegistry> = Lazy::new(SchemaRegistry::new);

/// Cache of namespaces keyed by schema fingerprint.
#[derive(Default)]
pub struct SchemaRegistry {
    slots: Mutex<HashMap<String, NamespaceSlot>>,
}

impl fmt::Debug for SchemaRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaRegistry")
            .field("fingerprints", &self.fingerprints())
            .finish()
    }
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide registry.
    pub fn global() -> &'static SchemaRegistry {
        &GLOBAL
    }

    /// Namespace for the connection's schema, building it if this
    /// fingerprint has not been seen yet.
    pub fn namespace(&self, connection: &Connection) -> Result<Arc<Namespace>, RegistryError> {
        let schema = connection.schema()?;
        self.get_or_build(&schema, connection.remote())
    }

    /// Returns the cached namespace for `document.fingerprint` or builds it.
    ///
    /// Only the first caller for a fingerprint builds; concurrent callers
    /// block until that build is published.
    ///
    /// # Arguments
    /// * `document` - The fetched schema; its fingerprint is the cache key
    /// * `remote` - The connection default resolvers are bound to
    ///
    /// # Returns
    /// The shared namespace for the fingerprint
    ///
    /// # Example
    /// ```rust
    /// use std::sync::Arc;
    ///
    /// use ipaschema_api::{OfflineApi, RemoteApi};
    /// use ipaschema_registry::SchemaRegistry;
    /// use ipaschema_types::SchemaDocument;
    ///
    /// let document = SchemaDocument { fingerprint: "v1".into(), ..Default::default() };
    /// let remote: Arc<dyn RemoteApi> = Arc::new(OfflineApi::new(document.clone()));
    /// let registry = SchemaRegistry::new();
    ///
    /// let first = registry.get_or_build(&document, &remote).unwrap();
    /// let second = registry.get_or_build(&document, &remote).unwrap();
    /// assert!(Arc::ptr_eq(&first, &second));
    /// ```
    pub fn get_or_build(&self, document: &SchemaDocument, remote: &Arc<dyn RemoteApi>) -> Result<Arc<Namespace>, RegistryError> {
        let slot = {
            let mut slots = self.slots.lock().map_err(|_| RegistryError::Poisoned)?;
            Arc::clone(slots.entry(document.fingerprint.clone()).or_default())
        };
        let mut built = false;
        let namespace = slot.get_or_init(|| {
            built = true;
            Arc::new(Namespace::build(document, remote))
        });
        if !built {
            debug!(fingerprint = %document.fingerprint, "namespace cache hit");
        }
        Ok(Arc::clone(namespace))
    }

    /// The namespace already built for `fingerprint`, if any.
    pub fn cached(&self, fingerprint: &str) -> Option<Arc<Namespace>> {
        let slots = self.slots.lock().ok()?;
        slots.get(fingerprint)?.get().cloned()
    }

    /// Fingerprints with a published namespace.
    pub fn fingerprints(&self) -> Vec<String> {
        let Ok(slots) = self.slots.lock() else {
            return Vec::new();
        };
        let mut fingerprints: Vec<String> = slots
            .iter()
            .filter(|(_, slot)| slot.get().is_some())
            .map(|(fingerprint, _)| fingerprint.clone())
            .collect();
        fingerprints.sort();
        fingerprints
    }
}
