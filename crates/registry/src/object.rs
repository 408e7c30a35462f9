//! Object compiler: one class spec in, one [`ObjectDescriptor`] out.

use std::sync::Arc;

use ipaschema_api::RemoteApi;
use ipaschema_types::ClassSpec;
use serde::Serialize;
use tracing::debug;

use crate::{
    command::PLUGIN_VERSION,
    default_from::DefaultSource,
    error::CompileError,
    param::{ParameterDescriptor, compile_param},
};

/// A compiled object class.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectDescriptor {
    pub name: String,
    pub version: &'static str,
    pub full_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    pub params: Vec<ParameterDescriptor>,
}

impl ObjectDescriptor {
    pub fn param(&self, name: &str) -> Option<&ParameterDescriptor> {
        self.params.iter().find(|param| param.name == name)
    }
}

/// Compiles an object class; objects keep their parameters in one list.
pub fn compile_object(remote: &Arc<dyn RemoteApi>, spec: &ClassSpec) -> Result<ObjectDescriptor, CompileError> {
    let source = DefaultSource::new(Arc::clone(remote), spec.name.clone());
    let params = spec
        .params
        .iter()
        .map(|param_spec| compile_param(&source, param_spec))
        .collect::<Result<Vec<_>, _>>()?;

    debug!(object = %spec.name, params = params.len(), "compiled object");
    Ok(ObjectDescriptor {
        name: spec.name.clone(),
        version: PLUGIN_VERSION,
        full_name: format!("{}/{}", spec.name, PLUGIN_VERSION),
        doc: spec.doc.clone(),
        topic: spec.topic.clone(),
        params,
    })
}
