//! Command compiler.

use std::{collections::HashSet, sync::Arc};

use heck::ToKebabCase;
use ipaschema_api::RemoteApi;
use ipaschema_types::{CLI_CONTEXT, CommandSpec};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::{
    catalog::ParamKind,
    default_from::DefaultSource,
    error::{CompileError, OutputError, RegistryError},
    output::{OutputDescriptor, OutputOrigin, compile_output, merge_failed_members},
    param::{ParameterDescriptor, compile_param},
};

/// Version every schema-built plugin reports.
pub const PLUGIN_VERSION: &str = "1";

/// Options the base command machinery may repeat; only the first is kept.
const STANDARD_FLAGS: &[&str] = &["all", "raw"];

/// Whether a command stands alone or operates on an object class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CommandShape {
    Plain,
    Method {
        #[serde(skip_serializing_if = "Option::is_none")]
        obj_name: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        attr_name: Option<String>,
    },
}

/// A compiled command.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommandDescriptor {
    pub name: String,
    pub version: &'static str,
    pub full_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    pub shape: CommandShape,
    /// Positional parameters, in declared order
    pub args: Vec<ParameterDescriptor>,
    /// Named parameters, in declared order
    pub options: Vec<ParameterDescriptor>,
    pub outputs: Vec<OutputDescriptor>,
    /// Hidden from the command line
    pub no_cli: bool,
}

impl CommandDescriptor {
    pub fn is_method(&self) -> bool {
        matches!(self.shape, CommandShape::Method { .. })
    }

    pub fn obj_name(&self) -> Option<&str> {
        match &self.shape {
            CommandShape::Method { obj_name, .. } => obj_name.as_deref(),
            CommandShape::Plain => None,
        }
    }

    pub fn attr_name(&self) -> Option<&str> {
        match &self.shape {
            CommandShape::Method { attr_name, .. } => attr_name.as_deref(),
            CommandShape::Plain => None,
        }
    }

    /// Command-line name: `user_add` becomes `user-add`.
    pub fn cli_name(&self) -> String {
        self.name.to_kebab_case()
    }

    /// Arguments followed by options.
    pub fn params(&self) -> impl Iterator<Item = &ParameterDescriptor> {
        self.args.iter().chain(self.options.iter())
    }

    pub fn param(&self, name: &str) -> Option<&ParameterDescriptor> {
        self.params().find(|param| param.name == name)
    }

    pub fn output(&self, name: &str) -> Option<&OutputDescriptor> {
        self.outputs.iter().find(|output| output.name == name)
    }

    /// Fills missing keyword values from static defaults and autofill
    /// resolvers, in parameter order.
    ///
    /// Flags absent from `kw` become `false`. Each resolver consulted costs
    /// one server round trip; a failing resolver aborts with an error naming
    /// the parameter and leaves the values filled so far in `kw`.
    pub fn fill_defaults(&self, kw: &mut Map<String, Value>) -> Result<(), RegistryError> {
        for param in self.params() {
            if kw.get(&param.name).is_some_and(|value| !value.is_null()) {
                continue;
            }
            if param.kind == ParamKind::Flag {
                kw.insert(param.name.clone(), Value::Bool(false));
                continue;
            }
            if let Some(default) = &param.default {
                kw.insert(param.name.clone(), default.clone());
                continue;
            }
            let Some(resolver) = param.default_from.as_ref().filter(|_| param.autofill) else {
                continue;
            };
            let computed = resolver.resolve(kw).map_err(|source| RegistryError::Default {
                param: param.name.clone(),
                source,
            })?;
            if let Some(value) = computed {
                kw.insert(param.name.clone(), value);
            }
        }
        Ok(())
    }

    /// Checks a command result against the compiled outputs.
    ///
    /// Every declared output must be present and no unknown member may
    /// appear; failed-member fields are optional.
    pub fn validate_output(&self, output: &Value) -> Result<(), OutputError> {
        let Value::Object(members) = output else {
            return Err(OutputError::NotAnObject {
                command: self.name.clone(),
            });
        };
        for descriptor in &self.outputs {
            match members.get(&descriptor.name) {
                None if descriptor.origin == OutputOrigin::Declared => {
                    return Err(OutputError::Missing {
                        command: self.name.clone(),
                        output: descriptor.name.clone(),
                    });
                }
                None => {}
                Some(value) if !descriptor.value_type.accepts(value) => {
                    return Err(OutputError::WrongType {
                        command: self.name.clone(),
                        output: descriptor.name.clone(),
                        expected: descriptor.value_type.describe(),
                    });
                }
                Some(_) => {}
            }
        }
        if let Some(unknown) = members.keys().find(|key| self.output(key).is_none()) {
            return Err(OutputError::Unexpected {
                command: self.name.clone(),
                output: unknown.clone(),
            });
        }
        Ok(())
    }
}

/// Compiles one command spec against the connection that will serve its
/// default computations.
///
/// # Arguments
/// * `remote` - The connection default resolvers are bound to
/// * `spec` - The command entry from the schema
///
/// # Returns
/// The command descriptor, or the first field that made the entry unusable
///
/// # Example
/// ```rust
/// use std::sync::Arc;
///
/// use ipaschema_api::{OfflineApi, RemoteApi};
/// use ipaschema_registry::compile_command;
/// use ipaschema_types::{CommandSpec, SchemaDocument};
/// use serde_json::json;
///
/// let remote: Arc<dyn RemoteApi> = Arc::new(OfflineApi::new(SchemaDocument::default()));
/// let spec: CommandSpec = serde_json::from_value(json!({
///     "name": "user_show",
///     "params": [{"name": "uid", "type": "str"}]
/// }))
/// .unwrap();
/// let command = compile_command(&remote, &spec).unwrap();
/// assert_eq!(command.full_name, "user_show/1");
/// assert_eq!(command.args[0].name, "uid");
/// ```
pub fn compile_command(remote: &Arc<dyn RemoteApi>, spec: &CommandSpec) -> Result<CommandDescriptor, CompileError> {
    let source = DefaultSource::new(Arc::clone(remote), spec.name.clone());

    let mut args = Vec::new();
    let mut options = Vec::new();
    for param_spec in &spec.params {
        let param = compile_param(&source, param_spec)?;
        let positional = param_spec.positional.unwrap_or(param_spec.required.unwrap_or(true));
        if positional {
            args.push(param);
        } else {
            options.push(param);
        }
    }
    let options = dedup_standard_flags(options);

    let shape = if spec.obj_class.is_some() || spec.attr_name.is_some() {
        CommandShape::Method {
            obj_name: spec.obj_class.clone(),
            attr_name: spec.attr_name.clone(),
        }
    } else {
        CommandShape::Plain
    };

    let mut outputs = spec
        .output
        .iter()
        .map(|output_spec| compile_output(&spec.name, output_spec))
        .collect::<Result<Vec<_>, _>>()?;
    if matches!(shape, CommandShape::Method { .. }) {
        merge_failed_members(&mut outputs);
    }

    let descriptor = CommandDescriptor {
        name: spec.name.clone(),
        version: PLUGIN_VERSION,
        full_name: format!("{}/{}", spec.name, PLUGIN_VERSION),
        doc: spec.doc.clone(),
        topic: spec.topic.clone(),
        shape,
        args,
        options,
        outputs,
        no_cli: spec.excludes(CLI_CONTEXT),
    };
    debug!(
        command = %descriptor.name,
        args = descriptor.args.len(),
        options = descriptor.options.len(),
        outputs = descriptor.outputs.len(),
        method = descriptor.is_method(),
        "compiled command"
    );
    Ok(descriptor)
}

/// Drops repeats of the standard `all`/`raw` flags, keeping the first of each.
fn dedup_standard_flags(options: Vec<ParameterDescriptor>) -> Vec<ParameterDescriptor> {
    let mut seen = HashSet::new();
    options
        .into_iter()
        .filter(|option| !STANDARD_FLAGS.contains(&option.name.as_str()) || seen.insert(option.name.clone()))
        .collect()
}
