//! Parameter compiler: one `ParamSpec` in, one configured [`ParameterDescriptor`] out.

use ipaschema_types::ParamSpec;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::{
    catalog::{self, BOOL_TYPE, ParamKind, STR_TYPE},
    default_from::{DefaultFrom, DefaultSource},
    error::CompileError,
};

/// A compiled input parameter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterDescriptor {
    pub name: String,
    pub kind: ParamKind,
    pub required: bool,
    pub multivalue: bool,
    pub no_convert: bool,
    /// Sensitive without being a password kind
    pub sensitive: bool,
    /// Value must be treated as a secret when displayed
    pub password: bool,
    /// Ask for the value twice (password kind only)
    pub confirm: bool,
    /// A default is available without prompting
    pub autofill: bool,
    pub alwaysask: bool,
    /// Converted static default; an array for multivalue parameters
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_from: Option<DefaultFrom>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cli_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cli_metavar: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub option_group: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclude: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl ParameterDescriptor {
    /// Whether the parameter is offered in `context` (e.g. `"cli"`).
    ///
    /// An `include` list wins over `exclude`; with neither, every context
    /// sees the parameter.
    pub fn use_in_context(&self, context: &str) -> bool {
        if let Some(include) = &self.include {
            return include.iter().any(|c| c == context);
        }
        if let Some(exclude) = &self.exclude {
            return !exclude.iter().any(|c| c == context);
        }
        true
    }

    /// Marks the value as secret regardless of kind.
    fn mark_password(&mut self) {
        self.password = true;
    }

    /// Converts a caller-supplied value, honouring `no_convert` and
    /// `multivalue`.
    pub fn convert(&self, raw: &Value) -> Result<Value, crate::error::ConversionError> {
        if self.no_convert {
            return Ok(raw.clone());
        }
        match raw {
            Value::Array(items) if self.multivalue => items
                .iter()
                .map(|item| self.kind.convert_scalar(item))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            _ if self.multivalue => Ok(Value::Array(vec![self.kind.convert_scalar(raw)?])),
            _ => self.kind.convert_scalar(raw),
        }
    }
}

/// Compiles one parameter spec.
///
/// Kind selection, first match wins:
/// 1. `str` + `sensitive` selects [`ParamKind::Password`]
/// 2. `bool` with a default of exactly `["False"]` selects [`ParamKind::Flag`]
///    and drops the default
/// 3. the catalog entry for the type, or [`ParamKind::Str`]
pub fn compile_param(source: &DefaultSource, spec: &ParamSpec) -> Result<ParameterDescriptor, CompileError> {
    let missing = |field: &str| CompileError::MissingField {
        entity: source.owner().to_string(),
        field: format!("params.{}.{field}", spec.name.as_deref().unwrap_or("?")),
    };
    let name = spec.name.clone().ok_or_else(|| missing("name"))?;
    let type_name = spec.r#type.as_deref().ok_or_else(|| missing("type"))?;

    let mut sensitive = spec.sensitive;
    let mut raw_default = spec.default.as_deref();
    let kind = if type_name == STR_TYPE && sensitive {
        sensitive = false;
        ParamKind::Password
    } else if type_name == BOOL_TYPE && raw_default.is_some_and(is_false_default) {
        raw_default = None;
        ParamKind::Flag
    } else {
        catalog::param_kind_or_str(type_name)
    };

    let mut descriptor = ParameterDescriptor {
        name,
        kind,
        required: spec.required.unwrap_or(true),
        multivalue: spec.multivalue,
        no_convert: spec.no_convert,
        sensitive,
        password: kind == ParamKind::Password,
        confirm: kind == ParamKind::Password && spec.confirm.unwrap_or(true),
        autofill: false,
        alwaysask: spec.alwaysask,
        default: None,
        default_from: None,
        cli_name: spec.cli_name.clone(),
        cli_metavar: spec.cli_metavar.clone(),
        option_group: spec.option_group.clone(),
        include: spec.include.clone(),
        exclude: spec.exclude.clone(),
        doc: spec.doc.clone(),
        label: spec.label.clone(),
    };

    if let Some(raw) = raw_default {
        descriptor.default = convert_default(kind, descriptor.multivalue, raw).map_err(|source_error| CompileError::InvalidDefault {
            entity: source.owner().to_string(),
            param: descriptor.name.clone(),
            source: source_error,
        })?;
    }

    if let Some(keys) = &spec.default_from_param {
        descriptor.default_from = Some(source.resolver(&descriptor.name, keys.clone()));
    }

    if descriptor.default.is_some() || descriptor.default_from.is_some() {
        descriptor.autofill = !spec.alwaysask;
    }

    if sensitive {
        descriptor.mark_password();
    }

    debug!(
        owner = %source.owner(),
        param = %descriptor.name,
        kind = ?descriptor.kind,
        autofill = descriptor.autofill,
        "compiled parameter"
    );
    Ok(descriptor)
}

fn is_false_default(raw: &[Value]) -> bool {
    matches!(raw, [Value::String(s)] if s == "False")
}

/// Applies the kind's scalar conversion to a raw schema default.
///
/// Conversion is applied even when the parameter is `no_convert`. An empty
/// list on a single-valued parameter means no default.
fn convert_default(kind: ParamKind, multivalue: bool, raw: &[Value]) -> Result<Option<Value>, crate::error::ConversionError> {
    if multivalue {
        let converted = raw.iter().map(|item| kind.convert_scalar(item)).collect::<Result<Vec<_>, _>>()?;
        return Ok(Some(Value::Array(converted)));
    }
    raw.first().map(|first| kind.convert_scalar(first)).transpose()
}
