//! Output compilation and the supplemental failed-member fields.

use std::collections::HashSet;

use ipaschema_types::OutputSpec;
use once_cell::sync::Lazy;
use serde::Serialize;
use serde_json::Value;

use crate::{
    catalog::{self, ValueType},
    error::CompileError,
};

/// Runtime type of a compiled output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum OutputType {
    /// Unknown type name; anything is accepted
    Untyped,
    Scalar { value: ValueType, nullable: bool },
    /// Multivalue output: a list or tuple
    Sequence { nullable: bool },
}

impl OutputType {
    pub fn accepts(&self, value: &Value) -> bool {
        match *self {
            OutputType::Untyped => true,
            OutputType::Scalar { value: value_type, nullable } => (nullable && value.is_null()) || value_type.accepts(value),
            OutputType::Sequence { nullable } => (nullable && value.is_null()) || value.is_array(),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            OutputType::Untyped => "anything".into(),
            OutputType::Scalar { value, nullable: false } => format!("{value:?}"),
            OutputType::Scalar { value, nullable: true } => format!("{value:?} or null"),
            OutputType::Sequence { nullable: false } => "a sequence".into(),
            OutputType::Sequence { nullable: true } => "a sequence or null".into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFlag {
    NoDisplay,
    SuppressEmpty,
}

/// Where an output entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputOrigin {
    /// Declared by the server schema
    Declared,
    /// Added from the failed-member table for method commands
    FailedMember,
}

/// A compiled command output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputDescriptor {
    pub name: String,
    pub value_type: OutputType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub flags: Vec<OutputFlag>,
    pub origin: OutputOrigin,
}

impl OutputDescriptor {
    pub fn has_flag(&self, flag: OutputFlag) -> bool {
        self.flags.contains(&flag)
    }
}

/// Compiles one output spec owned by `command`.
pub fn compile_output(command: &str, spec: &OutputSpec) -> Result<OutputDescriptor, CompileError> {
    let missing = |field: &str| CompileError::MissingField {
        entity: command.to_string(),
        field: format!("output.{}.{field}", spec.name.as_deref().unwrap_or("?")),
    };
    let name = spec.name.clone().ok_or_else(|| missing("name"))?;
    let type_name = spec.r#type.as_deref().ok_or_else(|| missing("type"))?;

    let value_type = if spec.multivalue {
        OutputType::Sequence { nullable: !spec.required }
    } else {
        match catalog::value_type(type_name) {
            Some(value) => OutputType::Scalar {
                value,
                nullable: !spec.required,
            },
            None => OutputType::Untyped,
        }
    };

    Ok(OutputDescriptor {
        name,
        value_type,
        doc: spec.doc.clone(),
        label: None,
        flags: if spec.no_display { vec![OutputFlag::NoDisplay] } else { Vec::new() },
        origin: OutputOrigin::Declared,
    })
}

/// Fields reported by bulk membership operations (add/remove member and
/// friends) across object families: `(name, label, required)`.
const FAILED_MEMBER_FIELDS: &[(&str, &str, bool)] = &[
    ("member", "Failed members", true),
    ("sourcehost", "Failed source hosts/hostgroups", true),
    ("memberhost", "Failed hosts/hostgroups", true),
    ("memberuser", "Failed users/groups", true),
    ("memberservice", "Failed service/service groups", true),
    ("failed", "Failed to remove", true),
    ("ipasudorunas", "Failed RunAs", true),
    ("ipasudorunasgroup", "Failed RunAsGroup", true),
    ("ipamembercertprofile", "Failed profiles", true),
    ("ipamemberca", "Failed CAs", true),
    ("managedby", "Failed managedby", true),
    ("ipaallowedtoperform_read_keys", "Failed allowed to retrieve keytab", true),
    ("ipaallowedtoperform_write_keys", "Failed allowed to create keytab", true),
    ("failed_memberprincipal", "Failed members", true),
    ("ipaallowedtarget", "Failed targets", true),
    ("owner", "Failed owners", false),
];

static FAILED_MEMBER_OUTPUTS: Lazy<Vec<OutputDescriptor>> = Lazy::new(|| {
    FAILED_MEMBER_FIELDS
        .iter()
        .map(|&(name, label, required)| OutputDescriptor {
            name: name.to_string(),
            value_type: OutputType::Scalar {
                value: ValueType::Unicode,
                nullable: !required,
            },
            doc: None,
            label: Some(label.to_string()),
            flags: if name == "failed" { vec![OutputFlag::SuppressEmpty] } else { Vec::new() },
            origin: OutputOrigin::FailedMember,
        })
        .collect()
});

/// The supplemental failed-member outputs, in table order.
pub fn failed_member_outputs() -> &'static [OutputDescriptor] {
    &FAILED_MEMBER_OUTPUTS
}

/// Appends every failed-member field whose name is not already present.
///
/// Existing entries keep their position and content, so applying the merge
/// twice changes nothing.
pub fn merge_failed_members(outputs: &mut Vec<OutputDescriptor>) {
    let seen: HashSet<String> = outputs.iter().map(|output| output.name.clone()).collect();
    outputs.extend(
        failed_member_outputs()
            .iter()
            .filter(|output| !seen.contains(&output.name))
            .cloned(),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn spec(value: Value) -> OutputSpec {
        serde_json::from_value(value).expect("deserialize OutputSpec")
    }

    #[test]
    fn required_scalar_is_not_nullable() {
        let output = compile_output("user_add", &spec(json!({"name": "result", "type": "dict", "required": true}))).expect("compile");
        assert_eq!(
            output.value_type,
            OutputType::Scalar {
                value: ValueType::Dict,
                nullable: false
            }
        );
        assert!(output.value_type.accepts(&json!({})));
        assert!(!output.value_type.accepts(&Value::Null));
    }

    #[test]
    fn optional_scalar_accepts_null() {
        let output = compile_output("x", &spec(json!({"name": "summary", "type": "unicode", "required": false}))).expect("compile");
        assert!(output.value_type.accepts(&Value::Null));
        assert!(output.value_type.accepts(&json!("done")));
        assert!(!output.value_type.accepts(&json!(1)));
    }

    #[test]
    fn multivalue_is_a_sequence() {
        let output = compile_output("x", &spec(json!({"name": "result", "type": "dict", "multivalue": true}))).expect("compile");
        assert_eq!(output.value_type, OutputType::Sequence { nullable: false });
        let optional = compile_output(
            "x",
            &spec(json!({"name": "result", "type": "dict", "multivalue": true, "required": false})),
        )
        .expect("compile");
        assert_eq!(optional.value_type, OutputType::Sequence { nullable: true });
    }

    #[test]
    fn unknown_type_is_untyped_even_when_optional() {
        let output = compile_output("x", &spec(json!({"name": "value", "type": "PrimaryKey", "required": false}))).expect("compile");
        assert_eq!(output.value_type, OutputType::Untyped);
        assert!(output.value_type.accepts(&json!(42)));
    }

    #[test]
    fn no_display_sets_flag_and_doc_is_kept() {
        let output = compile_output(
            "x",
            &spec(json!({"name": "value", "type": "unicode", "no_display": true, "doc": "Primary key"})),
        )
        .expect("compile");
        assert!(output.has_flag(OutputFlag::NoDisplay));
        assert_eq!(output.doc.as_deref(), Some("Primary key"));
    }

    #[test]
    fn missing_type_is_an_error() {
        let err = compile_output("user_show", &spec(json!({"name": "result"}))).unwrap_err();
        assert_eq!(err.entity(), "user_show");
    }

    #[test]
    fn failed_member_table_shape() {
        let table = failed_member_outputs();
        assert_eq!(table.len(), 16);
        let owner = table.iter().find(|o| o.name == "owner").expect("owner present");
        assert!(owner.value_type.accepts(&Value::Null));
        let failed = table.iter().find(|o| o.name == "failed").expect("failed present");
        assert!(failed.has_flag(OutputFlag::SuppressEmpty));
        assert_eq!(failed.label.as_deref(), Some("Failed to remove"));
    }

    #[test]
    fn merge_keeps_declared_entry_and_is_idempotent() {
        let mut outputs = vec![
            compile_output("group_remove_member", &spec(json!({"name": "result", "type": "dict"}))).expect("compile"),
            compile_output("group_remove_member", &spec(json!({"name": "failed", "type": "dict", "doc": "server"}))).expect("compile"),
        ];
        merge_failed_members(&mut outputs);
        let failed: Vec<_> = outputs.iter().filter(|o| o.name == "failed").collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].origin, OutputOrigin::Declared);
        assert_eq!(failed[0].doc.as_deref(), Some("server"));
        assert_eq!(outputs[0].name, "result");
        assert_eq!(outputs[1].name, "failed");
        assert_eq!(outputs[2].name, "member");

        let once = outputs.clone();
        merge_failed_members(&mut outputs);
        assert_eq!(outputs, once);
        assert_eq!(outputs.len(), 2 + 15);
    }
}
