//! Shared type definitions for the remote API schema.
//!
//! The server describes its API as data: commands, object classes and topics,
//! each with parameter and output shapes. This crate holds that description as
//! plain serde structs. Turning it into usable descriptors is the job of
//! `ipaschema-registry`.

pub mod schema;
pub mod wire;

pub use schema::{ClassSpec, CommandSpec, OutputSpec, ParamSpec, SchemaDocument, TopicSpec};
pub use wire::SchemaDecodeError;

/// Context name used by `exclude`/`include` lists for the command line.
pub const CLI_CONTEXT: &str = "cli";

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn wire_lists_are_keyed_by_name() {
        let doc = SchemaDocument::from_wire(json!({
            "fingerprint": "v1",
            "commands": [
                {"name": "user_add", "topic_topic": "user", "params": [], "output": []},
                {"name": "user_del", "params": [], "output": []}
            ],
            "classes": [{"name": "user", "params": []}],
            "topics": [{"name": "user", "doc": "Users"}]
        }))
        .expect("decode schema");

        assert_eq!(doc.fingerprint, "v1");
        let names: Vec<_> = doc.commands.keys().cloned().collect();
        assert_eq!(names, vec!["user_add", "user_del"]);
        assert_eq!(doc.commands["user_add"].topic.as_deref(), Some("user"));
        assert_eq!(doc.classes["user"].name, "user");
        assert_eq!(doc.topics["user"].doc.as_deref(), Some("Users"));
    }

    #[test]
    fn later_duplicate_replaces_earlier() {
        let doc = SchemaDocument::from_wire(json!({
            "fingerprint": "v1",
            "commands": [
                {"name": "ping", "doc": "first"},
                {"name": "ping", "doc": "second"}
            ]
        }))
        .expect("decode schema");
        assert_eq!(doc.commands.len(), 1);
        assert_eq!(doc.commands["ping"].doc.as_deref(), Some("second"));
    }

    #[test]
    fn nameless_and_malformed_entries_are_dropped() {
        let doc = SchemaDocument::from_wire(json!({
            "fingerprint": "v1",
            "commands": [
                {"doc": "no name"},
                {"name": "broken", "params": "not-a-list"},
                {"name": "ok"}
            ]
        }))
        .expect("decode schema");
        let names: Vec<_> = doc.commands.keys().cloned().collect();
        assert_eq!(names, vec!["ok"]);
    }

    #[test]
    fn missing_fingerprint_is_rejected() {
        let err = SchemaDocument::from_wire(json!({"commands": []})).unwrap_err();
        assert!(matches!(err, SchemaDecodeError::MissingFingerprint));
        assert!(matches!(
            SchemaDocument::from_wire(json!([])).unwrap_err(),
            SchemaDecodeError::NotAnObject
        ));
    }

    #[test]
    fn param_defaults_accept_bare_values() {
        let param: ParamSpec = serde_json::from_value(json!({
            "name": "flag",
            "type": "bool",
            "default": "False"
        }))
        .expect("deserialize ParamSpec");
        assert_eq!(param.default, Some(vec![json!("False")]));
        assert_eq!(param.required, None);
        assert_eq!(param.positional, None);
        assert!(!param.multivalue);
    }

    #[test]
    fn output_required_defaults_true() {
        let output: OutputSpec = serde_json::from_value(json!({"name": "result", "type": "dict"})).expect("deserialize OutputSpec");
        assert!(output.required);
        assert!(!output.no_display);
    }

    #[test]
    fn command_exclude_checks_context() {
        let spec: CommandSpec = serde_json::from_value(json!({"name": "x", "exclude": ["cli", "webui"]})).expect("deserialize CommandSpec");
        assert!(spec.excludes(CLI_CONTEXT));
        assert!(!spec.excludes("api"));
    }

    #[test]
    fn keyed_json_documents_take_names_from_keys() {
        let doc: SchemaDocument = serde_json::from_value(json!({
            "fingerprint": "v3",
            "commands": {"user_add": {"params": [{"name": "cn", "type": "str", "default_from_param": ["sn"]}]}}
        }))
        .expect("deserialize keyed schema");
        assert_eq!(doc.commands["user_add"].name, "user_add");
        assert!(serde_json::from_value::<SchemaDocument>(json!({"commands": {}})).is_err());
    }

    #[test]
    fn yaml_documents_deserialize_in_keyed_form() {
        let yaml = r#"
fingerprint: v9
commands:
  ping:
    doc: Ping the server
    output:
      - name: summary
        type: unicode
        required: false
classes:
  user:
    doc: Users
topics:
  user:
    doc: Users
"#;
        let doc: SchemaDocument = serde_yaml::from_str(yaml).expect("deserialize yaml schema");
        assert_eq!(doc.fingerprint, "v9");
        assert_eq!(doc.commands["ping"].name, "ping");
        assert_eq!(doc.classes["user"].name, "user");
        assert_eq!(doc.topics["user"].name, "user");
        assert_eq!(doc.commands["ping"].output.len(), 1);
        assert!(!doc.commands["ping"].output[0].required);
    }
}
