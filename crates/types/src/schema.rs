use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// One snapshot of the remote API description.
///
/// Entries are keyed by name and kept in the order the server listed them.
/// The document is never mutated after it has been fetched; a new server
/// schema arrives with a new `fingerprint`.
///
/// Deserializing goes through [`SchemaDocument::from_wire`], so both the
/// wire form and the keyed form end up with every entry's `name` set.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "Value")]
pub struct SchemaDocument {
    /// Opaque identifier of this schema snapshot
    pub fingerprint: String,
    #[serde(default)]
    pub commands: IndexMap<String, CommandSpec>,
    #[serde(default)]
    pub classes: IndexMap<String, ClassSpec>,
    #[serde(default)]
    pub topics: IndexMap<String, TopicSpec>,
}

/// Declarative description of one remote command.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CommandSpec {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub doc: Option<String>,
    /// Topic this command is filed under (`topic_topic` on the wire)
    #[serde(default, rename = "topic_topic", alias = "topic")]
    pub topic: Option<String>,
    #[serde(default)]
    pub params: Vec<ParamSpec>,
    #[serde(default)]
    pub output: Vec<OutputSpec>,
    /// Object class the command operates on, for method commands
    #[serde(default)]
    pub obj_class: Option<String>,
    /// Method name on `obj_class`
    #[serde(default)]
    pub attr_name: Option<String>,
    /// Contexts the command is hidden from (e.g. `"cli"`)
    #[serde(default)]
    pub exclude: Option<Vec<String>>,
}

impl CommandSpec {
    /// Whether `context` appears in the command's exclude set.
    pub fn excludes(&self, context: &str) -> bool {
        self.exclude
            .as_ref()
            .is_some_and(|contexts| contexts.iter().any(|c| c == context))
    }
}

/// Declarative description of one input parameter.
///
/// `name` and `type` are mandatory for compilation but optional here so a
/// malformed entry can be reported against its owning command instead of
/// failing the whole document.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ParamSpec {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "type")]
    pub r#type: Option<String>,
    #[serde(default)]
    pub required: Option<bool>,
    #[serde(default)]
    pub multivalue: bool,
    #[serde(default)]
    pub positional: Option<bool>,
    #[serde(default)]
    pub sensitive: bool,
    #[serde(default)]
    pub alwaysask: bool,
    #[serde(default)]
    pub no_convert: bool,
    #[serde(default)]
    pub confirm: Option<bool>,
    /// Raw, unconverted default values
    #[serde(default, deserialize_with = "one_or_many")]
    pub default: Option<Vec<Value>>,
    /// Ordered names of the parameters the server derives this default from
    #[serde(default)]
    pub default_from_param: Option<Vec<String>>,
    #[serde(default)]
    pub cli_name: Option<String>,
    #[serde(default)]
    pub cli_metavar: Option<String>,
    #[serde(default)]
    pub option_group: Option<String>,
    #[serde(default)]
    pub include: Option<Vec<String>>,
    #[serde(default)]
    pub exclude: Option<Vec<String>>,
    #[serde(default)]
    pub doc: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
}

/// Declarative description of one command output.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OutputSpec {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "type")]
    pub r#type: Option<String>,
    #[serde(default)]
    pub multivalue: bool,
    /// Outputs are required unless the schema says otherwise
    #[serde(default = "default_true")]
    pub required: bool,
    #[serde(default)]
    pub no_display: bool,
    #[serde(default)]
    pub doc: Option<String>,
}

/// Declarative description of an object class.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ClassSpec {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub doc: Option<String>,
    #[serde(default, rename = "topic_topic", alias = "topic")]
    pub topic: Option<String>,
    #[serde(default)]
    pub params: Vec<ParamSpec>,
}

/// A documentation topic; topics may nest through `topic`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TopicSpec {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub doc: Option<String>,
    /// Parent topic (`topic_topic` on the wire)
    #[serde(default, rename = "topic_topic", alias = "topic")]
    pub topic: Option<String>,
}

fn default_true() -> bool {
    true
}

/// Accepts either a list of raw values or a single bare value.
fn one_or_many<'de, D>(deserializer: D) -> Result<Option<Vec<Value>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(Value::Null) => None,
        Some(Value::Array(items)) => Some(items),
        Some(other) => Some(vec![other]),
    })
}
