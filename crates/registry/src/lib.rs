//! Compiles a server-provided API schema into command and object descriptors.
//!
//! The schema is plain data ([`ipaschema_types::SchemaDocument`]). This crate
//! selects a parameter kind for every declared parameter, converts static
//! defaults, wires server-computed defaults, partitions arguments from
//! options, types outputs and groups everything by topic. The result is a
//! [`Namespace`], built once per schema fingerprint and cached in a
//! [`SchemaRegistry`].
//!
//! ```ignore
//! use std::sync::Arc;
//! use ipaschema_api::JsonRpcClient;
//! use ipaschema_registry::{Connection, SchemaRegistry};
//!
//! let client = JsonRpcClient::new("https://ipa.example.test", "2.170")?;
//! let connection = Connection::new(Arc::new(client));
//! let namespace = SchemaRegistry::global().namespace(&connection)?;
//! let user_add = namespace.command("user_add").expect("user_add exists");
//! ```

pub mod catalog;
pub mod clap_builder;
pub mod command;
pub mod default_from;
pub mod error;
pub mod namespace;
pub mod object;
pub mod output;
pub mod param;
pub mod registry;
pub mod topic;

#[cfg(test)]
mod test_support;

pub use catalog::{ParamKind, ValueType};
pub use clap_builder::{build_clap, build_command_clap, collect_values};
pub use command::{CommandDescriptor, CommandShape, PLUGIN_VERSION, compile_command};
pub use default_from::{DefaultFrom, DefaultSource};
pub use error::{CompileError, ConversionError, OutputError, RegistryError};
pub use namespace::{Descriptor, Namespace};
pub use object::{ObjectDescriptor, compile_object};
pub use output::{OutputDescriptor, OutputFlag, OutputOrigin, OutputType, failed_member_outputs};
pub use param::{ParameterDescriptor, compile_param};
pub use registry::{Connection, SchemaRegistry};
pub use topic::{TopicIndex, TopicMembers, TopicNode};
