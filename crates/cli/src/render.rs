//! Text and JSON rendering for the inspection subcommands.

use std::{collections::HashSet, fmt::Write};

use anyhow::Result;
use ipaschema_registry::{CommandDescriptor, Namespace, ObjectDescriptor, ParameterDescriptor, TopicIndex};
use serde_json::{Map, Value};

const REDACTED: &str = "********";

/// Command names per topic, topics in schema order. Hidden commands and empty
/// groups are left out.
pub fn command_list(namespace: &Namespace) -> String {
    let mut out = String::new();
    for (topic, members) in namespace.names_by_topic() {
        let commands: Vec<&CommandDescriptor> = members
            .commands
            .iter()
            .filter_map(|name| namespace.command(name))
            .filter(|command| !command.no_cli)
            .collect();
        if commands.is_empty() {
            continue;
        }
        let heading = match topic {
            Some(name) => match namespace.topics().node(name).and_then(|node| node.doc.as_deref()) {
                Some(doc) => format!("{name}: {}", summary(doc)),
                None => name.to_string(),
            },
            None => "(no topic)".to_string(),
        };
        let _ = writeln!(out, "{heading}");
        let width = commands.iter().map(|command| command.cli_name().len()).max().unwrap_or(0);
        for command in commands {
            let doc = command.doc.as_deref().map(summary).unwrap_or_default();
            let _ = writeln!(out, "  {:<width$}  {doc}", command.cli_name());
        }
    }
    out
}

/// Declared topics as an indented tree.
pub fn topic_tree(topics: &TopicIndex) -> String {
    let mut out = String::new();
    let mut visited = HashSet::new();
    for root in topics.roots() {
        write_topic(&mut out, topics, &root.name, 0, &mut visited);
    }
    out
}

fn write_topic<'a>(out: &mut String, topics: &'a TopicIndex, name: &'a str, depth: usize, visited: &mut HashSet<&'a str>) {
    if !visited.insert(name) {
        return;
    }
    let doc = topics
        .node(name)
        .and_then(|node| node.doc.as_deref())
        .map(summary)
        .unwrap_or_default();
    let _ = writeln!(out, "{:indent$}{name}  {doc}", "", indent = depth * 2);
    for child in topics.children(name) {
        write_topic(out, topics, &child.name, depth + 1, visited);
    }
}

pub fn command_json(command: &CommandDescriptor) -> Result<Value> {
    let mut value = serde_json::to_value(command)?;
    for section in ["args", "options"] {
        redact_param_defaults(&mut value, section, command.params());
    }
    Ok(value)
}

pub fn object_json(object: &ObjectDescriptor) -> Result<Value> {
    let mut value = serde_json::to_value(object)?;
    redact_param_defaults(&mut value, "params", object.params.iter());
    Ok(value)
}

fn redact_param_defaults<'a>(value: &mut Value, section: &str, params: impl Iterator<Item = &'a ParameterDescriptor>) {
    let secret: HashSet<&str> = params.filter(|param| param.password).map(|param| param.name.as_str()).collect();
    let Some(entries) = value.get_mut(section).and_then(Value::as_array_mut) else {
        return;
    };
    for entry in entries {
        let is_secret = entry.get("name").and_then(Value::as_str).is_some_and(|name| secret.contains(name));
        if is_secret && let Some(default) = entry.get_mut("default") {
            *default = Value::String(REDACTED.into());
        }
    }
}

/// Masks the values of password parameters.
pub fn redact_values(command: &CommandDescriptor, mut kw: Map<String, Value>) -> Map<String, Value> {
    for param in command.params().filter(|param| param.password) {
        if let Some(value) = kw.get_mut(&param.name) {
            *value = Value::String(REDACTED.into());
        }
    }
    kw
}

fn summary(doc: &str) -> &str {
    doc.lines().map(str::trim).find(|line| !line.is_empty()).unwrap_or_default()
}
