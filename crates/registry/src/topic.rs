//! Topic index: documentation grouping of commands and objects.
//!
//! Topics carry no behaviour. A command or object may name a topic that the
//! schema never declares; it is still grouped under that name.

use std::collections::HashSet;

use indexmap::IndexMap;
use ipaschema_types::TopicSpec;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopicNode {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
    /// Parent topic, if nested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
}

/// Command and object names filed under one topic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TopicMembers {
    pub commands: Vec<String>,
    pub objects: Vec<String>,
}

impl TopicMembers {
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty() && self.objects.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopicIndex {
    nodes: IndexMap<String, TopicNode>,
    members: IndexMap<Option<String>, TopicMembers>,
}

impl TopicIndex {
    pub fn new<'a>(topics: impl IntoIterator<Item = &'a TopicSpec>) -> Self {
        let nodes = topics
            .into_iter()
            .map(|spec| {
                (
                    spec.name.clone(),
                    TopicNode {
                        name: spec.name.clone(),
                        doc: spec.doc.clone(),
                        parent: spec.topic.clone(),
                    },
                )
            })
            .collect();
        Self {
            nodes,
            members: IndexMap::new(),
        }
    }

    pub(crate) fn add_command(&mut self, topic: Option<&str>, name: &str) {
        self.members
            .entry(topic.map(str::to_string))
            .or_default()
            .commands
            .push(name.to_string());
    }

    pub(crate) fn add_object(&mut self, topic: Option<&str>, name: &str) {
        self.members
            .entry(topic.map(str::to_string))
            .or_default()
            .objects
            .push(name.to_string());
    }

    pub fn node(&self, name: &str) -> Option<&TopicNode> {
        self.nodes.get(name)
    }

    /// Declared topics in schema order.
    pub fn nodes(&self) -> impl Iterator<Item = &TopicNode> {
        self.nodes.values()
    }

    /// Topics without a known parent.
    pub fn roots(&self) -> impl Iterator<Item = &TopicNode> {
        self.nodes
            .values()
            .filter(|node| node.parent.as_deref().is_none_or(|parent| !self.nodes.contains_key(parent)))
    }

    /// Topics whose parent is `name`.
    pub fn children<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a TopicNode> + 'a {
        self.nodes
            .values()
            .filter(move |node| node.parent.as_deref() == Some(name))
    }

    /// Parent chain of `name`, nearest first. Stops at an undeclared parent
    /// or when the chain loops back on itself.
    pub fn ancestors(&self, name: &str) -> Vec<&TopicNode> {
        let mut chain = Vec::new();
        let mut visited = HashSet::from([name.to_string()]);
        let mut current = self.nodes.get(name).and_then(|node| node.parent.as_deref());
        while let Some(parent_name) = current {
            if !visited.insert(parent_name.to_string()) {
                break;
            }
            let Some(parent) = self.nodes.get(parent_name) else {
                break;
            };
            chain.push(parent);
            current = parent.parent.as_deref();
        }
        chain
    }

    /// Members filed directly under `topic` (`None` for ungrouped entries).
    pub fn members(&self, topic: Option<&str>) -> Option<&TopicMembers> {
        self.members.get(&topic.map(str::to_string))
    }

    /// All members grouped by topic, in first-seen order.
    pub fn names_by_topic(&self) -> impl Iterator<Item = (Option<&str>, &TopicMembers)> {
        self.members.iter().map(|(topic, members)| (topic.as_deref(), members))
    }
}
