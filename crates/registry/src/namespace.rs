//! The materialized, fingerprint-scoped set of descriptors.

use std::{borrow::Cow, sync::Arc};

use indexmap::IndexMap;
use ipaschema_api::RemoteApi;
use ipaschema_types::{ClassSpec, CommandSpec, SchemaDocument};
use tracing::{info, warn};

use crate::{
    command::{CommandDescriptor, compile_command},
    error::CompileError,
    object::{ObjectDescriptor, compile_object},
    topic::{TopicIndex, TopicMembers},
};

/// A descriptor resolved by name.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Descriptor<'a> {
    Command(&'a CommandDescriptor),
    Object(&'a ObjectDescriptor),
}

impl Descriptor<'_> {
    pub fn name(&self) -> &str {
        match self {
            Descriptor::Command(command) => &command.name,
            Descriptor::Object(object) => &object.name,
        }
    }
}

/// Every command, object and topic compiled from one schema fingerprint.
///
/// Built once and never mutated; safe to share across threads.
#[derive(Debug, Clone, PartialEq)]
pub struct Namespace {
    fingerprint: String,
    commands: IndexMap<String, CommandDescriptor>,
    objects: IndexMap<String, ObjectDescriptor>,
    topics: TopicIndex,
    errors: Vec<CompileError>,
}

impl Namespace {
    /// Compiles all entities of `document`.
    ///
    /// A malformed command or class is skipped and its error recorded; the
    /// rest of the namespace is still built. Default resolvers are bound to
    /// `remote`.
    pub fn build(document: &SchemaDocument, remote: &Arc<dyn RemoteApi>) -> Self {
        let mut topics = TopicIndex::new(document.topics.values());
        let mut errors = Vec::new();

        let mut commands = IndexMap::with_capacity(document.commands.len());
        for (name, spec) in &document.commands {
            let spec = named(spec, name);
            match compile_command(remote, &spec) {
                Ok(command) => {
                    topics.add_command(command.topic.as_deref(), name);
                    commands.insert(name.clone(), command);
                }
                Err(error) => {
                    warn!(fingerprint = %document.fingerprint, %error, "skipping malformed command");
                    errors.push(error);
                }
            }
        }

        let mut objects = IndexMap::with_capacity(document.classes.len());
        for (name, spec) in &document.classes {
            let spec = named(spec, name);
            match compile_object(remote, &spec) {
                Ok(object) => {
                    topics.add_object(object.topic.as_deref(), name);
                    objects.insert(name.clone(), object);
                }
                Err(error) => {
                    warn!(fingerprint = %document.fingerprint, %error, "skipping malformed class");
                    errors.push(error);
                }
            }
        }

        info!(
            fingerprint = %document.fingerprint,
            commands = commands.len(),
            objects = objects.len(),
            topics = document.topics.len(),
            skipped = errors.len(),
            "built namespace"
        );
        Self {
            fingerprint: document.fingerprint.clone(),
            commands,
            objects,
            topics,
            errors,
        }
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn command(&self, name: &str) -> Option<&CommandDescriptor> {
        self.commands.get(name)
    }

    pub fn object(&self, name: &str) -> Option<&ObjectDescriptor> {
        self.objects.get(name)
    }

    /// Looks `name` up among commands, then objects.
    pub fn get(&self, name: &str) -> Option<Descriptor<'_>> {
        self.command(name)
            .map(Descriptor::Command)
            .or_else(|| self.object(name).map(Descriptor::Object))
    }

    pub fn commands(&self) -> impl Iterator<Item = &CommandDescriptor> {
        self.commands.values()
    }

    pub fn objects(&self) -> impl Iterator<Item = &ObjectDescriptor> {
        self.objects.values()
    }

    pub fn topics(&self) -> &TopicIndex {
        &self.topics
    }

    /// Command and object names grouped by topic.
    pub fn names_by_topic(&self) -> impl Iterator<Item = (Option<&str>, &TopicMembers)> {
        self.topics.names_by_topic()
    }

    /// Entities skipped during the build.
    pub fn errors(&self) -> &[CompileError] {
        &self.errors
    }
}

/// The entry as filed under `key`. A document assembled in code may leave an
/// entry's own `name` empty; lookups and default resolvers go by the key.
fn named<'a, T: Keyed>(spec: &'a T, key: &str) -> Cow<'a, T> {
    if spec.name() == key {
        return Cow::Borrowed(spec);
    }
    let mut owned = spec.clone();
    owned.set_name(key);
    Cow::Owned(owned)
}

trait Keyed: Clone {
    fn name(&self) -> &str;
    fn set_name(&mut self, name: &str);
}

impl Keyed for CommandSpec {
    fn name(&self) -> &str {
        &self.name
    }

    fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }
}

impl Keyed for ClassSpec {
    fn name(&self) -> &str {
        &self.name
    }

    fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }
}
