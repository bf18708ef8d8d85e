// SPDX-License-Identifier: MIT OR Apache-2.0

//! Factories turning raw fields into typed contents.
//!
//! Commands are parsed through a chain of factories, each stricter than the one before:
//!
//! - [`GenericCommandFactory`] requires `sn` and `command`
//! - [`HistoryCommandFactory`] additionally requires `time`
//! - [`GroupCommandFactory`] additionally requires `group`
//!
//! [`ContentFactories`] picks the factory by content type and, for commands, by command name.
//! Malformed input never fails loudly, parsing returns `None` and logs a warning naming the
//! offending field. Commands come from remote peers, a missing field is their mistake and not
//! asserted against.
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use crate::Fields;
use crate::config::Config;
use crate::content::{
    BaseContent, COMMAND, Command, Content, ContentError, EXPEL, GROUP, GroupCommand, HISTORY,
    HistoryCommand, INVITE, JOIN, QUIT, RESET,
};

/// Parses contents of one content type.
pub trait ContentFactory: Send + Sync {
    fn parse_content(&self, content: BaseContent, factories: &ContentFactories) -> Option<Content>;
}

/// Parses commands of one command name.
pub trait CommandFactory: Send + Sync {
    fn parse_command(&self, content: BaseContent) -> Option<Content>;
}

/// Contents without a registered factory are kept as they are.
#[derive(Copy, Clone, Debug, Default)]
pub struct BaseContentFactory;

impl ContentFactory for BaseContentFactory {
    fn parse_content(&self, content: BaseContent, _factories: &ContentFactories) -> Option<Content> {
        Some(Content::Base(content))
    }
}

fn command_name(content: &BaseContent) -> Option<&str> {
    content.get("command").and_then(Value::as_str)
}

fn rejected<T>(result: Result<T, ContentError>, content_type: &str) -> Option<T> {
    result
        .inspect_err(|err| warn!(content_type, "malformed command: {err}"))
        .ok()
}

/// Looks up a factory registered for the command name or falls back to the given one.
fn parse_by_name(
    content: BaseContent,
    factories: &ContentFactories,
    fallback: &dyn CommandFactory,
) -> Option<Content> {
    match command_name(&content).and_then(|name| factories.command_factory(name)) {
        Some(factory) => factory.parse_command(content),
        None => fallback.parse_command(content),
    }
}

/// Parses plain commands.
#[derive(Copy, Clone, Debug, Default)]
pub struct GenericCommandFactory;

impl GenericCommandFactory {
    pub fn build(content: BaseContent) -> Result<Command, ContentError> {
        Command::from_content(content)
    }
}

impl CommandFactory for GenericCommandFactory {
    fn parse_command(&self, content: BaseContent) -> Option<Content> {
        let content_type = content.content_type().to_string();
        rejected(Self::build(content), &content_type).map(Content::Command)
    }
}

impl ContentFactory for GenericCommandFactory {
    fn parse_content(&self, content: BaseContent, factories: &ContentFactories) -> Option<Content> {
        parse_by_name(content, factories, self)
    }
}

/// Parses commands which carry a timestamp.
#[derive(Copy, Clone, Debug, Default)]
pub struct HistoryCommandFactory;

impl HistoryCommandFactory {
    pub fn build(content: BaseContent) -> Result<HistoryCommand, ContentError> {
        HistoryCommand::from_command(GenericCommandFactory::build(content)?)
    }
}

impl CommandFactory for HistoryCommandFactory {
    fn parse_command(&self, content: BaseContent) -> Option<Content> {
        let content_type = content.content_type().to_string();
        rejected(Self::build(content), &content_type).map(Content::History)
    }
}

impl ContentFactory for HistoryCommandFactory {
    fn parse_content(&self, content: BaseContent, factories: &ContentFactories) -> Option<Content> {
        parse_by_name(content, factories, self)
    }
}

/// Parses commands addressed to a group.
#[derive(Copy, Clone, Debug, Default)]
pub struct GroupCommandFactory;

impl GroupCommandFactory {
    pub fn build(content: BaseContent) -> Result<GroupCommand, ContentError> {
        GroupCommand::from_history(HistoryCommandFactory::build(content)?)
    }
}

impl CommandFactory for GroupCommandFactory {
    fn parse_command(&self, content: BaseContent) -> Option<Content> {
        let content_type = content.content_type().to_string();
        rejected(Self::build(content), &content_type).map(Content::Group)
    }
}

impl ContentFactory for GroupCommandFactory {
    /// Commands carrying a `group` field are always group commands, the command name isn't
    /// looked up.
    fn parse_content(&self, content: BaseContent, factories: &ContentFactories) -> Option<Content> {
        if content.contains("group") {
            return self.parse_command(content);
        }

        parse_by_name(content, factories, &HistoryCommandFactory)
    }
}

/// Registry of content and command factories.
///
/// Built once at startup and shared by reference with everything parsing contents.
pub struct ContentFactories {
    content: HashMap<String, Arc<dyn ContentFactory>>,
    commands: HashMap<String, Arc<dyn CommandFactory>>,
    group_command_fallback: bool,
}

impl ContentFactories {
    /// Returns a registry without any factories, every content parses as [`Content::Base`].
    pub fn new(config: &Config) -> Self {
        Self {
            content: HashMap::new(),
            commands: HashMap::new(),
            group_command_fallback: config.group_command_fallback,
        }
    }

    /// Returns a registry knowing all command and history types.
    pub fn with_defaults(config: &Config) -> Self {
        let mut factories = Self::new(config);

        factories.register_content_factory(COMMAND, GenericCommandFactory);
        factories.register_content_factory(HISTORY, HistoryCommandFactory);

        for name in [GROUP, INVITE, EXPEL, JOIN, QUIT, RESET] {
            factories.register_command_factory(name, GroupCommandFactory);
        }

        factories
    }

    pub fn register_content_factory<F>(&mut self, content_type: &str, factory: F)
    where
        F: ContentFactory + 'static,
    {
        self.content
            .insert(content_type.to_string(), Arc::new(factory));
    }

    pub fn register_command_factory<F>(&mut self, command: &str, factory: F)
    where
        F: CommandFactory + 'static,
    {
        self.commands.insert(command.to_string(), Arc::new(factory));
    }

    pub fn content_factory(&self, content_type: &str) -> Option<&dyn ContentFactory> {
        self.content.get(content_type).map(Arc::as_ref)
    }

    pub fn command_factory(&self, command: &str) -> Option<&dyn CommandFactory> {
        self.commands.get(command).map(Arc::as_ref)
    }

    /// Parses raw fields into typed content, `None` if required fields are missing.
    pub fn parse(&self, fields: Fields) -> Option<Content> {
        let content = BaseContent::from_fields(fields)
            .inspect_err(|err| debug!("ignoring content: {err}"))
            .ok()?;

        if self.group_command_fallback && self.is_group_command(&content) {
            return GroupCommandFactory.parse_content(content, self);
        }

        match self.content_factory(content.content_type()) {
            Some(factory) => factory.parse_content(content, self),
            None => BaseContentFactory.parse_content(content, self),
        }
    }

    fn is_group_command(&self, content: &BaseContent) -> bool {
        matches!(content.content_type(), COMMAND | HISTORY)
            && content.contains("command")
            && content.contains("group")
    }
}

impl fmt::Debug for ContentFactories {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut content: Vec<&String> = self.content.keys().collect();
        let mut commands: Vec<&String> = self.commands.keys().collect();
        content.sort();
        commands.sort();

        f.debug_struct("ContentFactories")
            .field("content", &content)
            .field("commands", &commands)
            .field("group_command_fallback", &self.group_command_fallback)
            .finish()
    }
}
