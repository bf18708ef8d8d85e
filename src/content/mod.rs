// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed protocol contents and commands.
//!
//! Every content is a map of fields with a `type`. Commands add a sequence number and a command
//! name, history commands a timestamp and group commands the group they are meant for. Each layer
//! wraps the one below and is only constructed through a validating constructor, so a value of a
//! command type always carries all fields its layer requires.
//!
//! Turning raw fields into these types is the job of the [`factory`] chain.
pub mod factory;

use serde_json::Value;
use thiserror::Error;

use crate::Fields;
use crate::identifier::{Identifier, IdentifierError};
use crate::timestamp::Timestamp;

pub use factory::{
    CommandFactory, ContentFactories, ContentFactory, GenericCommandFactory, GroupCommandFactory,
    HistoryCommandFactory,
};

/// Content type of plain text messages.
pub const TEXT: &str = "text";

/// Content type of commands.
pub const COMMAND: &str = "command";

/// Content type of commands which are kept in a history, for example group changes.
pub const HISTORY: &str = "history";

/// Content type of receipts answering other contents.
pub const RECEIPT: &str = "receipt";

/// Command name processors for any group command are registered under.
pub const GROUP: &str = "group";

/// Group command names.
pub const INVITE: &str = "invite";
pub const EXPEL: &str = "expel";
pub const JOIN: &str = "join";
pub const QUIT: &str = "quit";
pub const RESET: &str = "reset";

/// Content of any type as a map of fields.
#[derive(Clone, Debug, PartialEq)]
pub struct BaseContent {
    content_type: String,
    fields: Fields,
}

impl BaseContent {
    pub fn new(content_type: &str) -> Self {
        let mut fields = Fields::new();
        fields.insert("type".into(), Value::from(content_type));

        Self {
            content_type: content_type.to_string(),
            fields,
        }
    }

    pub fn from_fields(fields: Fields) -> Result<Self, ContentError> {
        let content_type = match fields.get("type") {
            Some(Value::String(content_type)) if !content_type.is_empty() => content_type.clone(),
            Some(_) => return Err(ContentError::InvalidField("type")),
            None => return Err(ContentError::MissingField("type")),
        };

        Ok(Self {
            content_type,
            fields,
        })
    }

    /// Adds a field, `type` can't be changed.
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        if key != "type" {
            self.fields.insert(key.to_string(), value.into());
        }
        self
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    pub fn into_fields(self) -> Fields {
        self.fields
    }
}

/// Content asking the receiver to perform an action.
#[derive(Clone, Debug, PartialEq)]
pub struct Command {
    content: BaseContent,
    sn: u64,
    command: String,
}

impl Command {
    pub fn new(command: &str, sn: u64) -> Self {
        Self {
            content: BaseContent::new(COMMAND)
                .with("sn", sn)
                .with("command", command),
            sn,
            command: command.to_string(),
        }
    }

    /// Validates that the content carries a sequence number and command name.
    pub fn from_content(content: BaseContent) -> Result<Self, ContentError> {
        let sn = match content.get("sn") {
            Some(sn) => sn.as_u64().ok_or(ContentError::InvalidField("sn"))?,
            None => return Err(ContentError::MissingField("sn")),
        };

        let command = match content.get("command") {
            Some(Value::String(command)) if !command.is_empty() => command.clone(),
            Some(_) => return Err(ContentError::InvalidField("command")),
            None => return Err(ContentError::MissingField("command")),
        };

        Ok(Self {
            content,
            sn,
            command,
        })
    }

    pub fn sn(&self) -> u64 {
        self.sn
    }

    /// Name of the action.
    pub fn command_name(&self) -> &str {
        &self.command
    }

    pub fn content(&self) -> &BaseContent {
        &self.content
    }
}

/// Command which is kept in a history, for example to replay group changes.
#[derive(Clone, Debug, PartialEq)]
pub struct HistoryCommand {
    command: Command,
    time: Timestamp,
}

impl HistoryCommand {
    pub fn new(command: &str, sn: u64, time: Timestamp) -> Self {
        let mut inner = Command::new(command, sn);
        inner.content = BaseContent::new(HISTORY)
            .with("sn", sn)
            .with("command", command)
            .with("time", time.to_value());

        Self {
            command: inner,
            time,
        }
    }

    /// Validates that the command carries a timestamp.
    pub fn from_command(command: Command) -> Result<Self, ContentError> {
        let time = match command.content.get("time") {
            Some(time) => Timestamp::from_value(time).ok_or(ContentError::InvalidField("time"))?,
            None => return Err(ContentError::MissingField("time")),
        };

        Ok(Self { command, time })
    }

    pub fn time(&self) -> Timestamp {
        self.time
    }

    pub fn command(&self) -> &Command {
        &self.command
    }
}

/// Command changing a group.
#[derive(Clone, Debug, PartialEq)]
pub struct GroupCommand {
    history: HistoryCommand,
    group: Identifier,
}

impl GroupCommand {
    pub fn new(command: &str, sn: u64, time: Timestamp, group: &Identifier) -> Self {
        let mut history = HistoryCommand::new(command, sn, time);
        history.command.content = history
            .command
            .content
            .with("group", group.to_string());

        Self {
            history,
            group: group.clone(),
        }
    }

    /// Validates that the history command names a group.
    pub fn from_history(history: HistoryCommand) -> Result<Self, ContentError> {
        let group = match history.command.content.get("group") {
            Some(Value::String(group)) => group.parse()?,
            Some(_) => return Err(ContentError::InvalidField("group")),
            None => return Err(ContentError::MissingField("group")),
        };

        Ok(Self { history, group })
    }

    pub fn group(&self) -> &Identifier {
        &self.group
    }

    pub fn history(&self) -> &HistoryCommand {
        &self.history
    }
}

/// Parsed content, tagged with the most specific layer it validated as.
#[derive(Clone, Debug, PartialEq)]
pub enum Content {
    Base(BaseContent),
    Command(Command),
    History(HistoryCommand),
    Group(GroupCommand),
}

impl Content {
    pub fn base(&self) -> &BaseContent {
        match self {
            Content::Base(content) => content,
            Content::Command(command) => command.content(),
            Content::History(history) => history.command().content(),
            Content::Group(group) => group.history().command().content(),
        }
    }

    pub fn content_type(&self) -> &str {
        self.base().content_type()
    }

    pub fn fields(&self) -> &Fields {
        self.base().fields()
    }

    pub fn into_fields(self) -> Fields {
        match self {
            Content::Base(content) => content.fields,
            Content::Command(command) => command.content.fields,
            Content::History(history) => history.command.content.fields,
            Content::Group(group) => group.history.command.content.fields,
        }
    }

    /// Returns the command layer of any command variant.
    pub fn as_command(&self) -> Option<&Command> {
        match self {
            Content::Base(_) => None,
            Content::Command(command) => Some(command),
            Content::History(history) => Some(history.command()),
            Content::Group(group) => Some(group.history().command()),
        }
    }

    pub fn as_group_command(&self) -> Option<&GroupCommand> {
        match self {
            Content::Group(group) => Some(group),
            _ => None,
        }
    }

    pub fn is_command(&self) -> bool {
        self.as_command().is_some()
    }
}

impl From<BaseContent> for Content {
    fn from(content: BaseContent) -> Self {
        Content::Base(content)
    }
}

impl From<Command> for Content {
    fn from(command: Command) -> Self {
        Content::Command(command)
    }
}

impl From<HistoryCommand> for Content {
    fn from(history: HistoryCommand) -> Self {
        Content::History(history)
    }
}

impl From<GroupCommand> for Content {
    fn from(group: GroupCommand) -> Self {
        Content::Group(group)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ContentError {
    #[error("content is missing field '{0}'")]
    MissingField(&'static str),

    #[error("content has invalid field '{0}'")]
    InvalidField(&'static str),

    #[error("invalid group identifier: {0}")]
    InvalidGroup(#[from] IdentifierError),
}
