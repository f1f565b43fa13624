use std::fmt;

use serde::Serialize;

use crate::events::{CommandInvocation, OptionValue};

pub const SUMMARIZE: &str = "summarize";

pub const REGENERATE_PREFIX: &str = "regenerate_";
pub const EDIT_PREFIX: &str = "edit_";
pub const EDIT_MODAL_PREFIX: &str = "edit_modal_";

pub const TAG_FIELD: &str = "tag_text";
pub const SUMMARY_FIELD: &str = "summary_text";
pub const INTEREST_FIELD: &str = "interest_text";

const CHAT_INPUT: u8 = 1;
const STRING_OPTION: u8 = 3;
const BOOLEAN_OPTION: u8 = 5;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CommandOptionDefinition {
    #[serde(rename = "type")]
    pub kind: u8,
    pub name: String,
    pub description: String,
    pub required: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CommandDefinition {
    pub name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: u8,
    /// Guild install and user install.
    pub integration_types: Vec<u8>,
    /// Guilds, bot DMs and private channels.
    pub contexts: Vec<u8>,
    pub options: Vec<CommandOptionDefinition>,
}

pub fn summarize_command() -> CommandDefinition {
    CommandDefinition {
        name: SUMMARIZE.to_owned(),
        description: "Summarize an IT article or blog post from a URL using AI".to_owned(),
        kind: CHAT_INPUT,
        integration_types: vec![0, 1],
        contexts: vec![0, 1, 2],
        options: vec![
            CommandOptionDefinition {
                kind: STRING_OPTION,
                name: "url".to_owned(),
                description: "The URL of the article to summarize".to_owned(),
                required: true,
            },
            CommandOptionDefinition {
                kind: BOOLEAN_OPTION,
                name: "debug".to_owned(),
                description: "Debug mode - skip external calls and use mock data".to_owned(),
                required: false,
            },
        ],
    }
}

/// Every command the bot registers.
pub fn command_definitions() -> Vec<CommandDefinition> {
    vec![summarize_command()]
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SummarizeRequest {
    pub url: Option<String>,
    pub debug: bool,
}

impl SummarizeRequest {
    pub fn from_invocation(command: &CommandInvocation) -> Self {
        let url = match command.option("url") {
            Some(OptionValue::String(url)) if !url.trim().is_empty() => Some(url.trim().to_owned()),
            _ => None,
        };
        let debug = matches!(command.option("debug"), Some(OptionValue::Boolean(true)));
        Self { url, debug }
    }
}

/// Button and form ids; each carries the stored reference id after its prefix.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CustomId {
    Regenerate(String),
    Edit(String),
    EditModal(String),
}

impl CustomId {
    pub fn parse(raw: &str) -> Option<Self> {
        // `edit_modal_` also starts with `edit_`
        let parsed = if let Some(id) = raw.strip_prefix(EDIT_MODAL_PREFIX) {
            Self::EditModal(id.to_owned())
        } else if let Some(id) = raw.strip_prefix(REGENERATE_PREFIX) {
            Self::Regenerate(id.to_owned())
        } else if let Some(id) = raw.strip_prefix(EDIT_PREFIX) {
            Self::Edit(id.to_owned())
        } else {
            return None;
        };

        (!parsed.reference_id().is_empty()).then_some(parsed)
    }

    pub fn reference_id(&self) -> &str {
        match self {
            Self::Regenerate(id) | Self::Edit(id) | Self::EditModal(id) => id,
        }
    }
}

impl fmt::Display for CustomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Regenerate(id) => write!(f, "{REGENERATE_PREFIX}{id}"),
            Self::Edit(id) => write!(f, "{EDIT_PREFIX}{id}"),
            Self::EditModal(id) => write!(f, "{EDIT_MODAL_PREFIX}{id}"),
        }
    }
}
