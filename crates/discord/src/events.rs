use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

pub const PING: u8 = 1;
pub const APPLICATION_COMMAND: u8 = 2;
pub const MESSAGE_COMPONENT: u8 = 3;
pub const MODAL_SUBMIT: u8 = 5;

/// Identifies the interaction for every follow-up call made on its behalf.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Correlation {
    pub application_id: String,
    pub token: String,
}

#[derive(Clone, Debug, PartialEq)]
pub enum OptionValue {
    String(String),
    Boolean(bool),
    Integer(i64),
    Other(Value),
}

#[derive(Clone, Debug, PartialEq)]
pub struct CommandOption {
    pub name: String,
    pub value: OptionValue,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CommandInvocation {
    pub name: String,
    pub options: Vec<CommandOption>,
}

impl CommandInvocation {
    pub fn option(&self, name: &str) -> Option<&OptionValue> {
        self.options.iter().find(|option| option.name == name).map(|option| &option.value)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum InteractionEvent {
    Ping,
    SlashCommand { correlation: Correlation, command: CommandInvocation },
    ComponentClick { correlation: Correlation, custom_id: String },
    FormSubmit { correlation: Correlation, custom_id: String, fields: BTreeMap<String, String> },
    Unsupported { kind: u8 },
}

impl InteractionEvent {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Ping => "ping",
            Self::SlashCommand { .. } => "slash_command",
            Self::ComponentClick { .. } => "component_click",
            Self::FormSubmit { .. } => "form_submit",
            Self::Unsupported { .. } => "unsupported",
        }
    }

    pub fn from_slice(body: &[u8]) -> Result<Self, EventParseError> {
        let raw: RawInteraction =
            serde_json::from_slice(body).map_err(|error| EventParseError::Malformed(error.to_string()))?;
        raw.into_event()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventContext {
    pub correlation_id: String,
}

impl EventContext {
    pub fn generate() -> Self {
        Self { correlation_id: uuid::Uuid::new_v4().to_string() }
    }
}

impl Default for EventContext {
    fn default() -> Self {
        Self { correlation_id: "unknown-correlation-id".to_owned() }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EventParseError {
    #[error("interaction body is not valid json: {0}")]
    Malformed(String),
    #[error("interaction is missing `{0}`")]
    MissingField(&'static str),
}

#[derive(Deserialize)]
struct RawInteraction {
    #[serde(rename = "type")]
    kind: u8,
    #[serde(default)]
    application_id: Option<String>,
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    data: Option<RawInteractionData>,
}

#[derive(Default, Deserialize)]
struct RawInteractionData {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    options: Vec<RawOption>,
    #[serde(default)]
    custom_id: Option<String>,
    #[serde(default)]
    components: Vec<RawActionRow>,
}

#[derive(Deserialize)]
struct RawOption {
    name: String,
    #[serde(default)]
    value: Value,
}

#[derive(Deserialize)]
struct RawActionRow {
    #[serde(default)]
    components: Vec<RawTextInput>,
}

#[derive(Deserialize)]
struct RawTextInput {
    #[serde(default)]
    custom_id: Option<String>,
    #[serde(default)]
    value: Option<String>,
}

impl RawInteraction {
    fn correlation(&self) -> Result<Correlation, EventParseError> {
        let application_id = self
            .application_id
            .clone()
            .filter(|value| !value.is_empty())
            .ok_or(EventParseError::MissingField("application_id"))?;
        let token = self
            .token
            .clone()
            .filter(|value| !value.is_empty())
            .ok_or(EventParseError::MissingField("token"))?;
        Ok(Correlation { application_id, token })
    }

    fn into_event(self) -> Result<InteractionEvent, EventParseError> {
        match self.kind {
            PING => Ok(InteractionEvent::Ping),
            APPLICATION_COMMAND => {
                let correlation = self.correlation()?;
                let data = self.data.ok_or(EventParseError::MissingField("data"))?;
                let name = data.name.ok_or(EventParseError::MissingField("data.name"))?;
                let options = data.options.into_iter().map(CommandOption::from).collect();
                Ok(InteractionEvent::SlashCommand {
                    correlation,
                    command: CommandInvocation { name, options },
                })
            }
            MESSAGE_COMPONENT => {
                let correlation = self.correlation()?;
                let custom_id = self
                    .data
                    .and_then(|data| data.custom_id)
                    .ok_or(EventParseError::MissingField("data.custom_id"))?;
                Ok(InteractionEvent::ComponentClick { correlation, custom_id })
            }
            MODAL_SUBMIT => {
                let correlation = self.correlation()?;
                let data = self.data.ok_or(EventParseError::MissingField("data"))?;
                let custom_id = data.custom_id.ok_or(EventParseError::MissingField("data.custom_id"))?;
                let fields = data
                    .components
                    .into_iter()
                    .flat_map(|row| row.components)
                    .filter_map(|input| Some((input.custom_id?, input.value.unwrap_or_default())))
                    .collect();
                Ok(InteractionEvent::FormSubmit { correlation, custom_id, fields })
            }
            other => Ok(InteractionEvent::Unsupported { kind: other }),
        }
    }
}

impl From<RawOption> for CommandOption {
    fn from(raw: RawOption) -> Self {
        let value = match raw.value {
            Value::String(text) => OptionValue::String(text),
            Value::Bool(flag) => OptionValue::Boolean(flag),
            Value::Number(number) if number.is_i64() => {
                OptionValue::Integer(number.as_i64().unwrap_or_default())
            }
            other => OptionValue::Other(other),
        };
        Self { name: raw.name, value }
    }
}
