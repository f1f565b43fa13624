use chrono::{DateTime, SecondsFormat, Utc};
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

use curabot_core::{ReferenceId, StoredReference, UserFacingError};

use crate::commands::{CustomId, INTEREST_FIELD, SUMMARY_FIELD, TAG_FIELD};

pub const EPHEMERAL_FLAG: u64 = 1 << 6;

pub const BRAND_COLOR: u32 = 0x5865F2;
pub const DEBUG_COLOR: u32 = 0xFF9900;
pub const EDITED_TITLE: &str = "Edited Summary";

const ACTION_ROW: u8 = 1;
const BUTTON: u8 = 2;
const TEXT_INPUT: u8 = 4;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(into = "u8")]
pub enum ButtonStyle {
    Primary,
    Secondary,
}

impl From<ButtonStyle> for u8 {
    fn from(style: ButtonStyle) -> Self {
        match style {
            ButtonStyle::Primary => 1,
            ButtonStyle::Secondary => 2,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(into = "u8")]
pub enum TextInputStyle {
    Short,
    Paragraph,
}

impl From<TextInputStyle> for u8 {
    fn from(style: TextInputStyle) -> Self {
        match style {
            TextInputStyle::Short => 1,
            TextInputStyle::Paragraph => 2,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Button {
    #[serde(rename = "type")]
    kind: u8,
    pub style: ButtonStyle,
    pub label: String,
    pub custom_id: String,
}

impl Button {
    pub fn new(style: ButtonStyle, label: impl Into<String>, custom_id: &CustomId) -> Self {
        Self { kind: BUTTON, style, label: label.into(), custom_id: custom_id.to_string() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TextInput {
    #[serde(rename = "type")]
    kind: u8,
    pub custom_id: String,
    pub label: String,
    pub style: TextInputStyle,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    pub max_length: u16,
    pub required: bool,
}

impl TextInput {
    pub fn new(
        custom_id: impl Into<String>,
        label: impl Into<String>,
        style: TextInputStyle,
        max_length: u16,
    ) -> Self {
        Self {
            kind: TEXT_INPUT,
            custom_id: custom_id.into(),
            label: label.into(),
            style,
            placeholder: None,
            value: None,
            max_length,
            required: true,
        }
    }

    pub fn placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = Some(placeholder.into());
        self
    }

    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Component {
    Button(Button),
    TextInput(TextInput),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ActionRow {
    #[serde(rename = "type")]
    kind: u8,
    pub components: Vec<Component>,
}

impl ActionRow {
    pub fn new(components: Vec<Component>) -> Self {
        Self { kind: ACTION_ROW, components }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct EmbedFooter {
    pub text: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Embed {
    pub title: String,
    pub color: u32,
    pub description: String,
    pub timestamp: String,
    pub footer: EmbedFooter,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct MessagePayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub embeds: Vec<Embed>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<ActionRow>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flags: Option<u64>,
}

impl MessagePayload {
    pub fn is_ephemeral(&self) -> bool {
        self.flags.is_some_and(|flags| flags & EPHEMERAL_FLAG != 0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ModalPayload {
    pub custom_id: String,
    pub title: String,
    pub components: Vec<ActionRow>,
}

/// Initial answer to an interaction webhook.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InteractionResponse {
    Pong,
    ChannelMessage(MessagePayload),
    DeferredChannelMessage,
    DeferredUpdateMessage,
    Modal(ModalPayload),
}

impl InteractionResponse {
    pub fn type_code(&self) -> u8 {
        match self {
            Self::Pong => 1,
            Self::ChannelMessage(_) => 4,
            Self::DeferredChannelMessage => 5,
            Self::DeferredUpdateMessage => 6,
            Self::Modal(_) => 9,
        }
    }
}

impl Serialize for InteractionResponse {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("type", &self.type_code())?;
        match self {
            Self::ChannelMessage(message) => map.serialize_entry("data", message)?,
            Self::Modal(modal) => map.serialize_entry("data", modal)?,
            Self::Pong | Self::DeferredChannelMessage | Self::DeferredUpdateMessage => {}
        }
        map.end()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderMode {
    Normal,
    Debug,
    Edited,
}

impl RenderMode {
    pub fn color(&self) -> u32 {
        match self {
            Self::Normal | Self::Edited => BRAND_COLOR,
            Self::Debug => DEBUG_COLOR,
        }
    }

    pub fn footer(&self) -> &'static str {
        match self {
            Self::Normal => "CuraBot - AI-Powered Summarization",
            Self::Debug => "CuraBot - DEBUG MODE (No External Calls)",
            Self::Edited => "CuraBot - Manually Edited",
        }
    }
}

#[derive(Clone, Debug)]
pub struct SummaryCard<'a> {
    pub title: &'a str,
    pub url: &'a str,
    pub tags: &'a str,
    pub summary: &'a str,
    pub interest: &'a str,
    pub mode: RenderMode,
    pub timestamp: DateTime<Utc>,
}

pub fn summary_description(url: &str, tags: &str, summary: &str, interest: &str) -> String {
    format!(
        "🏷️ **Tag:** {tags}\n\n🔗 **Link:** {url}\n\n📖 **Summary:**\n{summary}\n\n💡 **Why it's interesting:**\n{interest}"
    )
}

/// One embed plus the regenerate and edit buttons, both keyed by `reference`.
pub fn summary_message(card: &SummaryCard<'_>, reference: &ReferenceId) -> MessagePayload {
    let embed = Embed {
        title: card.title.to_owned(),
        color: card.mode.color(),
        description: summary_description(card.url, card.tags, card.summary, card.interest),
        timestamp: card.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
        footer: EmbedFooter { text: card.mode.footer().to_owned() },
    };

    MessagePayload {
        embeds: vec![embed],
        components: vec![summary_buttons(reference)],
        ..MessagePayload::default()
    }
}

fn summary_buttons(reference: &ReferenceId) -> ActionRow {
    let id = reference.as_str().to_owned();
    ActionRow::new(vec![
        Component::Button(Button::new(
            ButtonStyle::Primary,
            "🔄 Regenerate",
            &CustomId::Regenerate(id.clone()),
        )),
        Component::Button(Button::new(ButtonStyle::Secondary, "✏️ Edit", &CustomId::Edit(id))),
    ])
}

/// The form shown by the edit button; only the tag field can be pre-filled from storage.
pub fn edit_modal(reference: &StoredReference) -> ModalPayload {
    let tag = TextInput::new(TAG_FIELD, "Tag", TextInputStyle::Short, 100)
        .placeholder("e.g., AI / React / TypeScript")
        .value(reference.tags.clone());
    let summary = TextInput::new(SUMMARY_FIELD, "Summary", TextInputStyle::Paragraph, 2000)
        .placeholder("Enter your edited summary...");
    let interest =
        TextInput::new(INTEREST_FIELD, "Why it's interesting", TextInputStyle::Paragraph, 500)
            .placeholder("Enter why this is worth reading...");

    ModalPayload {
        custom_id: CustomId::EditModal(reference.id.as_str().to_owned()).to_string(),
        title: "Edit Summary".to_owned(),
        components: [tag, summary, interest]
            .into_iter()
            .map(|input| ActionRow::new(vec![Component::TextInput(input)]))
            .collect(),
    }
}

pub fn ephemeral_message(text: impl Into<String>) -> MessagePayload {
    MessagePayload {
        content: Some(text.into()),
        flags: Some(EPHEMERAL_FLAG),
        ..MessagePayload::default()
    }
}

pub fn error_message(error: &UserFacingError) -> MessagePayload {
    ephemeral_message(error.user_message())
}
