use serde::Deserialize;
use serde_json::Value;

/// Subtype Slack stamps on messages posted by bot integrations.
pub const BOT_MESSAGE_SUBTYPE: &str = "bot_message";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SlackEvent {
    Hello,
    Goodbye,
    Message(MessageEvent),
    TeamJoin(TeamJoinEvent),
    Unsupported { event_type: String },
}

impl SlackEvent {
    /// Parses one RTM frame. Frames without a `type` (e.g. replies to our own sends) come back as
    /// `Unsupported`.
    pub fn from_json(frame: &str) -> Result<Self, serde_json::Error> {
        let value: Value = serde_json::from_str(frame)?;
        let event_type = value.get("type").and_then(Value::as_str).unwrap_or_default().to_owned();

        Ok(match event_type.as_str() {
            "hello" => Self::Hello,
            "goodbye" => Self::Goodbye,
            "message" => Self::Message(serde_json::from_value(value)?),
            "team_join" => Self::TeamJoin(serde_json::from_value(value)?),
            _ => Self::Unsupported { event_type },
        })
    }

    pub fn event_type(&self) -> SlackEventType {
        match self {
            Self::Hello => SlackEventType::Hello,
            Self::Goodbye => SlackEventType::Goodbye,
            Self::Message(_) => SlackEventType::Message,
            Self::TeamJoin(_) => SlackEventType::TeamJoin,
            Self::Unsupported { .. } => SlackEventType::Unsupported,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SlackEventType {
    Hello,
    Goodbye,
    Message,
    TeamJoin,
    Unsupported,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct MessageEvent {
    #[serde(default, rename = "channel")]
    pub channel_id: String,
    #[serde(default, rename = "user")]
    pub user_id: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub bot_id: String,
    #[serde(default)]
    pub subtype: String,
}

impl MessageEvent {
    /// Whether the message came from a bot (ourselves included) rather than a person.
    pub fn is_from_bot(&self) -> bool {
        !self.bot_id.is_empty() || self.user_id.is_empty() || self.subtype == BOT_MESSAGE_SUBTYPE
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct TeamJoinEvent {
    pub user: TeamMember,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct TeamMember {
    pub id: String,
    #[serde(default)]
    pub name: String,
}
