use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::MessageContent;

/// Who authored a chat entry.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Bot,
    Admin,
}

impl Sender {
    /// Map the `rol` field used by the workflow engine. Unknown roles are bot.
    pub fn from_role(role: &str) -> Self {
        match role.trim().to_ascii_lowercase().as_str() {
            "user" | "usuario" => Self::User,
            "admin" | "soporte" => Self::Admin,
            _ => Self::Bot,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Bot => "bot",
            Self::Admin => "admin",
        }
    }
}

/// A single entry of the chat log. Immutable once appended.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Message {
    /// Position in the log (0-based)
    pub seq: usize,
    pub content: MessageContent,
    pub sender: Sender,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Local display time (HH:MM), as shown next to each bubble.
    pub fn display_time(&self) -> String {
        self.timestamp
            .with_timezone(&chrono::Local)
            .format("%H:%M")
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sender_from_role() {
        assert_eq!(Sender::from_role("admin"), Sender::Admin);
        assert_eq!(Sender::from_role(" USER "), Sender::User);
        assert_eq!(Sender::from_role("bot"), Sender::Bot);
        assert_eq!(Sender::from_role("sistema"), Sender::Bot);
    }

    #[test]
    fn test_sender_serializes_lowercase() {
        let json = serde_json::to_string(&Sender::Admin).unwrap();
        assert_eq!(json, "\"admin\"");
    }
}
