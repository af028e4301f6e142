//! MessageContent - Chat entry payloads
//!
//! An entry is either plain text or an interactive set of options the user
//! can pick from.

use serde::{Deserialize, Serialize};

/// Payload of a chat log entry.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageContent {
    /// Plain text (may contain `<br>` line breaks coming from the workflow engine)
    Text { text: String },

    /// Selectable options
    Options {
        /// Optional text shown above the options
        prompt: Option<String>,
        /// Option labels, in display order
        options: Vec<String>,
        /// Action tag returned by the relay (e.g. `select_platform`)
        action: Option<String>,
    },
}

impl MessageContent {
    /// Create text content
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Create an option set without a prompt or action
    pub fn options<I, S>(options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Options {
            prompt: None,
            options: options.into_iter().map(Into::into).collect(),
            action: None,
        }
    }

    /// Attach a prompt to an option set. No-op for text content.
    pub fn with_prompt(mut self, text: impl Into<String>) -> Self {
        if let Self::Options { prompt, .. } = &mut self {
            *prompt = Some(text.into());
        }
        self
    }

    /// Attach an action tag to an option set. No-op for text content.
    pub fn with_action(mut self, tag: impl Into<String>) -> Self {
        if let Self::Options { action, .. } = &mut self {
            *action = Some(tag.into());
        }
        self
    }

    /// Get the text if this is a text entry
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text } => Some(text),
            Self::Options { .. } => None,
        }
    }

    /// Get the option labels if this is an option set
    pub fn option_labels(&self) -> &[String] {
        match self {
            Self::Options { options, .. } => options,
            Self::Text { .. } => &[],
        }
    }

    /// Text rendering for terminals: `<br>` becomes a newline.
    pub fn plain_text(&self) -> String {
        match self {
            Self::Text { text } => text.replace("<br>", "\n"),
            Self::Options {
                prompt, options, ..
            } => {
                let mut out = prompt.clone().unwrap_or_default();
                for (idx, option) in options.iter().enumerate() {
                    if !out.is_empty() {
                        out.push('\n');
                    }
                    out.push_str(&format!("{}. {}", idx + 1, option));
                }
                out
            }
        }
    }
}

impl From<String> for MessageContent {
    fn from(text: String) -> Self {
        Self::text(text)
    }
}

impl From<&str> for MessageContent {
    fn from(text: &str) -> Self {
        Self::text(text)
    }
}
