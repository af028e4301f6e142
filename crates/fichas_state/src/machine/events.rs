//! Conversation events - Defines events that trigger state transitions

use fichas_core::Command;
use serde::{Deserialize, Serialize};

/// Why a session went back to `Inactive`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloseReason {
    /// User cancelled or closed the chat.
    Cancelled,
    /// Inactivity timer fired.
    TimedOut,
}

/// Defines the events that can trigger state transitions in the FSM.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationEvent {
    // ========== Identification ==========
    /// Chat widget opened.
    ChatOpened,

    /// A valid phone number was captured and the lookup dispatched.
    PhoneSubmitted,

    /// Lookup resolved to an existing user.
    LookupFound,

    /// Lookup resolved to "not found".
    LookupNotFound,

    // ========== Registration ==========
    /// User accepted the registration offer.
    RegistrationAccepted,

    /// Registration name captured.
    NameCaptured,

    /// Registration CUIL captured.
    CuilCaptured,

    /// Registration platform captured and the registration dispatched.
    PlatformCaptured,

    /// Registration accepted by the backend.
    RegistrationConfirmed,

    // ========== Commands ==========
    /// A main menu command was chosen.
    CommandSelected { command: Command },

    /// Withdrawal amount captured.
    AmountCaptured,

    /// Withdrawal platform captured and the withdrawal dispatched.
    WithdrawPlatformCaptured,

    /// Complaint text captured and dispatched.
    ComplaintCaptured,

    /// Free text relayed to the workflow engine.
    RelaySent,

    // ========== Network Outcomes ==========
    /// The outstanding call of a command sub-flow succeeded.
    RequestCompleted,

    /// The outstanding call failed; roll back to the pre-call state.
    RequestFailed,

    // ========== Lifecycle ==========
    /// Session reset to `Inactive`.
    SessionClosed { reason: CloseReason },
}

impl ConversationEvent {
    /// Short name for logs and errors.
    pub fn name(&self) -> &'static str {
        match self {
            Self::ChatOpened => "chat_opened",
            Self::PhoneSubmitted => "phone_submitted",
            Self::LookupFound => "lookup_found",
            Self::LookupNotFound => "lookup_not_found",
            Self::RegistrationAccepted => "registration_accepted",
            Self::NameCaptured => "name_captured",
            Self::CuilCaptured => "cuil_captured",
            Self::PlatformCaptured => "platform_captured",
            Self::RegistrationConfirmed => "registration_confirmed",
            Self::CommandSelected { .. } => "command_selected",
            Self::AmountCaptured => "amount_captured",
            Self::WithdrawPlatformCaptured => "withdraw_platform_captured",
            Self::ComplaintCaptured => "complaint_captured",
            Self::RelaySent => "relay_sent",
            Self::RequestCompleted => "request_completed",
            Self::RequestFailed => "request_failed",
            Self::SessionClosed { .. } => "session_closed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization() {
        let event = ConversationEvent::SessionClosed {
            reason: CloseReason::TimedOut,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["session_closed"]["reason"], "timed_out");
    }
}
