//! Conversation states - Every step of the end-user chat
//!
//! Each multi-step prompt and each outstanding network call has its own
//! explicit state, so the next free-text message is always interpreted one
//! way only.

use serde::{Deserialize, Serialize};

/// Defines the possible states of an end-user conversation.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConversationState {
    // ========== Identification ==========
    /// Chat closed; the welcome screen is shown.
    #[default]
    Inactive,

    /// Waiting for the user's phone number.
    AwaitingPhone,

    /// Lookup request in flight.
    LookupPending,

    // ========== Registration ==========
    /// Phone not found; "registrarme" / "cancelar" offered.
    RegistrationOffered,

    /// Waiting for the full name.
    AwaitingRegistrationName,

    /// Waiting for the CUIL.
    AwaitingRegistrationCuil,

    /// Waiting for the platform.
    AwaitingRegistrationPlatform,

    /// Registration request in flight.
    RegistrationPending,

    // ========== Commands ==========
    /// Registered; main menu shown.
    AwaitingCommand,

    /// Withdrawal: waiting for the amount.
    AwaitingWithdrawAmount,

    /// Withdrawal: waiting for the platform.
    AwaitingWithdrawPlatform,

    /// Withdrawal request in flight.
    WithdrawPending,

    /// Complaint: waiting for the text.
    AwaitingComplaintText,

    /// Complaint request in flight.
    ComplaintPending,

    /// History request in flight.
    ViewingHistory,

    /// Free text relayed to the workflow engine, reply pending.
    RelayPending,
}

impl ConversationState {
    /// Check if a network call is outstanding in this state.
    pub fn is_pending(&self) -> bool {
        matches!(
            self,
            Self::LookupPending
                | Self::RegistrationPending
                | Self::WithdrawPending
                | Self::ComplaintPending
                | Self::ViewingHistory
                | Self::RelayPending
        )
    }

    /// Check if this state accepts free-text input.
    pub fn accepts_user_input(&self) -> bool {
        !self.is_pending()
    }

    /// Check if the user is identified and registered in this state.
    pub fn is_registered(&self) -> bool {
        matches!(
            self,
            Self::AwaitingCommand
                | Self::AwaitingWithdrawAmount
                | Self::AwaitingWithdrawPlatform
                | Self::WithdrawPending
                | Self::AwaitingComplaintText
                | Self::ComplaintPending
                | Self::ViewingHistory
                | Self::RelayPending
        )
    }

    /// Check if this is one of the registration prompts.
    pub fn is_registration_flow(&self) -> bool {
        matches!(
            self,
            Self::RegistrationOffered
                | Self::AwaitingRegistrationName
                | Self::AwaitingRegistrationCuil
                | Self::AwaitingRegistrationPlatform
                | Self::RegistrationPending
        )
    }

    /// The state a failed call rolls back to. `None` when no call is pending.
    pub fn pre_call_state(&self) -> Option<Self> {
        match self {
            Self::LookupPending => Some(Self::AwaitingPhone),
            Self::RegistrationPending => Some(Self::AwaitingRegistrationPlatform),
            Self::WithdrawPending => Some(Self::AwaitingWithdrawPlatform),
            Self::ComplaintPending => Some(Self::AwaitingComplaintText),
            Self::ViewingHistory | Self::RelayPending => Some(Self::AwaitingCommand),
            _ => None,
        }
    }

    /// Input placeholder for this state.
    pub fn placeholder(&self) -> &'static str {
        match self {
            Self::Inactive | Self::AwaitingPhone => "Escribe tu número de teléfono...",
            Self::RegistrationOffered => "Escribe \"registrarme\" o \"cancelar\"...",
            Self::AwaitingRegistrationName => "Escribe tu nombre completo...",
            Self::AwaitingRegistrationCuil => "Escribe tu CUIL...",
            Self::AwaitingRegistrationPlatform | Self::AwaitingWithdrawPlatform => {
                "Escribe la plataforma..."
            }
            Self::AwaitingWithdrawAmount => "Escribe el monto a retirar...",
            Self::AwaitingComplaintText => "Describe tu reclamo...",
            Self::AwaitingCommand => "Escribe un mensaje...",
            _ => "Esperando respuesta...",
        }
    }

    /// Get a human-readable description of the current state.
    pub fn description(&self) -> &str {
        match self {
            Self::Inactive => "Chat closed",
            Self::AwaitingPhone => "Waiting for phone number",
            Self::LookupPending => "Looking up user",
            Self::RegistrationOffered => "Offering registration",
            Self::RegistrationPending => "Registering user",
            Self::AwaitingCommand => "Ready for a command",
            Self::WithdrawPending => "Sending withdrawal",
            Self::ComplaintPending => "Sending complaint",
            Self::ViewingHistory => "Loading history",
            Self::RelayPending => "Waiting for reply",
            _ => "Collecting input",
        }
    }
}
