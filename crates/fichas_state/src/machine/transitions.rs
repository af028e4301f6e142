//! State transitions - FSM transition logic
//!
//! Implements the state machine that handles event-driven state transitions.
//! Unlike a permissive FSM, an event that has no meaning in the current state
//! is rejected so the caller never applies side effects for it.

use fichas_core::Command;
use thiserror::Error;

use super::events::ConversationEvent;
use super::states::ConversationState;

/// Error type for invalid state transitions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Invalid transition from {from:?} with event {event}")]
    InvalidTransition {
        from: ConversationState,
        event: String,
    },
}

/// Represents a state transition result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateTransition {
    /// The state before the transition.
    pub from: ConversationState,
    /// The state after the transition.
    pub to: ConversationState,
    /// The event that triggered the transition.
    pub event: ConversationEvent,
    /// Whether the state actually changed.
    pub changed: bool,
}

/// State machine for the end-user conversation.
#[derive(Debug, Clone)]
pub struct StateMachine {
    /// Current state.
    current_state: ConversationState,
    /// Transition history (limited).
    history: Vec<StateTransition>,
    /// Max history entries to keep.
    max_history: usize,
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl StateMachine {
    /// Create a new state machine in the Inactive state.
    pub fn new() -> Self {
        Self::with_state(ConversationState::Inactive)
    }

    /// Create a state machine with a specific initial state.
    pub fn with_state(state: ConversationState) -> Self {
        Self {
            current_state: state,
            history: Vec::new(),
            max_history: 50,
        }
    }

    /// Get the current state.
    pub fn state(&self) -> ConversationState {
        self.current_state
    }

    /// Get the transition history.
    pub fn history(&self) -> &[StateTransition] {
        &self.history
    }

    /// Handle an event and transition to a new state.
    pub fn handle_event(
        &mut self,
        event: ConversationEvent,
    ) -> Result<StateTransition, TransitionError> {
        let old_state = self.current_state;
        let new_state = Self::compute_next_state(old_state, &event).ok_or_else(|| {
            TransitionError::InvalidTransition {
                from: old_state,
                event: event.name().to_string(),
            }
        })?;
        let changed = old_state != new_state;

        self.current_state = new_state;
        tracing::debug!(from = ?old_state, to = ?new_state, event = event.name(), "conversation transition");

        let transition = StateTransition {
            from: old_state,
            to: new_state,
            event,
            changed,
        };

        self.history.push(transition.clone());
        if self.history.len() > self.max_history {
            self.history.remove(0);
        }

        Ok(transition)
    }

    /// Compute the next state given current state and event.
    fn compute_next_state(
        state: ConversationState,
        event: &ConversationEvent,
    ) -> Option<ConversationState> {
        use ConversationEvent::*;
        use ConversationState::*;

        let next = match (state, event) {
            // ========== Lifecycle ==========
            (_, SessionClosed { .. }) => Inactive,
            (Inactive, ChatOpened) => AwaitingPhone,
            (AwaitingPhone, ChatOpened) => AwaitingPhone,

            // ========== Identification ==========
            (Inactive | AwaitingPhone, PhoneSubmitted) => LookupPending,
            (LookupPending, LookupFound) => AwaitingCommand,
            (LookupPending, LookupNotFound) => RegistrationOffered,

            // ========== Registration ==========
            (RegistrationOffered, RegistrationAccepted) => AwaitingRegistrationName,
            (AwaitingRegistrationName, NameCaptured) => AwaitingRegistrationCuil,
            (AwaitingRegistrationCuil, CuilCaptured) => AwaitingRegistrationPlatform,
            (AwaitingRegistrationPlatform, PlatformCaptured) => RegistrationPending,
            (RegistrationPending, RegistrationConfirmed) => AwaitingCommand,

            // ========== Commands ==========
            (
                AwaitingCommand | AwaitingWithdrawAmount | AwaitingWithdrawPlatform
                | AwaitingComplaintText,
                CommandSelected {
                    command: Command::Cancelar,
                },
            ) => AwaitingCommand,
            (
                AwaitingCommand,
                CommandSelected {
                    command: Command::Retiro,
                },
            ) => AwaitingWithdrawAmount,
            (
                AwaitingCommand,
                CommandSelected {
                    command: Command::Mensaje,
                },
            ) => AwaitingComplaintText,
            (
                AwaitingCommand,
                CommandSelected {
                    command: Command::Historial,
                },
            ) => ViewingHistory,
            (AwaitingCommand, RelaySent) => RelayPending,

            (AwaitingWithdrawAmount, AmountCaptured) => AwaitingWithdrawPlatform,
            (AwaitingWithdrawPlatform, WithdrawPlatformCaptured) => WithdrawPending,
            (AwaitingComplaintText, ComplaintCaptured) => ComplaintPending,

            // ========== Network Outcomes ==========
            (WithdrawPending | ComplaintPending | ViewingHistory | RelayPending, RequestCompleted) => {
                AwaitingCommand
            }
            (pending, RequestFailed) => return pending.pre_call_state(),

            // ========== Default: rejected ==========
            _ => return None,
        };
        Some(next)
    }

    /// Check if a transition is valid without executing it.
    pub fn can_transition(&self, event: &ConversationEvent) -> bool {
        Self::compute_next_state(self.current_state, event).is_some()
    }
}
