//! State machine module
//!
//! Contains the FSM implementation for the conversation lifecycle.

mod events;
mod states;
mod transitions;

pub use events::{CloseReason, ConversationEvent};
pub use states::ConversationState;
pub use transitions::{StateMachine, StateTransition, TransitionError};
