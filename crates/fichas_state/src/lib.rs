//! fichas_state - State machine for the end-user conversation
//!
//! This crate provides the FSM that drives the chat from the phone prompt
//! through registration and the command sub-flows.

pub mod machine;

// Re-export commonly used types
pub use machine::{
    CloseReason, ConversationEvent, ConversationState, StateMachine, StateTransition, TransitionError,
};
