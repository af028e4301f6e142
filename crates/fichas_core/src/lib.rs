//! fichas_core - Core types for the Gestor de Fichas chat
//!
//! This crate provides the foundational types used across the workspace:
//! - `message` - chat log entries, senders and interactive content
//! - `command` - the main command menu
//! - `validation` - phone, amount, CUIL and platform parsing
//! - `config` - service endpoints and session tuning

pub mod command;
pub mod config;
pub mod message;
pub mod paths;
pub mod validation;

// Re-export commonly used types
pub use command::{Command, OfferChoice};
pub use config::Config;
pub use message::{Message, MessageContent, Sender};
pub use validation::{Amount, Cuil, FullName, PhoneNumber, Platform, ValidationError};
