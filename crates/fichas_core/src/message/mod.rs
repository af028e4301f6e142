//! Message module
//!
//! Chat log entries and their content types.

mod content;
mod entry;

pub use content::MessageContent;
pub use entry::{Message, Sender};
