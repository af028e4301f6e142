//! Append-only chat log

use chrono::Utc;
use fichas_core::{Message, MessageContent, Sender};

/// Ordered chat entries. Entries are never removed or edited; the sequence
/// number of an entry is its position.
#[derive(Debug, Clone, Default)]
pub struct MessageLog {
    entries: Vec<Message>,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stamp `content` with the current time and the next sequence number.
    pub fn append(&mut self, content: impl Into<MessageContent>, sender: Sender) -> &Message {
        let seq = self.entries.len();
        self.entries.push(Message {
            seq,
            content: content.into(),
            sender,
            timestamp: Utc::now(),
        });
        &self.entries[seq]
    }

    pub fn entries(&self) -> &[Message] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.entries.last()
    }

    /// Entries appended at or after `seq`.
    pub fn since(&self, seq: usize) -> &[Message] {
        &self.entries[seq.min(self.entries.len())..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_assigns_sequence() {
        let mut log = MessageLog::new();
        assert!(log.is_empty());

        log.append("hola", Sender::User);
        let second = log.append(MessageContent::options(["a", "b"]), Sender::Bot);
        assert_eq!(second.seq, 1);

        assert_eq!(log.len(), 2);
        assert_eq!(log.entries()[0].content.as_text(), Some("hola"));
        assert_eq!(log.last().map(|m| m.sender), Some(Sender::Bot));
    }

    #[test]
    fn test_timestamps_are_monotonic() {
        let mut log = MessageLog::new();
        for i in 0..5 {
            log.append(format!("m{i}"), Sender::Bot);
        }
        let entries = log.entries();
        assert!(entries.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
        assert!(entries.iter().enumerate().all(|(i, m)| m.seq == i));
    }

    #[test]
    fn test_since() {
        let mut log = MessageLog::new();
        log.append("a", Sender::User);
        log.append("b", Sender::Bot);
        log.append("c", Sender::Admin);

        let tail = log.since(1);
        assert_eq!(tail.len(), 2);
        assert_eq!(tail[0].content.as_text(), Some("b"));
        assert!(log.since(10).is_empty());
    }
}
