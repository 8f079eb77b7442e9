//! Message entity - represents a chat message

use crate::value_objects::BoundedName;

/// Channel message. Immutable once stored; never deleted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelMessage {
    pub id: u32,
    pub channel_id: u32,
    pub sender_id: u32,
    /// Sender username captured when the message was inserted
    pub sender_username: BoundedName,
    pub content: String,
}

impl ChannelMessage {
    /// Create a new ChannelMessage
    pub fn new(
        id: u32,
        channel_id: u32,
        sender_id: u32,
        sender_username: BoundedName,
        content: String,
    ) -> Self {
        Self {
            id,
            channel_id,
            sender_id,
            sender_username,
            content,
        }
    }

    /// Length of the content in bytes, excluding the wire terminator
    #[inline]
    pub fn content_len(&self) -> usize {
        self.content.len()
    }

    /// Check if message content is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

/// What the gateway hands back after storing a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertedMessage {
    pub id: u32,
    pub sender_username: BoundedName,
}

impl InsertedMessage {
    /// Combine the insert result with the request data into the stored message
    pub fn into_message(self, channel_id: u32, sender_id: u32, content: String) -> ChannelMessage {
        ChannelMessage::new(self.id, channel_id, sender_id, self.sender_username, content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inserted_into_message() {
        let inserted = InsertedMessage {
            id: 42,
            sender_username: BoundedName::new("bob").unwrap(),
        };
        let msg = inserted.into_message(3, 9, "hello".to_string());
        assert_eq!(msg.id, 42);
        assert_eq!(msg.channel_id, 3);
        assert_eq!(msg.sender_id, 9);
        assert_eq!(msg.sender_username.as_str(), "bob");
        assert_eq!(msg.content_len(), 5);
        assert!(!msg.is_empty());
    }
}
