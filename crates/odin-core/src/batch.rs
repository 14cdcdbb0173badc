//! Ordered message batches

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::{now_millis, Message};
use crate::wire::WireBatch;

/// An ordered group of messages sharing a batch id.
///
/// Order is exactly the order messages were supplied in. No deduplication.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageBatch {
    pub batch_id: String,

    /// Batch creation time, milliseconds since epoch
    pub timestamp_ms: i64,

    pub messages: Vec<Message>,
}

impl MessageBatch {
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Message> {
        self.messages.iter()
    }
}

impl IntoIterator for MessageBatch {
    type Item = Message;
    type IntoIter = std::vec::IntoIter<Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.messages.into_iter()
    }
}

/// Package messages into a batch.
///
/// An empty `batch_id` gets a generated `batch_<uuid>` id.
pub fn create_batch(messages: Vec<Message>, batch_id: impl Into<String>) -> MessageBatch {
    let batch_id = batch_id.into();
    let batch_id = if batch_id.trim().is_empty() {
        generate_batch_id()
    } else {
        batch_id
    };

    MessageBatch {
        batch_id,
        timestamp_ms: now_millis(),
        messages,
    }
}

fn generate_batch_id() -> String {
    format!("batch_{}", uuid::Uuid::new_v4())
}

impl From<&MessageBatch> for WireBatch {
    fn from(batch: &MessageBatch) -> Self {
        Self {
            batch_id: batch.batch_id.clone(),
            timestamp_ms: batch.timestamp_ms,
            messages: batch.messages.iter().map(Into::into).collect(),
        }
    }
}

impl TryFrom<WireBatch> for MessageBatch {
    type Error = Error;

    fn try_from(wire: WireBatch) -> Result<Self> {
        let messages = wire
            .messages
            .into_iter()
            .enumerate()
            .map(|(index, m)| {
                Message::try_from(m).map_err(|e| match e {
                    Error::Serialization(msg) => {
                        Error::serialization(format!("batch message {}: {}", index, msg))
                    }
                    other => other,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            batch_id: wire.batch_id,
            timestamp_ms: wire.timestamp_ms,
            messages,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(trace: &str) -> Message {
        Message::builder()
            .identifiers(trace, "s1", "a", "b")
            .content(format!("content of {}", trace))
            .build()
            .unwrap()
    }

    #[test]
    fn test_batch_preserves_order() {
        let batch = create_batch(vec![message("m1"), message("m2"), message("m3")], "b-1");

        assert_eq!(batch.batch_id, "b-1");
        assert_eq!(batch.len(), 3);
        let traces: Vec<&str> = batch.iter().map(|m| m.trace_id()).collect();
        assert_eq!(traces, vec!["m1", "m2", "m3"]);
    }

    #[test]
    fn test_generated_batch_id() {
        let a = create_batch(vec![], "");
        let b = create_batch(vec![], "  ");
        assert!(a.batch_id.starts_with("batch_"));
        assert!(b.batch_id.starts_with("batch_"));
        assert_ne!(a.batch_id, b.batch_id);
        assert!(a.is_empty());
    }

    #[test]
    fn test_duplicates_kept() {
        let m = message("dup");
        let batch = create_batch(vec![m.clone(), m.clone()], "dups");
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.messages[0], batch.messages[1]);
    }
}
