//! Binary encoding and `.odin` file persistence
//!
//! A `.odin` file holds the raw protobuf encoding of one message (or one
//! batch) with no header or framing.

use prost::Message as _;
use std::path::Path;
use tracing::debug;

use crate::batch::MessageBatch;
use crate::error::Result;
use crate::types::Message;
use crate::wire::{WireBatch, WireMessage};

/// File extension used for encoded messages
pub const FILE_EXTENSION: &str = "odin";

/// Encode a message to bytes. Identical messages encode to identical bytes.
pub fn encode_message(message: &Message) -> Vec<u8> {
    WireMessage::from(message).encode_to_vec()
}

/// Decode a message, failing with a serialization error if the bytes do
/// not describe a valid message
pub fn decode_message(bytes: &[u8]) -> Result<Message> {
    let wire = WireMessage::decode(bytes)?;
    Message::try_from(wire)
}

pub fn encode_batch(batch: &MessageBatch) -> Vec<u8> {
    WireBatch::from(batch).encode_to_vec()
}

pub fn decode_batch(bytes: &[u8]) -> Result<MessageBatch> {
    let wire = WireBatch::decode(bytes)?;
    MessageBatch::try_from(wire)
}

/// Write a message to `path`
pub fn save_message(path: impl AsRef<Path>, message: &Message) -> Result<()> {
    let path = path.as_ref();
    let bytes = encode_message(message);
    std::fs::write(path, &bytes)?;
    debug!(
        "Saved message {} ({} bytes) to {:?}",
        message.trace_id(),
        bytes.len(),
        path
    );
    Ok(())
}

/// Read a message from `path`
pub fn load_message(path: impl AsRef<Path>) -> Result<Message> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)?;
    let message = decode_message(&bytes)?;
    debug!("Loaded message {} from {:?}", message.trace_id(), path);
    Ok(message)
}

pub fn save_batch(path: impl AsRef<Path>, batch: &MessageBatch) -> Result<()> {
    let path = path.as_ref();
    std::fs::write(path, encode_batch(batch))?;
    debug!(
        "Saved batch {} with {} messages to {:?}",
        batch.batch_id,
        batch.len(),
        path
    );
    Ok(())
}

pub fn load_batch(path: impl AsRef<Path>) -> Result<MessageBatch> {
    let bytes = std::fs::read(path.as_ref())?;
    decode_batch(&bytes)
}
