//! ODIN Core
//!
//! Message model and serialization for ODIN Protocol messages exchanged
//! between AI systems.
//!
//! This crate provides:
//! - The `Message` record and its optional healing, conversation and
//!   performance substructures
//! - A fluent `MessageBuilder` that clamps scores and validates identifiers
//! - A deterministic protobuf codec and `.odin` file persistence
//! - Ordered message batches
//! - Error types and result handling

pub mod batch;
pub mod builder;
pub mod codec;
pub mod error;
pub mod types;
pub mod wire;

pub use batch::{create_batch, MessageBatch};
pub use builder::MessageBuilder;
pub use codec::{
    decode_batch, decode_message, encode_batch, encode_message, load_batch, load_message,
    save_batch, save_message,
};
pub use error::{Error, Result};
pub use types::{ConversationContext, HealingMetadata, Message, PerformanceMetrics, Role};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::batch::{create_batch, MessageBatch};
    pub use crate::builder::MessageBuilder;
    pub use crate::codec::{decode_message, encode_message, load_message, save_message};
    pub use crate::error::{Error, Result};
    pub use crate::types::{ConversationContext, HealingMetadata, Message, PerformanceMetrics, Role};
}
