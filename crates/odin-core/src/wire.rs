//! Protobuf wire schema for `.odin` files
//!
//! Equivalent `.proto` definition, kept in sync with the field tags below:
//!
//! ```text
//! syntax = "proto3";
//! package odin.v1;
//!
//! enum Role {
//!   ROLE_UNSPECIFIED = 0;
//!   ROLE_ASSISTANT = 1;
//!   ROLE_TOOL = 2;
//!   ROLE_USER = 3;
//!   ROLE_MEDIATOR = 4;
//! }
//!
//! message HealingMetadata {
//!   string method = 1;
//!   double confidence = 2;
//!   string source_doc_id = 3;
//!   string notes = 4;
//!   repeated string applied_rules = 5;
//!   uint32 iteration_count = 6;
//! }
//!
//! message ConversationContext {
//!   string conversation_id = 1;
//!   uint32 turn_number = 2;
//!   string conversation_type = 3;
//!   string topic = 4;
//!   repeated string themes = 5;
//!   string emotional_state = 6;
//! }
//!
//! message PerformanceMetrics {
//!   double response_time_ms = 1;
//!   double coherence_score = 2;
//!   double relevance_score = 3;
//!   uint32 token_count = 4;
//!   double complexity_score = 5;
//!   string model_version = 6;
//! }
//!
//! message OdinMessage {
//!   string trace_id = 1;
//!   string session_id = 2;
//!   string sender_id = 3;
//!   string receiver_id = 4;
//!   Role role = 5;
//!   string raw_output = 6;
//!   string healed_output = 7;
//!   double semantic_drift = 8;
//!   HealingMetadata healing = 9;
//!   ConversationContext conversation = 10;
//!   PerformanceMetrics performance = 11;
//!   int64 timestamp_ms = 12;
//! }
//!
//! message OdinBatch {
//!   string batch_id = 1;
//!   int64 timestamp_ms = 2;
//!   repeated OdinMessage messages = 3;
//! }
//! ```

use crate::error::{Error, Result};
use crate::types::{ConversationContext, HealingMetadata, Message, PerformanceMetrics, Role};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum WireRole {
    Unspecified = 0,
    Assistant = 1,
    Tool = 2,
    User = 3,
    Mediator = 4,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct WireHealing {
    #[prost(string, tag = "1")]
    pub method: String,
    #[prost(double, tag = "2")]
    pub confidence: f64,
    #[prost(string, tag = "3")]
    pub source_doc_id: String,
    #[prost(string, tag = "4")]
    pub notes: String,
    #[prost(string, repeated, tag = "5")]
    pub applied_rules: Vec<String>,
    #[prost(uint32, tag = "6")]
    pub iteration_count: u32,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct WireConversation {
    #[prost(string, tag = "1")]
    pub conversation_id: String,
    #[prost(uint32, tag = "2")]
    pub turn_number: u32,
    #[prost(string, tag = "3")]
    pub conversation_type: String,
    #[prost(string, tag = "4")]
    pub topic: String,
    #[prost(string, repeated, tag = "5")]
    pub themes: Vec<String>,
    #[prost(string, tag = "6")]
    pub emotional_state: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct WirePerformance {
    #[prost(double, tag = "1")]
    pub response_time_ms: f64,
    #[prost(double, tag = "2")]
    pub coherence_score: f64,
    #[prost(double, tag = "3")]
    pub relevance_score: f64,
    #[prost(uint32, tag = "4")]
    pub token_count: u32,
    #[prost(double, tag = "5")]
    pub complexity_score: f64,
    #[prost(string, tag = "6")]
    pub model_version: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct WireMessage {
    #[prost(string, tag = "1")]
    pub trace_id: String,
    #[prost(string, tag = "2")]
    pub session_id: String,
    #[prost(string, tag = "3")]
    pub sender_id: String,
    #[prost(string, tag = "4")]
    pub receiver_id: String,
    #[prost(enumeration = "WireRole", tag = "5")]
    pub role: i32,
    #[prost(string, tag = "6")]
    pub raw_output: String,
    #[prost(string, tag = "7")]
    pub healed_output: String,
    #[prost(double, tag = "8")]
    pub semantic_drift: f64,
    #[prost(message, optional, tag = "9")]
    pub healing: Option<WireHealing>,
    #[prost(message, optional, tag = "10")]
    pub conversation: Option<WireConversation>,
    #[prost(message, optional, tag = "11")]
    pub performance: Option<WirePerformance>,
    #[prost(int64, tag = "12")]
    pub timestamp_ms: i64,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct WireBatch {
    #[prost(string, tag = "1")]
    pub batch_id: String,
    #[prost(int64, tag = "2")]
    pub timestamp_ms: i64,
    #[prost(message, repeated, tag = "3")]
    pub messages: Vec<WireMessage>,
}

impl From<Role> for WireRole {
    fn from(role: Role) -> Self {
        match role {
            Role::Assistant => WireRole::Assistant,
            Role::Tool => WireRole::Tool,
            Role::User => WireRole::User,
            Role::Mediator => WireRole::Mediator,
        }
    }
}

impl TryFrom<WireRole> for Role {
    type Error = Error;

    fn try_from(role: WireRole) -> Result<Self> {
        match role {
            WireRole::Assistant => Ok(Role::Assistant),
            WireRole::Tool => Ok(Role::Tool),
            WireRole::User => Ok(Role::User),
            WireRole::Mediator => Ok(Role::Mediator),
            WireRole::Unspecified => Err(Error::serialization("message role is unspecified")),
        }
    }
}

impl From<&HealingMetadata> for WireHealing {
    fn from(h: &HealingMetadata) -> Self {
        Self {
            method: h.method.clone(),
            confidence: h.confidence,
            source_doc_id: h.source_doc_id.clone(),
            notes: h.notes.clone(),
            applied_rules: h.applied_rules.clone(),
            iteration_count: h.iteration_count,
        }
    }
}

impl From<WireHealing> for HealingMetadata {
    fn from(h: WireHealing) -> Self {
        Self {
            method: h.method,
            confidence: h.confidence,
            source_doc_id: h.source_doc_id,
            notes: h.notes,
            applied_rules: h.applied_rules,
            iteration_count: h.iteration_count,
        }
    }
}

impl From<&ConversationContext> for WireConversation {
    fn from(c: &ConversationContext) -> Self {
        Self {
            conversation_id: c.conversation_id.clone(),
            turn_number: c.turn_number,
            conversation_type: c.conversation_type.clone(),
            topic: c.topic.clone(),
            themes: c.themes.clone(),
            emotional_state: c.emotional_state.clone(),
        }
    }
}

impl From<WireConversation> for ConversationContext {
    fn from(c: WireConversation) -> Self {
        Self {
            conversation_id: c.conversation_id,
            turn_number: c.turn_number,
            conversation_type: c.conversation_type,
            topic: c.topic,
            themes: c.themes,
            emotional_state: c.emotional_state,
        }
    }
}

impl From<&PerformanceMetrics> for WirePerformance {
    fn from(p: &PerformanceMetrics) -> Self {
        Self {
            response_time_ms: p.response_time_ms,
            coherence_score: p.coherence_score,
            relevance_score: p.relevance_score,
            token_count: p.token_count,
            complexity_score: p.complexity_score,
            model_version: p.model_version.clone(),
        }
    }
}

impl From<WirePerformance> for PerformanceMetrics {
    fn from(p: WirePerformance) -> Self {
        Self {
            response_time_ms: p.response_time_ms,
            coherence_score: p.coherence_score,
            relevance_score: p.relevance_score,
            token_count: p.token_count,
            complexity_score: p.complexity_score,
            model_version: p.model_version,
        }
    }
}

impl From<&Message> for WireMessage {
    fn from(m: &Message) -> Self {
        Self {
            trace_id: m.trace_id.clone(),
            session_id: m.session_id.clone(),
            sender_id: m.sender_id.clone(),
            receiver_id: m.receiver_id.clone(),
            role: WireRole::from(m.role) as i32,
            raw_output: m.raw_output.clone(),
            healed_output: m.healed_output.clone(),
            semantic_drift: m.semantic_drift,
            healing: m.healing.as_ref().map(WireHealing::from),
            conversation: m.conversation.as_ref().map(WireConversation::from),
            performance: m.performance.as_ref().map(WirePerformance::from),
            timestamp_ms: m.timestamp_ms,
        }
    }
}

impl TryFrom<WireMessage> for Message {
    type Error = Error;

    /// Rebuild a message through the builder so decoded values obey the
    /// same invariants as freshly built ones
    fn try_from(w: WireMessage) -> Result<Self> {
        let role = WireRole::try_from(w.role)
            .map_err(|_| Error::serialization(format!("unknown role value {}", w.role)))?;

        let mut builder = Message::builder()
            .identifiers(w.trace_id, w.session_id, w.sender_id, w.receiver_id)
            .role(Role::try_from(role)?)
            .content_with_healed(w.raw_output, w.healed_output)
            .semantic_drift(w.semantic_drift)
            .timestamp_ms(w.timestamp_ms);

        if let Some(healing) = w.healing {
            builder = builder.healing_metadata(healing.into());
        }
        if let Some(conversation) = w.conversation {
            builder = builder.conversation_context(conversation.into());
        }
        if let Some(performance) = w.performance {
            builder = builder.performance_metrics(performance.into());
        }

        builder.build().map_err(|e| match e {
            Error::Validation(msg) => Error::serialization(format!("invalid message: {}", msg)),
            other => other,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prost::Message as _;

    #[test]
    fn test_role_mapping() {
        for role in Role::ALL {
            let wire = WireRole::from(role);
            assert_eq!(Role::try_from(wire).unwrap(), role);
        }
        assert!(Role::try_from(WireRole::Unspecified).is_err());
    }

    #[test]
    fn test_unknown_role_value_rejected() {
        let wire = WireMessage {
            trace_id: "t".into(),
            session_id: "s".into(),
            sender_id: "a".into(),
            receiver_id: "b".into(),
            role: 42,
            ..Default::default()
        };
        let err = Message::try_from(wire).unwrap_err();
        assert!(matches!(err, Error::Serialization(ref msg) if msg.contains("42")));
    }

    #[test]
    fn test_empty_identifier_is_serialization_error() {
        let wire = WireMessage {
            role: WireRole::User as i32,
            ..Default::default()
        };
        let err = Message::try_from(wire).unwrap_err();
        assert!(matches!(err, Error::Serialization(_)));
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let wire = WireMessage {
            trace_id: "t".into(),
            session_id: "s".into(),
            sender_id: "a".into(),
            receiver_id: "b".into(),
            role: WireRole::Tool as i32,
            healing: Some(WireHealing {
                method: "rag".into(),
                applied_rules: vec!["r1".into(), "r2".into()],
                iteration_count: 2,
                ..Default::default()
            }),
            ..Default::default()
        };
        assert_eq!(wire.encode_to_vec(), wire.clone().encode_to_vec());
        assert_eq!(WireMessage::decode(wire.encode_to_vec().as_slice()).unwrap(), wire);
    }
}
