//! Fluent construction of [`Message`] values

use crate::error::{Error, Result};
use crate::types::{
    clamp_score, now_millis, ConversationContext, HealingMetadata, Message, PerformanceMetrics,
    Role,
};

/// Builder that accumulates fields into a single [`Message`].
///
/// Every setter takes the builder by value and returns it, and
/// [`build`](MessageBuilder::build) consumes it, so a builder can't be
/// reused or mutated after the message is produced. Bounded scores are
/// clamped into `[0.0, 1.0]` when set.
///
/// ```
/// use odin_core::{MessageBuilder, Role};
///
/// let message = MessageBuilder::new()
///     .identifiers("t1", "s1", "agent-a", "agent-b")
///     .role(Role::Assistant)
///     .content("hello")
///     .semantic_drift(5.0)
///     .build()
///     .unwrap();
///
/// assert_eq!(message.healed_output(), "hello");
/// assert_eq!(message.semantic_drift(), 1.0);
/// ```
#[derive(Debug, Clone)]
pub struct MessageBuilder {
    trace_id: String,
    session_id: String,
    sender_id: String,
    receiver_id: String,
    role: Role,
    raw_output: String,
    healed_output: Option<String>,
    semantic_drift: f64,
    healing: Option<HealingMetadata>,
    conversation: Option<ConversationContext>,
    performance: Option<PerformanceMetrics>,
    timestamp_ms: i64,
}

impl MessageBuilder {
    /// Create a builder stamped with the current time
    pub fn new() -> Self {
        Self {
            trace_id: String::new(),
            session_id: String::new(),
            sender_id: String::new(),
            receiver_id: String::new(),
            role: Role::default(),
            raw_output: String::new(),
            healed_output: None,
            semantic_drift: 0.0,
            healing: None,
            conversation: None,
            performance: None,
            timestamp_ms: now_millis(),
        }
    }

    /// Set the trace, session, sender and receiver ids
    pub fn identifiers(
        mut self,
        trace_id: impl Into<String>,
        session_id: impl Into<String>,
        sender_id: impl Into<String>,
        receiver_id: impl Into<String>,
    ) -> Self {
        self.trace_id = trace_id.into();
        self.session_id = session_id.into();
        self.sender_id = sender_id.into();
        self.receiver_id = receiver_id.into();
        self
    }

    pub fn role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }

    /// Set the role from a string, rejecting anything outside the role set
    pub fn role_str(self, role: &str) -> Result<Self> {
        Ok(self.role(role.parse()?))
    }

    /// Set raw content; the healed output defaults to the same text
    pub fn content(mut self, raw: impl Into<String>) -> Self {
        self.raw_output = raw.into();
        self.healed_output = None;
        self
    }

    /// Set raw content together with its healed form
    pub fn content_with_healed(mut self, raw: impl Into<String>, healed: impl Into<String>) -> Self {
        self.raw_output = raw.into();
        self.healed_output = Some(healed.into());
        self
    }

    pub fn semantic_drift(mut self, score: f64) -> Self {
        self.semantic_drift = clamp_score(score);
        self
    }

    pub fn healing_metadata(mut self, healing: HealingMetadata) -> Self {
        self.healing = Some(healing.normalized());
        self
    }

    pub fn conversation_context(mut self, conversation: ConversationContext) -> Self {
        self.conversation = Some(conversation);
        self
    }

    pub fn performance_metrics(mut self, performance: PerformanceMetrics) -> Self {
        self.performance = Some(performance.normalized());
        self
    }

    /// Override the construction-time timestamp (milliseconds since epoch)
    pub fn timestamp_ms(mut self, timestamp_ms: i64) -> Self {
        self.timestamp_ms = timestamp_ms;
        self
    }

    /// Finish the message.
    ///
    /// Fails with [`Error::Validation`] if any identifier is empty.
    pub fn build(self) -> Result<Message> {
        for (field, value) in [
            ("trace_id", &self.trace_id),
            ("session_id", &self.session_id),
            ("sender_id", &self.sender_id),
            ("receiver_id", &self.receiver_id),
        ] {
            if value.trim().is_empty() {
                return Err(Error::validation(format!("{} must not be empty", field)));
            }
        }

        let healed_output = self
            .healed_output
            .unwrap_or_else(|| self.raw_output.clone());

        Ok(Message {
            trace_id: self.trace_id,
            session_id: self.session_id,
            sender_id: self.sender_id,
            receiver_id: self.receiver_id,
            role: self.role,
            raw_output: self.raw_output,
            healed_output,
            semantic_drift: self.semantic_drift,
            healing: self.healing,
            conversation: self.conversation,
            performance: self.performance,
            timestamp_ms: self.timestamp_ms,
        })
    }
}

impl Default for MessageBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Message> for MessageBuilder {
    fn from(message: Message) -> Self {
        Self {
            trace_id: message.trace_id,
            session_id: message.session_id,
            sender_id: message.sender_id,
            receiver_id: message.receiver_id,
            role: message.role,
            raw_output: message.raw_output,
            healed_output: Some(message.healed_output),
            semantic_drift: message.semantic_drift,
            healing: message.healing,
            conversation: message.conversation,
            performance: message.performance,
            timestamp_ms: message.timestamp_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> MessageBuilder {
        MessageBuilder::new().identifiers("t1", "s1", "a", "b")
    }

    #[test]
    fn test_minimal_message() {
        let message = base().role(Role::Assistant).content("hello").build().unwrap();

        assert_eq!(message.trace_id(), "t1");
        assert_eq!(message.session_id(), "s1");
        assert_eq!(message.sender_id(), "a");
        assert_eq!(message.receiver_id(), "b");
        assert_eq!(message.role(), Role::Assistant);
        assert_eq!(message.raw_output(), "hello");
        assert_eq!(message.healed_output(), "hello");
        assert!(!message.was_healed());
        assert!(message.healing().is_none());
        assert!(message.timestamp_ms() > 0);
    }

    #[test]
    fn test_empty_identifier_rejected() {
        let err = MessageBuilder::new()
            .identifiers("t1", "", "a", "b")
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::Validation(ref msg) if msg.contains("session_id")));

        let err = MessageBuilder::new().build().unwrap_err();
        assert!(matches!(err, Error::Validation(ref msg) if msg.contains("trace_id")));
    }

    #[test]
    fn test_duplicate_identifiers_allowed() {
        let message = MessageBuilder::new()
            .identifiers("same", "same", "same", "same")
            .build()
            .unwrap();
        assert_eq!(message.sender_id(), message.receiver_id());
    }

    #[test]
    fn test_scores_are_clamped() {
        let message = base()
            .semantic_drift(5.0)
            .healing_metadata(HealingMetadata {
                method: "manual".into(),
                confidence: -3.0,
                source_doc_id: String::new(),
                notes: String::new(),
                applied_rules: vec![],
                iteration_count: 0,
            })
            .performance_metrics(PerformanceMetrics {
                response_time_ms: 120.0,
                coherence_score: 2.0,
                relevance_score: -1.0,
                token_count: 42,
                complexity_score: 0.5,
                model_version: "v1".into(),
            })
            .build()
            .unwrap();

        assert_eq!(message.semantic_drift(), 1.0);
        let healing = message.healing().unwrap();
        assert_eq!(healing.confidence, 0.0);
        assert_eq!(healing.iteration_count, 1);
        let perf = message.performance().unwrap();
        assert_eq!(perf.coherence_score, 1.0);
        assert_eq!(perf.relevance_score, 0.0);
        assert_eq!(perf.response_time_ms, 120.0);
        assert_eq!(perf.token_count, 42);
    }

    #[test]
    fn test_content_resets_healed() {
        let message = base()
            .content_with_healed("raw", "fixed")
            .content("raw again")
            .build()
            .unwrap();
        assert_eq!(message.healed_output(), "raw again");
    }

    #[test]
    fn test_role_str() {
        let message = base().role_str("user").unwrap().build().unwrap();
        assert_eq!(message.role(), Role::User);
        assert!(base().role_str("narrator").is_err());
    }

    #[test]
    fn test_explicit_timestamp() {
        let message = base().timestamp_ms(1_234).build().unwrap();
        assert_eq!(message.timestamp_ms(), 1_234);
    }

    #[test]
    fn test_into_builder_preserves_fields() {
        let original = base()
            .content_with_healed("a", "b")
            .conversation_context(ConversationContext::new("c1", 3).with_topic("rust"))
            .build()
            .unwrap();

        let copy = original.clone().into_builder().build().unwrap();
        assert_eq!(copy, original);

        let retargeted = original
            .clone()
            .into_builder()
            .identifiers("t2", "s1", "b", "a")
            .build()
            .unwrap();
        assert_eq!(retargeted.trace_id(), "t2");
        assert_eq!(retargeted.healed_output(), "b");
    }
}
