//! Core types for ODIN messages

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::builder::MessageBuilder;
use crate::error::Error;

/// Saturate a score into `[0.0, 1.0]`. `NaN` becomes `0.0`.
pub fn clamp_score(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Saturate a non-negative quantity. Negative and `NaN` inputs become `0.0`.
pub fn clamp_non_negative(value: f64) -> f64 {
    if value.is_nan() || value < 0.0 {
        0.0
    } else {
        value
    }
}

/// Current time in milliseconds since the Unix epoch
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Role of the party that produced a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum Role {
    #[default]
    Assistant,
    Tool,
    User,
    Mediator,
}

impl Role {
    /// All roles, in wire order
    pub const ALL: [Role; 4] = [Role::Assistant, Role::Tool, Role::User, Role::Mediator];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Assistant => "assistant",
            Role::Tool => "tool",
            Role::User => "user",
            Role::Mediator => "mediator",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .iter()
            .copied()
            .find(|role| role.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                Error::validation(format!(
                    "unknown role '{}', expected one of assistant, tool, user, mediator",
                    s
                ))
            })
    }
}

impl TryFrom<String> for Role {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// How and why a message's content was corrected relative to its raw form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealingMetadata {
    /// Name of the healing method applied
    pub method: String,

    /// Confidence in the correction (0.0-1.0)
    pub confidence: f64,

    /// Document the correction was sourced from
    #[serde(default)]
    pub source_doc_id: String,

    /// Free-text notes
    #[serde(default)]
    pub notes: String,

    /// Rules applied, in application order
    #[serde(default)]
    pub applied_rules: Vec<String>,

    /// Number of healing iterations (at least 1)
    #[serde(default = "default_iteration_count")]
    pub iteration_count: u32,
}

fn default_iteration_count() -> u32 {
    1
}

impl HealingMetadata {
    /// Create healing metadata with a method and confidence
    pub fn new(method: impl Into<String>, confidence: f64) -> Self {
        Self {
            method: method.into(),
            confidence: clamp_score(confidence),
            source_doc_id: String::new(),
            notes: String::new(),
            applied_rules: Vec::new(),
            iteration_count: default_iteration_count(),
        }
    }

    /// Set the source document id
    pub fn with_source_doc_id(mut self, source_doc_id: impl Into<String>) -> Self {
        self.source_doc_id = source_doc_id.into();
        self
    }

    /// Set notes
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    /// Set the applied rules
    pub fn with_applied_rules<I, S>(mut self, rules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.applied_rules = rules.into_iter().map(Into::into).collect();
        self
    }

    /// Set the iteration count; zero saturates to one
    pub fn with_iteration_count(mut self, count: u32) -> Self {
        self.iteration_count = count.max(1);
        self
    }

    pub(crate) fn normalized(mut self) -> Self {
        self.confidence = clamp_score(self.confidence);
        self.iteration_count = self.iteration_count.max(1);
        self
    }
}

/// Conversation a message belongs to
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ConversationContext {
    pub conversation_id: String,

    /// Turn number within the conversation
    #[serde(default)]
    pub turn_number: u32,

    #[serde(default)]
    pub conversation_type: String,

    #[serde(default)]
    pub topic: String,

    /// Themes, in order of appearance
    #[serde(default)]
    pub themes: Vec<String>,

    #[serde(default)]
    pub emotional_state: String,
}

impl ConversationContext {
    /// Create a context for a conversation turn
    pub fn new(conversation_id: impl Into<String>, turn_number: u32) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            turn_number,
            ..Default::default()
        }
    }

    pub fn with_type(mut self, conversation_type: impl Into<String>) -> Self {
        self.conversation_type = conversation_type.into();
        self
    }

    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = topic.into();
        self
    }

    pub fn with_themes<I, S>(mut self, themes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.themes = themes.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_emotional_state(mut self, state: impl Into<String>) -> Self {
        self.emotional_state = state.into();
        self
    }
}

/// Performance measurements attached to a message
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    /// Response time in milliseconds
    pub response_time_ms: f64,

    /// Coherence score (0.0-1.0)
    #[serde(default)]
    pub coherence_score: f64,

    /// Relevance score (0.0-1.0)
    #[serde(default)]
    pub relevance_score: f64,

    #[serde(default)]
    pub token_count: u32,

    /// Complexity score (0.0-1.0)
    #[serde(default)]
    pub complexity_score: f64,

    #[serde(default)]
    pub model_version: String,
}

impl PerformanceMetrics {
    /// Create metrics with a response time
    pub fn new(response_time_ms: f64) -> Self {
        Self {
            response_time_ms: clamp_non_negative(response_time_ms),
            ..Default::default()
        }
    }

    /// Set coherence and relevance scores
    pub fn with_scores(mut self, coherence: f64, relevance: f64) -> Self {
        self.coherence_score = clamp_score(coherence);
        self.relevance_score = clamp_score(relevance);
        self
    }

    pub fn with_complexity(mut self, complexity: f64) -> Self {
        self.complexity_score = clamp_score(complexity);
        self
    }

    pub fn with_token_count(mut self, token_count: u32) -> Self {
        self.token_count = token_count;
        self
    }

    pub fn with_model_version(mut self, model_version: impl Into<String>) -> Self {
        self.model_version = model_version.into();
        self
    }

    pub(crate) fn normalized(mut self) -> Self {
        self.response_time_ms = clamp_non_negative(self.response_time_ms);
        self.coherence_score = clamp_score(self.coherence_score);
        self.relevance_score = clamp_score(self.relevance_score);
        self.complexity_score = clamp_score(self.complexity_score);
        self
    }
}

/// One structured communication record between two named parties.
///
/// A `Message` is immutable once built: the only ways to obtain one are
/// [`MessageBuilder::build`], decoding, or JSON deserialization, and all
/// three apply the same validation and clamping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "MessageFields")]
pub struct Message {
    pub(crate) trace_id: String,
    pub(crate) session_id: String,
    pub(crate) sender_id: String,
    pub(crate) receiver_id: String,
    pub(crate) role: Role,
    pub(crate) raw_output: String,
    pub(crate) healed_output: String,
    pub(crate) semantic_drift: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) healing: Option<HealingMetadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) conversation: Option<ConversationContext>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) performance: Option<PerformanceMetrics>,
    pub(crate) timestamp_ms: i64,
}

impl Message {
    /// Start building a new message
    pub fn builder() -> MessageBuilder {
        MessageBuilder::new()
    }

    /// Start a builder pre-filled with this message's fields
    pub fn into_builder(self) -> MessageBuilder {
        MessageBuilder::from(self)
    }

    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn sender_id(&self) -> &str {
        &self.sender_id
    }

    pub fn receiver_id(&self) -> &str {
        &self.receiver_id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn raw_output(&self) -> &str {
        &self.raw_output
    }

    pub fn healed_output(&self) -> &str {
        &self.healed_output
    }

    /// Whether healing changed the content
    pub fn was_healed(&self) -> bool {
        self.raw_output != self.healed_output
    }

    pub fn semantic_drift(&self) -> f64 {
        self.semantic_drift
    }

    pub fn healing(&self) -> Option<&HealingMetadata> {
        self.healing.as_ref()
    }

    pub fn conversation(&self) -> Option<&ConversationContext> {
        self.conversation.as_ref()
    }

    pub fn performance(&self) -> Option<&PerformanceMetrics> {
        self.performance.as_ref()
    }

    /// Milliseconds since the Unix epoch
    pub fn timestamp_ms(&self) -> i64 {
        self.timestamp_ms
    }
}

/// Unvalidated field set used when deserializing a [`Message`] from JSON
#[derive(Deserialize)]
struct MessageFields {
    trace_id: String,
    session_id: String,
    sender_id: String,
    receiver_id: String,
    #[serde(default)]
    role: Role,
    #[serde(default)]
    raw_output: String,
    #[serde(default)]
    healed_output: Option<String>,
    #[serde(default)]
    semantic_drift: f64,
    #[serde(default)]
    healing: Option<HealingMetadata>,
    #[serde(default)]
    conversation: Option<ConversationContext>,
    #[serde(default)]
    performance: Option<PerformanceMetrics>,
    #[serde(default)]
    timestamp_ms: Option<i64>,
}

impl TryFrom<MessageFields> for Message {
    type Error = Error;

    fn try_from(fields: MessageFields) -> Result<Self, Self::Error> {
        let mut builder = MessageBuilder::new()
            .identifiers(
                fields.trace_id,
                fields.session_id,
                fields.sender_id,
                fields.receiver_id,
            )
            .role(fields.role)
            .semantic_drift(fields.semantic_drift);

        builder = match fields.healed_output {
            Some(healed) => builder.content_with_healed(fields.raw_output, healed),
            None => builder.content(fields.raw_output),
        };
        if let Some(healing) = fields.healing {
            builder = builder.healing_metadata(healing);
        }
        if let Some(conversation) = fields.conversation {
            builder = builder.conversation_context(conversation);
        }
        if let Some(performance) = fields.performance {
            builder = builder.performance_metrics(performance);
        }
        if let Some(timestamp_ms) = fields.timestamp_ms {
            builder = builder.timestamp_ms(timestamp_ms);
        }

        builder.build()
    }
}
