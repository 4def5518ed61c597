//! Observability module for correlation and tracing

use serde::{Deserialize, Serialize};
use std::time::Instant;
use uuid::Uuid;

/// Correlation ID for tracking one user action across API, wallet and RPC calls
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct CorrelationId(String);

impl CorrelationId {
    /// Create a new correlation ID
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Get the inner string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CorrelationId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Context carried through one transaction flow or dashboard operation.
///
/// Every log line emitted while the context's span is entered carries the
/// correlation id and operation name, so a single lock/claim/swap can be
/// followed from the API call to the confirmation poll.
#[derive(Debug, Clone)]
pub struct FlowContext {
    /// Correlation ID shared by parent and child contexts
    pub correlation_id: CorrelationId,

    /// Operation name (e.g. "lock_tokens")
    pub operation: String,

    /// Parent operation name, if this is a nested flow
    pub parent_operation: Option<String>,

    started_at: Instant,
}

impl FlowContext {
    /// Create a new context for an operation
    pub fn new(operation: &str) -> Self {
        Self {
            correlation_id: CorrelationId::new(),
            operation: operation.to_string(),
            parent_operation: None,
            started_at: Instant::now(),
        }
    }

    /// Create a child context sharing the correlation id
    pub fn child(&self, operation: &str) -> Self {
        Self {
            correlation_id: self.correlation_id.clone(),
            operation: operation.to_string(),
            parent_operation: Some(self.operation.clone()),
            started_at: Instant::now(),
        }
    }

    /// Tracing span for this context
    pub fn span(&self) -> tracing::Span {
        tracing::info_span!(
            "flow",
            correlation_id = %self.correlation_id,
            operation = %self.operation,
            parent = ?self.parent_operation,
        )
    }

    /// Milliseconds since the context was created
    pub fn elapsed_ms(&self) -> u64 {
        self.started_at.elapsed().as_millis() as u64
    }
}

impl Default for FlowContext {
    fn default() -> Self {
        Self::new("default")
    }
}
