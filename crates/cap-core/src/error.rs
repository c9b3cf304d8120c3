//! Uniform error taxonomy for capability operations.

use thiserror::Error;

/// Result type alias for capability operations.
pub type CapabilityResult<T> = Result<T, CapabilityError>;

/// Errors every capability backend maps into.
///
/// `Invalid` is rejected eagerly with no state mutated. `NotFound` is a
/// distinguishable condition, not a generic fault — absence always
/// surfaces as this variant across all capabilities, never as a null
/// success. `Internal` wraps backend failures with operation context
/// and reaches the RPC caller as an opaque error.
#[derive(Debug, Error)]
pub enum CapabilityError {
    #[error("invalid: {0}")]
    Invalid(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("internal: {0}")]
    Internal(String),
}

impl CapabilityError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::Invalid(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Wire-level error code for the RPC envelope.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Invalid(_) => "invalid",
            Self::NotFound(_) => "not_found",
            Self::Internal(_) => "internal",
        }
    }

    /// Caller-facing message. Internal details stay in the logs.
    pub fn public_message(&self) -> String {
        match self {
            Self::Invalid(msg) => msg.clone(),
            Self::NotFound(msg) => msg.clone(),
            Self::Internal(_) => "internal error".to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
