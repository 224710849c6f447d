//! Shared error classification.
//!
//! Every module owns its own `thiserror` enum. This trait gives callers (the
//! HTTP layer in particular) a stable machine-readable code for each variant
//! without matching on the concrete type.

/// Stable error code + retry hint for surfaced errors.
pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;

    fn retryable(&self) -> bool {
        false
    }
}
