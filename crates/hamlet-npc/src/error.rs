//! Error types for the LLM request path.
//!
//! Uses `thiserror` for typed errors. Failures here never propagate to the
//! host: the controller folds them into the `request_failed: ...` outcome
//! string the model sees on its next tick.

/// Errors that can occur while obtaining a decision from the LLM.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    /// Configuration is invalid or missing.
    #[error("config error: {0}")]
    Config(String),

    /// The HTTP request failed or the endpoint returned a non-success
    /// status.
    #[error("{0}")]
    Http(String),

    /// The response decoded but had no usable content.
    #[error("{0}")]
    MalformedResponse(String),

    /// The response content was empty after trimming.
    #[error("empty response content")]
    EmptyContent,

    /// The scripted test backend ran out of canned responses.
    #[error("no scripted response queued")]
    ScriptExhausted,

    /// Serialization failure while building the request.
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
}
