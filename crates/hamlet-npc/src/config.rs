//! Configuration for the LLM client.
//!
//! Connection settings come from environment variables with defaults that
//! match a local LM Studio style server. The wire mode (tool calls versus
//! JSON-in-content) is fixed at construction; hosts pick it once when the
//! world loads.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::LlmError;

/// Default chat-completions endpoint (a locally hosted server).
pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:1234/v1/chat/completions";

/// Default model identifier for local servers that ignore the field.
pub const DEFAULT_MODEL: &str = "local-model";

/// Default sampling temperature.
pub const DEFAULT_TEMPERATURE: f64 = 0.4;

/// Token budget per reply; decisions are one small JSON object.
pub const MAX_TOKENS: u32 = 150;

/// Stop sequences cutting off chatter after the JSON object.
pub const STOP_SEQUENCES: [&str; 2] = ["\n\n", "```"];

/// Per-attempt request timeout.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Extra attempts after the first failed request.
pub const MAX_RETRIES: u32 = 2;

/// How the action decision travels over the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WireMode {
    /// Declare the five actions as functions and read `tool_calls` back.
    #[default]
    ToolCalls,
    /// No tools; extract a JSON object from the message content.
    JsonContent,
}

impl WireMode {
    /// Human-readable name for logging.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ToolCalls => "tool-calls",
            Self::JsonContent => "json-content",
        }
    }
}

/// Complete LLM client configuration.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Full URL of the chat-completions endpoint.
    pub endpoint: String,
    /// Model identifier sent in the request body.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f64,
    /// Which wire format to use.
    pub wire_mode: WireMode,
    /// Where to load the system prompt from. A missing file falls back to
    /// the built-in default prompt.
    pub system_prompt_path: PathBuf,
}

impl LlmConfig {
    /// Load configuration from environment variables.
    ///
    /// Optional variables (all have defaults):
    /// - `LLM_ENDPOINT` -- chat-completions URL (default local server)
    /// - `LOCAL_LLM_MODEL` -- model identifier (default `local-model`)
    /// - `LLM_TEMP` -- sampling temperature (default `0.4`)
    ///
    /// The wire mode is a construction-time choice, not an environment
    /// variable; pass the mode the build was configured for.
    pub fn from_env(wire_mode: WireMode) -> Result<Self, LlmError> {
        let endpoint =
            std::env::var("LLM_ENDPOINT").unwrap_or_else(|_| DEFAULT_ENDPOINT.to_owned());
        let model =
            std::env::var("LOCAL_LLM_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_owned());
        let temperature: f64 = std::env::var("LLM_TEMP")
            .unwrap_or_else(|_| DEFAULT_TEMPERATURE.to_string())
            .parse()
            .map_err(|e| LlmError::Config(format!("invalid LLM_TEMP: {e}")))?;

        Ok(Self {
            endpoint,
            model,
            temperature,
            wire_mode,
            system_prompt_path: default_prompt_path(wire_mode),
        })
    }

    /// A configuration pointing at the default local endpoint.
    pub fn local_default(wire_mode: WireMode) -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_owned(),
            model: DEFAULT_MODEL.to_owned(),
            temperature: DEFAULT_TEMPERATURE,
            wire_mode,
            system_prompt_path: default_prompt_path(wire_mode),
        }
    }
}

/// Default system-prompt file per wire mode. Tool-call prompts do not need
/// to restate the JSON schema, so the two modes ship different files.
fn default_prompt_path(wire_mode: WireMode) -> PathBuf {
    match wire_mode {
        WireMode::ToolCalls => PathBuf::from("prompts/system_prompt_tool_calls.txt"),
        WireMode::JsonContent => PathBuf::from("prompts/system_prompt.txt"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_default_values() {
        let config = LlmConfig::local_default(WireMode::ToolCalls);
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.model, "local-model");
        assert!((config.temperature - 0.4).abs() < f64::EPSILON);
        assert_eq!(config.wire_mode, WireMode::ToolCalls);
    }

    #[test]
    fn prompt_path_differs_per_mode() {
        let tool = LlmConfig::local_default(WireMode::ToolCalls);
        let json = LlmConfig::local_default(WireMode::JsonContent);
        assert_ne!(tool.system_prompt_path, json.system_prompt_path);
    }

    #[test]
    fn wire_mode_defaults_to_tool_calls() {
        assert_eq!(WireMode::default(), WireMode::ToolCalls);
        assert_eq!(WireMode::ToolCalls.as_str(), "tool-calls");
        assert_eq!(WireMode::JsonContent.as_str(), "json-content");
    }
}
