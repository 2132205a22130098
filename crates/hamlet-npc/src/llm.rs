//! LLM backend abstraction and the retrying decision client.
//!
//! Uses enum dispatch for backends (async trait methods are not
//! dyn-compatible): the two wire formats against an OpenAI-compatible
//! chat-completions endpoint, plus a scripted backend that replays canned
//! responses so the whole decision pipeline can run in tests without a
//! model.
//!
//! The client does not care which model is behind the endpoint -- it sends
//! a prompt and expects back one JSON action, either as a tool call or
//! embedded in the message content.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use hamlet_types::Observation;
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::config::{
    LlmConfig, MAX_RETRIES, MAX_TOKENS, REQUEST_TIMEOUT, STOP_SEQUENCES, WireMode,
};
use crate::error::LlmError;
use crate::parse::extract_json_candidate;
use crate::prompt::{
    DEFAULT_SYSTEM_PROMPT, RenderedPrompt, build_user_message, load_system_prompt,
};
use crate::tools::{action_tools, probe_tool};

// ---------------------------------------------------------------------------
// Unified backend enum
// ---------------------------------------------------------------------------

/// A backend that can turn a rendered prompt into raw action JSON.
pub enum LlmBackend {
    /// Function-calling wire format: the reply arrives in `tool_calls`.
    ToolCalls(HttpBackend),
    /// Plain wire format: the reply is JSON inside the message content.
    JsonContent(HttpBackend),
    /// Canned replies for tests.
    Scripted(ScriptedBackend),
}

impl LlmBackend {
    /// Build the backend selected by the configuration's wire mode.
    pub fn from_config(config: &LlmConfig) -> Self {
        match config.wire_mode {
            WireMode::ToolCalls => Self::ToolCalls(HttpBackend::new(config)),
            WireMode::JsonContent => Self::JsonContent(HttpBackend::new(config)),
        }
    }

    /// Send a prompt and return the raw action JSON string.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError`] when the request fails or the response carries
    /// no usable payload.
    pub async fn complete(&self, prompt: &RenderedPrompt) -> Result<String, LlmError> {
        match self {
            Self::ToolCalls(backend) => backend.complete_tool_calls(prompt).await,
            Self::JsonContent(backend) => backend.complete_json(prompt).await,
            Self::Scripted(backend) => backend.complete(),
        }
    }

    /// Human-readable name for logging.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::ToolCalls(_) => "tool-calls",
            Self::JsonContent(_) => "json-content",
            Self::Scripted(_) => "scripted",
        }
    }
}

// ---------------------------------------------------------------------------
// HTTP backend (both wire formats)
// ---------------------------------------------------------------------------

/// Backend for OpenAI-compatible chat-completions endpoints.
pub struct HttpBackend {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    temperature: f64,
}

impl HttpBackend {
    /// Create a backend with the per-attempt timeout baked into the HTTP
    /// client.
    pub fn new(config: &LlmConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            client,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
        }
    }

    /// The shared request body; `tools` adds the function declarations
    /// and `tool_choice` for tool-call mode.
    fn request_body(&self, prompt: &RenderedPrompt, with_tools: bool) -> Value {
        if with_tools {
            json!({
                "model": self.model,
                "messages": [
                    {"role": "system", "content": prompt.system},
                    {"role": "user", "content": prompt.user}
                ],
                "temperature": self.temperature,
                "max_tokens": MAX_TOKENS,
                "stop": STOP_SEQUENCES,
                "tools": action_tools(),
                "tool_choice": "auto"
            })
        } else {
            json!({
                "model": self.model,
                "messages": [
                    {"role": "system", "content": prompt.system},
                    {"role": "user", "content": prompt.user}
                ],
                "temperature": self.temperature,
                "max_tokens": MAX_TOKENS,
                "stop": STOP_SEQUENCES
            })
        }
    }

    async fn post(&self, body: &Value) -> Result<Value, LlmError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| LlmError::Http(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "unable to read error body".to_owned());
            return Err(LlmError::Http(format!("HTTP {status}: {error_body}")));
        }

        response
            .json()
            .await
            .map_err(|e| LlmError::MalformedResponse(format!("response decode failed: {e}")))
    }

    /// Tool-call mode: take the first tool call, or fall back to content
    /// extraction for models that ignore the tool declarations.
    async fn complete_tool_calls(&self, prompt: &RenderedPrompt) -> Result<String, LlmError> {
        let body = self.request_body(prompt, true);
        let response = self.post(&body).await?;

        if let Some(synthesized) = extract_tool_call(&response) {
            return Ok(synthesized);
        }

        if let Some(content) = extract_content(&response) {
            debug!("no tool calls in response, falling back to content extraction");
            let cleaned = match extract_json_candidate(&content) {
                Some(candidate) => candidate.to_owned(),
                None => content,
            };
            return Ok(cleaned);
        }

        Err(LlmError::MalformedResponse(
            "no tool calls or content in response".to_owned(),
        ))
    }

    /// JSON mode: extract an object from the message content.
    async fn complete_json(&self, prompt: &RenderedPrompt) -> Result<String, LlmError> {
        let body = self.request_body(prompt, false);
        let response = self.post(&body).await?;

        let content = extract_content(&response).ok_or(LlmError::EmptyContent)?;
        let cleaned = match extract_json_candidate(&content) {
            Some(candidate) => candidate.to_owned(),
            None => content,
        };
        Ok(cleaned)
    }

    /// Whether the endpoint answers a trivial function-calling request
    /// with an actual tool call.
    async fn probe_tool_support(&self) -> bool {
        let body = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": "You are a test assistant. Use the test_function when asked."},
                {"role": "user", "content": "Please call the test function with message 'hello'"}
            ],
            "temperature": 0.1,
            "max_tokens": 50,
            "tools": probe_tool(),
            "tool_choice": "auto"
        });

        match self.post(&body).await {
            Ok(response) => response
                .pointer("/choices/0/message/tool_calls")
                .and_then(Value::as_array)
                .is_some_and(|calls| !calls.is_empty()),
            Err(e) => {
                warn!(error = %e, "tool-call connection probe failed");
                false
            }
        }
    }

    /// Whether the endpoint is reachable and echoes a trivial JSON reply.
    async fn probe_json_support(&self) -> bool {
        let body = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": "You are a test assistant."},
                {"role": "user", "content": "Respond with exactly: {\"test\":\"ok\"}"}
            ],
            "temperature": 0.1,
            "max_tokens": 50
        });

        match self.post(&body).await {
            Ok(response) => extract_content(&response)
                .is_some_and(|content| content.contains("test")),
            Err(e) => {
                warn!(error = %e, "connection probe failed");
                false
            }
        }
    }
}

/// Synthesize `{"action": ..., "args": ...}` from the first tool call in a
/// chat-completions response.
fn extract_tool_call(response: &Value) -> Option<String> {
    let call = response
        .pointer("/choices/0/message/tool_calls/0/function")?;
    let name = call.get("name")?.as_str()?;
    let arguments = call.get("arguments")?.as_str()?;
    let args: Value = serde_json::from_str(arguments).ok()?;
    serde_json::to_string(&json!({"action": name, "args": args})).ok()
}

/// The trimmed, non-empty message content of a chat-completions response.
fn extract_content(response: &Value) -> Option<String> {
    let content = response
        .pointer("/choices/0/message/content")?
        .as_str()?
        .trim();
    if content.is_empty() {
        None
    } else {
        Some(content.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Scripted backend (tests)
// ---------------------------------------------------------------------------

/// A backend that replays queued responses, for exercising the decision
/// pipeline without a model. Clones share the queue, so a test can keep a
/// handle and feed replies while the controller owns the client.
#[derive(Debug, Clone, Default)]
pub struct ScriptedBackend {
    queue: Arc<Mutex<VecDeque<Result<String, String>>>>,
}

impl ScriptedBackend {
    /// An empty scripted backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful raw reply.
    pub fn push_reply(&self, raw: impl Into<String>) {
        if let Ok(mut queue) = self.queue.lock() {
            queue.push_back(Ok(raw.into()));
        }
    }

    /// Queue a failed request.
    pub fn push_failure(&self, reason: impl Into<String>) {
        if let Ok(mut queue) = self.queue.lock() {
            queue.push_back(Err(reason.into()));
        }
    }

    /// Number of responses still queued.
    pub fn remaining(&self) -> usize {
        self.queue.lock().map(|queue| queue.len()).unwrap_or(0)
    }

    fn complete(&self) -> Result<String, LlmError> {
        let next = self
            .queue
            .lock()
            .ok()
            .and_then(|mut queue| queue.pop_front());
        match next {
            Some(Ok(raw)) => Ok(raw),
            Some(Err(reason)) => Err(LlmError::Http(reason)),
            None => Err(LlmError::ScriptExhausted),
        }
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// The retrying decision client: renders the prompt, calls the backend,
/// and retries transient failures with a linear backoff.
pub struct LlmClient {
    backend: LlmBackend,
    system_prompt: String,
    max_retries: u32,
}

impl LlmClient {
    /// Create a client from configuration, loading the system prompt file
    /// (or its built-in fallback) once at startup.
    pub fn new(config: &LlmConfig) -> Self {
        Self {
            backend: LlmBackend::from_config(config),
            system_prompt: load_system_prompt(&config.system_prompt_path),
            max_retries: MAX_RETRIES,
        }
    }

    /// A client over a scripted backend, for tests.
    pub fn scripted(backend: ScriptedBackend) -> Self {
        Self {
            backend: LlmBackend::Scripted(backend),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_owned(),
            max_retries: MAX_RETRIES,
        }
    }

    /// Name of the active backend for logging.
    pub const fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Ask the model for one decision.
    ///
    /// Retries up to the configured budget, sleeping `0.5s x attempt`
    /// between attempts. Empty content counts as a retryable failure.
    ///
    /// # Errors
    ///
    /// Returns the final [`LlmError`] once the retry budget is exhausted.
    pub async fn decide(
        &self,
        observation: &Observation,
        memory: Option<&str>,
    ) -> Result<String, LlmError> {
        let observation_json = serde_json::to_string_pretty(observation)?;
        let user = build_user_message(
            &observation_json,
            memory,
            observation.player.last_said.as_deref(),
        );
        let prompt = RenderedPrompt {
            system: self.system_prompt.clone(),
            user,
        };

        let mut attempt: u32 = 0;
        loop {
            let result = self.backend.complete(&prompt).await.and_then(|raw| {
                if raw.trim().is_empty() {
                    Err(LlmError::EmptyContent)
                } else {
                    Ok(raw)
                }
            });

            match result {
                Ok(raw) => {
                    debug!(backend = self.backend.name(), len = raw.len(), "LLM replied");
                    return Ok(raw);
                }
                Err(error) => {
                    attempt = attempt.saturating_add(1);
                    if attempt > self.max_retries {
                        return Err(error);
                    }
                    warn!(attempt, error = %error, "LLM request failed, retrying");
                    let backoff = 500_u64.saturating_mul(u64::from(attempt));
                    tokio::time::sleep(Duration::from_millis(backoff)).await;
                }
            }
        }
    }

    /// Health check: verify the endpoint answers, in the active wire mode.
    /// Scripted backends always pass.
    pub async fn test_connection(&self) -> bool {
        match &self.backend {
            LlmBackend::ToolCalls(backend) => backend.probe_tool_support().await,
            LlmBackend::JsonContent(backend) => backend.probe_json_support().await,
            LlmBackend::Scripted(_) => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use hamlet_types::{
        CooldownSnapshot, LocalTiles, NpcActivity, NpcSnapshot, PlayerSnapshot,
    };

    use super::*;

    fn sample_observation() -> Observation {
        Observation {
            npc: NpcSnapshot {
                pos: [10, 5],
                hp: 100,
                state: NpcActivity::Idle,
                inventory: vec!["Empty".to_owned()],
            },
            player: PlayerSnapshot {
                pos: [13, 5],
                last_said: Some("hello".to_owned()),
            },
            local_tiles: LocalTiles {
                origin: [5, 0],
                grid: vec!["...........".to_owned(); 11],
            },
            visible_entities: Vec::new(),
            goals: vec!["greet player".to_owned()],
            cooldowns: CooldownSnapshot::default(),
            last_result: None,
            tick: 1,
        }
    }

    #[test]
    fn extract_tool_call_synthesizes_action_json() {
        let response = json!({
            "choices": [{
                "message": {
                    "tool_calls": [{
                        "function": {
                            "name": "say",
                            "arguments": "{\"text\": \"What do you want?\"}"
                        }
                    }]
                }
            }]
        });
        let raw = extract_tool_call(&response).unwrap_or_default();
        let value: Value = serde_json::from_str(&raw).unwrap_or_default();
        assert_eq!(value.get("action").and_then(Value::as_str), Some("say"));
        assert_eq!(
            value.pointer("/args/text").and_then(Value::as_str),
            Some("What do you want?")
        );
    }

    #[test]
    fn extract_tool_call_missing_returns_none() {
        let response = json!({"choices": [{"message": {"content": "hi"}}]});
        assert_eq!(extract_tool_call(&response), None);

        let bad_args = json!({
            "choices": [{
                "message": {
                    "tool_calls": [{
                        "function": {"name": "say", "arguments": "not json"}
                    }]
                }
            }]
        });
        assert_eq!(extract_tool_call(&bad_args), None);
    }

    #[test]
    fn extract_content_trims_and_rejects_empty() {
        let response = json!({"choices": [{"message": {"content": "  {\"a\":1}  "}}]});
        assert_eq!(extract_content(&response), Some("{\"a\":1}".to_owned()));

        let empty = json!({"choices": [{"message": {"content": "   "}}]});
        assert_eq!(extract_content(&empty), None);

        let missing = json!({"error": "rate_limit"});
        assert_eq!(extract_content(&missing), None);
    }

    #[test]
    fn request_body_shapes() {
        let config = LlmConfig::local_default(WireMode::ToolCalls);
        let backend = HttpBackend::new(&config);
        let prompt = RenderedPrompt {
            system: "sys".to_owned(),
            user: "user".to_owned(),
        };

        let with_tools = backend.request_body(&prompt, true);
        assert_eq!(
            with_tools.get("max_tokens").and_then(Value::as_u64),
            Some(150)
        );
        assert_eq!(
            with_tools.get("stop"),
            Some(&json!(["\n\n", "```"]))
        );
        assert_eq!(
            with_tools.get("tool_choice").and_then(Value::as_str),
            Some("auto")
        );
        assert!(with_tools.get("tools").is_some());

        let without_tools = backend.request_body(&prompt, false);
        assert!(without_tools.get("tools").is_none());
        assert!(without_tools.get("tool_choice").is_none());
        assert_eq!(
            without_tools.pointer("/messages/0/role").and_then(Value::as_str),
            Some("system")
        );
    }

    #[test]
    fn scripted_backend_pops_in_order() {
        let backend = ScriptedBackend::new();
        backend.push_reply("first");
        backend.push_failure("down");
        backend.push_reply("second");

        assert_eq!(backend.remaining(), 3);
        assert_eq!(backend.complete().ok(), Some("first".to_owned()));
        assert!(backend.complete().is_err());
        assert_eq!(backend.complete().ok(), Some("second".to_owned()));
        assert!(matches!(
            backend.complete(),
            Err(LlmError::ScriptExhausted)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn decide_retries_until_success() {
        let backend = ScriptedBackend::new();
        backend.push_failure("HTTP 500: boom");
        backend.push_failure("HTTP 500: boom again");
        backend.push_reply(r#"{"action":"say","args":{"text":"hi"}}"#);

        let client = LlmClient::scripted(backend.clone());
        let raw = client.decide(&sample_observation(), None).await;
        assert!(raw.is_ok());
        assert_eq!(backend.remaining(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn decide_surfaces_final_failure() {
        let backend = ScriptedBackend::new();
        backend.push_failure("HTTP 500: one");
        backend.push_failure("HTTP 500: two");
        backend.push_failure("HTTP 500: three");

        let client = LlmClient::scripted(backend);
        let result = client.decide(&sample_observation(), None).await;
        let message = result.err().map(|e| e.to_string()).unwrap_or_default();
        assert_eq!(message, "HTTP 500: three");
    }

    #[tokio::test(start_paused = true)]
    async fn empty_reply_is_retryable() {
        let backend = ScriptedBackend::new();
        backend.push_reply("   ");
        backend.push_reply(r#"{"action":"say","args":{"text":"hi"}}"#);

        let client = LlmClient::scripted(backend);
        let raw = client.decide(&sample_observation(), None).await;
        assert!(raw.is_ok());
    }

    #[tokio::test]
    async fn scripted_connection_test_passes() {
        let client = LlmClient::scripted(ScriptedBackend::new());
        assert!(client.test_connection().await);
    }
}
