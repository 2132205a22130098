//! Prompt assembly for the decision request.
//!
//! The system prompt is operator-owned text loaded verbatim from a file
//! (no template language) so the character can be retuned without
//! recompiling; a missing file falls back to the built-in default. The
//! user message is assembled in a fixed order: reminder, recent
//! conversation, observation, player message.

use std::path::Path;

use tracing::{debug, warn};

/// The literal reminder leading every user message.
pub const SYSTEM_REMINDER: &str =
    "SYSTEM_REMINDER: Output one JSON object. No extra text. If unsure, ask via say.";

/// The complete rendered prompt ready to send to the LLM.
#[derive(Debug, Clone)]
pub struct RenderedPrompt {
    /// System message establishing the character.
    pub system: String,
    /// User message carrying reminder, memory, observation, and the
    /// player's line.
    pub user: String,
}

/// Built-in system prompt used when the prompt file is missing.
pub const DEFAULT_SYSTEM_PROMPT: &str = r#"You are Garruk Ironhand, a grizzled shopkeeper in a fantasy village. You're blunt, impatient, and speak in short sentences. Stay in character - never acknowledge being an AI or part of a game.

BEHAVIOR:
- When the player greets you, greet back with say
- When the player asks questions, answer with say
- When the player asks you to move in a direction, use move
- When the player asks you to go somewhere, use move_to
- When the player asks about items, use say to list what you have
- Keep spoken responses under 10 words

INVENTORY RULES:
- Your current inventory is listed in the observation under npc.inventory
- Only mention items that are actually in your inventory

Respond with exactly one JSON object, no other text:
{"action":"say","args":{"text":"<1-100 chars>"}}
{"action":"move","args":{"direction":"N|E|S|W","distance":<0.1-5.0 tiles>}}
{"action":"move_to","args":{"x":<tile>,"y":<tile>}}
{"action":"interact","args":{"entity_id":"<id>"}}
{"action":"transfer_item","args":{"entity_id":"<id>","item_id":"<id>"}}

Pick movement distances by context: 0.5 short, 1.0 normal, 3.0 long."#;

/// Load the system prompt from a file, falling back to the built-in
/// default when the file is missing or unreadable.
pub fn load_system_prompt(path: &Path) -> String {
    match std::fs::read_to_string(path) {
        Ok(text) => {
            let trimmed = text.trim().to_owned();
            debug!(path = %path.display(), chars = trimmed.len(), "system prompt loaded");
            trimmed
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "system prompt file missing, using default");
            DEFAULT_SYSTEM_PROMPT.to_owned()
        }
    }
}

/// Assemble the user message in its fixed order.
///
/// 1. The [`SYSTEM_REMINDER`] literal.
/// 2. The `RECENT CONVERSATION:` block, when memory is supplied.
/// 3. `OBSERVATION:` followed by the 2-space-indented JSON payload.
/// 4. A `PLAYER_MESSAGE: "<text>"` trailer when the player just spoke.
pub fn build_user_message(
    observation_json: &str,
    memory: Option<&str>,
    player_message: Option<&str>,
) -> String {
    let mut sections = vec![SYSTEM_REMINDER.to_owned()];

    if let Some(memory) = memory
        && !memory.is_empty()
    {
        sections.push(memory.to_owned());
    }

    sections.push(format!("OBSERVATION:\n{observation_json}"));

    if let Some(text) = player_message {
        sections.push(format!("PLAYER_MESSAGE: \"{text}\""));
    }

    sections.join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_message_fixed_order() {
        let message = build_user_message(
            "{\n  \"tick\": 1\n}",
            Some("RECENT CONVERSATION:\nPlayer: \"hello\""),
            Some("hello"),
        );

        let reminder = message.find("SYSTEM_REMINDER").unwrap_or(usize::MAX);
        let conversation = message.find("RECENT CONVERSATION").unwrap_or(usize::MAX);
        let observation = message.find("OBSERVATION:").unwrap_or(usize::MAX);
        let player = message.find("PLAYER_MESSAGE:").unwrap_or(usize::MAX);

        assert!(reminder < conversation);
        assert!(conversation < observation);
        assert!(observation < player);
        assert!(message.contains("PLAYER_MESSAGE: \"hello\""));
    }

    #[test]
    fn user_message_without_memory_or_player_line() {
        let message = build_user_message("{}", None, None);
        assert!(message.starts_with(SYSTEM_REMINDER));
        assert!(message.contains("OBSERVATION:\n{}"));
        assert!(!message.contains("RECENT CONVERSATION"));
        assert!(!message.contains("PLAYER_MESSAGE"));
    }

    #[test]
    fn empty_memory_is_skipped() {
        let message = build_user_message("{}", Some(""), None);
        assert!(!message.contains("\n\n\n"));
    }

    #[test]
    fn missing_prompt_file_falls_back_to_default() {
        let prompt = load_system_prompt(Path::new("definitely/not/a/real/file.txt"));
        assert_eq!(prompt, DEFAULT_SYSTEM_PROMPT);
    }

    #[test]
    fn prompt_file_is_loaded_verbatim_and_trimmed() {
        let unique = format!(
            "hamlet_prompt_test_{}_{:?}.txt",
            std::process::id(),
            std::thread::current().id(),
        );
        let path = std::env::temp_dir().join(unique);
        std::fs::write(&path, "  You are a test NPC.\n").ok();

        let prompt = load_system_prompt(&path);
        assert_eq!(prompt, "You are a test NPC.");

        std::fs::remove_file(&path).ok();
    }
}
