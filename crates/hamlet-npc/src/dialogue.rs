//! Dialogue memory: the last few exchanges between the player and the NPC.
//!
//! A small FIFO ring keeps prompts bounded -- six entries is roughly three
//! exchanges, enough for the model to keep a conversation thread without
//! prompt bloat. History lives only in memory and dies with the process.

use std::collections::VecDeque;

use serde::Serialize;

/// Maximum number of retained dialogue entries.
pub const DIALOGUE_HISTORY_CAP: usize = 6;

/// One spoken line, attributed to its speaker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DialogueEntry {
    /// `"Player"` or the NPC's name.
    pub speaker: String,
    /// What was said.
    pub message: String,
}

/// FIFO ring of recent dialogue, capped at [`DIALOGUE_HISTORY_CAP`].
#[derive(Debug, Clone, Default)]
pub struct DialogueHistory {
    entries: VecDeque<DialogueEntry>,
}

impl DialogueHistory {
    /// An empty history.
    pub const fn new() -> Self {
        Self {
            entries: VecDeque::new(),
        }
    }

    /// Append an entry, evicting the oldest when full.
    pub fn push(&mut self, speaker: impl Into<String>, message: impl Into<String>) {
        if self.entries.len() >= DIALOGUE_HISTORY_CAP {
            self.entries.pop_front();
        }
        self.entries.push_back(DialogueEntry {
            speaker: speaker.into(),
            message: message.into(),
        });
    }

    /// Number of retained entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the history is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over entries, oldest first.
    pub fn entries(&self) -> impl Iterator<Item = &DialogueEntry> {
        self.entries.iter()
    }

    /// Render the `RECENT CONVERSATION:` block for the prompt, or `None`
    /// when there is nothing to show.
    pub fn render(&self) -> Option<String> {
        if self.entries.is_empty() {
            return None;
        }
        let mut block = String::from("RECENT CONVERSATION:");
        for entry in &self.entries {
            block.push('\n');
            block.push_str(&format!("{}: \"{}\"", entry.speaker, entry.message));
        }
        Some(block)
    }
}
