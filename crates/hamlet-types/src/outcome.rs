//! The closed result vocabulary the controller reports after each decision.
//!
//! Every decision tick ends in exactly one [`ActionOutcome`]. Its string
//! form is stored as `last_result` and fed back to the LLM in the next
//! observation, so the wording is part of the wire contract and must not
//! drift.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Why the engine refused an otherwise valid action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockReason {
    /// A wall stopped a directional move.
    Wall,
    /// An obstacle stopped pathfollowing movement.
    Obstacle,
    /// The target entity or character is out of reach (beyond 64 px).
    TooFar,
    /// The receiving character's inventory has no free slot.
    InventoryFull,
}

impl BlockReason {
    /// The suffix used in the `blocked:<reason>` result string.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Wall => "wall",
            Self::Obstacle => "obstacle",
            Self::TooFar => "too_far",
            Self::InventoryFull => "inventory_full",
        }
    }
}

/// The outcome of one decision tick.
///
/// `Invalid`, `ParseError` and `RequestFailed` are LLM-side failures and
/// count toward the consecutive-error backoff; engine refusals (`Cooldown`,
/// `Blocked`, `NoPath`) are legitimate feedback the model is expected to
/// react to and never trigger backoff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionOutcome {
    /// The action executed.
    Ok,
    /// The action's cooldown has not expired yet.
    Cooldown,
    /// The navigator found no route to the requested tile.
    NoPath,
    /// The engine refused the action.
    Blocked(BlockReason),
    /// The reply was well-formed JSON but violated the action schema.
    Invalid(String),
    /// The reply could not be decoded as JSON at all.
    ParseError(String),
    /// The LLM endpoint could not be reached or kept failing.
    RequestFailed(String),
}

impl ActionOutcome {
    /// Whether this outcome increments the consecutive-error counter.
    pub const fn counts_as_error(&self) -> bool {
        matches!(
            self,
            Self::Invalid(_) | Self::ParseError(_) | Self::RequestFailed(_)
        )
    }
}

impl fmt::Display for ActionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => write!(f, "ok"),
            Self::Cooldown => write!(f, "cooldown"),
            Self::NoPath => write!(f, "no_path"),
            Self::Blocked(reason) => write!(f, "blocked:{}", reason.as_str()),
            Self::Invalid(message) => write!(f, "invalid: {message}"),
            Self::ParseError(message) => write!(f, "parse_error: {message}"),
            Self::RequestFailed(message) => write!(f, "request_failed: {message}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_wire_strings() {
        assert_eq!(ActionOutcome::Ok.to_string(), "ok");
        assert_eq!(ActionOutcome::Cooldown.to_string(), "cooldown");
        assert_eq!(ActionOutcome::NoPath.to_string(), "no_path");
        assert_eq!(
            ActionOutcome::Blocked(BlockReason::Wall).to_string(),
            "blocked:wall"
        );
        assert_eq!(
            ActionOutcome::Blocked(BlockReason::InventoryFull).to_string(),
            "blocked:inventory_full"
        );
        assert_eq!(
            ActionOutcome::Invalid("text - too long".to_owned()).to_string(),
            "invalid: text - too long"
        );
        assert_eq!(
            ActionOutcome::ParseError("Invalid JSON".to_owned()).to_string(),
            "parse_error: Invalid JSON"
        );
        assert_eq!(
            ActionOutcome::RequestFailed("HTTP 500".to_owned()).to_string(),
            "request_failed: HTTP 500"
        );
    }

    #[test]
    fn only_llm_failures_count_as_errors() {
        assert!(ActionOutcome::Invalid(String::new()).counts_as_error());
        assert!(ActionOutcome::ParseError(String::new()).counts_as_error());
        assert!(ActionOutcome::RequestFailed(String::new()).counts_as_error());

        assert!(!ActionOutcome::Ok.counts_as_error());
        assert!(!ActionOutcome::Cooldown.counts_as_error());
        assert!(!ActionOutcome::NoPath.counts_as_error());
        assert!(!ActionOutcome::Blocked(BlockReason::Obstacle).counts_as_error());
        assert!(!ActionOutcome::Blocked(BlockReason::TooFar).counts_as_error());
    }
}
