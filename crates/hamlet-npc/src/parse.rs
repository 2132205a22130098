//! Strict parsing of LLM replies into validated actions.
//!
//! The parser is total and deterministic: every input string terminates in
//! either a validated [`Action`] or an error from the closed vocabulary
//! (`parse_error: ...` for undecodable text, `invalid: ...` for schema
//! violations). The error string becomes `last_result`, so the model reads
//! its own mistake on the next tick and is expected to self-correct.
//!
//! Normalization order: trim, pull the first fenced code block that starts
//! with `{`, else locate a balanced `{...}` substring, then decode.

use hamlet_types::{
    Action, ActionOutcome, Direction, MOVE_DISTANCE_MAX, MOVE_DISTANCE_MIN, SAY_TEXT_MAX_LEN,
};
use serde_json::{Map, Value};

/// Why a reply failed to parse. The `Display` form is the exact string
/// stored as `last_result`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActionParseError {
    /// The text could not be decoded as a JSON object at all.
    #[error("parse_error: {0}")]
    Json(String),

    /// The JSON decoded but violated the action schema.
    #[error("invalid: {0}")]
    Invalid(String),
}

impl ActionParseError {
    /// Fold into the controller's outcome vocabulary.
    pub fn into_outcome(self) -> ActionOutcome {
        match self {
            Self::Json(message) => ActionOutcome::ParseError(message),
            Self::Invalid(message) => ActionOutcome::Invalid(message),
        }
    }
}

/// Parse raw LLM output into a validated [`Action`].
///
/// # Errors
///
/// [`ActionParseError::Json`] when no JSON object can be decoded,
/// [`ActionParseError::Invalid`] when the object violates the action
/// schema.
pub fn parse_action(raw: &str) -> Result<Action, ActionParseError> {
    let trimmed = raw.trim();
    let candidate = extract_json_candidate(trimmed).unwrap_or(trimmed);

    let value: Value = serde_json::from_str(candidate)
        .map_err(|e| ActionParseError::Json(format!("Invalid JSON - {e}")))?;

    let Value::Object(object) = value else {
        return Err(ActionParseError::Json("Root must be JSON object".to_owned()));
    };

    if !object.contains_key("action") {
        return Err(ActionParseError::Invalid("Missing 'action' field".to_owned()));
    }
    if !object.contains_key("args") {
        return Err(ActionParseError::Invalid("Missing 'args' field".to_owned()));
    }

    let extras: Vec<&str> = object
        .keys()
        .map(String::as_str)
        .filter(|key| *key != "action" && *key != "args")
        .collect();
    if !extras.is_empty() {
        return Err(ActionParseError::Invalid(format!(
            "Extra fields not allowed: {}",
            extras.join(", ")
        )));
    }

    let name = object
        .get("action")
        .and_then(Value::as_str)
        .ok_or_else(|| ActionParseError::Invalid("'action' must be a string".to_owned()))?;
    let args = object
        .get("args")
        .and_then(Value::as_object)
        .ok_or_else(|| ActionParseError::Invalid("'args' must be an object".to_owned()))?;

    match name {
        "say" => parse_say(args),
        "move" => parse_move(args),
        "move_to" => parse_move_to(args),
        "interact" => parse_interact(args),
        "transfer_item" => parse_transfer_item(args),
        other => Err(ActionParseError::Invalid(format!(
            "Unknown action type '{other}'"
        ))),
    }
}

// ---------------------------------------------------------------------------
// Per-action argument validators
// ---------------------------------------------------------------------------

fn parse_say(args: &Map<String, Value>) -> Result<Action, ActionParseError> {
    reject_extras(args, &["text"])?;
    let text = string_arg(args, "text")?;
    if text.is_empty() {
        return Err(ActionParseError::Invalid(
            "text - must have at least 1 character".to_owned(),
        ));
    }
    if text.chars().count() > SAY_TEXT_MAX_LEN {
        return Err(ActionParseError::Invalid(format!(
            "text - must have at most {SAY_TEXT_MAX_LEN} characters"
        )));
    }
    Ok(Action::Say {
        text: text.to_owned(),
    })
}

fn parse_move(args: &Map<String, Value>) -> Result<Action, ActionParseError> {
    reject_extras(args, &["direction", "distance"])?;

    let letter = string_arg(args, "direction")?;
    let direction = Direction::from_letter(letter).ok_or_else(|| {
        ActionParseError::Invalid(format!("direction - '{letter}' is not one of N, E, S, W"))
    })?;

    let distance = args
        .get("distance")
        .ok_or_else(|| ActionParseError::Invalid("distance - field required".to_owned()))?
        .as_f64()
        .ok_or_else(|| ActionParseError::Invalid("distance - must be a number".to_owned()))?;
    if !(MOVE_DISTANCE_MIN..=MOVE_DISTANCE_MAX).contains(&distance) {
        return Err(ActionParseError::Invalid(format!(
            "distance - must be between {MOVE_DISTANCE_MIN} and {MOVE_DISTANCE_MAX}"
        )));
    }

    Ok(Action::Move {
        direction,
        distance,
    })
}

fn parse_move_to(args: &Map<String, Value>) -> Result<Action, ActionParseError> {
    reject_extras(args, &["x", "y"])?;
    let x = integer_arg(args, "x")?;
    let y = integer_arg(args, "y")?;
    Ok(Action::MoveTo { x, y })
}

fn parse_interact(args: &Map<String, Value>) -> Result<Action, ActionParseError> {
    reject_extras(args, &["entity_id"])?;
    let entity_id = non_empty_string_arg(args, "entity_id")?;
    Ok(Action::Interact { entity_id })
}

fn parse_transfer_item(args: &Map<String, Value>) -> Result<Action, ActionParseError> {
    reject_extras(args, &["entity_id", "item_id"])?;
    let entity_id = non_empty_string_arg(args, "entity_id")?;
    let item_id = non_empty_string_arg(args, "item_id")?;
    Ok(Action::TransferItem { entity_id, item_id })
}

// ---------------------------------------------------------------------------
// Argument helpers
// ---------------------------------------------------------------------------

fn reject_extras(args: &Map<String, Value>, allowed: &[&str]) -> Result<(), ActionParseError> {
    let extras: Vec<&str> = args
        .keys()
        .map(String::as_str)
        .filter(|key| !allowed.contains(key))
        .collect();
    if extras.is_empty() {
        Ok(())
    } else {
        Err(ActionParseError::Invalid(format!(
            "Extra fields not allowed: {}",
            extras.join(", ")
        )))
    }
}

fn string_arg<'a>(
    args: &'a Map<String, Value>,
    key: &str,
) -> Result<&'a str, ActionParseError> {
    args.get(key)
        .ok_or_else(|| ActionParseError::Invalid(format!("{key} - field required")))?
        .as_str()
        .ok_or_else(|| ActionParseError::Invalid(format!("{key} - must be a string")))
}

fn non_empty_string_arg(
    args: &Map<String, Value>,
    key: &str,
) -> Result<String, ActionParseError> {
    let value = string_arg(args, key)?;
    if value.is_empty() {
        return Err(ActionParseError::Invalid(format!(
            "{key} - must not be empty"
        )));
    }
    Ok(value.to_owned())
}

fn integer_arg(args: &Map<String, Value>, key: &str) -> Result<i32, ActionParseError> {
    let value = args
        .get(key)
        .ok_or_else(|| ActionParseError::Invalid(format!("{key} - field required")))?
        .as_i64()
        .ok_or_else(|| ActionParseError::Invalid(format!("{key} - must be an integer")))?;
    i32::try_from(value)
        .map_err(|_| ActionParseError::Invalid(format!("{key} - out of range")))
}

// ---------------------------------------------------------------------------
// JSON extraction
// ---------------------------------------------------------------------------

/// Pull the most plausible JSON object out of messy LLM text: the first
/// fenced code block starting with `{`, else the first balanced `{...}`
/// substring. Returns `None` when the text already is (or contains no)
/// clean JSON object.
pub(crate) fn extract_json_candidate(text: &str) -> Option<&str> {
    if text.contains("```")
        && let Some(segment) = fenced_json_segment(text)
    {
        return Some(segment);
    }
    if !text.starts_with('{') {
        return balanced_json_object(text);
    }
    None
}

/// The first fenced segment whose first non-blank line begins with `{`.
fn fenced_json_segment(text: &str) -> Option<&str> {
    let mut search_from = 0;
    while let Some(open) = text.get(search_from..)?.find("```") {
        let fence_start = search_from.checked_add(open)?.checked_add(3)?;
        let after_fence = text.get(fence_start..)?;

        // The opener's language tag (e.g. "json") runs to end of line.
        let body_offset = after_fence.find('\n').map_or(0, |i| i.saturating_add(1));
        let body = after_fence.get(body_offset..)?;

        let close = body.find("```")?;
        let segment = body.get(..close)?.trim();

        let first_line = segment.lines().find(|line| !line.trim().is_empty());
        if first_line.is_some_and(|line| line.trim_start().starts_with('{')) {
            return Some(segment);
        }

        search_from = fence_start
            .checked_add(body_offset)?
            .checked_add(close)?
            .checked_add(3)?;
    }
    None
}

/// The substring from the first `{` through its matching close brace.
fn balanced_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth: i32 = 0;
    for (offset, ch) in text.get(start..)?.char_indices() {
        match ch {
            '{' => depth = depth.saturating_add(1),
            '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    let end = start
                        .checked_add(offset)?
                        .checked_add(ch.len_utf8())?;
                    return text.get(start..end);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_valid_say() {
        let action = parse_action(r#"{"action":"say","args":{"text":"Hello!"}}"#);
        assert_eq!(
            action.ok(),
            Some(Action::Say {
                text: "Hello!".to_owned()
            })
        );
    }

    #[test]
    fn parse_valid_move() {
        let action = parse_action(r#"{"action":"move","args":{"direction":"E","distance":2.0}}"#);
        assert_eq!(
            action.ok(),
            Some(Action::Move {
                direction: Direction::East,
                distance: 2.0
            })
        );
    }

    #[test]
    fn parse_valid_move_to_and_interact() {
        assert_eq!(
            parse_action(r#"{"action":"move_to","args":{"x":10,"y":5}}"#).ok(),
            Some(Action::MoveTo { x: 10, y: 5 })
        );
        assert_eq!(
            parse_action(r#"{"action":"interact","args":{"entity_id":"door_1"}}"#).ok(),
            Some(Action::Interact {
                entity_id: "door_1".to_owned()
            })
        );
    }

    #[test]
    fn garbage_is_parse_error() {
        let err = parse_action("I think I'll move east.").err();
        assert!(matches!(err, Some(ActionParseError::Json(_))));
        let message = err.map(|e| e.to_string()).unwrap_or_default();
        assert!(message.starts_with("parse_error: "));
    }

    #[test]
    fn empty_input_is_parse_error() {
        assert!(matches!(
            parse_action("").err(),
            Some(ActionParseError::Json(_))
        ));
    }

    #[test]
    fn non_object_root_is_parse_error() {
        assert!(matches!(
            parse_action("[1, 2, 3]").err(),
            Some(ActionParseError::Json(_))
        ));
    }

    #[test]
    fn missing_action_or_args_is_invalid() {
        let missing_action = parse_action(r#"{"args":{"text":"Hello!"}}"#).err();
        assert!(matches!(missing_action, Some(ActionParseError::Invalid(_))));

        let missing_args = parse_action(r#"{"action":"say"}"#).err();
        let message = missing_args.map(|e| e.to_string()).unwrap_or_default();
        assert_eq!(message, "invalid: Missing 'args' field");
    }

    #[test]
    fn extra_top_level_key_is_invalid() {
        let err = parse_action(r#"{"action":"say","args":{"text":"hi"},"extra":"field"}"#).err();
        let message = err.map(|e| e.to_string()).unwrap_or_default();
        assert_eq!(message, "invalid: Extra fields not allowed: extra");
    }

    #[test]
    fn extra_args_key_is_invalid() {
        let err = parse_action(r#"{"action":"say","args":{"text":"hi","mood":"angry"}}"#).err();
        assert!(matches!(err, Some(ActionParseError::Invalid(_))));
    }

    #[test]
    fn unknown_action_is_invalid() {
        let err = parse_action(r#"{"action":"dance","args":{}}"#).err();
        let message = err.map(|e| e.to_string()).unwrap_or_default();
        assert_eq!(message, "invalid: Unknown action type 'dance'");
    }

    #[test]
    fn action_names_are_case_sensitive() {
        assert!(parse_action(r#"{"action":"Say","args":{"text":"hi"}}"#).is_err());
        assert!(parse_action(r#"{"action":"MOVE_TO","args":{"x":1,"y":1}}"#).is_err());
    }

    #[test]
    fn say_text_bounds() {
        assert!(parse_action(r#"{"action":"say","args":{"text":""}}"#).is_err());

        let long = "a".repeat(101);
        let raw = format!(r#"{{"action":"say","args":{{"text":"{long}"}}}}"#);
        assert!(parse_action(&raw).is_err());

        let max = "a".repeat(100);
        let raw = format!(r#"{{"action":"say","args":{{"text":"{max}"}}}}"#);
        assert!(parse_action(&raw).is_ok());
    }

    #[test]
    fn move_direction_and_distance_bounds() {
        assert!(
            parse_action(r#"{"action":"move","args":{"direction":"NORTH","distance":1.0}}"#)
                .is_err()
        );
        assert!(
            parse_action(r#"{"action":"move","args":{"direction":"E","distance":0.05}}"#).is_err()
        );
        assert!(
            parse_action(r#"{"action":"move","args":{"direction":"E","distance":5.1}}"#).is_err()
        );
        assert!(
            parse_action(r#"{"action":"move","args":{"direction":"E","distance":0.1}}"#).is_ok()
        );
        assert!(
            parse_action(r#"{"action":"move","args":{"direction":"E","distance":5.0}}"#).is_ok()
        );
        // Integer distances are numbers too.
        assert!(
            parse_action(r#"{"action":"move","args":{"direction":"E","distance":2}}"#).is_ok()
        );
    }

    #[test]
    fn move_to_requires_integers() {
        assert!(parse_action(r#"{"action":"move_to","args":{"x":3.5,"y":5}}"#).is_err());
        assert!(parse_action(r#"{"action":"move_to","args":{"x":"3","y":5}}"#).is_err());
        assert!(parse_action(r#"{"action":"move_to","args":{"x":-2,"y":5}}"#).is_ok());
    }

    #[test]
    fn transfer_item_requires_non_empty_ids() {
        assert!(
            parse_action(r#"{"action":"transfer_item","args":{"entity_id":"","item_id":"x"}}"#)
                .is_err()
        );
        assert!(
            parse_action(r#"{"action":"transfer_item","args":{"entity_id":"player"}}"#).is_err()
        );
    }

    #[test]
    fn parse_from_fenced_block() {
        let raw = "Here is my decision:\n\n```json\n{\"action\":\"say\",\"args\":{\"text\":\"hi\"}}\n```\n\nDone.";
        assert!(parse_action(raw).is_ok());
    }

    #[test]
    fn parse_from_plain_fence() {
        let raw = "```\n{\"action\":\"move_to\",\"args\":{\"x\":1,\"y\":2}}\n```";
        assert_eq!(
            parse_action(raw).ok(),
            Some(Action::MoveTo { x: 1, y: 2 })
        );
    }

    #[test]
    fn parse_with_leading_prose() {
        let raw = "Sure! {\"action\":\"say\",\"args\":{\"text\":\"Welcome.\"}} Anything else?";
        assert_eq!(
            parse_action(raw).ok(),
            Some(Action::Say {
                text: "Welcome.".to_owned()
            })
        );
    }

    #[test]
    fn nested_braces_balance() {
        // The args object nests; extraction must take the outer object.
        let raw = "noise {\"action\":\"transfer_item\",\"args\":{\"entity_id\":\"player\",\"item_id\":\"iron_sword\"}} tail";
        assert!(parse_action(raw).is_ok());
    }

    #[test]
    fn serialize_then_parse_roundtrip() {
        let actions = vec![
            Action::Say {
                text: "Hello!".to_owned(),
            },
            Action::Move {
                direction: Direction::West,
                distance: 0.5,
            },
            Action::MoveTo { x: 12, y: 5 },
            Action::Interact {
                entity_id: "chest_1".to_owned(),
            },
            Action::TransferItem {
                entity_id: "player".to_owned(),
                item_id: "iron_sword".to_owned(),
            },
        ];
        for action in actions {
            let json = serde_json::to_string(&action).unwrap_or_default();
            assert_eq!(parse_action(&json).ok(), Some(action));
        }
    }

    #[test]
    fn extract_candidate_from_fence_skips_non_json_fences() {
        let text = "```python\nprint('hi')\n```\n```json\n{\"a\": 1}\n```";
        assert_eq!(extract_json_candidate(text), Some("{\"a\": 1}"));
    }

    #[test]
    fn extract_candidate_none_for_clean_json() {
        assert_eq!(extract_json_candidate("{\"a\": 1}"), None);
    }
}
