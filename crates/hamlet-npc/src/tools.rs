//! Function declarations for tool-call mode.
//!
//! The five actions are declared as OpenAI-style function schemas whose
//! parameter constraints mirror the strict parser exactly, so a model that
//! honors the schema cannot produce an argument the parser rejects.

use serde_json::{Value, json};

/// The `tools` array declaring the five NPC actions.
pub fn action_tools() -> Value {
    json!([
        {
            "type": "function",
            "function": {
                "name": "say",
                "description": "Say something to the player",
                "parameters": {
                    "type": "object",
                    "properties": {
                        "text": {
                            "type": "string",
                            "description": "What to say (keep it under 10 words)",
                            "minLength": 1,
                            "maxLength": 100
                        }
                    },
                    "required": ["text"],
                    "additionalProperties": false
                }
            }
        },
        {
            "type": "function",
            "function": {
                "name": "move",
                "description": "Walk in a cardinal direction",
                "parameters": {
                    "type": "object",
                    "properties": {
                        "direction": {
                            "type": "string",
                            "enum": ["N", "E", "S", "W"],
                            "description": "Direction to walk (N=up, E=right, S=down, W=left)"
                        },
                        "distance": {
                            "type": "number",
                            "minimum": 0.1,
                            "maximum": 5.0,
                            "description": "Distance in tiles (0.5=short, 1.0=medium, 3.0=long)"
                        }
                    },
                    "required": ["direction", "distance"],
                    "additionalProperties": false
                }
            }
        },
        {
            "type": "function",
            "function": {
                "name": "move_to",
                "description": "Walk to a tile coordinate, pathfinding around walls",
                "parameters": {
                    "type": "object",
                    "properties": {
                        "x": {
                            "type": "integer",
                            "description": "Target tile x"
                        },
                        "y": {
                            "type": "integer",
                            "description": "Target tile y"
                        }
                    },
                    "required": ["x", "y"],
                    "additionalProperties": false
                }
            }
        },
        {
            "type": "function",
            "function": {
                "name": "interact",
                "description": "Interact with a nearby entity (door, chest, furniture)",
                "parameters": {
                    "type": "object",
                    "properties": {
                        "entity_id": {
                            "type": "string",
                            "description": "Id of the entity to interact with"
                        }
                    },
                    "required": ["entity_id"],
                    "additionalProperties": false
                }
            }
        },
        {
            "type": "function",
            "function": {
                "name": "transfer_item",
                "description": "Hand one unit of an item to a nearby character",
                "parameters": {
                    "type": "object",
                    "properties": {
                        "entity_id": {
                            "type": "string",
                            "description": "Id of the receiving character"
                        },
                        "item_id": {
                            "type": "string",
                            "description": "Id of the item to hand over"
                        }
                    },
                    "required": ["entity_id", "item_id"],
                    "additionalProperties": false
                }
            }
        }
    ])
}

/// A trivial single-function declaration used by the connection probe.
pub fn probe_tool() -> Value {
    json!([
        {
            "type": "function",
            "function": {
                "name": "test_function",
                "description": "A test function",
                "parameters": {
                    "type": "object",
                    "properties": {
                        "message": { "type": "string" }
                    },
                    "required": ["message"]
                }
            }
        }
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn five_actions_declared() {
        let tools = action_tools();
        let names: Vec<&str> = tools
            .as_array()
            .map(|list| {
                list.iter()
                    .filter_map(|tool| {
                        tool.get("function")
                            .and_then(|f| f.get("name"))
                            .and_then(Value::as_str)
                    })
                    .collect()
            })
            .unwrap_or_default();
        assert_eq!(names, vec!["say", "move", "move_to", "interact", "transfer_item"]);
    }

    #[test]
    fn all_schemas_forbid_extra_properties() {
        let tools = action_tools();
        for tool in tools.as_array().cloned().unwrap_or_default() {
            let additional = tool
                .get("function")
                .and_then(|f| f.get("parameters"))
                .and_then(|p| p.get("additionalProperties"))
                .and_then(Value::as_bool);
            assert_eq!(additional, Some(false), "tool: {tool}");
        }
    }

    #[test]
    fn move_schema_bounds_match_parser() {
        let tools = action_tools();
        let distance = tools
            .get(1)
            .and_then(|tool| tool.pointer("/function/parameters/properties/distance"))
            .cloned()
            .unwrap_or_default();
        assert_eq!(distance.get("minimum").and_then(Value::as_f64), Some(0.1));
        assert_eq!(distance.get("maximum").and_then(Value::as_f64), Some(5.0));
    }
}
