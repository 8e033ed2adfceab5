//! Action parser: structured tool invocations or free text → [`ActionOutput`].
//!
//! Two entry points, one per reply shape:
//!
//! - [`parse_tool_calls`] maps each invocation through the tool name table.
//!   An invocation whose arguments fail to decode degrades to empty
//!   parameters; the rest of the batch still goes through.
//! - [`parse_text`] looks for a fenced code block, falls back to the whole
//!   trimmed text, and allows one backslash-repair retry before giving up.

use benchpilot_core::json_repair::escape_invalid_backslashes;
use benchpilot_core::{Action, ActionOutput, ParseError, ToolCallRecord};
use benchpilot_tools::map_tool_call;
use regex_lite::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;
use tracing::{debug, error};

static FENCED_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```(?:json)?\s*\n?(.*?)\n?```").expect("Valid regex pattern"));

/// Normalize a batch of tool invocations.
///
/// A single invocation yields a plain action; several yield a batch in the
/// order they were reported.
pub fn parse_tool_calls(calls: &[ToolCallRecord]) -> Result<ActionOutput, ParseError> {
    if calls.is_empty() {
        return Err(ParseError::NoToolCalls);
    }

    let mut actions = Vec::with_capacity(calls.len());
    for call in calls {
        let arguments = decode_arguments(call);
        let mut action = map_tool_call(&call.name, arguments)?;
        if !call.id.is_empty() {
            action = action.with_tool_call_id(&call.id);
        }
        debug!(tool = %call.name, action_type = %action.action_type, "Tool call mapped");
        actions.push(action);
    }

    Ok(ActionOutput::from_actions(actions))
}

/// Arguments as an object. Undecodable payloads become `{}` and are logged.
fn decode_arguments(call: &ToolCallRecord) -> Map<String, Value> {
    match &call.arguments {
        Value::Object(map) => map.clone(),
        Value::Null => Map::new(),
        Value::String(raw) if raw.trim().is_empty() => Map::new(),
        Value::String(raw) => match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(map)) => map,
            Ok(other) => {
                error!(tool = %call.name, arguments = %other, "Tool arguments are not an object");
                Map::new()
            }
            Err(e) => {
                error!(tool = %call.name, arguments = %raw, "Failed to parse tool arguments: {e}");
                Map::new()
            }
        },
        other => {
            error!(tool = %call.name, arguments = %other, "Tool arguments are not an object");
            Map::new()
        }
    }
}

/// Parse a free-text reply expected to hold a JSON action.
pub fn parse_text(text: &str) -> Result<ActionOutput, ParseError> {
    let candidate = match FENCED_BLOCK.captures(text).and_then(|c| c.get(1)) {
        Some(inner) => inner.as_str().trim(),
        None => {
            debug!("No fenced code block found, parsing the raw response");
            text.trim()
        }
    };

    let value = decode_json(candidate)?;
    action_from_value(value)
}

fn decode_json(candidate: &str) -> Result<Value, ParseError> {
    match serde_json::from_str(candidate) {
        Ok(value) => Ok(value),
        Err(_) => {
            let repaired = escape_invalid_backslashes(candidate);
            serde_json::from_str(&repaired)
                .inspect(|_| debug!("Parsed JSON after fixing invalid escapes"))
                .map_err(|e| ParseError::InvalidJson(e.to_string()))
        }
    }
}

/// Interpret a decoded JSON value as one action or a batch.
pub fn action_from_value(value: Value) -> Result<ActionOutput, ParseError> {
    let Value::Object(mut map) = value else {
        return Err(ParseError::NotAnAction(type_name(&value).into()));
    };

    if let Some(Value::String(action_type)) = map.remove("action_type") {
        let tool_call_id = match map.remove("tool_call_id") {
            Some(Value::String(id)) => Some(id),
            _ => None,
        };
        let mut action = Action::new(action_type, map);
        action.tool_call_id = tool_call_id;
        return Ok(action.into());
    }

    if let Some(Value::Array(items)) = map.remove("actions") {
        let actions = items
            .into_iter()
            .map(|item| match action_from_value(item)? {
                ActionOutput::Single(action) => Ok(action),
                ActionOutput::Batch { .. } => Err(ParseError::NotAnAction("nested batch".into())),
            })
            .collect::<Result<Vec<_>, _>>()?;
        if actions.is_empty() {
            return Err(ParseError::NotAnAction("empty actions array".into()));
        }
        return Ok(ActionOutput::Batch { actions });
    }

    // Legacy shell-only replies: {"command": "..."}
    if map.contains_key("command") {
        return Ok(Action::new("shell_execute", map).into());
    }

    Err(ParseError::NotAnAction(
        "object has neither `action_type` nor `actions`".into(),
    ))
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn call(id: &str, name: &str, arguments: Value) -> ToolCallRecord {
        ToolCallRecord::new(id, name, arguments)
    }

    #[test]
    fn single_call_is_a_plain_action() {
        let out = parse_tool_calls(&[call("call_1", "shell_execute", json!("{\"command\":\"ls\"}"))]).unwrap();
        let ActionOutput::Single(action) = out else {
            panic!("expected a single action");
        };
        assert_eq!(action.action_type, "shell_execute");
        assert_eq!(action.param("command"), Some(&json!("ls")));
        assert_eq!(action.tool_call_id.as_deref(), Some("call_1"));

        let wire = serde_json::to_value(&action).unwrap();
        assert_eq!(
            wire,
            json!({"action_type": "shell_execute", "command": "ls", "tool_call_id": "call_1"})
        );
    }

    #[test]
    fn batch_preserves_order() {
        let out = parse_tool_calls(&[
            call("a", "browser_click", json!({"x": 1, "y": 2})),
            call("b", "browser_type", json!({"text": "hi"})),
            call("c", "browser_screenshot", json!({})),
        ])
        .unwrap();
        let ids: Vec<_> = out.actions().iter().map(|a| a.tool_call_id.clone().unwrap()).collect();
        assert_eq!(ids, ["a", "b", "c"]);
        assert!(matches!(out, ActionOutput::Batch { .. }));
    }

    #[test]
    fn bad_arguments_degrade_to_empty_params() {
        let out = parse_tool_calls(&[
            call("a", "shell_execute", json!("{\"command\":\"pwd\"}")),
            call("b", "file_read", json!("{\"path\": ")),
        ])
        .unwrap();
        let actions = out.actions();
        assert_eq!(actions.len(), 2);
        assert_eq!(actions[0].param("command"), Some(&json!("pwd")));
        assert_eq!(actions[1].action_type, "file_read");
        assert!(actions[1].params.is_empty());
    }

    #[test]
    fn pre_decoded_arguments_are_accepted() {
        let out = parse_tool_calls(&[call("t", "file_read", json!({"path": "/tmp/a"}))]).unwrap();
        assert_eq!(out.actions()[0].param("path"), Some(&json!("/tmp/a")));
    }

    #[test]
    fn unknown_tool_fails_the_batch() {
        let err = parse_tool_calls(&[
            call("a", "shell_execute", json!("{}")),
            call("b", "summon_dragon", json!("{}")),
        ])
        .unwrap_err();
        assert_eq!(err, ParseError::UnknownTool("summon_dragon".into()));
    }

    #[test]
    fn empty_batch_is_an_error() {
        assert_eq!(parse_tool_calls(&[]).unwrap_err(), ParseError::NoToolCalls);
    }

    #[test]
    fn fenced_json_matches_bare_json() {
        let fenced = "```json\n{\"action_type\":\"task_complete\",\"result\":\"42\"}\n```";
        let bare = "{\"action_type\":\"task_complete\",\"result\":\"42\"}";
        let a = parse_text(fenced).unwrap();
        assert_eq!(a, parse_text(bare).unwrap());

        let ActionOutput::Single(action) = a else {
            panic!("expected a single action");
        };
        assert_eq!(action.action_type, "task_complete");
        assert_eq!(action.param("result"), Some(&json!("42")));
        assert!(action.tool_call_id.is_none());
    }

    #[test]
    fn fence_without_language_tag() {
        let text = "Here you go:\n```\n{\"action_type\": \"browser_wait\", \"seconds\": 2}\n```\nthanks";
        assert_eq!(parse_text(text).unwrap().actions()[0].action_type, "browser_wait");
    }

    #[test]
    fn invalid_backslashes_are_repaired_once() {
        let text = r#"{"action_type": "shell_execute", "command": "grep -E '\d+' C:\Users\data"}"#;
        let out = parse_text(text).unwrap();
        assert_eq!(
            out.actions()[0].param("command"),
            Some(&json!(r"grep -E '\d+' C:\Users\data"))
        );
    }

    #[test]
    fn garbage_is_invalid_json() {
        let err = parse_text("I think I should click the button.").unwrap_err();
        assert!(matches!(err, ParseError::InvalidJson(_)));
    }

    #[test]
    fn object_without_action_is_rejected() {
        let err = parse_text("{\"thought\": \"hmm\"}").unwrap_err();
        assert!(matches!(err, ParseError::NotAnAction(_)));

        let err = parse_text("[1, 2, 3]").unwrap_err();
        assert_eq!(err, ParseError::NotAnAction("array".into()));
    }

    #[test]
    fn actions_array_becomes_a_batch() {
        let text = r#"{"actions": [{"action_type": "browser_click", "x": 1, "y": 1}, {"action_type": "browser_wait"}]}"#;
        let out = parse_text(text).unwrap();
        assert_eq!(out.actions().len(), 2);
        assert_eq!(out.actions()[1].action_type, "browser_wait");
    }

    #[test]
    fn legacy_command_object_is_a_shell_action() {
        let out = parse_text("{\"command\": \"ls -la\"}").unwrap();
        assert_eq!(out.actions()[0].action_type, "shell_execute");
        assert_eq!(out.actions()[0].param("command"), Some(&json!("ls -la")));
    }
}
