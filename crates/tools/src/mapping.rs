//! Tool call → [`Action`] mapping.
//!
//! Tool names map one-to-one onto action types. Arguments become the
//! action's parameters; some models wrap them in a nested `parameters`
//! object, which is flattened.

use crate::{browser, dom, file, shell};
use benchpilot_core::{Action, ParseError};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::sync::LazyLock;

/// Action types reachable without a matching catalog entry.
const EXTRA_ACTION_TYPES: &[&str] = &["exit"];

static KNOWN_ACTION_TYPES: LazyLock<HashSet<String>> = LazyLock::new(|| {
    browser::definitions()
        .into_iter()
        .chain(dom::definitions())
        .chain(file::definitions())
        .chain([shell::code_execute(), shell::shell_execute(), shell::task_complete()])
        .map(|def| def.name)
        .chain(EXTRA_ACTION_TYPES.iter().map(|s| s.to_string()))
        .collect()
});

/// The action type for a tool name, if the name is known.
pub fn action_type_for(name: &str) -> Option<&'static str> {
    KNOWN_ACTION_TYPES.get(name).map(|s| s.as_str())
}

/// Map a tool call onto an action.
pub fn map_tool_call(name: &str, arguments: Map<String, Value>) -> Result<Action, ParseError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ParseError::EmptyToolName);
    }
    let action_type = action_type_for(name).ok_or_else(|| ParseError::UnknownTool(name.to_string()))?;
    Ok(Action::new(action_type, flatten_arguments(arguments)))
}

fn flatten_arguments(mut arguments: Map<String, Value>) -> Map<String, Value> {
    if let Some(Value::Object(nested)) = arguments.remove("parameters") {
        for (key, value) in nested {
            arguments.entry(key).or_insert(value);
        }
    }
    arguments.remove("action_type");
    arguments
}
