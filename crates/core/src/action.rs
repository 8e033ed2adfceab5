//! The canonical, vendor-neutral "next action".
//!
//! Serialized flat: `{"action_type": "shell_execute", "command": "ls", "tool_call_id": "call_1"}`.
//! Several simultaneous invocations serialize as `{"actions": [...]}`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Action type of the sentinel produced when a turn cannot be normalized.
pub const ERROR_ACTION: &str = "error";

/// Action types that end a task.
pub const TERMINAL_ACTIONS: [&str; 2] = ["task_complete", "exit"];

/// One normalized instruction for the executor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub action_type: String,

    /// Tool call this action answers, when it came from a structured invocation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,

    #[serde(flatten)]
    pub params: Map<String, Value>,
}

impl Action {
    pub fn new(action_type: impl Into<String>, params: Map<String, Value>) -> Self {
        Self {
            action_type: action_type.into(),
            tool_call_id: None,
            params,
        }
    }

    pub fn with_tool_call_id(mut self, id: impl Into<String>) -> Self {
        self.tool_call_id = Some(id.into());
        self
    }

    /// Sentinel for a turn whose tool calls could not be normalized.
    ///
    /// Carries the error text and the raw offending tool-call data so the
    /// caller can still acknowledge every call id.
    pub fn error(message: impl Into<String>, tool_calls: Value) -> Self {
        let mut params = Map::new();
        params.insert("error_message".into(), Value::String(message.into()));
        params.insert("tool_calls".into(), tool_calls);
        Self::new(ERROR_ACTION, params)
    }

    pub fn is_error(&self) -> bool {
        self.action_type == ERROR_ACTION
    }

    /// `task_complete` or `exit`.
    pub fn is_terminal(&self) -> bool {
        TERMINAL_ACTIONS.contains(&self.action_type.as_str())
    }

    pub fn param(&self, key: &str) -> Option<&Value> {
        self.params.get(key)
    }
}

/// Output of one controller turn: a plain action, or a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ActionOutput {
    Batch { actions: Vec<Action> },
    Single(Action),
}

impl ActionOutput {
    /// A batch of one collapses to a plain action.
    pub fn from_actions(mut actions: Vec<Action>) -> Self {
        if actions.len() == 1 {
            Self::Single(actions.remove(0))
        } else {
            Self::Batch { actions }
        }
    }

    pub fn actions(&self) -> &[Action] {
        match self {
            Self::Single(action) => std::slice::from_ref(action),
            Self::Batch { actions } => actions,
        }
    }

    pub fn into_actions(self) -> Vec<Action> {
        match self {
            Self::Single(action) => vec![action],
            Self::Batch { actions } => actions,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Single(a) if a.is_error())
    }

    /// Any action in the output ends the task.
    pub fn is_terminal(&self) -> bool {
        self.actions().iter().any(Action::is_terminal)
    }
}

impl From<Action> for ActionOutput {
    fn from(action: Action) -> Self {
        Self::Single(action)
    }
}
