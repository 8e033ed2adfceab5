//! Execution tools: shell commands and code snippets.

use crate::tool;
use benchpilot_core::ToolDefinition;
use serde_json::json;

pub fn shell_execute() -> ToolDefinition {
    tool(
        "shell_execute",
        "Execute a shell command in the sandbox and return stdout/stderr.",
        json!({
            "command": { "type": "string", "description": "The shell command to execute" },
            "timeout": { "type": "integer", "description": "Seconds before the command is killed" }
        }),
        &["command"],
    )
}

pub fn code_execute() -> ToolDefinition {
    tool(
        "code_execute",
        "Run a code snippet and return its output.",
        json!({
            "code": { "type": "string", "description": "Source code" },
            "language": {
                "type": "string",
                "enum": ["python", "javascript", "bash"],
                "default": "python"
            },
            "timeout": { "type": "integer", "description": "Seconds before execution is aborted" }
        }),
        &["code"],
    )
}

pub fn task_complete() -> ToolDefinition {
    tool(
        "task_complete",
        "Finish the task. Pass the final answer as result when the task asks for one.",
        json!({ "result": { "type": "string", "description": "Final answer or failure summary" } }),
        &[],
    )
}
