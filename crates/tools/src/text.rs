//! Plain-text rendering of tool definitions, for models that take their
//! tools inside the prompt.

use benchpilot_core::ToolDefinition;
use serde_json::Value;

/// The call syntax text-mode models are asked to emit.
pub const TOOL_CALL_FORMAT: &str = "<tool_call>\n{\"name\": \"tool_name\", \"arguments\": {\"param1\": \"value1\", \"param2\": \"value2\"}}\n</tool_call>";

/// Render tools as a bulleted list, one block per tool.
///
/// ```text
/// - shell_execute: Execute a shell command
///   - command (string): The command [required]
/// ```
pub fn format_tools_as_text(tools: &[ToolDefinition]) -> String {
    tools.iter().map(format_tool).collect::<Vec<_>>().join("\n\n")
}

fn format_tool(tool: &ToolDefinition) -> String {
    let mut out = format!("- {}: {}", tool.name, tool.description);

    let required: Vec<&str> = tool.parameters["required"]
        .as_array()
        .map(|r| r.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    if let Some(properties) = tool.parameters["properties"].as_object() {
        for (name, schema) in properties {
            let kind = schema["type"].as_str().unwrap_or("string");
            out.push_str(&format!("\n  - {name} ({kind})"));
            if let Some(desc) = schema["description"].as_str() {
                out.push_str(&format!(": {desc}"));
            }
            if let Some(options) = schema["enum"].as_array() {
                let options: Vec<String> = options.iter().map(display_value).collect();
                out.push_str(&format!(" [options: {}]", options.join(", ")));
            }
            if let Some(default) = schema.get("default") {
                out.push_str(&format!(" [default: {}]", display_value(default)));
            }
            if required.contains(&name.as_str()) {
                out.push_str(" [required]");
            }
        }
    }
    out
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
