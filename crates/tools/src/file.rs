//! File tools. Paths are relative to the sandbox working directory unless
//! absolute.

use crate::tool;
use benchpilot_core::ToolDefinition;
use serde_json::json;

pub fn definitions() -> Vec<ToolDefinition> {
    vec![
        tool(
            "file_read",
            "Read a text file.",
            json!({ "path": { "type": "string", "description": "File path" } }),
            &["path"],
        ),
        tool(
            "file_write",
            "Write a text file, replacing any existing content.",
            json!({
                "path": { "type": "string", "description": "File path" },
                "content": { "type": "string", "description": "Full file content" }
            }),
            &["path", "content"],
        ),
        tool(
            "file_list",
            "List a directory.",
            json!({ "path": { "type": "string", "description": "Directory path" } }),
            &["path"],
        ),
        tool(
            "replace_in_file",
            "Replace an exact text span in a file.",
            json!({
                "file": { "type": "string", "description": "File path" },
                "old_text": { "type": "string", "description": "Text to find" },
                "new_text": { "type": "string", "description": "Replacement" }
            }),
            &["file", "old_text", "new_text"],
        ),
        tool(
            "search_in_file",
            "Search a file with a regular expression.",
            json!({
                "file": { "type": "string", "description": "File path" },
                "pattern": { "type": "string", "description": "Regular expression" }
            }),
            &["file", "pattern"],
        ),
        tool(
            "find_files",
            "Find files under a directory by glob.",
            json!({
                "path": { "type": "string", "description": "Directory to search" },
                "glob": { "type": "string", "description": "Glob pattern, e.g. **/*.csv" }
            }),
            &["path", "glob"],
        ),
        tool(
            "image_read",
            "Load an image file so it can be viewed.",
            json!({ "path": { "type": "string", "description": "Image path" } }),
            &["path"],
        ),
        tool(
            "str_replace_editor",
            "View, create and edit files with exact string replacement.",
            json!({
                "command": {
                    "type": "string",
                    "enum": ["view", "create", "str_replace", "insert", "undo_edit"],
                    "description": "Editor operation"
                },
                "path": { "type": "string", "description": "File path" },
                "file_text": { "type": "string", "description": "Content for create" },
                "old_str": { "type": "string", "description": "Text to replace for str_replace" },
                "new_str": { "type": "string", "description": "Replacement or inserted text" },
                "insert_line": { "type": "integer", "description": "Line after which to insert" },
                "view_range": {
                    "type": "array",
                    "items": { "type": "integer" },
                    "description": "[start, end] lines for view"
                }
            }),
            &["command", "path"],
        ),
    ]
}
