//! On-screen browser tools: pointer, keyboard and viewport control by
//! pixel coordinates.

use crate::tool;
use benchpilot_core::ToolDefinition;
use serde_json::json;

pub fn definitions() -> Vec<ToolDefinition> {
    vec![
        tool(
            "browser_click",
            "Click at screen coordinates. Prefer dom_click when an element id is available.",
            json!({
                "x": { "type": "integer", "description": "X coordinate in pixels" },
                "y": { "type": "integer", "description": "Y coordinate in pixels" },
                "button": {
                    "type": "string",
                    "description": "Mouse button",
                    "enum": ["left", "right", "middle"],
                    "default": "left"
                },
                "num_clicks": {
                    "type": "integer",
                    "description": "Number of clicks",
                    "enum": [1, 2, 3],
                    "default": 1
                }
            }),
            &["x", "y"],
        ),
        tool(
            "browser_move_to",
            "Move the pointer to absolute screen coordinates.",
            json!({
                "x": { "type": "integer", "description": "X coordinate in pixels" },
                "y": { "type": "integer", "description": "Y coordinate in pixels" }
            }),
            &["x", "y"],
        ),
        tool(
            "browser_move_rel",
            "Move the pointer relative to its current position.",
            json!({
                "x_offset": { "type": "integer", "description": "Horizontal offset in pixels" },
                "y_offset": { "type": "integer", "description": "Vertical offset in pixels" }
            }),
            &["x_offset", "y_offset"],
        ),
        tool(
            "browser_drag_to",
            "Drag from the current pointer position to absolute coordinates.",
            json!({
                "x": { "type": "integer", "description": "Target X coordinate" },
                "y": { "type": "integer", "description": "Target Y coordinate" }
            }),
            &["x", "y"],
        ),
        tool(
            "browser_drag_rel",
            "Drag from the current pointer position by an offset.",
            json!({
                "x_offset": { "type": "integer", "description": "Horizontal offset in pixels" },
                "y_offset": { "type": "integer", "description": "Vertical offset in pixels" }
            }),
            &["x_offset", "y_offset"],
        ),
        tool(
            "browser_type",
            "Type text at the current focus.",
            json!({
                "text": { "type": "string", "description": "Text to type" },
                "use_clipboard": {
                    "type": "boolean",
                    "description": "Paste through the clipboard instead of key events",
                    "default": true
                }
            }),
            &["text"],
        ),
        tool(
            "browser_press",
            "Press and release a single key.",
            json!({ "key": { "type": "string", "description": "Key name, e.g. enter, tab, escape" } }),
            &["key"],
        ),
        tool(
            "browser_key_down",
            "Hold a key down.",
            json!({ "key": { "type": "string", "description": "Key name" } }),
            &["key"],
        ),
        tool(
            "browser_key_up",
            "Release a held key.",
            json!({ "key": { "type": "string", "description": "Key name" } }),
            &["key"],
        ),
        tool(
            "browser_hotkey",
            "Press a key combination.",
            json!({
                "keys": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Keys pressed together, e.g. [\"ctrl\", \"c\"]"
                }
            }),
            &["keys"],
        ),
        tool(
            "browser_scroll",
            "Scroll the page by a pixel delta.",
            json!({
                "dx": { "type": "integer", "description": "Horizontal delta", "default": 0 },
                "dy": { "type": "integer", "description": "Vertical delta, positive scrolls down", "default": 0 }
            }),
            &[],
        ),
        tool(
            "browser_wait",
            "Pause before the next action.",
            json!({ "duration": { "type": "number", "description": "Seconds to wait" } }),
            &["duration"],
        ),
        tool(
            "browser_screenshot",
            "Capture the current screen.",
            json!({}),
            &[],
        ),
        tool(
            "browser_get_viewport_info",
            "Report viewport size, scroll position and current URL.",
            json!({}),
            &[],
        ),
        tool(
            "browser_navigate",
            "Open a URL in the current tab.",
            json!({ "url": { "type": "string", "description": "Absolute URL" } }),
            &["url"],
        ),
    ]
}
