//! DOM tools: read and act on page elements by element id (`bid`) after
//! `dom_mark_elements` has labelled them.

use crate::tool;
use benchpilot_core::ToolDefinition;
use serde_json::json;

pub fn definitions() -> Vec<ToolDefinition> {
    vec![
        tool(
            "dom_get_text",
            "Return the visible text of the page.",
            json!({ "max_chars": { "type": "integer", "description": "Truncate after this many characters", "default": 8000 } }),
            &[],
        ),
        tool(
            "dom_get_html",
            "Return the page HTML.",
            json!({ "max_chars": { "type": "integer", "description": "Truncate after this many characters", "default": 12000 } }),
            &[],
        ),
        tool(
            "dom_query_selector",
            "List elements matching a CSS selector.",
            json!({
                "selector": { "type": "string", "description": "CSS selector" },
                "limit": { "type": "integer", "description": "Maximum elements returned", "default": 20 }
            }),
            &["selector"],
        ),
        tool(
            "dom_extract_links",
            "List links on the page, optionally filtered.",
            json!({
                "filter_pattern": { "type": "string", "description": "Regex applied to href and text" },
                "limit": { "type": "integer", "description": "Maximum links returned", "default": 50 }
            }),
            &[],
        ),
        tool(
            "dom_mark_elements",
            "Label interactive elements with ids and return them. Call this before other dom_* actions.",
            json!({ "max_elements": { "type": "integer", "description": "Maximum elements labelled", "default": 100 } }),
            &[],
        ),
        tool(
            "dom_click",
            "Click an element by id.",
            json!({
                "bid": { "type": "string", "description": "Element id from dom_mark_elements" },
                "button": { "type": "string", "enum": ["left", "right", "middle"], "default": "left" },
                "click_count": { "type": "integer", "enum": [1, 2], "default": 1 },
                "timeout_ms": { "type": "integer", "default": 2000 }
            }),
            &["bid"],
        ),
        tool(
            "dom_hover",
            "Hover over an element by id.",
            json!({
                "bid": { "type": "string", "description": "Element id from dom_mark_elements" },
                "timeout_ms": { "type": "integer", "default": 2000 }
            }),
            &["bid"],
        ),
        tool(
            "dom_type",
            "Type into an input element by id.",
            json!({
                "bid": { "type": "string", "description": "Element id from dom_mark_elements" },
                "text": { "type": "string", "description": "Text to enter" },
                "clear_first": { "type": "boolean", "description": "Clear existing value first", "default": true },
                "timeout_ms": { "type": "integer", "default": 2000 }
            }),
            &["bid", "text"],
        ),
        tool(
            "dom_press",
            "Press a key, optionally focused on an element.",
            json!({
                "key": { "type": "string", "description": "Key name, e.g. Enter" },
                "bid": { "type": "string", "description": "Element to focus first" },
                "timeout_ms": { "type": "integer", "default": 2000 }
            }),
            &["key"],
        ),
        tool(
            "dom_scroll",
            "Scroll the page or a scrollable element.",
            json!({
                "bid": { "type": "string", "description": "Element to scroll; the page when omitted" },
                "direction": { "type": "string", "enum": ["up", "down"], "default": "down" },
                "amount": { "type": "integer", "description": "Pixels", "default": 500 },
                "timeout_ms": { "type": "integer", "default": 2000 }
            }),
            &[],
        ),
    ]
}
