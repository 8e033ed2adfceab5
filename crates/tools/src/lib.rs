//! Sandbox tool catalog for BenchPilot.
//!
//! The catalog is what the controller advertises to the model: browser and
//! DOM control, file access, code and shell execution, plus `task_complete`.
//! Which groups are offered depends on the configured [`ClientType`].
//!
//! The crate also owns the mapping from a model's tool call back to an
//! [`Action`](benchpilot_core::Action), and the plain-text rendering used
//! when a model receives tools inside the prompt instead of natively.

pub mod browser;
pub mod dom;
pub mod file;
pub mod mapping;
pub mod shell;
pub mod text;

use benchpilot_config::ClientType;
use benchpilot_core::ToolDefinition;
use serde_json::{Value, json};

pub use mapping::{action_type_for, map_tool_call};
pub use text::{TOOL_CALL_FORMAT, format_tools_as_text};

/// Build a definition from a `properties` object and the required keys.
pub(crate) fn tool(name: &str, description: &str, properties: Value, required: &[&str]) -> ToolDefinition {
    ToolDefinition {
        name: name.into(),
        description: description.into(),
        parameters: json!({
            "type": "object",
            "properties": properties,
            "required": required,
        }),
    }
}

/// An ordered set of tool definitions offered to the model.
///
/// Order is preserved so the advertised list is stable across turns.
#[derive(Debug, Clone, Default)]
pub struct ToolCatalog {
    tools: Vec<ToolDefinition>,
}

impl ToolCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// The catalog for a sandbox client type.
    pub fn for_client(client_type: ClientType) -> Self {
        let mut catalog = Self::new();
        match client_type {
            ClientType::Unified => {
                catalog.extend(browser::definitions());
                catalog.extend(dom::definitions());
                catalog.extend(file::definitions());
                catalog.register(shell::code_execute());
                catalog.register(shell::shell_execute());
            }
            ClientType::Browser => {
                catalog.extend(browser::definitions());
                catalog.extend(dom::definitions());
            }
            ClientType::File => catalog.extend(file::definitions()),
            ClientType::Code | ClientType::Jupyter => catalog.register(shell::code_execute()),
            ClientType::Shell => catalog.register(shell::shell_execute()),
            ClientType::None => return catalog,
        }
        catalog.register(shell::task_complete());
        catalog
    }

    /// Register a tool. Replaces any existing tool with the same name in place.
    pub fn register(&mut self, tool: ToolDefinition) {
        match self.tools.iter_mut().find(|t| t.name == tool.name) {
            Some(existing) => {
                tracing::debug!(tool = %tool.name, "Replacing tool definition");
                *existing = tool;
            }
            None => self.tools.push(tool),
        }
    }

    pub fn extend(&mut self, tools: impl IntoIterator<Item = ToolDefinition>) {
        for tool in tools {
            self.register(tool);
        }
    }

    pub fn get(&self, name: &str) -> Option<&ToolDefinition> {
        self.tools.iter().find(|t| t.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn definitions(&self) -> &[ToolDefinition] {
        &self.tools
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Render the catalog for prompt injection.
    pub fn to_text(&self) -> String {
        format_tools_as_text(&self.tools)
    }
}

/// Shorthand for `ToolCatalog::for_client(client_type).definitions()`.
pub fn tools_for(client_type: ClientType) -> Vec<ToolDefinition> {
    ToolCatalog::for_client(client_type).tools
}
