//! Tool types for the planning loop.
//!
//! A tool is a named search capability: it takes a free-text query and
//! returns a [`SearchOutcome`]. Tools are registered by name in a
//! [`ToolRegistry`]; lookups are case-insensitive.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::AgentError;

/// Name and description of a registered tool, as shown to the planner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// Tool name (unique per registry, compared case-insensitively).
    pub name: String,
    /// Human-readable description of what the tool does.
    pub description: String,
}

/// What a search returned.
///
/// "Nothing found" and "the call failed" are distinct outcomes so the
/// synthesizer can be told which one happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "text", rename_all = "snake_case")]
pub enum SearchOutcome {
    /// Grounded evidence text.
    Found(String),
    /// The collection holds nothing relevant; the text explains this.
    NotFound(String),
    /// The search call failed; the text describes the error.
    Failed(String),
}

impl SearchOutcome {
    /// The text carried by the outcome.
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::Found(t) | Self::NotFound(t) | Self::Failed(t) => t,
        }
    }

    /// Returns `true` if evidence was found.
    #[must_use]
    pub const fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }
}

/// The result of dispatching one tool invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolResult {
    /// Tool that was invoked.
    pub tool_name: String,
    /// Query passed to the tool.
    pub query: String,
    /// What the tool returned.
    pub outcome: SearchOutcome,
}

impl ToolResult {
    /// Renders the result as the evidence block handed to synthesis.
    #[must_use]
    pub fn evidence_text(&self) -> String {
        format!(
            "--- Information retrieved by {} for query '{}' ---\n{}\n--- End of Information ---",
            self.tool_name,
            self.query,
            self.outcome.text()
        )
    }
}

/// A search capability the planner may invoke.
#[async_trait]
pub trait SearchTool: Send + Sync {
    /// Tool name the planner must reference.
    fn name(&self) -> &str;

    /// Capability summary shown to the planner.
    fn description(&self) -> &str;

    /// Runs a single query.
    ///
    /// Implementations return `Ok(SearchOutcome::NotFound(..))` when the
    /// collection has nothing relevant and reserve `Err` for transport
    /// failures.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError`] on network, API, or decoding failures.
    async fn query(&self, query: &str) -> Result<SearchOutcome, AgentError>;

    /// Descriptor for this tool.
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: self.name().to_string(),
            description: self.description().to_string(),
        }
    }
}

/// Mapping from tool name to implementation.
///
/// Keys are lowercased names, so `File_Search` and `file_search` refer
/// to the same tool. Iteration order is by name.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn SearchTool>>,
}

impl ToolRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a tool.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Configuration`] if the name is empty or a
    /// tool with the same (case-insensitive) name is already registered.
    pub fn register(&mut self, tool: Arc<dyn SearchTool>) -> Result<(), AgentError> {
        let key = tool.name().trim().to_lowercase();
        if key.is_empty() {
            return Err(AgentError::Configuration {
                message: "tool name cannot be empty".to_string(),
            });
        }
        if self.tools.contains_key(&key) {
            return Err(AgentError::Configuration {
                message: format!("tool '{}' is already registered", tool.name()),
            });
        }
        self.tools.insert(key, tool);
        Ok(())
    }

    /// Looks up a tool by name, ignoring case and surrounding whitespace.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<dyn SearchTool>> {
        self.tools.get(&name.trim().to_lowercase())
    }

    /// Descriptors for every registered tool.
    #[must_use]
    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        self.tools.values().map(|t| t.descriptor()).collect()
    }

    /// Returns `true` if no tools are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Number of registered tools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.tools.keys()).finish()
    }
}

/// Finds the descriptor whose name matches `name` case-insensitively.
#[must_use]
pub fn find_descriptor<'a>(tools: &'a [ToolDescriptor], name: &str) -> Option<&'a ToolDescriptor> {
    let needle = name.trim();
    tools.iter().find(|t| t.name.eq_ignore_ascii_case(needle))
}
