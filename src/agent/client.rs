//! Provider and tool factories.
//!
//! Maps configuration to concrete [`LlmProvider`] and [`SearchTool`]
//! implementations.

use std::sync::Arc;

use crate::agent::config::AgentConfig;
use crate::agent::provider::LlmProvider;
use crate::agent::providers::{OpenAiProvider, VectorStoreSearch};
use crate::agent::tool::ToolRegistry;
use crate::error::AgentError;

/// Creates an [`LlmProvider`] based on the configured provider name.
///
/// # Supported Providers
///
/// - `"openai"` (default): OpenAI-compatible APIs via `async-openai`
///
/// # Errors
///
/// Returns [`AgentError::UnsupportedProvider`] for unknown provider names.
pub fn create_provider(config: &AgentConfig) -> Result<Box<dyn LlmProvider>, AgentError> {
    match config.provider.as_str() {
        "openai" => Ok(Box::new(OpenAiProvider::new(config))),
        other => Err(AgentError::UnsupportedProvider {
            name: other.to_string(),
        }),
    }
}

/// Builds the tool registry.
///
/// Registers document search when a collection is configured; otherwise
/// the registry is empty and every turn short-circuits with the
/// configuration message.
///
/// # Errors
///
/// Returns [`AgentError::Configuration`] if the search client cannot be built.
pub fn create_registry(config: &AgentConfig) -> Result<ToolRegistry, AgentError> {
    let mut registry = ToolRegistry::new();
    if config.has_document_collection() {
        registry.register(Arc::new(VectorStoreSearch::new(config)?))?;
    }
    Ok(registry)
}
