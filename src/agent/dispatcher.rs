//! Tool dispatch.
//!
//! Runs a validated [`ParsedInvocation`] against the registry. Every
//! failure, including an unknown tool or a timeout, is folded into a
//! [`SearchOutcome::Failed`] so the turn can still reach synthesis.

use std::time::Duration;

use tracing::{info, warn};

use super::plan::ParsedInvocation;
use super::tool::{SearchOutcome, ToolRegistry, ToolResult};
use crate::error::AgentError;

/// Calls one tool per invocation, bounded by a timeout.
#[derive(Debug, Clone, Copy)]
pub struct ToolDispatcher {
    timeout: Duration,
}

impl ToolDispatcher {
    /// Creates a dispatcher with the given per-call timeout.
    #[must_use]
    pub const fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Dispatches the invocation. Never retries.
    pub async fn dispatch(
        &self,
        invocation: &ParsedInvocation,
        registry: &ToolRegistry,
    ) -> ToolResult {
        let outcome = match registry.get(&invocation.tool_name) {
            None => {
                warn!(tool = %invocation.tool_name, "dispatch to unregistered tool");
                SearchOutcome::Failed(format!(
                    "Tool '{}' is not registered.",
                    invocation.tool_name
                ))
            }
            Some(tool) => {
                info!(tool = %invocation.tool_name, query = %invocation.query, "dispatching tool");
                let call = tool.query(&invocation.query);
                let result = tokio::time::timeout(self.timeout, call)
                    .await
                    .unwrap_or_else(|_| {
                        Err(AgentError::Timeout {
                            operation: "document search".to_string(),
                            secs: self.timeout.as_secs(),
                        })
                    });
                match result {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        warn!(tool = %invocation.tool_name, error = %e, "tool call failed");
                        SearchOutcome::Failed(format!("Error during file search: {e}"))
                    }
                }
            }
        };

        ToolResult {
            tool_name: invocation.tool_name.clone(),
            query: invocation.query.clone(),
            outcome,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;

    use super::*;
    use crate::agent::tool::SearchTool;
    use crate::agent::tool::testing::StubSearch;

    fn invocation(tool: &str) -> ParsedInvocation {
        ParsedInvocation {
            tool_name: tool.to_string(),
            query: "automation tools".to_string(),
        }
    }

    fn registry_with(tool: Arc<dyn SearchTool>) -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        registry.register(tool).unwrap_or_else(|_| unreachable!());
        registry
    }

    #[tokio::test]
    async fn test_dispatch_found() {
        let stub = Arc::new(StubSearch::found("file_search", "She has used Zapier."));
        let registry = registry_with(stub.clone());
        let dispatcher = ToolDispatcher::new(Duration::from_secs(5));

        let result = dispatcher.dispatch(&invocation("file_search"), &registry).await;
        assert_eq!(
            result.outcome,
            SearchOutcome::Found("She has used Zapier.".to_string())
        );
        assert_eq!(stub.queries(), vec!["automation tools"]);
    }

    #[tokio::test]
    async fn test_dispatch_unknown_tool_is_failed_outcome() {
        let registry = registry_with(Arc::new(StubSearch::found("file_search", "x")));
        let dispatcher = ToolDispatcher::new(Duration::from_secs(5));

        let result = dispatcher.dispatch(&invocation("web_search"), &registry).await;
        assert!(matches!(result.outcome, SearchOutcome::Failed(ref m) if m.contains("web_search")));
    }

    #[tokio::test]
    async fn test_dispatch_wraps_transport_error() {
        let stub = Arc::new(StubSearch::failing("file_search", "503 Service Unavailable"));
        let registry = registry_with(stub.clone());
        let dispatcher = ToolDispatcher::new(Duration::from_secs(5));

        let result = dispatcher.dispatch(&invocation("file_search"), &registry).await;
        assert!(matches!(
            result.outcome,
            SearchOutcome::Failed(ref m) if m.contains("503 Service Unavailable")
        ));
        assert_eq!(stub.queries().len(), 1);
    }

    struct SlowSearch;

    #[async_trait]
    impl SearchTool for SlowSearch {
        fn name(&self) -> &str {
            "file_search"
        }

        fn description(&self) -> &str {
            "never answers in time"
        }

        async fn query(&self, _query: &str) -> Result<SearchOutcome, AgentError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(SearchOutcome::Found("late".to_string()))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispatch_timeout_is_failed_outcome() {
        let registry = registry_with(Arc::new(SlowSearch));
        let dispatcher = ToolDispatcher::new(Duration::from_secs(1));

        let result = dispatcher.dispatch(&invocation("file_search"), &registry).await;
        assert!(matches!(result.outcome, SearchOutcome::Failed(ref m) if m.contains("timed out")));
    }
}
