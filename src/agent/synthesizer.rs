//! Synthesizer agent for turning retrieved evidence into the final answer.
//!
//! Reuses the turn's conversation (system instruction, user question,
//! planner reply), appends the tool output as evidence and an instruction
//! to answer only from it, then makes one more model call.

use async_trait::async_trait;
use tracing::{debug, warn};

use super::config::AgentConfig;
use super::message::{Conversation, system_message, user_message};
use super::prompt::build_synthesis_instruction;
use super::provider::LlmProvider;
use super::tool::ToolResult;
use super::traits::{Agent, AgentResponse};

/// Agent that writes the user-facing answer from tool evidence.
///
/// Higher temperature and a larger output budget than the planner.
pub struct SynthesizerAgent {
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl SynthesizerAgent {
    /// Creates a new synthesizer from configuration.
    #[must_use]
    pub fn new(config: &AgentConfig) -> Self {
        Self {
            model: config.synthesizer_model.clone(),
            temperature: config.synthesizer_temperature,
            max_tokens: config.synthesizer_max_tokens,
        }
    }

    /// Builds the synthesis message log from the turn so far.
    #[must_use]
    pub fn build_conversation(
        question: &str,
        prior: &Conversation,
        result: &ToolResult,
    ) -> Conversation {
        let mut conversation = prior.clone();
        conversation.push(user_message(&result.evidence_text()));
        conversation.push(system_message(&build_synthesis_instruction(question, result)));
        conversation
    }

    /// Produces the final answer.
    ///
    /// Transport errors become a descriptive answer string; this never
    /// returns an error. The response is `None` when the call failed.
    pub async fn synthesize(
        &self,
        provider: &dyn LlmProvider,
        question: &str,
        prior: &Conversation,
        result: &ToolResult,
    ) -> (String, Option<AgentResponse>) {
        let conversation = Self::build_conversation(question, prior, result);
        debug!(
            tool = %result.tool_name,
            messages = conversation.len(),
            "synthesizing final answer"
        );

        match self.execute(provider, conversation.messages()).await {
            Ok(response) => {
                if response.is_truncated() {
                    warn!(
                        max_tokens = self.max_tokens,
                        "answer cut off at the output token limit"
                    );
                }
                (response.content.clone(), Some(response))
            }
            Err(e) => {
                warn!(error = %e, "synthesis call failed");
                (format!("Error generating final response: {e}"), None)
            }
        }
    }
}

#[async_trait]
impl Agent for SynthesizerAgent {
    fn name(&self) -> &'static str {
        "synthesizer"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn temperature(&self) -> f32 {
        self.temperature
    }

    fn max_tokens(&self) -> u32 {
        self.max_tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::message::{Role, assistant_message};
    use crate::agent::provider::testing::StubProvider;
    use crate::agent::tool::SearchOutcome;

    fn config() -> AgentConfig {
        AgentConfig::builder()
            .api_key("test")
            .synthesizer_model("gpt-4o")
            .synthesizer_max_tokens(1024)
            .build()
            .unwrap_or_else(|_| unreachable!())
    }

    fn prior() -> Conversation {
        let mut convo = Conversation::new("persona");
        convo.push(user_message("What tools has she used?"));
        convo.push(assistant_message(
            "TOOL_USE: I will use [file_search] to find information about [automation tools].",
        ));
        convo
    }

    fn result() -> ToolResult {
        ToolResult {
            tool_name: "file_search".to_string(),
            query: "automation tools".to_string(),
            outcome: SearchOutcome::Found("She has used Zapier and Make.".to_string()),
        }
    }

    #[test]
    fn test_agent_properties() {
        let agent = SynthesizerAgent::new(&config());
        assert_eq!(agent.name(), "synthesizer");
        assert_eq!(agent.model(), "gpt-4o");
        assert!(!agent.json_mode());
        assert!((agent.temperature() - 0.3).abs() < f32::EPSILON);
        assert_eq!(agent.max_tokens(), 1024);
    }

    #[test]
    fn test_build_conversation_extends_prior() {
        let convo = SynthesizerAgent::build_conversation(
            "What tools has she used?",
            &prior(),
            &result(),
        );
        let roles: Vec<Role> = convo.messages().iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![
                Role::System,
                Role::User,
                Role::Assistant,
                Role::User,
                Role::System
            ]
        );
        assert!(convo.messages()[3].content.contains("She has used Zapier and Make."));
        assert!(convo.messages()[4].content.contains("'What tools has she used?'"));
    }

    #[tokio::test]
    async fn test_synthesize_returns_model_text() {
        let provider = StubProvider::replying(&["She has used Zapier and Make."]);
        let agent = SynthesizerAgent::new(&config());
        let (answer, response) = agent
            .synthesize(&provider, "What tools has she used?", &prior(), &result())
            .await;
        assert_eq!(answer, "She has used Zapier and Make.");
        assert!(response.is_some());
        assert_eq!(provider.requests()[0].messages.len(), 5);
    }

    #[tokio::test]
    async fn test_synthesize_converts_transport_error() {
        let provider = StubProvider::failing("timeout");
        let agent = SynthesizerAgent::new(&config());
        let (answer, response) = agent
            .synthesize(&provider, "q", &prior(), &result())
            .await;
        assert!(answer.starts_with("Error generating final response:"));
        assert!(response.is_none());
    }
}
