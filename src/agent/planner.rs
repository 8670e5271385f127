//! Planning agent.
//!
//! Issues the first model call of a turn. The model either answers the
//! user directly or declares which tool to call and with what query.

use async_trait::async_trait;
use tracing::{debug, warn};

use super::config::AgentConfig;
use super::message::{Conversation, assistant_message, user_message};
use super::plan::{Plan, PlanFormat};
use super::prompt::build_planner_prompt;
use super::provider::LlmProvider;
use super::tool::ToolDescriptor;
use super::traits::Agent;

/// Agent that produces the plan for a turn.
///
/// Low temperature and a short output budget: plans are either a tool
/// declaration or a brief direct reply.
pub struct PlannerAgent {
    model: String,
    temperature: f32,
    max_tokens: u32,
    format: PlanFormat,
    subject: String,
}

impl PlannerAgent {
    /// Creates a new planner from configuration.
    #[must_use]
    pub fn new(config: &AgentConfig) -> Self {
        Self {
            model: config.planner_model.clone(),
            temperature: config.planner_temperature,
            max_tokens: config.planner_max_tokens,
            format: config.plan_format,
            subject: config.subject.clone(),
        }
    }

    /// Runs the planning call.
    ///
    /// Builds the conversation (system instruction, then the user
    /// message), issues exactly one chat call, and appends the reply to
    /// the conversation. Transport errors are converted into a failed
    /// [`Plan`]; this never returns an error.
    pub async fn plan(
        &self,
        provider: &dyn LlmProvider,
        user_msg: &str,
        tools: &[ToolDescriptor],
        instructions: &str,
    ) -> (Plan, Conversation) {
        let system = build_planner_prompt(instructions, tools, &self.subject, self.format);
        let mut conversation = Conversation::new(&system);
        conversation.push(user_message(user_msg));

        match self.execute(provider, conversation.messages()).await {
            Ok(response) => {
                debug!(plan = %response.content, "planner response");
                conversation.push(assistant_message(&response.content));
                (Plan::from_model(response.content, response.usage), conversation)
            }
            Err(e) => {
                warn!(error = %e, "planning call failed");
                (Plan::from_error(&e), conversation)
            }
        }
    }
}

#[async_trait]
impl Agent for PlannerAgent {
    fn name(&self) -> &'static str {
        "planner"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn json_mode(&self) -> bool {
        self.format == PlanFormat::Structured
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
    use crate::agent::message::Role;
    use crate::agent::provider::testing::StubProvider;

    fn tools() -> Vec<ToolDescriptor> {
        vec![ToolDescriptor {
            name: "file_search".to_string(),
            description: "docs".to_string(),
        }]
    }

    fn config() -> AgentConfig {
        AgentConfig::builder()
            .api_key("test")
            .planner_model("gpt-4o-mini")
            .build()
            .unwrap_or_else(|_| unreachable!())
    }

    #[test]
    fn test_agent_properties() {
        let agent = PlannerAgent::new(&config());
        assert_eq!(agent.name(), "planner");
        assert_eq!(agent.model(), "gpt-4o-mini");
        assert!(!agent.json_mode());
        assert!((agent.temperature() - 0.05).abs() < f32::EPSILON);
        assert_eq!(agent.max_tokens(), 300);
    }

    #[test]
    fn test_structured_format_uses_json_mode() {
        let config = AgentConfig::builder()
            .api_key("test")
            .plan_format(PlanFormat::Structured)
            .build()
            .unwrap_or_else(|_| unreachable!());
        assert!(PlannerAgent::new(&config).json_mode());
    }

    #[tokio::test]
    async fn test_plan_builds_conversation() {
        let provider = StubProvider::replying(&["Hi! How can I help?"]);
        let agent = PlannerAgent::new(&config());
        let (plan, convo) = agent.plan(&provider, "hello", &tools(), "Persona").await;

        assert!(!plan.failed);
        assert_eq!(plan.text, "Hi! How can I help?");
        let roles: Vec<Role> = convo.messages().iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::System, Role::User, Role::Assistant]);
        assert!(convo.system_instruction().starts_with("Persona"));

        let requests = provider.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].messages.len(), 2);
        assert_eq!(requests[0].max_tokens, Some(300));
    }

    #[tokio::test]
    async fn test_plan_converts_transport_error() {
        let provider = StubProvider::failing("rate limited");
        let agent = PlannerAgent::new(&config());
        let (plan, convo) = agent.plan(&provider, "hello", &tools(), "Persona").await;

        assert!(plan.failed);
        assert!(plan.text.contains("rate limited"));
        assert_eq!(convo.len(), 2);
    }
}
