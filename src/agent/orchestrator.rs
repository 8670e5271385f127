//! Orchestrator for a single conversational turn.
//!
//! Coordinates the turn pipeline: planning → plan extraction → at most
//! one tool dispatch → synthesis. Every failure is converted to answer
//! text; a turn always produces a string.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, info};

use super::config::AgentConfig;
use super::dispatcher::ToolDispatcher;
use super::plan::{PlanDecision, parse_plan};
use super::planner::PlannerAgent;
use super::prompt::{CLARIFICATION_SUFFIX, PromptSet};
use super::provider::LlmProvider;
use super::synthesizer::SynthesizerAgent;
use super::tool::{SearchOutcome, ToolRegistry};
use crate::error::AgentError;

/// Largest accepted user message, in bytes.
pub const MAX_MESSAGE_LEN: usize = 10_000;

/// Per-turn capability switches supplied by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolToggles {
    /// Whether document search may be used.
    pub retrieval: bool,
}

impl Default for ToolToggles {
    fn default() -> Self {
        Self { retrieval: true }
    }
}

/// Stage of a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    /// Waiting on the planning call.
    Planning,
    /// Deciding between a direct reply and a tool call.
    Extracting,
    /// Waiting on the tool.
    Dispatching,
    /// Waiting on the synthesis call.
    Synthesizing,
    /// Answer produced.
    Done,
}

impl TurnState {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Planning => "planning",
            Self::Extracting => "extracting",
            Self::Dispatching => "dispatching",
            Self::Synthesizing => "synthesizing",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for TurnState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a turn reached its answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TurnPath {
    /// The plan was the answer.
    Direct,
    /// The planning call failed; the answer describes the error.
    PlanFailed,
    /// A tool call was declared but could not be extracted.
    ParseFailed {
        /// Parse failure description.
        reason: String,
    },
    /// A tool was dispatched and its output synthesized.
    ToolUsed {
        /// Tool that ran.
        tool: String,
        /// Query passed to it.
        query: String,
        /// What it returned.
        outcome: SearchOutcome,
    },
    /// Document search is off or unconfigured.
    NotConfigured,
    /// The message was empty or too long.
    InvalidInput,
}

/// Final result of one turn.
#[derive(Debug, Clone, Serialize)]
pub struct TurnResult {
    /// User-facing answer.
    pub answer: String,
    /// Path taken through the pipeline.
    pub path: TurnPath,
    /// Chat completion calls issued.
    pub model_calls: u32,
    /// Tool calls issued.
    pub retrieval_calls: u32,
    /// Total tokens consumed.
    pub total_tokens: u32,
    /// Wall time of the turn.
    #[serde(serialize_with = "serialize_duration")]
    pub elapsed: Duration,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn serialize_duration<S>(d: &Duration, s: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    s.serialize_f64(d.as_secs_f64())
}

/// Counters and state for a turn in flight.
struct TurnProgress {
    state: TurnState,
    start: Instant,
    model_calls: u32,
    retrieval_calls: u32,
    total_tokens: u32,
}

impl TurnProgress {
    fn new() -> Self {
        Self {
            state: TurnState::Planning,
            start: Instant::now(),
            model_calls: 0,
            retrieval_calls: 0,
            total_tokens: 0,
        }
    }

    fn advance(&mut self, next: TurnState) {
        info!(from = %self.state, to = %next, "turn state");
        self.state = next;
    }

    fn record_model_call(&mut self, tokens: u32) {
        self.model_calls += 1;
        self.total_tokens = self.total_tokens.saturating_add(tokens);
    }

    fn finish(mut self, answer: String, path: TurnPath) -> TurnResult {
        self.advance(TurnState::Done);
        TurnResult {
            answer,
            path,
            model_calls: self.model_calls,
            retrieval_calls: self.retrieval_calls,
            total_tokens: self.total_tokens,
            elapsed: self.start.elapsed(),
        }
    }
}

/// Runs conversational turns.
///
/// Holds no per-turn state; concurrent turns share nothing mutable.
pub struct Orchestrator {
    provider: Arc<dyn LlmProvider>,
    registry: ToolRegistry,
    config: AgentConfig,
    prompts: PromptSet,
    planner: PlannerAgent,
    synthesizer: SynthesizerAgent,
    dispatcher: ToolDispatcher,
}

impl Orchestrator {
    /// Creates an orchestrator, loading persona instructions from
    /// [`AgentConfig::instructions_path`] or the default locations.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Prompt`] if an explicit instructions file
    /// cannot be read.
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        registry: ToolRegistry,
        config: AgentConfig,
    ) -> Result<Self, AgentError> {
        let prompts = PromptSet::load(config.instructions_path.as_deref())?;
        Ok(Self::with_prompts(provider, registry, config, prompts))
    }

    /// Creates an orchestrator with already-resolved instructions.
    #[must_use]
    pub fn with_prompts(
        provider: Arc<dyn LlmProvider>,
        registry: ToolRegistry,
        config: AgentConfig,
        prompts: PromptSet,
    ) -> Self {
        Self {
            planner: PlannerAgent::new(&config),
            synthesizer: SynthesizerAgent::new(&config),
            dispatcher: ToolDispatcher::new(config.timeout),
            provider,
            registry,
            config,
            prompts,
        }
    }

    /// The tool registry.
    #[must_use]
    pub const fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// The resolved persona instructions.
    #[must_use]
    pub const fn prompts(&self) -> &PromptSet {
        &self.prompts
    }

    /// Message shown when document search is unavailable.
    #[must_use]
    pub fn not_configured_message(&self) -> String {
        format!(
            "Document Search is currently disabled. Please enable it to ask questions about {}.",
            self.config.subject
        )
    }

    /// Runs a turn and returns only the answer.
    pub async fn handle_turn(&self, user_msg: &str, toggles: ToolToggles) -> String {
        self.run_turn(user_msg, toggles).await.answer
    }

    /// Runs a turn and returns the answer with diagnostics.
    ///
    /// Issues at most two model calls and one tool call, never retries,
    /// and never fails: transport errors become answer text.
    pub async fn run_turn(&self, user_msg: &str, toggles: ToolToggles) -> TurnResult {
        let mut turn = TurnProgress::new();

        if let Some(reply) = self.check_input(user_msg) {
            return turn.finish(reply, TurnPath::InvalidInput);
        }

        if !toggles.retrieval || self.registry.is_empty() {
            debug!(
                retrieval = toggles.retrieval,
                tools = self.registry.len(),
                "document search unavailable"
            );
            return turn.finish(self.not_configured_message(), TurnPath::NotConfigured);
        }

        let tools = self.registry.descriptors();
        let (plan, conversation) = self
            .planner
            .plan(
                self.provider.as_ref(),
                user_msg,
                &tools,
                &self.prompts.instructions,
            )
            .await;
        turn.record_model_call(plan.usage.total_tokens);

        if plan.failed {
            return turn.finish(plan.text, TurnPath::PlanFailed);
        }

        turn.advance(TurnState::Extracting);
        let invocation = match parse_plan(&plan.text, &tools, self.config.plan_format) {
            PlanDecision::Reply(text) => return turn.finish(text, TurnPath::Direct),
            PlanDecision::Unparsable(reason) => {
                debug!(%reason, "tool call declared but not extracted");
                return turn.finish(
                    format!("{}{CLARIFICATION_SUFFIX}", plan.text),
                    TurnPath::ParseFailed {
                        reason: reason.to_string(),
                    },
                );
            }
            PlanDecision::Invoke(invocation) => invocation,
        };

        turn.advance(TurnState::Dispatching);
        let result = self.dispatcher.dispatch(&invocation, &self.registry).await;
        turn.retrieval_calls += 1;
        debug!(
            tool = %result.tool_name,
            found = result.outcome.is_found(),
            "tool dispatched"
        );

        turn.advance(TurnState::Synthesizing);
        let (answer, response) = self
            .synthesizer
            .synthesize(self.provider.as_ref(), user_msg, &conversation, &result)
            .await;
        turn.record_model_call(response.map_or(0, |r| r.usage.total_tokens));

        turn.finish(
            answer,
            TurnPath::ToolUsed {
                tool: result.tool_name,
                query: result.query,
                outcome: result.outcome,
            },
        )
    }

    /// Returns a fixed reply if the message should not reach the model.
    fn check_input(&self, user_msg: &str) -> Option<String> {
        if user_msg.trim().is_empty() {
            return Some(format!(
                "Please ask a question about {}.",
                self.config.subject
            ));
        }
        if user_msg.len() > MAX_MESSAGE_LEN {
            return Some(format!(
                "Your message is too long ({} bytes, max {MAX_MESSAGE_LEN}). Please shorten it.",
                user_msg.len()
            ));
        }
        None
    }
}

impl fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Orchestrator")
            .field("provider", &self.provider.name())
            .field("registry", &self.registry)
            .field("plan_format", &self.config.plan_format)
            .field("instructions_source", &self.prompts.source)
            .finish_non_exhaustive()
    }
}
