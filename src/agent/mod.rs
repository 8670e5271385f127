//! Conversational turn pipeline.
//!
//! Answers questions about a person's professional background by letting
//! an LLM decide whether to search a document collection, running at
//! most one search, and synthesizing a grounded answer from the result.
//!
//! # Architecture
//!
//! ```text
//! User message → Orchestrator
//!   ├── input guards / retrieval toggle (no remote calls)
//!   ├── PlannerAgent (1 model call) → Plan
//!   ├── parse_plan → Reply | Invoke | Unparsable
//!   │   ├── Reply       → answer = plan
//!   │   └── Unparsable  → answer = plan + clarification note
//!   ├── ToolDispatcher → SearchTool::query (1 retrieval call)
//!   └── SynthesizerAgent (1 model call) → answer
//! ```

pub mod client;
pub mod config;
pub mod dispatcher;
pub mod message;
pub mod orchestrator;
pub mod plan;
pub mod planner;
pub mod prompt;
pub mod provider;
pub mod providers;
pub mod synthesizer;
pub mod tool;
pub mod traits;

// Re-export key types
pub use config::AgentConfig;
pub use dispatcher::ToolDispatcher;
pub use message::{ChatMessage, ChatRequest, ChatResponse, Conversation, Role, TokenUsage};
pub use orchestrator::{Orchestrator, ToolToggles, TurnPath, TurnResult, TurnState};
pub use plan::{ParsedInvocation, Plan, PlanDecision, PlanFormat, PlanParseFailure, parse_plan};
pub use planner::PlannerAgent;
pub use prompt::PromptSet;
pub use provider::LlmProvider;
pub use synthesizer::SynthesizerAgent;
pub use tool::{SearchOutcome, SearchTool, ToolDescriptor, ToolRegistry, ToolResult};
pub use traits::{Agent, AgentResponse};
