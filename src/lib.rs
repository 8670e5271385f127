//! # profile-agent
//!
//! A conversational assistant that answers questions about one person's
//! professional background (resume, cover letter, profile).
//!
//! Each turn makes a planning call to an LLM. If the plan declares a
//! document search, the query is run against a hosted vector store and
//! the excerpts are handed to a second LLM call that writes the final,
//! grounded answer. Otherwise the plan itself is the answer.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use profile_agent::agent::client::{create_provider, create_registry};
//! use profile_agent::agent::{AgentConfig, Orchestrator, ToolToggles};
//!
//! # async fn run() -> Result<(), profile_agent::error::AgentError> {
//! let config = AgentConfig::from_env()?;
//! let provider = create_provider(&config)?;
//! let registry = create_registry(&config)?;
//! let orchestrator = Orchestrator::new(Arc::from(provider), registry, config)?;
//! let answer = orchestrator
//!     .handle_turn("What automation tools has she used?", ToolToggles::default())
//!     .await;
//! println!("{answer}");
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod cli;
pub mod error;
