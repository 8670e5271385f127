//! Error types for profile-agent.
//!
//! [`AgentError`] covers the turn pipeline (model calls, retrieval,
//! configuration). [`CommandError`] covers the CLI host. Turn-level
//! errors are converted to user-visible text at the component that
//! issued the failing call; only startup errors reach `main`.

use std::path::PathBuf;

use thiserror::Error;

/// Result alias for CLI command execution.
pub type Result<T> = std::result::Result<T, CommandError>;

/// Errors raised by the agent pipeline.
#[derive(Debug, Error)]
pub enum AgentError {
    /// No API key was supplied via builder or environment.
    #[error("API key missing: set OPENAI_API_KEY or PROFILE_AGENT_API_KEY")]
    ApiKeyMissing,

    /// The chat completion API returned an error or could not be reached.
    #[error("API request failed: {message}")]
    ApiRequest {
        /// Error description from the transport or API.
        message: String,
        /// HTTP status code, if one was received.
        status: Option<u16>,
    },

    /// A remote call exceeded the configured timeout.
    #[error("{operation} timed out after {secs}s")]
    Timeout {
        /// Which call timed out (e.g. `"planning call"`).
        operation: String,
        /// Timeout that elapsed, in seconds.
        secs: u64,
    },

    /// The document retrieval service failed.
    #[error("document search failed: {message}")]
    Retrieval {
        /// Error description.
        message: String,
        /// HTTP status code, if one was received.
        status: Option<u16>,
    },

    /// A remote response could not be decoded.
    #[error("failed to parse response: {message}")]
    ResponseParse {
        /// What went wrong.
        message: String,
        /// The offending content.
        content: String,
    },

    /// The configured provider name is not known.
    #[error("unsupported provider: {name}")]
    UnsupportedProvider {
        /// Provider name as configured.
        name: String,
    },

    /// Invalid or incomplete configuration.
    #[error("configuration error: {message}")]
    Configuration {
        /// Description of the problem.
        message: String,
    },

    /// A prompt file exists but could not be read.
    #[error("failed to read prompt file {}: {source}", path.display())]
    Prompt {
        /// Path that failed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl AgentError {
    /// Returns `true` for failures of a remote call (network, API, timeout).
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::ApiRequest { .. }
                | Self::Timeout { .. }
                | Self::Retrieval { .. }
                | Self::ResponseParse { .. }
        )
    }
}

/// Errors raised by CLI commands.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Agent configuration or pipeline error surfaced at startup.
    #[error(transparent)]
    Agent(#[from] AgentError),

    /// Filesystem or terminal I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Output could not be serialized.
    #[error("output error: {0}")]
    Output(String),

    /// Invalid command-line argument.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl From<serde_json::Error> for CommandError {
    fn from(e: serde_json::Error) -> Self {
        Self::Output(e.to_string())
    }
}
