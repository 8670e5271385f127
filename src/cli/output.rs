//! Output formatting for CLI commands.

use std::fmt::Write;

use serde::Serialize;

use crate::agent::tool::{SearchOutcome, ToolDescriptor};
use crate::agent::orchestrator::{TurnPath, TurnResult};

/// Output format for command results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text.
    #[default]
    Text,
    /// Pretty-printed JSON.
    Json,
}

impl OutputFormat {
    /// Parses a format name; unknown names fall back to text.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Text,
        }
    }

    /// Serializes a value as pretty JSON with a trailing newline.
    #[must_use]
    pub fn to_json<T: Serialize>(self, value: &T) -> String {
        let mut out = serde_json::to_string_pretty(value).unwrap_or_else(|e| {
            serde_json::json!({ "error": format!("serialization failed: {e}") }).to_string()
        });
        out.push('\n');
        out
    }
}

/// Formats a turn result.
///
/// Text output is the answer, plus a diagnostics footer when `verbose`.
#[must_use]
pub fn format_turn(result: &TurnResult, format: OutputFormat, verbose: bool) -> String {
    match format {
        OutputFormat::Json => format.to_json(result),
        OutputFormat::Text => {
            let mut output = result.answer.clone();
            output.push('\n');
            if verbose {
                let _ = write!(
                    output,
                    "\n---\nPath: {} | Model calls: {} | Searches: {} | Tokens: {} | Time: {:.1}s\n",
                    describe_path(&result.path),
                    result.model_calls,
                    result.retrieval_calls,
                    result.total_tokens,
                    result.elapsed.as_secs_f64()
                );
            }
            output
        }
    }
}

fn describe_path(path: &TurnPath) -> String {
    match path {
        TurnPath::Direct => "direct reply".to_string(),
        TurnPath::PlanFailed => "planning failed".to_string(),
        TurnPath::ParseFailed { reason } => format!("plan not understood ({reason})"),
        TurnPath::ToolUsed {
            tool,
            query,
            outcome,
        } => {
            let status = match outcome {
                SearchOutcome::Found(_) => "found",
                SearchOutcome::NotFound(_) => "not found",
                SearchOutcome::Failed(_) => "failed",
            };
            format!("{tool} \"{query}\" ({status})")
        }
        TurnPath::NotConfigured => "document search disabled".to_string(),
        TurnPath::InvalidInput => "invalid input".to_string(),
    }
}

/// Formats the tool catalog.
#[must_use]
pub fn format_tools(tools: &[ToolDescriptor], format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => format.to_json(&serde_json::json!({
            "count": tools.len(),
            "tools": tools,
        })),
        OutputFormat::Text => {
            if tools.is_empty() {
                return "No tools registered. Set VECTOR_STORE_ID or pass --vector-store to enable document search.\n"
                    .to_string();
            }
            let mut output = String::new();
            for tool in tools {
                let _ = writeln!(output, "{}\n  {}", tool.name, tool.description);
            }
            output
        }
    }
}
