//! Plan representation and parsing.
//!
//! The planner's reply is free text. It either answers the user directly
//! or declares a tool call. Two formats exist:
//!
//! - [`PlanFormat::Marker`]: a `TOOL_USE:` line of the form
//!   `TOOL_USE: I will use [file_search] to find information about [query].`
//! - [`PlanFormat::Structured`]: a versioned JSON payload, either
//!   `{"version":1,"type":"reply","text":"..."}` or
//!   `{"version":1,"type":"tool_call","tool":"...","query":"..."}`.
//!
//! [`parse_plan`] turns a [`Plan`] into a [`PlanDecision`]. Extraction
//! failures are reported as [`PlanParseFailure`], never guessed around.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::message::TokenUsage;
use super::tool::{ToolDescriptor, find_descriptor};
use crate::error::AgentError;

/// Keyword that introduces a tool declaration in marker-format plans.
pub const TOOL_MARKER: &str = "TOOL_USE:";

/// Schema version of structured plan payloads.
pub const STRUCTURED_PLAN_VERSION: u32 = 1;

/// `I will use [<tool>]`, tolerant of case and spacing.
#[allow(clippy::expect_used)]
static TOOL_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bI\s+will\s+use\s*\[([^\]\n]*)\]").expect("literal pattern compiles")
});

/// `to find information about`, tolerant of case and spacing.
#[allow(clippy::expect_used)]
static INTENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bto\s+find\s+information\s+about\b").expect("literal pattern compiles")
});

/// The intent phrase followed by an opening bracket.
#[allow(clippy::expect_used)]
static BRACKETED_INTENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bto\s+find\s+information\s+about\s*\[").expect("literal pattern compiles")
});

/// `TOOL_USE:` in any case.
#[allow(clippy::expect_used)]
static MARKER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)TOOL_USE:").expect("literal pattern compiles"));

/// How the planner signals a tool call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanFormat {
    /// Free text with a `TOOL_USE:` marker line.
    #[default]
    Marker,
    /// JSON payload validated against a fixed schema.
    Structured,
}

impl FromStr for PlanFormat {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "marker" | "text" => Ok(Self::Marker),
            "structured" | "json" => Ok(Self::Structured),
            other => Err(AgentError::Configuration {
                message: format!("unknown plan format '{other}' (expected marker or structured)"),
            }),
        }
    }
}

impl fmt::Display for PlanFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Marker => f.write_str("marker"),
            Self::Structured => f.write_str("structured"),
        }
    }
}

/// The planner's raw output for one turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    /// Model text, or an error description when `failed` is set.
    pub text: String,
    /// `true` when the planning call itself failed.
    pub failed: bool,
    /// Token usage of the planning call.
    pub usage: TokenUsage,
}

impl Plan {
    /// Wraps model output.
    #[must_use]
    pub fn from_model(text: String, usage: TokenUsage) -> Self {
        Self {
            text,
            failed: false,
            usage,
        }
    }

    /// Converts a failed planning call into displayable text.
    #[must_use]
    pub fn from_error(error: &AgentError) -> Self {
        Self {
            text: format!("Error in agent run: {error}"),
            failed: true,
            usage: TokenUsage::default(),
        }
    }
}

/// A validated tool call extracted from a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedInvocation {
    /// Registered name of the tool (canonical casing).
    pub tool_name: String,
    /// Non-empty query for the tool.
    pub query: String,
}

/// Why a plan that declared a tool call could not be used.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanParseFailure {
    /// No `I will use [...]` phrase, or its brackets were empty.
    #[error("tool name not found in plan")]
    MissingToolName,
    /// No `to find information about` phrase.
    #[error("query phrase not found in plan")]
    MissingQuery,
    /// The query was empty after trimming.
    #[error("query is empty")]
    EmptyQuery,
    /// The named tool is not registered.
    #[error("tool '{name}' is not registered")]
    UnknownTool {
        /// Name as written by the model.
        name: String,
    },
    /// A structured payload failed schema validation.
    #[error("malformed plan payload: {message}")]
    MalformedPayload {
        /// Decoder or validation message.
        message: String,
    },
}

/// What the orchestrator should do with a plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanDecision {
    /// No tool requested; the text is the answer.
    Reply(String),
    /// A valid tool call.
    Invoke(ParsedInvocation),
    /// A tool call was declared but could not be extracted.
    Unparsable(PlanParseFailure),
}

impl PlanDecision {
    /// Returns the invocation, if any.
    #[must_use]
    pub const fn invocation(&self) -> Option<&ParsedInvocation> {
        match self {
            Self::Invoke(inv) => Some(inv),
            _ => None,
        }
    }
}

/// Parses a plan in the given format against the registered tools.
#[must_use]
pub fn parse_plan(plan: &str, tools: &[ToolDescriptor], format: PlanFormat) -> PlanDecision {
    match format {
        PlanFormat::Marker => parse_marker_plan(plan, tools),
        PlanFormat::Structured => parse_structured_plan(plan, tools),
    }
}

/// Returns `true` if the text contains the tool marker (any case).
#[must_use]
pub fn has_tool_marker(plan: &str) -> bool {
    plan.to_lowercase().contains(&TOOL_MARKER.to_lowercase())
}

fn parse_marker_plan(plan: &str, tools: &[ToolDescriptor]) -> PlanDecision {
    if !has_tool_marker(plan) {
        return PlanDecision::Reply(plan.to_string());
    }

    // Only text after the marker declares the call; a preamble cannot.
    let declaration = MARKER_RE.find(plan).map_or(plan, |m| &plan[m.end()..]);
    let result = extract_tool_name(declaration).and_then(|name| {
        let query = extract_query(declaration)?;
        validate(&name, &query, tools)
    });

    match result {
        Ok(inv) => PlanDecision::Invoke(inv),
        Err(failure) => PlanDecision::Unparsable(failure),
    }
}

fn extract_tool_name(plan: &str) -> Result<String, PlanParseFailure> {
    let name = TOOL_NAME_RE
        .captures(plan)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .ok_or(PlanParseFailure::MissingToolName)?;
    if name.is_empty() {
        return Err(PlanParseFailure::MissingToolName);
    }
    Ok(name)
}

/// Query text is the bracketed argument after the intent phrase, with
/// nested brackets kept balanced. Without brackets it runs to the first
/// sentence terminator or line end.
fn extract_query(declaration: &str) -> Result<String, PlanParseFailure> {
    let raw = if let Some(open) = BRACKETED_INTENT_RE.find(declaration) {
        bracketed(&declaration[open.end()..])
    } else {
        let intent = INTENT_RE
            .find(declaration)
            .ok_or(PlanParseFailure::MissingQuery)?;
        declaration[intent.end()..]
            .split(['.', '?', '!', '\n', ']'])
            .next()
            .unwrap_or_default()
    };

    let query = trim_query(raw);
    if query.is_empty() {
        return Err(PlanParseFailure::EmptyQuery);
    }
    Ok(query.to_string())
}

/// Text up to the bracket closing an already-opened `[`. An unclosed
/// bracket runs to the end of the line.
fn bracketed(after_open: &str) -> &str {
    let mut depth = 1_usize;
    for (i, c) in after_open.char_indices() {
        match c {
            '[' => depth += 1,
            ']' => {
                depth -= 1;
                if depth == 0 {
                    return &after_open[..i];
                }
            }
            '\n' => return &after_open[..i],
            _ => {}
        }
    }
    after_open
}

/// Strips whitespace, trailing periods, and brackets that are unmatched
/// or wrap the whole query.
fn trim_query(raw: &str) -> &str {
    let mut query = raw.trim_matches(|c: char| c == '.' || c.is_whitespace());
    loop {
        let opens = query.matches('[').count();
        let closes = query.matches(']').count();
        let inner = if query.starts_with('[') && (opens > closes || wraps_whole(query)) {
            &query[1..]
        } else if query.ends_with(']') && closes > opens {
            &query[..query.len() - 1]
        } else {
            break;
        };
        query = inner.trim_matches(|c: char| c == '.' || c.is_whitespace());
    }
    query
}

/// `true` if the leading `[` is closed by the final `]`.
fn wraps_whole(query: &str) -> bool {
    if !query.ends_with(']') {
        return false;
    }
    let mut depth = 0_usize;
    for (i, c) in query.char_indices() {
        match c {
            '[' => depth += 1,
            ']' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return i == query.len() - 1;
                }
            }
            _ => {}
        }
    }
    false
}

fn validate(
    name: &str,
    query: &str,
    tools: &[ToolDescriptor],
) -> Result<ParsedInvocation, PlanParseFailure> {
    let query = trim_query(query);
    if query.is_empty() {
        return Err(PlanParseFailure::EmptyQuery);
    }
    let descriptor = find_descriptor(tools, name).ok_or_else(|| PlanParseFailure::UnknownTool {
        name: name.to_string(),
    })?;
    Ok(ParsedInvocation {
        tool_name: descriptor.name.clone(),
        query: query.to_string(),
    })
}

/// Structured plan payload.
#[derive(Debug, Deserialize)]
struct PlanEnvelope {
    version: u32,
    #[serde(flatten)]
    payload: PlanPayload,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum PlanPayload {
    Reply { text: String },
    ToolCall { tool: String, query: String },
}

fn parse_structured_plan(plan: &str, tools: &[ToolDescriptor]) -> PlanDecision {
    let trimmed = plan.trim();

    // Handle markdown code blocks
    let json_str = if trimmed.starts_with("```") {
        trimmed
            .trim_start_matches("```json")
            .trim_start_matches("```")
            .trim_end_matches("```")
            .trim()
    } else {
        trimmed
    };

    let envelope: PlanEnvelope = match serde_json::from_str(json_str) {
        Ok(e) => e,
        Err(e) => {
            return PlanDecision::Unparsable(PlanParseFailure::MalformedPayload {
                message: e.to_string(),
            });
        }
    };

    if envelope.version != STRUCTURED_PLAN_VERSION {
        return PlanDecision::Unparsable(PlanParseFailure::MalformedPayload {
            message: format!(
                "unsupported version {} (expected {STRUCTURED_PLAN_VERSION})",
                envelope.version
            ),
        });
    }

    match envelope.payload {
        PlanPayload::Reply { text } => PlanDecision::Reply(text),
        PlanPayload::ToolCall { tool, query } => {
            if tool.trim().is_empty() {
                return PlanDecision::Unparsable(PlanParseFailure::MissingToolName);
            }
            match validate(&tool, &query, tools) {
                Ok(inv) => PlanDecision::Invoke(inv),
                Err(failure) => PlanDecision::Unparsable(failure),
            }
        }
    }
}
