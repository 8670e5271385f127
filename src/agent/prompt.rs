//! Persona instructions and prompt builders.
//!
//! The persona text is supplied by the host (a markdown file) and passed
//! through verbatim as the seed of the planner's system message. The
//! builders here wrap it with the tool catalog and the invocation
//! contract for the configured [`PlanFormat`].

use std::fmt::Write;
use std::path::{Path, PathBuf};

use super::plan::{PlanFormat, STRUCTURED_PLAN_VERSION, TOOL_MARKER};
use super::tool::{SearchOutcome, ToolDescriptor, ToolResult};
use crate::error::AgentError;

/// Compiled-in persona used when no instructions file is found.
pub const DEFAULT_INSTRUCTIONS: &str = r"You are an application assistant that answers questions about a candidate's professional background for recruiters and hiring managers.

## Tone

- Direct, warm, and concise. No fluff.
- Speak about the candidate in the third person.

## Ground Rules

- Only state facts that come from the candidate's documents.
- If the documents do not contain the answer, say so plainly and suggest a related question you can answer.
- Never invent employers, dates, titles, tools, or metrics.
- For questions unrelated to the candidate's professional profile, politely steer the conversation back.";

/// Appended to the plan when a tool call was declared but not understood.
pub const CLARIFICATION_SUFFIX: &str =
    "\n\n(Note: Tool name or query was not correctly identified in the plan. Please try rephrasing.)";

/// Example questions shown by the chat host.
pub const EXAMPLE_QUESTIONS: &[&str] = &[
    "What are the candidate's key motivations?",
    "Describe the candidate's experience with AI-driven marketing.",
    "What skills are highlighted in the resume?",
    "How would the candidate handle a project that's off the rails?",
];

/// Default prompt directory under the user's home.
const DEFAULT_PROMPT_DIR: &str = ".config/profile-agent";

/// Filename for the persona instructions.
const INSTRUCTIONS_FILENAME: &str = "instructions.md";

/// Persona instructions resolved for this process.
#[derive(Debug, Clone)]
pub struct PromptSet {
    /// Persona/behavior instructions, passed verbatim to the planner.
    pub instructions: String,
    /// Where the instructions came from (`None` for the compiled-in default).
    pub source: Option<PathBuf>,
}

impl PromptSet {
    /// Loads the persona instructions.
    ///
    /// Resolution order:
    /// 1. Explicit `path` (from `--instructions` or config)
    /// 2. `~/.config/profile-agent/instructions.md`
    /// 3. Compiled-in [`DEFAULT_INSTRUCTIONS`]
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Prompt`] if an explicit path was given but
    /// cannot be read. A missing default-location file is not an error.
    pub fn load(path: Option<&Path>) -> Result<Self, AgentError> {
        if let Some(path) = path {
            let instructions =
                std::fs::read_to_string(path).map_err(|source| AgentError::Prompt {
                    path: path.to_path_buf(),
                    source,
                })?;
            return Ok(Self {
                instructions,
                source: Some(path.to_path_buf()),
            });
        }

        let from_default_dir = Self::default_dir()
            .map(|dir| dir.join(INSTRUCTIONS_FILENAME))
            .and_then(|p| std::fs::read_to_string(&p).ok().map(|text| (text, p)));

        Ok(from_default_dir.map_or_else(Self::defaults, |(instructions, p)| Self {
            instructions,
            source: Some(p),
        }))
    }

    /// Returns compiled-in defaults without checking the filesystem.
    #[must_use]
    pub fn defaults() -> Self {
        Self {
            instructions: DEFAULT_INSTRUCTIONS.to_string(),
            source: None,
        }
    }

    /// Writes the default instructions file into `dir`.
    ///
    /// Creates the directory if needed. An existing file is **not**
    /// overwritten; in that case the returned list is empty.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if directory creation or file writing fails.
    pub fn write_defaults(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
        std::fs::create_dir_all(dir)?;

        let path = dir.join(INSTRUCTIONS_FILENAME);
        if path.exists() {
            return Ok(Vec::new());
        }
        std::fs::write(&path, DEFAULT_INSTRUCTIONS)?;
        Ok(vec![path])
    }

    /// Returns the default prompt directory under the user's home.
    #[must_use]
    pub fn default_dir() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(DEFAULT_PROMPT_DIR))
    }
}

/// Builds the planner's system message.
///
/// Embeds the persona verbatim, lists every tool, fixes the invocation
/// contract for `format`, and allows direct replies to small talk.
#[must_use]
pub fn build_planner_prompt(
    instructions: &str,
    tools: &[ToolDescriptor],
    subject: &str,
    format: PlanFormat,
) -> String {
    let mut prompt = String::with_capacity(instructions.len() + 1024);
    prompt.push_str(instructions);
    prompt.push_str("\n\nYou have access to the following tools:\n");
    for tool in tools {
        let _ = writeln!(prompt, "- **{}**: {}", tool.name, tool.description);
    }

    let example_tool = tools.first().map_or("file_search", |t| t.name.as_str());

    let _ = write!(
        prompt,
        "\nYOUR PROCESS FOR RESPONDING TO QUESTIONS ABOUT {subject}:\n\
         1. Analyze the user's question.\n\
         2. Plan tool usage: you MUST use a tool for any informational request about {subject}.\n"
    );

    match format {
        PlanFormat::Marker => {
            let _ = write!(
                prompt,
                "   State your plan using this exact format:\n   \
                 `{TOOL_MARKER} I will use [{example_tool}] to find information about [specific query for the tool].`\n   \
                 The tool name inside the first brackets must be exactly one of the tool names listed above.\n"
            );
        }
        PlanFormat::Structured => {
            let _ = write!(
                prompt,
                "   Respond with a single JSON object and nothing else.\n   \
                 To use a tool: {{\"version\":{STRUCTURED_PLAN_VERSION},\"type\":\"tool_call\",\"tool\":\"{example_tool}\",\"query\":\"specific query for the tool\"}}\n   \
                 To reply directly: {{\"version\":{STRUCTURED_PLAN_VERSION},\"type\":\"reply\",\"text\":\"your reply\"}}\n"
            );
        }
    }

    let _ = write!(
        prompt,
        "3. After the tool runs you will receive its output. Present that information as your answer. \
         If the tool reports that information is not available, relay that. Do NOT invent information.\n\n\
         If the user's message is not an informational question about {subject} (for example a greeting), \
         respond directly without using a tool.\n\
         Begin by stating your plan or by answering directly if no tool is needed."
    );

    prompt
}

/// Builds the system instruction appended before the synthesis call.
///
/// The instruction names the tool, restates the original question, and
/// spells out how to handle missing or failed evidence.
#[must_use]
pub fn build_synthesis_instruction(question: &str, result: &ToolResult) -> String {
    let mut instruction = format!(
        "The '{}' tool provided the information above.\n\n\
         Present this information as your final answer to the original user question: '{question}'. \
         Use ONLY the retrieved information. Keep your persona and tone.",
        result.tool_name
    );

    match &result.outcome {
        SearchOutcome::Found(_) => {
            instruction.push_str(
                " If the information does not fully answer the question, say which part is not covered. \
                 Do not make up information.",
            );
        }
        SearchOutcome::NotFound(_) => {
            instruction.push_str(
                " The documents do not contain this information. Say so clearly and do not guess.",
            );
        }
        SearchOutcome::Failed(_) => {
            instruction.push_str(
                " The document search failed. Tell the user the lookup could not be completed \
                 and do not answer from general knowledge.",
            );
        }
    }

    instruction
}
