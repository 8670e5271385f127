//! CLI command implementations.
//!
//! Contains the business logic for each CLI command. Turn-level failures
//! are rendered as answer text; only startup problems (configuration,
//! unreadable instructions, I/O) are returned as errors.

// Allow certain patterns that improve readability in CLI output formatting
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::format_push_string)]

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::runtime::Runtime;
use tracing::debug;

use crate::agent::client::{create_provider, create_registry};
use crate::agent::config::AgentConfig;
use crate::agent::orchestrator::{Orchestrator, ToolToggles};
use crate::agent::plan::PlanFormat;
use crate::agent::prompt::{EXAMPLE_QUESTIONS, PromptSet};
use crate::cli::output::{OutputFormat, format_tools, format_turn};
use crate::cli::parser::{Cli, Commands};
use crate::error::{CommandError, Result};

/// Executes the CLI command.
///
/// # Arguments
///
/// * `cli` - Parsed CLI arguments.
///
/// # Returns
///
/// Result with output string on success.
///
/// # Errors
///
/// Returns an error if configuration is invalid or the command cannot run.
pub fn execute(cli: &Cli) -> Result<String> {
    let format = OutputFormat::parse(&cli.format);
    let toggles = ToolToggles {
        retrieval: !cli.no_retrieval,
    };

    match &cli.command {
        Commands::Ask { question } => {
            let orchestrator = build_orchestrator(cli)?;
            cmd_ask(&orchestrator, question, toggles, format, cli.verbose > 0)
        }
        Commands::Chat => {
            let orchestrator = build_orchestrator(cli)?;
            let stdin = io::stdin();
            let stdout = io::stdout();
            let mut session = ChatSession::new(toggles);
            session.run(
                &orchestrator,
                &new_runtime()?,
                stdin.lock(),
                stdout.lock(),
                format,
            )?;
            Ok(String::new())
        }
        Commands::InitPrompts { dir } => cmd_init_prompts(dir.as_deref(), format),
        Commands::Tools => cmd_tools(&build_config(cli)?, format),
    }
}

/// Resolves configuration: CLI flags, then environment, then defaults.
///
/// # Errors
///
/// Returns an error for an unknown plan format or a missing API key.
pub fn build_config(cli: &Cli) -> Result<AgentConfig> {
    let mut builder = AgentConfig::builder();
    if !cli.vector_stores.is_empty() {
        builder = builder.vector_store_ids(cli.vector_stores.clone());
    }
    if let Some(path) = &cli.instructions {
        builder = builder.instructions_path(path);
    }
    if let Some(raw) = &cli.plan_format {
        let format: PlanFormat = raw
            .parse()
            .map_err(|e| CommandError::InvalidArgument(format!("--plan-format: {e}")))?;
        builder = builder.plan_format(format);
    }
    Ok(builder.from_env().build()?)
}

fn build_orchestrator(cli: &Cli) -> Result<Orchestrator> {
    let config = build_config(cli)?;
    let provider = create_provider(&config)?;
    let registry = create_registry(&config)?;
    let orchestrator = Orchestrator::new(Arc::from(provider), registry, config)?;
    debug!(?orchestrator, "orchestrator ready");
    Ok(orchestrator)
}

/// Creates the tokio runtime used as the sync/async bridge.
fn new_runtime() -> Result<Runtime> {
    Runtime::new().map_err(CommandError::Io)
}

fn cmd_ask(
    orchestrator: &Orchestrator,
    question: &str,
    toggles: ToolToggles,
    format: OutputFormat,
    verbose: bool,
) -> Result<String> {
    let rt = new_runtime()?;
    let result = rt.block_on(orchestrator.run_turn(question, toggles));
    Ok(format_turn(&result, format, verbose))
}

fn cmd_tools(config: &AgentConfig, format: OutputFormat) -> Result<String> {
    let registry = create_registry(config)?;
    Ok(format_tools(&registry.descriptors(), format))
}

fn cmd_init_prompts(dir: Option<&Path>, format: OutputFormat) -> Result<String> {
    let target_dir = dir
        .map(PathBuf::from)
        .or_else(PromptSet::default_dir)
        .ok_or_else(|| {
            CommandError::InvalidArgument(
                "Could not determine home directory for default prompt path".to_string(),
            )
        })?;

    let written = PromptSet::write_defaults(&target_dir)?;

    match format {
        OutputFormat::Text => {
            if written.is_empty() {
                Ok(format!(
                    "Instructions file already exists in: {}\n",
                    target_dir.display()
                ))
            } else {
                let mut output = format!("Wrote instructions to: {}\n", target_dir.display());
                for path in &written {
                    output.push_str(&format!(
                        "  {}\n",
                        path.file_name()
                            .and_then(|n| n.to_str())
                            .unwrap_or("unknown")
                    ));
                }
                output.push_str("\nEdit this file to customize the assistant's persona.\n");
                Ok(output)
            }
        }
        OutputFormat::Json => {
            let json = serde_json::json!({
                "directory": target_dir.to_string_lossy(),
                "written": written.iter().map(|p| p.to_string_lossy().into_owned()).collect::<Vec<_>>(),
                "count": written.len()
            });
            Ok(format.to_json(&json))
        }
    }
}

// ==================== Interactive Chat ====================

/// A line typed at the chat prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    /// A question for the assistant.
    Ask(String),
    /// Clear the displayed conversation.
    Clear,
    /// Turn document search on or off.
    Search(bool),
    /// Print example questions.
    Examples,
    /// Print the conversation so far.
    History,
    /// Print the command list.
    Help,
    /// Leave the chat.
    Quit,
    /// Blank line.
    Empty,
    /// Unrecognized slash command.
    Unknown(String),
}

impl ChatCommand {
    /// Parses one input line.
    #[must_use]
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return Self::Empty;
        }
        if !line.starts_with('/') {
            return Self::Ask(line.to_string());
        }

        let mut parts = line.split_whitespace();
        let command = parts.next().unwrap_or_default().to_lowercase();
        let arg = parts.next().map(str::to_lowercase);
        match (command.as_str(), arg.as_deref()) {
            ("/clear", None) => Self::Clear,
            ("/search", Some("on")) => Self::Search(true),
            ("/search", Some("off")) => Self::Search(false),
            ("/examples", None) => Self::Examples,
            ("/history", None) => Self::History,
            ("/help", None) => Self::Help,
            ("/quit" | "/exit", None) => Self::Quit,
            _ => Self::Unknown(line.to_string()),
        }
    }
}

const CHAT_HELP: &str = "Commands:
  /search on|off  Turn document search on or off
  /examples       Show example questions
  /history        Show the conversation so far
  /clear          Clear the conversation
  /quit           Leave
";

/// State of an interactive chat.
///
/// The history is kept for display only; every turn is planned from the
/// new message alone.
#[derive(Debug)]
pub struct ChatSession {
    toggles: ToolToggles,
    history: Vec<(String, String)>,
}

impl ChatSession {
    /// Creates a session with the given starting toggles.
    #[must_use]
    pub const fn new(toggles: ToolToggles) -> Self {
        Self {
            toggles,
            history: Vec::new(),
        }
    }

    /// Reads lines from `input` until EOF or `/quit`, one turn at a time.
    ///
    /// # Errors
    ///
    /// Returns an error only when reading input or writing output fails.
    pub fn run<R: BufRead, W: Write>(
        &mut self,
        orchestrator: &Orchestrator,
        rt: &Runtime,
        mut input: R,
        mut output: W,
        format: OutputFormat,
    ) -> Result<()> {
        writeln!(
            output,
            "Ask a question, or type /help for commands. Document search is {}.",
            on_off(self.toggles.retrieval)
        )?;

        let mut line = String::new();
        loop {
            write!(output, "> ")?;
            output.flush()?;

            line.clear();
            if input.read_line(&mut line)? == 0 {
                break;
            }

            match ChatCommand::parse(&line) {
                ChatCommand::Empty => {}
                ChatCommand::Quit => break,
                ChatCommand::Help => write!(output, "{CHAT_HELP}")?,
                ChatCommand::Clear => {
                    self.history.clear();
                    writeln!(output, "Conversation cleared.")?;
                }
                ChatCommand::Search(enabled) => {
                    self.toggles.retrieval = enabled;
                    writeln!(output, "Document search is {}.", on_off(enabled))?;
                }
                ChatCommand::Examples => {
                    writeln!(output, "Try asking:")?;
                    for question in EXAMPLE_QUESTIONS {
                        writeln!(output, "  {question}")?;
                    }
                }
                ChatCommand::History => {
                    if self.history.is_empty() {
                        writeln!(output, "No conversation yet.")?;
                    }
                    for (question, answer) in &self.history {
                        writeln!(output, "You: {question}\nAssistant: {answer}\n")?;
                    }
                }
                ChatCommand::Unknown(cmd) => {
                    writeln!(output, "Unknown command: {cmd}")?;
                    write!(output, "{CHAT_HELP}")?;
                }
                ChatCommand::Ask(question) => {
                    let result = rt.block_on(orchestrator.run_turn(&question, self.toggles));
                    write!(output, "{}", format_turn(&result, format, false))?;
                    self.history.push((question, result.answer));
                }
            }
        }

        writeln!(output, "Goodbye.")?;
        Ok(())
    }

    /// Number of exchanges currently shown.
    #[must_use]
    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Current toggles.
    #[must_use]
    pub const fn toggles(&self) -> ToolToggles {
        self.toggles
    }
}

const fn on_off(enabled: bool) -> &'static str {
    if enabled { "on" } else { "off" }
}
