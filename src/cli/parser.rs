//! Command-line argument parsing.
//!
//! Defines the CLI structure using clap derive macros.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

/// profile-agent: ask questions about a professional profile.
///
/// Plans each answer with an LLM, searches the profile documents when
/// needed, and replies from what the documents say.
#[derive(Parser, Debug)]
#[command(name = "profile-agent")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Output format (text, json).
    #[arg(long, default_value = "text", global = true)]
    pub format: String,

    /// Turn document search off.
    #[arg(long, global = true)]
    pub no_retrieval: bool,

    /// Path to the persona instructions file.
    #[arg(long, env = "PROFILE_AGENT_INSTRUCTIONS", global = true)]
    pub instructions: Option<PathBuf>,

    /// Vector store ID to search (repeatable or comma-separated).
    #[arg(
        long = "vector-store",
        env = "VECTOR_STORE_ID",
        value_delimiter = ',',
        global = true
    )]
    pub vector_stores: Vec<String>,

    /// How the planner declares tool calls: marker, structured.
    #[arg(long, global = true)]
    pub plan_format: Option<String>,

    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ask a single question and print the answer.
    #[command(after_help = r#"Examples:
  profile-agent ask "What skills are highlighted in the resume?"
  profile-agent --vector-store vs_abc123 ask "What are her key motivations?"
  profile-agent --format json ask "Describe her AI marketing experience" | jq .path
"#)]
    Ask {
        /// The question.
        question: String,
    },

    /// Start an interactive conversation.
    ///
    /// Commands: /clear, /search on|off, /examples, /quit.
    Chat,

    /// Write the default persona instructions file.
    ///
    /// Existing files are never overwritten.
    #[command(after_help = r#"Examples:
  profile-agent init-prompts                 # Write to ~/.config/profile-agent/
  profile-agent init-prompts --dir ./prompts # Write to a custom directory
"#)]
    InitPrompts {
        /// Target directory (defaults to ~/.config/profile-agent).
        #[arg(short, long)]
        dir: Option<PathBuf>,
    },

    /// List the tools available to the planner.
    Tools,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_ask_with_global_flags() {
        let cli = Cli::try_parse_from([
            "profile-agent",
            "-vv",
            "--vector-store",
            "vs_a,vs_b",
            "--vector-store",
            "vs_c",
            "ask",
            "--no-retrieval",
            "hello",
        ])
        .unwrap_or_else(|_| unreachable!());

        assert_eq!(cli.verbose, 2);
        assert!(cli.no_retrieval);
        assert_eq!(cli.vector_stores, vec!["vs_a", "vs_b", "vs_c"]);
        assert!(matches!(cli.command, Commands::Ask { ref question } if question == "hello"));
    }

    #[test]
    fn test_parse_init_prompts_dir() {
        let cli = Cli::try_parse_from(["profile-agent", "init-prompts", "--dir", "/tmp/p"])
            .unwrap_or_else(|_| unreachable!());
        assert!(matches!(
            cli.command,
            Commands::InitPrompts { dir: Some(ref d) } if d == &PathBuf::from("/tmp/p")
        ));
    }

    #[test]
    fn test_missing_subcommand_is_error() {
        assert!(Cli::try_parse_from(["profile-agent"]).is_err());
    }
}
