//! CLI command definitions and subcommands

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// TaskChat - manage your todo list by chatting
#[derive(Parser)]
#[command(
    name = "tc",
    about = "Conversational todo manager",
    version,
    after_help = "Logs are written to: ~/.local/share/taskchat/logs/taskchat.log"
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    /// Owner whose tasks and conversations are used (defaults to $USER)
    #[arg(short, long, global = true)]
    pub user: Option<String>,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Cli {
    /// Effective owner: `--user`, then `$USER`, then "default"
    pub fn owner(&self) -> String {
        self.user
            .clone()
            .filter(|u| !u.trim().is_empty())
            .or_else(|| std::env::var("USER").ok().filter(|u| !u.is_empty()))
            .unwrap_or_else(|| "default".to_string())
    }
}

/// CLI subcommands
#[derive(Subcommand)]
pub enum Command {
    /// Send one chat message, or start an interactive session
    Chat {
        /// Continue an existing conversation
        #[arg(long)]
        conversation: Option<String>,

        /// Message to send; omit for the interactive REPL
        message: Option<String>,
    },

    /// Add a task directly
    Add {
        /// Task text
        text: String,
    },

    /// List tasks, newest first
    List {
        /// Only tasks created through this surface
        #[arg(long, value_enum)]
        origin: Option<OriginArg>,
    },

    /// Mark a task complete
    Complete {
        /// Task ID
        id: String,
    },

    /// Change a task's text or completion state
    Update {
        /// Task ID
        id: String,

        /// New text
        #[arg(long)]
        text: Option<String>,

        /// Completion state
        #[arg(long)]
        completed: Option<bool>,
    },

    /// Delete a task
    Delete {
        /// Task ID
        id: String,
    },

    /// Show incomplete tasks due soon
    Upcoming {
        /// Days ahead to look
        #[arg(short, long, default_value = "7")]
        days: i64,
    },

    /// Show conversations, or one conversation's messages
    History {
        /// Conversation ID
        conversation: Option<String>,
    },
}

/// Output format for command results
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Json => write!(f, "json"),
        }
    }
}

/// Task origin filter
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OriginArg {
    Chat,
    DirectApi,
}

impl From<OriginArg> for crate::domain::Origin {
    fn from(arg: OriginArg) -> Self {
        match arg {
            OriginArg::Chat => Self::Chat,
            OriginArg::DirectApi => Self::DirectApi,
        }
    }
}

/// Get the log file path
pub fn get_log_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("taskchat")
        .join("logs")
        .join("taskchat.log")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_no_command() {
        let cli = Cli::parse_from(["tc"]);
        assert!(cli.command.is_none());
        assert_eq!(cli.format, OutputFormat::Text);
    }

    #[test]
    fn test_cli_parse_chat_one_shot() {
        let cli = Cli::parse_from(["tc", "chat", "--conversation", "conv-1", "add milk"]);
        if let Some(Command::Chat { conversation, message }) = cli.command {
            assert_eq!(conversation.as_deref(), Some("conv-1"));
            assert_eq!(message.as_deref(), Some("add milk"));
        } else {
            panic!("Expected Chat command");
        }
    }

    #[test]
    fn test_cli_parse_chat_interactive() {
        let cli = Cli::parse_from(["tc", "chat"]);
        assert!(matches!(cli.command, Some(Command::Chat { message: None, .. })));
    }

    #[test]
    fn test_cli_parse_update() {
        let cli = Cli::parse_from(["tc", "update", "task-1", "--completed", "true"]);
        if let Some(Command::Update { id, text, completed }) = cli.command {
            assert_eq!(id, "task-1");
            assert!(text.is_none());
            assert_eq!(completed, Some(true));
        } else {
            panic!("Expected Update command");
        }
    }

    #[test]
    fn test_cli_parse_list_origin() {
        let cli = Cli::parse_from(["tc", "list", "--origin", "direct-api"]);
        assert!(matches!(
            cli.command,
            Some(Command::List {
                origin: Some(OriginArg::DirectApi)
            })
        ));
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["tc", "list", "--user", "bob", "--format", "json"]);
        assert_eq!(cli.owner(), "bob");
        assert_eq!(cli.format, OutputFormat::Json);
    }

    #[test]
    fn test_cli_with_config() {
        let cli = Cli::parse_from(["tc", "-c", "/path/to/config.yml", "upcoming"]);
        assert_eq!(cli.config, Some(PathBuf::from("/path/to/config.yml")));
        assert!(matches!(cli.command, Some(Command::Upcoming { days: 7 })));
    }
}
