//! TaskChat - conversational todo manager
//!
//! CLI entry point: direct task commands, one-shot chat turns and the
//! interactive chat REPL.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use clap::Parser;
use colored::Colorize;
use eyre::{Context, Result};
use serde::Serialize;
use serde_json::json;
use tracing::info;

use taskchat::chat::{self, ChatSession, TurnRequest};
use taskchat::cli::{Cli, Command, OutputFormat};
use taskchat::config::Config;
use taskchat::domain::{Origin, Task};
use taskchat::llm::{self, ToolCall};
use taskchat::notify::Notifier;
use taskchat::repl;
use taskchat::service::{TaskService, TaskUpdate};
use taskchat::state::StateManager;
use taskchat::tools::{ToolContext, ToolExecutor, ToolName};

fn setup_logging(verbose: bool) -> Result<()> {
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("taskchat")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    // Log to file only; stdout belongs to command output
    let level = if verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };
    let log_file = fs::File::create(log_dir.join("taskchat.log")).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (verbose: {})", verbose);
    Ok(())
}

/// Shared handles every command runs against
struct App {
    state: StateManager,
    notifier: Arc<Notifier>,
    owner: String,
    format: OutputFormat,
}

impl App {
    fn service(&self) -> TaskService {
        TaskService::new(self.state.clone(), self.notifier.clone())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    info!(
        "TaskChat loaded config: provider={}, model={}",
        config.llm.provider, config.llm.model
    );

    let Some(command) = cli.command.as_ref() else {
        use clap::CommandFactory;
        Cli::command().print_help()?;
        return Ok(());
    };

    let store_dir = config.storage.expanded_store_dir();
    let app = App {
        state: StateManager::spawn(&store_dir)
            .with_context(|| format!("Failed to open store at {}", store_dir.display()))?,
        notifier: Arc::new(Notifier::default()),
        owner: cli.owner(),
        format: cli.format,
    };

    let result = match command {
        Command::Chat { conversation, message } => cmd_chat(&app, &config, conversation.clone(), message.clone()).await,
        Command::Add { text } => cmd_add(&app, text).await,
        Command::List { origin } => cmd_list(&app, origin.map(Origin::from)).await,
        Command::Complete { id } => {
            let update = TaskUpdate {
                completed: Some(true),
                ..TaskUpdate::default()
            };
            cmd_update(&app, id, update).await
        }
        Command::Update { id, text, completed } => {
            let update = TaskUpdate {
                text: text.clone(),
                completed: *completed,
            };
            cmd_update(&app, id, update).await
        }
        Command::Delete { id } => cmd_delete(&app, id).await,
        Command::Upcoming { days } => cmd_upcoming(&app, *days).await,
        Command::History { conversation } => cmd_history(&app, conversation.as_deref()).await,
    };

    app.state.shutdown().await.ok();
    result
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_task(task: &Task) {
    let marker = if task.completed { "✓".green() } else { "○".normal() };
    let due = task
        .due_at
        .map(|d| format!(" due {}", d.format("%Y-%m-%d")))
        .unwrap_or_default();
    println!("{} {} {}{}", marker, task.text, task.id.as_str().dimmed(), due.yellow());
}

fn chat_session(app: &App, config: &Config) -> Result<ChatSession> {
    config.validate()?;
    let planner = llm::create_client(&config.llm).map_err(|e| eyre::eyre!("Failed to create planner client: {}", e))?;
    Ok(ChatSession::new(app.state.clone(), planner, app.notifier.clone(), config))
}

async fn cmd_chat(app: &App, config: &Config, conversation: Option<String>, message: Option<String>) -> Result<()> {
    let session = chat_session(app, config)?;

    let Some(message) = message else {
        return repl::run_interactive(Arc::new(session), &app.owner, conversation).await;
    };

    let response = session.process_turn(&app.owner, TurnRequest::new(conversation, message)).await?;
    match app.format {
        OutputFormat::Json => print_json(&response),
        OutputFormat::Text => {
            println!("{}", response.message);
            println!();
            println!("{} {}", "conversation:".dimmed(), response.conversation_id.as_str().dimmed());
            Ok(())
        }
    }
}

async fn cmd_add(app: &App, text: &str) -> Result<()> {
    let task = app.service().create(&app.owner, text).await?;
    match app.format {
        OutputFormat::Json => print_json(&task),
        OutputFormat::Text => {
            print_task(&task);
            Ok(())
        }
    }
}

async fn cmd_list(app: &App, origin: Option<Origin>) -> Result<()> {
    let tasks = app.service().list(&app.owner, origin).await?;
    match app.format {
        OutputFormat::Json => print_json(&tasks),
        OutputFormat::Text => {
            if tasks.is_empty() {
                println!("No tasks yet.");
            }
            tasks.iter().for_each(print_task);
            Ok(())
        }
    }
}

async fn cmd_update(app: &App, id: &str, update: TaskUpdate) -> Result<()> {
    let task = app.service().update(&app.owner, id, update).await?;
    match app.format {
        OutputFormat::Json => print_json(&task),
        OutputFormat::Text => {
            print_task(&task);
            Ok(())
        }
    }
}

async fn cmd_delete(app: &App, id: &str) -> Result<()> {
    let task = app.service().delete(&app.owner, id).await?;
    match app.format {
        OutputFormat::Json => print_json(&task),
        OutputFormat::Text => {
            println!("Deleted '{}'", task.text);
            Ok(())
        }
    }
}

/// Runs the upcoming-tasks tool directly, outside any conversation
async fn cmd_upcoming(app: &App, days: i64) -> Result<()> {
    let ctx = ToolContext::new(&app.owner, Arc::new(app.state.clone()), Utc::now());
    let call = ToolCall::new("cli", ToolName::GetUpcomingTasks.as_str(), json!({ "days": days }));
    let (invocation, narrative) = ToolExecutor::standard().execute(&call, &ctx).await?;

    match app.format {
        OutputFormat::Json => print_json(&invocation.result),
        OutputFormat::Text => {
            println!("{}", narrative.trim_end());
            Ok(())
        }
    }
}

async fn cmd_history(app: &App, conversation: Option<&str>) -> Result<()> {
    let Some(id) = conversation else {
        let conversations = chat::conversations(&app.state, &app.owner).await?;
        return match app.format {
            OutputFormat::Json => print_json(&conversations),
            OutputFormat::Text => {
                if conversations.is_empty() {
                    println!("No conversations yet.");
                }
                for c in &conversations {
                    println!("{} {}", c.id.as_str(), c.updated_at.format("%Y-%m-%d %H:%M").to_string().dimmed());
                }
                Ok(())
            }
        };
    };

    let messages = chat::history(&app.state, &app.owner, id).await?;
    match app.format {
        OutputFormat::Json => print_json(&messages),
        OutputFormat::Text => {
            for message in &messages {
                println!("{}: {}", message.role.to_string().bright_cyan(), message.content);
                for call in &message.tool_calls {
                    let status = if call.result.success { "ok".green() } else { "failed".red() };
                    println!("    {} {}", call.function.dimmed(), status);
                }
            }
            Ok(())
        }
    }
}
