//! REPL session management

use std::sync::Arc;

use colored::Colorize;
use eyre::Result;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::{debug, warn};

use crate::chat::{ChatSession, TurnError, TurnRequest, TurnResponse};
use crate::domain::MessageRole;

/// Interactive chat session bound to one owner
pub struct ReplSession {
    chat: Arc<ChatSession>,
    owner: String,
    conversation_id: Option<String>,
}

enum SlashResult {
    Continue,
    Quit,
}

impl ReplSession {
    pub fn new(chat: Arc<ChatSession>, owner: impl Into<String>, conversation_id: Option<String>) -> Self {
        Self {
            chat,
            owner: owner.into(),
            conversation_id,
        }
    }

    /// Run the REPL main loop
    pub async fn run(&mut self) -> Result<()> {
        self.print_welcome();

        let mut rl = DefaultEditor::new().map_err(|e| eyre::eyre!("Failed to initialize readline: {}", e))?;

        loop {
            match rl.readline(&format!("{} ", ">".bright_green())) {
                Ok(line) => {
                    let input = line.trim();
                    if input.is_empty() {
                        continue;
                    }
                    let _ = rl.add_history_entry(input);

                    if input.starts_with('/') {
                        match self.handle_slash_command(input).await {
                            SlashResult::Continue => continue,
                            SlashResult::Quit => break,
                        }
                    } else {
                        self.process_user_input(input).await?;
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("^C");
                    continue;
                }
                Err(ReadlineError::Eof) => {
                    println!();
                    break;
                }
                Err(err) => {
                    return Err(eyre::eyre!("Readline error: {}", err));
                }
            }
        }

        println!("Goodbye!");
        Ok(())
    }

    fn print_welcome(&self) {
        println!();
        println!("{}", "TaskChat".bright_cyan().bold());
        println!("Signed in as {}", self.owner.bright_white());
        if let Some(id) = &self.conversation_id {
            println!("Continuing conversation {}", id.dimmed());
        }
        println!("Type {} for help, {} to quit", "/help".yellow(), "/quit".yellow());
        println!();
    }

    async fn handle_slash_command(&mut self, input: &str) -> SlashResult {
        let cmd = input.split_whitespace().next().unwrap_or("");

        match cmd {
            "/help" | "/h" => {
                self.print_help();
                SlashResult::Continue
            }
            "/quit" | "/q" | "/exit" => SlashResult::Quit,
            "/new" | "/n" => {
                self.conversation_id = None;
                println!("{}", "Started a new conversation.".dimmed());
                SlashResult::Continue
            }
            "/history" => {
                self.print_history().await;
                SlashResult::Continue
            }
            "/tasks" => {
                self.print_tasks().await;
                SlashResult::Continue
            }
            _ => {
                println!("{} Unknown command: {}", "?".yellow(), cmd);
                println!("Type {} for available commands", "/help".yellow());
                SlashResult::Continue
            }
        }
    }

    fn print_help(&self) {
        println!();
        println!("{}", "Available Commands:".bright_cyan());
        println!("  {:14} Show this help", "/help".yellow());
        println!("  {:14} Exit the REPL", "/quit".yellow());
        println!("  {:14} Start a new conversation", "/new".yellow());
        println!("  {:14} Show this conversation's messages", "/history".yellow());
        println!("  {:14} Show your tasks by position", "/tasks".yellow());
        println!();
        println!("Anything else is sent to the assistant, e.g. {}", "\"add buy milk tomorrow\"".dimmed());
        println!();
    }

    async fn print_history(&self) {
        let Some(id) = &self.conversation_id else {
            println!("{}", "No conversation history.".dimmed());
            return;
        };

        match self.chat.history(&self.owner, id).await {
            Ok(messages) => {
                println!();
                for message in messages {
                    let role = match message.role {
                        MessageRole::User => "You".bright_green(),
                        MessageRole::Assistant => "Assistant".bright_blue(),
                    };
                    let preview: String = message.content.chars().take(60).collect();
                    let ellipsis = if message.content.chars().count() > 60 { "..." } else { "" };
                    println!("  {}: {}{}", role, preview, ellipsis);
                    for call in &message.tool_calls {
                        let status = if call.result.success { "ok".green() } else { "failed".red() };
                        println!("      {} {}", call.function.dimmed(), status);
                    }
                }
                println!();
            }
            Err(e) => println!("{} {}", "Error:".red(), e),
        }
    }

    async fn print_tasks(&self) {
        match self.chat.state().list_tasks(&self.owner).await {
            Ok(tasks) if tasks.is_empty() => println!("{}", "No tasks yet.".dimmed()),
            Ok(tasks) => {
                println!();
                for (i, task) in tasks.iter().enumerate() {
                    let marker = if task.completed { "✓".green() } else { "○".normal() };
                    println!("  {:>3}. {} {} {}", i + 1, marker, task.text, format!("[{}]", task.priority).dimmed());
                }
                println!();
            }
            Err(e) => println!("{} {}", "Error:".red(), e),
        }
    }

    /// Send one line as a chat turn and print the reply
    async fn process_user_input(&mut self, input: &str) -> Result<()> {
        debug!(owner = %self.owner, "ReplSession::process_user_input: called");
        let request = TurnRequest::new(self.conversation_id.clone(), input);

        match self.chat.process_turn(&self.owner, request).await {
            Ok(response) => {
                self.conversation_id = Some(response.conversation_id.to_string());
                print_response(&response);
                Ok(())
            }
            Err(TurnError::State(e)) => Err(eyre::eyre!("Storage failure: {}", e)),
            Err(e) => {
                warn!(error = %e, "Chat turn failed");
                println!("{} {}", "Error:".red(), e);
                println!();
                Ok(())
            }
        }
    }
}

fn print_response(response: &TurnResponse) {
    println!();
    for call in &response.tool_calls {
        match &call.result.error {
            None => println!("{}", format!("[{}]", call.function).dimmed()),
            Some(err) => println!("{} {}", format!("[{}]", call.function).dimmed(), err.red()),
        }
    }
    println!("{}", response.message);
    println!();
}
