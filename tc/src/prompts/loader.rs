//! Prompt Loader
//!
//! Loads prompt templates from an override directory or falls back to
//! embedded defaults.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use eyre::{Result, eyre};
use handlebars::Handlebars;
use serde::Serialize;
use tracing::debug;

use crate::llm::ToolDefinition;

use super::embedded;

/// One catalog entry as shown in the system prompt
#[derive(Debug, Clone, Serialize)]
pub struct PromptTool {
    pub name: String,
    pub description: String,
}

/// Context for rendering the assistant prompt
#[derive(Debug, Clone, Serialize)]
pub struct PromptContext {
    pub owner: String,
    /// Current date, `YYYY-MM-DD`
    pub today: String,
    pub tools: Vec<PromptTool>,
}

impl PromptContext {
    pub fn new(owner: &str, now: DateTime<Utc>, definitions: &[ToolDefinition]) -> Self {
        Self {
            owner: owner.to_string(),
            today: now.format("%Y-%m-%d (%A)").to_string(),
            tools: definitions
                .iter()
                .map(|d| PromptTool {
                    name: d.name.clone(),
                    description: d.description.clone(),
                })
                .collect(),
        }
    }
}

/// Loads and renders prompt templates
pub struct PromptLoader {
    hbs: Handlebars<'static>,
    /// Override directory (e.g., `.taskchat/prompts/`)
    user_dir: Option<PathBuf>,
}

impl PromptLoader {
    /// Create a loader; `prompts_dir` wins over `.taskchat/prompts/` in the
    /// working directory
    pub fn new(prompts_dir: Option<&Path>) -> Self {
        let user_dir = prompts_dir
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(".taskchat/prompts"));
        debug!(user_dir = %user_dir.display(), "PromptLoader::new: called");

        Self {
            hbs: Self::engine(),
            user_dir: if user_dir.exists() { Some(user_dir) } else { None },
        }
    }

    /// Create a loader that only uses embedded prompts (for testing)
    pub fn embedded_only() -> Self {
        Self {
            hbs: Self::engine(),
            user_dir: None,
        }
    }

    fn engine() -> Handlebars<'static> {
        let mut hbs = Handlebars::new();
        // Prompts are plain text, not HTML
        hbs.register_escape_fn(handlebars::no_escape);
        hbs
    }

    /// Load a template by name
    ///
    /// Checks in order:
    /// 1. Override: `{user_dir}/{name}.pmt`
    /// 2. Embedded fallback
    fn load_template(&self, name: &str) -> Result<String> {
        if let Some(ref user_dir) = self.user_dir {
            let path = user_dir.join(format!("{}.pmt", name));
            if path.exists() {
                debug!("Loading prompt from user override: {:?}", path);
                return std::fs::read_to_string(&path)
                    .map_err(|e| eyre!("Failed to read user prompt {}: {}", path.display(), e));
            }
        }

        if let Some(content) = embedded::get_embedded(name) {
            debug!("Using embedded prompt: {}", name);
            return Ok(content.to_string());
        }

        Err(eyre!("Prompt template not found: {}", name))
    }

    /// Render a template with the given context
    pub fn render(&self, template_name: &str, context: &PromptContext) -> Result<String> {
        let template = self.load_template(template_name)?;
        debug!(%template_name, "PromptLoader::render: rendering");

        self.hbs
            .render_template(&template, context)
            .map_err(|e| eyre!("Failed to render template {}: {}", template_name, e))
    }

    /// Planner system prompt
    pub fn assistant_prompt(&self, context: &PromptContext) -> Result<String> {
        self.render("assistant", context)
    }
}
