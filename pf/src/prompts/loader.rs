//! Prompt Loader
//!
//! Loads prompt templates from an override directory or falls back to
//! embedded defaults.

use std::path::{Path, PathBuf};

use eyre::{Result, eyre};
use handlebars::Handlebars;
use serde::Serialize;
use tracing::{debug, info};

use super::embedded;
use crate::design::PlanSection;

/// Context for rendering the section prompt
#[derive(Debug, Clone, Serialize)]
pub struct SectionContext {
    pub section_name: String,
    pub section_content: String,
    /// Pre-formatted so whole numbers render without a fraction
    pub start_y: String,
}

impl SectionContext {
    pub fn new(section: &PlanSection, start_y: f64) -> Self {
        debug!(section = %section.name, %start_y, "SectionContext::new: called");
        Self {
            section_name: section.name.to_string(),
            section_content: section.content.clone(),
            start_y: start_y.to_string(),
        }
    }
}

/// Loads and renders prompt templates
pub struct PromptLoader {
    /// Handlebars template engine
    hbs: Handlebars<'static>,
    /// Override directory searched before the embedded templates
    dir: Option<PathBuf>,
}

impl PromptLoader {
    /// Create a loader that checks `dir` for `{name}.pmt` first
    pub fn new(dir: Option<&Path>) -> Self {
        debug!(?dir, "PromptLoader::new: called");
        let dir = dir.filter(|d| d.exists()).map(Path::to_path_buf);
        if dir.is_none() {
            debug!("PromptLoader::new: no override directory");
        }
        Self { hbs: engine(), dir }
    }

    /// Create a loader that only uses embedded prompts
    pub fn embedded_only() -> Self {
        debug!("PromptLoader::embedded_only: called");
        Self { hbs: engine(), dir: None }
    }

    /// Load a template by name
    ///
    /// Checks in order:
    /// 1. Override: `{dir}/{name}.pmt`
    /// 2. Embedded fallback
    fn load_template(&self, name: &str) -> Result<String> {
        debug!(%name, "PromptLoader::load_template: called");
        if let Some(ref dir) = self.dir {
            let path = dir.join(format!("{}.pmt", name));
            if path.exists() {
                debug!(?path, "PromptLoader::load_template: found in override directory");
                return std::fs::read_to_string(&path)
                    .map_err(|e| eyre!("Failed to read prompt {}: {}", path.display(), e));
            }
            debug!(?path, "PromptLoader::load_template: not found in override directory");
        }

        if let Some(content) = embedded::get_embedded(name) {
            debug!(%name, "PromptLoader::load_template: found in embedded");
            return Ok(content.to_string());
        }

        debug!(%name, "PromptLoader::load_template: not found anywhere");
        Err(eyre!("Prompt template not found: {}", name))
    }

    /// Render the section prompt
    pub fn render_section(&self, context: &SectionContext) -> Result<String> {
        debug!(section = %context.section_name, "PromptLoader::render_section: called");
        let template = self.load_template("section")?;
        info!("Rendering section prompt for '{}'", context.section_name);

        self.hbs
            .render_template(&template, context)
            .map_err(|e| eyre!("Failed to render template section: {}", e))
    }
}

impl Default for PromptLoader {
    fn default() -> Self {
        Self::embedded_only()
    }
}

/// Prompts are plain text, so HTML escaping is off
fn engine() -> Handlebars<'static> {
    let mut hbs = Handlebars::new();
    hbs.register_escape_fn(handlebars::no_escape);
    hbs
}
