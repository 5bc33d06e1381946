//! Generation pipeline
//!
//! `Idle → Classifying → Generating(i) → Repairing → {Validated | FallbackTriggered}
//! → … → Building → Done → Rendered`, or `Failed` from any step.

use std::fmt;

use thiserror::Error;

use crate::builder::BuildError;
use crate::design::SectionName;
use crate::llm::LlmError;

mod orchestrator;

pub use orchestrator::{
    ContentSource, Pipeline, PipelineOutcome, SectionOutcome, next_section_y, page_design, restack,
};

/// Errors that abort a generation request
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("model request for {section} failed: {source}")]
    Llm { section: SectionName, source: LlmError },

    #[error("prompt rendering failed: {0}")]
    Prompt(String),

    #[error(transparent)]
    Build(#[from] BuildError),
}

/// Where a run currently is; transitions are logged
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Classifying,
    /// 1-based section index
    Generating(usize),
    Repairing,
    Validated,
    FallbackTriggered,
    Building,
    Done,
    Rendered,
    Failed,
}

impl PipelineState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineState::Rendered | PipelineState::Failed)
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineState::Generating(i) => write!(f, "Generating({})", i),
            other => write!(f, "{:?}", other),
        }
    }
}
