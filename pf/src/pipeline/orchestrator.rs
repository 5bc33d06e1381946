//! Pipeline orchestrator
//!
//! Drives one generation request: classify the plan, ask the model for each
//! section in turn, repair or replace what comes back, stack the sections
//! vertically and build the page on the host surface.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::{PipelineError, PipelineState};
use crate::builder::{TreeBuilder, default_size, resolve_font};
use crate::config::{Config, LayoutConfig};
use crate::design::{
    DesignNodeSpec, NodeType, PlanSection, RepairError, Repaired, SectionName, classify, decode_nodes,
    detect_shape, fallback_components, repair,
};
use crate::llm::{CompletionRequest, LlmClient, Message, StopReason};
use crate::prompts::{PromptLoader, SectionContext};
use crate::surface::{HostSurface, NodeId};
use crate::ui::UiEvent;

const PAGE_NAME: &str = "Review Page";
const PAGE_BACKGROUND: &str = "#FFFFFF";

/// Where a section's nodes came from
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "source", rename_all = "lowercase")]
pub enum ContentSource {
    Generated,
    Fallback { reason: String },
}

/// Result of one section
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionOutcome {
    pub name: SectionName,
    pub start_y: f64,
    #[serde(flatten)]
    pub source: ContentSource,
    pub nodes: Vec<DesignNodeSpec>,
}

impl SectionOutcome {
    pub fn is_fallback(&self) -> bool {
        matches!(self.source, ContentSource::Fallback { .. })
    }
}

/// Result of a whole run
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineOutcome {
    pub sections: Vec<SectionOutcome>,
    pub page: DesignNodeSpec,
    pub root: NodeId,
}

/// Compiles plan text into a page on a host surface
pub struct Pipeline {
    llm: Arc<dyn LlmClient>,
    config: Config,
    prompts: PromptLoader,
    builder: TreeBuilder,
}

impl Pipeline {
    pub fn new(llm: Arc<dyn LlmClient>, config: &Config, prompts: PromptLoader) -> Self {
        debug!(model = %config.llm.model, "Pipeline::new: called");
        Self {
            llm,
            config: config.clone(),
            prompts,
            builder: TreeBuilder::new(&config.layout),
        }
    }

    /// Run the full pipeline
    ///
    /// Emits `processing` statuses along the way and exactly one terminal
    /// `success` or `error` status. A closed event channel is ignored.
    pub async fn run<S: HostSurface>(
        &self,
        plan_text: &str,
        surface: &mut S,
        events: &mpsc::Sender<UiEvent>,
    ) -> Result<PipelineOutcome, PipelineError> {
        debug!(len = plan_text.len(), "Pipeline::run: called");
        let mut state = PipelineState::Idle;

        match self.execute(plan_text, surface, events, &mut state).await {
            Ok(outcome) => {
                transition(&mut state, PipelineState::Rendered);
                info!(sections = outcome.sections.len(), root = %outcome.root, "Generation complete");
                emit(events, UiEvent::success("Done")).await;
                Ok(outcome)
            }
            Err(e) => {
                transition(&mut state, PipelineState::Failed);
                warn!(error = %e, "Generation failed");
                emit(events, UiEvent::error(failure_message(&e))).await;
                Err(e)
            }
        }
    }

    async fn execute<S: HostSurface>(
        &self,
        plan_text: &str,
        surface: &mut S,
        events: &mpsc::Sender<UiEvent>,
        state: &mut PipelineState,
    ) -> Result<PipelineOutcome, PipelineError> {
        transition(state, PipelineState::Classifying);
        let sections = classify(plan_text);
        info!(count = sections.len(), "Plan classified");

        let total = sections.len();
        let mut cursor = 0.0;
        let mut outcomes = Vec::with_capacity(total);

        for (i, section) in sections.iter().enumerate() {
            transition(state, PipelineState::Generating(i + 1));
            emit(
                events,
                UiEvent::processing(format!("Generating {} ({}/{})", section.name, i + 1, total)),
            )
            .await;

            let outcome = self.generate_section(section, cursor, state).await?;
            cursor = next_section_y(&outcome.nodes, cursor, self.config.layout.section_gap);
            debug!(section = %section.name, %cursor, "execute: section done");
            outcomes.push(outcome);
        }

        let page = page_design(&outcomes, cursor, &self.config.layout);

        transition(state, PipelineState::Building);
        emit(events, UiEvent::processing("Building scene graph…")).await;
        let fonts = resolve_font(surface, &self.config.fonts.families).await?;
        let built = self.builder.build_page(surface, &page, &fonts)?;
        transition(state, PipelineState::Done);

        Ok(PipelineOutcome {
            sections: outcomes,
            page,
            root: built.id,
        })
    }

    /// Produce the nodes for one section, starting at `start_y`
    ///
    /// Model errors propagate; unusable model output is replaced by the
    /// section's fallback components.
    pub async fn generate_section(
        &self,
        section: &PlanSection,
        start_y: f64,
        state: &mut PipelineState,
    ) -> Result<SectionOutcome, PipelineError> {
        debug!(section = %section.name, %start_y, "generate_section: called");
        let prompt = self
            .prompts
            .render_section(&SectionContext::new(section, start_y))
            .map_err(|e| PipelineError::Prompt(e.to_string()))?;

        let request = CompletionRequest {
            system_prompt: self.config.llm.system_prompt.clone(),
            messages: vec![Message::user(prompt)],
            max_tokens: self.config.llm.max_tokens,
            temperature: Some(self.config.llm.temperature),
        };
        let response = self.llm.complete(request).await.map_err(|source| PipelineError::Llm {
            section: section.name,
            source,
        })?;
        debug!(
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            "generate_section: usage"
        );
        let stop_reason = response.stop_reason;
        match stop_reason {
            StopReason::MaxTokens => warn!(section = %section.name, "Model response hit the token limit"),
            StopReason::ContentFilter => warn!(section = %section.name, "Model response was filtered"),
            StopReason::EndTurn => {}
        }
        let raw = response.content.unwrap_or_default();

        transition(state, PipelineState::Repairing);
        let decoded = match repair(&raw, detect_shape(&raw)) {
            Repaired::Parsed(value) => decode_nodes(value, self.config.layout.max_depth),
            Repaired::Irrecoverable(reason) => Err(reason),
        };

        Ok(match decoded {
            Ok(mut nodes) => {
                transition(state, PipelineState::Validated);
                restack(&mut nodes, start_y, self.config.layout.node_gap);
                SectionOutcome {
                    name: section.name,
                    start_y,
                    source: ContentSource::Generated,
                    nodes,
                }
            }
            Err(reason) => {
                transition(state, PipelineState::FallbackTriggered);
                fallback_outcome(section, start_y, reason, stop_reason)
            }
        })
    }
}

fn fallback_outcome(section: &PlanSection, start_y: f64, reason: RepairError, stop: StopReason) -> SectionOutcome {
    warn!(section = %section.name, %reason, ?stop, "Model output unusable, using fallback components");
    let reason = match stop {
        StopReason::MaxTokens => format!("{} (response hit the token limit)", reason),
        StopReason::ContentFilter => format!("{} (response was filtered)", reason),
        StopReason::EndTurn => reason.to_string(),
    };
    SectionOutcome {
        name: section.name,
        start_y,
        source: ContentSource::Fallback { reason },
        nodes: fallback_components(section, start_y),
    }
}

/// Reassign `y` top to bottom from `start_y`; returns the cursor after the
/// last node
pub fn restack(nodes: &mut [DesignNodeSpec], start_y: f64, gap: f64) -> f64 {
    debug!(count = nodes.len(), %start_y, "restack: called");
    let mut cursor = start_y;
    for node in nodes.iter_mut() {
        node.y = Some(cursor);
        cursor += stacked_height(node) + gap;
    }
    cursor
}

/// Start of the next section: below the last node plus the section gap
///
/// An empty section leaves the cursor where it was.
pub fn next_section_y(nodes: &[DesignNodeSpec], cursor: f64, section_gap: f64) -> f64 {
    match nodes.last() {
        Some(last) => last.y.unwrap_or(cursor) + stacked_height(last) + section_gap,
        None => cursor,
    }
}

/// Height the builder will give a node
fn stacked_height(node: &DesignNodeSpec) -> f64 {
    node.height
        .filter(|h| *h > 0.0)
        .unwrap_or_else(|| default_size(node.node_type).1)
}

/// Status message for a failed run
fn failure_message(error: &PipelineError) -> String {
    match error {
        PipelineError::Llm { source, .. } if source.is_auth_error() => {
            "Generation failed: the API key was rejected. Verify the key and try again.".to_string()
        }
        PipelineError::Llm { source, .. } if source.is_server_error() => {
            format!("Generation failed: the model service is unavailable ({})", source)
        }
        other => format!("Generation failed: {}", other),
    }
}

/// The page root frame holding every section's nodes
pub fn page_design(sections: &[SectionOutcome], cursor: f64, layout: &LayoutConfig) -> DesignNodeSpec {
    DesignNodeSpec {
        node_type: NodeType::Frame,
        name: Some(PAGE_NAME.to_string()),
        x: Some(0.0),
        y: Some(0.0),
        width: Some(layout.page_width),
        height: Some(cursor + layout.page_bottom_margin),
        background_color: Some(PAGE_BACKGROUND.to_string()),
        children: sections.iter().flat_map(|s| s.nodes.iter().cloned()).collect(),
        ..Default::default()
    }
}

fn transition(state: &mut PipelineState, next: PipelineState) {
    debug!(from = %state, to = %next, "pipeline state");
    *state = next;
}

async fn emit(events: &mpsc::Sender<UiEvent>, event: UiEvent) {
    if events.send(event).await.is_err() {
        debug!("emit: event receiver closed");
    }
}
