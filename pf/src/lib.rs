//! Planframe - plan text to positioned scene graphs
//!
//! Planframe turns a free-form UI plan into a page of design nodes on a host
//! drawing surface. Each plan section is sent to an LLM; whatever comes back
//! is repaired into a node tree, or replaced with a deterministic fallback
//! when it can't be, and then materialized with a per-variant capability
//! check on every style setter.
//!
//! # Modules
//!
//! - [`design`] - Section classifier, node specs, JSON repair and fallbacks
//! - [`surface`] - Host surface traits and an in-memory implementation
//! - [`builder`] - Materializes node specs onto a surface
//! - [`pipeline`] - Per-section generation and page assembly
//! - [`llm`] - LLM client trait and OpenAI implementation
//! - [`prompts`] - Handlebars section prompts
//! - [`ui`] - UI messages, request session and JSON-lines bridge
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod builder;
pub mod cli;
pub mod config;
pub mod design;
pub mod llm;
pub mod pipeline;
pub mod prompts;
pub mod surface;
pub mod ui;

// Re-export commonly used types
pub use builder::{BuildError, BuiltNode, FontFaces, TreeBuilder, default_size, resolve_font};
pub use config::{Config, LayoutConfig, LlmConfig};
pub use design::{DesignNodeSpec, NodeType, PlanSection, RepairError, Repaired, SectionName, Shape, classify, repair};
pub use llm::{CompletionRequest, CompletionResponse, LlmClient, LlmError, OpenAIClient};
pub use pipeline::{Pipeline, PipelineError, PipelineOutcome, PipelineState, SectionOutcome};
pub use prompts::{PromptLoader, SectionContext};
pub use surface::{HostNode, HostSurface, MemorySurface, NodeId, NodeKind, SurfaceError};
pub use ui::{GenerationStatus, Session, UiEvent, UiRequest};
