//! Design description types and the pure stages of the pipeline
//!
//! - [`sections`] - keyword classification of plan text
//! - [`repair`] - recovery of JSON from model output
//! - [`fallback`] - hand-authored substitute components
//! - [`spec`] - the typed design tree
//! - [`color`] - hex color parsing

pub mod color;
pub mod fallback;
pub mod repair;
pub mod sections;
pub mod spec;

pub use color::{Rgb, Rgba, hex_to_rgb};
pub use fallback::fallback_components;
pub use repair::{RepairError, Repaired, Shape, decode_nodes, detect_shape, repair, repair_nodes};
pub use sections::{PlanSection, SectionName, classify};
pub use spec::{
    CounterAxisAlign, DesignNodeSpec, FontWeight, LayoutMode, NodeType, PrimaryAxisAlign, TextAlign,
};
