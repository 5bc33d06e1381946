//! Host drawing surface abstraction
//!
//! The host owns the real scene graph. It hands out primitives whose style
//! capabilities are expressed as traits, so the tree builder can only call a
//! setter on a variant that actually has it:
//!
//! | Variant   | Fill | Stroke | Corner radius | Effects | Auto-layout | Text |
//! |-----------|------|--------|---------------|---------|-------------|------|
//! | Text      | x    |        |               |         |             | x    |
//! | Frame     | x    | x      | x             | x       | x           |      |
//! | Rectangle | x    | x      | x             | x       |             |      |
//! | Ellipse   | x    | x      |               |         |             |      |
//! | Star      | x    | x      |               |         |             |      |
//!
//! Setters still return `Result` because a host may reject a value at runtime.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::design::{CounterAxisAlign, LayoutMode, PrimaryAxisAlign, Rgb, Rgba, TextAlign};

pub mod memory;

pub use memory::{MemorySurface, SceneRecord, SceneTree, TextRecord};

/// Identifier of a node attached to the host scene
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Primitive kinds the host can create
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Text,
    Frame,
    Rectangle,
    Ellipse,
    Star,
}

/// Properties a host may refuse to set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StyleProperty {
    Geometry,
    Fills,
    Strokes,
    CornerRadius,
    Effects,
    AutoLayout,
    Font,
    Characters,
    FontSize,
    TextAlign,
}

/// Errors reported by a host surface
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SurfaceError {
    #[error("host rejected {property:?}: {reason}")]
    Rejected { property: StyleProperty, reason: String },

    #[error("font '{0}' is not available")]
    FontUnavailable(FontName),

    #[error("font '{0}' must be loaded before use")]
    FontNotLoaded(FontName),

    #[error("text has no font assigned")]
    NoFontAssigned,

    #[error("unknown parent node {0}")]
    UnknownParent(NodeId),

    #[error("node {0} cannot hold children")]
    NotAContainer(NodeId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FontStyle {
    Regular,
    Bold,
}

impl FontStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            FontStyle::Regular => "Regular",
            FontStyle::Bold => "Bold",
        }
    }
}

/// A font family + style pair
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FontName {
    pub family: String,
    pub style: FontStyle,
}

impl FontName {
    pub fn new(family: impl Into<String>, style: FontStyle) -> Self {
        Self {
            family: family.into(),
            style,
        }
    }
}

impl fmt::Display for FontName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.family, self.style.as_str())
    }
}

/// Fill or stroke paint
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Paint {
    Solid { color: Rgb },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vector {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BlendMode {
    Normal,
}

/// Visual effect
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Effect {
    DropShadow {
        color: Rgba,
        offset: Vector,
        radius: f64,
        visible: bool,
        blend_mode: BlendMode,
    },
}

impl Effect {
    /// The subtle elevation shadow applied to frames and rectangles
    pub fn card_shadow() -> Self {
        Effect::DropShadow {
            color: Rgb::BLACK.with_alpha(0.1),
            offset: Vector { x: 0.0, y: 2.0 },
            radius: 8.0,
            visible: true,
            blend_mode: BlendMode::Normal,
        }
    }
}

/// Auto-layout settings for a frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AutoLayout {
    pub mode: LayoutMode,
    pub primary_axis_align: PrimaryAxisAlign,
    pub counter_axis_align: CounterAxisAlign,
    pub item_spacing: f64,
    pub padding_left: f64,
    pub padding_right: f64,
    pub padding_top: f64,
    pub padding_bottom: f64,
}

/// Operations every primitive supports
pub trait ScenePrimitive: Send {
    fn set_name(&mut self, name: &str);
    fn resize(&mut self, width: f64, height: f64) -> Result<(), SurfaceError>;
    fn set_position(&mut self, x: f64, y: f64) -> Result<(), SurfaceError>;
}

pub trait Fillable {
    fn set_fills(&mut self, fills: Vec<Paint>) -> Result<(), SurfaceError>;
}

pub trait Strokeable {
    fn set_strokes(&mut self, strokes: Vec<Paint>, weight: f64) -> Result<(), SurfaceError>;
}

pub trait CornerRoundable {
    fn set_corner_radius(&mut self, radius: f64) -> Result<(), SurfaceError>;
}

pub trait Effectable {
    fn set_effects(&mut self, effects: Vec<Effect>) -> Result<(), SurfaceError>;
}

pub trait AutoLayoutable {
    fn set_auto_layout(&mut self, layout: &AutoLayout) -> Result<(), SurfaceError>;
}

/// Text node. Text fills paint the glyphs.
pub trait TextPrimitive: ScenePrimitive + Fillable {
    /// Assign a font; it must already be loaded on the surface
    fn set_font(&mut self, font: &FontName) -> Result<(), SurfaceError>;
    /// Requires a font to be assigned first
    fn set_characters(&mut self, characters: &str) -> Result<(), SurfaceError>;
    fn set_font_size(&mut self, size: f64) -> Result<(), SurfaceError>;
    fn set_text_align(&mut self, align: TextAlign) -> Result<(), SurfaceError>;
}

pub trait FramePrimitive:
    ScenePrimitive + Fillable + Strokeable + CornerRoundable + Effectable + AutoLayoutable
{
}

pub trait RectanglePrimitive: ScenePrimitive + Fillable + Strokeable + CornerRoundable + Effectable {}

pub trait EllipsePrimitive: ScenePrimitive + Fillable + Strokeable {}

pub trait StarPrimitive: ScenePrimitive + Fillable + Strokeable {}

/// Factory and scene owner
#[async_trait]
pub trait HostSurface: Send {
    type Text: TextPrimitive + 'static;
    type Frame: FramePrimitive + 'static;
    type Rectangle: RectanglePrimitive + 'static;
    type Ellipse: EllipsePrimitive + 'static;
    type Star: StarPrimitive + 'static;

    /// Make a font available to text nodes
    async fn load_font(&mut self, font: &FontName) -> Result<(), SurfaceError>;

    fn create_text(&mut self) -> Self::Text;
    fn create_frame(&mut self) -> Self::Frame;
    fn create_rectangle(&mut self) -> Self::Rectangle;
    fn create_ellipse(&mut self) -> Self::Ellipse;
    fn create_star(&mut self) -> Self::Star;

    /// Attach a node under `parent` (a frame), or at page level when `None`
    fn append_child(&mut self, parent: Option<NodeId>, node: HostNode<Self>) -> Result<NodeId, SurfaceError>;
}

/// A host primitive of any variant
pub enum HostNode<S: HostSurface + ?Sized> {
    Text(S::Text),
    Frame(S::Frame),
    Rectangle(S::Rectangle),
    Ellipse(S::Ellipse),
    Star(S::Star),
}

impl<S: HostSurface + ?Sized> HostNode<S> {
    pub fn kind(&self) -> NodeKind {
        match self {
            HostNode::Text(_) => NodeKind::Text,
            HostNode::Frame(_) => NodeKind::Frame,
            HostNode::Rectangle(_) => NodeKind::Rectangle,
            HostNode::Ellipse(_) => NodeKind::Ellipse,
            HostNode::Star(_) => NodeKind::Star,
        }
    }

    pub fn primitive(&mut self) -> &mut dyn ScenePrimitive {
        match self {
            HostNode::Text(n) => n,
            HostNode::Frame(n) => n,
            HostNode::Rectangle(n) => n,
            HostNode::Ellipse(n) => n,
            HostNode::Star(n) => n,
        }
    }

    pub fn fillable(&mut self) -> Option<&mut dyn Fillable> {
        match self {
            HostNode::Text(n) => Some(n),
            HostNode::Frame(n) => Some(n),
            HostNode::Rectangle(n) => Some(n),
            HostNode::Ellipse(n) => Some(n),
            HostNode::Star(n) => Some(n),
        }
    }

    pub fn strokeable(&mut self) -> Option<&mut dyn Strokeable> {
        match self {
            HostNode::Text(_) => None,
            HostNode::Frame(n) => Some(n),
            HostNode::Rectangle(n) => Some(n),
            HostNode::Ellipse(n) => Some(n),
            HostNode::Star(n) => Some(n),
        }
    }

    pub fn corner_roundable(&mut self) -> Option<&mut dyn CornerRoundable> {
        match self {
            HostNode::Frame(n) => Some(n),
            HostNode::Rectangle(n) => Some(n),
            HostNode::Text(_) | HostNode::Ellipse(_) | HostNode::Star(_) => None,
        }
    }

    pub fn effectable(&mut self) -> Option<&mut dyn Effectable> {
        match self {
            HostNode::Frame(n) => Some(n),
            HostNode::Rectangle(n) => Some(n),
            HostNode::Text(_) | HostNode::Ellipse(_) | HostNode::Star(_) => None,
        }
    }

    pub fn is_container(&self) -> bool {
        matches!(self, HostNode::Frame(_))
    }
}
