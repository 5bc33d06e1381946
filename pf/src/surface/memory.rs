//! In-memory host surface
//!
//! Records every primitive as a serializable [`SceneRecord`]. Used by the CLI
//! to print generated scenes and by tests to inspect what the builder did.
//! Fonts and property rejections are configurable so host failures can be
//! reproduced.

use std::collections::{HashMap, HashSet};
use std::fmt::Write as _;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{
    AutoLayout, AutoLayoutable, CornerRoundable, Effect, Effectable, EllipsePrimitive, Fillable, FontName,
    FramePrimitive, HostNode, HostSurface, NodeId, NodeKind, Paint, RectanglePrimitive, ScenePrimitive,
    StarPrimitive, StyleProperty, Strokeable, SurfaceError, TextPrimitive,
};
use crate::design::TextAlign;

/// Text-only attributes of a record
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextRecord {
    pub characters: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font: Option<FontName>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub align: Option<TextAlign>,
}

/// Flat record of one node on the surface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneRecord {
    pub id: NodeId,
    pub kind: NodeKind,
    pub name: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fills: Vec<Paint>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub strokes: Vec<Paint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke_weight: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub corner_radius: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub effects: Vec<Effect>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_layout: Option<AutoLayout>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<TextRecord>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeId>,
}

impl SceneRecord {
    fn new(id: NodeId, kind: NodeKind) -> Self {
        Self {
            id,
            kind,
            name: String::new(),
            x: 0.0,
            y: 0.0,
            width: 100.0,
            height: 100.0,
            fills: Vec::new(),
            strokes: Vec::new(),
            stroke_weight: None,
            corner_radius: None,
            effects: Vec::new(),
            auto_layout: None,
            text: (kind == NodeKind::Text).then(TextRecord::default),
            children: Vec::new(),
        }
    }
}

/// Nested view of a record and its descendants
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SceneTree {
    #[serde(flatten)]
    pub record: SceneRecord,
    #[serde(rename = "nodes", skip_serializing_if = "Vec::is_empty")]
    pub nodes: Vec<SceneTree>,
}

type RejectSet = Arc<HashSet<(NodeKind, StyleProperty)>>;

/// State shared by every memory primitive
#[derive(Debug)]
struct NodeState {
    record: SceneRecord,
    rejected: RejectSet,
}

impl NodeState {
    fn check(&self, property: StyleProperty) -> Result<(), SurfaceError> {
        if self.rejected.contains(&(self.record.kind, property)) {
            return Err(SurfaceError::Rejected {
                property,
                reason: format!("{:?} does not accept this value", self.record.kind),
            });
        }
        Ok(())
    }

    fn resize(&mut self, width: f64, height: f64) -> Result<(), SurfaceError> {
        self.check(StyleProperty::Geometry)?;
        if width.is_nan() || height.is_nan() || width <= 0.0 || height <= 0.0 {
            return Err(SurfaceError::Rejected {
                property: StyleProperty::Geometry,
                reason: format!("size must be positive, got {}x{}", width, height),
            });
        }
        self.record.width = width;
        self.record.height = height;
        Ok(())
    }

    fn set_position(&mut self, x: f64, y: f64) -> Result<(), SurfaceError> {
        self.check(StyleProperty::Geometry)?;
        self.record.x = x;
        self.record.y = y;
        Ok(())
    }

    fn set_fills(&mut self, fills: Vec<Paint>) -> Result<(), SurfaceError> {
        self.check(StyleProperty::Fills)?;
        self.record.fills = fills;
        Ok(())
    }

    fn set_strokes(&mut self, strokes: Vec<Paint>, weight: f64) -> Result<(), SurfaceError> {
        self.check(StyleProperty::Strokes)?;
        self.record.strokes = strokes;
        self.record.stroke_weight = Some(weight);
        Ok(())
    }

    fn set_corner_radius(&mut self, radius: f64) -> Result<(), SurfaceError> {
        self.check(StyleProperty::CornerRadius)?;
        self.record.corner_radius = Some(radius);
        Ok(())
    }

    fn set_effects(&mut self, effects: Vec<Effect>) -> Result<(), SurfaceError> {
        self.check(StyleProperty::Effects)?;
        self.record.effects = effects;
        Ok(())
    }
}

macro_rules! memory_primitive {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug)]
        pub struct $name(NodeState);

        impl ScenePrimitive for $name {
            fn set_name(&mut self, name: &str) {
                self.0.record.name = name.to_string();
            }

            fn resize(&mut self, width: f64, height: f64) -> Result<(), SurfaceError> {
                self.0.resize(width, height)
            }

            fn set_position(&mut self, x: f64, y: f64) -> Result<(), SurfaceError> {
                self.0.set_position(x, y)
            }
        }

        impl Fillable for $name {
            fn set_fills(&mut self, fills: Vec<Paint>) -> Result<(), SurfaceError> {
                self.0.set_fills(fills)
            }
        }
    };
}

macro_rules! strokeable {
    ($($name:ident),+) => {
        $(impl Strokeable for $name {
            fn set_strokes(&mut self, strokes: Vec<Paint>, weight: f64) -> Result<(), SurfaceError> {
                self.0.set_strokes(strokes, weight)
            }
        })+
    };
}

macro_rules! styled_box {
    ($($name:ident),+) => {
        $(
            impl CornerRoundable for $name {
                fn set_corner_radius(&mut self, radius: f64) -> Result<(), SurfaceError> {
                    self.0.set_corner_radius(radius)
                }
            }

            impl Effectable for $name {
                fn set_effects(&mut self, effects: Vec<Effect>) -> Result<(), SurfaceError> {
                    self.0.set_effects(effects)
                }
            }
        )+
    };
}

memory_primitive!(MemoryFrame);
memory_primitive!(MemoryRectangle);
memory_primitive!(MemoryEllipse);
memory_primitive!(MemoryStar);

/// Text primitive; checks fonts against what the surface had loaded when it
/// was created
#[derive(Debug)]
pub struct MemoryText {
    state: NodeState,
    loaded: Arc<HashSet<FontName>>,
}

strokeable!(MemoryFrame, MemoryRectangle, MemoryEllipse, MemoryStar);
styled_box!(MemoryFrame, MemoryRectangle);

impl AutoLayoutable for MemoryFrame {
    fn set_auto_layout(&mut self, layout: &AutoLayout) -> Result<(), SurfaceError> {
        self.0.check(StyleProperty::AutoLayout)?;
        self.0.record.auto_layout = Some(*layout);
        Ok(())
    }
}

impl FramePrimitive for MemoryFrame {}
impl RectanglePrimitive for MemoryRectangle {}
impl EllipsePrimitive for MemoryEllipse {}
impl StarPrimitive for MemoryStar {}

impl MemoryText {
    fn text(&mut self) -> &mut TextRecord {
        self.state.record.text.get_or_insert_with(TextRecord::default)
    }
}

impl ScenePrimitive for MemoryText {
    fn set_name(&mut self, name: &str) {
        self.state.record.name = name.to_string();
    }

    fn resize(&mut self, width: f64, height: f64) -> Result<(), SurfaceError> {
        self.state.resize(width, height)
    }

    fn set_position(&mut self, x: f64, y: f64) -> Result<(), SurfaceError> {
        self.state.set_position(x, y)
    }
}

impl Fillable for MemoryText {
    fn set_fills(&mut self, fills: Vec<Paint>) -> Result<(), SurfaceError> {
        self.state.set_fills(fills)
    }
}

impl TextPrimitive for MemoryText {
    fn set_font(&mut self, font: &FontName) -> Result<(), SurfaceError> {
        self.state.check(StyleProperty::Font)?;
        if !self.loaded.contains(font) {
            return Err(SurfaceError::FontNotLoaded(font.clone()));
        }
        self.text().font = Some(font.clone());
        Ok(())
    }

    fn set_characters(&mut self, characters: &str) -> Result<(), SurfaceError> {
        self.state.check(StyleProperty::Characters)?;
        if self.text().font.is_none() {
            return Err(SurfaceError::NoFontAssigned);
        }
        self.text().characters = characters.to_string();
        Ok(())
    }

    fn set_font_size(&mut self, size: f64) -> Result<(), SurfaceError> {
        self.state.check(StyleProperty::FontSize)?;
        if size.is_nan() || size < 1.0 {
            return Err(SurfaceError::Rejected {
                property: StyleProperty::FontSize,
                reason: format!("font size must be at least 1, got {}", size),
            });
        }
        self.text().font_size = Some(size);
        Ok(())
    }

    fn set_text_align(&mut self, align: TextAlign) -> Result<(), SurfaceError> {
        self.state.check(StyleProperty::TextAlign)?;
        self.text().align = Some(align);
        Ok(())
    }
}

/// Scene graph held entirely in memory
#[derive(Debug)]
pub struct MemorySurface {
    records: HashMap<NodeId, SceneRecord>,
    parents: HashMap<NodeId, Option<NodeId>>,
    page: Vec<NodeId>,
    next_id: u64,
    /// `None` means every family is installed
    installed: Option<HashSet<String>>,
    loaded: Arc<HashSet<FontName>>,
    rejected: RejectSet,
}

impl Default for MemorySurface {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySurface {
    /// Surface with every font family available
    pub fn new() -> Self {
        Self {
            records: HashMap::new(),
            parents: HashMap::new(),
            page: Vec::new(),
            next_id: 1,
            installed: None,
            loaded: Arc::new(HashSet::new()),
            rejected: Arc::new(HashSet::new()),
        }
    }

    /// Restrict the installed font families
    pub fn with_fonts<I, S>(mut self, families: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.installed = Some(families.into_iter().map(Into::into).collect());
        self
    }

    /// Make the host refuse `property` on every node of `kind`
    pub fn rejecting(mut self, kind: NodeKind, property: StyleProperty) -> Self {
        let mut set = (*self.rejected).clone();
        set.insert((kind, property));
        self.rejected = Arc::new(set);
        self
    }

    pub fn loaded_fonts(&self) -> impl Iterator<Item = &FontName> {
        self.loaded.iter()
    }

    pub fn get(&self, id: NodeId) -> Option<&SceneRecord> {
        self.records.get(&id)
    }

    /// Nodes attached directly to the page, in order
    pub fn page_nodes(&self) -> Vec<&SceneRecord> {
        self.page.iter().filter_map(|id| self.records.get(id)).collect()
    }

    pub fn children_of(&self, id: NodeId) -> Vec<&SceneRecord> {
        self.records
            .get(&id)
            .map(|r| r.children.iter().filter_map(|c| self.records.get(c)).collect())
            .unwrap_or_default()
    }

    pub fn parent_of(&self, id: NodeId) -> Option<NodeId> {
        self.parents.get(&id).copied().flatten()
    }

    /// First node with the given name, by id order
    pub fn find_by_name(&self, name: &str) -> Option<&SceneRecord> {
        let mut ids: Vec<&NodeId> = self.records.keys().collect();
        ids.sort();
        ids.into_iter()
            .filter_map(|id| self.records.get(id))
            .find(|r| r.name == name)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn tree(&self, id: NodeId) -> Option<SceneTree> {
        let record = self.records.get(&id)?.clone();
        let nodes = record.children.iter().filter_map(|c| self.tree(*c)).collect();
        Some(SceneTree { record, nodes })
    }

    /// Indented one-line-per-node outline of a subtree
    pub fn outline(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_outline(id, 0, &mut out);
        out
    }

    fn write_outline(&self, id: NodeId, depth: usize, out: &mut String) {
        let Some(record) = self.records.get(&id) else {
            return;
        };
        let _ = write!(
            out,
            "{}{:?} \"{}\" @({}, {}) {}x{}",
            "  ".repeat(depth),
            record.kind,
            record.name,
            record.x,
            record.y,
            record.width,
            record.height
        );
        if let Some(text) = &record.text
            && !text.characters.is_empty()
        {
            let _ = write!(out, " \"{}\"", text.characters.replace('\n', "\\n"));
        }
        out.push('\n');
        for child in &record.children {
            self.write_outline(*child, depth + 1, out);
        }
    }

    fn state(&mut self, kind: NodeKind) -> NodeState {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        NodeState {
            record: SceneRecord::new(id, kind),
            rejected: Arc::clone(&self.rejected),
        }
    }

    fn detach(&mut self, id: NodeId) {
        match self.parents.remove(&id) {
            Some(Some(parent)) => {
                if let Some(p) = self.records.get_mut(&parent) {
                    p.children.retain(|c| *c != id);
                }
            }
            Some(None) => self.page.retain(|c| *c != id),
            None => {}
        }
    }
}

#[async_trait]
impl HostSurface for MemorySurface {
    type Text = MemoryText;
    type Frame = MemoryFrame;
    type Rectangle = MemoryRectangle;
    type Ellipse = MemoryEllipse;
    type Star = MemoryStar;

    async fn load_font(&mut self, font: &FontName) -> Result<(), SurfaceError> {
        debug!(%font, "load_font: called");
        if let Some(installed) = &self.installed
            && !installed.contains(&font.family)
        {
            debug!(%font, "load_font: family not installed");
            return Err(SurfaceError::FontUnavailable(font.clone()));
        }
        let mut loaded = (*self.loaded).clone();
        loaded.insert(font.clone());
        self.loaded = Arc::new(loaded);
        Ok(())
    }

    fn create_text(&mut self) -> MemoryText {
        MemoryText {
            state: self.state(NodeKind::Text),
            loaded: Arc::clone(&self.loaded),
        }
    }

    fn create_frame(&mut self) -> MemoryFrame {
        MemoryFrame(self.state(NodeKind::Frame))
    }

    fn create_rectangle(&mut self) -> MemoryRectangle {
        MemoryRectangle(self.state(NodeKind::Rectangle))
    }

    fn create_ellipse(&mut self) -> MemoryEllipse {
        MemoryEllipse(self.state(NodeKind::Ellipse))
    }

    fn create_star(&mut self) -> MemoryStar {
        MemoryStar(self.state(NodeKind::Star))
    }

    fn append_child(&mut self, parent: Option<NodeId>, node: HostNode<Self>) -> Result<NodeId, SurfaceError> {
        let record = match node {
            HostNode::Text(n) => n.state.record,
            HostNode::Frame(n) => n.0.record,
            HostNode::Rectangle(n) => n.0.record,
            HostNode::Ellipse(n) => n.0.record,
            HostNode::Star(n) => n.0.record,
        };
        let id = record.id;
        debug!(%id, kind = ?record.kind, ?parent, "append_child: called");

        if let Some(parent_id) = parent {
            let target = self.records.get(&parent_id).ok_or(SurfaceError::UnknownParent(parent_id))?;
            if target.kind != NodeKind::Frame {
                return Err(SurfaceError::NotAContainer(parent_id));
            }
        }

        // Appending moves a node that is already attached
        self.detach(id);
        match parent {
            Some(parent_id) => {
                if let Some(p) = self.records.get_mut(&parent_id) {
                    p.children.push(id);
                }
            }
            None => self.page.push(id),
        }
        self.parents.insert(id, parent);
        self.records.insert(id, record);
        Ok(id)
    }
}
