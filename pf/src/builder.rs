//! Design tree builder
//!
//! Materializes a [`DesignNodeSpec`] tree onto a [`HostSurface`]. Styling goes
//! through the capability accessors on [`HostNode`], so a property is only
//! ever set on a variant that supports it. Host rejections are logged and
//! skipped; only font resolution and attaching are fatal.

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::LayoutConfig;
use crate::design::{
    CounterAxisAlign, DesignNodeSpec, FontWeight, NodeType, PrimaryAxisAlign, TextAlign, hex_to_rgb,
};
use crate::surface::{
    AutoLayout, AutoLayoutable, Effect, FontName, FontStyle, HostNode, HostSurface, NodeId, NodeKind, Paint,
    SurfaceError, TextPrimitive,
};

const TEXT_SIZE: (f64, f64) = (300.0, 60.0);
const SHAPE_SIZE: (f64, f64) = (400.0, 200.0);
const PAGE_HEIGHT: f64 = 600.0;
const DEFAULT_TEXT: &str = "Sample Text";
const DEFAULT_FONT_SIZE: f64 = 16.0;
const PAGE_NAME: &str = "Generated Design";

/// Errors that abort a build
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("no usable font among: {}", .tried.join(", "))]
    NoUsableFont { tried: Vec<String> },

    #[error("failed to attach {kind:?} '{name}': {source}")]
    Attach {
        name: String,
        kind: NodeKind,
        source: SurfaceError,
    },
}

/// The font family chosen for a build, with both faces loaded
#[derive(Debug, Clone, PartialEq)]
pub struct FontFaces {
    pub family: String,
    pub regular: FontName,
    pub bold: FontName,
}

impl FontFaces {
    pub fn face(&self, weight: FontWeight) -> &FontName {
        match weight {
            FontWeight::Bold => &self.bold,
            FontWeight::Normal => &self.regular,
        }
    }
}

/// Load the first family whose Regular and Bold faces are both available
pub async fn resolve_font<S: HostSurface>(surface: &mut S, families: &[String]) -> Result<FontFaces, BuildError> {
    debug!(?families, "resolve_font: called");
    for family in families {
        let regular = FontName::new(family.as_str(), FontStyle::Regular);
        let bold = FontName::new(family.as_str(), FontStyle::Bold);

        if let Err(e) = surface.load_font(&regular).await {
            debug!(%family, error = %e, "resolve_font: regular face failed");
            continue;
        }
        if let Err(e) = surface.load_font(&bold).await {
            debug!(%family, error = %e, "resolve_font: bold face failed");
            continue;
        }

        info!(%family, "Font family resolved");
        return Ok(FontFaces {
            family: family.clone(),
            regular,
            bold,
        });
    }

    warn!(?families, "No usable font family");
    Err(BuildError::NoUsableFont {
        tried: families.to_vec(),
    })
}

/// A node attached to the host, and the cursor for its next sibling
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BuiltNode {
    pub id: NodeId,
    pub next_y: f64,
}

/// Recursive spec-to-host materializer
#[derive(Debug, Clone)]
pub struct TreeBuilder {
    layout: LayoutConfig,
}

impl TreeBuilder {
    pub fn new(layout: &LayoutConfig) -> Self {
        Self { layout: layout.clone() }
    }

    /// Build the page root at the top level of the surface
    ///
    /// The root always sits at y = 0 and gets no drop shadow.
    pub fn build_page<S: HostSurface>(
        &self,
        surface: &mut S,
        spec: &DesignNodeSpec,
        fonts: &FontFaces,
    ) -> Result<BuiltNode, BuildError> {
        debug!(name = ?spec.name, children = spec.children.len(), "build_page: called");
        let built = self.materialize(surface, None, spec, 0.0, 0, fonts, true)?;
        info!(root = %built.id, nodes = spec.node_count(), "Page built");
        Ok(built)
    }

    /// Build one node and its subtree under `parent`
    ///
    /// `cursor` is the y used when the node gives none. Returns the cursor for
    /// the next sibling. Nodes past the depth ceiling are skipped and leave
    /// the cursor unchanged.
    pub fn build_node<S: HostSurface>(
        &self,
        surface: &mut S,
        parent: Option<NodeId>,
        spec: &DesignNodeSpec,
        cursor: f64,
        depth: usize,
        fonts: &FontFaces,
    ) -> Result<f64, BuildError> {
        debug!(?parent, node_type = ?spec.node_type, %cursor, %depth, "build_node: called");
        if depth > self.layout.max_depth {
            warn!(name = ?spec.name, %depth, max = self.layout.max_depth, "Node nested too deep, skipping");
            return Ok(cursor);
        }
        self.materialize(surface, parent, spec, cursor, depth, fonts, false)
            .map(|built| built.next_y)
    }

    #[allow(clippy::too_many_arguments)]
    fn materialize<S: HostSurface>(
        &self,
        surface: &mut S,
        parent: Option<NodeId>,
        spec: &DesignNodeSpec,
        cursor: f64,
        depth: usize,
        fonts: &FontFaces,
        is_root: bool,
    ) -> Result<BuiltNode, BuildError> {
        let mut node = create_node(surface, spec.node_type);
        let name = match &spec.name {
            Some(name) => name.clone(),
            None if is_root => PAGE_NAME.to_string(),
            None => default_name(spec.node_type).to_string(),
        };

        let (default_width, default_height) = if is_root {
            (self.layout.page_width, PAGE_HEIGHT)
        } else {
            default_size(spec.node_type)
        };
        let width = positive(spec.width).unwrap_or(default_width);
        let height = positive(spec.height).unwrap_or(default_height);
        let x = spec.x.unwrap_or(0.0);
        let y = if is_root { 0.0 } else { spec.y.unwrap_or(cursor) };

        let primitive = node.primitive();
        primitive.set_name(&name);
        report(primitive.resize(width, height), &name, "size");
        report(primitive.set_position(x, y), &name, "position");

        self.apply_style(&mut node, spec, &name, is_root);

        match &mut node {
            HostNode::Text(text) => apply_text(text, spec, fonts, &name),
            HostNode::Frame(frame) => {
                if let Some(mode) = spec.layout_mode {
                    let layout = AutoLayout {
                        mode,
                        primary_axis_align: spec.primary_axis_align_items.unwrap_or(PrimaryAxisAlign::Min),
                        counter_axis_align: spec.counter_axis_align_items.unwrap_or(CounterAxisAlign::Min),
                        item_spacing: spec.item_spacing.unwrap_or(self.layout.item_spacing),
                        padding_left: spec.padding_left.unwrap_or(self.layout.padding),
                        padding_right: spec.padding_right.unwrap_or(self.layout.padding),
                        padding_top: spec.padding_top.unwrap_or(self.layout.padding),
                        padding_bottom: spec.padding_bottom.unwrap_or(self.layout.padding),
                    };
                    report(frame.set_auto_layout(&layout), &name, "auto-layout");
                }
            }
            _ => {}
        }

        let kind = node.kind();
        let is_container = node.is_container();
        let id = surface
            .append_child(parent, node)
            .map_err(|source| BuildError::Attach {
                name: name.clone(),
                kind,
                source,
            })?;
        debug!(%id, %name, %x, %y, %width, %height, "materialize: attached");

        if !spec.children.is_empty() {
            if is_container {
                let mut child_cursor = 0.0;
                for child in &spec.children {
                    child_cursor = self.build_node(surface, Some(id), child, child_cursor, depth + 1, fonts)?;
                }
            } else {
                warn!(%name, ?kind, count = spec.children.len(), "Node cannot hold children, skipping them");
            }
        }

        Ok(BuiltNode {
            id,
            next_y: y + height + self.layout.node_gap,
        })
    }

    fn apply_style<S: HostSurface>(&self, node: &mut HostNode<S>, spec: &DesignNodeSpec, name: &str, is_root: bool) {
        if let Some(color) = &spec.background_color
            && let Some(target) = node.fillable()
        {
            let fills = vec![Paint::Solid { color: hex_to_rgb(color) }];
            report(target.set_fills(fills), name, "fills");
        }

        if let (Some(color), Some(weight)) = (&spec.border_color, spec.border_width) {
            match node.strokeable() {
                Some(target) => {
                    let strokes = vec![Paint::Solid { color: hex_to_rgb(color) }];
                    report(target.set_strokes(strokes, weight), name, "strokes");
                }
                None => debug!(%name, "apply_style: node has no strokes, border ignored"),
            }
        }

        if let Some(radius) = spec.border_radius.filter(|r| *r > 0.0) {
            match node.corner_roundable() {
                Some(target) => report(target.set_corner_radius(radius), name, "corner radius"),
                None => debug!(%name, "apply_style: node has no corner radius, ignored"),
            }
        }

        if !is_root && let Some(target) = node.effectable() {
            report(target.set_effects(vec![Effect::card_shadow()]), name, "effects");
        }
    }
}

fn apply_text<T: TextPrimitive + ?Sized>(text: &mut T, spec: &DesignNodeSpec, fonts: &FontFaces, name: &str) {
    let weight = spec.font_weight.unwrap_or_default();
    report(text.set_font(fonts.face(weight)), name, "font");
    report(
        text.set_characters(spec.content.as_deref().unwrap_or(DEFAULT_TEXT)),
        name,
        "characters",
    );
    report(
        text.set_font_size(positive(spec.font_size).unwrap_or(DEFAULT_FONT_SIZE)),
        name,
        "font size",
    );
    report(
        text.set_text_align(spec.text_align.unwrap_or(TextAlign::Left)),
        name,
        "text align",
    );
}

fn create_node<S: HostSurface>(surface: &mut S, node_type: NodeType) -> HostNode<S> {
    match node_type {
        NodeType::Text => HostNode::Text(surface.create_text()),
        NodeType::Frame | NodeType::Unknown => HostNode::Frame(surface.create_frame()),
        NodeType::Rectangle => HostNode::Rectangle(surface.create_rectangle()),
        NodeType::Ellipse => HostNode::Ellipse(surface.create_ellipse()),
        NodeType::Star => HostNode::Star(surface.create_star()),
    }
}

/// Size a node gets when its spec gives no usable width or height
pub fn default_size(node_type: NodeType) -> (f64, f64) {
    match node_type {
        NodeType::Text => TEXT_SIZE,
        _ => SHAPE_SIZE,
    }
}

fn default_name(node_type: NodeType) -> &'static str {
    match node_type {
        NodeType::Text => "Text",
        NodeType::Frame => "Frame",
        NodeType::Rectangle => "Rectangle",
        NodeType::Ellipse => "Ellipse",
        NodeType::Star => "Star",
        NodeType::Unknown => "Component",
    }
}

fn positive(value: Option<f64>) -> Option<f64> {
    value.filter(|v| *v > 0.0)
}

fn report(result: Result<(), SurfaceError>, name: &str, property: &str) {
    if let Err(e) = result {
        warn!(node = %name, %property, error = %e, "Host rejected property, skipping");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::design::{LayoutMode, Rgb};
    use crate::surface::{MemorySurface, StyleProperty};
    use serde_json::json;

    fn spec(value: serde_json::Value) -> DesignNodeSpec {
        serde_json::from_value(value).unwrap()
    }

    fn families() -> Vec<String> {
        vec!["Inter".to_string(), "Roboto".to_string()]
    }

    async fn ready(surface: &mut MemorySurface) -> FontFaces {
        resolve_font(surface, &families()).await.unwrap()
    }

    fn builder() -> TreeBuilder {
        TreeBuilder::new(&LayoutConfig::default())
    }

    #[tokio::test]
    async fn test_resolve_font_first_family() {
        let mut surface = MemorySurface::new();
        let fonts = ready(&mut surface).await;
        assert_eq!(fonts.family, "Inter");
        assert_eq!(fonts.face(FontWeight::Bold).style, FontStyle::Bold);
    }

    #[tokio::test]
    async fn test_resolve_font_skips_missing_family() {
        let mut surface = MemorySurface::new().with_fonts(["Roboto"]);
        let fonts = ready(&mut surface).await;
        assert_eq!(fonts.family, "Roboto");
    }

    #[tokio::test]
    async fn test_resolve_font_none_available() {
        let mut surface = MemorySurface::new().with_fonts(Vec::<String>::new());
        let err = resolve_font(&mut surface, &families()).await.unwrap_err();
        assert!(matches!(err, BuildError::NoUsableFont { ref tried } if tried.len() == 2));
    }

    #[tokio::test]
    async fn test_page_root_defaults() {
        let mut surface = MemorySurface::new();
        let fonts = ready(&mut surface).await;
        let built = builder()
            .build_page(&mut surface, &spec(json!({"type": "frame", "y": 300})), &fonts)
            .unwrap();

        let root = surface.get(built.id).unwrap();
        assert_eq!(root.name, "Generated Design");
        assert_eq!((root.x, root.y, root.width, root.height), (0.0, 0.0, 375.0, 600.0));
        assert!(root.effects.is_empty());
        assert_eq!(surface.page_nodes().len(), 1);
    }

    #[tokio::test]
    async fn test_siblings_stack_vertically() {
        let mut surface = MemorySurface::new();
        let fonts = ready(&mut surface).await;
        let page = spec(json!({
            "type": "frame",
            "children": [
                {"type": "rectangle", "name": "A", "height": 40},
                {"type": "text", "name": "B"},
                {"type": "ellipse", "name": "C", "y": 500, "height": 10},
                {"type": "star", "name": "D"}
            ]
        }));
        let built = builder().build_page(&mut surface, &page, &fonts).unwrap();

        let ys: Vec<f64> = surface.children_of(built.id).iter().map(|r| r.y).collect();
        // 0 + 40 + 10, then 50 + 60 + 10, explicit 500, then 500 + 10 + 10
        assert_eq!(ys, vec![0.0, 50.0, 500.0, 520.0]);
    }

    #[tokio::test]
    async fn test_build_node_returns_next_cursor() {
        let mut surface = MemorySurface::new();
        let fonts = ready(&mut surface).await;
        let next = builder()
            .build_node(&mut surface, None, &spec(json!({"type": "rectangle", "height": 30})), 100.0, 1, &fonts)
            .unwrap();
        assert_eq!(next, 140.0);
    }

    #[tokio::test]
    async fn test_children_cursor_restarts_inside_parent() {
        let mut surface = MemorySurface::new();
        let fonts = ready(&mut surface).await;
        let page = spec(json!({
            "type": "frame",
            "children": [
                {"type": "rectangle", "height": 100},
                {"type": "frame", "name": "Inner", "children": [{"type": "star", "name": "S"}]}
            ]
        }));
        builder().build_page(&mut surface, &page, &fonts).unwrap();

        let inner = surface.find_by_name("Inner").unwrap();
        assert_eq!(inner.y, 110.0);
        assert_eq!(surface.find_by_name("S").unwrap().y, 0.0);
    }

    #[tokio::test]
    async fn test_text_defaults_and_bold_face() {
        let mut surface = MemorySurface::new();
        let fonts = ready(&mut surface).await;
        let page = spec(json!({
            "type": "frame",
            "children": [
                {"type": "text", "name": "Plain"},
                {"type": "text", "name": "Strong", "content": "Hi", "fontWeight": "BOLD", "fontSize": 24, "textAlign": "CENTER"}
            ]
        }));
        builder().build_page(&mut surface, &page, &fonts).unwrap();

        let plain = surface.find_by_name("Plain").unwrap();
        let text = plain.text.as_ref().unwrap();
        assert_eq!(text.characters, "Sample Text");
        assert_eq!(text.font_size, Some(16.0));
        assert_eq!(text.align, Some(TextAlign::Left));
        assert_eq!(text.font.as_ref().unwrap().style, FontStyle::Regular);
        assert_eq!((plain.width, plain.height), (300.0, 60.0));

        let strong = surface.find_by_name("Strong").unwrap().text.clone().unwrap();
        assert_eq!(strong.characters, "Hi");
        assert_eq!(strong.font_size, Some(24.0));
        assert_eq!(strong.align, Some(TextAlign::Center));
        assert_eq!(strong.font.unwrap(), FontName::new("Inter", FontStyle::Bold));
    }

    #[tokio::test]
    async fn test_border_on_text_is_ignored() {
        let mut surface = MemorySurface::new();
        let fonts = ready(&mut surface).await;
        let node = spec(json!({
            "type": "text",
            "name": "Bordered",
            "width": 120, "height": 30,
            "backgroundColor": "#FF0000",
            "borderColor": "#000000",
            "borderWidth": 2,
            "borderRadius": 6
        }));
        builder().build_node(&mut surface, None, &node, 0.0, 1, &fonts).unwrap();

        let record = surface.find_by_name("Bordered").unwrap();
        assert_eq!((record.width, record.height), (120.0, 30.0));
        assert_eq!(record.fills, vec![Paint::Solid { color: Rgb { r: 1.0, g: 0.0, b: 0.0 } }]);
        assert!(record.strokes.is_empty());
        assert_eq!(record.corner_radius, None);
        assert!(record.effects.is_empty());
    }

    #[tokio::test]
    async fn test_host_rejection_is_recovered() {
        let mut surface = MemorySurface::new().rejecting(NodeKind::Rectangle, StyleProperty::Strokes);
        let fonts = ready(&mut surface).await;
        let node = spec(json!({
            "type": "rectangle",
            "name": "Card",
            "width": 200, "height": 80,
            "backgroundColor": "#FFFFFF",
            "borderColor": "#E9ECEF",
            "borderWidth": 1,
            "borderRadius": 8
        }));
        builder().build_node(&mut surface, None, &node, 0.0, 1, &fonts).unwrap();

        let record = surface.find_by_name("Card").unwrap();
        assert_eq!((record.width, record.height), (200.0, 80.0));
        assert_eq!(record.fills.len(), 1);
        assert!(record.strokes.is_empty());
        assert_eq!(record.corner_radius, Some(8.0));
        assert_eq!(record.effects, vec![Effect::card_shadow()]);
    }

    #[tokio::test]
    async fn test_border_needs_color_and_width() {
        let mut surface = MemorySurface::new();
        let fonts = ready(&mut surface).await;
        let node = spec(json!({"type": "ellipse", "name": "E", "borderColor": "#000000"}));
        builder().build_node(&mut surface, None, &node, 0.0, 1, &fonts).unwrap();
        let record = surface.find_by_name("E").unwrap();
        assert!(record.strokes.is_empty());
        assert!(record.effects.is_empty());

        let node = spec(json!({"type": "star", "name": "S", "borderColor": "#000000", "borderWidth": 3}));
        builder().build_node(&mut surface, None, &node, 0.0, 1, &fonts).unwrap();
        assert_eq!(surface.find_by_name("S").unwrap().stroke_weight, Some(3.0));
    }

    #[test]
    fn test_default_size() {
        assert_eq!(default_size(NodeType::Text), (300.0, 60.0));
        assert_eq!(default_size(NodeType::Rectangle), (400.0, 200.0));
        assert_eq!(default_size(NodeType::Unknown), (400.0, 200.0));
    }

    #[tokio::test]
    async fn test_unknown_type_becomes_component_frame() {
        let mut surface = MemorySurface::new();
        let fonts = ready(&mut surface).await;
        builder()
            .build_node(&mut surface, None, &spec(json!({"type": "hexagon"})), 0.0, 1, &fonts)
            .unwrap();
        let record = surface.find_by_name("Component").unwrap();
        assert_eq!(record.kind, NodeKind::Frame);
        assert_eq!((record.width, record.height), (400.0, 200.0));
    }

    #[tokio::test]
    async fn test_auto_layout_defaults() {
        let mut surface = MemorySurface::new();
        let fonts = ready(&mut surface).await;
        let node = spec(json!({"type": "frame", "name": "Row", "layoutMode": "HORIZONTAL", "paddingTop": 4}));
        builder().build_node(&mut surface, None, &node, 0.0, 1, &fonts).unwrap();

        let layout = surface.find_by_name("Row").unwrap().auto_layout.unwrap();
        assert_eq!(layout.mode, LayoutMode::Horizontal);
        assert_eq!(layout.primary_axis_align, PrimaryAxisAlign::Min);
        assert_eq!(layout.counter_axis_align, CounterAxisAlign::Min);
        assert_eq!(layout.item_spacing, 16.0);
        assert_eq!(layout.padding_top, 4.0);
        assert_eq!(layout.padding_left, 16.0);

        let node = spec(json!({"type": "frame", "name": "Free"}));
        builder().build_node(&mut surface, None, &node, 0.0, 1, &fonts).unwrap();
        assert!(surface.find_by_name("Free").unwrap().auto_layout.is_none());
    }

    #[tokio::test]
    async fn test_children_of_leaf_are_skipped() {
        let mut surface = MemorySurface::new();
        let fonts = ready(&mut surface).await;
        let node = spec(json!({"type": "rectangle", "name": "Leaf", "children": [{"type": "star"}]}));
        builder().build_node(&mut surface, None, &node, 0.0, 1, &fonts).unwrap();
        assert_eq!(surface.len(), 1);
    }

    #[tokio::test]
    async fn test_depth_ceiling() {
        let mut surface = MemorySurface::new();
        let fonts = ready(&mut surface).await;
        let mut deep = json!({"type": "frame"});
        for _ in 0..25 {
            deep = json!({"type": "frame", "children": [deep]});
        }
        builder().build_page(&mut surface, &spec(deep), &fonts).unwrap();
        // Root at depth 0 plus depths 1..=20
        assert_eq!(surface.len(), 21);
    }

    #[tokio::test]
    async fn test_attach_failure_is_fatal() {
        let mut surface = MemorySurface::new();
        let fonts = ready(&mut surface).await;
        let err = builder()
            .build_node(&mut surface, Some(NodeId(999)), &spec(json!({"type": "star"})), 0.0, 1, &fonts)
            .unwrap_err();
        assert!(matches!(err, BuildError::Attach { kind: NodeKind::Star, .. }));
    }
}
