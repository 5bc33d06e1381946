//! Fallback component synthesizer
//!
//! Hand-authored stand-ins used whenever generated content can't be trusted.
//! Pure and infallible.

use tracing::debug;

use super::sections::{PlanSection, SectionName};
use super::spec::{DesignNodeSpec, FontWeight, LayoutMode, NodeType, TextAlign};

const SURFACE: &str = "#F8F9FA";
const WHITE: &str = "#FFFFFF";
const OUTLINE: &str = "#E9ECEF";
const PRIMARY: &str = "#FF6B9D";

/// Build the fallback node list for a section, positioned at `start_y`
pub fn fallback_components(section: &PlanSection, start_y: f64) -> Vec<DesignNodeSpec> {
    debug!(section = %section.name, %start_y, "fallback_components: called");
    match section.name {
        SectionName::Header => vec![DesignNodeSpec {
            node_type: NodeType::Text,
            name: Some("Header Title".to_string()),
            content: Some("Wedding Hall Review".to_string()),
            font_size: Some(24.0),
            font_weight: Some(FontWeight::Bold),
            text_align: Some(TextAlign::Center),
            ..placed(300.0, 40.0, start_y)
        }],
        SectionName::Rating => vec![DesignNodeSpec {
            node_type: NodeType::Frame,
            name: Some("Rating Container".to_string()),
            background_color: Some(SURFACE.to_string()),
            layout_mode: Some(LayoutMode::Vertical),
            item_spacing: Some(16.0),
            padding_left: Some(16.0),
            padding_right: Some(16.0),
            padding_top: Some(16.0),
            padding_bottom: Some(16.0),
            children: vec![DesignNodeSpec {
                node_type: NodeType::Text,
                name: Some("Rating Label".to_string()),
                content: Some("Please select a rating".to_string()),
                font_size: Some(16.0),
                font_weight: Some(FontWeight::Bold),
                text_align: Some(TextAlign::Left),
                x: Some(16.0),
                ..placed(288.0, 24.0, 16.0)
            }],
            ..placed(320.0, 80.0, start_y)
        }],
        SectionName::PhotoUpload => vec![DesignNodeSpec {
            node_type: NodeType::Rectangle,
            name: Some("Photo Upload".to_string()),
            background_color: Some(SURFACE.to_string()),
            border_radius: Some(8.0),
            border_color: Some(OUTLINE.to_string()),
            border_width: Some(2.0),
            ..placed(320.0, 120.0, start_y)
        }],
        SectionName::TextInput => vec![DesignNodeSpec {
            node_type: NodeType::Rectangle,
            name: Some("Text Input".to_string()),
            background_color: Some(WHITE.to_string()),
            border_radius: Some(8.0),
            border_color: Some(OUTLINE.to_string()),
            border_width: Some(1.0),
            ..placed(320.0, 100.0, start_y)
        }],
        SectionName::Button => vec![DesignNodeSpec {
            node_type: NodeType::Rectangle,
            name: Some("Submit Button".to_string()),
            background_color: Some(PRIMARY.to_string()),
            border_radius: Some(24.0),
            ..placed(320.0, 48.0, start_y)
        }],
        SectionName::Whole => {
            let content = if section.content.trim().is_empty() {
                "Component".to_string()
            } else {
                section.content.clone()
            };
            vec![DesignNodeSpec {
                node_type: NodeType::Text,
                name: Some("Default Component".to_string()),
                content: Some(content),
                font_size: Some(16.0),
                font_weight: Some(FontWeight::Normal),
                text_align: Some(TextAlign::Left),
                ..placed(300.0, 40.0, start_y)
            }]
        }
    }
}

fn placed(width: f64, height: f64, y: f64) -> DesignNodeSpec {
    DesignNodeSpec {
        x: Some(0.0),
        y: Some(y),
        width: Some(width),
        height: Some(height),
        ..Default::default()
    }
}
