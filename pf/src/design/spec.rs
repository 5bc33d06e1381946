//! DesignNodeSpec - the typed intermediate form of a design tree
//!
//! Model output is untrusted, so field decoding is lenient: a value of the
//! wrong JSON type is dropped (treated as absent) instead of failing the whole
//! node. Children are the exception - they must be an array of objects.

use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Node variant requested by a design spec
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    Text,
    Frame,
    Rectangle,
    Ellipse,
    Star,
    /// Missing or unrecognised `type`
    #[default]
    Unknown,
}

impl NodeType {
    /// Parse a type tag, case-insensitively
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => NodeType::Text,
            "frame" => NodeType::Frame,
            "rectangle" => NodeType::Rectangle,
            "ellipse" => NodeType::Ellipse,
            "star" => NodeType::Star,
            _ => NodeType::Unknown,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FontWeight {
    #[default]
    Normal,
    Bold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LayoutMode {
    Horizontal,
    Vertical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PrimaryAxisAlign {
    #[default]
    Min,
    Center,
    Max,
    SpaceBetween,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CounterAxisAlign {
    #[default]
    Min,
    Center,
    Max,
}

/// One node of a design tree, before materialization
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesignNodeSpec {
    #[serde(rename = "type", default, deserialize_with = "de_node_type")]
    pub node_type: NodeType,

    #[serde(default, deserialize_with = "de_string", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    // Geometry
    #[serde(default, deserialize_with = "de_number", skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, deserialize_with = "de_number", skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(default, deserialize_with = "de_number", skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, deserialize_with = "de_number", skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,

    // Style
    #[serde(default, deserialize_with = "de_string", skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
    #[serde(default, deserialize_with = "de_string", skip_serializing_if = "Option::is_none")]
    pub border_color: Option<String>,
    #[serde(default, deserialize_with = "de_number", skip_serializing_if = "Option::is_none")]
    pub border_width: Option<f64>,
    #[serde(default, deserialize_with = "de_number", skip_serializing_if = "Option::is_none")]
    pub border_radius: Option<f64>,

    // Text
    #[serde(default, deserialize_with = "de_string", skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, deserialize_with = "de_number", skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
    #[serde(default, deserialize_with = "de_keyword", skip_serializing_if = "Option::is_none")]
    pub font_weight: Option<FontWeight>,
    #[serde(default, deserialize_with = "de_keyword", skip_serializing_if = "Option::is_none")]
    pub text_align: Option<TextAlign>,

    // Auto-layout (frames)
    #[serde(default, deserialize_with = "de_keyword", skip_serializing_if = "Option::is_none")]
    pub layout_mode: Option<LayoutMode>,
    #[serde(default, deserialize_with = "de_keyword", skip_serializing_if = "Option::is_none")]
    pub primary_axis_align_items: Option<PrimaryAxisAlign>,
    #[serde(default, deserialize_with = "de_keyword", skip_serializing_if = "Option::is_none")]
    pub counter_axis_align_items: Option<CounterAxisAlign>,
    #[serde(default, deserialize_with = "de_number", skip_serializing_if = "Option::is_none")]
    pub item_spacing: Option<f64>,
    #[serde(default, deserialize_with = "de_number", skip_serializing_if = "Option::is_none")]
    pub padding_left: Option<f64>,
    #[serde(default, deserialize_with = "de_number", skip_serializing_if = "Option::is_none")]
    pub padding_right: Option<f64>,
    #[serde(default, deserialize_with = "de_number", skip_serializing_if = "Option::is_none")]
    pub padding_top: Option<f64>,
    #[serde(default, deserialize_with = "de_number", skip_serializing_if = "Option::is_none")]
    pub padding_bottom: Option<f64>,

    #[serde(default, deserialize_with = "de_children", skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<DesignNodeSpec>,
}

impl DesignNodeSpec {
    /// Nesting depth, counting this node as 1
    pub fn depth(&self) -> usize {
        1 + self.children.iter().map(DesignNodeSpec::depth).max().unwrap_or(0)
    }

    /// Total number of nodes in this subtree
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(DesignNodeSpec::node_count).sum::<usize>()
    }
}

fn de_node_type<'de, D: Deserializer<'de>>(d: D) -> Result<NodeType, D::Error> {
    let value = Value::deserialize(d)?;
    Ok(value.as_str().map(NodeType::parse).unwrap_or_default())
}

fn de_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    let value = Value::deserialize(d)?;
    Ok(match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// Numbers, or numeric strings such as `"24"` and `"24px"`
fn de_number<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    let value = Value::deserialize(d)?;
    Ok(match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_end_matches("px").trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|v| v.is_finite()))
}

/// Upper-case keyword enums; unknown keywords are dropped
fn de_keyword<'de, D, T>(d: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(d)?;
    Ok(match value {
        Value::String(s) => {
            let keyword = s.trim().to_ascii_uppercase().replace(['-', ' '], "_");
            serde_json::from_value(Value::String(keyword)).ok()
        }
        _ => None,
    })
}

fn de_children<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<DesignNodeSpec>, D::Error> {
    let value = Value::deserialize(d)?;
    match value {
        Value::Null => Ok(Vec::new()),
        Value::Array(items) => items
            .into_iter()
            .map(|item| {
                if !item.is_object() {
                    return Err(D::Error::custom("child node must be a JSON object"));
                }
                serde_json::from_value(item).map_err(D::Error::custom)
            })
            .collect(),
        _ => Err(D::Error::custom("children must be a JSON array")),
    }
}
