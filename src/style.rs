//! Source and layer definitions handed to the map.
//!
//! Paint values are data-driven: each reads a feature property and falls
//! back to a fixed default when the property is absent.

use crate::error::MapError;
use crate::features::FeatureCollection;
use serde::Serialize;
use serde_json::{json, Value};

pub const DEFAULT_FILL_COLOR: &str = "#000";
pub const DEFAULT_FILL_OPACITY: f64 = 0.3;
pub const DEFAULT_LINE_WIDTH: f64 = 2.0;
pub const DEFAULT_CIRCLE_RADIUS: f64 = 6.0;
pub const DEFAULT_SYMBOL_SIZE: f64 = 1.0;
/// Tile buffer of polygon sources, in pixels.
pub const POLYGON_SOURCE_BUFFER: u32 = 5;

/// Rendering type of a style layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerKind {
    Fill,
    Line,
    Circle,
    Symbol,
}

/// A style layer bound to one source.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayerSpec {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: LayerKind,
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layout: Option<Value>,
    pub paint: Value,
}

/// A GeoJSON data source.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename = "geojson")]
pub struct GeoJsonSource {
    pub data: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buffer: Option<u32>,
}

impl GeoJsonSource {
    pub fn new(data: &FeatureCollection) -> Result<Self, MapError> {
        Ok(Self {
            data: data.to_value()?,
            buffer: None,
        })
    }

    pub fn with_buffer(mut self, buffer: u32) -> Self {
        self.buffer = Some(buffer);
        self
    }
}

pub fn polygon_fill_layer_id(source_id: &str) -> String {
    format!("{}_fill", source_id)
}

pub fn polygon_outline_layer_id(source_id: &str) -> String {
    format!("{}_outline", source_id)
}

pub fn marker_layer_id(source_id: &str) -> String {
    format!("{}_marker-point", source_id)
}

/// `["coalesce", ["get", property], fallback]`
fn coalesce(property: &str, fallback: Value) -> Value {
    json!(["coalesce", ["get", property], fallback])
}

pub fn polygon_fill_layer(source_id: &str) -> LayerSpec {
    LayerSpec {
        id: polygon_fill_layer_id(source_id),
        kind: LayerKind::Fill,
        source: source_id.to_string(),
        layout: None,
        paint: json!({
            "fill-color": coalesce("fillColor", json!(DEFAULT_FILL_COLOR)),
            "fill-opacity": coalesce("fillOpacity", json!(DEFAULT_FILL_OPACITY)),
        }),
    }
}

pub fn polygon_outline_layer(source_id: &str) -> LayerSpec {
    LayerSpec {
        id: polygon_outline_layer_id(source_id),
        kind: LayerKind::Line,
        source: source_id.to_string(),
        layout: None,
        paint: json!({
            "line-color": coalesce("fillColor", json!(DEFAULT_FILL_COLOR)),
            "line-width": coalesce("lineWidth", json!(DEFAULT_LINE_WIDTH)),
        }),
    }
}

/// Plain dots, used when no marker of the layer declares an icon.
pub fn marker_circle_layer(source_id: &str) -> LayerSpec {
    LayerSpec {
        id: marker_layer_id(source_id),
        kind: LayerKind::Circle,
        source: source_id.to_string(),
        layout: None,
        paint: json!({
            "circle-color": coalesce("iconColor", json!(DEFAULT_FILL_COLOR)),
            "circle-radius": coalesce("iconSize", json!(DEFAULT_CIRCLE_RADIUS)),
        }),
    }
}

/// Icon symbols. Icon names must already be registered as map images.
pub fn marker_symbol_layer(source_id: &str) -> LayerSpec {
    LayerSpec {
        id: marker_layer_id(source_id),
        kind: LayerKind::Symbol,
        source: source_id.to_string(),
        layout: Some(json!({
            "icon-image": coalesce("icon", json!("")),
            "icon-size": coalesce("iconSize", json!(DEFAULT_SYMBOL_SIZE)),
            "icon-allow-overlap": true,
        })),
        paint: json!({
            "icon-color": coalesce("iconColor", json!(DEFAULT_FILL_COLOR)),
        }),
    }
}
