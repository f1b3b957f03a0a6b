//! Plain-data records accepted by the map helpers.
//!
//! Field names serialize in camelCase so the same records can be read
//! straight from JavaScript option objects.

use crate::error::MapError;
use geo_types::Coord;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::rc::Rc;

/// Callback receiving the properties of a clicked feature.
pub type ClickHandler = Rc<dyn Fn(&Value)>;

/// Zero and NaN count as unset, like a falsy number in JS.
pub(crate) fn is_set(v: f64) -> bool {
    v != 0.0 && !v.is_nan()
}

/// Default source ids used when the caller does not name one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultSources {
    Polygons,
    Markers,
}

impl DefaultSources {
    pub fn as_str(&self) -> &'static str {
        match self {
            DefaultSources::Polygons => "Polygons",
            DefaultSources::Markers => "Markers",
        }
    }
}

/// A geographic point.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Coords {
    pub lat: f64,
    pub lng: f64,
}

impl Coords {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// GeoJSON position, longitude first.
    pub fn to_position(self) -> [f64; 2] {
        [self.lng, self.lat]
    }
}

impl From<Coords> for Coord<f64> {
    fn from(c: Coords) -> Self {
        Coord { x: c.lng, y: c.lat }
    }
}

/// Options for [`crate::render_map`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderMapOptions {
    /// Initial center. Defaults to `{lat: 0, lng: 0}`.
    pub center: Option<Coords>,
    /// Style URL or inline style JSON.
    pub map_style: Option<String>,
    /// Initial zoom level.
    pub zoom: Option<f64>,
}

/// Icon declared by a marker.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkerIcon {
    pub name: String,
    pub path: String,
    /// Registers the image as an SDF so `icon-color` can tint it.
    /// Only works for png and jpg images.
    #[serde(default)]
    pub dynamic_color: bool,
}

/// One marker of a markers layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkerPoint {
    pub id: String,
    pub coords: Coords,
    #[serde(default)]
    pub properties: Value,
    #[serde(default)]
    pub icon: Option<MarkerIcon>,
    #[serde(default)]
    pub icon_size: Option<f64>,
    #[serde(default)]
    pub icon_color: Option<String>,
}

impl MarkerPoint {
    pub fn new(id: impl Into<String>, coords: Coords) -> Self {
        Self {
            id: id.into(),
            coords,
            properties: Value::Null,
            icon: None,
            icon_size: None,
            icon_color: None,
        }
    }

    pub fn with_properties(mut self, properties: Value) -> Self {
        self.properties = properties;
        self
    }

    pub fn with_icon(mut self, icon: MarkerIcon) -> Self {
        self.icon = Some(icon);
        self
    }

    pub fn with_icon_size(mut self, size: f64) -> Self {
        self.icon_size = Some(size);
        self
    }

    pub fn with_icon_color(mut self, color: impl Into<String>) -> Self {
        self.icon_color = Some(color.into());
        self
    }
}

/// One polygon of a polygons layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolygonProp {
    pub id: String,
    /// Outer ring. Needs at least three coordinates; closed automatically.
    pub path: Vec<Coords>,
    /// Default is `#000`.
    #[serde(default)]
    pub fill_color: Option<String>,
    /// Default is `0.3`.
    #[serde(default)]
    pub fill_opacity: Option<f64>,
    /// Outline width in pixels. Default is `2`.
    #[serde(default)]
    pub line_width: Option<f64>,
    #[serde(default)]
    pub properties: Value,
}

impl PolygonProp {
    pub fn new(id: impl Into<String>, path: Vec<Coords>) -> Self {
        Self {
            id: id.into(),
            path,
            fill_color: None,
            fill_opacity: None,
            line_width: None,
            properties: Value::Null,
        }
    }

    pub fn with_fill_color(mut self, color: impl Into<String>) -> Self {
        self.fill_color = Some(color.into());
        self
    }

    pub fn with_fill_opacity(mut self, opacity: f64) -> Self {
        self.fill_opacity = Some(opacity);
        self
    }

    pub fn with_line_width(mut self, width: f64) -> Self {
        self.line_width = Some(width);
        self
    }

    pub fn with_properties(mut self, properties: Value) -> Self {
        self.properties = properties;
        self
    }
}

/// Options for [`crate::render_polygons_to_map`].
#[derive(Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderPolygonsOptions {
    pub polygons: Vec<PolygonProp>,
    /// Source id for this group of polygons. Defaults to `"Polygons"`.
    #[serde(default)]
    pub source_id: Option<String>,
    #[serde(skip)]
    pub on_polygon_click: Option<ClickHandler>,
}

impl RenderPolygonsOptions {
    /// Reads options from a JSON object. A missing or null `polygons` key is
    /// [`MapError::PolygonsUndefined`].
    pub fn from_json(value: Value) -> Result<Self, MapError> {
        if value.get("polygons").map_or(true, Value::is_null) {
            return Err(MapError::PolygonsUndefined);
        }
        Ok(serde_json::from_value(value)?)
    }

    pub fn new(polygons: Vec<PolygonProp>) -> Self {
        Self {
            polygons,
            ..Default::default()
        }
    }

    pub fn with_source_id(mut self, source_id: impl Into<String>) -> Self {
        self.source_id = Some(source_id.into());
        self
    }

    pub fn on_polygon_click(mut self, handler: impl Fn(&Value) + 'static) -> Self {
        self.on_polygon_click = Some(Rc::new(handler));
        self
    }

    pub fn source_id(&self) -> &str {
        self.source_id
            .as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or(DefaultSources::Polygons.as_str())
    }
}

/// Options for the markers layer helpers.
#[derive(Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkersOptions {
    pub markers: Vec<MarkerPoint>,
    /// Source id for this group of markers. Defaults to `"Markers"`.
    #[serde(default)]
    pub source_id: Option<String>,
    #[serde(skip)]
    pub on_point_click: Option<ClickHandler>,
}

impl MarkersOptions {
    pub fn from_json(value: Value) -> Result<Self, MapError> {
        Ok(serde_json::from_value(value)?)
    }

    pub fn new(markers: Vec<MarkerPoint>) -> Self {
        Self {
            markers,
            ..Default::default()
        }
    }

    pub fn with_source_id(mut self, source_id: impl Into<String>) -> Self {
        self.source_id = Some(source_id.into());
        self
    }

    pub fn on_point_click(mut self, handler: impl Fn(&Value) + 'static) -> Self {
        self.on_point_click = Some(Rc::new(handler));
        self
    }

    pub fn source_id(&self) -> &str {
        self.source_id
            .as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or(DefaultSources::Markers.as_str())
    }
}

/// Subset of the library's DOM marker options.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SingleMarkerOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rotation: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub draggable: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anchor: Option<String>,
    /// Any other marker option (`offset`, `className`, `pitchAlignment`, ...),
    /// passed through untouched.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// Image registration info for one icon name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IconEntry {
    pub path: String,
    #[serde(default)]
    pub dynamic_color: bool,
}

/// Icon name to image mapping.
pub type IconDictionary = BTreeMap<String, IconEntry>;
