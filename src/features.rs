//! Conversion of markers and polygons into GeoJSON features.
//!
//! These are the only pieces of real logic in the crate: coordinate
//! reordering into `[lng, lat]` positions, ring closure, property merging
//! with default substitution, and icon dictionary extraction.

use crate::error::MapError;
use crate::types::{is_set, Coords, IconDictionary, IconEntry, MarkerPoint, PolygonProp};
use geo_types::LineString;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Icon name written for updated markers that declare none.
pub const DEFAULT_ICON_NAME: &str = "default";
/// Icon size written for updated markers that declare none.
pub const DEFAULT_ICON_SIZE: f64 = 1.0;
/// Icon color written for updated markers that declare none.
pub const DEFAULT_ICON_COLOR: &str = "#000";

/// Geometry of a feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Geometry {
    Point { coordinates: [f64; 2] },
    Polygon { coordinates: Vec<Vec<[f64; 2]>> },
}

/// A GeoJSON feature: geometry plus a flat property object.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub struct Feature {
    pub geometry: Geometry,
    pub properties: Map<String, Value>,
}

impl Feature {
    pub fn point(position: [f64; 2], properties: Map<String, Value>) -> Self {
        Self {
            geometry: Geometry::Point {
                coordinates: position,
            },
            properties,
        }
    }

    pub fn polygon(ring: Vec<[f64; 2]>, properties: Map<String, Value>) -> Self {
        Self {
            geometry: Geometry::Polygon {
                coordinates: vec![ring],
            },
            properties,
        }
    }
}

/// A GeoJSON feature collection.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(tag = "type")]
pub struct FeatureCollection {
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn new(features: Vec<Feature>) -> Self {
        Self { features }
    }

    pub fn to_value(&self) -> Result<Value, MapError> {
        Ok(serde_json::to_value(self)?)
    }
}

/// Builds a closed ring of `[lng, lat]` positions from a path.
///
/// The first position is appended when the last one differs from it.
pub fn close_ring(path: &[Coords]) -> Vec<[f64; 2]> {
    let mut ring: LineString<f64> = path.iter().copied().collect();
    ring.close();
    ring.coords().map(|c| [c.x, c.y]).collect()
}

/// Converts polygons to polygon features.
///
/// Fails on the first polygon with fewer than three coordinates.
pub fn polygon_props_to_features(polygons: &[PolygonProp]) -> Result<Vec<Feature>, MapError> {
    polygons
        .iter()
        .map(|p| {
            if p.path.len() < 3 {
                return Err(MapError::InvalidPolygon {
                    id: p.id.clone(),
                    points: p.path.len(),
                });
            }

            let mut properties = Map::new();
            spread(&mut properties, &p.properties);
            insert_opt(&mut properties, "fillColor", p.fill_color.clone());
            insert_opt(&mut properties, "fillOpacity", p.fill_opacity);
            insert_opt(&mut properties, "lineWidth", p.line_width);

            Ok(Feature::polygon(close_ring(&p.path), properties))
        })
        .collect()
}

/// Converts markers to point features, leaving unset icon fields out so the
/// layer's paint expressions fall back to their defaults.
pub fn marker_props_to_features(markers: &[MarkerPoint]) -> Vec<Feature> {
    markers
        .iter()
        .map(|marker| {
            let mut properties = marker_base_properties(marker);
            insert_opt(
                &mut properties,
                "icon",
                marker.icon.as_ref().map(|i| i.name.clone()),
            );
            insert_opt(&mut properties, "iconSize", marker.icon_size);
            insert_opt(&mut properties, "iconColor", marker.icon_color.clone());

            Feature::point(marker.coords.to_position(), properties)
        })
        .collect()
}

/// Converts markers to point features with explicit defaults for every icon
/// field. Empty names and colors, and zero or NaN sizes, count as unset.
/// Used when replacing the data of an existing source.
pub fn marker_props_to_features_with_defaults(markers: &[MarkerPoint]) -> Vec<Feature> {
    markers
        .iter()
        .map(|marker| {
            let mut properties = marker_base_properties(marker);
            let icon = marker
                .icon
                .as_ref()
                .map(|i| i.name.as_str())
                .filter(|name| !name.is_empty())
                .unwrap_or(DEFAULT_ICON_NAME);
            properties.insert("icon".into(), Value::from(icon));
            let icon_size = marker
                .icon_size
                .filter(|size| is_set(*size))
                .unwrap_or(DEFAULT_ICON_SIZE);
            properties.insert("iconSize".into(), Value::from(icon_size));
            let icon_color = marker
                .icon_color
                .as_deref()
                .filter(|color| !color.is_empty())
                .unwrap_or(DEFAULT_ICON_COLOR);
            properties.insert("iconColor".into(), Value::from(icon_color));

            Feature::point(marker.coords.to_position(), properties)
        })
        .collect()
}

/// Collects the icons declared by `markers`, one entry per name.
///
/// When several markers share a name, the last one wins.
pub fn extract_marker_icons(markers: &[MarkerPoint]) -> IconDictionary {
    let mut icons = IconDictionary::new();

    for marker in markers {
        let Some(icon) = &marker.icon else {
            continue;
        };
        if icon.name.is_empty() || icon.path.is_empty() {
            log::warn!(
                "Marker {} declares an icon without a name or path",
                marker.id
            );
            continue;
        }
        icons.insert(
            icon.name.clone(),
            IconEntry {
                path: icon.path.clone(),
                dynamic_color: icon.dynamic_color,
            },
        );
    }

    icons
}

fn marker_base_properties(marker: &MarkerPoint) -> Map<String, Value> {
    let mut properties = Map::new();
    properties.insert("id".into(), Value::from(marker.id.clone()));
    spread(&mut properties, &marker.properties);
    properties
}

/// Copies the keys of `source` into `target` when it is an object.
fn spread(target: &mut Map<String, Value>, source: &Value) {
    if let Value::Object(map) = source {
        for (k, v) in map {
            target.insert(k.clone(), v.clone());
        }
    }
}

fn insert_opt<T: Into<Value>>(target: &mut Map<String, Value>, key: &str, value: Option<T>) {
    if let Some(v) = value {
        target.insert(key.to_string(), v.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MarkerIcon;
    use serde_json::json;

    fn triangle() -> Vec<Coords> {
        vec![
            Coords::new(37.4163221, -122.3422178),
            Coords::new(37.4656899, -122.2873244),
            Coords::new(37.31828, -122.2339267),
        ]
    }

    fn icon(name: &str, path: &str, dynamic_color: bool) -> MarkerIcon {
        MarkerIcon {
            name: name.into(),
            path: path.into(),
            dynamic_color,
        }
    }

    #[test]
    fn test_close_ring_appends_first() {
        let ring = close_ring(&triangle());
        assert_eq!(ring.len(), 4);
        assert_eq!(ring[0], [-122.3422178, 37.4163221]);
        assert_eq!(ring[3], ring[0]);
    }

    #[test]
    fn test_close_ring_keeps_closed_path() {
        let mut path = triangle();
        path.push(path[0]);
        let ring = close_ring(&path);
        assert_eq!(ring.len(), 4);
        assert_eq!(ring.first(), ring.last());
    }

    #[test]
    fn test_polygon_features() {
        let polygons = vec![PolygonProp::new("1", triangle())
            .with_fill_color("#ff0000")
            .with_properties(json!({ "name": "zone", "fillColor": "#00ff00" }))];

        let features = polygon_props_to_features(&polygons).unwrap();
        assert_eq!(features.len(), 1);

        let feature = &features[0];
        match &feature.geometry {
            Geometry::Polygon { coordinates } => {
                assert_eq!(coordinates.len(), 1);
                assert_eq!(coordinates[0].len(), 4);
            }
            other => panic!("unexpected geometry: {:?}", other),
        }
        // explicit fill color overrides the property bag
        assert_eq!(feature.properties["fillColor"], json!("#ff0000"));
        assert_eq!(feature.properties["name"], json!("zone"));
        assert!(!feature.properties.contains_key("fillOpacity"));
        assert!(!feature.properties.contains_key("lineWidth"));
    }

    #[test]
    fn test_polygon_too_short() {
        let polygons = vec![PolygonProp::new("short", triangle()[..2].to_vec())];
        assert_eq!(
            polygon_props_to_features(&polygons),
            Err(MapError::InvalidPolygon {
                id: "short".into(),
                points: 2
            })
        );
    }

    #[test]
    fn test_feature_collection_geojson_shape() {
        let marker = MarkerPoint::new("1", Coords::new(37.37, -122.04));
        let collection = FeatureCollection::new(marker_props_to_features(&[marker]));

        assert_eq!(
            collection.to_value().unwrap(),
            json!({
                "type": "FeatureCollection",
                "features": [{
                    "type": "Feature",
                    "geometry": { "type": "Point", "coordinates": [-122.04, 37.37] },
                    "properties": { "id": "1" }
                }]
            })
        );
    }

    #[test]
    fn test_marker_properties_merge() {
        let marker = MarkerPoint::new("7", Coords::new(1.0, 2.0))
            .with_properties(json!({ "id": "overridden", "kind": "store", "icon": "x" }))
            .with_icon(icon("pin", "./pin.png", false))
            .with_icon_size(0.5);

        let features = marker_props_to_features(&[marker]);
        let props = &features[0].properties;
        assert_eq!(props["id"], json!("overridden"));
        assert_eq!(props["kind"], json!("store"));
        assert_eq!(props["icon"], json!("pin"));
        assert_eq!(props["iconSize"], json!(0.5));
        assert!(!props.contains_key("iconColor"));
    }

    #[test]
    fn test_marker_defaults_on_update() {
        let marker = MarkerPoint::new("1", Coords::new(1.0, 2.0));
        let features = marker_props_to_features_with_defaults(&[marker]);
        let props = &features[0].properties;
        assert_eq!(props["icon"], json!("default"));
        assert_eq!(props["iconSize"], json!(1.0));
        assert_eq!(props["iconColor"], json!("#000"));

        let marker = MarkerPoint::new("2", Coords::new(1.0, 2.0))
            .with_icon(icon("pin", "./pin.png", false))
            .with_icon_color("#fff");
        let features = marker_props_to_features_with_defaults(&[marker]);
        assert_eq!(features[0].properties["icon"], json!("pin"));
        assert_eq!(features[0].properties["iconColor"], json!("#fff"));
    }

    #[test]
    fn test_marker_defaults_replace_falsy_values() {
        let mut marker = MarkerPoint::new("1", Coords::new(1.0, 2.0))
            .with_icon(icon("", "./pin.png", false))
            .with_icon_size(0.0)
            .with_icon_color("");
        let features = marker_props_to_features_with_defaults(&[marker.clone()]);
        let props = &features[0].properties;
        assert_eq!(props["icon"], json!("default"));
        assert_eq!(props["iconSize"], json!(1.0));
        assert_eq!(props["iconColor"], json!("#000"));

        marker.icon_size = Some(f64::NAN);
        let features = marker_props_to_features_with_defaults(&[marker]);
        assert_eq!(features[0].properties["iconSize"], json!(1.0));
    }

    #[test]
    fn test_extract_icons_last_wins() {
        let markers = vec![
            MarkerPoint::new("1", Coords::default()).with_icon(icon("pin", "./a.png", false)),
            MarkerPoint::new("2", Coords::default()),
            MarkerPoint::new("3", Coords::default()).with_icon(icon("pin", "./b.png", true)),
            MarkerPoint::new("4", Coords::default()).with_icon(icon("flag", "./flag.png", false)),
            MarkerPoint::new("5", Coords::default()).with_icon(icon("", "./nameless.png", false)),
        ];

        let icons = extract_marker_icons(&markers);
        assert_eq!(icons.len(), 2);
        assert_eq!(
            icons["pin"],
            IconEntry {
                path: "./b.png".into(),
                dynamic_color: true
            }
        );
        assert_eq!(icons["flag"].path, "./flag.png");
    }
}
