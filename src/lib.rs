#![warn(clippy::all)]

//! Helpers for drawing marker and polygon layers on Mapbox GL maps.
//!
//! Callers hand in plain records (markers, polygons, icons). The helpers
//! turn them into GeoJSON sources plus styled layers, wire click and hover
//! callbacks, and leave rendering to the map library.
//!
//! Everything is generic over [`MapHandle`]. On WASM targets `MapboxMap`
//! talks to Mapbox GL JS and the same operations are exported to JS under
//! their camelCase names. [`HeadlessMap`] keeps map state in memory.

mod error;
mod facade;
mod features;
mod images;
mod layers;
mod map;
mod style;
mod types;

#[cfg(target_arch = "wasm32")]
mod js_api;

pub use error::MapError;
pub use facade::{render_map, render_single_marker, set_token};
pub use features::{
    close_ring, extract_marker_icons, marker_props_to_features,
    marker_props_to_features_with_defaults, polygon_props_to_features, Feature,
    FeatureCollection, Geometry,
};
pub use images::{load_images_to_map, load_images_to_map_with, ImageLoadSummary};
pub use layers::{
    remove_markers_from_map, remove_polygons_from_map, render_markers_to_map,
    render_polygons_to_map, set_markers_to_existing_layer,
};
pub use map::{
    HeadlessImage, HeadlessMap, HeadlessMarker, ImageLoadCallback, LayerEventHandler, MapConfig,
    MapEvent, MapHandle, DEFAULT_MAP_STYLE, DEFAULT_ZOOM, POINTER_CURSOR,
};
pub use map::require_map;
#[cfg(target_arch = "wasm32")]
pub use map::{MapboxMap, MapboxMarker};
pub use style::{GeoJsonSource, LayerKind, LayerSpec};
pub use types::{
    ClickHandler, Coords, DefaultSources, IconDictionary, IconEntry, MarkerIcon, MarkerPoint,
    MarkersOptions, PolygonProp, RenderMapOptions, RenderPolygonsOptions, SingleMarkerOptions,
};
