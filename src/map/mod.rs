//! Abstraction over the external map object.
//!
//! Every helper in this crate talks to the map through [`MapHandle`]. On
//! WASM targets `MapboxMap` forwards to Mapbox GL JS. [`HeadlessMap`]
//! keeps the same state in memory and is available everywhere, which is
//! what the unit tests run against.

mod headless;
#[cfg(target_arch = "wasm32")]
mod mapbox;

pub use headless::{HeadlessImage, HeadlessMap, HeadlessMarker};
#[cfg(target_arch = "wasm32")]
pub(crate) use mapbox::to_js;
#[cfg(target_arch = "wasm32")]
pub use mapbox::{MapboxMap, MapboxMarker};

use crate::error::MapError;
use crate::style::{GeoJsonSource, LayerSpec};
use crate::types::{is_set, Coords, RenderMapOptions, SingleMarkerOptions};
use serde_json::{json, Value};

pub const DEFAULT_MAP_STYLE: &str = "mapbox://styles/mapbox/streets-v11";
pub const DEFAULT_ZOOM: f64 = 15.0;
/// Canvas cursor shown while hovering a clickable layer.
pub const POINTER_CURSOR: &str = "pointer";

/// Pointer events the helpers subscribe to on a layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MapEvent {
    Click,
    MouseEnter,
    MouseLeave,
}

impl MapEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            MapEvent::Click => "click",
            MapEvent::MouseEnter => "mouseenter",
            MapEvent::MouseLeave => "mouseleave",
        }
    }
}

/// Handler for a layer event. Receives the properties of the first feature
/// under the pointer, if any.
pub type LayerEventHandler = Box<dyn FnMut(Option<Value>)>;

/// Completion callback of an image load.
pub type ImageLoadCallback<I> = Box<dyn FnOnce(Result<I, MapError>)>;

/// Resolved construction options for a map.
#[derive(Debug, Clone, PartialEq)]
pub struct MapConfig {
    /// Id of the HTML element the map renders into.
    pub container: String,
    /// Style URL or inline style JSON.
    pub style: String,
    pub zoom: f64,
    pub center: Coords,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            container: "map".to_string(),
            style: DEFAULT_MAP_STYLE.to_string(),
            zoom: DEFAULT_ZOOM,
            center: Coords::default(),
        }
    }
}

impl MapConfig {
    pub fn new(container: impl Into<String>) -> Self {
        Self {
            container: container.into(),
            ..Default::default()
        }
    }

    /// Resolves caller options against the defaults. Empty, zero and NaN
    /// values count as unset.
    pub fn from_options(container: impl Into<String>, options: Option<&RenderMapOptions>) -> Self {
        let mut config = Self::new(container);
        let Some(options) = options else {
            return config;
        };

        if let Some(style) = options.map_style.as_ref().filter(|s| !s.is_empty()) {
            config.style = style.clone();
        }
        if let Some(zoom) = options.zoom.filter(|z| is_set(*z)) {
            config.zoom = zoom;
        }
        if let Some(center) = options.center {
            config.center = Coords::new(or_zero(center.lat), or_zero(center.lng));
        }
        config
    }

    pub fn with_style(mut self, style: impl Into<String>) -> Self {
        self.style = style.into();
        self
    }

    pub fn with_zoom(mut self, zoom: f64) -> Self {
        self.zoom = zoom;
        self
    }

    pub fn with_center(mut self, center: Coords) -> Self {
        self.center = center;
        self
    }

    /// Options object for the library's map constructor.
    pub fn to_map_options(&self) -> Value {
        json!({
            "container": self.container,
            "style": self.style,
            "zoom": self.zoom,
            "center": self.center.to_position(),
        })
    }
}

fn or_zero(v: f64) -> f64 {
    if v.is_nan() {
        0.0
    } else {
        v
    }
}

/// The subset of the map API the helpers rely on.
///
/// Handles are cheap to clone and refer to the same underlying map. They
/// are not `Send`: the map lives on the single UI thread.
pub trait MapHandle: Clone + 'static {
    /// Decoded image as produced by [`MapHandle::load_image`].
    type Image: 'static;
    /// DOM marker returned by [`MapHandle::add_marker`].
    type Marker;

    /// Sets the access token used for every map created afterwards.
    fn set_access_token(token: &str) -> Result<(), MapError>
    where
        Self: Sized;

    /// Creates a new map.
    fn create(config: &MapConfig) -> Result<Self, MapError>
    where
        Self: Sized;

    /// Runs `handler` once, the first time the map finishes loading.
    fn once_loaded(&self, handler: Box<dyn FnOnce()>);

    /// Recomputes the canvas size from its container.
    fn resize(&self);

    fn has_source(&self, id: &str) -> bool;

    /// Fails with [`MapError::SourceAlreadyExists`] when `id` is taken.
    fn add_source(&self, id: &str, source: &GeoJsonSource) -> Result<(), MapError>;

    /// Replaces the data of an existing GeoJSON source.
    fn set_source_data(&self, id: &str, data: &Value) -> Result<(), MapError>;

    fn remove_source(&self, id: &str) -> Result<(), MapError>;

    fn has_layer(&self, id: &str) -> bool;

    /// Fails with [`MapError::LayerAlreadyExists`] when the layer id is taken.
    fn add_layer(&self, layer: &LayerSpec) -> Result<(), MapError>;

    fn remove_layer(&self, id: &str) -> Result<(), MapError>;

    fn has_image(&self, name: &str) -> bool;

    /// Starts fetching the image at `path`; `done` runs when it settles.
    fn load_image(&self, path: &str, done: ImageLoadCallback<Self::Image>);

    /// Registers a loaded image under `name`. With `sdf` the image can be
    /// recolored through `icon-color`.
    fn add_image(&self, name: &str, image: Self::Image, sdf: bool) -> Result<(), MapError>;

    /// Subscribes `handler` to `event` on the layer `layer_id`.
    fn on_layer(&self, event: MapEvent, layer_id: &str, handler: LayerEventHandler);

    /// Whether anything was subscribed to `event` on `layer_id` through
    /// [`MapHandle::on_layer`].
    fn has_layer_listener(&self, event: MapEvent, layer_id: &str) -> bool;

    /// Switches the canvas cursor to [`POINTER_CURSOR`] while the pointer is
    /// over `layer_id` and restores it on leave. The subscriptions must not
    /// keep the map alive.
    fn show_pointer_on_hover(&self, layer_id: &str);

    /// Places a DOM marker at a `[lng, lat]` position.
    fn add_marker(
        &self,
        position: [f64; 2],
        options: &SingleMarkerOptions,
    ) -> Result<Self::Marker, MapError>;
}

/// Turns a map handle that may be missing into [`MapError::MapUndefined`].
pub fn require_map<M: MapHandle>(map: Option<M>) -> Result<M, MapError> {
    map.ok_or(MapError::MapUndefined)
}
