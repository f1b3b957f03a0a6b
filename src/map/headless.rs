//! In-memory map backend.
//!
//! Records sources, layers, images, subscriptions and markers instead of
//! rendering them. Image loads and layer events are driven by hand through
//! [`HeadlessMap::complete_image_loads`] and [`HeadlessMap::fire`].

use super::{
    ImageLoadCallback, LayerEventHandler, MapConfig, MapEvent, MapHandle, POINTER_CURSOR,
};
use crate::error::MapError;
use crate::style::{GeoJsonSource, LayerSpec};
use crate::types::SingleMarkerOptions;
use serde_json::Value;
use std::cell::RefCell;
use std::collections::{BTreeMap, HashSet, VecDeque};
use std::rc::Rc;

thread_local! {
    static ACCESS_TOKEN: RefCell<Option<String>> = const { RefCell::new(None) };
}

/// Image "decoded" by the headless backend.
#[derive(Debug, Clone, PartialEq)]
pub struct HeadlessImage {
    pub path: String,
}

/// Marker placed on a headless map.
#[derive(Debug, Clone, PartialEq)]
pub struct HeadlessMarker {
    pub position: [f64; 2],
    pub options: SingleMarkerOptions,
}

type SharedHandler = Rc<RefCell<LayerEventHandler>>;

#[derive(Default)]
struct HeadlessState {
    config: MapConfig,
    load_handlers: Vec<Box<dyn FnOnce()>>,
    resize_count: usize,
    sources: BTreeMap<String, GeoJsonSource>,
    layers: Vec<LayerSpec>,
    images: BTreeMap<String, (HeadlessImage, bool)>,
    broken_paths: HashSet<String>,
    pending_loads: VecDeque<(String, ImageLoadCallback<HeadlessImage>)>,
    handlers: Vec<(MapEvent, String, SharedHandler)>,
    cursor: String,
    markers: Vec<HeadlessMarker>,
}

/// A map that keeps its state in memory.
#[derive(Clone, Default)]
pub struct HeadlessMap {
    state: Rc<RefCell<HeadlessState>>,
}

impl HeadlessMap {
    pub fn new(config: MapConfig) -> Self {
        let map = Self::default();
        map.state.borrow_mut().config = config;
        map
    }

    /// Token last passed to [`MapHandle::set_access_token`] on this thread.
    pub fn access_token() -> Option<String> {
        ACCESS_TOKEN.with(|t| t.borrow().clone())
    }

    pub fn config(&self) -> MapConfig {
        self.state.borrow().config.clone()
    }

    /// Emits the map's `load` event.
    pub fn fire_load(&self) {
        let handlers = std::mem::take(&mut self.state.borrow_mut().load_handlers);
        for handler in handlers {
            handler();
        }
    }

    pub fn resize_count(&self) -> usize {
        self.state.borrow().resize_count
    }

    pub fn source(&self, id: &str) -> Option<GeoJsonSource> {
        self.state.borrow().sources.get(id).cloned()
    }

    pub fn source_ids(&self) -> Vec<String> {
        self.state.borrow().sources.keys().cloned().collect()
    }

    pub fn layer(&self, id: &str) -> Option<LayerSpec> {
        self.state
            .borrow()
            .layers
            .iter()
            .find(|l| l.id == id)
            .cloned()
    }

    /// Layer ids in insertion order.
    pub fn layer_ids(&self) -> Vec<String> {
        self.state
            .borrow()
            .layers
            .iter()
            .map(|l| l.id.clone())
            .collect()
    }

    /// Registered image and its SDF flag.
    pub fn image(&self, name: &str) -> Option<(HeadlessImage, bool)> {
        self.state.borrow().images.get(name).cloned()
    }

    /// Makes every later load of `path` fail.
    pub fn fail_image(&self, path: &str) {
        self.state.borrow_mut().broken_paths.insert(path.to_string());
    }

    /// Drops every pending image load without settling it, as a map torn
    /// down mid-load would.
    pub fn discard_image_loads(&self) {
        let pending = std::mem::take(&mut self.state.borrow_mut().pending_loads);
        drop(pending);
    }

    pub fn pending_image_loads(&self) -> usize {
        self.state.borrow().pending_loads.len()
    }

    /// Settles every pending image load, including loads started by the
    /// completion callbacks themselves.
    pub fn complete_image_loads(&self) {
        loop {
            let next = self.state.borrow_mut().pending_loads.pop_front();
            let Some((path, done)) = next else {
                break;
            };
            let broken = self.state.borrow().broken_paths.contains(&path);
            if broken {
                done(Err(MapError::Js(format!("Could not load image {}", path))));
            } else {
                done(Ok(HeadlessImage { path }));
            }
        }
    }

    /// Dispatches `event` to every handler subscribed on `layer_id`.
    pub fn fire(&self, event: MapEvent, layer_id: &str, properties: Option<Value>) {
        let handlers: Vec<SharedHandler> = self
            .state
            .borrow()
            .handlers
            .iter()
            .filter(|(e, id, _)| *e == event && id == layer_id)
            .map(|(_, _, h)| h.clone())
            .collect();

        for handler in handlers {
            let mut handler = handler.borrow_mut();
            (*handler)(properties.clone());
        }
    }

    pub fn handler_count(&self, event: MapEvent, layer_id: &str) -> usize {
        self.state
            .borrow()
            .handlers
            .iter()
            .filter(|(e, id, _)| *e == event && id == layer_id)
            .count()
    }

    pub fn cursor(&self) -> String {
        self.state.borrow().cursor.clone()
    }

    pub fn markers(&self) -> Vec<HeadlessMarker> {
        self.state.borrow().markers.clone()
    }
}

impl MapHandle for HeadlessMap {
    type Image = HeadlessImage;
    type Marker = HeadlessMarker;

    fn set_access_token(token: &str) -> Result<(), MapError> {
        ACCESS_TOKEN.with(|t| *t.borrow_mut() = Some(token.to_string()));
        Ok(())
    }

    fn create(config: &MapConfig) -> Result<Self, MapError> {
        if config.container.is_empty() {
            return Err(MapError::Js("Container '' not found.".to_string()));
        }
        Ok(Self::new(config.clone()))
    }

    fn once_loaded(&self, handler: Box<dyn FnOnce()>) {
        self.state.borrow_mut().load_handlers.push(handler);
    }

    fn resize(&self) {
        self.state.borrow_mut().resize_count += 1;
    }

    fn has_source(&self, id: &str) -> bool {
        self.state.borrow().sources.contains_key(id)
    }

    fn add_source(&self, id: &str, source: &GeoJsonSource) -> Result<(), MapError> {
        let mut state = self.state.borrow_mut();
        if state.sources.contains_key(id) {
            return Err(MapError::SourceAlreadyExists(id.to_string()));
        }
        state.sources.insert(id.to_string(), source.clone());
        Ok(())
    }

    fn set_source_data(&self, id: &str, data: &Value) -> Result<(), MapError> {
        let mut state = self.state.borrow_mut();
        let source = state
            .sources
            .get_mut(id)
            .ok_or_else(|| MapError::Js(format!("There is no source with ID \"{}\"", id)))?;
        source.data = data.clone();
        Ok(())
    }

    fn remove_source(&self, id: &str) -> Result<(), MapError> {
        let mut state = self.state.borrow_mut();
        if state.layers.iter().any(|l| l.source == id) {
            return Err(MapError::Js(format!(
                "Source \"{}\" cannot be removed while a layer is using it",
                id
            )));
        }
        state
            .sources
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| MapError::Js(format!("There is no source with ID \"{}\"", id)))
    }

    fn has_layer(&self, id: &str) -> bool {
        self.state.borrow().layers.iter().any(|l| l.id == id)
    }

    fn add_layer(&self, layer: &LayerSpec) -> Result<(), MapError> {
        let mut state = self.state.borrow_mut();
        if state.layers.iter().any(|l| l.id == layer.id) {
            return Err(MapError::LayerAlreadyExists(layer.id.clone()));
        }
        if !state.sources.contains_key(&layer.source) {
            return Err(MapError::Js(format!(
                "Source \"{}\" not found",
                layer.source
            )));
        }
        state.layers.push(layer.clone());
        Ok(())
    }

    fn remove_layer(&self, id: &str) -> Result<(), MapError> {
        let mut state = self.state.borrow_mut();
        let index = state
            .layers
            .iter()
            .position(|l| l.id == id)
            .ok_or_else(|| MapError::Js(format!("The layer '{}' does not exist", id)))?;
        state.layers.remove(index);
        Ok(())
    }

    fn has_image(&self, name: &str) -> bool {
        self.state.borrow().images.contains_key(name)
    }

    fn load_image(&self, path: &str, done: ImageLoadCallback<HeadlessImage>) {
        self.state
            .borrow_mut()
            .pending_loads
            .push_back((path.to_string(), done));
    }

    fn add_image(&self, name: &str, image: HeadlessImage, sdf: bool) -> Result<(), MapError> {
        let mut state = self.state.borrow_mut();
        if state.images.contains_key(name) {
            return Err(MapError::Js(format!(
                "An image named \"{}\" already exists",
                name
            )));
        }
        state.images.insert(name.to_string(), (image, sdf));
        Ok(())
    }

    fn on_layer(&self, event: MapEvent, layer_id: &str, handler: LayerEventHandler) {
        self.state.borrow_mut().handlers.push((
            event,
            layer_id.to_string(),
            Rc::new(RefCell::new(handler)),
        ));
    }

    fn has_layer_listener(&self, event: MapEvent, layer_id: &str) -> bool {
        self.handler_count(event, layer_id) > 0
    }

    fn show_pointer_on_hover(&self, layer_id: &str) {
        for (event, cursor) in [
            (MapEvent::MouseEnter, POINTER_CURSOR),
            (MapEvent::MouseLeave, ""),
        ] {
            // Weak: the handler lives inside the state it points at.
            let state = Rc::downgrade(&self.state);
            self.on_layer(
                event,
                layer_id,
                Box::new(move |_: Option<Value>| {
                    if let Some(state) = state.upgrade() {
                        state.borrow_mut().cursor = cursor.to_string();
                    }
                }),
            );
        }
    }

    fn add_marker(
        &self,
        position: [f64; 2],
        options: &SingleMarkerOptions,
    ) -> Result<HeadlessMarker, MapError> {
        let marker = HeadlessMarker {
            position,
            options: options.clone(),
        };
        self.state.borrow_mut().markers.push(marker.clone());
        Ok(marker)
    }
}
