//! Mapbox GL JS backend.
//!
//! Binds the global `mapboxgl` namespace, which the host page must load
//! before any of these functions run.

use super::{
    require_map, ImageLoadCallback, LayerEventHandler, MapConfig, MapEvent, MapHandle,
    POINTER_CURSOR,
};
use crate::error::MapError;
use crate::style::{GeoJsonSource, LayerSpec};
use crate::types::SingleMarkerOptions;
use serde::Serialize;
use serde_json::{json, Value};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

mod sys {
    use wasm_bindgen::prelude::*;

    #[wasm_bindgen(js_namespace = mapboxgl)]
    extern "C" {
        #[derive(Debug, Clone)]
        pub type Map;

        #[wasm_bindgen(constructor, js_class = "Map", catch)]
        pub fn new(options: &JsValue) -> Result<Map, JsValue>;

        #[wasm_bindgen(method, js_name = getSource)]
        pub fn get_source(this: &Map, id: &str) -> JsValue;

        #[wasm_bindgen(method, catch, js_name = addSource)]
        pub fn add_source(this: &Map, id: &str, source: &JsValue) -> Result<(), JsValue>;

        #[wasm_bindgen(method, catch, js_name = removeSource)]
        pub fn remove_source(this: &Map, id: &str) -> Result<(), JsValue>;

        #[wasm_bindgen(method, js_name = getLayer)]
        pub fn get_layer(this: &Map, id: &str) -> JsValue;

        #[wasm_bindgen(method, catch, js_name = addLayer)]
        pub fn add_layer(this: &Map, layer: &JsValue) -> Result<(), JsValue>;

        #[wasm_bindgen(method, catch, js_name = removeLayer)]
        pub fn remove_layer(this: &Map, id: &str) -> Result<(), JsValue>;

        #[wasm_bindgen(method, js_name = hasImage)]
        pub fn has_image(this: &Map, name: &str) -> bool;

        #[wasm_bindgen(method, js_name = loadImage)]
        pub fn load_image(this: &Map, url: &str, callback: &js_sys::Function);

        #[wasm_bindgen(method, catch, js_name = addImage)]
        pub fn add_image(
            this: &Map,
            name: &str,
            image: &JsValue,
            options: &JsValue,
        ) -> Result<(), JsValue>;

        #[wasm_bindgen(method, js_name = on)]
        pub fn on_layer(this: &Map, event: &str, layer_id: &str, listener: &js_sys::Function);

        #[wasm_bindgen(method)]
        pub fn once(this: &Map, event: &str, listener: &js_sys::Function);

        #[wasm_bindgen(method)]
        pub fn resize(this: &Map);

        #[wasm_bindgen(method, js_name = getCanvas)]
        pub fn get_canvas(this: &Map) -> web_sys::HtmlCanvasElement;

        #[derive(Debug, Clone)]
        pub type Marker;

        #[wasm_bindgen(constructor, js_class = "Marker", catch)]
        pub fn new(options: &JsValue) -> Result<Marker, JsValue>;

        #[wasm_bindgen(method, js_name = setLngLat)]
        pub fn set_lng_lat(this: &Marker, lng_lat: &JsValue) -> Marker;

        #[wasm_bindgen(method, js_name = addTo)]
        pub fn add_to(this: &Marker, map: &Map) -> Marker;

        #[wasm_bindgen(js_name = GeoJSONSource)]
        pub type GeoJsonSourceHandle;

        #[wasm_bindgen(method, catch, js_name = setData)]
        pub fn set_data(this: &GeoJsonSourceHandle, data: &JsValue) -> Result<(), JsValue>;
    }
}

/// Converts a Rust value into a plain JS object.
pub(crate) fn to_js<T: Serialize + ?Sized>(value: &T) -> Result<JsValue, MapError> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|e| MapError::Serialization(e.to_string()))
}

/// Extracts the message of a thrown JS value.
pub(crate) fn js_error(error: JsValue) -> MapError {
    let message = match error.dyn_ref::<js_sys::Error>() {
        Some(e) => String::from(e.message()),
        None => error.as_string().unwrap_or_else(|| format!("{:?}", error)),
    };
    MapError::Js(message)
}

fn is_present(value: &JsValue) -> bool {
    !value.is_undefined() && !value.is_null()
}

/// Properties of the first feature of a map mouse event.
fn first_feature_properties(event: &JsValue) -> Option<Value> {
    let features = js_sys::Reflect::get(event, &JsValue::from_str("features")).ok()?;
    if !js_sys::Array::is_array(&features) {
        return None;
    }
    let first = js_sys::Array::from(&features).get(0);
    if !is_present(&first) {
        return None;
    }
    let properties = js_sys::Reflect::get(&first, &JsValue::from_str("properties")).ok()?;
    serde_wasm_bindgen::from_value(properties).ok()
}

/// A `mapboxgl.Map` instance.
#[derive(Debug, Clone)]
pub struct MapboxMap {
    inner: sys::Map,
}

impl MapboxMap {
    /// Wraps a map created by JS code. Fails on `undefined` and `null`.
    pub fn from_js(value: JsValue) -> Result<Self, MapError> {
        let map = is_present(&value).then(|| Self {
            inner: value.unchecked_into(),
        });
        require_map(map)
    }

    pub fn as_js(&self) -> &JsValue {
        self.inner.as_ref()
    }

    /// Set of `"<event>:<layer>"` keys subscribed through this crate, kept on
    /// the JS map object so every wrapper of the same map sees it.
    fn listener_registry(&self) -> Option<js_sys::Set> {
        let key = JsValue::from_str(LISTENER_REGISTRY_KEY);
        let existing = js_sys::Reflect::get(self.as_js(), &key).ok()?;
        if let Ok(set) = existing.dyn_into::<js_sys::Set>() {
            return Some(set);
        }
        let set = js_sys::Set::new(&JsValue::UNDEFINED);
        js_sys::Reflect::set(self.as_js(), &key, &set).ok()?;
        Some(set)
    }

    fn subscribe(&self, event: MapEvent, layer_id: &str, listener: &js_sys::Function) {
        self.inner.on_layer(event.as_str(), layer_id, listener);
        if let Some(registry) = self.listener_registry() {
            registry.add(&JsValue::from_str(&listener_key(event, layer_id)));
        }
    }
}

const LISTENER_REGISTRY_KEY: &str = "__mapboxLayersListeners";

fn listener_key(event: MapEvent, layer_id: &str) -> String {
    format!("{}:{}", event.as_str(), layer_id)
}

/// A `mapboxgl.Marker` placed on a map.
#[derive(Debug, Clone)]
pub struct MapboxMarker {
    inner: sys::Marker,
}

impl MapboxMarker {
    pub fn as_js(&self) -> &JsValue {
        self.inner.as_ref()
    }
}

impl MapHandle for MapboxMap {
    type Image = JsValue;
    type Marker = MapboxMarker;

    fn set_access_token(token: &str) -> Result<(), MapError> {
        let namespace = js_sys::Reflect::get(&js_sys::global(), &JsValue::from_str("mapboxgl"))
            .map_err(js_error)?;
        if !is_present(&namespace) {
            return Err(MapError::Js("mapboxgl is not loaded".to_string()));
        }
        js_sys::Reflect::set(
            &namespace,
            &JsValue::from_str("accessToken"),
            &JsValue::from_str(token),
        )
        .map_err(js_error)?;
        Ok(())
    }

    fn create(config: &MapConfig) -> Result<Self, MapError> {
        let options = to_js(&config.to_map_options())?;
        let inner = sys::Map::new(&options).map_err(js_error)?;
        Ok(Self { inner })
    }

    fn once_loaded(&self, handler: Box<dyn FnOnce()>) {
        let listener = Closure::once_into_js(move || handler());
        self.inner.once("load", listener.unchecked_ref());
    }

    fn resize(&self) {
        self.inner.resize();
    }

    fn has_source(&self, id: &str) -> bool {
        is_present(&self.inner.get_source(id))
    }

    fn add_source(&self, id: &str, source: &GeoJsonSource) -> Result<(), MapError> {
        if self.has_source(id) {
            return Err(MapError::SourceAlreadyExists(id.to_string()));
        }
        self.inner
            .add_source(id, &to_js(source)?)
            .map_err(js_error)
    }

    fn set_source_data(&self, id: &str, data: &Value) -> Result<(), MapError> {
        let source = self.inner.get_source(id);
        if !is_present(&source) {
            return Err(MapError::Js(format!("There is no source with ID \"{}\"", id)));
        }
        source
            .unchecked_into::<sys::GeoJsonSourceHandle>()
            .set_data(&to_js(data)?)
            .map_err(js_error)
    }

    fn remove_source(&self, id: &str) -> Result<(), MapError> {
        self.inner.remove_source(id).map_err(js_error)
    }

    fn has_layer(&self, id: &str) -> bool {
        is_present(&self.inner.get_layer(id))
    }

    fn add_layer(&self, layer: &LayerSpec) -> Result<(), MapError> {
        if self.has_layer(&layer.id) {
            return Err(MapError::LayerAlreadyExists(layer.id.clone()));
        }
        self.inner.add_layer(&to_js(layer)?).map_err(js_error)
    }

    fn remove_layer(&self, id: &str) -> Result<(), MapError> {
        self.inner.remove_layer(id).map_err(js_error)
    }

    fn has_image(&self, name: &str) -> bool {
        self.inner.has_image(name)
    }

    fn load_image(&self, path: &str, done: ImageLoadCallback<JsValue>) {
        let callback = Closure::once_into_js(move |error: JsValue, image: JsValue| {
            if is_present(&error) {
                done(Err(js_error(error)));
            } else if !is_present(&image) {
                done(Err(MapError::Js("image decoded to nothing".to_string())));
            } else {
                done(Ok(image));
            }
        });
        self.inner.load_image(path, callback.unchecked_ref());
    }

    fn add_image(&self, name: &str, image: JsValue, sdf: bool) -> Result<(), MapError> {
        let options = to_js(&json!({ "sdf": sdf }))?;
        self.inner
            .add_image(name, &image, &options)
            .map_err(js_error)
    }

    fn on_layer(&self, event: MapEvent, layer_id: &str, mut handler: LayerEventHandler) {
        let listener = Closure::<dyn FnMut(JsValue)>::new(move |e: JsValue| {
            handler(first_feature_properties(&e));
        });
        self.subscribe(event, layer_id, listener.as_ref().unchecked_ref());
        // Lives as long as the map keeps the subscription.
        listener.forget();
    }

    fn has_layer_listener(&self, event: MapEvent, layer_id: &str) -> bool {
        self.listener_registry()
            .map(|registry| registry.has(&JsValue::from_str(&listener_key(event, layer_id))))
            .unwrap_or(false)
    }

    fn show_pointer_on_hover(&self, layer_id: &str) {
        for (event, cursor) in [
            (MapEvent::MouseEnter, POINTER_CURSOR),
            (MapEvent::MouseLeave, ""),
        ] {
            let canvas = self.inner.get_canvas();
            let listener = Closure::<dyn FnMut(JsValue)>::new(move |_: JsValue| {
                if let Err(e) = canvas.style().set_property("cursor", cursor) {
                    log::warn!("Failed to set map cursor: {:?}", e);
                }
            });
            self.subscribe(event, layer_id, listener.as_ref().unchecked_ref());
            listener.forget();
        }
    }

    fn add_marker(
        &self,
        position: [f64; 2],
        options: &SingleMarkerOptions,
    ) -> Result<MapboxMarker, MapError> {
        let marker = sys::Marker::new(&to_js(options)?).map_err(js_error)?;
        let inner = marker
            .set_lng_lat(&to_js(&position)?)
            .add_to(&self.inner);
        Ok(MapboxMarker { inner })
    }
}
