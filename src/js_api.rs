//! JavaScript exports.
//!
//! Mirrors the Rust API for pages that drive Mapbox GL from JS: maps are
//! passed as raw `mapboxgl.Map` objects, options as plain objects with
//! camelCase keys and callbacks as functions. Errors are thrown as `Error`.

use crate::error::MapError;
use crate::map::MapboxMap;
use crate::types::{
    ClickHandler, Coords, IconDictionary, MarkersOptions, RenderMapOptions,
    RenderPolygonsOptions, SingleMarkerOptions,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

impl From<MapError> for JsValue {
    fn from(e: MapError) -> Self {
        js_sys::Error::new(&e.to_string()).into()
    }
}

fn is_present(value: &JsValue) -> bool {
    !value.is_undefined() && !value.is_null()
}

fn from_js<T: DeserializeOwned>(value: JsValue) -> Result<T, MapError> {
    serde_wasm_bindgen::from_value(value).map_err(|e| MapError::Serialization(e.to_string()))
}

fn from_js_optional<T: DeserializeOwned>(value: JsValue) -> Result<Option<T>, MapError> {
    if is_present(&value) {
        from_js(value).map(Some)
    } else {
        Ok(None)
    }
}

/// Splits a callback out of an options object. Returns the callback and a
/// shallow copy of the options without it.
fn take_callback(options: &JsValue, key: &str) -> (Option<js_sys::Function>, JsValue) {
    if !options.is_object() {
        return (None, options.clone());
    }
    let copy = js_sys::Object::assign(&js_sys::Object::new(), options.unchecked_ref());
    let key = JsValue::from_str(key);
    let callback = js_sys::Reflect::get(&copy, &key)
        .ok()
        .and_then(|f| f.dyn_into::<js_sys::Function>().ok());
    let _ = js_sys::Reflect::delete_property(&copy, &key);
    (callback, copy.into())
}

fn click_handler(callback: js_sys::Function) -> ClickHandler {
    Rc::new(move |properties: &Value| {
        let arg = match crate::map::to_js(properties) {
            Ok(arg) => arg,
            Err(e) => {
                log::error!("Failed to pass feature properties to JS: {}", e);
                return;
            }
        };
        if let Err(e) = callback.call1(&JsValue::NULL, &arg) {
            log::error!("Click handler threw: {:?}", e);
        }
    })
}

#[wasm_bindgen(js_name = setToken)]
pub fn set_token(token: &str) -> Result<(), JsValue> {
    crate::set_token::<MapboxMap>(token)?;
    Ok(())
}

#[wasm_bindgen(js_name = renderMap)]
pub fn render_map(container_id: &str, options: JsValue) -> Result<JsValue, JsValue> {
    let options: Option<RenderMapOptions> = from_js_optional(options)?;
    let map: MapboxMap = crate::render_map(container_id, options.as_ref())?;
    Ok(map.as_js().clone())
}

/// Resolves to `true` once every icon has loaded or failed, `false` if the
/// loads were abandoned.
#[wasm_bindgen(js_name = loadImagesToMap)]
pub fn load_images_to_map(map: JsValue, images: JsValue) -> Result<js_sys::Promise, JsValue> {
    let map = MapboxMap::from_js(map)?;
    let images: IconDictionary = from_js_optional(images)?.unwrap_or_default();
    let pending = crate::load_images_to_map(&map, &images);
    Ok(wasm_bindgen_futures::future_to_promise(async move {
        let summary = pending.await;
        Ok(JsValue::from_bool(summary.is_some()))
    }))
}

#[wasm_bindgen(js_name = renderPolygonsToMap)]
pub fn render_polygons_to_map(map: JsValue, options: JsValue) -> Result<(), JsValue> {
    let map = MapboxMap::from_js(map)?;
    let (callback, options) = take_callback(&options, "onPolygonClick");
    let mut options = RenderPolygonsOptions::from_json(from_js(options)?)?;
    options.on_polygon_click = callback.map(click_handler);

    crate::render_polygons_to_map(&map, &options)?;
    Ok(())
}

#[wasm_bindgen(js_name = removePolygonsFromMap)]
pub fn remove_polygons_from_map(map: JsValue, source_id: Option<String>) -> Result<(), JsValue> {
    let map = MapboxMap::from_js(map)?;
    crate::remove_polygons_from_map(&map, source_id.as_deref())?;
    Ok(())
}

fn markers_options(options: JsValue) -> Result<MarkersOptions, MapError> {
    let (callback, options) = take_callback(&options, "onPointClick");
    let mut options = MarkersOptions::from_json(from_js(options)?)?;
    options.on_point_click = callback.map(click_handler);
    Ok(options)
}

#[wasm_bindgen(js_name = renderMarkersToMap)]
pub fn render_markers_to_map(map: JsValue, options: JsValue) -> Result<(), JsValue> {
    let map = MapboxMap::from_js(map)?;
    crate::render_markers_to_map(&map, &markers_options(options)?)?;
    Ok(())
}

#[wasm_bindgen(js_name = setMarkersToExistingLayer)]
pub fn set_markers_to_existing_layer(map: JsValue, options: JsValue) -> Result<(), JsValue> {
    let map = MapboxMap::from_js(map)?;
    crate::set_markers_to_existing_layer(&map, &markers_options(options)?)?;
    Ok(())
}

#[wasm_bindgen(js_name = removeMarkersFromMap)]
pub fn remove_markers_from_map(map: JsValue, source_id: Option<String>) -> Result<(), JsValue> {
    let map = MapboxMap::from_js(map)?;
    crate::remove_markers_from_map(&map, source_id.as_deref())?;
    Ok(())
}

/// Returns the created `mapboxgl.Marker`.
#[wasm_bindgen(js_name = renderSingleMarker)]
pub fn render_single_marker(
    map: JsValue,
    coords: JsValue,
    options: JsValue,
) -> Result<JsValue, JsValue> {
    let map = MapboxMap::from_js(map)?;
    let coords: Coords = from_js(coords)?;
    let options: Option<SingleMarkerOptions> = from_js_optional(options)?;
    let marker = crate::render_single_marker(&map, coords, options.as_ref())?;
    Ok(marker.as_js().clone())
}
