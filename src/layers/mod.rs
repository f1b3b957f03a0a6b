//! Marker and polygon layer helpers.

mod markers;
mod polygons;

pub use markers::{remove_markers_from_map, render_markers_to_map, set_markers_to_existing_layer};
pub use polygons::{remove_polygons_from_map, render_polygons_to_map};

use crate::map::{MapEvent, MapHandle};
use crate::types::ClickHandler;
use serde_json::Value;

/// Wires `handler` to clicks on `layer_id` and shows a pointer cursor while
/// hovering the layer. Layers that already have a click subscription are
/// left alone.
fn attach_click_handlers<M: MapHandle>(map: &M, layer_id: &str, handler: ClickHandler) {
    if map.has_layer_listener(MapEvent::Click, layer_id) {
        log::debug!("Layer {} already has a click handler", layer_id);
        return;
    }

    map.on_layer(
        MapEvent::Click,
        layer_id,
        Box::new(move |properties: Option<Value>| {
            if let Some(properties) = properties {
                handler(&properties);
            }
        }),
    );
    map.show_pointer_on_hover(layer_id);
}
