use super::attach_click_handlers;
use crate::error::MapError;
use crate::features::{
    extract_marker_icons, marker_props_to_features, marker_props_to_features_with_defaults,
    FeatureCollection,
};
use crate::images::load_images_to_map_with;
use crate::map::MapHandle;
use crate::style::{marker_circle_layer, marker_layer_id, marker_symbol_layer, GeoJsonSource};
use crate::types::{DefaultSources, MarkersOptions};

/// Renders a group of markers as one layer.
///
/// If no marker declares an icon the layer draws circles. Otherwise every
/// declared icon is loaded first and the layer draws those icons; it is added
/// once all loads have settled.
///
/// When the source already exists its data is replaced instead, through
/// [`set_markers_to_existing_layer`]. `on_point_click` is attached on either
/// path unless the layer already has a click subscription.
pub fn render_markers_to_map<M: MapHandle>(
    map: &M,
    options: &MarkersOptions,
) -> Result<(), MapError> {
    let source_id = options.source_id();
    if map.has_source(source_id) {
        set_markers_to_existing_layer(map, options)?;
    } else {
        add_marker_layer(map, options)?;
    }

    if let Some(handler) = &options.on_point_click {
        attach_click_handlers(map, &marker_layer_id(source_id), handler.clone());
    }

    Ok(())
}

fn add_marker_layer<M: MapHandle>(map: &M, options: &MarkersOptions) -> Result<(), MapError> {
    let source_id = options.source_id();
    let icons = extract_marker_icons(&options.markers);
    let collection = FeatureCollection::new(marker_props_to_features(&options.markers));
    map.add_source(source_id, &GeoJsonSource::new(&collection)?)?;

    if icons.is_empty() {
        map.add_layer(&marker_circle_layer(source_id))?;
        log::info!(
            "Rendered {} markers to source {}",
            options.markers.len(),
            source_id
        );
        return Ok(());
    }

    let target = map.clone();
    let source = source_id.to_string();
    let count = options.markers.len();
    load_images_to_map_with(map, &icons, move |summary| {
        if !summary.failed.is_empty() {
            log::warn!(
                "Markers of source {} are missing icons: {}",
                source,
                summary.failed_names().join(", ")
            );
        }
        if !target.has_source(&source) {
            log::debug!("Source {} was removed while its icons loaded", source);
            return;
        }
        // A later render of the same source may have won the race.
        if target.has_layer(&marker_layer_id(&source)) {
            log::debug!("Marker layer for {} already present", source);
            return;
        }
        match target.add_layer(&marker_symbol_layer(&source)) {
            Ok(()) => log::info!("Rendered {} icon markers to source {}", count, source),
            Err(e) => log::error!("Failed to add marker layer for {}: {}", source, e),
        }
    });

    Ok(())
}

/// Replaces the markers of an existing source, substituting defaults for
/// unset icon fields. Falls back to [`render_markers_to_map`] when the
/// source does not exist yet.
///
/// Icons declared by the new markers are loaded in the background.
pub fn set_markers_to_existing_layer<M: MapHandle>(
    map: &M,
    options: &MarkersOptions,
) -> Result<(), MapError> {
    let source_id = options.source_id();
    if !map.has_source(source_id) {
        return render_markers_to_map(map, options);
    }

    let icons = extract_marker_icons(&options.markers);
    if !icons.is_empty() {
        load_images_to_map_with(map, &icons, |_| {});
    }

    let collection =
        FeatureCollection::new(marker_props_to_features_with_defaults(&options.markers));
    map.set_source_data(source_id, &collection.to_value()?)?;

    log::debug!(
        "Updated source {} with {} markers",
        source_id,
        options.markers.len()
    );
    Ok(())
}

/// Removes a marker group's layer and source. Does nothing when the source
/// is not on the map. `None` targets the default `"Markers"` source.
pub fn remove_markers_from_map<M: MapHandle>(
    map: &M,
    source_id: Option<&str>,
) -> Result<(), MapError> {
    let source_id = source_id.unwrap_or(DefaultSources::Markers.as_str());
    if !map.has_source(source_id) {
        return Ok(());
    }

    // The layer is still missing while icons are loading.
    let layer_id = marker_layer_id(source_id);
    if map.has_layer(&layer_id) {
        map.remove_layer(&layer_id)?;
    }
    map.remove_source(source_id)?;

    log::info!("Removed marker source {}", source_id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::{HeadlessMap, MapEvent};
    use crate::style::LayerKind;
    use crate::types::{Coords, MarkerIcon, MarkerPoint};
    use serde_json::{json, Value};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn plain(id: &str) -> MarkerPoint {
        MarkerPoint::new(id, Coords::new(37.37, -122.04))
    }

    fn with_icon(id: &str) -> MarkerPoint {
        plain(id)
            .with_icon(MarkerIcon {
                name: "marker".into(),
                path: "./assets/marker.webp".into(),
                dynamic_color: false,
            })
            .with_icon_size(0.1)
    }

    fn features(map: &HeadlessMap, source_id: &str) -> Vec<Value> {
        map.source(source_id).unwrap().data["features"]
            .as_array()
            .unwrap()
            .clone()
    }

    #[test]
    fn test_plain_markers_use_circles() {
        let map = HeadlessMap::default();
        render_markers_to_map(&map, &MarkersOptions::new(vec![plain("1"), plain("2")])).unwrap();

        let layer = map.layer("Markers_marker-point").unwrap();
        assert_eq!(layer.kind, LayerKind::Circle);
        assert_eq!(features(&map, "Markers").len(), 2);
        assert_eq!(map.pending_image_loads(), 0);
    }

    #[test]
    fn test_icon_layer_waits_for_images() {
        let map = HeadlessMap::default();
        let options = MarkersOptions::new(vec![with_icon("1"), with_icon("2"), with_icon("3")]);
        render_markers_to_map(&map, &options).unwrap();

        // one load per distinct icon, layer not there yet
        assert_eq!(map.pending_image_loads(), 1);
        assert!(map.has_source("Markers"));
        assert!(map.layer("Markers_marker-point").is_none());

        map.complete_image_loads();
        let layer = map.layer("Markers_marker-point").unwrap();
        assert_eq!(layer.kind, LayerKind::Symbol);
        assert!(map.has_image("marker"));
    }

    #[test]
    fn test_failed_icon_still_adds_layer() {
        let map = HeadlessMap::default();
        map.fail_image("./assets/marker.webp");
        render_markers_to_map(&map, &MarkersOptions::new(vec![with_icon("1")])).unwrap();

        map.complete_image_loads();
        assert!(map.has_layer("Markers_marker-point"));
        assert!(!map.has_image("marker"));
    }

    #[test]
    fn test_second_render_updates_data() {
        let map = HeadlessMap::default();
        render_markers_to_map(&map, &MarkersOptions::new(vec![plain("1")])).unwrap();
        render_markers_to_map(&map, &MarkersOptions::new(vec![plain("2"), plain("3")])).unwrap();

        assert_eq!(map.layer_ids(), vec!["Markers_marker-point"]);
        let features = features(&map, "Markers");
        assert_eq!(features.len(), 2);
        assert_eq!(features[0]["properties"]["id"], json!("2"));
        assert_eq!(features[0]["properties"]["icon"], json!("default"));
        assert_eq!(features[0]["properties"]["iconColor"], json!("#000"));
    }

    #[test]
    fn test_set_markers_falls_back_to_render() {
        let map = HeadlessMap::default();
        let options = MarkersOptions::new(vec![plain("1")]).with_source_id("stores");
        set_markers_to_existing_layer(&map, &options).unwrap();

        assert!(map.has_layer("stores_marker-point"));
        // first render keeps unset fields out
        let features = features(&map, "stores");
        assert!(features[0]["properties"].get("icon").is_none());
    }

    #[test]
    fn test_update_loads_new_icons() {
        let map = HeadlessMap::default();
        render_markers_to_map(&map, &MarkersOptions::new(vec![plain("1")])).unwrap();
        set_markers_to_existing_layer(&map, &MarkersOptions::new(vec![with_icon("2")])).unwrap();

        assert_eq!(map.pending_image_loads(), 1);
        map.complete_image_loads();
        assert!(map.has_image("marker"));
        assert_eq!(map.layer_ids().len(), 1);
    }

    #[test]
    fn test_click_handlers_attached_once() {
        let map = HeadlessMap::default();
        let clicked = Rc::new(RefCell::new(Vec::<Value>::new()));
        let sink = clicked.clone();
        let options = MarkersOptions::new(vec![plain("1")])
            .on_point_click(move |props| sink.borrow_mut().push(props.clone()));

        render_markers_to_map(&map, &options).unwrap();
        render_markers_to_map(&map, &options).unwrap();
        assert_eq!(map.handler_count(MapEvent::Click, "Markers_marker-point"), 1);

        map.fire(
            MapEvent::Click,
            "Markers_marker-point",
            Some(json!({ "id": "1" })),
        );
        map.fire(MapEvent::MouseEnter, "Markers_marker-point", None);
        assert_eq!(map.cursor(), "pointer");
        assert_eq!(*clicked.borrow(), vec![json!({ "id": "1" })]);
    }

    #[test]
    fn test_click_handler_added_on_later_render() {
        let map = HeadlessMap::default();
        render_markers_to_map(&map, &MarkersOptions::new(vec![plain("1")])).unwrap();
        assert_eq!(map.handler_count(MapEvent::Click, "Markers_marker-point"), 0);

        let hits = Rc::new(RefCell::new(0));
        let sink = hits.clone();
        let options = MarkersOptions::new(vec![plain("2")])
            .on_point_click(move |_| *sink.borrow_mut() += 1);
        render_markers_to_map(&map, &options).unwrap();

        map.fire(
            MapEvent::Click,
            "Markers_marker-point",
            Some(json!({ "id": "2" })),
        );
        assert_eq!(*hits.borrow(), 1);
        assert_eq!(map.handler_count(MapEvent::Click, "Markers_marker-point"), 1);
    }

    #[test]
    fn test_rerender_while_icons_load_adds_one_layer() {
        let map = HeadlessMap::default();
        let options = MarkersOptions::new(vec![with_icon("1")]);
        render_markers_to_map(&map, &options).unwrap();
        remove_markers_from_map(&map, None).unwrap();
        render_markers_to_map(&map, &options).unwrap();
        assert_eq!(map.pending_image_loads(), 2);

        map.complete_image_loads();
        assert_eq!(map.layer_ids(), vec!["Markers_marker-point"]);
        assert!(map.has_image("marker"));
    }

    #[test]
    fn test_remove_while_icons_load() {
        let map = HeadlessMap::default();
        render_markers_to_map(&map, &MarkersOptions::new(vec![with_icon("1")])).unwrap();

        remove_markers_from_map(&map, None).unwrap();
        assert!(!map.has_source("Markers"));

        map.complete_image_loads();
        assert!(map.layer_ids().is_empty());
    }

    #[test]
    fn test_remove() {
        let map = HeadlessMap::default();
        let options = MarkersOptions::new(vec![plain("1")]).with_source_id("stores");
        render_markers_to_map(&map, &options).unwrap();

        remove_markers_from_map(&map, Some("stores")).unwrap();
        assert!(map.layer_ids().is_empty());
        assert!(map.source_ids().is_empty());
        remove_markers_from_map(&map, Some("stores")).unwrap();
    }
}
