use super::attach_click_handlers;
use crate::error::MapError;
use crate::features::{polygon_props_to_features, FeatureCollection};
use crate::map::MapHandle;
use crate::style::{
    polygon_fill_layer, polygon_fill_layer_id, polygon_outline_layer, polygon_outline_layer_id,
    GeoJsonSource, POLYGON_SOURCE_BUFFER,
};
use crate::types::{DefaultSources, RenderPolygonsOptions};

/// Renders a group of polygons as a fill layer plus an outline layer.
///
/// Fails with [`MapError::SourceAlreadyExists`] if the source id is taken;
/// remove the group first to redraw it. When `on_polygon_click` is set it
/// receives the clicked polygon's properties.
pub fn render_polygons_to_map<M: MapHandle>(
    map: &M,
    options: &RenderPolygonsOptions,
) -> Result<(), MapError> {
    let source_id = options.source_id();
    if map.has_source(source_id) {
        return Err(MapError::SourceAlreadyExists(source_id.to_string()));
    }

    let features = polygon_props_to_features(&options.polygons)?;
    let source = GeoJsonSource::new(&FeatureCollection::new(features))?
        .with_buffer(POLYGON_SOURCE_BUFFER);

    map.add_source(source_id, &source)?;
    map.add_layer(&polygon_fill_layer(source_id))?;
    map.add_layer(&polygon_outline_layer(source_id))?;

    log::info!(
        "Rendered {} polygons to source {}",
        options.polygons.len(),
        source_id
    );

    if let Some(handler) = &options.on_polygon_click {
        attach_click_handlers(map, &polygon_fill_layer_id(source_id), handler.clone());
    }

    Ok(())
}

/// Removes a polygon group's layers and source. Does nothing when the
/// source is not on the map. `None` targets the default `"Polygons"` source.
pub fn remove_polygons_from_map<M: MapHandle>(
    map: &M,
    source_id: Option<&str>,
) -> Result<(), MapError> {
    let source_id = source_id.unwrap_or(DefaultSources::Polygons.as_str());
    if !map.has_source(source_id) {
        return Ok(());
    }

    for layer_id in [
        polygon_fill_layer_id(source_id),
        polygon_outline_layer_id(source_id),
    ] {
        if map.has_layer(&layer_id) {
            map.remove_layer(&layer_id)?;
        }
    }
    map.remove_source(source_id)?;

    log::info!("Removed polygon source {}", source_id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::{HeadlessMap, MapEvent};
    use crate::types::{Coords, PolygonProp};
    use serde_json::{json, Value};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn polygon(id: &str) -> PolygonProp {
        PolygonProp::new(
            id,
            vec![
                Coords::new(32.08, 34.78),
                Coords::new(32.09, 34.79),
                Coords::new(32.07, 34.80),
            ],
        )
        .with_properties(json!({ "name": id }))
    }

    #[test]
    fn test_render_creates_source_and_layers() {
        let map = HeadlessMap::default();
        let options = RenderPolygonsOptions::new(vec![polygon("a"), polygon("b")]);
        render_polygons_to_map(&map, &options).unwrap();

        assert_eq!(map.layer_ids(), vec!["Polygons_fill", "Polygons_outline"]);
        let source = map.source("Polygons").unwrap();
        assert_eq!(source.buffer, Some(5));
        let features = source.data["features"].as_array().unwrap();
        assert_eq!(features.len(), 2);
        assert_eq!(
            features[0]["geometry"]["coordinates"][0]
                .as_array()
                .unwrap()
                .len(),
            4
        );
        // no click handler, no subscriptions
        assert_eq!(map.handler_count(MapEvent::Click, "Polygons_fill"), 0);
    }

    #[test]
    fn test_duplicate_source_is_rejected() {
        let map = HeadlessMap::default();
        let options = RenderPolygonsOptions::new(vec![polygon("a")]).with_source_id("zones");
        render_polygons_to_map(&map, &options).unwrap();

        assert_eq!(
            render_polygons_to_map(&map, &options),
            Err(MapError::SourceAlreadyExists("zones".into()))
        );
        assert_eq!(map.layer_ids().len(), 2);
    }

    #[test]
    fn test_invalid_polygon_leaves_map_untouched() {
        let map = HeadlessMap::default();
        let mut short = polygon("short");
        short.path.truncate(2);
        let options = RenderPolygonsOptions::new(vec![polygon("a"), short]);

        assert!(matches!(
            render_polygons_to_map(&map, &options),
            Err(MapError::InvalidPolygon { .. })
        ));
        assert!(map.source_ids().is_empty());
    }

    #[test]
    fn test_click_and_hover() {
        let map = HeadlessMap::default();
        let clicked = Rc::new(RefCell::new(Vec::<Value>::new()));
        let sink = clicked.clone();
        let options = RenderPolygonsOptions::new(vec![polygon("a")])
            .on_polygon_click(move |props| sink.borrow_mut().push(props.clone()));
        render_polygons_to_map(&map, &options).unwrap();

        map.fire(MapEvent::MouseEnter, "Polygons_fill", None);
        assert_eq!(map.cursor(), "pointer");
        map.fire(MapEvent::Click, "Polygons_fill", Some(json!({ "name": "a" })));
        map.fire(MapEvent::Click, "Polygons_fill", None);
        map.fire(MapEvent::MouseLeave, "Polygons_fill", None);
        assert_eq!(map.cursor(), "");

        assert_eq!(*clicked.borrow(), vec![json!({ "name": "a" })]);
    }

    #[test]
    fn test_remove() {
        let map = HeadlessMap::default();
        render_polygons_to_map(&map, &RenderPolygonsOptions::new(vec![polygon("a")])).unwrap();

        remove_polygons_from_map(&map, None).unwrap();
        assert!(map.layer_ids().is_empty());
        assert!(!map.has_source("Polygons"));

        // already gone
        remove_polygons_from_map(&map, None).unwrap();
        remove_polygons_from_map(&map, Some("missing")).unwrap();
    }
}
