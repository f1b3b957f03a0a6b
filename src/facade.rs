//! Map setup and single DOM markers.

use crate::error::MapError;
use crate::map::{MapConfig, MapHandle};
use crate::types::{Coords, RenderMapOptions, SingleMarkerOptions};

/// Sets the access token used by every map created afterwards.
pub fn set_token<M: MapHandle>(token: &str) -> Result<(), MapError> {
    M::set_access_token(token)
}

/// Creates a map inside the element `container_id`.
///
/// Unset options fall back to the streets style, zoom 15 and a `(0, 0)`
/// center. The map resizes itself once its first load completes.
pub fn render_map<M: MapHandle>(
    container_id: &str,
    options: Option<&RenderMapOptions>,
) -> Result<M, MapError> {
    let config = MapConfig::from_options(container_id, options);
    let map = M::create(&config)?;

    let target = map.clone();
    map.once_loaded(Box::new(move || target.resize()));

    log::info!(
        "Created map in #{} (zoom {}, center {}, {})",
        config.container,
        config.zoom,
        config.center.lat,
        config.center.lng
    );
    Ok(map)
}

/// Places one DOM marker on the map.
///
/// Suited to a handful of markers; large sets render faster through
/// [`crate::render_markers_to_map`].
pub fn render_single_marker<M: MapHandle>(
    map: &M,
    coords: Coords,
    options: Option<&SingleMarkerOptions>,
) -> Result<M::Marker, MapError> {
    let default_options = SingleMarkerOptions::default();
    map.add_marker(coords.to_position(), options.unwrap_or(&default_options))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::{HeadlessMap, DEFAULT_MAP_STYLE};

    #[test]
    fn test_set_token() {
        set_token::<HeadlessMap>("pk.test-token").unwrap();
        assert_eq!(HeadlessMap::access_token().as_deref(), Some("pk.test-token"));
    }

    #[test]
    fn test_render_map_resizes_on_load() {
        let options = RenderMapOptions {
            center: Some(Coords::new(37.37, -122.04)),
            map_style: None,
            zoom: Some(10.0),
        };
        let map: HeadlessMap = render_map("map", Some(&options)).unwrap();

        let config = map.config();
        assert_eq!(config.style, DEFAULT_MAP_STYLE);
        assert_eq!(config.zoom, 10.0);
        assert_eq!(map.resize_count(), 0);

        map.fire_load();
        assert_eq!(map.resize_count(), 1);
        // load fires once
        map.fire_load();
        assert_eq!(map.resize_count(), 1);
    }

    #[test]
    fn test_render_map_error() {
        assert!(render_map::<HeadlessMap>("", None).is_err());
    }

    #[test]
    fn test_single_marker() {
        let map = HeadlessMap::default();
        let options = SingleMarkerOptions {
            color: Some("#ff0000".into()),
            ..Default::default()
        };
        let marker = render_single_marker(&map, Coords::new(1.5, 2.5), Some(&options)).unwrap();
        assert_eq!(marker.position, [2.5, 1.5]);

        render_single_marker(&map, Coords::new(0.0, 0.0), None).unwrap();
        let markers = map.markers();
        assert_eq!(markers.len(), 2);
        assert_eq!(markers[0].options.color.as_deref(), Some("#ff0000"));
        assert_eq!(markers[1].options, SingleMarkerOptions::default());
    }
}
