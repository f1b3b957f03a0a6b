//! Error type shared by every map helper.

/// Errors that can occur while shaping data for, or talking to, the map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MapError {
    /// No map instance was supplied.
    MapUndefined,
    /// The polygon options carried no polygon list.
    PolygonsUndefined,
    /// A source with this id is already registered on the map.
    SourceAlreadyExists(String),
    /// A layer with this id is already registered on the map.
    LayerAlreadyExists(String),
    /// A polygon path has fewer than three coordinates.
    InvalidPolygon { id: String, points: usize },
    /// An icon image could not be fetched or decoded.
    ImageLoad { name: String, message: String },
    /// The mapping library raised an exception.
    Js(String),
    /// Converting data to or from the library's format failed.
    Serialization(String),
}

impl std::fmt::Display for MapError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MapError::MapUndefined => write!(f, "Map is not defined"),
            MapError::PolygonsUndefined => write!(f, "Polygons are not defined"),
            MapError::SourceAlreadyExists(id) => {
                write!(f, "There is already a source with ID \"{}\"", id)
            }
            MapError::LayerAlreadyExists(id) => {
                write!(f, "There is already a layer with ID \"{}\"", id)
            }
            MapError::InvalidPolygon { id, points } => write!(
                f,
                "Polygon \"{}\" needs at least three coordinates, got {}",
                id, points
            ),
            MapError::ImageLoad { name, message } => {
                write!(f, "Failed to load image \"{}\": {}", name, message)
            }
            MapError::Js(msg) => write!(f, "Mapbox error: {}", msg),
            MapError::Serialization(msg) => write!(f, "Serialization error: {}", msg),
        }
    }
}

impl std::error::Error for MapError {}

impl From<serde_json::Error> for MapError {
    fn from(e: serde_json::Error) -> Self {
        MapError::Serialization(e.to_string())
    }
}
