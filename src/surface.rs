use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::{Coordinates, MapConfig, Role, RouteResult};

pub const DEFAULT_ZOOM: u8 = 13;
pub const DEFAULT_TILE_URL: &str = "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png";
pub const DEFAULT_ATTRIBUTION: &str =
    "&copy; <a href=\"https://www.openstreetmap.org/copyright\">OpenStreetMap</a> contributors";

/// Opaque reference to a marker on the surface. Deliberately not `Clone`:
/// a handle is given back to the surface exactly once.
#[derive(Debug, PartialEq, Eq)]
pub struct MarkerHandle(Uuid);

/// Opaque reference to a drawn polyline. Same single-release rule as markers.
#[derive(Debug, PartialEq, Eq)]
pub struct PathHandle(Uuid);

impl MarkerHandle {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn id(&self) -> Uuid {
        self.0
    }
}

impl PathHandle {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn id(&self) -> Uuid {
        self.0
    }
}

pub type ClickHandler = Box<dyn FnMut(Coordinates) + Send>;
pub type MoveHandler = Box<dyn FnMut(Role, Coordinates) + Send>;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TileLayer {
    pub url_template: String,
    pub attribution: String,
}

impl Default for TileLayer {
    fn default() -> Self {
        Self {
            url_template: DEFAULT_TILE_URL.into(),
            attribution: DEFAULT_ATTRIBUTION.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PathStyle {
    pub color: String,
    pub weight: u32,
}

impl Default for PathStyle {
    fn default() -> Self {
        Self {
            color: "blue".into(),
            weight: 5,
        }
    }
}

/// Display options that do not come from the backend.
#[derive(Clone, Debug, PartialEq)]
pub struct MapOptions {
    pub zoom: u8,
    pub tiles: TileLayer,
}

impl Default for MapOptions {
    fn default() -> Self {
        Self {
            zoom: DEFAULT_ZOOM,
            tiles: TileLayer::default(),
        }
    }
}

/// Everything the surface needs to show the initial map.
#[derive(Clone, Debug, PartialEq)]
pub struct MapView {
    pub title: String,
    pub center: Coordinates,
    pub zoom: u8,
    pub tiles: TileLayer,
}

impl MapView {
    pub fn new(config: &MapConfig, options: &MapOptions) -> Self {
        Self {
            title: config.title(),
            center: config.center,
            zoom: options.zoom,
            tiles: options.tiles.clone(),
        }
    }
}

/// Facade over whatever renders the map. Implementations execute commands;
/// they never decide anything about the selection workflow.
pub trait MapSurface {
    fn init(&mut self, view: &MapView);

    /// Places a draggable marker labeled after `role`.
    fn place_marker(&mut self, at: Coordinates, role: Role) -> MarkerHandle;

    fn remove_marker(&mut self, handle: MarkerHandle);

    /// Draws a new polyline. Earlier paths are left alone; clear them first.
    fn draw_path(&mut self, route: &RouteResult) -> PathHandle;

    fn clear_path(&mut self, handle: PathHandle);

    fn fit_to_path(&mut self, handle: &PathHandle);

    /// Installs the click handler, replacing any previous one.
    fn on_map_clicked(&mut self, handler: ClickHandler);

    /// Installs the marker drag-end handler, replacing any previous one.
    fn on_marker_moved(&mut self, handler: MoveHandler);
}
