use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use geo_types::{coord, LineString, Rect};
use uuid::Uuid;

use crate::entities::{Coordinates, Role, RouteResult};
use crate::surface::{
    ClickHandler, MapSurface, MapView, MarkerHandle, MoveHandler, PathHandle, PathStyle,
};

#[derive(Clone, Debug, PartialEq)]
pub struct Marker {
    pub at: Coordinates,
    pub role: Role,
    pub draggable: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Viewport {
    Centered { center: Coordinates, zoom: u8 },
    Bounds(Rect<f64>),
}

/// What is currently on the map.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Snapshot {
    pub view: Option<MapView>,
    pub viewport: Option<Viewport>,
    pub markers: Vec<Marker>,
    pub paths: Vec<LineString<f64>>,
}

impl Snapshot {
    pub fn marker(&self, role: Role) -> Option<&Marker> {
        self.markers.iter().find(|m| m.role == role)
    }
}

#[derive(Default)]
struct State {
    view: Option<MapView>,
    viewport: Option<Viewport>,
    markers: HashMap<Uuid, Marker>,
    // insertion order, so snapshots are stable
    marker_order: Vec<Uuid>,
    paths: HashMap<Uuid, LineString<f64>>,
    path_order: Vec<Uuid>,
    style: PathStyle,
    on_click: Option<ClickHandler>,
    on_move: Option<MoveHandler>,
}

/// In-memory map surface.
///
/// Clones share the same scene, so one clone can be handed to the session
/// while another feeds user input (`click`, `drag`) and inspects what is
/// displayed.
#[derive(Clone, Default)]
pub struct Scene {
    state: Arc<Mutex<State>>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn is_initialized(&self) -> bool {
        self.lock().view.is_some()
    }

    pub fn path_style(&self) -> PathStyle {
        self.lock().style.clone()
    }

    /// Simulates the user clicking the map. Returns false when nothing is
    /// listening, e.g. before the map was initialized.
    pub fn click(&self, at: Coordinates) -> bool {
        let mut state = self.lock();

        if state.view.is_none() {
            return false;
        }

        match state.on_click.as_mut() {
            Some(handler) => {
                handler(at);
                true
            }
            None => false,
        }
    }

    /// Simulates dragging the marker for `role` and dropping it at `to`.
    pub fn drag(&self, role: Role, to: Coordinates) -> bool {
        let mut state = self.lock();

        let marker = match state.markers.values_mut().find(|m| m.role == role) {
            Some(marker) if marker.draggable => marker,
            _ => return false,
        };
        marker.at = to;

        if let Some(handler) = state.on_move.as_mut() {
            handler(role, to);
        }

        true
    }

    pub fn snapshot(&self) -> Snapshot {
        let state = self.lock();

        Snapshot {
            view: state.view.clone(),
            viewport: state.viewport.clone(),
            markers: state
                .marker_order
                .iter()
                .filter_map(|id| state.markers.get(id).cloned())
                .collect(),
            paths: state
                .path_order
                .iter()
                .filter_map(|id| state.paths.get(id).cloned())
                .collect(),
        }
    }
}

impl MapSurface for Scene {
    #[tracing::instrument(skip(self))]
    fn init(&mut self, view: &MapView) {
        let mut state = self.lock();

        state.viewport = Some(Viewport::Centered {
            center: view.center,
            zoom: view.zoom,
        });
        state.view = Some(view.clone());
    }

    fn place_marker(&mut self, at: Coordinates, role: Role) -> MarkerHandle {
        let handle = MarkerHandle::new();
        let mut state = self.lock();

        state.markers.insert(
            handle.id(),
            Marker {
                at,
                role,
                draggable: true,
            },
        );
        state.marker_order.push(handle.id());

        tracing::debug!("placed {} marker at {:?}", role.label(), at);

        handle
    }

    fn remove_marker(&mut self, handle: MarkerHandle) {
        let mut state = self.lock();

        if state.markers.remove(&handle.id()).is_none() {
            tracing::warn!("marker {} was not on the map", handle.id());
        }
        state.marker_order.retain(|id| *id != handle.id());
    }

    fn draw_path(&mut self, route: &RouteResult) -> PathHandle {
        let handle = PathHandle::new();
        let mut state = self.lock();

        state.paths.insert(handle.id(), LineString::from(route));
        state.path_order.push(handle.id());

        tracing::debug!(
            "drew {} point path ({} {}px)",
            route.len(),
            state.style.color,
            state.style.weight
        );

        handle
    }

    fn clear_path(&mut self, handle: PathHandle) {
        let mut state = self.lock();

        if state.paths.remove(&handle.id()).is_none() {
            tracing::warn!("path {} was not on the map", handle.id());
        }
        state.path_order.retain(|id| *id != handle.id());
    }

    fn fit_to_path(&mut self, handle: &PathHandle) {
        let mut state = self.lock();

        let bounds = match state.paths.get(&handle.id()).and_then(bounds_of) {
            Some(bounds) => bounds,
            None => return,
        };

        state.viewport = Some(Viewport::Bounds(bounds));
    }

    fn on_map_clicked(&mut self, handler: ClickHandler) {
        self.lock().on_click = Some(handler);
    }

    fn on_marker_moved(&mut self, handler: MoveHandler) {
        self.lock().on_move = Some(handler);
    }
}

fn bounds_of(line: &LineString<f64>) -> Option<Rect<f64>> {
    let first = line.0.first()?;

    let (min, max) = line.0.iter().fold((*first, *first), |(min, max), c| {
        (
            coord! { x: min.x.min(c.x), y: min.y.min(c.y) },
            coord! { x: max.x.max(c.x), y: max.y.max(c.y) },
        )
    });

    Some(Rect::new(min, max))
}

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.view {
            Some(view) => writeln!(f, "{}", view.title)?,
            None => return writeln!(f, "(map not initialized)"),
        }

        match &self.viewport {
            Some(Viewport::Centered { center, zoom }) => writeln!(
                f,
                "view: centered on {:.5}, {:.5} at zoom {}",
                center.latitude, center.longitude, zoom
            )?,
            Some(Viewport::Bounds(rect)) => writeln!(
                f,
                "view: bounds {:.5}, {:.5} .. {:.5}, {:.5}",
                rect.min().y,
                rect.min().x,
                rect.max().y,
                rect.max().x
            )?,
            None => {}
        }

        for marker in &self.markers {
            writeln!(
                f,
                "marker: {} at {:.5}, {:.5}",
                marker.role.label(),
                marker.at.latitude,
                marker.at.longitude
            )?;
        }

        for path in &self.paths {
            writeln!(f, "path: {} points", path.0.len())?;
        }

        Ok(())
    }
}

#[test]
fn click_before_init_is_ignored_test() {
    use std::sync::atomic::{AtomicUsize, Ordering};

    let mut scene = Scene::new();
    let clicks = Arc::new(AtomicUsize::new(0));
    let counter = clicks.clone();
    scene.on_map_clicked(Box::new(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    }));

    assert!(!scene.click(Coordinates::new(1.0, 1.0)));
    assert_eq!(clicks.load(Ordering::SeqCst), 0);
}

#[test]
fn click_handler_is_replaced_test() {
    use crate::entities::MapConfig;
    use crate::surface::MapOptions;
    use std::sync::atomic::{AtomicUsize, Ordering};

    let mut scene = Scene::new();
    let config = MapConfig {
        center: Coordinates::new(0.0, 0.0),
        place_name: "Nowhere".into(),
    };
    scene.init(&MapView::new(&config, &MapOptions::default()));

    let first = Arc::new(AtomicUsize::new(0));
    let second = Arc::new(AtomicUsize::new(0));
    let (a, b) = (first.clone(), second.clone());
    scene.on_map_clicked(Box::new(move |_| {
        a.fetch_add(1, Ordering::SeqCst);
    }));
    scene.on_map_clicked(Box::new(move |_| {
        b.fetch_add(1, Ordering::SeqCst);
    }));

    assert!(scene.click(Coordinates::new(1.0, 1.0)));
    assert_eq!(first.load(Ordering::SeqCst), 0);
    assert_eq!(second.load(Ordering::SeqCst), 1);
}

#[test]
fn fit_to_path_uses_bounds_test() {
    let mut scene = Scene::new();
    let route = RouteResult::new(vec![
        Coordinates::new(1.0, 4.0),
        Coordinates::new(3.0, 2.0),
        Coordinates::new(2.0, 5.0),
    ])
    .unwrap();

    let path = scene.draw_path(&route);
    scene.fit_to_path(&path);

    let snapshot = scene.snapshot();
    assert_eq!(
        snapshot.viewport,
        Some(Viewport::Bounds(Rect::new(
            coord! { x: 2.0, y: 1.0 },
            coord! { x: 5.0, y: 3.0 }
        )))
    );

    scene.clear_path(path);
    assert!(scene.snapshot().paths.is_empty());
}

#[test]
fn drag_moves_marker_test() {
    let mut scene = Scene::new();
    let handle = scene.place_marker(Coordinates::new(1.0, 1.0), Role::Start);

    assert!(scene.drag(Role::Start, Coordinates::new(2.0, 2.0)));
    assert!(!scene.drag(Role::End, Coordinates::new(2.0, 2.0)));
    assert_eq!(
        scene.snapshot().marker(Role::Start).map(|m| m.at),
        Some(Coordinates::new(2.0, 2.0))
    );

    scene.remove_marker(handle);
    assert!(scene.snapshot().markers.is_empty());
}
