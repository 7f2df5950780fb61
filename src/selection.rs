use serde::{Deserialize, Serialize};

use crate::{
    entities::{Coordinates, Endpoint, Role, RouteResult},
    error::Error,
    status::{self, StatusReporter},
    surface::{MapSurface, PathHandle},
};

/// The observable phase of the selection workflow.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Empty,
    StartChosen,
    RouteDisplayed,
}

/// A route computation the caller must perform and report back through
/// [`Selection::resolve`] with the same generation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RouteRequest {
    pub generation: u64,
    pub start: Coordinates,
    pub end: Coordinates,
}

#[derive(Debug)]
struct DisplayedRoute {
    route: RouteResult,
    path: PathHandle,
}

#[derive(Debug)]
enum Phase {
    Empty,
    Start {
        start: Endpoint,
    },
    Pending {
        start: Endpoint,
        end: Endpoint,
        generation: u64,
    },
    // the request failed; markers stay until reset
    Failed {
        start: Endpoint,
        end: Endpoint,
    },
    Displayed {
        start: Endpoint,
        end: Endpoint,
        displayed: DisplayedRoute,
    },
}

/// Start/end selection state machine.
///
/// Owns every marker and path it asks the surface to show, plus the request
/// generation used to recognize stale route responses.
pub struct Selection<S: MapSurface, R: StatusReporter> {
    surface: S,
    status: R,
    phase: Phase,
    generation: u64,
}

impl<S: MapSurface, R: StatusReporter> Selection<S, R> {
    pub fn new(surface: S, status: R) -> Self {
        Self {
            surface,
            status,
            phase: Phase::Empty,
            generation: 0,
        }
    }

    pub fn state(&self) -> SessionState {
        match self.phase {
            Phase::Empty => SessionState::Empty,
            Phase::Start { .. } | Phase::Pending { .. } | Phase::Failed { .. } => {
                SessionState::StartChosen
            }
            Phase::Displayed { .. } => SessionState::RouteDisplayed,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.phase, Phase::Pending { .. })
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn endpoint(&self, role: Role) -> Option<&Endpoint> {
        let (start, end) = match &self.phase {
            Phase::Empty => return None,
            Phase::Start { start } => (start, None),
            Phase::Pending { start, end, .. }
            | Phase::Failed { start, end }
            | Phase::Displayed { start, end, .. } => (start, Some(end)),
        };

        match role {
            Role::Start => Some(start),
            Role::End => end,
        }
    }

    pub fn route(&self) -> Option<&RouteResult> {
        match &self.phase {
            Phase::Displayed { displayed, .. } => Some(&displayed.route),
            _ => None,
        }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn status(&self) -> &R {
        &self.status
    }

    /// Handles a click on the map. Returns the route request to issue when
    /// the click completed a start/end pair.
    #[tracing::instrument(skip(self))]
    pub fn click(&mut self, at: Coordinates) -> Option<RouteRequest> {
        match std::mem::replace(&mut self.phase, Phase::Empty) {
            Phase::Empty => {
                let marker = self.surface.place_marker(at, Role::Start);
                self.phase = Phase::Start {
                    start: Endpoint::new(at, Role::Start, marker),
                };
                self.status.report(status::START_SELECTED);

                None
            }
            Phase::Start { start } => {
                let marker = self.surface.place_marker(at, Role::End);
                self.generation += 1;

                let request = RouteRequest {
                    generation: self.generation,
                    start: start.coordinates,
                    end: at,
                };
                self.phase = Phase::Pending {
                    start,
                    end: Endpoint::new(at, Role::End, marker),
                    generation: self.generation,
                };
                self.status.report(status::COMPUTING_ROUTE);

                tracing::info!("requesting route, generation {}", request.generation);

                Some(request)
            }
            other => {
                tracing::debug!("ignoring click, both endpoints already chosen");
                self.phase = other;

                None
            }
        }
    }

    /// Applies the outcome of a route request. Outcomes for a generation
    /// other than the one currently pending are dropped.
    #[tracing::instrument(skip(self, outcome))]
    pub fn resolve(&mut self, generation: u64, outcome: Result<RouteResult, Error>) {
        let (start, end) = match std::mem::replace(&mut self.phase, Phase::Empty) {
            Phase::Pending {
                start,
                end,
                generation: pending,
            } if pending == generation => (start, end),
            other => {
                tracing::debug!("discarding stale route response");
                self.phase = other;
                return;
            }
        };

        match outcome {
            Ok(route) => {
                let path = self.surface.draw_path(&route);
                self.surface.fit_to_path(&path);

                self.phase = Phase::Displayed {
                    start,
                    end,
                    displayed: DisplayedRoute { route, path },
                };
                self.status.report(status::ROUTE_FOUND);
            }
            Err(err) => {
                tracing::error!("route request failed: {}", err);

                self.phase = Phase::Failed { start, end };
                self.status.report(&format!("Error: {}", err.message));
            }
        }
    }

    /// Records where a marker was dropped after dragging. This never
    /// triggers routing; it only changes what a later request would use.
    #[tracing::instrument(skip(self))]
    pub fn move_marker(&mut self, role: Role, to: Coordinates) {
        match (&mut self.phase, role) {
            (Phase::Empty, _) | (Phase::Start { .. }, Role::End) => {}
            (Phase::Start { start }, Role::Start)
            | (Phase::Pending { start, .. }, Role::Start)
            | (Phase::Failed { start, .. }, Role::Start)
            | (Phase::Displayed { start, .. }, Role::Start) => start.coordinates = to,
            (Phase::Pending { end, .. }, Role::End)
            | (Phase::Failed { end, .. }, Role::End)
            | (Phase::Displayed { end, .. }, Role::End) => end.coordinates = to,
        }
    }

    /// Removes every marker and path and returns to `Empty`. Any request
    /// still in flight becomes stale.
    #[tracing::instrument(skip(self))]
    pub fn reset(&mut self) {
        let (start, end, displayed) = match std::mem::replace(&mut self.phase, Phase::Empty) {
            Phase::Empty => (None, None, None),
            Phase::Start { start } => (Some(start), None, None),
            Phase::Pending { start, end, .. } | Phase::Failed { start, end } => {
                (Some(start), Some(end), None)
            }
            Phase::Displayed {
                start,
                end,
                displayed,
            } => (Some(start), Some(end), Some(displayed)),
        };

        for endpoint in [start, end].into_iter().flatten() {
            self.surface.remove_marker(endpoint.into_marker());
        }
        if let Some(displayed) = displayed {
            self.surface.clear_path(displayed.path);
        }

        self.generation += 1;
        self.status.report(status::SELECT_START);
    }
}

#[cfg(test)]
fn selection() -> (
    Selection<crate::scene::Scene, crate::status::StatusLine>,
    crate::scene::Scene,
    crate::status::StatusLine,
) {
    let scene = crate::scene::Scene::new();
    let line = crate::status::StatusLine::new();

    (Selection::new(scene.clone(), line.clone()), scene, line)
}

#[test]
fn two_clicks_place_endpoints_and_request_route_test() {
    let (mut selection, scene, line) = selection();
    let (c1, c2) = (Coordinates::new(-15.84, -70.02), Coordinates::new(-15.83, -70.01));

    assert_eq!(selection.click(c1), None);
    assert_eq!(selection.state(), SessionState::StartChosen);
    assert_eq!(line.current().as_deref(), Some(status::START_SELECTED));

    let request = selection.click(c2).unwrap();
    assert_eq!(request.start, c1);
    assert_eq!(request.end, c2);
    assert!(selection.is_pending());
    assert_eq!(line.current().as_deref(), Some(status::COMPUTING_ROUTE));

    let snapshot = scene.snapshot();
    assert_eq!(snapshot.markers.len(), 2);
    assert_eq!(snapshot.marker(Role::Start).map(|m| m.at), Some(c1));
    assert_eq!(snapshot.marker(Role::End).map(|m| m.at), Some(c2));
    assert!(snapshot.paths.is_empty());
}

#[test]
fn clicks_are_ignored_while_pending_or_displayed_test() {
    let (mut selection, scene, _) = selection();

    selection.click(Coordinates::new(1.0, 1.0));
    let request = selection.click(Coordinates::new(2.0, 2.0)).unwrap();

    assert_eq!(selection.click(Coordinates::new(3.0, 3.0)), None);
    assert_eq!(scene.snapshot().markers.len(), 2);

    let route = RouteResult::new(vec![request.start, request.end]).unwrap();
    selection.resolve(request.generation, Ok(route));
    assert_eq!(selection.state(), SessionState::RouteDisplayed);

    assert_eq!(selection.click(Coordinates::new(3.0, 3.0)), None);
    assert_eq!(scene.snapshot().markers.len(), 2);
    assert_eq!(selection.state(), SessionState::RouteDisplayed);
}

#[test]
fn successful_route_is_drawn_and_fit_test() {
    use crate::scene::Viewport;
    use geo_types::{coord, Rect};

    let (mut selection, scene, line) = selection();

    selection.click(Coordinates::new(1.0, 1.0));
    let request = selection.click(Coordinates::new(2.0, 2.0)).unwrap();

    let route: RouteResult = serde_json::from_str("[[1, 1], [2, 2]]").unwrap();
    selection.resolve(request.generation, Ok(route.clone()));

    let snapshot = scene.snapshot();
    assert_eq!(snapshot.paths.len(), 1);
    let points: Vec<(f64, f64)> = snapshot.paths[0].0.iter().map(|c| (c.y, c.x)).collect();
    assert_eq!(points, vec![(1.0, 1.0), (2.0, 2.0)]);
    assert_eq!(
        snapshot.viewport,
        Some(Viewport::Bounds(Rect::new(
            coord! { x: 1.0, y: 1.0 },
            coord! { x: 2.0, y: 2.0 }
        )))
    );
    assert_eq!(selection.route(), Some(&route));
    assert_eq!(line.current().as_deref(), Some(status::ROUTE_FOUND));
}

#[test]
fn failed_route_keeps_markers_test() {
    use crate::error::routing_error;

    let (mut selection, scene, line) = selection();

    selection.click(Coordinates::new(1.0, 1.0));
    let request = selection.click(Coordinates::new(2.0, 2.0)).unwrap();
    selection.resolve(request.generation, Err(routing_error(Some("no path".into()))));

    assert_eq!(line.current().as_deref(), Some("Error: no path"));
    assert_eq!(selection.state(), SessionState::StartChosen);
    assert!(!selection.is_pending());
    assert!(selection.route().is_none());

    let snapshot = scene.snapshot();
    assert_eq!(snapshot.markers.len(), 2);
    assert!(snapshot.paths.is_empty());

    // no automatic retry, and no new endpoint until reset
    assert_eq!(selection.click(Coordinates::new(3.0, 3.0)), None);
}

#[test]
fn reset_clears_everything_from_any_state_test() {
    let (mut selection, scene, line) = selection();

    selection.reset();
    assert_eq!(selection.state(), SessionState::Empty);
    assert_eq!(line.current().as_deref(), Some(status::SELECT_START));

    selection.click(Coordinates::new(1.0, 1.0));
    selection.reset();
    assert!(scene.snapshot().markers.is_empty());

    selection.click(Coordinates::new(1.0, 1.0));
    selection.click(Coordinates::new(2.0, 2.0));
    selection.reset();
    assert!(scene.snapshot().markers.is_empty());
    assert!(!selection.is_pending());

    selection.click(Coordinates::new(1.0, 1.0));
    let request = selection.click(Coordinates::new(2.0, 2.0)).unwrap();
    let route = RouteResult::new(vec![request.start, request.end]).unwrap();
    selection.resolve(request.generation, Ok(route));
    selection.reset();

    let snapshot = scene.snapshot();
    assert!(snapshot.markers.is_empty());
    assert!(snapshot.paths.is_empty());
    assert_eq!(selection.state(), SessionState::Empty);
    assert!(selection.endpoint(Role::Start).is_none());
    assert!(selection.route().is_none());
    assert_eq!(line.current().as_deref(), Some(status::SELECT_START));
}

#[test]
fn stale_response_after_reset_is_discarded_test() {
    let (mut selection, scene, line) = selection();

    selection.click(Coordinates::new(1.0, 1.0));
    let stale = selection.click(Coordinates::new(2.0, 2.0)).unwrap();
    selection.reset();

    selection.click(Coordinates::new(5.0, 5.0));
    let current = selection.click(Coordinates::new(6.0, 6.0)).unwrap();
    assert_ne!(stale.generation, current.generation);

    let route = RouteResult::new(vec![stale.start, stale.end]).unwrap();
    selection.resolve(stale.generation, Ok(route));

    assert!(selection.is_pending());
    assert!(scene.snapshot().paths.is_empty());
    assert_eq!(line.current().as_deref(), Some(status::COMPUTING_ROUTE));
}

#[test]
fn dragged_start_is_used_for_request_test() {
    let (mut selection, scene, _) = selection();

    selection.click(Coordinates::new(1.0, 1.0));
    selection.move_marker(Role::Start, Coordinates::new(1.5, 1.5));

    let request = selection.click(Coordinates::new(2.0, 2.0)).unwrap();
    assert_eq!(request.start, Coordinates::new(1.5, 1.5));

    // dragging after the request went out does not route again
    selection.move_marker(Role::End, Coordinates::new(3.0, 3.0));
    assert!(selection.is_pending());
    assert_eq!(
        selection.endpoint(Role::End).map(|e| e.coordinates),
        Some(Coordinates::new(3.0, 3.0))
    );
    assert_eq!(scene.snapshot().markers.len(), 2);
}
