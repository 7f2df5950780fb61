use async_channel::{Receiver, Sender};

use crate::{
    api::{ConfigAPI, DynAPI, RouteAPI},
    entities::{Coordinates, Role, RouteResult},
    error::{invalid_state_error, Error},
    selection::{RouteRequest, Selection},
    status::{self, StatusReporter},
    surface::{MapOptions, MapSurface, MapView},
};

#[derive(Debug)]
pub enum Event {
    MapClicked(Coordinates),
    MarkerMoved(Role, Coordinates),
    ResetRequested,
    RouteResolved {
        generation: u64,
        outcome: Result<RouteResult, Error>,
    },
    Shutdown,
}

/// The page-level controls that live outside the map: the reset button and
/// closing the page.
#[derive(Clone, Debug)]
pub struct Controls {
    tx: Sender<Event>,
}

impl Controls {
    pub fn reset(&self) -> Result<(), Error> {
        self.tx
            .try_send(Event::ResetRequested)
            .map_err(|_| invalid_state_error())
    }

    pub fn shutdown(&self) -> Result<(), Error> {
        self.tx
            .try_send(Event::Shutdown)
            .map_err(|_| invalid_state_error())
    }
}

/// Single-threaded event loop around a [`Selection`].
///
/// Map input, the reset control and route responses all arrive as
/// [`Event`]s on one channel and are applied strictly one at a time.
pub struct Session<S: MapSurface, R: StatusReporter> {
    api: DynAPI,
    selection: Selection<S, R>,
    tx: Sender<Event>,
    rx: Receiver<Event>,
}

impl<S: MapSurface, R: StatusReporter> Session<S, R> {
    /// Fetches the map configuration and brings up the map. When the
    /// configuration cannot be fetched the map is never initialized.
    #[tracing::instrument(name = "Session::start", skip_all)]
    pub async fn start(
        api: DynAPI,
        mut surface: S,
        mut status: R,
        options: &MapOptions,
    ) -> Result<Self, Error> {
        let config = match api.fetch_config().await {
            Ok(config) => config,
            Err(err) => {
                tracing::error!("could not initialize the application: {}", err);
                status.report(status::CANNOT_CONNECT);
                return Err(err);
            }
        };

        tracing::info!("loaded map for {}", config.place_name);

        let (tx, rx) = async_channel::unbounded();

        surface.init(&MapView::new(&config, options));

        let clicks = tx.clone();
        surface.on_map_clicked(Box::new(move |at| {
            if clicks.try_send(Event::MapClicked(at)).is_err() {
                tracing::warn!("click after the session ended");
            }
        }));

        let moves = tx.clone();
        surface.on_marker_moved(Box::new(move |role, to| {
            if moves.try_send(Event::MarkerMoved(role, to)).is_err() {
                tracing::warn!("marker moved after the session ended");
            }
        }));

        let mut selection = Selection::new(surface, status);
        selection.reset();

        Ok(Self {
            api,
            selection,
            tx,
            rx,
        })
    }

    pub fn controls(&self) -> Controls {
        Controls {
            tx: self.tx.clone(),
        }
    }

    pub fn selection(&self) -> &Selection<S, R> {
        &self.selection
    }

    /// Waits for the next event and applies it. Returns false once the
    /// session was shut down.
    pub async fn step(&mut self) -> bool {
        match self.rx.recv().await {
            Ok(event) => self.dispatch(event),
            Err(_) => false,
        }
    }

    pub async fn run(mut self) -> Selection<S, R> {
        while self.step().await {}

        tracing::info!("session ended");

        self.selection
    }

    #[tracing::instrument(skip(self))]
    fn dispatch(&mut self, event: Event) -> bool {
        match event {
            Event::MapClicked(at) => {
                if let Some(request) = self.selection.click(at) {
                    self.issue(request);
                }
            }
            Event::MarkerMoved(role, to) => self.selection.move_marker(role, to),
            Event::ResetRequested => self.selection.reset(),
            Event::RouteResolved {
                generation,
                outcome,
            } => self.selection.resolve(generation, outcome),
            Event::Shutdown => return false,
        }

        true
    }

    fn issue(&self, request: RouteRequest) {
        let api = self.api.clone();
        let tx = self.tx.clone();

        tokio::spawn(async move {
            let outcome = api.request_route(request.start, request.end).await;

            let resolved = Event::RouteResolved {
                generation: request.generation,
                outcome,
            };
            if tx.send(resolved).await.is_err() {
                tracing::debug!("route response arrived after the session ended");
            }
        });
    }
}

#[cfg(test)]
mod fake {
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    use crate::api::{ConfigAPI, RouteAPI, API};
    use crate::entities::{Coordinates, MapConfig, RouteResult};
    use crate::error::{connection_error, Error};

    /// Backend double. Each route request waits until the test releases
    /// one outcome through `release`.
    pub struct FakeBackend {
        pub config: Result<MapConfig, Error>,
        pub requests: Mutex<Vec<(Coordinates, Coordinates)>>,
        pub outcomes: async_channel::Receiver<Result<RouteResult, Error>>,
    }

    pub fn backend(
        config: Result<MapConfig, Error>,
    ) -> (
        Arc<FakeBackend>,
        async_channel::Sender<Result<RouteResult, Error>>,
    ) {
        let (release, outcomes) = async_channel::unbounded();

        let backend = FakeBackend {
            config,
            requests: Mutex::new(Vec::new()),
            outcomes,
        };

        (Arc::new(backend), release)
    }

    pub fn puno() -> MapConfig {
        MapConfig {
            center: Coordinates::new(-15.84, -70.02),
            place_name: "Puno, Peru".into(),
        }
    }

    #[async_trait]
    impl RouteAPI for FakeBackend {
        async fn request_route(
            &self,
            start: Coordinates,
            end: Coordinates,
        ) -> Result<RouteResult, Error> {
            self.requests.lock().unwrap().push((start, end));

            self.outcomes
                .recv()
                .await
                .unwrap_or_else(|_| Err(connection_error()))
        }
    }

    #[async_trait]
    impl ConfigAPI for FakeBackend {
        async fn fetch_config(&self) -> Result<MapConfig, Error> {
            self.config.clone()
        }
    }

    impl API for FakeBackend {}
}

#[test]
fn start_failure_leaves_map_uninitialized_test() {
    use crate::error::connection_error;
    use crate::scene::Scene;
    use crate::status::StatusLine;
    use tokio_test::block_on;

    let (backend, _) = fake::backend(Err(connection_error()));
    let scene = Scene::new();
    let line = StatusLine::new();

    let result = block_on(Session::start(
        backend,
        scene.clone(),
        line.clone(),
        &MapOptions::default(),
    ));

    assert!(result.err().unwrap().is_connection_error());
    assert!(!scene.is_initialized());
    assert_eq!(line.current().as_deref(), Some(status::CANNOT_CONNECT));
    assert!(!scene.click(Coordinates::new(1.0, 1.0)));
}

#[test]
fn start_initializes_map_test() {
    use crate::scene::{Scene, Viewport};
    use crate::status::StatusLine;
    use tokio_test::block_on;

    let (backend, _) = fake::backend(Ok(fake::puno()));
    let scene = Scene::new();
    let line = StatusLine::new();

    let session = block_on(Session::start(
        backend,
        scene.clone(),
        line.clone(),
        &MapOptions::default(),
    ))
    .unwrap();

    let snapshot = scene.snapshot();
    assert_eq!(
        snapshot.view.map(|v| v.title),
        Some("Simulator - Puno, Peru".to_string())
    );
    assert_eq!(
        snapshot.viewport,
        Some(Viewport::Centered {
            center: Coordinates::new(-15.84, -70.02),
            zoom: 13
        })
    );
    assert_eq!(line.current().as_deref(), Some(status::SELECT_START));
    assert_eq!(
        session.selection().state(),
        crate::selection::SessionState::Empty
    );
}

#[test]
fn clicks_route_through_backend_test() {
    use crate::scene::Scene;
    use crate::selection::SessionState;
    use crate::status::StatusLine;
    use tokio_test::block_on;

    block_on(async {
        let (backend, release) = fake::backend(Ok(fake::puno()));
        let scene = Scene::new();
        let line = StatusLine::new();

        let mut session = Session::start(
            backend.clone(),
            scene.clone(),
            line.clone(),
            &MapOptions::default(),
        )
        .await
        .unwrap();

        let (c1, c2) = (Coordinates::new(1.0, 1.0), Coordinates::new(2.0, 2.0));
        assert!(scene.click(c1));
        assert!(scene.click(c2));
        assert!(scene.click(Coordinates::new(3.0, 3.0)));

        assert!(session.step().await);
        assert!(session.step().await);
        assert!(session.step().await);
        assert_eq!(scene.snapshot().markers.len(), 2);

        release
            .send(Ok(RouteResult::new(vec![c1, c2]).unwrap()))
            .await
            .unwrap();
        assert!(session.step().await);

        assert_eq!(backend.requests.lock().unwrap().clone(), vec![(c1, c2)]);
        assert_eq!(session.selection().state(), SessionState::RouteDisplayed);
        assert_eq!(scene.snapshot().paths.len(), 1);
        assert_eq!(line.current().as_deref(), Some(status::ROUTE_FOUND));

        session.controls().shutdown().unwrap();
        let selection = session.run().await;
        assert_eq!(selection.state(), SessionState::RouteDisplayed);
    });
}

#[test]
fn reset_while_pending_discards_response_test() {
    use crate::scene::Scene;
    use crate::selection::SessionState;
    use crate::status::StatusLine;
    use tokio_test::block_on;

    block_on(async {
        let (backend, release) = fake::backend(Ok(fake::puno()));
        let scene = Scene::new();
        let line = StatusLine::new();

        let mut session = Session::start(
            backend.clone(),
            scene.clone(),
            line.clone(),
            &MapOptions::default(),
        )
        .await
        .unwrap();

        scene.click(Coordinates::new(1.0, 1.0));
        scene.click(Coordinates::new(2.0, 2.0));
        session.step().await;
        session.step().await;
        assert!(session.selection().is_pending());

        session.controls().reset().unwrap();
        session.step().await;
        assert_eq!(session.selection().state(), SessionState::Empty);

        release
            .send(Ok(RouteResult::new(vec![
                Coordinates::new(1.0, 1.0),
                Coordinates::new(2.0, 2.0),
            ])
            .unwrap()))
            .await
            .unwrap();
        assert!(session.step().await);

        let snapshot = scene.snapshot();
        assert!(snapshot.paths.is_empty());
        assert!(snapshot.markers.is_empty());
        assert_eq!(session.selection().state(), SessionState::Empty);
        assert_eq!(line.current().as_deref(), Some(status::SELECT_START));
    });
}

#[test]
fn routing_error_is_reported_test() {
    use crate::error::routing_error;
    use crate::scene::Scene;
    use crate::selection::SessionState;
    use crate::status::StatusLine;
    use tokio_test::block_on;

    block_on(async {
        let (backend, release) = fake::backend(Ok(fake::puno()));
        let scene = Scene::new();
        let line = StatusLine::new();

        let mut session = Session::start(
            backend,
            scene.clone(),
            line.clone(),
            &MapOptions::default(),
        )
        .await
        .unwrap();

        scene.click(Coordinates::new(1.0, 1.0));
        scene.click(Coordinates::new(2.0, 2.0));
        session.step().await;
        session.step().await;

        release
            .send(Err(routing_error(Some("no path".into()))))
            .await
            .unwrap();
        session.step().await;

        assert_eq!(line.current().as_deref(), Some("Error: no path"));
        assert_eq!(session.selection().state(), SessionState::StartChosen);
        assert!(scene.snapshot().paths.is_empty());
        assert_eq!(scene.snapshot().markers.len(), 2);
    });
}

#[test]
fn drag_is_forwarded_but_does_not_route_test() {
    use crate::scene::Scene;
    use crate::status::StatusLine;
    use tokio_test::block_on;

    block_on(async {
        let (backend, _release) = fake::backend(Ok(fake::puno()));
        let scene = Scene::new();

        let mut session = Session::start(
            backend.clone(),
            scene.clone(),
            StatusLine::new(),
            &MapOptions::default(),
        )
        .await
        .unwrap();

        scene.click(Coordinates::new(1.0, 1.0));
        session.step().await;

        assert!(scene.drag(Role::Start, Coordinates::new(1.5, 1.5)));
        session.step().await;

        assert_eq!(
            session
                .selection()
                .endpoint(Role::Start)
                .map(|e| e.coordinates),
            Some(Coordinates::new(1.5, 1.5))
        );
        assert!(backend.requests.lock().unwrap().is_empty());
    });
}
