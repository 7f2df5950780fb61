use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Response, Url};
use serde::Deserialize;

use crate::{
    api::{ConfigAPI, RouteAPI, API},
    config::Settings,
    entities::{Coordinates, MapConfig, RouteResult},
    error::{invalid_config_error, routing_error, upstream_error, Error},
};

/// HTTP client for the routing backend's `/api/map` and `/api/route`.
#[derive(Clone, Debug)]
pub struct Backend {
    client: reqwest::Client,
    base_url: Url,
}

#[derive(Deserialize)]
struct RouteResponse {
    route: RouteResult,
}

#[derive(Deserialize)]
struct ErrorResponse {
    detail: Option<serde_json::Value>,
}

impl Backend {
    pub fn new(mut base_url: Url, timeout: Duration) -> Result<Self, Error> {
        // without the slash, joining "api/route" would drop the last path segment
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self { client, base_url })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, Error> {
        Self::new(settings.backend_url.clone(), settings.timeout)
    }

    fn url(&self, path: &str) -> Result<Url, Error> {
        self.base_url
            .join(path)
            .map_err(|_| invalid_config_error("ROUTESIM_BACKEND_URL"))
    }
}

/// The `detail` field of an error body, when it is plain text.
async fn error_detail(res: Response) -> Option<String> {
    let body = res.bytes().await.ok()?;
    let data: ErrorResponse = serde_json::from_slice(&body).ok()?;

    match data.detail? {
        serde_json::Value::String(detail) if !detail.is_empty() => Some(detail),
        _ => None,
    }
}

#[async_trait]
impl RouteAPI for Backend {
    #[tracing::instrument(skip(self))]
    async fn request_route(
        &self,
        start: Coordinates,
        end: Coordinates,
    ) -> Result<RouteResult, Error> {
        let res = self
            .client
            .get(self.url("api/route")?)
            .query(&[
                ("start_lat", start.latitude),
                ("start_lon", start.longitude),
                ("end_lat", end.latitude),
                ("end_lon", end.longitude),
            ])
            .send()
            .await?;

        let status = res.status();

        if !status.is_success() {
            let detail = error_detail(res).await;
            tracing::warn!("route request failed with {}: {:?}", status, detail);
            return Err(routing_error(detail));
        }

        let data: RouteResponse = res.json().await?;

        Ok(data.route)
    }
}

#[async_trait]
impl ConfigAPI for Backend {
    #[tracing::instrument(skip(self))]
    async fn fetch_config(&self) -> Result<MapConfig, Error> {
        let res = self.client.get(self.url("api/map")?).send().await?;

        if !res.status().is_success() {
            tracing::warn!("map config request failed with {}", res.status());
            return Err(upstream_error());
        }

        Ok(res.json().await?)
    }
}

impl API for Backend {}

#[cfg(test)]
fn serve(app: axum::Router) -> Url {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    let server = axum::Server::from_tcp(listener)
        .unwrap()
        .serve(app.into_make_service());
    tokio::spawn(server);

    Url::parse(&format!("http://{}", addr)).unwrap()
}

#[cfg(test)]
fn route_backend() -> axum::Router {
    use axum::{extract::Query, http::StatusCode, routing::get, Json};
    use serde_json::json;
    use std::collections::HashMap;

    // echoes the requested endpoints back as a two-point route, or fails on
    // a few magic start latitudes
    let handler = |Query(q): Query<HashMap<String, String>>| async move {
        let num = |key: &str| q.get(key).and_then(|v| v.parse::<f64>().ok());

        match (num("start_lat"), num("start_lon"), num("end_lat"), num("end_lon")) {
            (Some(s), _, _, _) if s == 90.0 => (
                StatusCode::NOT_FOUND,
                Json(json!({ "detail": "no path" })),
            ),
            (Some(s), _, _, _) if s == 89.0 => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({ "detail": [{ "loc": ["query", "end_lat"] }] })),
            ),
            (Some(s), _, _, _) if s == 88.0 => {
                (StatusCode::OK, Json(json!({ "route": [[88.0, 0.0]] })))
            }
            (Some(a), Some(b), Some(c), Some(d)) => {
                (StatusCode::OK, Json(json!({ "route": [[a, b], [c, d]] })))
            }
            _ => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({ "detail": "missing parameters" })),
            ),
        }
    };

    axum::Router::new().route("/api/route", get(handler))
}

#[test]
fn request_route_test() {
    use tokio_test::block_on;

    block_on(async {
        let backend = Backend::new(serve(route_backend()), Duration::from_secs(5)).unwrap();

        let start = Coordinates::new(-15.840221, -70.0219753);
        let end = Coordinates::new(-15.8255, 70.1);
        let route = backend.request_route(start, end).await.unwrap();

        assert_eq!(route.points(), &[start, end]);
    });
}

#[test]
fn request_route_detail_error_test() {
    use tokio_test::block_on;

    block_on(async {
        let backend = Backend::new(serve(route_backend()), Duration::from_secs(5)).unwrap();

        let err = backend
            .request_route(Coordinates::new(90.0, 0.0), Coordinates::new(1.0, 1.0))
            .await
            .unwrap_err();
        assert!(err.is_routing_error());
        assert_eq!(err.message, "no path");

        // FastAPI validation errors carry a list, not text
        let err = backend
            .request_route(Coordinates::new(89.0, 0.0), Coordinates::new(1.0, 1.0))
            .await
            .unwrap_err();
        assert!(err.is_routing_error());
        assert_eq!(err.message, "failed to compute route");
    });
}

#[test]
fn request_route_without_json_body_test() {
    use axum::{http::StatusCode, routing::get};
    use tokio_test::block_on;

    block_on(async {
        let app = axum::Router::new().route(
            "/api/route",
            get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
        );
        let backend = Backend::new(serve(app), Duration::from_secs(5)).unwrap();

        let err = backend
            .request_route(Coordinates::new(1.0, 1.0), Coordinates::new(2.0, 2.0))
            .await
            .unwrap_err();
        assert!(err.is_routing_error());
        assert_eq!(err.message, "failed to compute route");
    });
}

#[test]
fn request_route_too_short_test() {
    use tokio_test::block_on;

    block_on(async {
        let backend = Backend::new(serve(route_backend()), Duration::from_secs(5)).unwrap();

        let err = backend
            .request_route(Coordinates::new(88.0, 0.0), Coordinates::new(1.0, 1.0))
            .await
            .unwrap_err();
        assert_eq!(err, upstream_error());
    });
}

#[test]
fn request_route_connection_refused_test() {
    use tokio_test::block_on;

    let addr = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };
    let url = Url::parse(&format!("http://{}", addr)).unwrap();

    block_on(async {
        let backend = Backend::new(url, Duration::from_secs(5)).unwrap();

        let err = backend
            .request_route(Coordinates::new(1.0, 1.0), Coordinates::new(2.0, 2.0))
            .await
            .unwrap_err();
        assert!(err.is_connection_error());
    });
}

#[test]
fn fetch_config_test() {
    use axum::{routing::get, Json};
    use serde_json::json;
    use tokio_test::block_on;

    block_on(async {
        let app = axum::Router::new().route(
            "/sim/api/map",
            get(|| async {
                Json(json!({ "mapCenter": [-15.84, -70.02], "placeName": "Puno, Peru" }))
            }),
        );
        let mut url = serve(app);
        url.set_path("/sim");
        let backend = Backend::new(url, Duration::from_secs(5)).unwrap();

        let config = backend.fetch_config().await.unwrap();
        assert_eq!(config.center, Coordinates::new(-15.84, -70.02));
        assert_eq!(config.place_name, "Puno, Peru");
    });
}

#[test]
fn fetch_config_failures_test() {
    use axum::{http::StatusCode, routing::get, Json};
    use serde_json::json;
    use tokio_test::block_on;

    block_on(async {
        let app = axum::Router::new()
            .route("/broken/api/map", get(|| async { Json(json!({ "center": 1 })) }))
            .route(
                "/down/api/map",
                get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "maintenance") }),
            );
        let base = serve(app);

        let broken = Backend::new(base.join("/broken/").unwrap(), Duration::from_secs(5)).unwrap();
        assert_eq!(broken.fetch_config().await.unwrap_err(), upstream_error());

        let down = Backend::new(base.join("/down").unwrap(), Duration::from_secs(5)).unwrap();
        assert_eq!(down.fetch_config().await.unwrap_err(), upstream_error());
    });
}
