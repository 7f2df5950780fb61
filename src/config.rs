use std::env;
use std::str::FromStr;
use std::time::Duration;

use reqwest::Url;

use crate::error::{invalid_config_error, Error};
use crate::surface::{MapOptions, TileLayer, DEFAULT_ZOOM};

pub const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Clone, Debug)]
pub struct Settings {
    pub backend_url: Url,
    pub timeout: Duration,
    pub map: MapOptions,
}

impl Settings {
    /// Reads `ROUTESIM_*` variables, loading a `.env` file first if present.
    pub fn from_env() -> Result<Self, Error> {
        dotenv::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let backend_url = lookup("ROUTESIM_BACKEND_URL")
            .unwrap_or_else(|| DEFAULT_BACKEND_URL.into());
        let backend_url =
            Url::parse(&backend_url).map_err(|_| invalid_config_error("ROUTESIM_BACKEND_URL"))?;

        let timeout_secs = parse_or(&lookup, "ROUTESIM_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?;
        let zoom = parse_or(&lookup, "ROUTESIM_ZOOM", DEFAULT_ZOOM)?;

        let mut tiles = TileLayer::default();
        if let Some(url_template) = lookup("ROUTESIM_TILE_URL") {
            tiles.url_template = url_template;
        }

        Ok(Self {
            backend_url,
            timeout: Duration::from_secs(timeout_secs),
            map: MapOptions { zoom, tiles },
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, Error>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|_| invalid_config_error(key)),
        None => Ok(default),
    }
}

#[test]
fn defaults_test() {
    let settings = Settings::from_lookup(|_| None).unwrap();

    assert_eq!(settings.backend_url.as_str(), "http://127.0.0.1:8000/");
    assert_eq!(settings.timeout, Duration::from_secs(30));
    assert_eq!(settings.map.zoom, 13);
    assert_eq!(settings.map.tiles, TileLayer::default());
}

#[test]
fn overrides_test() {
    let settings = Settings::from_lookup(|key| match key {
        "ROUTESIM_BACKEND_URL" => Some("http://routes.local:9000/sim/".into()),
        "ROUTESIM_TIMEOUT_SECS" => Some("5".into()),
        "ROUTESIM_ZOOM" => Some(" 15 ".into()),
        _ => None,
    })
    .unwrap();

    assert_eq!(settings.backend_url.as_str(), "http://routes.local:9000/sim/");
    assert_eq!(settings.timeout, Duration::from_secs(5));
    assert_eq!(settings.map.zoom, 15);
}

#[test]
fn invalid_value_test() {
    let err = Settings::from_lookup(|key| match key {
        "ROUTESIM_ZOOM" => Some("close".into()),
        _ => None,
    })
    .unwrap_err();

    assert_eq!(err.code, 2);
    assert!(err.message.contains("ROUTESIM_ZOOM"));

    assert!(Settings::from_lookup(|key| match key {
        "ROUTESIM_BACKEND_URL" => Some("not a url".into()),
        _ => None,
    })
    .is_err());
}
