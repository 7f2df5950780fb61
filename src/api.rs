use std::sync::Arc;

use async_trait::async_trait;

use crate::entities::{Coordinates, MapConfig, RouteResult};
use crate::error::Error;

#[async_trait]
pub trait RouteAPI {
    async fn request_route(&self, start: Coordinates, end: Coordinates)
        -> Result<RouteResult, Error>;
}

#[async_trait]
pub trait ConfigAPI {
    async fn fetch_config(&self) -> Result<MapConfig, Error>;
}

pub trait API: RouteAPI + ConfigAPI {}

pub type DynAPI = Arc<dyn API + Send + Sync>;
