mod coordinates;
mod endpoint;
mod map_config;
mod route;

pub use coordinates::Coordinates;
pub use endpoint::{Endpoint, Role};
pub use map_config::MapConfig;
pub use route::RouteResult;
