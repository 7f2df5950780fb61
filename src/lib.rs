pub mod api;
pub mod config;
pub mod entities;
pub mod error;
pub mod external;
pub mod input;
pub mod scene;
pub mod selection;
pub mod session;
pub mod status;
pub mod surface;
