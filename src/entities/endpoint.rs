use serde::{Deserialize, Serialize};

use crate::entities::Coordinates;
use crate::surface::MarkerHandle;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Start,
    End,
}

impl Role {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Start => "Start point",
            Self::End => "Destination",
        }
    }
}

/// A chosen endpoint together with the marker displaying it.
///
/// The marker handle is not `Clone`, so the only way to get rid of an
/// endpoint's display is to hand the handle back to the surface once.
#[derive(Debug)]
pub struct Endpoint {
    pub coordinates: Coordinates,
    pub role: Role,
    marker: MarkerHandle,
}

impl Endpoint {
    pub fn new(coordinates: Coordinates, role: Role, marker: MarkerHandle) -> Self {
        Self {
            coordinates,
            role,
            marker,
        }
    }

    pub fn marker(&self) -> &MarkerHandle {
        &self.marker
    }

    pub fn into_marker(self) -> MarkerHandle {
        self.marker
    }
}
