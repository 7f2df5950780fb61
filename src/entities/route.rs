use geo_types::LineString;
use serde::{Deserialize, Serialize};

use crate::entities::Coordinates;
use crate::error::{upstream_error, Error};

/// An ordered path of at least two points; the order is the polyline.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<[f64; 2]>", into = "Vec<[f64; 2]>")]
pub struct RouteResult {
    points: Vec<Coordinates>,
}

impl RouteResult {
    pub fn new(points: Vec<Coordinates>) -> Result<Self, Error> {
        if points.len() < 2 {
            return Err(upstream_error());
        }

        Ok(Self { points })
    }

    pub fn points(&self) -> &[Coordinates] {
        &self.points
    }

    pub fn start(&self) -> Coordinates {
        self.points[0]
    }

    pub fn end(&self) -> Coordinates {
        self.points[self.points.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }
}

impl TryFrom<Vec<[f64; 2]>> for RouteResult {
    type Error = Error;

    fn try_from(pairs: Vec<[f64; 2]>) -> Result<Self, Error> {
        Self::new(pairs.into_iter().map(Coordinates::from).collect())
    }
}

impl From<RouteResult> for Vec<[f64; 2]> {
    fn from(route: RouteResult) -> Self {
        route.points.into_iter().map(Into::into).collect()
    }
}

impl From<&RouteResult> for LineString<f64> {
    fn from(route: &RouteResult) -> Self {
        route.points.iter().map(|&c| geo_types::Coord::from(c)).collect()
    }
}

#[test]
fn route_keeps_point_order_test() {
    let route: RouteResult =
        serde_json::from_value(serde_json::json!([[1.0, 1.0], [2.0, 2.0], [1.5, 3.0]])).unwrap();

    assert_eq!(route.len(), 3);
    assert_eq!(route.start(), Coordinates::new(1.0, 1.0));
    assert_eq!(route.points()[2], Coordinates::new(1.5, 3.0));
    assert_eq!(route.end(), Coordinates::new(1.5, 3.0));

    let line = LineString::from(&route);
    assert_eq!(line.0[2].x, 3.0);
    assert_eq!(line.0[2].y, 1.5);
}

#[test]
fn route_needs_two_points_test() {
    assert!(RouteResult::new(vec![]).is_err());
    assert!(RouteResult::new(vec![Coordinates::new(1.0, 1.0)]).is_err());
    assert!(serde_json::from_str::<RouteResult>("[[1.0, 1.0]]").is_err());
}
