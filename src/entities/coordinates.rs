use geo_types::{coord, Coord};
use serde::{Deserialize, Serialize};

/// A point in WGS84 degrees.
///
/// Ranges are not checked here; the routing backend owns validation and
/// whatever the user clicked is forwarded as-is.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

impl From<[f64; 2]> for Coordinates {
    fn from([latitude, longitude]: [f64; 2]) -> Self {
        Self::new(latitude, longitude)
    }
}

impl From<Coordinates> for [f64; 2] {
    fn from(c: Coordinates) -> Self {
        [c.latitude, c.longitude]
    }
}

impl From<Coordinates> for Coord<f64> {
    fn from(c: Coordinates) -> Self {
        coord! { x: c.longitude, y: c.latitude }
    }
}

impl From<Coord<f64>> for Coordinates {
    fn from(c: Coord<f64>) -> Self {
        Self::new(c.y, c.x)
    }
}

#[test]
fn pair_order_is_lat_lon_test() {
    let c = Coordinates::from([-15.84, -70.02]);
    assert_eq!(c.latitude, -15.84);
    assert_eq!(c.longitude, -70.02);

    let xy: Coord<f64> = c.into();
    assert_eq!(xy.x, -70.02);
    assert_eq!(xy.y, -15.84);
    assert_eq!(Coordinates::from(xy), c);
}
