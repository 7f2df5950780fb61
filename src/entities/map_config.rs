use serde::{Deserialize, Serialize};

use crate::entities::Coordinates;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapConfig {
    #[serde(rename = "mapCenter", with = "pair")]
    pub center: Coordinates,
    pub place_name: String,
}

impl MapConfig {
    pub fn title(&self) -> String {
        format!("Simulator - {}", self.place_name)
    }
}

mod pair {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use crate::entities::Coordinates;

    pub fn serialize<S: Serializer>(c: &Coordinates, s: S) -> Result<S::Ok, S::Error> {
        <[f64; 2]>::from(*c).serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Coordinates, D::Error> {
        <[f64; 2]>::deserialize(d).map(Coordinates::from)
    }
}

#[test]
fn map_config_wire_format_test() {
    let config: MapConfig = serde_json::from_value(serde_json::json!({
        "mapCenter": [-15.84, -70.02],
        "placeName": "Puno, Peru",
    }))
    .unwrap();

    assert_eq!(config.center, Coordinates::new(-15.84, -70.02));
    assert_eq!(config.title(), "Simulator - Puno, Peru");
}
