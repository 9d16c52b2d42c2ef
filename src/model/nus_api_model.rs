use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize)]
pub struct BusStopsResponse {
    #[serde(rename = "BusStopsResult")]
    pub result: BusStopsResult,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct BusStopsResult {
    pub busstops: Vec<NusBusStop>,
}

/// The API has no usable identifier for a stop, only its display fields.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct NusBusStop {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}
