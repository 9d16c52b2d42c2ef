use serde::Deserialize;

/// One entry of the open-data bus stop export.
#[derive(Debug, Deserialize, Clone)]
pub struct PublicStopRecord {
    #[serde(rename = "ID")]
    pub id: PublicCode,
    #[serde(rename = "NAME")]
    pub name: String,
    #[serde(rename = "Latitude")]
    pub latitude: f64,
    #[serde(rename = "Longitude")]
    pub longitude: f64,
    /// Present only when the file was already enriched once.
    #[serde(rename = "BusServices", default)]
    pub services: Vec<String>,
}

/// Some exports write the stop code as a number, which drops leading zeroes.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum PublicCode {
    Text(String),
    Number(i64),
}

impl From<PublicCode> for String {
    fn from(value: PublicCode) -> Self {
        match value {
            PublicCode::Text(code) => code,
            PublicCode::Number(n) => n.to_string(),
        }
    }
}

/// A single (stop, service) pairing from the route export.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct RouteEdge {
    #[serde(rename = "BusStopCode")]
    pub stop_code: String,
    #[serde(rename = "ServiceNo")]
    pub service_no: String,
}
