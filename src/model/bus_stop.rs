use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

/// Identifier of a stop in the final loaded set.
///
/// The two sources never share an identifier space: public stops keep the code from the
/// open-data export while institutional stops get a counter assigned at fetch time.
/// Both are stored as text.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(untagged)]
pub enum StopId {
    Public(String),
    /// Starts at 1, in the order the API returned the stops.
    Institutional(u32),
}

impl fmt::Display for StopId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopId::Public(code) => f.write_str(code),
            StopId::Institutional(n) => write!(f, "{n}"),
        }
    }
}

/// Everything about a stop except its identifier.
///
/// Serialized with the field names of the public export so the enriched mapping can be
/// written back out in the same shape it was read in.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StopDetails {
    #[serde(rename = "NAME")]
    pub name: String,
    #[serde(rename = "Latitude")]
    pub latitude: f64,
    #[serde(rename = "Longitude")]
    pub longitude: f64,
    /// No source supplies a closed stop, so this is always true at ingestion.
    #[serde(skip)]
    pub status: bool,
    /// Service numbers calling at this stop, in the order the routes listed them.
    #[serde(rename = "BusServices")]
    pub services: Vec<String>,
}

impl StopDetails {
    pub fn new(name: String, latitude: f64, longitude: f64) -> Self {
        StopDetails {
            name,
            latitude,
            longitude,
            status: true,
            services: vec![],
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BusStop {
    pub id: StopId,
    #[serde(flatten)]
    pub details: StopDetails,
}

impl BusStop {
    pub fn new(id: StopId, details: StopDetails) -> Self {
        BusStop { id, details }
    }
}

/// Public stops keyed by their code.
pub type PublicStops = BTreeMap<String, StopDetails>;

/// Turns the keyed public mapping into loadable stops, in key order.
pub fn public_stops_into_vec(stops: PublicStops) -> Vec<BusStop> {
    stops
        .into_iter()
        .map(|(code, details)| BusStop::new(StopId::Public(code), details))
        .collect()
}
