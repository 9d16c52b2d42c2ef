use super::bus_stop::BusStop;

/// Row of the `busstops` table.
#[derive(Clone, Debug, PartialEq)]
pub struct BusStopDb {
    pub id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub name: String,
    pub status: bool,
}

impl From<&BusStop> for BusStopDb {
    fn from(stop: &BusStop) -> Self {
        BusStopDb {
            id: stop.id.to_string(),
            latitude: stop.details.latitude,
            longitude: stop.details.longitude,
            name: stop.details.name.clone(),
            status: stop.details.status,
        }
    }
}

/// Row of the `busstop_services` table. `position` keeps the order services were attached in.
#[derive(Clone, Debug, PartialEq)]
pub struct BusStopServiceDb {
    pub stop_id: String,
    pub position: i32,
    pub service_no: String,
}

impl BusStopServiceDb {
    pub fn from_stop(stop: &BusStop) -> Vec<Self> {
        let stop_id = stop.id.to_string();
        stop.details
            .services
            .iter()
            .enumerate()
            .map(|(position, service_no)| BusStopServiceDb {
                stop_id: stop_id.clone(),
                position: position as i32,
                service_no: service_no.clone(),
            })
            .collect()
    }
}
