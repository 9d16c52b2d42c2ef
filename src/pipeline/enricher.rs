//! Attaches the services from the route export to the public stops
use tracing::info;

use crate::model::{bus_stop::PublicStops, public_model::RouteEdge};

/// A route points at a stop the public export doesn't have. Usually means the two files
/// come from different exports.
#[derive(thiserror::Error, Debug, PartialEq)]
#[error("service {service_no} references unknown bus stop {stop_code}")]
pub struct LookupError {
    pub stop_code: String,
    pub service_no: String,
}

/// Appends every route's service number to the stop it references, in route order.
///
/// Every route is checked before anything is appended, so on error `stops` is untouched.
/// Not idempotent: running it twice on the same mapping attaches every service twice.
#[tracing::instrument(err, skip_all, fields(routes = routes.len()))]
pub fn attach_services(stops: &mut PublicStops, routes: &[RouteEdge]) -> Result<(), LookupError> {
    if let Some(route) = routes.iter().find(|r| !stops.contains_key(&r.stop_code)) {
        return Err(LookupError {
            stop_code: route.stop_code.clone(),
            service_no: route.service_no.clone(),
        });
    }

    for route in routes {
        if let Some(stop) = stops.get_mut(&route.stop_code) {
            stop.services.push(route.service_no.clone());
        }
    }

    info!(
        "attached {} services to {} public bus stops",
        routes.len(),
        stops.values().filter(|s| !s.services.is_empty()).count()
    );

    Ok(())
}
