//! Drops institutional stops that the reconciliation table marks as duplicates of public stops
use std::{collections::HashSet, path::Path};

use itertools::Itertools;
use tracing::{info, warn};

use crate::{
    model::{
        bus_stop::{BusStop, StopId},
        reconciliation::{InstitutionalRef, ReconciliationTable},
    },
    pipeline::normalizer::{SourceFormatError, read_json_file},
};

/// A table entry that matches nothing in the current fetch.
#[derive(Clone, Debug, PartialEq)]
pub struct StaleReconciliationEntry {
    pub public_code: String,
    pub institutional: InstitutionalRef,
}

pub fn read_reconciliation_table(path: &Path) -> Result<ReconciliationTable, SourceFormatError> {
    let table: ReconciliationTable = read_json_file(path, "reconciliation table")?;

    if table.is_empty() {
        warn!("reconciliation table {} is empty", path.display());
    } else {
        info!("loaded {} reconciliation entries", table.len());
    }

    Ok(table)
}

/// Keeps only the institutional stops the table doesn't mark as duplicates.
///
/// Nothing is merged into the public stop, which is taken as authoritative. Duplicates not
/// yet listed in the table are kept. Stale entries are logged and otherwise ignored.
pub fn resolve(stops: Vec<BusStop>, table: &ReconciliationTable) -> Vec<BusStop> {
    for stale in stale_entries(&stops, table) {
        warn!(
            public_code = %stale.public_code,
            institutional = %stale.institutional,
            "reconciliation entry doesn't match any fetched institutional bus stop"
        );
    }

    let excluded = duplicate_ids(&stops, table);
    let before = stops.len();

    let kept = stops
        .into_iter()
        .filter(|stop| !excluded.contains(&stop.id))
        .collect_vec();

    info!(
        "removed {} institutional bus stops duplicating public ones",
        before - kept.len()
    );

    kept
}

/// Ids of the fetched institutional stops the table points at.
///
/// Only ids present in `stops` are returned, so a public stop is never among them even when
/// its code reads like a counter id.
pub fn duplicate_ids(stops: &[BusStop], table: &ReconciliationTable) -> HashSet<StopId> {
    stops
        .iter()
        .filter(|stop| table.entries().any(|(_, target)| refers_to(target, stop)))
        .map(|stop| stop.id.clone())
        .collect()
}

pub fn stale_entries(
    stops: &[BusStop],
    table: &ReconciliationTable,
) -> Vec<StaleReconciliationEntry> {
    table
        .entries()
        .filter(|(_, target)| !stops.iter().any(|stop| refers_to(target, stop)))
        .map(|(code, target)| StaleReconciliationEntry {
            public_code: code.to_string(),
            institutional: target.clone(),
        })
        .collect()
}

fn refers_to(target: &InstitutionalRef, stop: &BusStop) -> bool {
    match (target, &stop.id) {
        (InstitutionalRef::Id(id), StopId::Institutional(stop_id)) => id == stop_id,
        (InstitutionalRef::Name(name), StopId::Institutional(_)) => *name == stop.details.name,
        (_, StopId::Public(_)) => false,
    }
}
