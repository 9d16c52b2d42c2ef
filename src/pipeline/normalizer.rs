//! Turns the raw sources into `BusStop`s
use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use serde::de::DeserializeOwned;
use tracing::{info, warn};

use crate::model::{
    bus_stop::{BusStop, PublicStops, StopDetails, StopId},
    nus_api_model::BusStopsResponse,
    public_model::PublicStopRecord,
};

#[derive(thiserror::Error, Debug)]
pub enum SourceFormatError {
    #[error("couldn't access {}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("malformed {what}")]
    Json {
        what: &'static str,
        source: serde_json::Error,
    },
}

pub fn parse_json<T: DeserializeOwned>(
    content: &str,
    what: &'static str,
) -> Result<T, SourceFormatError> {
    serde_json::from_str(content).map_err(|source| SourceFormatError::Json { what, source })
}

#[tracing::instrument(err, skip_all, fields(path = %path.display()))]
pub fn read_json_file<T: DeserializeOwned>(
    path: &Path,
    what: &'static str,
) -> Result<T, SourceFormatError> {
    let content = fs::read_to_string(path).map_err(|source| SourceFormatError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    parse_json(&content, what)
}

/// Re-keys the public export by stop code.
///
/// A code that shows up twice keeps the later record.
pub fn normalize_public(records: Vec<PublicStopRecord>) -> PublicStops {
    let mut stops = PublicStops::new();

    for record in records {
        let code: String = record.id.into();
        let mut details = StopDetails::new(record.name, record.latitude, record.longitude);
        details.services = record.services;

        if stops.insert(code.clone(), details).is_some() {
            warn!(%code, "duplicate public bus stop code, the earlier record was overwritten");
        }
    }

    info!("normalized {} public bus stops", stops.len());

    stops
}

/// Assigns ids 1..=n in the order the API returned the stops.
///
/// The ids are only stable across runs as long as the API keeps returning the same order.
pub fn normalize_institutional(response: BusStopsResponse) -> Vec<BusStop> {
    let stops = response
        .result
        .busstops
        .into_iter()
        .zip(1..)
        .map(|(stop, id)| {
            BusStop::new(
                StopId::Institutional(id),
                StopDetails::new(stop.name, stop.latitude, stop.longitude),
            )
        })
        .collect::<Vec<_>>();

    info!("normalized {} institutional bus stops", stops.len());

    stops
}

/// Writes the keyed mapping out as pretty JSON.
#[tracing::instrument(err, skip_all, fields(path = %path.display()))]
pub fn write_snapshot(path: &Path, stops: &PublicStops) -> Result<(), SourceFormatError> {
    let io_err = |source| SourceFormatError::Io {
        path: path.to_path_buf(),
        source,
    };

    let mut writer = BufWriter::new(File::create(path).map_err(io_err)?);
    serde_json::to_writer_pretty(&mut writer, stops).map_err(|source| SourceFormatError::Json {
        what: "bus stop snapshot",
        source,
    })?;
    writer.flush().map_err(io_err)?;

    info!("wrote {} bus stops to {}", stops.len(), path.display());

    Ok(())
}
