//! fetch -> normalize -> enrich -> resolve -> load
pub mod enricher;
pub mod fetcher;
pub mod loader;
pub mod normalizer;
pub mod resolver;

use std::collections::HashSet;

use anyhow::{Context, Error};
use tracing::info;

use crate::{
    config::Config,
    dal::{LoadError, StopStore},
    model::{
        bus_stop::{BusStop, PublicStops, StopId, public_stops_into_vec},
        nus_api_model::BusStopsResponse,
        public_model::{PublicStopRecord, RouteEdge},
        reconciliation::ReconciliationTable,
    },
};

use self::{
    enricher::{LookupError, attach_services},
    fetcher::NusNextBusClient,
    loader::Loader,
    normalizer::{normalize_institutional, normalize_public, read_json_file},
    resolver::{duplicate_ids, read_reconciliation_table, resolve},
};

/// Normalizes the public export and attaches the routes to it.
pub fn prepare_public_stops(
    records: Vec<PublicStopRecord>,
    routes: &[RouteEdge],
) -> Result<PublicStops, LookupError> {
    let mut stops = normalize_public(records);
    attach_services(&mut stops, routes)?;
    Ok(stops)
}

/// Numbers the fetched stops and drops the ones the table marks as duplicates.
pub fn prepare_institutional_stops(
    response: BusStopsResponse,
    table: &ReconciliationTable,
) -> Vec<BusStop> {
    resolve(normalize_institutional(response), table)
}

/// The final set, institutional stops first.
pub fn reconcile(institutional: Vec<BusStop>, public: PublicStops) -> Vec<BusStop> {
    let mut stops = institutional;
    stops.extend(public_stops_into_vec(public));
    stops
}

#[tracing::instrument(err, skip_all)]
pub fn read_enriched_public_stops(config: &Config) -> Result<PublicStops, Error> {
    let records: Vec<PublicStopRecord> =
        read_json_file(&config.sources.public_stops, "public bus stops file")?;
    let routes: Vec<RouteEdge> = read_json_file(&config.sources.bus_routes, "bus routes file")?;

    info!("got {} routes", routes.len());

    Ok(prepare_public_stops(records, &routes)?)
}

#[tracing::instrument(err, skip_all)]
pub async fn fetch_institutional_stops(config: &Config) -> Result<Vec<BusStop>, Error> {
    let table = read_reconciliation_table(&config.sources.reconciliation)?;
    let response = fetch_bus_stops(config).await?;

    Ok(prepare_institutional_stops(response, &table))
}

/// Ids of the institutional stops, as numbered in the current fetch, that the table marks
/// as duplicates.
#[tracing::instrument(err, skip_all)]
pub async fn fetch_duplicate_ids(config: &Config) -> Result<HashSet<StopId>, Error> {
    let table = read_reconciliation_table(&config.sources.reconciliation)?;
    let stops = normalize_institutional(fetch_bus_stops(config).await?);

    Ok(duplicate_ids(&stops, &table))
}

async fn fetch_bus_stops(config: &Config) -> Result<BusStopsResponse, Error> {
    let client = NusNextBusClient::new(
        &config.nus_api,
        config.nus_api.require_password()?,
        config.http_timeout,
    )?;

    client
        .fetch_bus_stops()
        .await
        .context("Error fetching institutional bus stops")
}

/// Returns the number of inserted stops.
#[tracing::instrument(err, skip_all, fields(stops = stops.len(), truncate = truncate))]
pub async fn load<S: StopStore>(
    loader: &Loader<S>,
    stops: &[BusStop],
    truncate: bool,
) -> Result<u64, LoadError> {
    if truncate {
        loader.clear().await?;
    }

    let inserted = loader.load_stops(stops).await?;
    let total = loader.store().count_stops().await?;

    info!("{} bus stops in storage", total);

    Ok(inserted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dal::memory::MemoryStore,
        pipeline::{loader::CommitMode, normalizer::parse_json},
    };

    const PUBLIC: &str =
        r#"[{"ID": "A1", "NAME": "Stop A", "Latitude": 1.0, "Longitude": 2.0}]"#;
    const ROUTES: &str = r#"[{"BusStopCode": "A1", "ServiceNo": "95"}]"#;
    const NUS: &str = r#"{"BusStopsResult": {"busstops": [
        {"name": "AS5", "latitude": 1.29353, "longitude": 103.77263},
        {"name": "KR-MRT", "latitude": 1.29483, "longitude": 103.78439},
        {"name": "COM3", "latitude": 1.29455, "longitude": 103.77463}
    ]}}"#;

    fn public_stops() -> anyhow::Result<PublicStops> {
        let records: Vec<PublicStopRecord> = parse_json(PUBLIC, "public bus stops")?;
        let routes: Vec<RouteEdge> = parse_json(ROUTES, "bus routes")?;
        Ok(prepare_public_stops(records, &routes)?)
    }

    #[test]
    fn public_stop_gets_its_service() -> anyhow::Result<()> {
        let stops = public_stops()?;

        assert_eq!(stops["A1"].services, vec!["95"]);
        Ok(())
    }

    #[test]
    fn route_for_unknown_stop_aborts() -> anyhow::Result<()> {
        let records: Vec<PublicStopRecord> = parse_json(PUBLIC, "public bus stops")?;
        let routes: Vec<RouteEdge> =
            parse_json(r#"[{"BusStopCode": "B2", "ServiceNo": "95"}]"#, "bus routes")?;

        let res = prepare_public_stops(records, &routes);

        assert!(matches!(res, Err(LookupError { ref stop_code, .. }) if stop_code == "B2"));
        Ok(())
    }

    #[tokio::test]
    async fn full_run_loads_reconciled_set() -> anyhow::Result<()> {
        let table = ReconciliationTable::from_iter([("KR-MRT", 2_u32)]);
        let institutional = prepare_institutional_stops(parse_json(NUS, "bus stops")?, &table);
        let stops = reconcile(institutional, public_stops()?);

        assert_eq!(
            stops.iter().map(|s| s.id.clone()).collect::<Vec<_>>(),
            vec![
                StopId::Institutional(1),
                StopId::Institutional(3),
                StopId::Public("A1".to_string())
            ]
        );

        let loader = Loader::new(MemoryStore::default(), CommitMode::PerRow);
        let inserted = load(&loader, &stops, false).await?;

        assert_eq!(inserted, 3);
        assert_eq!(loader.store().ids(), vec!["1", "3", "A1"]);
        assert_eq!(loader.store().services_of("A1"), vec!["95"]);
        Ok(())
    }

    #[tokio::test]
    async fn rerun_without_truncate_hits_duplicate_key() -> anyhow::Result<()> {
        let stops = reconcile(vec![], public_stops()?);
        let loader = Loader::new(MemoryStore::default(), CommitMode::PerRow);

        load(&loader, &stops, false).await?;
        let res = load(&loader, &stops, false).await;

        assert!(matches!(res, Err(LoadError::DuplicateKey { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn rerun_with_truncate_replaces_the_set() -> anyhow::Result<()> {
        let stops = reconcile(vec![], public_stops()?);
        let loader = Loader::new(MemoryStore::default(), CommitMode::Batch);

        load(&loader, &stops, false).await?;
        let inserted = load(&loader, &stops, true).await?;

        assert_eq!(inserted, 1);
        assert_eq!(loader.store().count_stops().await?, 1);
        Ok(())
    }

    #[tokio::test]
    async fn pruning_with_the_shipped_table_keeps_public_stops() -> anyhow::Result<()> {
        let table = read_reconciliation_table(
            &std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("data/reconciliation.json"),
        )?;
        let fetched = normalize_institutional(parse_json(NUS, "bus stops")?);
        let kent_ridge: Vec<PublicStopRecord> = parse_json(
            r#"[{"ID": "18331", "NAME": "Kent Ridge Stn", "Latitude": 1.29363, "Longitude": 103.78461}]"#,
            "public bus stops",
        )?;
        let stored = reconcile(fetched.clone(), normalize_public(kent_ridge));
        let loader = Loader::new(MemoryStore::with_stops(&stored), CommitMode::PerRow);

        let removed = loader
            .remove_by_ids(&duplicate_ids(&fetched, &table))
            .await?;

        assert_eq!(removed, 1);
        assert_eq!(loader.store().ids(), vec!["1", "18331", "3"]);
        Ok(())
    }
}
