use itertools::Itertools;
use sqlx::{Pool, Postgres, QueryBuilder, Transaction, query, query_scalar};
use tracing::{Instrument, info_span};

use crate::model::{
    bus_stop::{BusStop, StopId},
    db_model::{BusStopDb, BusStopServiceDb},
};

#[derive(thiserror::Error, Debug)]
pub enum LoadError {
    #[error("bus stop {id} already exists in storage, clear the busstops table before loading again")]
    DuplicateKey { id: StopId },

    #[error("database error")]
    Database(#[from] sqlx::Error),
}

/// Where the loader writes bus stops to.
pub trait StopStore {
    /// Inserts the stops and their services within a single transaction.
    /// Either all of them are committed or none are.
    async fn insert_stops(&self, stops: &[BusStop]) -> Result<u64, LoadError>;

    /// Deletes in one statement. Returns the number of deleted stops.
    async fn delete_stops(&self, ids: &[StopId]) -> Result<u64, LoadError>;

    async fn count_stops(&self) -> Result<i64, LoadError>;

    /// Empties the stop and service tables.
    async fn clear(&self) -> Result<(), LoadError>;
}

#[derive(Clone, Debug)]
pub struct PgStopStore {
    pool: Pool<Postgres>,
}

impl PgStopStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        PgStopStore { pool }
    }
}

impl StopStore for PgStopStore {
    async fn insert_stops(&self, stops: &[BusStop]) -> Result<u64, LoadError> {
        let mut tx = self.pool.begin().await?;

        for stop in stops {
            insert_stop(stop, &mut tx).await?;
        }

        tx.commit().instrument(info_span!("Committing")).await?;

        Ok(stops.len() as u64)
    }

    async fn delete_stops(&self, ids: &[StopId]) -> Result<u64, LoadError> {
        let ids = ids.iter().map(|id| id.to_string()).collect_vec();

        let res = query("DELETE FROM busstops WHERE id = ANY($1)")
            .bind(ids)
            .execute(&self.pool)
            .instrument(info_span!("Deleting bus stops"))
            .await?;

        Ok(res.rows_affected())
    }

    async fn count_stops(&self) -> Result<i64, LoadError> {
        let count = query_scalar::<_, i64>("SELECT COUNT(*) FROM busstops")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    async fn clear(&self) -> Result<(), LoadError> {
        query("TRUNCATE busstop_services, busstops")
            .execute(&self.pool)
            .instrument(info_span!("Truncating bus stops"))
            .await?;

        Ok(())
    }
}

async fn insert_stop(stop: &BusStop, tx: &mut Transaction<'_, Postgres>) -> Result<(), LoadError> {
    let row = BusStopDb::from(stop);

    query(
        "INSERT INTO busstops (
            id,
            latitude,
            longitude,
            name,
            status
        ) VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(&row.id)
    .bind(row.latitude)
    .bind(row.longitude)
    .bind(&row.name)
    .bind(row.status)
    .execute(&mut **tx)
    .instrument(info_span!("Inserting bus stop"))
    .await
    .map_err(|e| insert_error(e, &stop.id))?;

    insert_services(&BusStopServiceDb::from_stop(stop), tx).await?;

    Ok(())
}

// The in-memory store raises DuplicateKey itself, so against Postgres this mapping is only
// exercised with a live database.
fn insert_error(e: sqlx::Error, id: &StopId) -> LoadError {
    match e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            LoadError::DuplicateKey { id: id.clone() }
        }
        e => LoadError::Database(e),
    }
}

async fn insert_services(
    services: &[BusStopServiceDb],
    tx: &mut Transaction<'_, Postgres>,
) -> Result<(), sqlx::Error> {
    if services.is_empty() {
        return Ok(());
    }

    let mut query_builder = QueryBuilder::new(
        "INSERT INTO busstop_services (
            stop_id,
            position,
            service_no
        )",
    );

    query_builder.push_values(services, |mut b, service| {
        b.push_bind(&service.stop_id)
            .push_bind(service.position)
            .push_bind(&service.service_no);
    });

    query_builder
        .build()
        .execute(&mut **tx)
        .instrument(info_span!("Inserting services"))
        .await?;

    Ok(())
}
