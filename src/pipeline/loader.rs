//! Persists the reconciled stops
use std::collections::HashSet;

use itertools::Itertools;
use tracing::info;

use crate::{
    dal::{LoadError, StopStore},
    model::bus_stop::{BusStop, StopId},
};

/// How often the loader commits while inserting.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum CommitMode {
    /// One transaction per stop. A failure keeps every stop inserted before it.
    #[default]
    PerRow,
    /// One transaction for the whole set. A failure inserts nothing.
    Batch,
}

pub struct Loader<S> {
    store: S,
    commit_mode: CommitMode,
}

impl<S: StopStore> Loader<S> {
    pub fn new(store: S, commit_mode: CommitMode) -> Self {
        Loader { store, commit_mode }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Returns how many stops were inserted.
    ///
    /// Fails with `LoadError::DuplicateKey` on the first stop whose id is already stored.
    /// What was committed before the failure depends on the commit mode.
    #[tracing::instrument(err, skip_all, fields(stops = stops.len(), commit_mode = ?self.commit_mode))]
    pub async fn load_stops(&self, stops: &[BusStop]) -> Result<u64, LoadError> {
        let inserted = match self.commit_mode {
            CommitMode::PerRow => {
                let mut inserted = 0;
                for stop in stops {
                    inserted += self.store.insert_stops(std::slice::from_ref(stop)).await?;
                }
                inserted
            }
            CommitMode::Batch => self.store.insert_stops(stops).await?,
        };

        info!("inserted {} bus stops", inserted);

        Ok(inserted)
    }

    /// Deletes every stored stop whose id is in `ids`, in one statement.
    #[tracing::instrument(err, skip_all, fields(ids = ids.len()))]
    pub async fn remove_by_ids(&self, ids: &HashSet<StopId>) -> Result<u64, LoadError> {
        if ids.is_empty() {
            return Ok(0);
        }

        let ids = ids.iter().cloned().sorted().collect_vec();
        let removed = self.store.delete_stops(&ids).await?;

        info!("removed {} bus stops", removed);

        Ok(removed)
    }

    #[tracing::instrument(err, skip_all)]
    pub async fn clear(&self) -> Result<(), LoadError> {
        self.store.clear().await?;
        info!("cleared stored bus stops");
        Ok(())
    }
}
