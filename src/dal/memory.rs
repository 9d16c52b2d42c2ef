//! In-memory `StopStore` for tests. Enforces the primary key and all-or-nothing inserts.
use std::{
    collections::{BTreeMap, HashSet},
    sync::Mutex,
};

use super::{LoadError, StopStore};
use crate::model::{
    bus_stop::{BusStop, StopId},
    db_model::{BusStopDb, BusStopServiceDb},
};

#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

#[derive(Debug, Default)]
struct State {
    stops: BTreeMap<String, BusStopDb>,
    services: Vec<BusStopServiceDb>,
    commits: usize,
}

impl MemoryStore {
    pub fn with_stops(stops: &[BusStop]) -> Self {
        let store = MemoryStore::default();
        {
            let mut state = store.state.lock().unwrap();
            for stop in stops {
                state.stops.insert(stop.id.to_string(), BusStopDb::from(stop));
                state.services.extend(BusStopServiceDb::from_stop(stop));
            }
        }
        store
    }

    pub fn ids(&self) -> Vec<String> {
        self.state.lock().unwrap().stops.keys().cloned().collect()
    }

    pub fn services_of(&self, id: &str) -> Vec<String> {
        let state = self.state.lock().unwrap();
        let mut services = state
            .services
            .iter()
            .filter(|s| s.stop_id == id)
            .collect::<Vec<_>>();
        services.sort_by_key(|s| s.position);
        services.into_iter().map(|s| s.service_no.clone()).collect()
    }

    pub fn commits(&self) -> usize {
        self.state.lock().unwrap().commits
    }
}

impl StopStore for MemoryStore {
    async fn insert_stops(&self, stops: &[BusStop]) -> Result<u64, LoadError> {
        let mut state = self.state.lock().unwrap();

        let mut seen = HashSet::new();
        for stop in stops {
            let id = stop.id.to_string();
            if state.stops.contains_key(&id) || !seen.insert(id) {
                return Err(LoadError::DuplicateKey {
                    id: stop.id.clone(),
                });
            }
        }

        for stop in stops {
            state.stops.insert(stop.id.to_string(), BusStopDb::from(stop));
            state.services.extend(BusStopServiceDb::from_stop(stop));
        }
        state.commits += 1;

        Ok(stops.len() as u64)
    }

    async fn delete_stops(&self, ids: &[StopId]) -> Result<u64, LoadError> {
        let mut state = self.state.lock().unwrap();
        let ids: HashSet<String> = ids.iter().map(|id| id.to_string()).collect();

        let before = state.stops.len();
        state.stops.retain(|id, _| !ids.contains(id));
        state.services.retain(|s| !ids.contains(&s.stop_id));
        state.commits += 1;

        Ok((before - state.stops.len()) as u64)
    }

    async fn count_stops(&self) -> Result<i64, LoadError> {
        Ok(self.state.lock().unwrap().stops.len() as i64)
    }

    async fn clear(&self) -> Result<(), LoadError> {
        let mut state = self.state.lock().unwrap();
        state.stops.clear();
        state.services.clear();
        state.commits += 1;
        Ok(())
    }
}
