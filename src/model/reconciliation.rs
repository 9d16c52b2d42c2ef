use std::{collections::BTreeMap, fmt};

use serde::Deserialize;

/// Operator-maintained list of known duplicates: public stop code -> the institutional stop
/// that describes the same physical stop.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct ReconciliationTable(BTreeMap<String, InstitutionalRef>);

/// Points at an institutional stop either by its counter id or by the `name` the API returns.
///
/// Names survive the API reordering its stops, counter ids don't.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Hash)]
#[serde(untagged)]
pub enum InstitutionalRef {
    Id(u32),
    Name(String),
}

impl fmt::Display for InstitutionalRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstitutionalRef::Id(id) => write!(f, "#{id}"),
            InstitutionalRef::Name(name) => f.write_str(name),
        }
    }
}

impl From<u32> for InstitutionalRef {
    fn from(id: u32) -> Self {
        InstitutionalRef::Id(id)
    }
}

impl From<&str> for InstitutionalRef {
    fn from(name: &str) -> Self {
        InstitutionalRef::Name(name.to_string())
    }
}

impl ReconciliationTable {
    pub fn entries(&self) -> impl Iterator<Item = (&str, &InstitutionalRef)> {
        self.0.iter().map(|(code, target)| (code.as_str(), target))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, R: Into<InstitutionalRef>> FromIterator<(K, R)> for ReconciliationTable {
    fn from_iter<T: IntoIterator<Item = (K, R)>>(iter: T) -> Self {
        ReconciliationTable(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}
