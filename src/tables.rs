//! Precomputed lookup tables keyed by an arm's sufficient statistics.
//!
//! Both tables are produced offline and loaded once before any trial runs.
//! They are immutable afterwards and shared between trials behind an [`Arc`].

use crate::errors::TableError;

use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    fs::File,
    io::{BufReader, Read},
    path::Path,
    sync::Arc,
};
use tracing::info;

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct ValueRow {
    pub time: u64,
    pub positive: u64,
    pub negative: u64,
    pub value: f64,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct IndexRow {
    pub positive: u64,
    pub negative: u64,
    pub index: f64,
}

/// Iterates the (positive, negative) states reachable after `pulls` observations.
fn reachable_states(pulls: u64) -> impl Iterator<Item = (u64, u64)> {
    (1..=pulls + 1).map(move |positive| (positive, pulls + 2 - positive))
}

fn check_counts(positive: u64, negative: u64) -> Result<(), TableError> {
    if positive == 0 || negative == 0 {
        return Err(TableError::InvalidRow { positive, negative });
    }
    Ok(())
}

/// Per-arm value function `V(time, positive, negative)` with 0-based time.
#[derive(Clone, Debug, Default)]
pub struct ValueTable {
    values: HashMap<(u64, u64, u64), f64>,
}

impl ValueTable {
    pub fn from_rows<I>(rows: I) -> Result<Self, TableError>
    where
        I: IntoIterator<Item = ValueRow>,
    {
        let values = rows
            .into_iter()
            .map(|row| {
                check_counts(row.positive, row.negative)
                    .map(|_| ((row.time, row.positive, row.negative), row.value))
            })
            .collect::<Result<HashMap<_, _>, _>>()?;

        Ok(Self { values })
    }

    /// Builds a table over every state reachable at times `0..=max_time`.
    pub fn from_fn<F>(max_time: u64, f: F) -> Self
    where
        F: Fn(u64, u64, u64) -> f64,
    {
        let values = (0..=max_time)
            .flat_map(|time| {
                (0..=time)
                    .flat_map(reachable_states)
                    .map(move |(positive, negative)| (time, positive, negative))
            })
            .map(|(time, positive, negative)| {
                ((time, positive, negative), f(time, positive, negative))
            })
            .collect();

        Self { values }
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, TableError> {
        let rows: Vec<ValueRow> = serde_json::from_reader(reader)?;
        Self::from_rows(rows)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, TableError> {
        let path = path.as_ref();
        let table = Self::from_reader(BufReader::new(File::open(path)?))?;
        info!(path = ?path, entries = %table.len(), "Loaded value table");
        Ok(table)
    }

    pub fn lookup(&self, time: u64, positive: u64, negative: u64) -> Result<f64, TableError> {
        self.values
            .get(&(time, positive, negative))
            .copied()
            .ok_or(TableError::ValueNotFound {
                time,
                positive,
                negative,
            })
    }

    /// Whether every state reachable at times `0..=max_time` has a value.
    pub fn covers(&self, max_time: u64) -> bool {
        (0..=max_time).all(|time| {
            (0..=time).all(|pulls| {
                reachable_states(pulls).all(|(positive, negative)| {
                    self.values.contains_key(&(time, positive, negative))
                })
            })
        })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Gittins index per arm state, computed offline to a fixed depth.
#[derive(Clone, Debug, Default)]
pub struct GittinsTable {
    indices: HashMap<(u64, u64), f64>,
}

impl GittinsTable {
    pub fn from_rows<I>(rows: I) -> Result<Self, TableError>
    where
        I: IntoIterator<Item = IndexRow>,
    {
        let indices = rows
            .into_iter()
            .map(|row| {
                check_counts(row.positive, row.negative)
                    .map(|_| ((row.positive, row.negative), row.index))
            })
            .collect::<Result<HashMap<_, _>, _>>()?;

        Ok(Self { indices })
    }

    /// Builds a table over every state reachable within `max_pulls` observations.
    pub fn from_fn<F>(max_pulls: u64, f: F) -> Self
    where
        F: Fn(u64, u64) -> f64,
    {
        let indices = (0..=max_pulls)
            .flat_map(reachable_states)
            .map(|(positive, negative)| ((positive, negative), f(positive, negative)))
            .collect();

        Self { indices }
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, TableError> {
        let rows: Vec<IndexRow> = serde_json::from_reader(reader)?;
        Self::from_rows(rows)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, TableError> {
        let path = path.as_ref();
        let table = Self::from_reader(BufReader::new(File::open(path)?))?;
        info!(path = ?path, entries = %table.len(), "Loaded Gittins index table");
        Ok(table)
    }

    pub fn lookup(&self, positive: u64, negative: u64) -> Result<f64, TableError> {
        self.indices
            .get(&(positive, negative))
            .copied()
            .ok_or(TableError::IndexNotFound { positive, negative })
    }

    pub fn covers(&self, max_pulls: u64) -> bool {
        (0..=max_pulls)
            .flat_map(reachable_states)
            .all(|state| self.indices.contains_key(&state))
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// Which backward induction produced the value table used by a lookahead policy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueSource {
    Ucb,
    Gittins,
}

/// The shared read-only tables, loaded once at startup.
#[derive(Clone, Debug, Default)]
pub struct Tables {
    pub ucb_values: Arc<ValueTable>,
    pub gittins_values: Arc<ValueTable>,
    pub gittins_index: Arc<GittinsTable>,
}

impl Tables {
    pub fn load<P: AsRef<Path>>(
        ucb_values: P,
        gittins_values: P,
        gittins_index: P,
    ) -> Result<Self, TableError> {
        Ok(Self {
            ucb_values: Arc::new(ValueTable::from_path(ucb_values)?),
            gittins_values: Arc::new(ValueTable::from_path(gittins_values)?),
            gittins_index: Arc::new(GittinsTable::from_path(gittins_index)?),
        })
    }

    pub fn values(&self, source: ValueSource) -> Arc<ValueTable> {
        match source {
            ValueSource::Ucb => Arc::clone(&self.ucb_values),
            ValueSource::Gittins => Arc::clone(&self.gittins_values),
        }
    }
}
