//! Series store: per-institution views over a flat sales table

use crate::data::{SalesRecord, SalesTable};
use crate::error::{ForecastError, Result};
use crate::series::{Observation, Series};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

/// One `(institution, date, size, quantity)` row of the long-format history
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SizeSale {
    pub institution: String,
    pub date: NaiveDate,
    pub size: u32,
    pub quantity: f64,
}

/// Read-only store over the rows of a flat sales table
#[derive(Debug, Clone, Default)]
pub struct SeriesStore {
    records: Vec<SalesRecord>,
}

impl SeriesStore {
    pub fn new(records: Vec<SalesRecord>) -> Self {
        Self { records }
    }

    pub fn from_table(table: SalesTable) -> Self {
        Self::new(table.into_records())
    }

    pub fn records(&self) -> &[SalesRecord] {
        &self.records
    }

    /// Distinct institutions in first-seen order
    pub fn institutions(&self) -> Vec<String> {
        let mut seen: Vec<String> = Vec::new();
        for record in &self.records {
            if !seen.iter().any(|name| name == &record.institution) {
                seen.push(record.institution.clone());
            }
        }
        seen
    }

    /// Observations for `institution`, sorted by date, one per date.
    ///
    /// When a date appears more than once the row that comes last in the
    /// table wins.
    pub fn observations(&self, institution: &str) -> Vec<Observation> {
        let mut by_date: BTreeMap<NaiveDate, Observation> = BTreeMap::new();
        let mut rows = 0usize;

        for record in self.records.iter().filter(|r| r.institution == institution) {
            rows += 1;
            by_date.insert(
                record.date,
                Observation::new(record.date, record.total, record.sizes.clone()),
            );
        }

        if rows > by_date.len() {
            debug!(
                institution,
                duplicates = rows - by_date.len(),
                "collapsed duplicate dates"
            );
        }

        by_date.into_values().collect()
    }

    /// The forecastable series for `institution`
    pub fn series(&self, institution: &str) -> Result<Series> {
        let observations = self.observations(institution);
        if observations.len() < 2 {
            return Err(ForecastError::InsufficientData {
                institution: institution.to_string(),
                found: observations.len(),
            });
        }

        for obs in &observations {
            let mismatch = obs.size_sum_mismatch();
            if mismatch.abs() > f64::EPSILON {
                debug!(
                    institution,
                    date = %obs.date,
                    mismatch,
                    "total differs from size sum"
                );
            }
        }

        Series::new(institution, observations)
    }

    /// Per-size sales history for `institution`, by date then size
    pub fn long_format(&self, institution: &str) -> Vec<SizeSale> {
        self.observations(institution)
            .into_iter()
            .flat_map(|obs| {
                let date = obs.date;
                obs.per_size
                    .into_iter()
                    .map(move |(size, quantity)| SizeSale {
                        institution: institution.to_string(),
                        date,
                        size,
                        quantity,
                    })
            })
            .collect()
    }

    /// History of a single size for `institution`
    pub fn size_history(&self, institution: &str, size: u32) -> Vec<(NaiveDate, f64)> {
        self.long_format(institution)
            .into_iter()
            .filter(|sale| sale.size == size)
            .map(|sale| (sale.date, sale.quantity))
            .collect()
    }
}
