//! Daily tracking ledger backed by a flat CSV file
//!
//! Layout: `Date, Institution, Size_<n>..., Total`, one row per date and
//! institution. Recording an entry for a (date, institution) pair that is
//! already present replaces it.

use crate::data::{parse_date, parse_size_column, size_column_name, SalesRecord};
use crate::error::{ForecastError, Result};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const DATE_HEADER: &str = "Date";
const INSTITUTION_HEADER: &str = "Institution";
const TOTAL_HEADER: &str = "Total";

/// Pairs sold by one institution on one day
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyEntry {
    pub date: NaiveDate,
    pub institution: String,
    pub sizes: BTreeMap<u32, u32>,
    pub total: u32,
}

impl DailyEntry {
    /// New entry whose total is the sum of its sizes
    pub fn new(
        date: NaiveDate,
        institution: impl Into<String>,
        sizes: BTreeMap<u32, u32>,
    ) -> Result<Self> {
        let institution = institution.into();
        let total = sizes
            .values()
            .try_fold(0u32, |acc, &pairs| acc.checked_add(pairs))
            .ok_or_else(|| {
                ForecastError::DataError(format!(
                    "Daily total for '{}' on {} exceeds {} pairs",
                    institution,
                    date,
                    u32::MAX
                ))
            })?;

        Ok(Self {
            date,
            institution,
            sizes,
            total,
        })
    }

    fn key(&self) -> (NaiveDate, &str) {
        (self.date, self.institution.as_str())
    }
}

/// How a ledger came to be
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStatus {
    /// Read from an existing file
    Loaded,
    /// The file did not exist and was created empty
    Created,
}

/// In-memory copy of the tracking file
#[derive(Debug, Clone)]
pub struct TrackingLedger {
    path: PathBuf,
    sizes: Vec<u32>,
    entries: Vec<DailyEntry>,
}

impl TrackingLedger {
    /// Load the ledger at `path`, creating an empty file when it is missing
    pub fn open<P: AsRef<Path>>(path: P, sizes: RangeInclusive<u32>) -> Result<(Self, LoadStatus)> {
        let path = path.as_ref().to_path_buf();
        let mut ledger = Self {
            path,
            sizes: sizes.collect(),
            entries: Vec::new(),
        };

        if ledger.path.exists() {
            ledger.read()?;
            info!(path = %ledger.path.display(), entries = ledger.entries.len(), "loaded tracking data");
            Ok((ledger, LoadStatus::Loaded))
        } else {
            ledger.save()?;
            info!(path = %ledger.path.display(), "created tracking data file");
            Ok((ledger, LoadStatus::Created))
        }
    }

    fn read(&mut self) -> Result<()> {
        let mut reader = csv::Reader::from_path(&self.path)?;
        let headers = reader.headers()?.clone();

        let position = |name: &str| {
            headers.iter().position(|h| h == name).ok_or_else(|| {
                ForecastError::DataError(format!(
                    "Tracking file {} has no '{}' column",
                    self.path.display(),
                    name
                ))
            })
        };
        let date_idx = position(DATE_HEADER)?;
        let institution_idx = position(INSTITUTION_HEADER)?;
        let total_idx = headers.iter().position(|h| h == TOTAL_HEADER);

        let mut size_columns = Vec::new();
        for (idx, header) in headers.iter().enumerate() {
            if let Some(size) = parse_size_column(header) {
                size_columns.push((idx, size?));
            }
        }

        for (_, size) in &size_columns {
            if !self.sizes.contains(size) {
                self.sizes.push(*size);
            }
        }
        self.sizes.sort_unstable();

        for (row, record) in reader.records().enumerate() {
            let record = record?;
            let field = |idx: usize| record.get(idx).unwrap_or("").trim();

            let date = parse_date(field(date_idx))?;
            let institution = field(institution_idx).to_string();

            let mut sizes = BTreeMap::new();
            for &(idx, size) in &size_columns {
                sizes.insert(size, parse_quantity(field(idx), row + 1)?);
            }

            let mut entry = DailyEntry::new(date, institution, sizes)?;
            if let Some(idx) = total_idx {
                if !field(idx).is_empty() {
                    entry.total = parse_quantity(field(idx), row + 1)?;
                }
            }
            self.entries.push(entry);
        }

        Ok(())
    }

    /// Write every entry back to the ledger file
    pub fn save(&self) -> Result<()> {
        let mut writer = csv::Writer::from_path(&self.path)?;

        let mut header = vec![DATE_HEADER.to_string(), INSTITUTION_HEADER.to_string()];
        header.extend(self.sizes.iter().map(|&s| size_column_name(s)));
        header.push(TOTAL_HEADER.to_string());
        writer.write_record(&header)?;

        for entry in &self.entries {
            let mut row = vec![
                entry.date.format("%Y-%m-%d").to_string(),
                entry.institution.clone(),
            ];
            row.extend(
                self.sizes
                    .iter()
                    .map(|s| entry.sizes.get(s).copied().unwrap_or(0).to_string()),
            );
            row.push(entry.total.to_string());
            writer.write_record(&row)?;
        }

        writer.flush()?;
        debug!(path = %self.path.display(), entries = self.entries.len(), "saved tracking data");
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Tracked size ids
    pub fn sizes(&self) -> &[u32] {
        &self.sizes
    }

    pub fn entries(&self) -> &[DailyEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Add an entry, replacing any earlier one for the same date and
    /// institution. Untracked sizes are rejected; tracked sizes missing from
    /// the entry are recorded as zero.
    pub fn record(&mut self, mut entry: DailyEntry) -> Result<()> {
        if let Some(size) = entry.sizes.keys().find(|s| !self.sizes.contains(*s)) {
            return Err(ForecastError::InvalidParameter(format!(
                "Size {} is not tracked",
                size
            )));
        }
        for &size in &self.sizes {
            entry.sizes.entry(size).or_insert(0);
        }

        let before = self.entries.len();
        self.entries.retain(|e| e.key() != entry.key());
        if self.entries.len() < before {
            debug!(date = %entry.date, institution = %entry.institution, "replaced existing entry");
        }

        self.entries.push(entry);
        Ok(())
    }

    /// Remove the entries at `indices`; returns how many were removed
    pub fn delete(&mut self, indices: &[usize]) -> Result<usize> {
        if indices.is_empty() {
            return Err(ForecastError::InvalidParameter(
                "No entries selected for deletion".to_string(),
            ));
        }
        if let Some(&bad) = indices.iter().find(|&&i| i >= self.entries.len()) {
            return Err(ForecastError::InvalidParameter(format!(
                "Entry {} does not exist; the ledger has {} entries",
                bad,
                self.entries.len()
            )));
        }

        let before = self.entries.len();
        let mut index = 0;
        self.entries.retain(|_| {
            let keep = !indices.contains(&index);
            index += 1;
            keep
        });

        Ok(before - self.entries.len())
    }

    /// Entries for one institution, in ledger order
    pub fn entries_for(&self, institution: &str) -> Vec<&DailyEntry> {
        self.entries
            .iter()
            .filter(|e| e.institution == institution)
            .collect()
    }

    /// Distinct dates recorded for one institution, in ledger order
    pub fn dates_for(&self, institution: &str) -> Vec<NaiveDate> {
        let mut dates: Vec<NaiveDate> = Vec::new();
        for entry in self.entries_for(institution) {
            if !dates.contains(&entry.date) {
                dates.push(entry.date);
            }
        }
        dates
    }

    /// The last two recorded dates, the default comparison
    pub fn default_comparison_dates(&self, institution: &str) -> Vec<NaiveDate> {
        let dates = self.dates_for(institution);
        dates[dates.len().saturating_sub(2)..].to_vec()
    }

    /// Entries of one institution on the given dates, newest first
    pub fn compare(&self, institution: &str, dates: &[NaiveDate]) -> Vec<&DailyEntry> {
        let mut selected: Vec<&DailyEntry> = self
            .entries_for(institution)
            .into_iter()
            .filter(|e| dates.contains(&e.date))
            .collect();
        selected.sort_by(|a, b| b.date.cmp(&a.date));
        selected
    }

    /// The ledger as flat sales rows, ready for a series store
    pub fn to_records(&self) -> Vec<SalesRecord> {
        self.entries
            .iter()
            .map(|e| SalesRecord {
                institution: e.institution.clone(),
                date: e.date,
                total: f64::from(e.total),
                sizes: e.sizes.iter().map(|(&s, &q)| (s, f64::from(q))).collect(),
            })
            .collect()
    }
}

fn parse_quantity(raw: &str, row: usize) -> Result<u32> {
    if raw.is_empty() {
        return Ok(0);
    }
    // Files written by spreadsheet tools sometimes carry "3.0"
    let value: f64 = raw.parse().map_err(|_| {
        ForecastError::DataError(format!("Row {}: '{}' is not a quantity", row, raw))
    })?;
    if !value.is_finite() || value < 0.0 || value.fract() != 0.0 || value > f64::from(u32::MAX) {
        return Err(ForecastError::DataError(format!(
            "Row {}: '{}' is not a whole non-negative quantity",
            row, raw
        )));
    }
    Ok(value as u32)
}
