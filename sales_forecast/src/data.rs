//! Loading flat sales tables
//!
//! Both the annual history (`Institution, Sale_Date, Total_Sales, Size_<n>`)
//! and the daily ledger (`Date, Institution, Size_<n>, Total`) reduce to a
//! list of [`SalesRecord`]s, which is what the series store works from.

use crate::error::{ForecastError, Result};
use chrono::NaiveDate;
use polars::prelude::{CsvReader, DataFrame, DataType, SerReader};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;
use tracing::debug;

/// Prefix of per-size quantity columns
pub const SIZE_COLUMN_PREFIX: &str = "Size_";

const INSTITUTION_COLUMNS: [&str; 1] = ["Institution"];
const DATE_COLUMNS: [&str; 2] = ["Sale_Date", "Date"];
const TOTAL_COLUMNS: [&str; 2] = ["Total_Sales", "Total"];

/// Accepted date layouts, day-first as written by the sales export
const DATE_FORMATS: [&str; 2] = ["%d-%m-%Y", "%Y-%m-%d"];

/// One row of a flat sales table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesRecord {
    pub institution: String,
    pub date: NaiveDate,
    pub total: f64,
    /// Per-size quantities; sizes with an empty cell are absent
    pub sizes: BTreeMap<u32, f64>,
}

/// A loaded flat table
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SalesTable {
    records: Vec<SalesRecord>,
    sizes: Vec<u32>,
}

impl SalesTable {
    pub fn new(records: Vec<SalesRecord>, sizes: Vec<u32>) -> Self {
        Self { records, sizes }
    }

    /// Rows in file order
    pub fn records(&self) -> &[SalesRecord] {
        &self.records
    }

    /// Size ids of the table's size columns, in column order
    pub fn sizes(&self) -> &[u32] {
        &self.sizes
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn into_records(self) -> Vec<SalesRecord> {
        self.records
    }
}

/// Data loader for sales tables
#[derive(Debug)]
pub struct DataLoader;

impl DataLoader {
    /// Load a sales table from a CSV file
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<SalesTable> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let df = CsvReader::new(file)
            .infer_schema(None)
            .has_header(true)
            .finish()?;

        debug!(path = %path.display(), rows = df.height(), "loaded sales csv");
        Self::from_dataframe(&df)
    }

    /// Read a sales table out of an existing DataFrame
    pub fn from_dataframe(df: &DataFrame) -> Result<SalesTable> {
        let institution_column = Self::find_column(df, &INSTITUTION_COLUMNS)?;
        let date_column = Self::find_column(df, &DATE_COLUMNS)?;
        let total_column = Self::find_column(df, &TOTAL_COLUMNS)?;
        let size_columns = Self::detect_size_columns(df)?;

        let institutions = Self::text_column(df, &institution_column)?;
        let dates = Self::text_column(df, &date_column)?;
        let totals = Self::numeric_column(df, &total_column)?;
        let size_values = size_columns
            .iter()
            .map(|(name, _)| Self::numeric_column(df, name))
            .collect::<Result<Vec<_>>>()?;

        let mut records = Vec::with_capacity(df.height());
        for row in 0..df.height() {
            let institution = institutions[row].clone().ok_or_else(|| {
                ForecastError::DataError(format!("Row {} has no institution", row + 1))
            })?;
            let raw_date = dates[row].as_deref().ok_or_else(|| {
                ForecastError::DataError(format!("Row {} has no date", row + 1))
            })?;
            let date = parse_date(raw_date)?;
            let total = totals[row].ok_or_else(|| {
                ForecastError::DataError(format!("Row {} has no total", row + 1))
            })?;

            let sizes = size_columns
                .iter()
                .zip(size_values.iter())
                .filter_map(|((_, size), values)| values[row].map(|q| (*size, q)))
                .collect();

            records.push(SalesRecord {
                institution,
                date,
                total,
                sizes,
            });
        }

        Ok(SalesTable {
            records,
            sizes: size_columns.into_iter().map(|(_, size)| size).collect(),
        })
    }

    /// Find the first of the candidate column names present in the frame
    fn find_column(df: &DataFrame, candidates: &[&str]) -> Result<String> {
        let column_names = df.get_column_names();
        candidates
            .iter()
            .find(|c| column_names.contains(*c))
            .map(|c| c.to_string())
            .ok_or_else(|| {
                ForecastError::DataError(format!(
                    "None of the columns {:?} found in data",
                    candidates
                ))
            })
    }

    /// Detect `Size_<n>` columns and their size ids
    fn detect_size_columns(df: &DataFrame) -> Result<Vec<(String, u32)>> {
        let mut size_columns = Vec::new();
        for name in df.get_column_names() {
            if let Some(size) = parse_size_column(name) {
                size_columns.push((name.to_string(), size?));
            }
        }

        if size_columns.is_empty() {
            return Err(ForecastError::DataError(
                "No size columns found in data".to_string(),
            ));
        }

        Ok(size_columns)
    }

    fn text_column(df: &DataFrame, column_name: &str) -> Result<Vec<Option<String>>> {
        let col = df.column(column_name).map_err(|e| {
            ForecastError::DataError(format!("Column '{}' not found: {}", column_name, e))
        })?;
        let col = col.cast(&DataType::Utf8)?;
        Ok(col
            .utf8()?
            .into_iter()
            .map(|v| v.map(|s| s.trim().to_string()))
            .collect())
    }

    fn numeric_column(df: &DataFrame, column_name: &str) -> Result<Vec<Option<f64>>> {
        let col = df.column(column_name).map_err(|e| {
            ForecastError::DataError(format!("Column '{}' not found: {}", column_name, e))
        })?;
        if !col.dtype().is_numeric() {
            return Err(ForecastError::DataError(format!(
                "Column '{}' cannot be converted to f64",
                column_name
            )));
        }
        let col = col.cast(&DataType::Float64)?;
        Ok(col.f64()?.into_iter().collect())
    }
}

/// Parse the size id out of a `Size_<n>` header.
///
/// Returns `None` for headers that are not size columns and an error for a
/// size column with a malformed suffix.
pub fn parse_size_column(name: &str) -> Option<Result<u32>> {
    name.strip_prefix(SIZE_COLUMN_PREFIX).map(|suffix| {
        suffix.trim().parse::<u32>().map_err(|_| {
            ForecastError::DataError(format!("Invalid size column '{}'", name))
        })
    })
}

/// Header of the quantity column for `size`
pub fn size_column_name(size: u32) -> String {
    format!("{}{}", SIZE_COLUMN_PREFIX, size)
}

/// Parse a day-first (`dd-mm-yyyy`) or ISO date
pub fn parse_date(raw: &str) -> Result<NaiveDate> {
    let raw = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .ok_or_else(|| ForecastError::DataError(format!("Unrecognised date '{}'", raw)))
}
