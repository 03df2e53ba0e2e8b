use chrono::NaiveDate;
use sales_forecast::{forecast, ForecastReport, Observation, Series};
use std::collections::BTreeMap;
use tempfile::NamedTempFile;

fn report(totals: &[f64]) -> ForecastReport {
    let observations = totals
        .iter()
        .enumerate()
        .map(|(i, &total)| {
            Observation::new(
                NaiveDate::from_ymd_opt(2019 + i as i32, 1, 1).unwrap(),
                total,
                BTreeMap::from([(9, total * 0.5), (10, total * 0.5)]),
            )
        })
        .collect();
    forecast(&Series::new("Outlet Store", observations).unwrap(), 2).unwrap()
}

fn read_rows(csv_text: &str) -> Vec<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_reader(csv_text.as_bytes());
    reader
        .records()
        .map(|r| r.unwrap().iter().map(str::to_string).collect())
        .collect()
}

#[test]
fn test_csv_export_layout() {
    let report = report(&[100.0, 120.0, 140.0]);

    let rows = read_rows(&report.to_csv_string().unwrap());

    assert_eq!(rows[0], vec!["Size", "Trend Forecast", "SMA Forecast"]);
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[1][0], "9");
    assert_eq!(rows[1][2], "65");
    let trend_cell: i64 = rows[1][1].parse().unwrap();
    assert!(trend_cell > 65);
}

#[test]
fn test_csv_export_leaves_missing_trend_empty() {
    let report = report(&[50.0, 50.0, 50.0]);

    let rows = read_rows(&report.to_csv_string().unwrap());

    assert_eq!(rows[1], vec!["9", "", "25"]);
    assert_eq!(rows[2], vec!["10", "", "25"]);
}

#[test]
fn test_write_csv_to_file() {
    let report = report(&[100.0, 120.0]);
    let file = NamedTempFile::new().unwrap();

    report.write_csv(file.path()).unwrap();

    let contents = std::fs::read_to_string(file.path()).unwrap();
    assert!(contents.starts_with("Size,Trend Forecast,SMA Forecast\n"));
    assert_eq!(report.export_file_name(), "Outlet Store_forecast.csv");
}

#[test]
fn test_json_export() {
    let report = report(&[50.0, 50.0]);

    let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();

    assert_eq!(json["institution"], "Outlet Store");
    assert!(json["trend"].is_null());
    assert_eq!(json["moving_average"]["method"], "moving_average");
    assert_eq!(json["moving_average"]["total"], 50);
    assert_eq!(json["diagnostics"][0]["kind"], "trend_unavailable");
}
