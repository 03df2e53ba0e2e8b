use chrono::NaiveDate;
use sales_forecast::{forecast, SalesRecord, SeriesStore};
use std::collections::BTreeMap;

fn record(year: i32, sizes: &[(u32, f64)]) -> SalesRecord {
    SalesRecord {
        institution: "Retail Store A".to_string(),
        date: NaiveDate::from_ymd_opt(year, 1, 1).expect("valid date"),
        total: sizes.iter().map(|(_, q)| q).sum(),
        sizes: sizes.iter().copied().collect::<BTreeMap<_, _>>(),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let store = SeriesStore::new(vec![
        record(2021, &[(8, 20.0), (9, 30.0), (10, 50.0)]),
        record(2022, &[(8, 26.0), (9, 35.0), (10, 59.0)]),
        record(2023, &[(8, 30.0), (9, 42.0), (10, 71.0)]),
    ]);

    let series = store.series("Retail Store A")?;
    let report = forecast(&series, 2)?;

    println!("Forecast for {} on {}", report.institution(), report.target_date());
    for result in report.results() {
        println!("{:>6}: {} pairs", result.method().label(), result.total());
    }
    for diagnostic in report.diagnostics() {
        println!("note: {}", diagnostic);
    }

    print!("{}", report.to_csv_string()?);
    Ok(())
}
