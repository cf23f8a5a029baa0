use std::error::Error;
use std::io::Write;
use wetterweiser::{read_csv_rows, MeasurementStore, Scope};

const SPREADSHEET: &str = "\
Datum;Temperatur;Niederschlag;Sonnenstunden;Quelle;Standort
2024-07-01;21.4;0;9.5;manuell;Kassel
2024-07-02;23.0;2.5;6.0;manuell;Kassel
2024-07-02;23.0;2.5;6.0;manuell;Kassel
2024-07-03;kaputt;0;4.0;manuell;Kassel
;19.0;0;3.0;manuell;Kassel
2024-07-03;17.8;11.2;1.5;wetterstation;Kassel
";

fn main() -> Result<(), Box<dyn Error>> {
    let mut file = tempfile::Builder::new().suffix(".csv").tempfile()?;
    file.write_all(SPREADSHEET.as_bytes())?;

    let mut store = MeasurementStore::new();
    let report = store.import_rows(read_csv_rows(file.path())?);
    println!(
        "imported {}, duplicates {}, skipped {}",
        report.imported,
        report.duplicates,
        report.skipped_count()
    );
    for line in report.skipped.iter().chain(&report.warnings) {
        println!("  {line}");
    }

    let analytics = store.analytics();
    let stats = analytics.year_statistics(&Scope::all());
    println!("mean temperature: {:?}", stats.mean_temperature);
    println!("total precipitation: {} mm", stats.total_precipitation);
    if let Some(extremes) = analytics.extremes(&Scope::location("Kassel")) {
        println!(
            "hottest {} ({} °C), coldest {} ({} °C)",
            extremes.hottest.date.date(),
            extremes.hottest.temp_max.unwrap_or_default(),
            extremes.coldest.date.date(),
            extremes.coldest.temp_min.unwrap_or_default()
        );
    }
    println!(
        "rain probability over the last 30 entries: {} %",
        analytics.rain_probability(30, &Scope::all())
    );

    println!("{}", store.to_csv_string()?);
    Ok(())
}
