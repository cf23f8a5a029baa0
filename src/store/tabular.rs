//! Polars-backed table view of the store: DataFrame conversion, CSV export and CSV import.

use crate::store::error::TableError;
use crate::store::measurement_store::MeasurementStore;
use crate::types::record::{RawRow, Record, RowResult, DATUM_FORMAT, RECORD_FIELDS};
use chrono::NaiveDateTime;
use log::info;
use polars::prelude::*;
use std::collections::HashMap;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Builds a DataFrame with one column per record field, in wire order.
pub(crate) fn records_to_dataframe(records: &[Record]) -> Result<DataFrame, TableError> {
    let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
    let dates: Vec<NaiveDateTime> = records.iter().map(|r| r.date).collect();
    let temperature: Vec<f64> = records.iter().map(|r| r.temperature).collect();
    let precipitation: Vec<f64> = records.iter().map(|r| r.precipitation).collect();
    let sunshine: Vec<f64> = records.iter().map(|r| r.sunshine_hours).collect();
    let sources: Vec<String> = records.iter().map(|r| r.source.to_string()).collect();
    let locations: Vec<&str> = records.iter().map(|r| r.location.as_str()).collect();
    let temp_min: Vec<Option<f64>> = records.iter().map(|r| r.temp_min).collect();
    let temp_max: Vec<Option<f64>> = records.iter().map(|r| r.temp_max).collect();

    let [
        id_name,
        date_name,
        temperature_name,
        precipitation_name,
        sunshine_name,
        source_name,
        location_name,
        temp_min_name,
        temp_max_name,
    ] = RECORD_FIELDS;
    DataFrame::new(vec![
        Column::new(id_name.into(), ids),
        Column::new(date_name.into(), dates),
        Column::new(temperature_name.into(), temperature),
        Column::new(precipitation_name.into(), precipitation),
        Column::new(sunshine_name.into(), sunshine),
        Column::new(source_name.into(), sources),
        Column::new(location_name.into(), locations),
        Column::new(temp_min_name.into(), temp_min),
        Column::new(temp_max_name.into(), temp_max),
    ])
    .map_err(TableError::Frame)
}

impl MeasurementStore {
    /// The sorted table view as a Polars `DataFrame`, `Datum` typed as a datetime column.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::Frame`] if Polars rejects the column set.
    pub fn to_dataframe(&self) -> Result<DataFrame, TableError> {
        records_to_dataframe(&self.as_table())
    }

    /// Writes the sorted table view as CSV with a header row of record field names.
    ///
    /// # Errors
    ///
    /// Returns [`TableError`] if the frame cannot be built or the writer fails.
    pub fn write_csv<W: Write>(&self, writer: &mut W) -> Result<(), TableError> {
        let mut df = self.to_dataframe()?;
        CsvWriter::new(writer)
            .include_header(true)
            .with_datetime_format(Some(DATUM_FORMAT.to_string()))
            .finish(&mut df)
            .map_err(TableError::CsvWrite)
    }

    /// Same as [`MeasurementStore::write_csv`], collected into a `String`.
    pub fn to_csv_string(&self) -> Result<String, TableError> {
        let mut buffer = Vec::new();
        self.write_csv(&mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

/// Reads a CSV file (header row required) into inbound rows for
/// [`MeasurementStore::import_rows`].
///
/// Columns are matched by name, so column order and extra columns do not matter. A
/// semicolon-separated file is detected from its header line. Every cell is read as text and
/// interpreted per field, so a row with a malformed number becomes an `Err` entry rather than
/// failing the whole file.
///
/// # Errors
///
/// Returns [`TableError::CsvRead`] if the file cannot be parsed as CSV at all.
pub fn read_csv_rows(path: &Path) -> Result<Vec<RowResult>, TableError> {
    let separator = sniff_separator(path);
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .map_parse_options(|options| options.with_separator(separator))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .map_err(|e| TableError::CsvRead(path.to_path_buf(), e))?
        .finish()
        .map_err(|e| TableError::CsvRead(path.to_path_buf(), e))?;
    info!("Read {} CSV rows from {}", df.height(), path.display());
    dataframe_to_rows(&df).map_err(|e| TableError::CsvRead(path.to_path_buf(), e))
}

/// Reads CSV content held in memory, e.g. an uploaded file.
pub fn read_csv_rows_from_bytes(bytes: &[u8]) -> Result<Vec<RowResult>, TableError> {
    let mut temp_file = NamedTempFile::new().map_err(TableError::StagingIo)?;
    temp_file.write_all(bytes).map_err(TableError::StagingIo)?;
    temp_file.flush().map_err(TableError::StagingIo)?;
    read_csv_rows(temp_file.path())
}

fn sniff_separator(path: &Path) -> u8 {
    let header = std::fs::read_to_string(path)
        .ok()
        .and_then(|content| content.lines().next().map(str::to_string))
        .unwrap_or_default();
    if header.contains(';') && !header.contains(',') {
        b';'
    } else {
        b','
    }
}

fn dataframe_to_rows(df: &DataFrame) -> PolarsResult<Vec<RowResult>> {
    let mut columns: HashMap<&str, &StringChunked> = HashMap::new();
    for column in df.get_columns() {
        columns.insert(column.name().as_str(), column.as_materialized_series().str()?);
    }

    let rows = (0..df.height())
        .map(|i| {
            RawRow::from_lookup(|names: &[&str]| {
                names.iter().find_map(|name| {
                    columns
                        .get(name)
                        .and_then(|values| values.get(i))
                        .map(|cell| cell.to_string())
                })
            })
        })
        .collect();
    Ok(rows)
}
