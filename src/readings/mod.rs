use chrono::NaiveDateTime;
use thiserror::Error;
use tokio::time;

use std::future::Future;
use std::num::ParseFloatError;
use std::time::Duration;

use crate::timestream::{QueryService, Row};

pub const LATEST_READINGS_QUERY: &str =
    r#"SELECT * FROM "EnvironmentalMonitoring"."SensorData" ORDER BY time DESC LIMIT 10"#;

/// Positional layout of a `SensorData` row.
pub const COLUMN_NAMES: [&str; 6] = [
    "DeviceId",
    "MeasureName",
    "Time",
    "Temperature",
    "Humidity",
    "AirQuality",
];

const TIME_INPUT_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";
const TIME_OUTPUT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SensorReading {
    pub device_id: Option<String>,
    pub measure_name: Option<String>,
    pub time: Option<String>,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub air_quality: Option<f64>,
}

#[derive(Error, Debug)]
pub enum ShapeError {
    #[error("expected {} columns, row has {}", COLUMN_NAMES.len(), .0)]
    ColumnCount(usize),
    #[error("cannot parse Time {value:?}: {source}")]
    Timestamp {
        value: String,
        source: chrono::ParseError,
    },
    #[error("cannot parse {column} {value:?}: {source}")]
    Number {
        column: &'static str,
        value: String,
        source: ParseFloatError,
    },
}

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("endpoint discovery failed: {0}")]
    EndpointDiscovery(String),
    #[error("query execution failed: {0}")]
    QueryExecution(String),
    #[error("row {row} could not be shaped: {source}")]
    RowShape { row: usize, source: ShapeError },
}

/// Large magnitudes are returned as is, scaling them by 1000 can overflow.
fn round_3(value: f64) -> f64 {
    if value.abs() >= 1e15 || !value.is_finite() {
        return value;
    }
    (value * 1000.0).round() / 1000.0
}

fn shape_time(value: &str) -> Result<String, ShapeError> {
    NaiveDateTime::parse_from_str(value, TIME_INPUT_FORMAT)
        .map(|time| time.format(TIME_OUTPUT_FORMAT).to_string())
        .map_err(|source| ShapeError::Timestamp {
            value: value.to_owned(),
            source,
        })
}

fn shape_number(column: &'static str, value: &str) -> Result<f64, ShapeError> {
    value
        .trim()
        .parse::<f64>()
        .map(round_3)
        .map_err(|source| ShapeError::Number {
            column,
            value: value.to_owned(),
            source,
        })
}

/// Converts one positional result row into a `SensorReading`.
///
/// Columns without a scalar value become `None`; they are never an error.
pub fn shape_row(row: &Row) -> Result<SensorReading, ShapeError> {
    let [device_id, measure_name, time, temperature, humidity, air_quality] = row.data.as_slice()
    else {
        return Err(ShapeError::ColumnCount(row.data.len()));
    };

    let number = |column, value: Option<&str>| value.map(|v| shape_number(column, v)).transpose();

    Ok(SensorReading {
        device_id: device_id.scalar_value.clone(),
        measure_name: measure_name.scalar_value.clone(),
        time: time.scalar_value.as_deref().map(shape_time).transpose()?,
        temperature: number(COLUMN_NAMES[3], temperature.scalar_value.as_deref())?,
        humidity: number(COLUMN_NAMES[4], humidity.scalar_value.as_deref())?,
        air_quality: number(COLUMN_NAMES[5], air_quality.scalar_value.as_deref())?,
    })
}

async fn bounded<T, F>(limit: Duration, call: F) -> Result<T, String>
where
    F: Future<Output = anyhow::Result<T>>,
{
    match time::timeout(limit, call).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(format!("{e:#}")),
        Err(_) => Err(format!("timed out after {limit:?}")),
    }
}

/// Fetches the ten most recent readings, most recent first.
///
/// Any failure aborts the whole fetch; there are no partial results.
pub async fn fetch_latest_readings<S: QueryService>(
    service: &S,
    timeout: Duration,
) -> Result<Vec<SensorReading>, FetchError> {
    let endpoints = bounded(timeout, service.describe_endpoints())
        .await
        .map_err(FetchError::EndpointDiscovery)?;
    let endpoint = endpoints
        .first()
        .ok_or_else(|| FetchError::EndpointDiscovery("service returned no endpoints".to_owned()))?;
    log::debug!("Using query endpoint {}", endpoint.address);

    let client = service.bind(&endpoint.address);

    let rows = bounded(timeout, client.query(LATEST_READINGS_QUERY))
        .await
        .map_err(FetchError::QueryExecution)?;
    log::debug!("Query response: {rows:?}");

    let readings = rows
        .iter()
        .enumerate()
        .map(|(row, data)| shape_row(data).map_err(|source| FetchError::RowShape { row, source }))
        .collect::<Result<Vec<_>, _>>()?;
    log::debug!("Processed rows: {readings:?}");

    Ok(readings)
}
