//! Market data ingestion: rows and CSV into ordered [`MarketEvent`]s.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Deserialize;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::domain::{EventError, MarketEvent};

/// One observation before validation. Every field may be absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarketRow {
    pub timestamp: Option<DateTime<Utc>>,
    pub symbol: Option<String>,
    pub price: Option<f64>,
    pub volume: Option<f64>,
}

impl MarketRow {
    pub fn new(timestamp: DateTime<Utc>, symbol: impl Into<String>, price: f64, volume: f64) -> Self {
        Self {
            timestamp: Some(timestamp),
            symbol: Some(symbol.into()),
            price: Some(price),
            volume: Some(volume),
        }
    }
}

#[derive(Debug, Error)]
pub enum DataError {
    #[error("row {row}: missing {field}")]
    MissingField { row: usize, field: &'static str },

    #[error("row {row}: unparsable timestamp '{value}'")]
    InvalidTimestamp { row: usize, value: String },

    #[error("row {row}: {source}")]
    InvalidRow {
        row: usize,
        #[source]
        source: EventError,
    },

    #[error("row {row}: {source}")]
    Csv {
        row: usize,
        #[source]
        source: csv::Error,
    },

    #[error("failed to open {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl DataError {
    /// 1-based data row the error refers to, if any.
    pub fn row(&self) -> Option<usize> {
        match self {
            DataError::MissingField { row, .. }
            | DataError::InvalidTimestamp { row, .. }
            | DataError::InvalidRow { row, .. }
            | DataError::Csv { row, .. } => Some(*row),
            DataError::Io { .. } => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    timestamp: Option<String>,
    symbol: Option<String>,
    #[serde(alias = "close_price", alias = "price")]
    close: Option<f64>,
    volume: Option<f64>,
}

/// Converts rows to events in input order. No sorting, no deduplication.
/// The first invalid row rejects the whole dataset.
pub fn rows_to_events<I>(rows: I) -> Result<Vec<MarketEvent>, DataError>
where
    I: IntoIterator<Item = MarketRow>,
{
    rows.into_iter()
        .enumerate()
        .map(|(i, row)| row_to_event(i + 1, row))
        .collect()
}

fn row_to_event(row: usize, r: MarketRow) -> Result<MarketEvent, DataError> {
    let timestamp = r.timestamp.ok_or(DataError::MissingField {
        row,
        field: "timestamp",
    })?;
    let symbol = r
        .symbol
        .filter(|s| !s.trim().is_empty())
        .ok_or(DataError::MissingField { row, field: "symbol" })?;
    let price = r.price.ok_or(DataError::MissingField { row, field: "price" })?;
    let volume = r.volume.unwrap_or(0.0);

    MarketEvent::new(timestamp, symbol.trim(), price, volume)
        .map_err(|source| DataError::InvalidRow { row, source })
}

/// Parses RFC 3339, `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DDTHH:MM:SS`,
/// `YYYY-MM-DD` or integer epoch seconds. Naive forms are taken as UTC.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, fmt) {
            return Some(naive.and_utc());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
    }
    value
        .parse::<i64>()
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
}

/// Reads CSV with a `timestamp,symbol,close,volume` header.
/// `close_price` and `price` are accepted for the price column.
pub fn read_csv<R: Read>(reader: R) -> Result<Vec<MarketEvent>, DataError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut events = Vec::new();
    for (i, record) in reader.deserialize::<CsvRow>().enumerate() {
        let row = i + 1;
        let record = record.map_err(|source| DataError::Csv { row, source })?;
        let timestamp = match record.timestamp.as_deref() {
            None | Some("") => None,
            Some(raw) => Some(parse_timestamp(raw).ok_or_else(|| {
                DataError::InvalidTimestamp {
                    row,
                    value: raw.to_string(),
                }
            })?),
        };
        let market_row = MarketRow {
            timestamp,
            symbol: record.symbol,
            price: record.close,
            volume: record.volume,
        };
        events.push(row_to_event(row, market_row)?);
    }
    Ok(events)
}

/// Loads a CSV file. See [`read_csv`].
pub fn load_csv(path: &Path) -> Result<Vec<MarketEvent>, DataError> {
    let file = File::open(path).map_err(|source| DataError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    read_csv(file)
}

/// Deterministic BLAKE3 hash over the events in order.
pub fn dataset_hash(events: &[MarketEvent]) -> String {
    let mut hasher = blake3::Hasher::new();
    for event in events {
        let ts = event.timestamp();
        hasher.update(&ts.timestamp().to_le_bytes());
        hasher.update(&ts.timestamp_subsec_nanos().to_le_bytes());
        hasher.update(event.symbol().as_bytes());
        hasher.update(&[0]);
        hasher.update(&event.price().to_le_bytes());
        hasher.update(&event.volume().to_le_bytes());
    }
    hasher.finalize().to_hex().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_704_153_600 + secs, 0).unwrap()
    }

    #[test]
    fn rows_keep_input_order() {
        let rows = vec![
            MarketRow::new(ts(60), "ETH", 2_000.0, 5.0),
            MarketRow::new(ts(0), "BTC", 40_000.0, 1.0),
        ];
        let events = rows_to_events(rows).unwrap();
        assert_eq!(events[0].symbol(), "ETH");
        assert_eq!(events[1].symbol(), "BTC");
    }

    #[test]
    fn missing_volume_defaults_to_zero() {
        let row = MarketRow {
            volume: None,
            ..MarketRow::new(ts(0), "BTC", 100.0, 0.0)
        };
        let events = rows_to_events([row]).unwrap();
        assert_eq!(events[0].volume(), 0.0);
    }

    #[test]
    fn missing_price_names_the_row() {
        let rows = vec![
            MarketRow::new(ts(0), "BTC", 100.0, 1.0),
            MarketRow {
                price: None,
                ..MarketRow::new(ts(1), "BTC", 100.0, 1.0)
            },
        ];
        let err = rows_to_events(rows).unwrap_err();
        assert!(matches!(
            err,
            DataError::MissingField { row: 2, field: "price" }
        ));
    }

    #[test]
    fn blank_symbol_is_missing() {
        let row = MarketRow {
            symbol: Some("  ".into()),
            ..MarketRow::new(ts(0), "BTC", 100.0, 1.0)
        };
        let err = rows_to_events([row]).unwrap_err();
        assert!(matches!(err, DataError::MissingField { field: "symbol", .. }));
    }

    #[test]
    fn non_positive_price_rejected() {
        let err = rows_to_events([MarketRow::new(ts(0), "BTC", 0.0, 1.0)]).unwrap_err();
        assert!(matches!(err, DataError::InvalidRow { row: 1, .. }));
    }

    #[test]
    fn csv_with_aliases_and_formats() {
        let data = "\
timestamp,symbol,close_price,volume
2024-01-02T00:00:00Z,BTC,42000.5,1.5
2024-01-02 00:01:00,ETH,2300,
2024-01-03,BTC,42100,2
1704153600,ETH,2310,3
";
        let events = read_csv(data.as_bytes()).unwrap();
        assert_eq!(events.len(), 4);
        assert_eq!(events[0].price(), 42_000.5);
        assert_eq!(events[1].volume(), 0.0);
        assert_eq!(events[2].timestamp(), ts(86_400));
        assert_eq!(events[3].timestamp(), ts(0));
    }

    #[test]
    fn csv_bad_price_is_fatal() {
        let data = "timestamp,symbol,close,volume\n2024-01-02,BTC,abc,1\n";
        let err = read_csv(data.as_bytes()).unwrap_err();
        assert!(matches!(err, DataError::Csv { row: 1, .. }));
    }

    #[test]
    fn csv_bad_timestamp_is_fatal() {
        let data = "timestamp,symbol,close,volume\nyesterday,BTC,1,1\n";
        let err = read_csv(data.as_bytes()).unwrap_err();
        assert_eq!(err.row(), Some(1));
        assert!(matches!(err, DataError::InvalidTimestamp { .. }));
    }

    #[test]
    fn csv_negative_volume_is_fatal() {
        let data = "timestamp,symbol,close,volume\n2024-01-02,BTC,1,-1\n";
        let err = read_csv(data.as_bytes()).unwrap_err();
        assert!(matches!(err, DataError::InvalidRow { row: 1, .. }));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_csv(Path::new("/nonexistent/prices.csv")).unwrap_err();
        assert!(matches!(err, DataError::Io { .. }));
        assert_eq!(err.row(), None);
    }

    #[test]
    fn dataset_hash_is_order_sensitive() {
        let a = MarketEvent::new(ts(0), "BTC", 100.0, 1.0).unwrap();
        let b = MarketEvent::new(ts(1), "BTC", 101.0, 1.0).unwrap();
        let forward = dataset_hash(&[a.clone(), b.clone()]);
        assert_eq!(forward, dataset_hash(&[a.clone(), b.clone()]));
        assert_ne!(forward, dataset_hash(&[b, a]));
        assert_eq!(forward.len(), 64);
    }

    #[test]
    fn dataset_hash_sees_sub_millisecond_timestamps() {
        let whole = MarketEvent::new(ts(0), "BTC", 100.0, 1.0).unwrap();
        let shifted = DateTime::from_timestamp(0, 1_000).unwrap();
        let micro = MarketEvent::new(shifted, "BTC", 100.0, 1.0).unwrap();
        assert_ne!(dataset_hash(&[whole]), dataset_hash(&[micro]));
    }
}
