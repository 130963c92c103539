//! Market data ingestion

pub mod ingest;

pub use ingest::{
    dataset_hash, load_csv, parse_timestamp, read_csv, rows_to_events, DataError, MarketRow,
};
