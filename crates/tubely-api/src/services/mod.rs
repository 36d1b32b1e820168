//! Business logic services.

pub mod ingest;

pub use ingest::IngestService;
