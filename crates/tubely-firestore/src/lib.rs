//! Firestore REST API client.
//!
//! This crate provides:
//! - The `VideoStore` seam over persisted video records
//! - A Firestore-backed `VideoRepository`
//! - Service account authentication via gcp_auth, or the local emulator

pub mod client;
pub mod error;
pub mod metrics;
pub mod repos;
pub mod token_cache;
pub mod types;

pub use client::{FirestoreClient, FirestoreConfig};
pub use error::{FirestoreError, FirestoreResult};
pub use repos::{VideoRepository, VideoStore, VIDEOS_COLLECTION};
pub use types::{Document, FromFirestoreValue, ToFirestoreValue, Value};
