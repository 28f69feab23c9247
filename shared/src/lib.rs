//! Shared library for the CCR calendar Lambda functions.
//!
//! This crate provides configuration, the record store clients, and HTTP helpers.

pub mod config;
pub mod db;
pub mod error;
pub mod http;
pub mod models;
pub mod rest;
pub mod secrets;
pub mod store;

pub use config::{Config, StoreBackend, StoreCredential};
pub use db::PgRecordStore;
pub use error::{Error, Result};
pub use models::{CalendarPayload, CalendarRecord, SaveRequest, SaveResponse, VerifyRequest, VerifyResponse, RECORD_ID};
pub use rest::RestRecordStore;
pub use secrets::{get_secret, resolve_store_credential};
pub use store::{connect, MemoryRecordStore, RecordStore};
