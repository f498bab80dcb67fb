//! Personal workout tracking: an exercise catalog, workout plans, logged
//! sessions, and date-bucketed training statistics over a pluggable
//! collection store.

pub mod cli;
pub mod clock;
pub mod commands;
pub mod config;
pub mod db;
pub mod error;
pub mod media;
pub mod models;
pub mod query;
pub mod repository;
pub mod stats;
pub mod storage;
pub mod types;
pub mod utils;

pub use error::{StoreError, StoreResult};
pub use repository::Repository;
pub use types::OutputFmt;
