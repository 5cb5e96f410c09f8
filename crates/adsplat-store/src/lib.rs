//! # adsplat-store
//!
//! Persistent key-value storage for the console client.
//!
//! Holds the session token and the JSON mirrors of the client caches. Values
//! are opaque strings; callers own their serialization. Two backends implement
//! [`KvStore`]: an in-process [`MemoryStore`] and a SQLite-backed
//! [`SqliteStore`] that survives restarts.

pub mod database;
pub mod kv;
pub mod migrations;

mod error;

pub use database::SqliteStore;
pub use error::StoreError;
pub use kv::{KvStore, MemoryStore};
