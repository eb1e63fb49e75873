//! # CacheDB Core
//!
//! An in-memory key-value store with per-entry TTL, driven by a small line protocol.
//!
//! ## Features
//!
//! - Thread-safe storage using `DashMap`
//! - Expired entries are hidden on read, the moment their TTL elapses
//! - Background sweep task per store instance that reclaims expired entries
//! - Eight commands: `PUT`, `MPUT`, `GET`, `MGET`, `DEL`, `MDEL`, `SAVE`, `POP`
//! - Pluggable snapshot sink for `SAVE` (one JSON file per key by default)
//!
//! ## Example
//!
//! ```rust,no_run
//! use cachedb_core::{Dispatcher, FileSnapshotSink, Store, StoreConfig};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = StoreConfig::default()
//!         .with_sweep_interval(Duration::from_secs(1));
//!     let store = Store::with_config(config);
//!     let dispatcher = Dispatcher::new(store.clone(), FileSnapshotSink::new("generated"));
//!
//!     println!("{}", dispatcher.process("PUT user123 { username: JohnDoe, userdata: SampleData }"));
//!     println!("{}", dispatcher.process("GET user123")); // JohnDoe
//!     println!("{}", dispatcher.process("SAVE user123")); // SUCCESS
//!
//!     store.shutdown().await;
//! }
//! ```

mod command;
mod config;
mod dispatcher;
mod entry;
mod response;
mod snapshot;
mod store;

pub use command::{BatchItem, Command, ParseError, Record, DEFAULT_TTL_SECONDS};
pub use config::StoreConfig;
pub use dispatcher::Dispatcher;
pub use entry::{Entry, MAX_TTL_SECONDS};
pub use response::Response;
pub use snapshot::{FileSnapshotSink, SnapshotError, SnapshotSink, DEFAULT_SNAPSHOT_DIR};
pub use store::Store;
