//! Durable storage of the store state
//!
//! The whole state lives in one named slot of a byte-string key-value
//! store, wrapped in a versioned envelope:
//!
//! ```json
//! { "version": 5, "state": { "routines": [], "workoutDays": [], "exercises": [], "workoutDayExercises": [] } }
//! ```
//!
//! The `version` tag is authoritative. Payloads written by an older build
//! go through [`migrate`] before the state is trusted.

pub mod adapter;
pub mod error;
pub mod kv;
pub mod migrate;

pub use adapter::{LoadOutcome, LoadedState, PersistenceAdapter, DEFAULT_SLOT};
pub use error::{PersistenceError, PersistenceResult};
pub use kv::{FileKeyValueStore, KeyValueStore, MemoryKeyValueStore};
pub use migrate::{MigrationOutcome, CURRENT_VERSION};
