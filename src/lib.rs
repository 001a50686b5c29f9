//! # Workout Planner
//!
//! Local store for training routines, their workout days, and the exercises
//! programmed into each day, with LLM-assisted import of photographed
//! exercise sheets.
//!
//! ## Usage
//!
//! ```bash
//! workout-planner routine new "Upper Lower"
//! workout-planner day new "Upper A"
//! workout-planner import sheet.txt "Lower A"
//! ```
//!
//! ## Modules
//!
//! - `store` - In-memory entity store, change notification, async handle
//! - `query` - Read-only lookups over store collections
//! - `persistence` - Versioned JSON envelope in a key-value slot, with migration
//! - `workspace` - A store bound to its slot; writes after every mutation
//! - `form` - Workout day form validation and commit
//! - `extraction` - Recognized text to validated exercise drafts via a model tool call
//! - `ids` - Identifier generation
//! - `app` - Configuration, logging, and error reporting for the binary
//! - `testing` - Mocks and fixtures for tests
pub mod app;
pub mod error;
pub mod extraction;
pub mod form;
pub mod ids;
pub mod persistence;
pub mod query;
pub mod store;
pub mod workspace;

pub mod testing;

pub use error::{Error, Result};
