//! In-memory entity store for routines, workout days and exercises
//!
//! [`EntityStore`] owns the single authoritative [`StoreState`] and exposes
//! the mutation operations. Every effective mutation replaces the touched
//! collection with a new one and publishes a [`StoreSnapshot`] to
//! subscribers; no-op mutations publish nothing.
//!
//! [`StoreHandle`] serializes access to a [`crate::workspace::Workspace`]
//! from concurrent tasks.

pub mod actor;
pub mod error;
pub mod state;
pub mod types;


pub use actor::{ActorError, ActorResult, StoreHandle};
pub use error::{ReferenceKind, StoreError, StoreResult};
pub use state::EntityStore;
pub use types::{
    Exercise, Prescription, ReferencePolicy, Routine, StoreSnapshot, StoreState, WorkoutDay,
    WorkoutDayExercise, DEFAULT_ROUTINE_NAME,
};
