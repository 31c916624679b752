//! Event collections
//!
//! Indexes the flat input streams by encounter so every per-encounter
//! computation reads one small, time-sorted slice.

pub mod encounter;

pub use encounter::{EncounterEvents, EncounterIndex};
