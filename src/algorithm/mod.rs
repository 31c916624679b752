//! Cohort algorithms

pub mod sab;
