//! Shared utilities: Arrow column access, Parquet and CSV IO, logging

pub mod arrow;
pub mod io;
pub mod logging;
