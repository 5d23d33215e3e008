//! Output module for store summaries
//!
//! This module handles collecting and printing the counts shown by the
//! `stats` command.

pub mod stats;

pub use stats::{load_statistics, print_statistics, StoreStatistics};
