//! State module for tracking frontier progress
//!
//! `QueueStatus` is the lifecycle of a crawl queue row. All frontier state
//! lives in the relational store, so this module holds no mutable state.

mod queue_status;

pub use queue_status::QueueStatus;
