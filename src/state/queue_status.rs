/// Queue status definitions for tracking frontier progress
///
/// Transitions: Pending -> Processing -> Completed | Failed, plus the
/// blacklist shortcut Pending -> Completed. Terminal rows are never
/// scheduled again.
use std::fmt;

/// Represents the current state of a crawl queue item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueueStatus {
    /// Discovered and waiting to be fetched
    Pending,

    /// Picked up by the worker
    Processing,

    /// Fetched and links processed, or skipped by the blacklist
    Completed,

    /// Fetch or processing error; never retried
    Failed,
}

impl QueueStatus {
    pub const ALL: [QueueStatus; 4] = [
        Self::Pending,
        Self::Processing,
        Self::Completed,
        Self::Failed,
    ];

    /// Returns true if this is a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Returns true if the item may still be processed
    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }

    /// Checks whether moving from `self` to `next` is allowed
    pub fn can_transition_to(&self, next: QueueStatus) -> bool {
        match (self, next) {
            (Self::Pending, Self::Processing) => true,
            (Self::Pending, Self::Completed) => true,
            (Self::Processing, Self::Completed) => true,
            (Self::Processing, Self::Failed) => true,
            // Recovery of an item interrupted mid-flight
            (Self::Processing, Self::Pending) => true,
            _ => false,
        }
    }

    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "processing" => Some(Self::Processing),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for QueueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_db_string())
    }
}
