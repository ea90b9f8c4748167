use crate::detector::{Counts, Tally};
use crate::geometry::Crossing;
use crate::store::CrossingRow;

use chrono::NaiveDateTime;
use std::fmt;

/// Opaque reference to a statistics object owned by the pipeline worker.
/// The producer can only pass it along.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StatsHandle(pub(crate) usize);

impl fmt::Display for StatsHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stats#{}", self.0)
    }
}

/// Immutable snapshot taken the moment a crossing is detected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrossingEvent {
    pub timestamp: NaiveDateTime,
    pub crossing: Crossing,
    pub counts: Counts,
    pub stats: StatsHandle,
}

impl CrossingEvent {
    pub fn new(timestamp: NaiveDateTime, tally: &Tally, stats: StatsHandle) -> Self {
        Self {
            timestamp,
            crossing: tally.crossing,
            counts: tally.counts,
            stats,
        }
    }

    pub fn row(&self) -> CrossingRow {
        CrossingRow {
            timestamp: self.timestamp,
            in_count: self.counts.in_count,
            out_count: self.counts.out_count,
            occupancy: self.counts.occupancy(),
        }
    }
}
