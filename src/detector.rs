use crate::frame::Frame;
use crate::geometry::{Crossing, LineSet, Point};
use crate::track::TrackId;

use serde_derive::{Deserialize, Serialize};
use std::collections::HashMap;

/// Cumulative crossing counters. Occupancy is derived and may go negative
/// when an exit is seen before its matching entry.
#[derive(Serialize, Deserialize, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Counts {
    pub in_count: u64,
    pub out_count: u64,
}

impl Counts {
    #[inline]
    pub fn occupancy(&self) -> i64 {
        self.in_count as i64 - self.out_count as i64
    }

    fn apply(&mut self, crossing: Crossing) {
        match crossing {
            Crossing::Entered => self.in_count += 1,
            Crossing::Exited => self.out_count += 1,
        }
    }
}

/// A single fired crossing with the counters right after it was applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tally {
    pub track_id: TrackId,
    pub crossing: Crossing,
    pub counts: Counts,
}

#[derive(Debug, Clone, Copy)]
struct Seen {
    center: Point,
    frame: u64,
}

#[derive(Debug, Default)]
pub struct CrossingDetector {
    seen: HashMap<TrackId, Seen>,
    counts: Counts,
    frame: u64,
    max_missed_frames: Option<u64>,
}

impl CrossingDetector {
    pub fn new(max_missed_frames: Option<u64>) -> Self {
        Self {
            max_missed_frames,
            ..Default::default()
        }
    }

    #[inline]
    pub fn counts(&self) -> Counts {
        self.counts
    }

    #[inline]
    pub fn known_tracks(&self) -> usize {
        self.seen.len()
    }

    /// Compares `center` with the last known center of `track_id`. The first
    /// sighting of an id only records its position.
    pub fn observe(&mut self, track_id: TrackId, center: Point, lines: &LineSet) -> Vec<Tally> {
        let frame = self.frame;
        let prev = self.seen.insert(track_id, Seen { center, frame });

        let prev = match prev {
            Some(prev) => prev.center,
            None => return Vec::new(),
        };

        lines
            .crossings(&prev, &center)
            .into_iter()
            .map(|crossing| {
                self.counts.apply(crossing);

                Tally {
                    track_id,
                    crossing,
                    counts: self.counts,
                }
            })
            .collect()
    }

    /// Runs one frame of tracker output: every confirmed track of `class`
    /// is observed in tracker order, then stale tracks are evicted.
    pub fn update(&mut self, frame: &Frame, lines: &LineSet, class: i32) -> Vec<Tally> {
        self.frame += 1;

        let mut tallies = Vec::new();
        for track in frame.tracks_of_class(class) {
            tallies.extend(self.observe(track.track_id, track.bbox.center(), lines));
        }

        if let Some(max_missed) = self.max_missed_frames {
            let now = self.frame;
            self.seen.retain(|_, s| now - s.frame <= max_missed);
        }

        tallies
    }
}
