pub mod bbox;
pub mod config;
pub mod detector;
pub mod editor;
pub mod error;
pub mod event;
pub mod frame;
pub mod geometry;
pub mod pipeline;
pub mod stats;
pub mod store;
pub mod track;

pub use detector::{Counts, CrossingDetector, Tally};
pub use event::{CrossingEvent, StatsHandle};
pub use frame::Frame;
pub use geometry::{Crossing, DualLines, LineSet};
pub use pipeline::{EventPipeline, PipelineReport};
pub use track::Track;

use config::CounterConfig;
use error::Error;
use store::{TimeoutStore, VisitStore};
use tracing::debug;

/// Counts line crossings frame by frame and hands every crossing to the
/// background pipeline. Lives on the frame loop.
pub struct LineCounter {
    detector: CrossingDetector,
    pipeline: EventPipeline,
    stats: StatsHandle,
    class: i32,
}

impl LineCounter {
    pub fn new<S: VisitStore + 'static>(store: S, config: &CounterConfig) -> Result<Self, Error> {
        let builder = match config.pipeline.write_timeout() {
            Some(timeout) => EventPipeline::builder(TimeoutStore::new(store, timeout)?),
            None => EventPipeline::builder(store),
        };

        let mut builder = builder.queue_capacity(config.pipeline.queue_capacity);
        let stats = builder.statistics(config.statistics.policy);

        Ok(Self {
            detector: CrossingDetector::new(config.detector.max_missed_frames),
            pipeline: builder.spawn()?,
            stats,
            class: config.detector.class,
        })
    }

    #[inline]
    pub fn counts(&self) -> Counts {
        self.detector.counts()
    }

    #[inline]
    pub fn stats_handle(&self) -> StatsHandle {
        self.stats
    }

    #[inline]
    pub fn pending(&self) -> usize {
        self.pipeline.pending()
    }

    /// Never waits on the store unless the queue is bounded and full
    pub fn process_frame(&mut self, frame: &Frame, lines: &LineSet) -> Result<Vec<Tally>, Error> {
        let tallies = self.detector.update(frame, lines, self.class);

        for tally in &tallies {
            debug!(
                track_id = tally.track_id,
                crossing = ?tally.crossing,
                occupancy = tally.counts.occupancy(),
                "crossing"
            );

            self.pipeline
                .submit(CrossingEvent::new(frame.timestamp, tally, self.stats))?;
        }

        Ok(tallies)
    }

    /// Waits until every submitted crossing has been handled
    pub fn finish(self) -> Result<PipelineReport, Error> {
        self.pipeline.shutdown()
    }
}
