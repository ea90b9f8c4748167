//! Background persistence of crossing events.
//!
//! The frame loop submits [`CrossingEvent`]s and never waits on the store. A
//! single worker thread owns the store and every [`Statistics`] object,
//! handles events strictly in submission order and stops at an explicit
//! shutdown message queued behind the last event.

use crate::error::Error;
use crate::event::{CrossingEvent, StatsHandle};
use crate::stats::{RollupPolicy, StatRow, Statistics};
use crate::store::VisitStore;

use crossbeam::channel::{self, Receiver, Sender, TrySendError};
use std::thread::JoinHandle;
use tracing::{debug, info, warn};

enum Message {
    Event(CrossingEvent),
    Shutdown,
}

/// What the worker did before it stopped
#[derive(Debug)]
pub struct PipelineReport {
    pub events: u64,
    /// Writes that never reached the store
    pub write_failures: u64,
    /// Writes that outlived the write timeout. The few of them that failed
    /// afterwards are counted in `write_failures` as well.
    pub late_writes: u64,
    statistics: Vec<Statistics>,
}

impl PipelineReport {
    pub fn statistics(&self, handle: StatsHandle) -> Option<&Statistics> {
        self.statistics.get(handle.0)
    }
}

pub struct PipelineBuilder {
    store: Box<dyn VisitStore>,
    statistics: Vec<Statistics>,
    capacity: Option<usize>,
}

impl PipelineBuilder {
    /// `None` keeps the queue unbounded. With a capacity, `submit` blocks
    /// while the queue is full; events are never dropped.
    pub fn queue_capacity(mut self, capacity: Option<usize>) -> Self {
        self.capacity = capacity;
        self
    }

    /// Registers a statistics object that will live on the worker thread
    pub fn statistics(&mut self, policy: RollupPolicy) -> StatsHandle {
        self.statistics.push(Statistics::new(policy));
        StatsHandle(self.statistics.len() - 1)
    }

    pub fn spawn(self) -> Result<EventPipeline, Error> {
        let (tx, rx) = match self.capacity {
            Some(cap) => channel::bounded(cap),
            None => channel::unbounded(),
        };

        let worker = Worker {
            store: self.store,
            statistics: self.statistics,
            events: 0,
            write_failures: 0,
            late_writes: 0,
        };

        let handle = std::thread::Builder::new()
            .name("crossing-events".into())
            .spawn(move || worker.run(rx))?;

        info!(capacity = ?self.capacity, "event pipeline started");

        Ok(EventPipeline {
            tx: Some(tx),
            worker: Some(handle),
        })
    }
}

pub struct EventPipeline {
    tx: Option<Sender<Message>>,
    worker: Option<JoinHandle<PipelineReport>>,
}

impl EventPipeline {
    pub fn builder<S: VisitStore + 'static>(store: S) -> PipelineBuilder {
        PipelineBuilder {
            store: Box::new(store),
            statistics: Vec::new(),
            capacity: None,
        }
    }

    /// Queues `event` behind everything submitted before it
    pub fn submit(&self, event: CrossingEvent) -> Result<(), Error> {
        let tx = self.tx.as_ref().ok_or(Error::PipelineClosed)?;

        match tx.try_send(Message::Event(event)) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(msg)) => {
                debug!(len = tx.len(), "event queue full, waiting for the store");
                tx.send(msg).map_err(|_| Error::PipelineClosed)
            }
            Err(TrySendError::Disconnected(_)) => Err(Error::PipelineClosed),
        }
    }

    /// Events waiting for the worker
    pub fn pending(&self) -> usize {
        self.tx.as_ref().map(|tx| tx.len()).unwrap_or(0)
    }

    /// Queues the shutdown message and waits for the worker to drain
    pub fn shutdown(mut self) -> Result<PipelineReport, Error> {
        self.close()
    }

    fn close(&mut self) -> Result<PipelineReport, Error> {
        if let Some(tx) = self.tx.take() {
            // fails only when the worker is already gone, join reports why
            let _ = tx.send(Message::Shutdown);
        }

        let worker = self.worker.take().ok_or(Error::PipelineClosed)?;
        worker.join().map_err(|_| Error::WorkerPanicked)
    }
}

impl Drop for EventPipeline {
    fn drop(&mut self) {
        if self.worker.is_none() {
            return;
        }

        match self.close() {
            Ok(report) => debug!(events = report.events, "event pipeline drained on drop"),
            Err(err) => warn!(%err, "event pipeline did not shut down cleanly"),
        }
    }
}

struct Worker {
    store: Box<dyn VisitStore>,
    statistics: Vec<Statistics>,
    events: u64,
    write_failures: u64,
    late_writes: u64,
}

impl Worker {
    fn run(mut self, rx: Receiver<Message>) -> PipelineReport {
        for msg in rx.iter() {
            match msg {
                Message::Event(event) => {
                    self.handle(event);
                    self.settle();
                }
                Message::Shutdown => break,
            }
        }

        info!(
            events = self.events,
            write_failures = self.write_failures,
            late_writes = self.late_writes,
            "event pipeline stopped"
        );

        PipelineReport {
            events: self.events,
            write_failures: self.write_failures,
            late_writes: self.late_writes,
            statistics: self.statistics,
        }
    }

    fn handle(&mut self, event: CrossingEvent) {
        self.events += 1;

        let row = event.row();
        debug!(
            in_count = row.in_count,
            out_count = row.out_count,
            occupancy = row.occupancy,
            "persisting crossing"
        );

        let res = self.store.append_crossing(&row);
        self.check(res, "crossing");

        let rows = match self.statistics.get_mut(event.stats.0) {
            Some(stats) => stats.record_visit_and_maybe_rollup(event.timestamp),
            None => {
                let err = Error::UnknownStatistics(event.stats.0);
                warn!(%err, handle = %event.stats, "crossing not aggregated");
                return;
            }
        };

        for row in rows {
            let res = match row {
                StatRow::Day { date, count } => self.store.append_day_count(date, count),
                StatRow::Period { period, total } => {
                    info!(period = period.label(), total, "period rollup");
                    self.store.append_period_total(period, total)
                }
            };

            self.check(res, "statistics");
        }
    }

    fn check(&mut self, res: Result<(), Error>, what: &str) {
        match res {
            Ok(()) => {}
            // still running in the store, `settle` tells how it ended
            Err(err @ Error::WriteTimeout(_)) => {
                self.late_writes += 1;
                warn!(%err, what, "store write is late, continuing");
            }
            Err(err) => {
                self.write_failures += 1;
                warn!(%err, what, "store write failed, continuing");
            }
        }
    }

    /// Late writes that failed after all are lost writes too
    fn settle(&mut self) {
        for err in self.store.settle() {
            self.write_failures += 1;
            warn!(%err, "late store write lost");
        }
    }
}
