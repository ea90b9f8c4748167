use crate::error::Error;
use crate::stats::Period;

use chrono::{NaiveDate, NaiveDateTime};
use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use serde_derive::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, warn};

/// Raw crossing row: counters as they were when the crossing was detected
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrossingRow {
    pub timestamp: NaiveDateTime,
    pub in_count: u64,
    pub out_count: u64,
    pub occupancy: i64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Record {
    Crossing(CrossingRow),
    DayCount {
        date: NaiveDate,
        count: u64,
    },
    PeriodTotal {
        label: String,
        period: Period,
        total: u64,
    },
}

/// The remote side of the counter. Every call is one append; layout of the
/// rows is up to the implementation.
pub trait VisitStore: Send {
    fn append_crossing(&mut self, row: &CrossingRow) -> Result<(), Error>;

    fn append_day_count(&mut self, date: NaiveDate, count: u64) -> Result<(), Error>;

    fn append_period_total(&mut self, period: Period, total: u64) -> Result<(), Error>;

    fn append(&mut self, record: &Record) -> Result<(), Error> {
        match record {
            Record::Crossing(row) => self.append_crossing(row),
            Record::DayCount { date, count } => self.append_day_count(*date, *count),
            Record::PeriodTotal { period, total, .. } => self.append_period_total(*period, *total),
        }
    }

    /// Waits for writes that outlived their call and returns the errors of
    /// those that failed after all. Stores that write synchronously have
    /// nothing to settle.
    fn settle(&mut self) -> Vec<Error> {
        Vec::new()
    }
}

fn period_record(period: Period, total: u64) -> Record {
    Record::PeriodTotal {
        label: period.label().to_string(),
        period,
        total,
    }
}

#[derive(Debug, Default)]
struct MemoryInner {
    records: Vec<Record>,
    fail_next: usize,
    latency: Option<Duration>,
}

/// In-process store. Clones share the same rows, so a clone kept outside the
/// pipeline can inspect what was written.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryInner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every write sleeps this long before completing
    pub fn with_latency(self, latency: Duration) -> Self {
        self.lock().latency = Some(latency);
        self
    }

    /// The next `n` writes fail without being recorded
    pub fn fail_next(&self, n: usize) {
        self.lock().fail_next = n;
    }

    pub fn records(&self) -> Vec<Record> {
        self.lock().records.clone()
    }

    pub fn crossings(&self) -> Vec<CrossingRow> {
        self.lock()
            .records
            .iter()
            .filter_map(|r| match r {
                Record::Crossing(row) => Some(*row),
                _ => None,
            })
            .collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn push(&mut self, record: Record) -> Result<(), Error> {
        let latency = self.lock().latency;
        if let Some(latency) = latency {
            std::thread::sleep(latency);
        }

        let mut inner = self.lock();
        if inner.fail_next > 0 {
            inner.fail_next -= 1;
            return Err(Error::Store("injected write failure".into()));
        }

        inner.records.push(record);
        Ok(())
    }
}

impl VisitStore for MemoryStore {
    fn append_crossing(&mut self, row: &CrossingRow) -> Result<(), Error> {
        self.push(Record::Crossing(*row))
    }

    fn append_day_count(&mut self, date: NaiveDate, count: u64) -> Result<(), Error> {
        self.push(Record::DayCount { date, count })
    }

    fn append_period_total(&mut self, period: Period, total: u64) -> Result<(), Error> {
        self.push(period_record(period, total))
    }
}

/// Appends one JSON object per line, flushed after every write
pub struct JsonLinesStore {
    writer: BufWriter<File>,
}

impl JsonLinesStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path.as_ref())?;

        Ok(Self {
            writer: BufWriter::new(file),
        })
    }

    fn write_record(&mut self, record: &Record) -> Result<(), Error> {
        // a record that fails to serialize must not leave half a line behind
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');

        self.writer.write_all(&line)?;
        self.writer.flush()?;

        Ok(())
    }
}

impl VisitStore for JsonLinesStore {
    fn append_crossing(&mut self, row: &CrossingRow) -> Result<(), Error> {
        self.write_record(&Record::Crossing(*row))
    }

    fn append_day_count(&mut self, date: NaiveDate, count: u64) -> Result<(), Error> {
        self.write_record(&Record::DayCount { date, count })
    }

    fn append_period_total(&mut self, period: Period, total: u64) -> Result<(), Error> {
        self.write_record(&period_record(period, total))
    }
}

type Job = (Record, Sender<Result<(), Error>>);
type Reply = Receiver<Result<(), Error>>;

/// Bounds the latency of every write to an inner store.
///
/// The inner store runs on its own thread and writes stay in order. A write
/// that times out is reported as [`Error::WriteTimeout`] but still completes
/// in the background. At most one write is ever in flight: the next call
/// waits for the late one first, so a slow store still slows its caller down.
/// A late write that fails after all is handed out by [`VisitStore::settle`].
pub struct TimeoutStore {
    jobs: Option<Sender<Job>>,
    worker: Option<JoinHandle<()>>,
    timeout: Duration,
    late: Option<Reply>,
    late_errors: Vec<Error>,
}

impl TimeoutStore {
    pub fn new<S: VisitStore + 'static>(inner: S, timeout: Duration) -> Result<Self, Error> {
        let (tx, rx) = channel::bounded::<Job>(1);

        let worker = std::thread::Builder::new()
            .name("store-writer".into())
            .spawn(move || Self::run(inner, rx))?;

        Ok(Self {
            jobs: Some(tx),
            worker: Some(worker),
            timeout,
            late: None,
            late_errors: Vec::new(),
        })
    }

    fn run<S: VisitStore>(mut inner: S, jobs: Receiver<Job>) {
        for (record, reply) in jobs {
            let res = inner.append(&record);
            // the caller may have given up already
            let _ = reply.send(res);
        }
    }

    /// Blocks until the write that timed out last has finished
    fn wait_late(&mut self) {
        if let Some(reply) = self.late.take() {
            match reply.recv() {
                Ok(Ok(())) => debug!("late store write landed"),
                Ok(Err(err)) => {
                    warn!(%err, "late store write failed");
                    self.late_errors.push(err);
                }
                Err(_) => self
                    .late_errors
                    .push(Error::Store("store writer thread is gone".into())),
            }
        }
    }

    fn submit(&mut self, record: Record) -> Result<(), Error> {
        self.wait_late();

        let jobs = self.jobs.as_ref().ok_or(Error::PipelineClosed)?;
        let (reply_tx, reply_rx) = channel::bounded(1);

        jobs.send((record, reply_tx))
            .map_err(|_| Error::Store("store writer thread is gone".into()))?;

        match reply_rx.recv_timeout(self.timeout) {
            Ok(res) => res,
            Err(RecvTimeoutError::Timeout) => {
                self.late = Some(reply_rx);
                Err(Error::WriteTimeout(self.timeout))
            }
            Err(RecvTimeoutError::Disconnected) => {
                Err(Error::Store("store writer thread is gone".into()))
            }
        }
    }
}

impl VisitStore for TimeoutStore {
    fn append_crossing(&mut self, row: &CrossingRow) -> Result<(), Error> {
        self.submit(Record::Crossing(*row))
    }

    fn append_day_count(&mut self, date: NaiveDate, count: u64) -> Result<(), Error> {
        self.submit(Record::DayCount { date, count })
    }

    fn append_period_total(&mut self, period: Period, total: u64) -> Result<(), Error> {
        self.submit(period_record(period, total))
    }

    fn settle(&mut self) -> Vec<Error> {
        self.wait_late();
        std::mem::take(&mut self.late_errors)
    }
}

impl Drop for TimeoutStore {
    fn drop(&mut self) {
        self.wait_late();
        self.jobs.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}
