//! Batch dispatcher: a persistent pool of worker threads.
//!
//! `process_batch` spawns `min(max_concurrency, R)` workers, feeds every
//! descriptor through one bounded channel, and joins the pool before
//! returning. Each worker constructs its own HTTP client on entry and
//! drops it on exit, so no client instance ever crosses a thread
//! boundary. Output ordering is completion order; callers correlate by
//! `id`.

use std::{io, io::Write, thread};

use crossbeam_channel::bounded;
use log::debug;
use thiserror::Error;

use crate::{
    config::EngineConfig,
    manifest::RequestDescriptor,
    sink::{OutputSink, SinkError},
    stats::{BatchStats, StatsSnapshot},
};

mod worker;

use worker::Worker;

/// Failures that abort a whole batch.
///
/// Per-request failures are not here: they become records. Only losing
/// the output sink or the ability to spawn workers is fatal.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum FatalError {
    /// The output sink failed; emitted output is incomplete.
    #[error("output sink failure: {0}")]
    Sink(#[from] SinkError),
    /// A worker thread could not be spawned.
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[source] io::Error),
    /// A worker thread panicked; some requests may lack records.
    #[error("worker thread panicked")]
    WorkerPanicked,
}

/// Batch HTTP execution engine.
///
/// Owns the serialized output sink and the shared counters; the request
/// list is borrowed per batch.
pub struct Engine<W> {
    config: EngineConfig,
    sink: OutputSink<W>,
    stats: BatchStats,
}

impl<W: Write + Send> Engine<W> {
    /// Create an engine writing records to `writer`.
    pub fn new(config: EngineConfig, writer: W) -> Self {
        Self {
            config,
            sink: OutputSink::new(writer),
            stats: BatchStats::default(),
        }
    }

    /// The shared sink, for emitting records the batch itself cannot
    /// produce (e.g. manifest parse failures).
    pub fn sink(&self) -> &OutputSink<W> {
        &self.sink
    }

    /// Copy out the batch counters.
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Tear down the engine and recover the writer.
    pub fn into_writer(self) -> W {
        self.sink.into_inner()
    }

    /// Execute every request in the batch, emitting exactly one record
    /// per descriptor, and return once all of them are processed.
    ///
    /// # Errors
    ///
    /// Only sink failures, spawn failures, and worker panics abort the
    /// batch; everything request-level is reported through the records.
    pub fn process_batch(&self, requests: &[RequestDescriptor]) -> Result<(), FatalError> {
        if requests.is_empty() {
            return Ok(());
        }

        let worker_count = self.config.max_concurrency.min(requests.len()).max(1);
        debug!(
            "dispatching {} requests across {worker_count} workers",
            requests.len()
        );

        thread::scope(|scope| {
            let (tx, rx) = bounded::<&RequestDescriptor>(worker_count);
            let mut handles = Vec::with_capacity(worker_count);
            for worker_id in 0..worker_count {
                let rx = rx.clone();
                let config = &self.config;
                let sink = &self.sink;
                let stats = &self.stats;
                let handle = thread::Builder::new()
                    .name(format!("httpvolley-worker-{worker_id}"))
                    .spawn_scoped(scope, move || {
                        Worker::new(worker_id, config).run(&rx, sink, stats)
                    })
                    .map_err(FatalError::Spawn)?;
                handles.push(handle);
            }
            drop(rx);

            for request in requests {
                // Send fails only once every worker has stopped, which
                // only happens after a sink failure; the join below
                // surfaces it.
                if tx.send(request).is_err() {
                    break;
                }
            }
            drop(tx);

            let mut failure: Option<FatalError> = None;
            for handle in handles {
                match handle.join() {
                    Ok(Ok(())) => {}
                    Ok(Err(err)) => {
                        let keep_existing = matches!(
                            (&failure, &err),
                            (Some(FatalError::Sink(SinkError::Io(_))), SinkError::Closed)
                        );
                        if !keep_existing {
                            failure = Some(FatalError::Sink(err));
                        }
                    }
                    Err(_) => {
                        if failure.is_none() {
                            failure = Some(FatalError::WorkerPanicked);
                        }
                    }
                }
            }

            match failure {
                Some(err) => Err(err),
                None => Ok(()),
            }
        })
    }
}
