//! Serialized JSON Lines output sink shared by all workers.
//!
//! `emit` serialises one record, then writes and flushes the
//! newline-terminated line under the mutex, so records are never
//! interleaved at the byte level. A write failure poisons the sink: the
//! record that hit it is lost to the caller as an error, and every later
//! emit reports [`SinkError::Closed`] so the engine can abort instead of
//! silently dropping output.

use std::io::{self, Write};

use parking_lot::Mutex;
use serde::Serialize;
use thiserror::Error;

use crate::manifest::ResponseRecord;

/// Errors reported by the output sink.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum SinkError {
    /// The underlying writer failed; the sink is now closed.
    #[error("sink write failed: {0}")]
    Io(#[from] io::Error),
    /// A previous write failed and the sink no longer accepts records.
    #[error("sink closed after an earlier write failure")]
    Closed,
}

/// Shape of the record emitted when a request never reached a worker.
#[derive(Serialize)]
struct MinimalRecord<'a> {
    id: &'a str,
    status: u16,
    error: &'a str,
}

struct SinkState<W> {
    writer: W,
    poisoned: bool,
}

/// Mutex-guarded line-oriented sink over any byte writer.
pub struct OutputSink<W> {
    state: Mutex<SinkState<W>>,
}

impl<W: Write> OutputSink<W> {
    /// Wrap a writer. The sink takes ownership; use [`into_inner`] to get
    /// it back after the batch.
    ///
    /// [`into_inner`]: OutputSink::into_inner
    pub fn new(writer: W) -> Self {
        Self {
            state: Mutex::new(SinkState {
                writer,
                poisoned: false,
            }),
        }
    }

    /// Emit one response record as a newline-terminated JSON line.
    pub fn emit(&self, record: &ResponseRecord) -> Result<(), SinkError> {
        let line = record.serialise()?;
        self.write_line(&line)
    }

    /// Emit a minimal error record for a request that could not be
    /// executed at all (unparseable manifest line, failed allocation).
    pub fn emit_error(&self, id: &str, message: &str) -> Result<(), SinkError> {
        let record = MinimalRecord {
            id,
            status: 0,
            error: message,
        };
        let line = serde_json::to_string(&record).map_err(io::Error::other)?;
        self.write_line(&line)
    }

    /// Recover the wrapped writer.
    pub fn into_inner(self) -> W {
        self.state.into_inner().writer
    }

    fn write_line(&self, line: &str) -> Result<(), SinkError> {
        let mut state = self.state.lock();
        if state.poisoned {
            return Err(SinkError::Closed);
        }
        if let Err(err) = write_record(&mut state.writer, line) {
            state.poisoned = true;
            return Err(SinkError::Io(err));
        }
        Ok(())
    }
}

fn write_record<W: Write>(writer: &mut W, line: &str) -> io::Result<()> {
    writer.write_all(line.as_bytes())?;
    writer.write_all(b"\n")?;
    writer.flush()
}
