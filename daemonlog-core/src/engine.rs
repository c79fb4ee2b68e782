use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use chrono::Local;
use crossbeam_channel::{Receiver, RecvTimeoutError, SendError, Sender, bounded};
use parking_lot::Mutex;

use crate::{
    config::DAEMONLOG_CONFIG,
    entry::{LogEntry, Severity},
    error::EngineError,
    sink::Sink,
    thread_names::ThreadNames,
};

/// Timing of the background worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineOptions {
    /// Sleep between two drains.
    pub flush_interval: Duration,
    /// Bounded wait on the buffer lock; the drain is skipped when it expires.
    pub lock_timeout: Duration,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            flush_interval: DAEMONLOG_CONFIG.flush_interval(),
            lock_timeout: DAEMONLOG_CONFIG.lock_timeout(),
        }
    }
}

/// Counters describing what happened to submitted lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStats {
    /// Lines accepted into the buffer.
    pub submitted: u64,
    /// Lines the sink accepted.
    pub written: u64,
    /// Lines the sink rejected. They are not retried.
    pub write_failures: u64,
    /// Lines printed after the worker stopped draining.
    pub dropped: u64,
}

#[derive(Default)]
struct Counters {
    submitted: AtomicU64,
    written: AtomicU64,
    write_failures: AtomicU64,
    dropped: AtomicU64,
}

#[derive(Default)]
struct Buffer {
    entries: Vec<LogEntry>,
    next_sequence: u64,
    closed: bool,
}

struct Shared {
    running: AtomicBool,
    // Mirrors `entries.len()` so the worker can skip locking an empty buffer.
    pending: AtomicUsize,
    buffer: Mutex<Buffer>,
    counters: Counters,
}

/// Buffered logger drained into a [`Sink`] by a single background thread.
///
/// Lines are rendered on the calling thread and appended to an in-memory
/// buffer. The worker wakes every `flush_interval`, writes the whole buffer
/// to the sink and clears it. Shutting down (explicitly or on drop) stops
/// the worker only once the buffer is empty, then closes the sink.
///
/// Share it between threads with an [`Arc`].
pub struct Engine<S: Sink + 'static> {
    shared: Arc<Shared>,
    thread_names: ThreadNames,
    wake: Sender<()>,
    worker: Mutex<Option<JoinHandle<Option<S>>>>,
}

impl<S: Sink + 'static> Engine<S> {
    /// Opens `sink` on `destination` and starts the worker.
    ///
    /// Nothing is started when the sink cannot be opened.
    pub fn new(
        mut sink: S,
        destination: &str,
        options: EngineOptions,
    ) -> Result<Self, EngineError> {
        sink.open(destination).map_err(|source| EngineError::OpenDestination {
            destination: destination.to_owned(),
            source,
        })?;
        let shared = Arc::new(Shared {
            running: AtomicBool::new(true),
            pending: AtomicUsize::new(0),
            buffer: Mutex::new(Buffer::default()),
            counters: Counters::default(),
        });
        let (wake, wake_receiver) = bounded::<()>(1);
        // The sink only moves to the worker once it is running, so a failed
        // spawn still closes what was opened.
        let (handoff, sink_receiver) = bounded::<S>(1);
        let worker_shared = Arc::clone(&shared);
        let spawned = thread::Builder::new()
            .name("daemonlog-worker".into())
            .spawn(move || {
                let sink = sink_receiver.recv().ok()?;
                Some(run_worker(sink, &worker_shared, &wake_receiver, options))
            });
        let handle = match spawned {
            Ok(handle) => handle,
            Err(err) => {
                sink.close().ok();
                return Err(EngineError::Spawn(err));
            }
        };
        if let Err(SendError(mut sink)) = handoff.send(sink) {
            shared.buffer.lock().closed = true;
            sink.close().ok();
        }
        Ok(Self {
            shared,
            thread_names: ThreadNames::default(),
            wake,
            worker: Mutex::new(Some(handle)),
        })
    }

    /// Labels every line later printed from the calling thread.
    pub fn set_thread_name(&self, name: &str) {
        self.thread_names.set_current(name);
    }

    /// Renders `message` and queues it for the worker.
    pub fn print(&self, severity: Severity, message: impl fmt::Display) {
        let message = message.to_string();
        let thread = self.thread_names.current();
        let mut buffer = self.shared.buffer.lock();
        if buffer.closed {
            self.shared.counters.dropped.fetch_add(1, Ordering::Relaxed);
            return;
        }
        let sequence = buffer.next_sequence;
        buffer.next_sequence += 1;
        let time = Local::now().naive_local();
        buffer
            .entries
            .push(LogEntry::render(sequence, time, severity, &thread, &message));
        self.shared.pending.fetch_add(1, Ordering::Release);
        self.shared.counters.submitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn info(&self, message: impl fmt::Display) {
        self.print(Severity::Info, message);
    }

    pub fn debug(&self, message: impl fmt::Display) {
        self.print(Severity::Debug, message);
    }

    pub fn warning(&self, message: impl fmt::Display) {
        self.print(Severity::Warning, message);
    }

    pub fn error(&self, message: impl fmt::Display) {
        self.print(Severity::Error, message);
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    pub fn stats(&self) -> EngineStats {
        let counters = &self.shared.counters;
        EngineStats {
            submitted: counters.submitted.load(Ordering::Relaxed),
            written: counters.written.load(Ordering::Relaxed),
            write_failures: counters.write_failures.load(Ordering::Relaxed),
            dropped: counters.dropped.load(Ordering::Relaxed),
        }
    }

    /// Stops the worker once every buffered line is written, then closes
    /// the sink. Later calls return `Ok(())` without doing anything.
    pub fn shutdown(&self) -> Result<(), EngineError> {
        let mut worker = self.worker.lock();
        let Some(handle) = worker.take() else {
            return Ok(());
        };
        self.shared.running.store(false, Ordering::Release);
        // The channel holds one wake-up; a full channel already wakes the worker.
        self.wake.try_send(()).ok();
        let joined = handle.join();
        self.thread_names.clear();
        let Ok(sink) = joined else {
            self.shared.buffer.lock().closed = true;
            return Err(EngineError::WorkerPanicked);
        };
        match sink {
            Some(mut sink) => sink.close().map_err(EngineError::Close),
            None => Ok(()),
        }
    }
}

impl<S: Sink + 'static> Drop for Engine<S> {
    fn drop(&mut self) {
        if let Err(err) = self.shutdown() {
            eprintln!("daemonlog: {err}");
        }
    }
}

fn run_worker<S: Sink>(
    mut sink: S,
    shared: &Shared,
    wake: &Receiver<()>,
    options: EngineOptions,
) -> S {
    loop {
        let disconnected = matches!(
            wake.recv_timeout(options.flush_interval),
            Err(RecvTimeoutError::Disconnected)
        );
        let stopping = disconnected || !shared.running.load(Ordering::Acquire);
        if !stopping && shared.pending.load(Ordering::Acquire) == 0 {
            continue;
        }
        // Never wait on a producer for longer than the bound; retry next cycle.
        let Some(mut buffer) = shared.buffer.try_lock_for(options.lock_timeout) else {
            continue;
        };
        if !buffer.entries.is_empty() {
            for entry in buffer.entries.drain(..) {
                let counter = match sink.write(&entry) {
                    Ok(()) => &shared.counters.written,
                    Err(_) => &shared.counters.write_failures,
                };
                counter.fetch_add(1, Ordering::Relaxed);
            }
            shared.pending.store(0, Ordering::Release);
            sink.flush().ok();
        }
        if stopping {
            buffer.closed = true;
            break;
        }
    }
    sink
}
