//! # daemonlog
//! Process-local logger: lines are rendered on the calling thread, buffered,
//! and written to a file by a background daemon thread.
//!
//! ## Usage
//! ```toml
//! // Cargo.toml
//! ...
//! [dependencies]
//! daemonlog = "0.1.0"
//! ```
//!
//! ```rust
//! use daemonlog::engine_config;
//!
//! let engine = engine_config()
//!     .with_log_dir("/tmp/daemonlog_doc_usage")
//!     .with_thread_name("MainThread")
//!     .open("Engine.log")
//!     .expect("Unable to start logging service");
//! engine.info("Hello, world!");
//! drop(engine); // the last handle flushes and closes the file
//! assert!(std::fs::read_to_string("/tmp/daemonlog_doc_usage/Engine.log")
//!     .unwrap()
//!     .ends_with("\tINFO:     MainThread:\tHello, world!\n"));
//! ```
//!
//! ## Multi-threaded logging
//! The engine is shared through an `Arc`; each thread may register its own label.
//! ```rust
//! use std::sync::Arc;
//! use daemonlog::{engine_config, MemorySink};
//!
//! let sink = MemorySink::new();
//! let engine = engine_config()
//!     .with_thread_name("main")
//!     .open_with(sink.clone(), "memory")
//!     .unwrap();
//!
//! engine.info("Hello, world from main thread!");
//!
//! let handles: Vec<_> = (0..5).map(|i| {
//!     let engine = Arc::clone(&engine);
//!     std::thread::spawn(move || {
//!         engine.set_thread_name(&format!("thread {i}"));
//!         engine.warning(format!("Hello, world from thread {i}!"));
//!     })
//! }).collect();
//! for h in handles { h.join().unwrap(); }
//! drop(engine);
//! assert_eq!(sink.lines().len(), 6);
//! ```
//!
//! ## Through the `log` facade
//! ```rust
//! use daemonlog::{engine_config, init_global, MemorySink};
//!
//! let sink = MemorySink::new();
//! let engine = engine_config().open_with(sink.clone(), "memory").unwrap();
//! let _guard = init_global(engine).unwrap();
//! log::warn!("Hello, world!");
//! drop(_guard); // shuts the engine down and flushes its buffer
//! assert!(sink.lines()[0].ends_with("\tWARNING:     :\tHello, world!"));
//! ```

use std::{path::PathBuf, sync::Arc, time::Duration};

use log::{LevelFilter, Log, SetLoggerError};

pub use daemonlog_core::{
    ConsoleSink, DAEMONLOG_CONFIG, Engine, EngineError, EngineOptions, EngineStats, FileSink,
    LogEntry, MemorySink, Severity, Sink, log_directory,
};

/// Forwards `log` records to an [`Engine`].
///
/// Every record is accepted; `Trace` is printed as `DEBUG`.
pub struct EngineLogger<S: Sink + 'static> {
    engine: Arc<Engine<S>>,
}

impl<S: Sink + 'static> EngineLogger<S> {
    pub fn new(engine: Arc<Engine<S>>) -> Self {
        Self { engine }
    }
}

impl<S: Sink + 'static> Log for EngineLogger<S> {
    fn enabled(&self, _: &log::Metadata) -> bool {
        true
    }

    fn log(&self, record: &log::Record) {
        self.engine.print(record.level().into(), record.args());
    }

    // The worker flushes the sink after every drain.
    fn flush(&self) {}
}

/// Guard that shuts the engine down when dropped.
/// Hold this guard for the lifetime of your logging session.
pub struct LoggerGuard<S: Sink + 'static> {
    engine: Arc<Engine<S>>,
}

impl<S: Sink + 'static> LoggerGuard<S> {
    pub fn engine(&self) -> &Arc<Engine<S>> {
        &self.engine
    }
}

impl<S: Sink + 'static> Drop for LoggerGuard<S> {
    fn drop(&mut self) {
        if let Err(err) = self.engine.shutdown() {
            eprintln!("daemonlog: {err}");
        }
    }
}

/// Installs `engine` behind the `log` macros.
///
/// The `log` facade keeps its logger for the whole process, so the returned
/// guard is what stops the worker and closes the sink.
#[must_use = "LoggerGuard must be kept alive to ensure logging works. Do \"let _guard = init_global(engine)?;\""]
pub fn init_global<S: Sink + 'static>(
    engine: Arc<Engine<S>>,
) -> Result<LoggerGuard<S>, SetLoggerError> {
    log::set_boxed_logger(Box::new(EngineLogger::new(Arc::clone(&engine))))?;
    log::set_max_level(LevelFilter::Trace);
    Ok(LoggerGuard { engine })
}

/// Builder for configuring and starting an engine.
pub struct EngineBuilder {
    options: EngineOptions,
    app_name: String,
    log_dir: Option<PathBuf>,
    thread_name: Option<String>,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self {
            options: EngineOptions::default(),
            app_name: DAEMONLOG_CONFIG.APP_NAME.clone(),
            log_dir: None,
            thread_name: None,
        }
    }
}

impl EngineBuilder {
    fn start<S: Sink + 'static>(
        self,
        sink: S,
        destination: &str,
    ) -> Result<Arc<Engine<S>>, EngineError> {
        let engine = Engine::new(sink, destination, self.options)?;
        if let Some(name) = &self.thread_name {
            engine.set_thread_name(name);
        }
        Ok(Arc::new(engine))
    }

    /// Sets the sleep between two drains of the buffer.
    pub fn with_flush_interval(self, flush_interval: Duration) -> Self {
        Self {
            options: EngineOptions {
                flush_interval,
                ..self.options
            },
            ..self
        }
    }
    /// Sets the bounded wait of the worker on the buffer lock.
    pub fn with_lock_timeout(self, lock_timeout: Duration) -> Self {
        Self {
            options: EngineOptions {
                lock_timeout,
                ..self.options
            },
            ..self
        }
    }
    /// Sets the folder created in the user's documents directory.
    pub fn with_app_name(self, app_name: &str) -> Self {
        Self {
            app_name: app_name.into(),
            ..self
        }
    }
    /// Writes log files to `dir` instead of the user's documents directory.
    pub fn with_log_dir<P: Into<PathBuf>>(self, dir: P) -> Self {
        Self {
            log_dir: Some(dir.into()),
            ..self
        }
    }
    /// Names the thread that opens the engine.
    pub fn with_thread_name(self, name: &str) -> Self {
        Self {
            thread_name: Some(name.into()),
            ..self
        }
    }
    /// Starts an engine appending to the file `destination`.
    pub fn open(self, destination: &str) -> Result<Arc<Engine<FileSink>>, EngineError> {
        let sink = match &self.log_dir {
            Some(dir) => FileSink::new(dir),
            None => FileSink::in_documents(&self.app_name)?,
        };
        self.start(sink, destination)
    }
    /// Starts an engine printing colored lines to stdout.
    pub fn open_console(self) -> Result<Arc<Engine<ConsoleSink>>, EngineError> {
        self.start(ConsoleSink, "stdout")
    }
    /// Starts an engine on a custom sink.
    pub fn open_with<S: Sink + 'static>(
        self,
        sink: S,
        destination: &str,
    ) -> Result<Arc<Engine<S>>, EngineError> {
        self.start(sink, destination)
    }
}

/// Returns a default EngineBuilder, seeded from the `DAEMONLOG_*` environment.
pub fn engine_config() -> EngineBuilder {
    EngineBuilder::default()
}

#[test]
fn test_builder_applies_options() {
    let builder = engine_config()
        .with_flush_interval(Duration::from_millis(7))
        .with_lock_timeout(Duration::from_millis(3))
        .with_app_name("Sandbox")
        .with_thread_name("builder");
    assert_eq!(builder.options.flush_interval, Duration::from_millis(7));
    assert_eq!(builder.options.lock_timeout, Duration::from_millis(3));
    assert_eq!(builder.app_name, "Sandbox");
    let sink = MemorySink::new();
    let engine = builder.open_with(sink.clone(), "memory").unwrap();
    engine.info("named");
    drop(engine);
    assert_eq!(sink.destination().as_deref(), Some("memory"));
    assert!(sink.lines()[0].ends_with("\tINFO:     builder:\tnamed"));
}

#[test]
fn test_open_file_in_log_dir() {
    let dir = PathBuf::from("/tmp/daemonlog_test_builder_open");
    std::fs::remove_dir_all(&dir).ok();
    let engine = engine_config()
        .with_log_dir(&dir)
        .with_flush_interval(Duration::from_millis(5))
        .open("Engine.log")
        .unwrap();
    engine.debug("to file");
    drop(engine);
    let content = std::fs::read_to_string(dir.join("Engine.log")).unwrap();
    assert!(content.ends_with("\tDEBUG:     :\tto file\n"));
}

#[test]
fn test_open_failure_is_reported() {
    let dir = PathBuf::from("/tmp/daemonlog_test_builder_failure");
    std::fs::remove_dir_all(&dir).ok();
    std::fs::create_dir_all(dir.join("Engine.log")).unwrap();
    let result = engine_config().with_log_dir(&dir).open("Engine.log");
    assert!(matches!(result, Err(EngineError::OpenDestination { .. })));
}

#[test]
fn test_engine_logger_maps_levels() {
    let sink = MemorySink::new();
    let engine = engine_config().open_with(sink.clone(), "memory").unwrap();
    let logger = EngineLogger::new(Arc::clone(&engine));
    for (level, message) in [
        (log::Level::Error, "e"),
        (log::Level::Warn, "w"),
        (log::Level::Info, "i"),
        (log::Level::Debug, "d"),
        (log::Level::Trace, "t"),
    ] {
        logger.log(
            &log::Record::builder()
                .level(level)
                .args(format_args!("{message}"))
                .build(),
        );
    }
    drop(logger);
    drop(engine);
    let labels: Vec<_> = sink
        .lines()
        .iter()
        .map(|l| {
            let label = l.split('\t').nth(1).unwrap();
            label.split(' ').next().unwrap().to_string()
        })
        .collect();
    assert_eq!(labels, ["ERROR:", "WARNING:", "INFO:", "DEBUG:", "DEBUG:"]);
}

#[test]
fn test_init_global() {
    let sink = MemorySink::new();
    let engine = engine_config()
        .with_thread_name("global")
        .open_with(sink.clone(), "memory")
        .unwrap();
    let guard = init_global(engine).unwrap();
    log::info!("through facade");
    log::trace!("fine grained");
    assert!(guard.engine().is_running());
    drop(guard);
    let lines = sink.lines();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].ends_with("\tINFO:     global:\tthrough facade"));
    assert!(lines[1].ends_with("\tDEBUG:     global:\tfine grained"));
    log::error!("after shutdown");
    assert_eq!(sink.lines().len(), 2);
}

#[test]
fn test_open_console() {
    let engine = engine_config()
        .with_thread_name("console")
        .with_flush_interval(Duration::from_millis(5))
        .open_console()
        .unwrap();
    engine.warning("printed to stdout");
    engine.shutdown().unwrap();
    assert_eq!(engine.stats().written, 1);
}
