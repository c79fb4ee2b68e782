//! # daemonlog-core
//! Core of daemonlog - buffered logging engine drained by a background worker.

mod config;
mod engine;
mod entry;
mod error;
mod sink;
mod thread_names;

pub use config::{DAEMONLOG_CONFIG, DaemonLogConfig};
pub use engine::{Engine, EngineOptions, EngineStats};
pub use entry::{LogEntry, Severity};
pub use error::EngineError;
pub use sink::{ConsoleSink, FileSink, MemorySink, Sink, log_directory};
pub use thread_names::ThreadNames;
