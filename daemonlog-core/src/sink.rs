use std::{
    fs::{self, File},
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
    sync::Arc,
};

use colored::Colorize;
use parking_lot::Mutex;

use crate::{
    entry::{LogEntry, Severity},
    error::EngineError,
};

/// Destination of rendered log lines.
///
/// The engine opens the sink once before starting its worker, hands it to
/// the worker for every write, and closes it once after the worker exited.
pub trait Sink: Send {
    fn open(&mut self, destination: &str) -> io::Result<()>;
    fn write(&mut self, entry: &LogEntry) -> io::Result<()>;
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
    fn close(&mut self) -> io::Result<()>;
}

fn not_open() -> io::Error {
    io::Error::new(io::ErrorKind::NotConnected, "log destination is not open")
}

/// Resolves `<documents>/<app_name>/logs`, falling back to the home
/// directory on platforms without a documents folder.
pub fn log_directory(app_name: &str) -> Result<PathBuf, EngineError> {
    let base = dirs::document_dir()
        .or_else(dirs::home_dir)
        .ok_or(EngineError::NoUserDirectory)?;
    Ok(app_log_directory(&base, app_name))
}

fn app_log_directory(base: &Path, app_name: &str) -> PathBuf {
    base.join(app_name).join("logs")
}

/// Appends lines to `<folder>/<destination>`.
pub struct FileSink {
    folder: PathBuf,
    path: Option<PathBuf>,
    file: Option<BufWriter<File>>,
}

impl FileSink {
    pub fn new<P: Into<PathBuf>>(folder: P) -> Self {
        Self {
            folder: folder.into(),
            path: None,
            file: None,
        }
    }

    /// File sink rooted in the per-user log directory of `app_name`.
    pub fn in_documents(app_name: &str) -> Result<Self, EngineError> {
        Ok(Self::new(log_directory(app_name)?))
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    /// Path of the opened file, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

impl Sink for FileSink {
    fn open(&mut self, destination: &str) -> io::Result<()> {
        fs::create_dir_all(&self.folder)?;
        let path = self.folder.join(destination);
        let file = File::options().create(true).append(true).open(&path)?;
        self.file = Some(BufWriter::new(file));
        self.path = Some(path);
        Ok(())
    }

    fn write(&mut self, entry: &LogEntry) -> io::Result<()> {
        let file = self.file.as_mut().ok_or_else(not_open)?;
        writeln!(file, "{}", entry.text())
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.file.as_mut() {
            Some(file) => file.flush(),
            None => Ok(()),
        }
    }

    fn close(&mut self) -> io::Result<()> {
        match self.file.take() {
            Some(mut file) => file.flush(),
            None => Ok(()),
        }
    }
}

/// Writes lines to stdout, colored by severity.
#[derive(Default, Debug)]
pub struct ConsoleSink;

impl Sink for ConsoleSink {
    fn open(&mut self, _destination: &str) -> io::Result<()> {
        io::stdout().flush()
    }

    fn write(&mut self, entry: &LogEntry) -> io::Result<()> {
        let line = match entry.severity() {
            Severity::Error => entry.text().red(),
            Severity::Warning => entry.text().yellow(),
            Severity::Info => entry.text().green(),
            Severity::Debug => entry.text().blue(),
        };
        writeln!(io::stdout().lock(), "{line}")
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stdout().flush()
    }

    fn close(&mut self) -> io::Result<()> {
        io::stdout().flush()
    }
}

#[derive(Default, Debug)]
struct MemoryRecord {
    destination: Option<String>,
    lines: Vec<String>,
    flushes: usize,
    close_calls: usize,
    writes_after_close: usize,
    fail_open: bool,
    fail_writes: bool,
}

/// Keeps every written line in memory. Clones share the same record, so a
/// clone kept by the caller observes what the engine wrote.
#[derive(Clone, Default, Debug)]
pub struct MemorySink {
    record: Arc<Mutex<MemoryRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `open` fail, as an unreachable destination would.
    pub fn fail_open(self) -> Self {
        self.record.lock().fail_open = true;
        self
    }

    /// Makes every `write` fail.
    pub fn fail_writes(self) -> Self {
        self.record.lock().fail_writes = true;
        self
    }

    pub fn destination(&self) -> Option<String> {
        self.record.lock().destination.clone()
    }

    pub fn lines(&self) -> Vec<String> {
        self.record.lock().lines.clone()
    }

    pub fn flushes(&self) -> usize {
        self.record.lock().flushes
    }

    pub fn close_calls(&self) -> usize {
        self.record.lock().close_calls
    }

    pub fn writes_after_close(&self) -> usize {
        self.record.lock().writes_after_close
    }
}

impl Sink for MemorySink {
    fn open(&mut self, destination: &str) -> io::Result<()> {
        let mut record = self.record.lock();
        if record.fail_open {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("{destination} is not writable"),
            ));
        }
        record.destination = Some(destination.to_owned());
        Ok(())
    }

    fn write(&mut self, entry: &LogEntry) -> io::Result<()> {
        let mut record = self.record.lock();
        if record.close_calls > 0 {
            record.writes_after_close += 1;
            return Err(not_open());
        }
        if record.fail_writes {
            return Err(io::Error::other("write rejected"));
        }
        record.lines.push(entry.text().to_owned());
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.record.lock().flushes += 1;
        Ok(())
    }

    fn close(&mut self) -> io::Result<()> {
        self.record.lock().close_calls += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn test_dir(name: &str) -> PathBuf {
        let dir = PathBuf::from(format!("/tmp/daemonlog_test_{name}"));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    fn entry(sequence: u64, message: &str) -> LogEntry {
        let time = NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(8, 30, 0)
            .unwrap();
        LogEntry::render(sequence, time, Severity::Info, "main", message)
    }

    #[test]
    fn test_file_sink_creates_folder_and_writes_lines() {
        let dir = test_dir("file_sink_lines").join("nested").join("logs");
        let mut sink = FileSink::new(&dir);
        sink.open("Engine.log").unwrap();
        assert_eq!(sink.path(), Some(dir.join("Engine.log").as_path()));
        sink.write(&entry(0, "first")).unwrap();
        sink.write(&entry(1, "second")).unwrap();
        sink.close().unwrap();
        assert_eq!(
            fs::read_to_string(dir.join("Engine.log")).unwrap(),
            "0: 1/5/2024 8:30:0\tINFO:     main:\tfirst\n\r\n1: 1/5/2024 8:30:0\tINFO:     main:\tsecond\n"
        );
    }

    #[test]
    fn test_file_sink_appends_to_existing_file() {
        let dir = test_dir("file_sink_append");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("app.log"), "previous run\n").unwrap();
        let mut sink = FileSink::new(&dir);
        sink.open("app.log").unwrap();
        sink.write(&entry(0, "new run")).unwrap();
        sink.close().unwrap();
        let content = fs::read_to_string(dir.join("app.log")).unwrap();
        assert!(content.starts_with("previous run\n"));
        assert!(content.ends_with("new run\n"));
    }

    #[test]
    fn test_file_sink_open_fails_on_directory_target() {
        let dir = test_dir("file_sink_open_fails");
        fs::create_dir_all(dir.join("Engine.log")).unwrap();
        let mut sink = FileSink::new(&dir);
        assert!(sink.open("Engine.log").is_err());
        assert!(sink.path().is_none());
    }

    #[test]
    fn test_file_sink_rejects_writes_when_closed() {
        let dir = test_dir("file_sink_closed");
        let mut sink = FileSink::new(&dir);
        let err = sink.write(&entry(0, "too early")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotConnected);
        sink.open("app.log").unwrap();
        sink.close().unwrap();
        sink.close().unwrap();
        let err = sink.write(&entry(1, "too late")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotConnected);
    }

    #[test]
    fn test_memory_sink_records_lifecycle() {
        let observer = MemorySink::new();
        let mut sink = observer.clone();
        sink.open("memory").unwrap();
        sink.write(&entry(0, "kept")).unwrap();
        sink.flush().unwrap();
        sink.close().unwrap();
        assert!(sink.write(&entry(1, "late")).is_err());
        assert_eq!(observer.destination().as_deref(), Some("memory"));
        assert_eq!(observer.lines().len(), 1);
        assert_eq!(observer.flushes(), 1);
        assert_eq!(observer.close_calls(), 1);
        assert_eq!(observer.writes_after_close(), 1);
    }

    #[test]
    fn test_memory_sink_failures() {
        let mut sink = MemorySink::new().fail_open();
        assert_eq!(
            sink.open("x").unwrap_err().kind(),
            io::ErrorKind::PermissionDenied
        );
        let mut sink = MemorySink::new().fail_writes();
        sink.open("x").unwrap();
        assert!(sink.write(&entry(0, "lost")).is_err());
        assert!(sink.lines().is_empty());
    }

    #[test]
    fn test_console_sink() {
        let mut sink = ConsoleSink;
        sink.open("stdout").unwrap();
        for (sequence, severity) in Severity::ALL.into_iter().enumerate() {
            let time = NaiveDate::from_ymd_opt(2024, 5, 1)
                .unwrap()
                .and_hms_opt(8, 30, 0)
                .unwrap();
            let entry = LogEntry::render(sequence as u64, time, severity, "main", "hello");
            sink.write(&entry).unwrap();
        }
        sink.close().unwrap();
    }

    #[test]
    fn test_app_log_directory_layout() {
        assert_eq!(
            app_log_directory(Path::new("/home/user/Documents"), "SandboxDirectX"),
            PathBuf::from("/home/user/Documents/SandboxDirectX/logs")
        );
    }

    #[test]
    fn test_log_directory_resolution() {
        let base = dirs::document_dir().or_else(dirs::home_dir);
        match (log_directory("SandboxDirectX"), base) {
            (Ok(dir), Some(base)) => {
                assert_eq!(dir, app_log_directory(&base, "SandboxDirectX"));
            }
            (Err(EngineError::NoUserDirectory), None) => {}
            (result, base) => panic!("unexpected resolution {result:?} for base {base:?}"),
        }
    }
}
