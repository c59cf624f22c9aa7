//! Human-readable console sink.

use std::io::{self, Write};
use std::sync::Mutex;

use crate::observability::severity::Severity;
use crate::observability::sink::{format_timestamp, LogRecord, LogSink, SinkError, SinkOptions};

/// Writes one line per record:
///
/// ```text
/// I, [2024-03-01T12:30:05.123Z #4242]  INFO -- gauge: started
/// ```
pub struct ConsoleSink {
    name: String,
    progname: Option<String>,
    options: SinkOptions,
    out: Mutex<Box<dyn Write + Send>>,
}

impl ConsoleSink {
    /// Console sink on standard output.
    pub fn stdout(progname: Option<String>) -> Self {
        Self::with_writer("console", progname, Box::new(io::stdout()))
    }

    pub fn with_writer(name: impl Into<String>, progname: Option<String>, out: Box<dyn Write + Send>) -> Self {
        Self {
            name: name.into(),
            progname,
            options: SinkOptions::new(Severity::default()),
            out: Mutex::new(out),
        }
    }

    fn render(&self, record: &LogRecord) -> String {
        format!(
            "{}, [{} #{}] {:>5} -- {}: {}\n",
            record.severity.letter(),
            format_timestamp(&record.timestamp),
            record.pid,
            record.severity.as_str(),
            self.progname.as_deref().unwrap_or(""),
            record.message
        )
    }
}

impl LogSink for ConsoleSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn options(&self) -> &SinkOptions {
        &self.options
    }

    fn emit(&self, record: &LogRecord) -> Result<(), SinkError> {
        let line = self.render(record);
        let mut out = self.out.lock().map_err(|_| SinkError::Poisoned)?;
        out.write_all(line.as_bytes())?;
        out.flush()?;
        Ok(())
    }

    fn close(&self) -> Result<(), SinkError> {
        let mut out = self.out.lock().map_err(|_| SinkError::Poisoned)?;
        out.flush()?;
        Ok(())
    }
}
