//! Event Log
//!
//! Append-only JSONL telemetry logging.

use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::event::AgentEvent;

/// Writes telemetry events to a JSONL file, or discards them.
pub struct EventLog {
    writer: Option<BufWriter<File>>,
    event_count: u64,
}

impl EventLog {
    /// Create a new event log writing to the specified path
    pub fn create(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;

        Ok(Self {
            writer: Some(BufWriter::new(file)),
            event_count: 0,
        })
    }

    /// Create a log that discards events (for testing)
    pub fn null() -> Self {
        Self {
            writer: None,
            event_count: 0,
        }
    }

    /// Number of events seen so far, written or not
    pub fn event_count(&self) -> u64 {
        self.event_count
    }

    /// Log an event
    pub fn log(&mut self, event: &AgentEvent) -> io::Result<()> {
        self.event_count += 1;
        if let Some(ref mut writer) = self.writer {
            let json = event.to_jsonl()?;
            writeln!(writer, "{}", json)?;
        }
        Ok(())
    }

    /// Log multiple events
    pub fn log_batch(&mut self, events: &[AgentEvent]) -> io::Result<()> {
        for event in events {
            self.log(event)?;
        }
        Ok(())
    }

    /// Flush the buffer to disk
    pub fn flush(&mut self) -> io::Result<()> {
        if let Some(ref mut writer) = self.writer {
            writer.flush()?;
        }
        Ok(())
    }
}

impl Drop for EventLog {
    fn drop(&mut self) {
        // Drop cannot report; the final flush is best effort.
        let _ = self.flush();
    }
}

/// Reads a JSONL telemetry file back into memory.
pub fn read_events(path: impl AsRef<Path>) -> io::Result<Vec<AgentEvent>> {
    let content = std::fs::read_to_string(path)?;
    content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| AgentEvent::from_jsonl(line).map_err(io::Error::from))
        .collect()
}
