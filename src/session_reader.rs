//! JSONL session reader: parses a recorded `events.jsonl` back into
//! `StampedEvent`s.
//!
//! Reads the header line first, then yields events one at a time. Works with
//! any `BufRead`: files, in-memory buffers, stdin.

use crate::error::SessionError;
use crate::event_log::{SessionHeader, SessionStats, SESSION_FORMAT};
use crate::types::StampedEvent;
use log::warn;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

pub struct SessionReader<R: BufRead> {
    reader: R,
    pub header: SessionHeader,
    line_buf: String,
    line_no: usize,
}

impl SessionReader<BufReader<File>> {
    pub fn open_file(path: &Path) -> Result<Self, SessionError> {
        Self::open(BufReader::new(File::open(path)?))
    }
}

impl<R: BufRead> SessionReader<R> {
    /// Read and validate the header line.
    pub fn open(mut reader: R) -> Result<Self, SessionError> {
        let mut first_line = String::new();
        reader.read_line(&mut first_line)?;
        let first_line = first_line.trim();
        if first_line.is_empty() {
            return Err(SessionError::Empty);
        }

        // Check the format tag before the full shape for a clearer error
        let raw: serde_json::Value =
            serde_json::from_str(first_line).map_err(SessionError::Header)?;
        let format = raw["format"].as_str().unwrap_or_default();
        if format != SESSION_FORMAT {
            return Err(SessionError::UnknownFormat(format.to_string()));
        }
        let header: SessionHeader = serde_json::from_value(raw).map_err(SessionError::Header)?;

        Ok(Self {
            reader,
            header,
            line_buf: String::new(),
            line_no: 1,
        })
    }

    /// Next event. `None` at EOF, `Err` for an unreadable or unparseable line.
    /// Blank lines are skipped.
    pub fn next_event(&mut self) -> Option<Result<StampedEvent, SessionError>> {
        loop {
            self.line_buf.clear();
            match self.reader.read_line(&mut self.line_buf) {
                Ok(0) => return None,
                Ok(_) => {
                    self.line_no += 1;
                    let trimmed = self.line_buf.trim();
                    if trimmed.is_empty() {
                        continue;
                    }
                    return Some(serde_json::from_str(trimmed).map_err(|source| {
                        SessionError::Event {
                            line: self.line_no,
                            source,
                        }
                    }));
                }
                Err(e) => return Some(Err(e.into())),
            }
        }
    }

    /// Every remaining event, skipping malformed lines.
    pub fn read_all(self) -> Vec<StampedEvent> {
        self.filter_map(|r| r.map_err(|e| warn!("Skipping: {}", e)).ok())
            .collect()
    }
}

impl<R: BufRead> Iterator for SessionReader<R> {
    type Item = Result<StampedEvent, SessionError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_event()
    }
}

/// Totals for a recorded session, as the logger would have written them.
pub fn summarize(events: &[StampedEvent]) -> SessionStats {
    SessionStats::from_events(events.iter().map(|s| &s.event))
}
