use crate::catalog::Catalog;
use crate::config::TimingConfig;
use crate::types::*;
use crossbeam_channel::Receiver;
use log::{error, info};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Value of the header's `format` field.
pub const SESSION_FORMAT: &str = "slot-muse";

/// First line of every `events.jsonl`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionHeader {
    pub format: String,
    pub version: String,
    pub started_unix_ms: u64,
    /// Lever RNG seed, when the session was seeded.
    pub seed: Option<u64>,
    pub timing: TimingConfig,
    /// Entries per reel in `Category::ALL` order.
    pub reel_sizes: [usize; 4],
}

impl SessionHeader {
    pub fn new(seed: Option<u64>, timing: &TimingConfig, catalog: &Catalog) -> Self {
        Self {
            format: SESSION_FORMAT.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            started_unix_ms: unix_ms(),
            seed,
            timing: timing.clone(),
            reel_sizes: Category::ALL.map(|c| catalog.len(c)),
        }
    }
}

/// Running totals over a stream of render events. Written as `stats.json`
/// at the end of a session and recomputed by the session reader.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionStats {
    pub total_events: u64,
    pub rotations: u64,
    pub lever_pulls: u64,
    pub rhythms_played: u64,
    /// Where the last lever pull landed.
    pub last_selection: Option<Selection>,
}

impl SessionStats {
    pub fn record(&mut self, event: &RenderEvent) {
        self.total_events += 1;
        match event {
            RenderEvent::RotationComplete { .. } => self.rotations += 1,
            RenderEvent::LeverComplete { selection } => {
                self.lever_pulls += 1;
                self.last_selection = Some(selection.clone());
            }
            RenderEvent::RhythmStarted { .. } => self.rhythms_played += 1,
            _ => {}
        }
    }

    pub fn from_events<'a>(events: impl IntoIterator<Item = &'a RenderEvent>) -> Self {
        let mut stats = Self::default();
        for ev in events {
            stats.record(ev);
        }
        stats
    }
}

fn unix_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Journals every render event to `<output_dir>/session_<unix ms>/`:
/// `events.jsonl` (header line, then one `StampedEvent` per line) and
/// `stats.json` once the stream ends.
pub struct EventLog {
    rx: Receiver<StampedEvent>,
    session_dir: PathBuf,
    header: SessionHeader,
}

impl EventLog {
    pub fn create(
        rx: Receiver<StampedEvent>,
        output_dir: &Path,
        header: SessionHeader,
    ) -> io::Result<Self> {
        let session_dir = output_dir.join(format!("session_{}", header.started_unix_ms));
        fs::create_dir_all(&session_dir)?;
        Ok(Self {
            rx,
            session_dir,
            header,
        })
    }

    pub fn session_dir(&self) -> &Path {
        &self.session_dir
    }

    pub fn events_path(&self) -> PathBuf {
        self.session_dir.join("events.jsonl")
    }

    /// Run the logger until every sender is dropped. Blocks the calling thread.
    pub fn run(self) -> io::Result<SessionStats> {
        info!("Event log → {:?}", self.session_dir);

        let mut writer = BufWriter::new(File::create(self.events_path())?);
        serde_json::to_writer(&mut writer, &self.header)?;
        writeln!(writer)?;

        let mut stats = SessionStats::default();
        for stamped in self.rx.iter() {
            serde_json::to_writer(&mut writer, &stamped)?;
            writeln!(writer)?;
            stats.record(&stamped.event);

            if stats.total_events % 100 == 0 {
                writer.flush()?;
            }
        }
        writer.flush()?;

        let stats_path = self.session_dir.join("stats.json");
        let json = serde_json::to_string_pretty(&stats)?;
        fs::write(&stats_path, json)
            .unwrap_or_else(|e| error!("Failed to write stats: {}", e));

        info!(
            "Session saved: {} events, {} rotations, {} lever pulls → {:?}",
            stats.total_events, stats.rotations, stats.lever_pulls, self.session_dir
        );
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;

    fn temp_dir(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("slot_muse_{}_{}", name, std::process::id()))
    }

    #[test]
    fn test_stats_count_by_kind() {
        let selection = Selection {
            indices: [1, 2, 3, 4],
            values: ["a".into(), "b".into(), "c".into(), "d".into()],
        };
        let events = vec![
            RenderEvent::RotationComplete {
                category: Category::Key,
                index: 1,
            },
            RenderEvent::LeverCue,
            RenderEvent::LeverComplete {
                selection: selection.clone(),
            },
            RenderEvent::RhythmStarted {
                name: "Swing".into(),
                duration_ms: 4000,
            },
        ];
        let stats = SessionStats::from_events(&events);
        assert_eq!(stats.total_events, 4);
        assert_eq!(stats.rotations, 1);
        assert_eq!(stats.lever_pulls, 1);
        assert_eq!(stats.rhythms_played, 1);
        assert_eq!(stats.last_selection, Some(selection));
    }

    #[test]
    fn test_log_writes_header_events_and_stats() {
        let out = temp_dir("event_log");
        let (tx, rx) = unbounded();
        let header = SessionHeader::new(Some(7), &TimingConfig::default(), &Catalog::default());
        let log = EventLog::create(rx, &out, header).unwrap();
        let dir = log.session_dir().to_path_buf();

        tx.send(StampedEvent {
            t_ms: 0,
            event: RenderEvent::LeverCue,
        })
        .unwrap();
        tx.send(StampedEvent {
            t_ms: 75,
            event: RenderEvent::LeverRelease,
        })
        .unwrap();
        drop(tx);

        let stats = log.run().unwrap();
        assert_eq!(stats.total_events, 2);

        let text = fs::read_to_string(dir.join("events.jsonl")).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        let header: SessionHeader = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(header.format, SESSION_FORMAT);
        assert_eq!(header.seed, Some(7));
        assert_eq!(header.reel_sizes, [28, 20, 30, 16]);
        assert!(lines[2].contains("lever_release"));

        let saved: SessionStats =
            serde_json::from_str(&fs::read_to_string(dir.join("stats.json")).unwrap()).unwrap();
        assert_eq!(saved, stats);
        let _ = fs::remove_dir_all(&out);
    }
}
