use crate::types::*;
use crossbeam_channel::Receiver;
use std::io::{self, Write};

const WIDTH: usize = 62;

/// Renders the four reels as an ASCII board from the render event stream.
///
/// Keeps its own copy of each visible card; nothing is read back from the
/// machine. With `redraw` the screen is cleared for every frame, otherwise
/// frames are appended (useful when typing commands into the same terminal).
pub struct ConsoleDisplay {
    rx: Receiver<StampedEvent>,
    redraw: bool,
    cards: [Option<Card>; 4],
    sliding: [bool; 4],
    status: String,
}

impl ConsoleDisplay {
    pub fn new(rx: Receiver<StampedEvent>, redraw: bool) -> Self {
        Self {
            rx,
            redraw,
            cards: Default::default(),
            sliding: [false; 4],
            status: String::new(),
        }
    }

    pub fn run(mut self) {
        let mut stdout = io::stdout();
        let _ = self.run_to(&mut stdout);
    }

    /// Consume events until the channel closes, drawing a frame whenever
    /// something visible changed.
    pub fn run_to<W: Write>(&mut self, out: &mut W) -> io::Result<()> {
        while let Ok(stamped) = self.rx.recv() {
            if self.apply(&stamped) {
                if self.redraw {
                    // Clear screen and move cursor home
                    write!(out, "\x1b[2J\x1b[H")?;
                }
                write!(out, "{}", self.frame(stamped.t_ms))?;
                out.flush()?;
            }
        }
        Ok(())
    }

    /// Update local state. Returns whether a frame should be drawn.
    fn apply(&mut self, stamped: &StampedEvent) -> bool {
        match &stamped.event {
            RenderEvent::SlideStart { card, direction } => {
                let slot = card.category.slot();
                self.sliding[slot] = true;
                self.status = format!(
                    "{} {}",
                    card.category,
                    if *direction == Direction::Up { "▲" } else { "▼" }
                );
                self.cards[slot] = Some(card.clone());
            }
            RenderEvent::SlideFinish { category } => {
                self.sliding[category.slot()] = false;
                return false;
            }
            RenderEvent::RotationComplete { .. } | RenderEvent::ReelSettled { .. } => return false,
            RenderEvent::CardRefresh { card } => {
                self.cards[card.category.slot()] = Some(card.clone());
            }
            RenderEvent::LeverCue => self.status = "LEVER ↓".into(),
            RenderEvent::LeverRelease => self.status = "LEVER ↑  spinning...".into(),
            RenderEvent::LeverComplete { .. } => self.status = "LANDED".into(),
            RenderEvent::RhythmStarted { name, duration_ms } => {
                self.status = format!("♪ {} ({:.1}s)", name, *duration_ms as f64 / 1000.0);
            }
            RenderEvent::RhythmStopped => self.status = "♪ stopped".into(),
        }
        true
    }

    fn frame(&self, t_ms: u64) -> String {
        let mut s = String::new();
        s.push_str(&format!("╔{}╗\n", "═".repeat(WIDTH)));
        s.push_str(&boxed(&format!(
            "SLOT MUSE  {:>8.2}s  {}",
            t_ms as f64 / 1000.0,
            self.status
        )));
        s.push_str(&format!("╠{}╣\n", "═".repeat(WIDTH)));
        for category in Category::ALL {
            let slot = category.slot();
            let marker = if self.sliding[slot] { "»" } else { " " };
            match &self.cards[slot] {
                Some(card) => {
                    s.push_str(&boxed(&format!(
                        "{} {:<12}{}",
                        marker,
                        category.name().to_uppercase(),
                        card.value
                    )));
                    for line in detail_lines(&card.derived) {
                        s.push_str(&boxed(&format!("  {:<12}{}", "", line)));
                    }
                }
                None => s.push_str(&boxed(&format!("{} {:<12}---", marker, category.name()))),
            }
        }
        s.push_str(&format!("╚{}╝\n", "═".repeat(WIDTH)));
        s
    }
}

fn detail_lines(derived: &DerivedContent) -> Vec<String> {
    match derived {
        DerivedContent::Key { romans, chords } => {
            let cells: Vec<String> = romans
                .iter()
                .zip(chords)
                .map(|(r, c)| format!("{}:{}", r, c.replace(' ', "")))
                .collect();
            vec![cells[..4].join(" "), cells[4..].join(" ")]
        }
        DerivedContent::Progression { chord_hint } => vec![chord_hint.clone()],
        DerivedContent::Vibe { hint } => vec![format!("\"{}\"", hint)],
        DerivedContent::Tempo { glyph } => vec![glyph.clone()],
    }
}

/// One board row, padded or cut to the box width by char count.
fn boxed(content: &str) -> String {
    let mut line: String = content.chars().take(WIDTH - 2).collect();
    let pad = (WIDTH - 2).saturating_sub(line.chars().count());
    line.push_str(&" ".repeat(pad));
    format!("║ {} ║\n", line)
}
