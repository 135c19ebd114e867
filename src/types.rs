use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;

// ─── Reels ──────────────────────────────────────────────────────────────────

/// One of the four reels. Closed set; `ALL` fixes the lever stagger order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    Key,
    Progression,
    Vibe,
    Tempo,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Key,
        Category::Progression,
        Category::Vibe,
        Category::Tempo,
    ];

    /// Position in `ALL`; used to index per-reel arrays.
    pub fn slot(self) -> usize {
        match self {
            Category::Key => 0,
            Category::Progression => 1,
            Category::Vibe => 2,
            Category::Tempo => 3,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Category::Key => "key",
            Category::Progression => "progression",
            Category::Vibe => "vibe",
            Category::Tempo => "tempo",
        }
    }

    /// Accepts the full name or the short aliases used by the input commands.
    pub fn parse(s: &str) -> Option<Category> {
        match s.trim().to_ascii_lowercase().as_str() {
            "key" | "k" => Some(Category::Key),
            "progression" | "prog" | "p" => Some(Category::Progression),
            "vibe" | "v" => Some(Category::Vibe),
            "tempo" | "rhythm" | "t" => Some(Category::Tempo),
            _ => None,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Which way a reel turns. `Up` is the top click zone (+1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    pub fn step(self) -> isize {
        match self {
            Direction::Up => 1,
            Direction::Down => -1,
        }
    }
}

/// `(index + offset) mod len`, always landing in `[0, len)`.
pub fn wrap_index(index: usize, offset: isize, len: usize) -> usize {
    debug_assert!(len > 0, "wrap_index on an empty reel");
    let len_i = len as isize;
    ((index as isize + offset % len_i + len_i) % len_i) as usize
}

// ─── Card content ───────────────────────────────────────────────────────────

/// Display data computed from a reel's value. Never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DerivedContent {
    Key {
        romans: [String; 7],
        chords: [String; 7],
    },
    Progression {
        chord_hint: String,
    },
    Vibe {
        hint: String,
    },
    Tempo {
        glyph: String,
    },
}

/// Everything the renderer needs to paint one card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub category: Category,
    pub index: usize,
    pub value: String,
    pub derived: DerivedContent,
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:<11} #{:<2} {}", self.category.name(), self.index, self.value)?;
        match &self.derived {
            DerivedContent::Key { chords, .. } => write!(f, "  [{}]", chords.join(", ")),
            DerivedContent::Progression { chord_hint } => write!(f, "  ({})", chord_hint),
            DerivedContent::Vibe { hint } => write!(f, "  \"{}\"", hint),
            DerivedContent::Tempo { glyph } => write!(f, "  {}", glyph),
        }
    }
}

/// The settled value of every reel, in `Category::ALL` order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    pub indices: [usize; 4],
    pub values: [String; 4],
}

impl Selection {
    pub fn value(&self, category: Category) -> &str {
        &self.values[category.slot()]
    }

    pub fn index(&self, category: Category) -> usize {
        self.indices[category.slot()]
    }
}

// ─── Render events (machine → renderer) ─────────────────────────────────────

/// Notifications for the external renderer. The machine never reads anything
/// back from the renderer; these are the only coupling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RenderEvent {
    /// Begin sliding `card` in. `Up` slides in from below.
    SlideStart { card: Card, direction: Direction },
    /// The slide finished; the old card can be removed.
    SlideFinish { category: Category },
    /// A user-initiated rotation is fully done.
    RotationComplete { category: Category, index: usize },
    /// Lever handle pulled down.
    LeverCue,
    /// Lever handle returns; reels are about to start.
    LeverRelease,
    /// One reel's lever run has finished on its target.
    ReelSettled { category: Category, index: usize },
    /// Every reel has settled. Fires once per lever pull.
    LeverComplete { selection: Selection },
    /// Derived content changed without a slide (e.g. new key → new chord hint).
    CardRefresh { card: Card },
    RhythmStarted { name: String, duration_ms: u64 },
    RhythmStopped,
}

/// A render event with the session time it was emitted at. One JSONL line
/// in a session journal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StampedEvent {
    pub t_ms: u64,
    #[serde(flatten)]
    pub event: RenderEvent,
}

impl fmt::Display for StampedEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:>7} ms] {:?}", self.t_ms, self.event)
    }
}

// ─── Input events (input collaborator → coordinator) ────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InputEvent {
    Rotate(Category, Direction),
    PullLever,
    /// Play the rhythm currently on the tempo reel.
    PlayRhythm,
    StopRhythm,
}

// ─── Session clock ──────────────────────────────────────────────────────────

/// Monotonic session clock shared by the coordinator and its consumers.
#[derive(Clone)]
pub struct SessionClock {
    start: Instant,
}

impl SessionClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn now_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

impl Default for SessionClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_index_both_directions() {
        assert_eq!(wrap_index(0, -1, 5), 4);
        assert_eq!(wrap_index(4, 1, 5), 0);
        assert_eq!(wrap_index(2, -7, 5), 0);
        assert_eq!(wrap_index(3, 0, 5), 3);
    }

    #[test]
    fn test_category_slots_match_all_order() {
        for (i, c) in Category::ALL.iter().enumerate() {
            assert_eq!(c.slot(), i);
            assert_eq!(Category::parse(c.name()), Some(*c));
        }
        assert_eq!(Category::parse("Prog"), Some(Category::Progression));
        assert_eq!(Category::parse("drums"), None);
    }

    #[test]
    fn test_render_event_json_is_tagged() {
        let ev = RenderEvent::SlideFinish {
            category: Category::Vibe,
        };
        let json = serde_json::to_string(&ev).unwrap();
        assert!(json.contains("\"event\":\"slide_finish\""), "{}", json);
        let back: RenderEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ev);
    }

    #[test]
    fn test_stamped_event_is_one_flat_object() {
        let ev = StampedEvent {
            t_ms: 225,
            event: RenderEvent::ReelSettled {
                category: Category::Key,
                index: 3,
            },
        };
        let v: serde_json::Value = serde_json::to_value(&ev).unwrap();
        assert_eq!(v["t_ms"], 225);
        assert_eq!(v["event"], "reel_settled");
        assert_eq!(v["index"], 3);
        let back: StampedEvent = serde_json::from_value(v).unwrap();
        assert_eq!(back, ev);
    }
}
