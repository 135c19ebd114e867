//! Reel content: the authored value lists and the one-time sort rules.
//!
//! Keys sort Major-first, then alphabetically. Progressions sort by the
//! digits of their scale degrees ("I-IV-V" → 145), with minor progressions
//! half a step after the major one of equal value. Vibes and rhythms keep
//! their authored order.

use crate::error::CatalogError;
use crate::types::Category;
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Rank assigned to progressions with no recognizable degree token.
pub const UNPARSABLE_RANK: u64 = 9999;

/// Raw, unsorted entries as authored (or as loaded from a catalog file).
/// Missing categories in a file fall back to the built-in lists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogEntries {
    #[serde(default = "default_keys")]
    pub key: Vec<String>,
    #[serde(default = "default_progressions")]
    pub progression: Vec<String>,
    #[serde(default = "default_vibes")]
    pub vibe: Vec<String>,
    #[serde(default = "default_tempos")]
    pub tempo: Vec<String>,
}

impl Default for CatalogEntries {
    fn default() -> Self {
        Self {
            key: default_keys(),
            progression: default_progressions(),
            vibe: default_vibes(),
            tempo: default_tempos(),
        }
    }
}

/// Ordered, validated values for every reel. Immutable once built.
#[derive(Debug, Clone)]
pub struct Catalog {
    reels: [Vec<String>; 4],
}

impl Catalog {
    /// Validate (non-empty, no duplicates) and apply the sort rules.
    pub fn new(entries: CatalogEntries) -> Result<Self, CatalogError> {
        let CatalogEntries {
            key,
            progression,
            vibe,
            tempo,
        } = entries;
        let reels = [key, progression, vibe, tempo];
        for category in Category::ALL {
            validate(category, &reels[category.slot()])?;
        }
        Ok(Self::sorted(reels))
    }

    /// Load entries from a JSON file: `{"key": [...], "progression": [...], ...}`.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let data = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let entries: CatalogEntries =
            serde_json::from_str(&data).map_err(|source| CatalogError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        let catalog = Self::new(entries)?;
        info!("Loaded catalog from {:?}", path);
        Ok(catalog)
    }

    fn sorted(mut reels: [Vec<String>; 4]) -> Self {
        sort_keys(&mut reels[Category::Key.slot()]);
        sort_progressions(&mut reels[Category::Progression.slot()]);
        Self { reels }
    }

    pub fn values(&self, category: Category) -> &[String] {
        &self.reels[category.slot()]
    }

    pub fn len(&self, category: Category) -> usize {
        self.reels[category.slot()].len()
    }

    /// Value at `index`. Out-of-range is an internal invariant violation.
    pub fn value(&self, category: Category, index: usize) -> &str {
        let values = &self.reels[category.slot()];
        debug_assert!(
            index < values.len(),
            "{} index {} out of range (len {})",
            category,
            index,
            values.len()
        );
        &values[index.min(values.len() - 1)]
    }
}

impl Default for Catalog {
    fn default() -> Self {
        let e = CatalogEntries::default();
        Self::sorted([e.key, e.progression, e.vibe, e.tempo])
    }
}

fn validate(category: Category, values: &[String]) -> Result<(), CatalogError> {
    if values.is_empty() {
        return Err(CatalogError::Empty(category));
    }
    let mut seen = HashSet::with_capacity(values.len());
    for v in values {
        if !seen.insert(v.as_str()) {
            return Err(CatalogError::Duplicate {
                category,
                value: v.clone(),
            });
        }
    }
    Ok(())
}

// ─── Sort rules ─────────────────────────────────────────────────────────────

/// Major keys first; alphabetical within each group.
pub fn sort_keys(keys: &mut [String]) {
    keys.sort_by(|a, b| {
        let a_major = a.contains("Major");
        let b_major = b.contains("Major");
        b_major.cmp(&a_major).then_with(|| a.cmp(b))
    });
}

/// Ascending by `progression_sort_key`; stable for equal keys.
pub fn sort_progressions(progressions: &mut [String]) {
    progressions.sort_by(|a, b| progression_sort_key(a).total_cmp(&progression_sort_key(b)));
}

/// Scale degree (1–7) of a roman-numeral token, flats included.
/// `♭` is accepted as a spelling of `b`.
pub fn degree_of(token: &str) -> Option<u8> {
    let token = token.trim();
    let bare = token
        .strip_prefix('b')
        .or_else(|| token.strip_prefix('♭'))
        .filter(|rest| !rest.is_empty());
    let (numeral, flat) = match bare {
        Some(rest) => (rest, true),
        None => (token, false),
    };
    let degree = match numeral.to_ascii_lowercase().as_str() {
        "i" => 1,
        "ii" => 2,
        "iii" => 3,
        "iv" => 4,
        "v" => 5,
        "vi" => 6,
        "vii" => 7,
        _ => return None,
    };
    // Only bIII, bVI and bVII are part of the vocabulary.
    if flat && !matches!(degree, 3 | 6 | 7) {
        return None;
    }
    Some(degree)
}

/// Digits of every recognized degree token, concatenated into one integer.
/// Saturates at `u64::MAX` for very long progressions.
pub fn progression_rank(progression: &str) -> u64 {
    progression
        .split('-')
        .filter_map(degree_of)
        .fold(None, |rank: Option<u64>, d| {
            Some(rank.unwrap_or(0).saturating_mul(10).saturating_add(u64::from(d)))
        })
        .unwrap_or(UNPARSABLE_RANK)
}

/// Minor progressions start on a lowercase tonic.
pub fn is_minor_progression(progression: &str) -> bool {
    progression.starts_with("i-") || progression == "i"
}

/// `progression_rank`, plus 0.5 for minor progressions.
pub fn progression_sort_key(progression: &str) -> f64 {
    let rank = progression_rank(progression) as f64;
    if is_minor_progression(progression) {
        rank + 0.5
    } else {
        rank
    }
}

// ─── Built-in content ───────────────────────────────────────────────────────

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn default_keys() -> Vec<String> {
    strings(&[
        // Major, circle of fifths
        "C Major", "G Major", "D Major", "A Major", "E Major", "B Major", "F# Major",
        "C# Major", "F Major", "Bb Major", "Eb Major", "Ab Major", "Db Major", "Gb Major",
        // Minor, circle of fifths
        "A Minor", "E Minor", "B Minor", "F# Minor", "C# Minor", "G# Minor", "D# Minor",
        "A# Minor", "D Minor", "G Minor", "C Minor", "F Minor", "Bb Minor", "Eb Minor",
    ])
}

fn default_progressions() -> Vec<String> {
    strings(&[
        "I-IV-V",
        "i-iv-v",
        "i-iv-VII",
        "I-ii-iii-IV",
        "I-iii-IV-V",
        "I-bIII-bVII-IV",
        "i-bIII-bVII",
        "I-IV-I-V",
        "I-IV-vi-V",
        "I-V-bVII-IV",
        "I-V-vi-IV",
        "i-bVI-bVII",
        "I-vi-ii-V",
        "i-VI-III-VII",
        "I-vi-IV-V",
        "I-bVII-bVI-V",
        "i-bVII-bVI-V",
        "I-bVII-bVI-bVII",
        "ii-V-I",
        "vi-IV-I-V",
    ])
}

fn default_vibes() -> Vec<String> {
    strings(&[
        "Melancholic", "Euphoric", "Dreamy", "Aggressive", "Nostalgic",
        "Triumphant", "Mysterious", "Playful", "Ethereal", "Haunting",
        "Intense", "Serene", "Chaotic", "Uplifting", "Somber",
        "Energetic", "Reflective", "Dramatic", "Whimsical", "Tense",
        "Hopeful", "Gritty", "Cosmic", "Intimate", "Anthemic",
        "Hypnotic", "Quirky", "Majestic", "Brooding", "Bittersweet",
    ])
}

fn default_tempos() -> Vec<String> {
    strings(&[
        "4/4 Basic",
        "3/4 Waltz",
        "6/8 Compound",
        "5/4 Odd Meter",
        "7/8 Asymmetric",
        "12/8 Blues",
        "2/4 March",
        "Syncopated",
        "Swing",
        "Backbeat",
        "Half-time",
        "Double-time",
        "Dotted",
        "Triplets",
        "Polyrhythm",
        "Shifting Accents",
    ])
}
