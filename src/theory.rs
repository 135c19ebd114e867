use crate::types::{Category, DerivedContent};
use log::warn;
use std::collections::HashMap;

/// The 12 pitch classes starting at C. Black keys carry both spellings.
pub const PITCH_CLASSES: [&str; 12] = [
    "C", "C#/Db", "D", "D#/Eb", "E", "F", "F#/Gb", "G", "G#/Ab", "A", "A#/Bb", "B",
];

const MAJOR_STEPS: [usize; 7] = [0, 2, 4, 5, 7, 9, 11];
const MINOR_STEPS: [usize; 7] = [0, 2, 3, 5, 7, 8, 10];

const MAJOR_QUALITIES: [&str; 7] = ["maj", "min", "min", "maj", "maj", "min", "dim"];
const MINOR_QUALITIES: [&str; 7] = ["min", "dim", "maj", "min", "min", "maj", "maj"];

pub const MAJOR_ROMANS: [&str; 7] = ["I", "ii", "iii", "IV", "V", "vi", "vii°"];
pub const MINOR_ROMANS: [&str; 7] = ["i", "ii°", "III", "iv", "v", "VI", "VII"];

/// Rhythm glyph for names missing from the table: plain four beats.
pub const DEFAULT_RHYTHM_GLYPH: &str = "♩ ♩ ♩ ♩";

pub const DEFAULT_VIBE_HINT: &str = "Follow the feeling";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Major,
    Minor,
}

/// A key name split into its root pitch class and mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeySignature {
    /// Index into `PITCH_CLASSES`.
    pub root: usize,
    pub mode: Mode,
}

impl KeySignature {
    /// Parse `"<root> <Major|Minor>"`. An unrecognized root falls back to C.
    pub fn parse(key: &str) -> Self {
        let mut parts = key.split_whitespace();
        let root_token = parts.next().unwrap_or("");
        let mode = match parts.next() {
            Some("Major") => Mode::Major,
            _ => Mode::Minor,
        };
        let root = root_index(root_token).unwrap_or_else(|| {
            warn!("Unrecognized key root {:?} in {:?}; using C", root_token, key);
            0
        });
        Self { root, mode }
    }
}

/// Locate a root note. Exact spellings win over substring matches so that
/// "E" resolves to E, not to "D#/Eb".
pub fn root_index(token: &str) -> Option<usize> {
    if token.is_empty() {
        return None;
    }
    PITCH_CLASSES
        .iter()
        .position(|pc| *pc == token || pc.split('/').any(|s| s == token))
        .or_else(|| PITCH_CLASSES.iter().position(|pc| pc.contains(token)))
}

/// The seven diatonic triads of `key`, e.g. `"C maj"`, `"D min"`, ….
pub fn chords_for_key(key: &str) -> [String; 7] {
    let sig = KeySignature::parse(key);
    let (steps, qualities) = match sig.mode {
        Mode::Major => (MAJOR_STEPS, MAJOR_QUALITIES),
        Mode::Minor => (MINOR_STEPS, MINOR_QUALITIES),
    };
    std::array::from_fn(|i| {
        let pc = PITCH_CLASSES[(sig.root + steps[i]) % 12];
        format!("{} {}", pc, qualities[i])
    })
}

/// Roman numeral labels for the key's mode; independent of the root.
pub fn roman_numerals_for_key(key: &str) -> [&'static str; 7] {
    if key.contains("Major") {
        MAJOR_ROMANS
    } else {
        MINOR_ROMANS
    }
}

/// Spell a progression in the chords of `key`: "I-IV-V" in C Major becomes
/// "C maj - F maj - G maj". Tokens that don't resolve pass through as-is.
///
/// bIII, bVI and bVII resolve to the diatonic chords on degrees 3, 6 and 7,
/// not to the borrowed chords they name.
pub fn progression_chord_hint(progression: &str, key: &str) -> String {
    let chords = chords_for_key(key);
    let romans = roman_numerals_for_key(key);

    let mut map: HashMap<String, &str> = HashMap::new();
    for (roman, chord) in romans.iter().zip(chords.iter()) {
        let bare = roman.trim_end_matches('°');
        map.insert(roman.to_string(), chord);
        map.insert(bare.to_string(), chord);
        map.insert(bare.to_uppercase(), chord);
        map.insert(bare.to_lowercase(), chord);
    }
    for (numeral, idx) in [("III", 2), ("VI", 5), ("VII", 6)] {
        for flat in ["b", "♭"] {
            map.insert(format!("{}{}", flat, numeral), &chords[idx]);
            map.insert(format!("{}{}", flat, numeral.to_lowercase()), &chords[idx]);
        }
    }

    progression
        .split('-')
        .map(|token| {
            let token = token.trim();
            map.get(token).copied().unwrap_or(token)
        })
        .collect::<Vec<_>>()
        .join(" - ")
}

/// Note-glyph picture of a rhythm.
pub fn rhythm_glyph(name: &str) -> &'static str {
    match name {
        "4/4 Basic" => "♩ ♩ ♩ ♩",
        "3/4 Waltz" => "♩ ♩ ♩",
        "6/8 Compound" => "♪♪♪ ♪♪♪",
        "5/4 Odd Meter" => "♩ ♩ ♩ ♩ ♩",
        "7/8 Asymmetric" => "♪♪♪♪ ♪♪♪",
        "12/8 Blues" => "♩. ♩. ♩. ♩.",
        "2/4 March" => "♩ ♩",
        "Syncopated" => "♪ ♩ ♪ ▯",
        "Swing" => "♪♫ ♪♫",
        "Backbeat" => "▯ ♩ ▯ ♩",
        "Half-time" => "▮ ▯ ▮ ▯",
        "Double-time" => "♪♪♪♪ ♪♪♪♪",
        "Dotted" => "♩. ♪ ♩. ♪",
        "Triplets" => "♪♪♪ ♪♪♪ ♪♪♪ ♪♪♪",
        "Polyrhythm" => "♩♩♩ ♪♪♪♪",
        "Shifting Accents" => "▮♩♩ ♩▮♩",
        _ => DEFAULT_RHYTHM_GLYPH,
    }
}

/// Short writing prompt qualifying a mood.
pub fn vibe_hint(name: &str) -> &'static str {
    match name {
        "Melancholic" => "Slow it down, let the minor chords breathe",
        "Euphoric" => "Big open voicings, lift the chorus",
        "Dreamy" => "Wash it in reverb and suspended chords",
        "Aggressive" => "Drive the low end, cut the rests short",
        "Nostalgic" => "Warm tones, a melody you half remember",
        "Triumphant" => "Brass-like stabs on the downbeat",
        "Mysterious" => "Leave space, hint at the resolution",
        "Playful" => "Bouncy staccato and a cheeky hook",
        "Ethereal" => "High register pads, no hard edges",
        "Haunting" => "A lone voice over a drone",
        "Intense" => "Build tension, delay the release",
        "Serene" => "Gentle dynamics, long sustains",
        "Chaotic" => "Break the pattern every few bars",
        "Uplifting" => "Rising lines into a major landing",
        "Somber" => "Low and sparse, heavy on the pauses",
        "Energetic" => "Keep the eighths moving",
        "Reflective" => "Let the lyric lead the melody",
        "Dramatic" => "Contrast quiet verses with a huge hit",
        "Whimsical" => "Odd intervals and toy-box timbres",
        "Tense" => "Hold the dissonance one beat longer",
        "Hopeful" => "Start small, end on the bright chord",
        "Gritty" => "Distort something, keep it raw",
        "Cosmic" => "Slow arpeggios drifting in stereo",
        "Intimate" => "Close-miked, barely above a whisper",
        "Anthemic" => "Gang vocals and a four-chord stomp",
        "Hypnotic" => "One riff, endless small variations",
        "Quirky" => "Unexpected stops and off-kilter accents",
        "Majestic" => "Wide chords, slow harmonic rhythm",
        "Brooding" => "Dark low strings, minor everything",
        "Bittersweet" => "Major melody over minor harmony",
        _ => DEFAULT_VIBE_HINT,
    }
}

/// Derived card content for `value` on `category`. Progression hints need
/// the currently selected key.
pub fn derive(category: Category, value: &str, current_key: &str) -> DerivedContent {
    match category {
        Category::Key => DerivedContent::Key {
            romans: roman_numerals_for_key(value).map(str::to_string),
            chords: chords_for_key(value),
        },
        Category::Progression => DerivedContent::Progression {
            chord_hint: progression_chord_hint(value, current_key),
        },
        Category::Vibe => DerivedContent::Vibe {
            hint: vibe_hint(value).to_string(),
        },
        Category::Tempo => DerivedContent::Tempo {
            glyph: rhythm_glyph(value).to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;

    #[test]
    fn test_c_major_chords() {
        assert_eq!(
            chords_for_key("C Major"),
            ["C maj", "D min", "E min", "F maj", "G maj", "A min", "B dim"]
        );
    }

    #[test]
    fn test_a_minor_chords() {
        assert_eq!(
            chords_for_key("A Minor"),
            ["A min", "B dim", "C maj", "D min", "E min", "F maj", "G maj"]
        );
    }

    #[test]
    fn test_natural_roots_resolve_exactly() {
        // Substring-first lookup would send these to neighbouring black keys.
        assert_eq!(root_index("E"), Some(4));
        assert_eq!(root_index("B"), Some(11));
        assert_eq!(root_index("D"), Some(2));
        assert_eq!(root_index("Bb"), Some(10));
        assert_eq!(root_index("G#"), Some(8));
        assert_eq!(root_index("H"), None);
        assert_eq!(chords_for_key("E Major")[0], "E maj");
        assert_eq!(chords_for_key("Eb Minor")[0], "D#/Eb min");
    }

    #[test]
    fn test_unknown_root_falls_back_to_c() {
        assert_eq!(chords_for_key("H Major")[0], "C maj");
        assert_eq!(chords_for_key("")[0], "C min");
    }

    #[test]
    fn test_romans_by_mode() {
        assert_eq!(roman_numerals_for_key("F# Major")[6], "vii°");
        assert_eq!(roman_numerals_for_key("F# Minor")[1], "ii°");
    }

    #[test]
    fn test_progression_hint_in_c_major() {
        assert_eq!(
            progression_chord_hint("I-IV-V", "C Major"),
            "C maj - F maj - G maj"
        );
        assert_eq!(
            progression_chord_hint("vi-IV-I-V", "C Major"),
            "A min - F maj - C maj - G maj"
        );
    }

    #[test]
    fn test_progression_hint_case_insensitive_match() {
        // Lowercase numerals resolve to the same degree in a major key
        assert_eq!(
            progression_chord_hint("i-iv-v", "C Major"),
            "C maj - F maj - G maj"
        );
        // vii° is reachable without the degree mark
        assert_eq!(progression_chord_hint("vii", "C Major"), "B dim");
    }

    #[test]
    fn test_flat_degrees_use_diatonic_approximation() {
        assert_eq!(
            progression_chord_hint("I-bIII-bVII-IV", "C Major"),
            "C maj - E min - B dim - F maj"
        );
        assert_eq!(
            progression_chord_hint("i-♭VI-♭VII", "A Minor"),
            "A min - F maj - G maj"
        );
    }

    #[test]
    fn test_unresolved_tokens_pass_through() {
        assert_eq!(
            progression_chord_hint("I-X-V", "C Major"),
            "C maj - X - G maj"
        );
    }

    #[test]
    fn test_rhythm_glyph_default() {
        assert_eq!(rhythm_glyph("Swing"), "♪♫ ♪♫");
        assert_eq!(rhythm_glyph("Bossa Nova"), DEFAULT_RHYTHM_GLYPH);
    }

    #[test]
    fn test_every_default_entry_has_its_own_glyph_and_hint() {
        let c = Catalog::default();
        for tempo in c.values(Category::Tempo) {
            if tempo != "4/4 Basic" {
                assert_ne!(rhythm_glyph(tempo), DEFAULT_RHYTHM_GLYPH, "{}", tempo);
            }
        }
        for vibe in c.values(Category::Vibe) {
            assert_ne!(vibe_hint(vibe), DEFAULT_VIBE_HINT, "{}", vibe);
        }
        assert_eq!(vibe_hint("Sleepy"), DEFAULT_VIBE_HINT);
    }

    #[test]
    fn test_derive_dispatch() {
        match derive(Category::Key, "G Major", "") {
            DerivedContent::Key { romans, chords } => {
                assert_eq!(romans[0], "I");
                assert_eq!(chords[4], "D maj");
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(
            derive(Category::Progression, "ii-V-I", "G Major"),
            DerivedContent::Progression {
                chord_hint: "A min - D maj - G maj".into()
            }
        );
    }
}
