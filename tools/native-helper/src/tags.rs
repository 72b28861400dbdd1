//! Musical key and tempo tags scraped from a video's title and description.
//!
//! Producers write these in many shapes ("Key: D Minor", "Gm", "F# minor",
//! "140 BPM", "Tempo: 95"). Patterns are tried in order of specificity and
//! the first hit wins.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

static KEY_PATTERNS: Lazy<[Regex; 4]> = Lazy::new(|| {
    [
        Regex::new(r"(?i)\bkey\s*[:\-]?\s*([A-G][#b]?)\s*(minor|major|min|maj)\b").unwrap(),
        Regex::new(r"(?i)\bkey\s*[:\-]?\s*([A-G][#b]?)(m|maj)?\b").unwrap(),
        Regex::new(r"(?i)\b([A-G][#b]?)\s+(minor|major|min|maj)\b").unwrap(),
        // Bare "Am"/"Gmaj" only counts with a capital note.
        Regex::new(r"\b([A-G][#b]?)(m|maj)\b").unwrap(),
    ]
});

static BPM_PATTERNS: Lazy<[Regex; 3]> = Lazy::new(|| {
    [
        Regex::new(r"(?i)\bbpm\s*[:\-]?\s*(\d{2,3})\b").unwrap(),
        Regex::new(r"(?i)\b(\d{2,3})\s*bpm\b").unwrap(),
        Regex::new(r"(?i)\btempo\s*[:\-]?\s*(\d{2,3})\b").unwrap(),
    ]
});

const BPM_RANGE: std::ops::RangeInclusive<u32> = 50..=300;

/// Detected tags; empty strings when nothing was found.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Tags {
    pub key: String,
    pub bpm: String,
}

impl Tags {
    pub fn detect(text: &str) -> Self {
        Self {
            key: detect_key(text).unwrap_or_default(),
            bpm: detect_bpm(text).map(|v| v.to_string()).unwrap_or_default(),
        }
    }
}

/// `"<Note> Minor"`, `"<Note> Major"` or just the note.
pub fn detect_key(text: &str) -> Option<String> {
    let caps = KEY_PATTERNS.iter().find_map(|re| re.captures(text))?;
    let raw_note = caps.get(1)?.as_str();
    let mut chars = raw_note.chars();
    let note: String = chars
        .next()
        .map(|first| first.to_ascii_uppercase().to_string() + chars.as_str())
        .unwrap_or_default();

    let quality = match caps
        .get(2)
        .map(|m| m.as_str().to_ascii_lowercase())
        .as_deref()
    {
        Some("m" | "min" | "minor") => " Minor",
        Some("maj" | "major") => " Major",
        _ => "",
    };
    Some(format!("{note}{quality}"))
}

/// Only the first matching pattern is considered; an out-of-range value
/// there means no tempo.
pub fn detect_bpm(text: &str) -> Option<u32> {
    let caps = BPM_PATTERNS.iter().find_map(|re| re.captures(text))?;
    let value: u32 = caps.get(1)?.as_str().parse().ok()?;
    BPM_RANGE.contains(&value).then_some(value)
}
