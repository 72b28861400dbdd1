//! Cross-platform utility functions

use std::path::PathBuf;

use base64::Engine as _;

const FALLBACK_FILENAME: &str = "audio.mp3";

/// Scratch directory for in-flight extractions.
pub fn default_work_dir() -> PathBuf {
    std::env::temp_dir().join("yt-rapper-toolkit")
}

/// YouTube ids are exactly 11 characters of `[A-Za-z0-9_-]`.
pub fn is_valid_video_id(id: &str) -> bool {
    id.len() == 11
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

pub fn watch_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={video_id}")
}

/// Drop characters Windows forbids in file names and collapse whitespace.
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*'))
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// `Title - <Key> <BPM>BPM - Channel.mp3`, or `audio.mp3` without a title.
pub fn build_filename(title: &str, key: &str, bpm: &str, channel: &str) -> String {
    if title.trim().is_empty() {
        return FALLBACK_FILENAME.to_string();
    }
    let mut name = title.to_string();
    let bpm = if bpm.is_empty() {
        String::new()
    } else {
        format!("{bpm}BPM")
    };
    let key_bpm = [key, bpm.as_str()]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    if !key_bpm.is_empty() {
        name.push_str(" - ");
        name.push_str(&key_bpm);
    }
    if !channel.is_empty() {
        name.push_str(" - ");
        name.push_str(channel);
    }
    let name = sanitize_filename(&name);
    if name.is_empty() {
        FALLBACK_FILENAME.to_string()
    } else {
        format!("{name}.mp3")
    }
}

/// `Content-Disposition` with both the plain and RFC 5987 forms.
pub fn content_disposition(filename: &str) -> String {
    let encoded = urlencoding::encode(filename);
    format!("attachment; filename=\"{encoded}\"; filename*=UTF-8''{encoded}")
}

/// Base64 of the UTF-8 file name, for clients that cannot read the
/// disposition header.
pub fn x_filename(filename: &str) -> String {
    base64::engine::general_purpose::STANDARD.encode(filename)
}
