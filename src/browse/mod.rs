//! Browsing core: the navigable item list, directory listing and the
//! recursive streaming search that feeds it.

pub mod item;
pub mod store;
pub(crate) mod walk;

pub use item::Item;
pub use store::{ItemStore, StoreError};

use std::path::Path;

/// Extensions the browser treats as auditionable audio.
pub const AUDIO_EXTENSIONS: &[&str] = &["wav", "mp3", "flac"];

/// Sampler/editor sidecar files that shadow audio names during a walk.
const SIDECAR_EXTENSIONS: &[&str] = &["asd", "nki"];

pub(crate) fn is_audio(path: &Path) -> bool {
    has_extension(path, AUDIO_EXTENSIONS)
}

pub(crate) fn is_sidecar(path: &Path) -> bool {
    has_extension(path, SIDECAR_EXTENSIONS)
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| extensions.iter().any(|e| ext.eq_ignore_ascii_case(e)))
        .unwrap_or(false)
}

pub(crate) fn is_hidden_name(name: &str) -> bool {
    name.starts_with('.')
}

/// True when `haystack` contains every whitespace-separated token of
/// `query`, case-insensitively. Zero tokens match vacuously, so an empty
/// query matches everything.
pub(crate) fn contains_all_tokens(haystack: &str, query: &str) -> bool {
    let haystack = haystack.to_lowercase();
    query
        .split_whitespace()
        .all(|token| haystack.contains(&token.to_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn token_match_is_and_of_tokens() {
        assert!(contains_all_tokens("/samples/kicks/808_KICK_long.wav", "808 kick"));
        assert!(!contains_all_tokens("/samples/kicks/snare_808.wav", "808 kick"));
    }

    #[test]
    fn token_match_ignores_case_and_order() {
        assert!(contains_all_tokens("Deep_Sub_Kick.wav", "kick SUB"));
    }

    #[test]
    fn empty_query_matches_everything() {
        assert!(contains_all_tokens("anything at all", ""));
        assert!(contains_all_tokens("", "   "));
    }

    #[test]
    fn audio_extension_filter() {
        assert!(is_audio(&PathBuf::from("/a/kick.WAV")));
        assert!(is_audio(&PathBuf::from("/a/loop.flac")));
        assert!(!is_audio(&PathBuf::from("/a/kick.wav.asd")));
        assert!(!is_audio(&PathBuf::from("/a/notes.txt")));
        assert!(is_sidecar(&PathBuf::from("/a/kick.wav.asd")));
    }
}
