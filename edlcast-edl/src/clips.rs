//! Clip name normalization and the clip catalog.

use std::collections::HashMap;
use std::path::Path;

use crate::error::Result;

/// Default prefix turning a catalog identifier into a source URL.
pub const DEFAULT_WATCH_URL_BASE: &str = "https://www.youtube.com/watch?v=";

/// Extensions of clips that carry no picture and are never resolved.
const AUDIO_EXTENSIONS: [&str; 2] = [".wav", ".mp3"];

/// Lookup from normalized clip name to source URL.
pub trait ClipResolver {
    fn lookup(&self, name: &str) -> Option<String>;
}

/// Outcome of normalizing a `FROM CLIP NAME` value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClipKey {
    /// Audio-only clip; left unresolved.
    AudioOnly,
    /// Key to query the resolver with.
    Name(String),
}

/// Normalize a raw clip name for catalog lookup.
///
/// Lowercases, folds `_` and `-` to spaces and drops the final extension.
/// Dots inside the stem become spaces too. A name without any dot is used
/// whole rather than reduced to an empty key.
pub fn normalize_clip_name(raw: &str) -> ClipKey {
    let folded = raw.trim().to_lowercase().replace(['_', '-'], " ");

    if AUDIO_EXTENSIONS.iter().any(|ext| folded.ends_with(ext)) {
        return ClipKey::AudioOnly;
    }

    let stem = match folded.rsplit_once('.') {
        Some((stem, _ext)) => stem.replace('.', " "),
        None => folded,
    };
    ClipKey::Name(stem)
}

/// Catalog of clips published on the media platform.
///
/// Titles are lower-cased on insertion; lookups return
/// `watch_url_base + identifier`.
#[derive(Debug, Clone)]
pub struct ClipCatalog {
    entries: HashMap<String, String>,
    watch_url_base: String,
}

impl Default for ClipCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl ClipCatalog {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            watch_url_base: DEFAULT_WATCH_URL_BASE.into(),
        }
    }

    pub fn with_watch_url_base(mut self, base: impl Into<String>) -> Self {
        self.watch_url_base = base.into();
        self
    }

    pub fn insert(&mut self, title: &str, id: impl Into<String>) {
        self.entries.insert(title.to_lowercase(), id.into());
    }

    /// Build from a JSON object of `title -> identifier`.
    pub fn from_json_str(input: &str) -> Result<Self> {
        let raw: HashMap<String, String> = serde_json::from_str(input)?;
        let mut catalog = Self::new();
        for (title, id) in raw {
            catalog.insert(&title, id);
        }
        Ok(catalog)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'a> FromIterator<(&'a str, &'a str)> for ClipCatalog {
    fn from_iter<I: IntoIterator<Item = (&'a str, &'a str)>>(iter: I) -> Self {
        let mut catalog = Self::new();
        for (title, id) in iter {
            catalog.insert(title, id);
        }
        catalog
    }
}

impl ClipResolver for ClipCatalog {
    fn lookup(&self, name: &str) -> Option<String> {
        self.entries
            .get(name)
            .map(|id| format!("{}{}", self.watch_url_base, id))
    }
}
