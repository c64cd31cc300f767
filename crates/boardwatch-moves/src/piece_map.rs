use boardwatch_board::TagId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::{fs, path::Path};

/// Labels of a full set, in the order tags are handed out by
/// [`PieceMap::sequential`].
pub const STANDARD_PIECES: [&str; 32] = [
    "wK", "wQ", "wR1", "wR2", "wB1", "wB2", "wN1", "wN2", //
    "wP1", "wP2", "wP3", "wP4", "wP5", "wP6", "wP7", "wP8", //
    "bK", "bQ", "bR1", "bR2", "bB1", "bB2", "bN1", "bN2", //
    "bP1", "bP2", "bP3", "bP4", "bP5", "bP6", "bP7", "bP8",
];

#[derive(thiserror::Error, Debug)]
pub enum PieceMapError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("label {label:?} is assigned to both tag {first} and tag {second}")]
    DuplicateLabel {
        label: String,
        first: TagId,
        second: TagId,
    },
    #[error("a standard set starting at tag {first} runs past the largest tag id")]
    TagRange { first: TagId },
}

/// Static tag id -> piece label table (`{"12": "wK", ...}` on disk).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<TagId, String>",
    into = "BTreeMap<TagId, String>"
)]
pub struct PieceMap {
    labels: BTreeMap<TagId, String>,
}

impl PieceMap {
    /// Build a map, rejecting a label used for two different tags.
    pub fn new(labels: BTreeMap<TagId, String>) -> Result<Self, PieceMapError> {
        let mut seen: BTreeMap<&str, TagId> = BTreeMap::new();
        for (&tag, label) in &labels {
            if let Some(&first) = seen.get(label.as_str()) {
                return Err(PieceMapError::DuplicateLabel {
                    label: label.clone(),
                    first,
                    second: tag,
                });
            }
            seen.insert(label.as_str(), tag);
        }
        Ok(Self { labels })
    }

    /// Standard 32-piece set with consecutive tag ids starting at `first_tag`.
    pub fn sequential(first_tag: TagId) -> Result<Self, PieceMapError> {
        let span = STANDARD_PIECES.len() as TagId - 1;
        let last_tag = first_tag
            .checked_add(span)
            .ok_or(PieceMapError::TagRange { first: first_tag })?;
        let labels = STANDARD_PIECES
            .iter()
            .zip(first_tag..=last_tag)
            .map(|(label, tag)| (tag, (*label).to_owned()))
            .collect();
        Ok(Self { labels })
    }

    pub fn label(&self, tag: TagId) -> Option<&str> {
        self.labels.get(&tag).map(String::as_str)
    }

    pub fn tag_for(&self, label: &str) -> Option<TagId> {
        self.labels
            .iter()
            .find(|(_, l)| l.as_str() == label)
            .map(|(&tag, _)| tag)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (TagId, &str)> {
        self.labels.iter().map(|(&tag, label)| (tag, label.as_str()))
    }

    /// Load a map from JSON on disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, PieceMapError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write this map to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), PieceMapError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

impl TryFrom<BTreeMap<TagId, String>> for PieceMap {
    type Error = PieceMapError;

    fn try_from(labels: BTreeMap<TagId, String>) -> Result<Self, Self::Error> {
        Self::new(labels)
    }
}

impl From<PieceMap> for BTreeMap<TagId, String> {
    fn from(map: PieceMap) -> Self {
        map.labels
    }
}
