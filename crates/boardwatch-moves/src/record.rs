use crate::{MoveClass, Side};
use boardwatch_board::{Square, TagId};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

/// A move accepted by the inferrer, with the evidence it was chosen on.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CommittedMove {
    /// Zero-based half-move index within this run.
    pub ply: usize,
    pub move_number: u32,
    pub side: Side,
    pub uci: String,
    pub san: String,
    pub from: Square,
    pub to: Square,
    pub class: MoveClass,
    /// Squares where the observed snapshot disagrees with the board this
    /// move predicts. Zero means a perfect match.
    pub discrepancy: usize,
    /// Tag that stood on the origin square in the previous snapshot.
    pub mover_tag: Option<TagId>,
    pub mover_label: Option<String>,
    /// Timestamp and frame of the snapshot that revealed the move.
    pub timestamp: f64,
    pub frame_index: u64,
}

impl CommittedMove {
    /// The best legal explanation still left some squares unexplained.
    pub fn is_ambiguous(&self) -> bool {
        self.discrepancy > 0
    }
}

#[derive(thiserror::Error, Debug)]
pub enum RecordIoError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Ordered list of committed moves.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GameRecord {
    pub moves: Vec<CommittedMove>,
}

impl GameRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, mv: CommittedMove) {
        self.moves.push(mv);
    }

    pub fn len(&self) -> usize {
        self.moves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CommittedMove> {
        self.moves.iter()
    }

    pub fn last(&self) -> Option<&CommittedMove> {
        self.moves.last()
    }

    pub fn sans(&self) -> Vec<&str> {
        self.moves.iter().map(|m| m.san.as_str()).collect()
    }

    /// PGN movetext, e.g. `1. e4 e5 2. Nf3 *`.
    pub fn to_pgn_movetext(&self) -> String {
        let mut tokens = Vec::with_capacity(self.moves.len() + 1);
        let mut white_number = None;
        for m in &self.moves {
            match m.side {
                Side::White => {
                    tokens.push(format!("{}. {}", m.move_number, m.san));
                    white_number = Some(m.move_number);
                }
                Side::Black => {
                    if white_number == Some(m.move_number) {
                        tokens.push(m.san.clone());
                    } else {
                        tokens.push(format!("{}... {}", m.move_number, m.san));
                    }
                    white_number = None;
                }
            }
        }
        tokens.push("*".to_owned());
        tokens.join(" ")
    }

    /// Full PGN with an unfilled seven-tag roster.
    pub fn to_pgn(&self) -> String {
        let headers = [
            ("Event", "?"),
            ("Site", "?"),
            ("Date", "????.??.??"),
            ("Round", "?"),
            ("White", "?"),
            ("Black", "?"),
            ("Result", "*"),
        ];
        let mut out = String::new();
        for (name, value) in headers {
            out.push_str(&format!("[{name} \"{value}\"]\n"));
        }
        out.push('\n');
        out.push_str(&self.to_pgn_movetext());
        out.push('\n');
        out
    }

    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, RecordIoError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), RecordIoError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}
