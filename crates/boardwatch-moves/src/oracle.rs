//! Chess-rules oracle: the seam between move inference and a rules engine.
//!
//! Inference never looks inside a position. It asks the oracle for the legal
//! moves, for the board geometry of each move ([`MoveShape`]), and for the
//! position after a move. [`ShakmatyRules`] is the standard-chess
//! implementation.

use boardwatch_board::Square;
use serde::{Deserialize, Serialize};
use shakmaty::san::SanPlus;
use shakmaty::{CastlingMode, Chess, Color, Position};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RulesError {
    #[error("move {uci} is not legal in the current position")]
    IllegalMove { uci: String },
    #[error("rules engine produced off-board square index {0}")]
    SquareOutOfRange(u32),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    White,
    Black,
}

/// Extra board effects of a move beyond "origin piece goes to destination".
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MoveKind {
    Normal,
    /// The king travels `from -> to`; the rook travels `rook_from -> rook_to`.
    Castle { rook_from: Square, rook_to: Square },
    /// The captured pawn stands on `captured`, not on the destination.
    EnPassant { captured: Square },
    /// Pawn reaching the last rank. The physical tag does not change.
    Promotion,
}

/// Coarse move category, stable across oracles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveClass {
    Normal,
    Castle,
    EnPassant,
    Promotion,
}

/// Where a move takes pieces on the physical board.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MoveShape {
    pub from: Square,
    pub to: Square,
    pub kind: MoveKind,
}

impl MoveShape {
    pub fn class(&self) -> MoveClass {
        match self.kind {
            MoveKind::Normal => MoveClass::Normal,
            MoveKind::Castle { .. } => MoveClass::Castle,
            MoveKind::EnPassant { .. } => MoveClass::EnPassant,
            MoveKind::Promotion => MoveClass::Promotion,
        }
    }
}

/// Legal-move generation and move application for some chess variant.
pub trait RulesOracle {
    type Position: Clone;
    type Move: Clone;

    fn initial_position(&self) -> Self::Position;

    /// All legal moves, in a deterministic order. Inference breaks
    /// discrepancy ties by this order.
    fn legal_moves(&self, pos: &Self::Position) -> Vec<Self::Move>;

    fn classify(&self, pos: &Self::Position, mv: &Self::Move) -> Result<MoveShape, RulesError>;

    fn play(&self, pos: &Self::Position, mv: &Self::Move) -> Result<Self::Position, RulesError>;

    /// Standard algebraic notation of `mv` played from `pos`, with a check
    /// or mate suffix.
    fn san(&self, pos: &Self::Position, mv: &Self::Move) -> String;

    fn uci(&self, mv: &Self::Move) -> String;

    fn side_to_move(&self, pos: &Self::Position) -> Side;

    fn fullmove_number(&self, pos: &Self::Position) -> u32;
}

/// Standard chess rules backed by `shakmaty`.
#[derive(Clone, Copy, Debug, Default)]
pub struct ShakmatyRules;

fn board_square(sq: shakmaty::Square) -> Result<Square, RulesError> {
    let index = u32::from(sq);
    u8::try_from(index)
        .ok()
        .and_then(Square::from_index)
        .ok_or(RulesError::SquareOutOfRange(index))
}

fn on_rank(file: u8, rank: u8) -> Result<Square, RulesError> {
    Square::new(file, rank).ok_or(RulesError::SquareOutOfRange(rank as u32 * 8 + file as u32))
}

impl RulesOracle for ShakmatyRules {
    type Position = Chess;
    type Move = shakmaty::Move;

    fn initial_position(&self) -> Chess {
        Chess::default()
    }

    fn legal_moves(&self, pos: &Chess) -> Vec<shakmaty::Move> {
        pos.legal_moves().into_iter().collect()
    }

    fn classify(&self, _pos: &Chess, mv: &shakmaty::Move) -> Result<MoveShape, RulesError> {
        use shakmaty::Move;

        let shape = match *mv {
            Move::Normal {
                from,
                to,
                promotion,
                ..
            } => MoveShape {
                from: board_square(from)?,
                to: board_square(to)?,
                kind: if promotion.is_some() {
                    MoveKind::Promotion
                } else {
                    MoveKind::Normal
                },
            },
            Move::EnPassant { from, to } => {
                let from = board_square(from)?;
                let to = board_square(to)?;
                MoveShape {
                    from,
                    to,
                    kind: MoveKind::EnPassant {
                        captured: on_rank(to.file(), from.rank())?,
                    },
                }
            }
            // shakmaty encodes castling as "king takes own rook".
            Move::Castle { king, rook } => {
                let king = board_square(king)?;
                let rook = board_square(rook)?;
                let rank = king.rank();
                let (king_file, rook_file) = if rook.file() > king.file() {
                    (6, 5)
                } else {
                    (2, 3)
                };
                MoveShape {
                    from: king,
                    to: on_rank(king_file, rank)?,
                    kind: MoveKind::Castle {
                        rook_from: rook,
                        rook_to: on_rank(rook_file, rank)?,
                    },
                }
            }
            // Drops only exist in crazyhouse; nothing leaves the board.
            Move::Put { to, .. } => {
                let to = board_square(to)?;
                MoveShape {
                    from: to,
                    to,
                    kind: MoveKind::Normal,
                }
            }
        };
        Ok(shape)
    }

    fn play(&self, pos: &Chess, mv: &shakmaty::Move) -> Result<Chess, RulesError> {
        pos.clone()
            .play(mv.clone())
            .map_err(|_| RulesError::IllegalMove { uci: self.uci(mv) })
    }

    fn san(&self, pos: &Chess, mv: &shakmaty::Move) -> String {
        SanPlus::from_move(pos.clone(), mv.clone()).to_string()
    }

    fn uci(&self, mv: &shakmaty::Move) -> String {
        mv.to_uci(CastlingMode::Standard).to_string()
    }

    fn side_to_move(&self, pos: &Chess) -> Side {
        match pos.turn() {
            Color::White => Side::White,
            Color::Black => Side::Black,
        }
    }

    fn fullmove_number(&self, pos: &Chess) -> u32 {
        pos.fullmoves().get()
    }
}
