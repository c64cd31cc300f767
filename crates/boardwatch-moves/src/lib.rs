//! Turning a sequence of board snapshots into a chess game.
//!
//! [`MoveInferrer`] holds the authoritative position. Each time occupancy
//! changes it scores every legal move against the new snapshot and commits
//! the best one to a [`GameRecord`]. Rules come from a [`RulesOracle`];
//! [`ShakmatyRules`] covers standard chess.
//!
//! ```
//! use boardwatch_board::{Placement, Snapshot};
//! use boardwatch_moves::{InferenceOutcome, MoveInferrer, PieceMap};
//!
//! let start: Placement = [("e2", 1u32), ("e1", 2)]
//!     .into_iter()
//!     .map(|(s, t)| (s.parse().unwrap(), t))
//!     .collect();
//! let mut after = start.clone();
//! after.remove(&"e2".parse().unwrap());
//! after.insert("e4".parse().unwrap(), 1);
//!
//! let mut inferrer = MoveInferrer::standard(PieceMap::default());
//! let outcome = inferrer
//!     .observe(&Snapshot::new(start, 0.0, 0), &Snapshot::new(after, 1.0, 30))
//!     .unwrap();
//! assert!(matches!(outcome, InferenceOutcome::Committed(ref m) if m.san == "e4"));
//! ```

mod inference;
mod oracle;
mod piece_map;
mod record;

pub use inference::{discrepancy, expected_placement, Candidate, InferenceOutcome, MoveInferrer};
pub use oracle::{MoveClass, MoveKind, MoveShape, RulesError, RulesOracle, ShakmatyRules, Side};
pub use piece_map::{PieceMap, PieceMapError, STANDARD_PIECES};
pub use record::{CommittedMove, GameRecord, RecordIoError};
