//! Move inference: explain the difference between two snapshots with the
//! legal move that predicts the observed board best.
//!
//! For each legal move the inferrer builds the placement that move would
//! produce from the previous snapshot ([`expected_placement`]) and counts the
//! squares where that prediction and the new snapshot disagree
//! ([`discrepancy`]). The smallest count wins; ties go to the move the oracle
//! listed first. The winner is always committed, so the tracked position
//! never stalls on noisy detections.

use crate::oracle::{MoveKind, MoveShape, RulesError, RulesOracle, ShakmatyRules};
use crate::record::{CommittedMove, GameRecord};
use crate::PieceMap;
use boardwatch_board::{Placement, Snapshot};
use std::collections::BTreeSet;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// What one snapshot transition did to the game.
#[derive(Clone, Debug, PartialEq)]
pub enum InferenceOutcome {
    /// Occupancy did not change; nothing was committed.
    Unchanged,
    Committed(CommittedMove),
    /// The tracked position is terminal (mate or stalemate).
    NoLegalMoves,
}

/// A legal move scored against an observation.
#[derive(Clone, Debug)]
pub struct Candidate<M> {
    pub mv: M,
    pub shape: MoveShape,
    pub discrepancy: usize,
}

/// Placement after applying `shape` to `prev`.
///
/// The tag on the origin square travels to the destination, replacing any
/// captured tag. Castling also relocates the rook's tag, en passant clears
/// the captured pawn's square. A promoted pawn keeps its physical tag.
pub fn expected_placement(prev: &Placement, shape: &MoveShape) -> Placement {
    let mut next = prev.clone();
    let mover = next.remove(&shape.from);

    match shape.kind {
        MoveKind::Castle { rook_from, rook_to } => {
            let rook = next.remove(&rook_from);
            if let Some(tag) = rook {
                next.insert(rook_to, tag);
            }
        }
        MoveKind::EnPassant { captured } => {
            next.remove(&captured);
        }
        MoveKind::Normal | MoveKind::Promotion => {}
    }

    // An empty origin leaves the destination as it was.
    if let Some(tag) = mover {
        next.insert(shape.to, tag);
    }
    next
}

/// Number of squares, over the union of both occupied sets, whose tags differ.
/// An empty square counts as different from any tag.
pub fn discrepancy(expected: &Placement, observed: &Placement) -> usize {
    let squares: BTreeSet<_> = expected.keys().chain(observed.keys()).collect();
    squares
        .into_iter()
        .filter(|sq| expected.get(sq) != observed.get(sq))
        .count()
}

/// Tracks a game from successive snapshots.
pub struct MoveInferrer<R: RulesOracle = ShakmatyRules> {
    rules: R,
    position: R::Position,
    piece_map: PieceMap,
    record: GameRecord,
}

impl MoveInferrer<ShakmatyRules> {
    /// Standard chess from the initial position.
    pub fn standard(piece_map: PieceMap) -> Self {
        Self::new(ShakmatyRules, piece_map)
    }
}

impl<R: RulesOracle> MoveInferrer<R> {
    pub fn new(rules: R, piece_map: PieceMap) -> Self {
        let position = rules.initial_position();
        Self::with_position(rules, piece_map, position)
    }

    /// Start tracking from an arbitrary position.
    pub fn with_position(rules: R, piece_map: PieceMap, position: R::Position) -> Self {
        Self {
            rules,
            position,
            piece_map,
            record: GameRecord::new(),
        }
    }

    pub fn rules(&self) -> &R {
        &self.rules
    }

    pub fn position(&self) -> &R::Position {
        &self.position
    }

    pub fn piece_map(&self) -> &PieceMap {
        &self.piece_map
    }

    pub fn record(&self) -> &GameRecord {
        &self.record
    }

    pub fn into_record(self) -> GameRecord {
        self.record
    }

    pub fn is_terminal(&self) -> bool {
        self.rules.legal_moves(&self.position).is_empty()
    }

    /// Best-scoring legal move for `prev -> observed`, or `None` when the
    /// position has no legal moves.
    pub fn best_candidate(
        &self,
        prev: &Placement,
        observed: &Placement,
    ) -> Result<Option<Candidate<R::Move>>, RulesError> {
        let mut best: Option<Candidate<R::Move>> = None;
        for mv in self.rules.legal_moves(&self.position) {
            let shape = self.rules.classify(&self.position, &mv)?;
            let score = discrepancy(&expected_placement(prev, &shape), observed);
            // strictly smaller: the first of equal candidates stays
            if best.as_ref().map_or(true, |b| score < b.discrepancy) {
                best = Some(Candidate {
                    mv,
                    shape,
                    discrepancy: score,
                });
            }
        }
        Ok(best)
    }

    /// Infer and commit the move between two consecutive snapshots.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "debug", skip(self, prev, curr), fields(frame = curr.frame_index))
    )]
    pub fn observe(
        &mut self,
        prev: &Snapshot,
        curr: &Snapshot,
    ) -> Result<InferenceOutcome, RulesError> {
        if prev.same_placement(curr) {
            return Ok(InferenceOutcome::Unchanged);
        }

        let Some(best) = self.best_candidate(&prev.placement, &curr.placement)? else {
            log::warn!(
                "frame {}: occupancy changed but the position has no legal moves",
                curr.frame_index
            );
            return Ok(InferenceOutcome::NoLegalMoves);
        };

        let committed = self.commit(best, prev, curr)?;
        Ok(InferenceOutcome::Committed(committed))
    }

    fn commit(
        &mut self,
        candidate: Candidate<R::Move>,
        prev: &Snapshot,
        curr: &Snapshot,
    ) -> Result<CommittedMove, RulesError> {
        let Candidate {
            mv,
            shape,
            discrepancy,
        } = candidate;

        let next = self.rules.play(&self.position, &mv)?;
        let mover_tag = prev.tag_at(shape.from);
        let committed = CommittedMove {
            ply: self.record.len(),
            move_number: self.rules.fullmove_number(&self.position),
            side: self.rules.side_to_move(&self.position),
            uci: self.rules.uci(&mv),
            san: self.rules.san(&self.position, &mv),
            from: shape.from,
            to: shape.to,
            class: shape.class(),
            discrepancy,
            mover_tag,
            mover_label: mover_tag
                .and_then(|tag| self.piece_map.label(tag))
                .map(str::to_owned),
            timestamp: curr.timestamp,
            frame_index: curr.frame_index,
        };
        self.position = next;

        if committed.is_ambiguous() {
            log::warn!(
                "frame {}: committed {} ({}) with {} unexplained square(s)",
                committed.frame_index,
                committed.san,
                committed.uci,
                discrepancy
            );
        } else {
            log::info!(
                "frame {}: {} {}",
                committed.frame_index,
                committed.move_number,
                committed.san
            );
        }

        self.record.push(committed.clone());
        Ok(committed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MoveClass, Side};
    use boardwatch_board::{Square, TagId};

    fn sq(label: &str) -> Square {
        label.parse().unwrap()
    }

    fn placement(entries: &[(&str, TagId)]) -> Placement {
        entries.iter().map(|&(s, t)| (sq(s), t)).collect()
    }

    /// Initial position with tag `100 + square index` on every occupied square.
    fn start_placement() -> Placement {
        Square::all()
            .filter(|s| matches!(s.rank(), 0 | 1 | 6 | 7))
            .map(|s| (s, 100 + s.index() as TagId))
            .collect()
    }

    fn snapshot(placement: Placement, frame_index: u64) -> Snapshot {
        Snapshot::new(placement, frame_index as f64 / 30.0, frame_index)
    }

    struct Game {
        inferrer: MoveInferrer,
        board: Snapshot,
        frame: u64,
    }

    impl Game {
        fn new() -> Self {
            Self {
                inferrer: MoveInferrer::standard(PieceMap::default()),
                board: snapshot(start_placement(), 0),
                frame: 0,
            }
        }

        fn observe(&mut self, placement: Placement) -> InferenceOutcome {
            self.frame += 30;
            let next = snapshot(placement, self.frame);
            let outcome = self.inferrer.observe(&self.board, &next).unwrap();
            self.board = next;
            outcome
        }

        /// Plays `uci` on the physical board exactly and checks it is committed.
        fn play(&mut self, uci: &str) -> CommittedMove {
            let rules = self.inferrer.rules();
            let pos = self.inferrer.position();
            let mv = rules
                .legal_moves(pos)
                .into_iter()
                .find(|m| rules.uci(m) == uci)
                .unwrap_or_else(|| panic!("{uci} not legal"));
            let shape = rules.classify(pos, &mv).unwrap();
            let observed = expected_placement(&self.board.placement, &shape);
            match self.observe(observed) {
                InferenceOutcome::Committed(c) => {
                    assert_eq!(c.uci, uci);
                    assert_eq!(c.discrepancy, 0);
                    c
                }
                other => panic!("expected {uci} to be committed, got {other:?}"),
            }
        }
    }

    #[test]
    fn expected_placement_moves_and_captures() {
        let prev = placement(&[("e4", 1), ("d5", 2), ("a1", 3)]);
        let shape = MoveShape {
            from: sq("e4"),
            to: sq("d5"),
            kind: MoveKind::Normal,
        };
        assert_eq!(
            expected_placement(&prev, &shape),
            placement(&[("d5", 1), ("a1", 3)])
        );
    }

    #[test]
    fn expected_placement_keeps_tag_on_promotion() {
        let prev = placement(&[("g7", 42), ("h8", 7)]);
        let shape = MoveShape {
            from: sq("g7"),
            to: sq("h8"),
            kind: MoveKind::Promotion,
        };
        assert_eq!(expected_placement(&prev, &shape), placement(&[("h8", 42)]));
    }

    #[test]
    fn expected_placement_castles_and_takes_en_passant() {
        let prev = placement(&[("e1", 1), ("a1", 2)]);
        let castle = MoveShape {
            from: sq("e1"),
            to: sq("c1"),
            kind: MoveKind::Castle {
                rook_from: sq("a1"),
                rook_to: sq("d1"),
            },
        };
        assert_eq!(
            expected_placement(&prev, &castle),
            placement(&[("c1", 1), ("d1", 2)])
        );

        let prev = placement(&[("e5", 5), ("d5", 6)]);
        let ep = MoveShape {
            from: sq("e5"),
            to: sq("d6"),
            kind: MoveKind::EnPassant {
                captured: sq("d5"),
            },
        };
        assert_eq!(expected_placement(&prev, &ep), placement(&[("d6", 5)]));
    }

    #[test]
    fn discrepancy_counts_the_union() {
        let a = placement(&[("a1", 1), ("b1", 2), ("c1", 3)]);
        let b = placement(&[("a1", 1), ("b1", 9), ("d1", 4)]);
        // b1 differs, c1 missing, d1 extra
        assert_eq!(discrepancy(&a, &b), 3);
        assert_eq!(discrepancy(&a, &a), 0);
        assert_eq!(discrepancy(&Placement::new(), &Placement::new()), 0);
    }

    #[test]
    fn exact_observation_commits_with_zero_discrepancy() {
        let mut game = Game::new();
        let e4 = game.play("e2e4");
        assert_eq!(e4.san, "e4");
        assert_eq!(e4.side, Side::White);
        assert_eq!(e4.move_number, 1);
        assert_eq!(e4.mover_tag, Some(100 + sq("e2").index() as TagId));
        assert!(!e4.is_ambiguous());

        let e5 = game.play("e7e5");
        assert_eq!(e5.side, Side::Black);
        assert_eq!(e5.ply, 1);
        assert_eq!(game.inferrer.record().to_pgn_movetext(), "1. e4 e5 *");
    }

    #[test]
    fn unchanged_snapshot_commits_nothing() {
        let mut game = Game::new();
        game.play("e2e4");
        let same = game.board.placement.clone();
        assert_eq!(game.observe(same), InferenceOutcome::Unchanged);
        assert_eq!(game.inferrer.record().len(), 1);
    }

    #[test]
    fn mover_label_comes_from_the_piece_map() {
        let mut map = std::collections::BTreeMap::new();
        map.insert(100 + sq("g1").index() as TagId, "wN2".to_owned());
        let mut game = Game::new();
        game.inferrer = MoveInferrer::standard(PieceMap::new(map).unwrap());
        let nf3 = game.play("g1f3");
        assert_eq!(nf3.mover_label.as_deref(), Some("wN2"));
    }

    #[test]
    fn castling_is_recognised_from_king_and_rook() {
        let mut game = Game::new();
        for uci in ["e2e4", "e7e5", "g1f3", "b8c6", "f1c4", "f8c5"] {
            game.play(uci);
        }
        let mut observed = game.board.placement.clone();
        let king = observed.remove(&sq("e1")).unwrap();
        let rook = observed.remove(&sq("h1")).unwrap();
        observed.insert(sq("g1"), king);
        observed.insert(sq("f1"), rook);

        match game.observe(observed) {
            InferenceOutcome::Committed(c) => {
                assert_eq!(c.san, "O-O");
                assert_eq!(c.class, MoveClass::Castle);
                assert_eq!(c.discrepancy, 0);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn en_passant_is_the_unique_exact_match() {
        let mut game = Game::new();
        for uci in ["e2e4", "a7a6", "e4e5", "d7d5"] {
            game.play(uci);
        }
        let prev = game.board.placement.clone();
        let mut observed = prev.clone();
        let pawn = observed.remove(&sq("e5")).unwrap();
        observed.remove(&sq("d5"));
        observed.insert(sq("d6"), pawn);

        let push = MoveShape {
            from: sq("e5"),
            to: sq("e6"),
            kind: MoveKind::Normal,
        };
        assert_eq!(discrepancy(&expected_placement(&prev, &push), &observed), 3);

        match game.observe(observed) {
            InferenceOutcome::Committed(c) => {
                assert_eq!(c.uci, "e5d6");
                assert_eq!(c.class, MoveClass::EnPassant);
                assert_eq!(c.discrepancy, 0);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn noisy_observation_still_commits_best_move() {
        let mut game = Game::new();
        let mut observed = game.board.placement.clone();
        let pawn = observed.remove(&sq("e2")).unwrap();
        observed.insert(sq("e4"), pawn);
        // a1 rook not detected this frame
        observed.remove(&sq("a1"));

        match game.observe(observed) {
            InferenceOutcome::Committed(c) => {
                assert_eq!(c.san, "e4");
                assert_eq!(c.discrepancy, 1);
                assert!(c.is_ambiguous());
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn ties_go_to_the_first_legal_move() {
        let mut game = Game::new();
        let mut observed = game.board.placement.clone();
        // a stray tag nothing can reach in one move
        observed.insert(sq("e5"), 999);

        let rules = game.inferrer.rules();
        let first = rules.legal_moves(game.inferrer.position())[0].clone();
        let first_uci = rules.uci(&first);

        match game.observe(observed) {
            InferenceOutcome::Committed(c) => {
                assert_eq!(c.uci, first_uci);
                assert_eq!(c.discrepancy, 3);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn promotion_keeps_the_pawn_tag() {
        let pos: shakmaty::Chess = "8/4P3/8/8/8/8/k7/4K3 w - - 0 1"
            .parse::<shakmaty::fen::Fen>()
            .unwrap()
            .into_position(shakmaty::CastlingMode::Standard)
            .unwrap();
        let mut inferrer = MoveInferrer::with_position(ShakmatyRules, PieceMap::default(), pos);

        let prev = placement(&[("e7", 1), ("e1", 2), ("a2", 3)]);
        let curr = placement(&[("e8", 1), ("e1", 2), ("a2", 3)]);
        let outcome = inferrer
            .observe(&snapshot(prev, 0), &snapshot(curr, 30))
            .unwrap();

        match outcome {
            InferenceOutcome::Committed(c) => {
                assert!(c.uci.starts_with("e7e8"), "got {}", c.uci);
                assert_eq!(c.class, MoveClass::Promotion);
                assert_eq!(c.discrepancy, 0);
                assert_eq!(c.mover_tag, Some(1));
                assert_eq!(c.to, sq("e8"));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(inferrer.record().len(), 1);
    }

    #[test]
    fn terminal_position_reports_no_legal_moves() {
        let mut game = Game::new();
        for uci in ["f2f3", "e7e5", "g2g4", "d8h4"] {
            game.play(uci);
        }
        assert!(game.inferrer.is_terminal());
        let mut observed = game.board.placement.clone();
        observed.remove(&sq("a2"));
        assert_eq!(game.observe(observed), InferenceOutcome::NoLegalMoves);
        assert_eq!(game.inferrer.record().len(), 4);
        assert_eq!(
            game.inferrer.record().sans(),
            vec!["f3", "e5", "g4", "Qh4#"]
        );
    }
}
