//! Discrete board-occupancy snapshots built from warped marker observations.

use crate::{MarkerObservation, Square, SquareMapper, TagId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Occupied squares and the tag seen on each.
pub type Placement = BTreeMap<Square, TagId>;

/// Board occupancy as observed in one stable frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub placement: Placement,
    pub timestamp: f64,
    pub frame_index: u64,
}

impl Snapshot {
    pub fn new(placement: Placement, timestamp: f64, frame_index: u64) -> Self {
        Self {
            placement,
            timestamp,
            frame_index,
        }
    }

    /// Same occupancy, regardless of when it was observed.
    pub fn same_placement(&self, other: &Snapshot) -> bool {
        self.placement == other.placement
    }

    pub fn tag_at(&self, square: Square) -> Option<TagId> {
        self.placement.get(&square).copied()
    }
}

/// Result of building one snapshot.
#[derive(Clone, Debug)]
pub struct SnapshotBuild {
    pub snapshot: Snapshot,
    /// Observations whose center fell outside the board.
    pub unassigned: Vec<MarkerObservation>,
}

/// Assigns warped marker observations to squares.
#[derive(Clone, Copy, Debug)]
pub struct SnapshotBuilder {
    mapper: SquareMapper,
}

impl SnapshotBuilder {
    pub fn new(mapper: SquareMapper) -> Self {
        Self { mapper }
    }

    #[inline]
    pub fn mapper(&self) -> &SquareMapper {
        &self.mapper
    }

    /// Build a snapshot from observations already in canonical board space.
    ///
    /// Markers that map to no square are discarded. When two markers land on
    /// the same square, or one tag is seen on two squares, the later
    /// observation wins.
    pub fn build(
        &self,
        observations: &[MarkerObservation],
        timestamp: f64,
        frame_index: u64,
    ) -> SnapshotBuild {
        let mut placement = Placement::new();
        let mut square_of: BTreeMap<TagId, Square> = BTreeMap::new();
        let mut unassigned = Vec::new();

        for obs in observations {
            let Some(square) = self.mapper.point_to_square(obs.center.x, obs.center.y) else {
                log::debug!(
                    "frame {frame_index}: tag {} at ({:.1}, {:.1}) is off the board",
                    obs.tag_id,
                    obs.center.x,
                    obs.center.y
                );
                unassigned.push(*obs);
                continue;
            };
            if let Some(earlier) = square_of.insert(obs.tag_id, square) {
                if earlier != square && placement.get(&earlier) == Some(&obs.tag_id) {
                    placement.remove(&earlier);
                    log::debug!(
                        "frame {frame_index}: tag {} seen again, moved from {earlier} to {square}",
                        obs.tag_id
                    );
                }
            }
            if let Some(previous) = placement.insert(square, obs.tag_id) {
                if previous != obs.tag_id {
                    log::debug!(
                        "frame {frame_index}: tag {} replaces tag {previous} on {square}",
                        obs.tag_id
                    );
                }
            }
        }

        SnapshotBuild {
            snapshot: Snapshot::new(placement, timestamp, frame_index),
            unassigned,
        }
    }
}

/// Append-only, time-ordered list of snapshots.
#[derive(Clone, Debug, Default, Serialize)]
pub struct SnapshotHistory {
    snapshots: Vec<Snapshot>,
}

impl SnapshotHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, snapshot: Snapshot) {
        self.snapshots.push(snapshot);
    }

    pub fn last(&self) -> Option<&Snapshot> {
        self.snapshots.last()
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Snapshot> {
        self.snapshots.iter()
    }
}
