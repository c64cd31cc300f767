use crate::Square;
use serde::{Deserialize, Serialize};

/// Which side of the canonical board image shows White's first rank.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    #[default]
    WhiteAtBottom,
    BlackAtBottom,
}

/// Bijection between canonical board pixels and squares.
///
/// The canonical image is `board_size` pixels wide and high and split into
/// an 8×8 grid. With White at the bottom, column 0 is the a-file and row 0
/// is the eighth rank; with Black at the bottom both axes are mirrored.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SquareMapper {
    board_size: f32,
    cell: f32,
    orientation: Orientation,
}

impl SquareMapper {
    pub fn new(board_size: u32, orientation: Orientation) -> Self {
        let board_size = board_size as f32;
        Self {
            board_size,
            cell: board_size / 8.0,
            orientation,
        }
    }

    #[inline]
    pub fn board_size(&self) -> f32 {
        self.board_size
    }

    #[inline]
    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    /// Square containing the canonical point, or `None` outside `[0, size)²`.
    pub fn point_to_square(&self, x: f32, y: f32) -> Option<Square> {
        let inside = |v: f32| v >= 0.0 && v < self.board_size;
        if !inside(x) || !inside(y) {
            return None;
        }

        let col = ((x / self.cell).floor() as i32).clamp(0, 7) as u8;
        let row = ((y / self.cell).floor() as i32).clamp(0, 7) as u8;

        let (file, rank) = match self.orientation {
            Orientation::WhiteAtBottom => (col, 7 - row),
            Orientation::BlackAtBottom => (7 - col, row),
        };
        Square::new(file, rank)
    }

    /// Geometric center of the square's cell in canonical pixels.
    pub fn square_to_center(&self, square: Square) -> (f32, f32) {
        let (col, row) = match self.orientation {
            Orientation::WhiteAtBottom => (square.file(), 7 - square.rank()),
            Orientation::BlackAtBottom => (7 - square.file(), square.rank()),
        };
        (
            (col as f32 + 0.5) * self.cell,
            (row as f32 + 0.5) * self.cell,
        )
    }
}
