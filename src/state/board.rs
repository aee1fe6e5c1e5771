use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of cells on the board.
pub const CELL_COUNT: usize = 9;

/// Every winning triple, evaluated in this order: rows, then columns, then diagonals.
pub const LINES: [[usize; 3]; 8] = [
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8],
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8],
    [0, 4, 8],
    [2, 4, 6],
];

/// Content of a single board cell.
///
/// Encoded on the wire as `0` (empty), `1` (X) or `2` (O).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Cell {
    /// Nobody played here yet.
    #[default]
    Empty,
    /// Mark of seat 0.
    X,
    /// Mark of seat 1.
    O,
}

impl Cell {
    /// True when the cell holds no mark.
    pub fn is_empty(self) -> bool {
        self == Cell::Empty
    }

    /// The opposing mark (`Empty` stays `Empty`).
    pub fn opponent(self) -> Cell {
        match self {
            Cell::X => Cell::O,
            Cell::O => Cell::X,
            Cell::Empty => Cell::Empty,
        }
    }
}

impl From<Cell> for u8 {
    fn from(value: Cell) -> Self {
        match value {
            Cell::Empty => 0,
            Cell::X => 1,
            Cell::O => 2,
        }
    }
}

/// Raised when a wire value does not name a cell.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown cell value {0}")]
pub struct UnknownCell(pub u8);

impl TryFrom<u8> for Cell {
    type Error = UnknownCell;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Cell::Empty),
            1 => Ok(Cell::X),
            2 => Ok(Cell::O),
            other => Err(UnknownCell(other)),
        }
    }
}

/// 3x3 grid stored row-major (`index = row * 3 + col`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Board {
    cells: [Cell; CELL_COUNT],
}

impl Board {
    /// An empty board.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a board from explicit cell contents.
    pub fn from_cells(cells: [Cell; CELL_COUNT]) -> Self {
        Self { cells }
    }

    /// Cell at `row`/`col`, both in `0..3`. Out of range coordinates read as empty.
    pub fn value_at(&self, row: usize, col: usize) -> Cell {
        if row >= 3 || col >= 3 {
            return Cell::Empty;
        }
        self.cells[row * 3 + col]
    }

    /// Cell at a flat index, `None` when the index is outside the board.
    pub fn get(&self, index: usize) -> Option<Cell> {
        self.cells.get(index).copied()
    }

    /// Overwrite a cell. Returns `false` when `index` is outside the board.
    pub fn set(&mut self, index: usize, cell: Cell) -> bool {
        match self.cells.get_mut(index) {
            Some(slot) => {
                *slot = cell;
                true
            }
            None => false,
        }
    }

    /// True when no empty cell remains.
    pub fn is_full(&self) -> bool {
        self.cells.iter().all(|cell| !cell.is_empty())
    }

    /// First completed triple in [`LINES`] order, if any.
    pub fn winning_line(&self) -> Option<[usize; 3]> {
        LINES.into_iter().find(|&[a, b, c]| {
            let first = self.cells[a];
            !first.is_empty() && first == self.cells[b] && first == self.cells[c]
        })
    }

    /// Indices of every empty cell, ascending.
    pub fn empty_cells(&self) -> Vec<usize> {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, cell)| cell.is_empty())
            .map(|(index, _)| index)
            .collect()
    }

    /// Borrow the raw cells.
    pub fn cells(&self) -> &[Cell; CELL_COUNT] {
        &self.cells
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::Cell::{Empty as E, O, X};

    #[test]
    fn empty_board_never_wins() {
        let board = Board::new();
        assert_eq!(board.winning_line(), None);
        assert!(!board.is_full());
        assert_eq!(board.empty_cells().len(), CELL_COUNT);
    }

    #[test]
    fn every_line_is_detected() {
        for line in LINES {
            for mark in [X, O] {
                let mut board = Board::new();
                for index in line {
                    board.set(index, mark);
                }
                assert_eq!(board.winning_line(), Some(line));
            }
        }
    }

    #[test]
    fn mixed_line_does_not_win() {
        let board = Board::from_cells([X, X, O, E, E, E, E, E, E]);
        assert_eq!(board.winning_line(), None);
    }

    #[test]
    fn first_line_in_fixed_order_is_reported() {
        // Top row and left column both complete; rows come first.
        let board = Board::from_cells([X, X, X, X, O, O, X, O, O]);
        assert_eq!(board.winning_line(), Some([0, 1, 2]));
    }

    #[test]
    fn full_board_without_line_is_full() {
        let board = Board::from_cells([X, O, X, X, O, O, O, X, X]);
        assert!(board.is_full());
        assert_eq!(board.winning_line(), None);
    }

    #[test]
    fn value_at_maps_row_and_col() {
        let board = Board::from_cells([E, E, E, E, E, O, E, E, E]);
        assert_eq!(board.value_at(1, 2), O);
        assert_eq!(board.value_at(2, 1), E);
        assert_eq!(board.value_at(3, 0), E);
    }

    #[test]
    fn set_outside_board_is_refused() {
        let mut board = Board::new();
        assert!(!board.set(9, X));
        assert_eq!(board, Board::new());
    }

    #[test]
    fn cells_use_numeric_wire_encoding() {
        let board = Board::from_cells([X, O, E, E, E, E, E, E, E]);
        let json = serde_json::to_string(&board).unwrap();
        assert_eq!(json, "[1,2,0,0,0,0,0,0,0]");
        assert!(serde_json::from_str::<Cell>("3").is_err());
    }
}
