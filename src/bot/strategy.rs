//! Move selection for the bot seat.

use rand::{Rng, seq::IndexedRandom};

use crate::state::{board::Board, board::Cell, context::BotDifficulty};

const CENTER: usize = 4;
const CORNERS: [usize; 4] = [0, 6, 2, 8];

/// Picks cells for the bot according to its tier.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BotStrategy {
    difficulty: BotDifficulty,
    strategic_probability: f64,
}

impl BotStrategy {
    /// `strategic_probability` is the chance a normal-tier bot plays the strategic move.
    pub fn new(difficulty: BotDifficulty, strategic_probability: f64) -> Self {
        Self {
            difficulty,
            strategic_probability: strategic_probability.clamp(0.0, 1.0),
        }
    }

    pub fn difficulty(&self) -> BotDifficulty {
        self.difficulty
    }

    /// Cell to mark with `symbol`, or `None` when the board is full.
    pub fn choose<R: Rng + ?Sized>(&self, board: &Board, symbol: Cell, rng: &mut R) -> Option<usize> {
        match self.difficulty {
            BotDifficulty::Difficult => strategic_move(board, symbol, rng),
            BotDifficulty::Normal if rng.random_bool(self.strategic_probability) => {
                strategic_move(board, symbol, rng)
            }
            BotDifficulty::Normal => weighted_move(board, rng),
        }
    }
}

/// Win if possible, otherwise block, otherwise take the center, otherwise any empty cell.
pub fn strategic_move<R: Rng + ?Sized>(board: &Board, symbol: Cell, rng: &mut R) -> Option<usize> {
    completing_move(board, symbol)
        .or_else(|| completing_move(board, symbol.opponent()))
        .or_else(|| free(board, CENTER))
        .or_else(|| random_empty(board, rng))
}

/// Center, then the first free corner, then any empty cell.
pub fn weighted_move<R: Rng + ?Sized>(board: &Board, rng: &mut R) -> Option<usize> {
    free(board, CENTER)
        .or_else(|| CORNERS.iter().copied().find(|&corner| free(board, corner).is_some()))
        .or_else(|| random_empty(board, rng))
}

/// First empty cell where placing `symbol` completes a line of `symbol`.
pub fn completing_move(board: &Board, symbol: Cell) -> Option<usize> {
    board.empty_cells().into_iter().find(|&index| {
        let mut scratch = *board;
        scratch.set(index, symbol);
        scratch
            .winning_line()
            .is_some_and(|[first, _, _]| scratch.get(first) == Some(symbol))
    })
}

fn free(board: &Board, index: usize) -> Option<usize> {
    board
        .get(index)
        .filter(|cell| cell.is_empty())
        .map(|_| index)
}

fn random_empty<R: Rng + ?Sized>(board: &Board, rng: &mut R) -> Option<usize> {
    board.empty_cells().choose(rng).copied()
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    use crate::state::board::Cell::{Empty as E, O, X};

    fn board(cells: [Cell; 9]) -> Board {
        Board::from_cells(cells)
    }

    #[test]
    fn takes_the_winning_cell() {
        let board = board([O, O, E, X, E, E, X, E, E]);
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(strategic_move(&board, O, &mut rng), Some(2));
    }

    #[test]
    fn completes_the_top_row_on_a_sparse_board() {
        let board = board([O, O, E, X, E, E, E, E, E]);
        let mut rng = StdRng::seed_from_u64(11);
        assert_eq!(strategic_move(&board, O, &mut rng), Some(2));
    }

    #[test]
    fn blocks_the_opponent() {
        let board = board([X, X, E, E, O, E, E, E, E]);
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(strategic_move(&board, O, &mut rng), Some(2));
    }

    #[test]
    fn prefers_winning_over_blocking() {
        let board = board([X, X, E, O, O, E, E, E, E]);
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(strategic_move(&board, O, &mut rng), Some(5));
    }

    #[test]
    fn takes_center_when_nothing_is_urgent() {
        let board = board([X, E, E, E, E, E, E, E, E]);
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(strategic_move(&board, O, &mut rng), Some(4));
    }

    #[test]
    fn weighted_move_prefers_center_then_corners() {
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(weighted_move(&Board::new(), &mut rng), Some(4));

        let board = board([X, E, E, E, O, E, E, E, E]);
        assert_eq!(weighted_move(&board, &mut rng), Some(6));
    }

    #[test]
    fn full_board_has_no_move() {
        let board = board([X, O, X, X, O, O, O, X, X]);
        let mut rng = StdRng::seed_from_u64(7);
        for difficulty in [BotDifficulty::Normal, BotDifficulty::Difficult] {
            assert_eq!(BotStrategy::new(difficulty, 0.6).choose(&board, O, &mut rng), None);
        }
    }

    #[test]
    fn difficult_tier_always_plays_strategically() {
        let board = board([X, X, E, E, O, E, E, E, E]);
        let strategy = BotStrategy::new(BotDifficulty::Difficult, 0.0);
        for seed in 0..32 {
            let mut rng = StdRng::seed_from_u64(seed);
            assert_eq!(strategy.choose(&board, O, &mut rng), Some(2));
        }
    }

    #[test]
    fn normal_tier_without_strategy_plays_weighted() {
        let board = board([X, X, E, E, O, E, E, E, E]);
        let strategy = BotStrategy::new(BotDifficulty::Normal, 0.0);
        let mut rng = StdRng::seed_from_u64(3);
        assert_eq!(strategy.choose(&board, O, &mut rng), Some(6));
    }

    #[test]
    fn random_fallback_stays_on_empty_cells() {
        let board = board([X, O, X, E, O, X, O, X, E]);
        for seed in 0..16 {
            let mut rng = StdRng::seed_from_u64(seed);
            let index = random_empty(&board, &mut rng).unwrap();
            assert!(board.get(index).is_some_and(Cell::is_empty));
        }
    }
}
