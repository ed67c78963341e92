//! Board rules: row/column toggling and win detection.
//!
//! Clicking a switch rotates every switch sharing its row or its column by one
//! quarter turn, the clicked switch itself exactly once. The board is solved
//! when every switch has been turned an even number of quarter turns. Solving
//! latches; the board then ignores clicks until the next deal.

use crate::animation::AnimationState;
use rand::Rng;

/// Switches per row and per column.
pub const GRID_SIZE: usize = 4;

/// Switches on the board.
pub const TILE_COUNT: usize = GRID_SIZE * GRID_SIZE;

/// What a click or a new deal did to the board.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClickOutcome {
    /// Nothing changed: the board was already won or the index was off the board.
    Ignored,
    /// Targets moved and the board is still unsolved.
    Toggled,
    /// This action solved the board. Reported once per win.
    Won,
}

/// The 4x4 board of switches.
#[derive(Clone, Debug, Default)]
pub struct PuzzleGrid {
    angles: AnimationState,
    won: bool,
}

impl PuzzleGrid {
    /// Creates a board at rest with every switch placed.
    ///
    /// The board is not latched as won; call [`new_game`](Self::new_game) to deal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a board with explicit targets, evaluating the win immediately.
    pub fn with_targets(targets: [f32; TILE_COUNT]) -> Self {
        let mut grid = Self::new();
        grid.deal(targets);
        grid
    }

    /// Deals a fresh board: every switch at angle zero, each one independently
    /// needing either zero or one quarter turn.
    ///
    /// A deal that happens to be solved reports [`ClickOutcome::Won`] right away.
    pub fn new_game<R: Rng + ?Sized>(&mut self, rng: &mut R) -> ClickOutcome {
        let targets = std::array::from_fn(|_| if rng.random::<bool>() { 1.0 } else { 0.0 });
        self.deal(targets)
    }

    fn deal(&mut self, targets: [f32; TILE_COUNT]) -> ClickOutcome {
        self.angles.reset(targets);
        self.won = false;
        let outcome = self.check_win();
        tracing::info!(misplaced = self.misplaced(), "dealt new board");
        outcome
    }

    /// Applies a click on the switch at `index` (row-major).
    pub fn apply_click(&mut self, index: usize) -> ClickOutcome {
        if self.won || index >= TILE_COUNT {
            return ClickOutcome::Ignored;
        }

        let (x, y) = (index % GRID_SIZE, index / GRID_SIZE);
        for j in 0..GRID_SIZE {
            for i in 0..GRID_SIZE {
                if i == x || j == y {
                    self.angles.bump_target(j * GRID_SIZE + i);
                }
            }
        }

        tracing::debug!(x, y, misplaced = self.misplaced(), "switch clicked");
        self.check_win()
    }

    fn check_win(&mut self) -> ClickOutcome {
        if self.misplaced() == 0 {
            self.won = true;
            tracing::info!("board solved");
            ClickOutcome::Won
        } else {
            ClickOutcome::Toggled
        }
    }

    /// Number of switches whose target is an odd number of quarter turns.
    pub fn misplaced(&self) -> usize {
        self.angles
            .tiles()
            .iter()
            .filter(|tile| !tile.is_correctly_placed())
            .count()
    }

    /// Whether the board has been solved since the last deal.
    pub fn is_won(&self) -> bool {
        self.won
    }

    /// Advances the rotation animation; see [`AnimationState::advance`].
    pub fn advance(&mut self, dt: f32) -> bool {
        self.angles.advance(dt)
    }

    /// The per-tile rotation state.
    pub fn angles(&self) -> &AnimationState {
        &self.angles
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn targets(grid: &PuzzleGrid) -> [f32; TILE_COUNT] {
        grid.angles().tiles().map(|tile| tile.target)
    }

    #[test]
    fn click_toggles_row_and_column_once() {
        for index in 0..TILE_COUNT {
            let mut grid = PuzzleGrid::with_targets([1.0; TILE_COUNT]);
            let (x, y) = (index % GRID_SIZE, index / GRID_SIZE);

            assert_eq!(grid.apply_click(index), ClickOutcome::Toggled);

            for (i, target) in targets(&grid).into_iter().enumerate() {
                let (tx, ty) = (i % GRID_SIZE, i / GRID_SIZE);
                let expected = if tx == x || ty == y { 2.0 } else { 1.0 };
                assert_eq!(target, expected, "tile ({tx}, {ty}) after click ({x}, {y})");
            }
        }
    }

    #[test]
    fn corner_click_on_all_odd_board() {
        let mut grid = PuzzleGrid::with_targets([1.0; TILE_COUNT]);

        assert_eq!(grid.apply_click(0), ClickOutcome::Toggled);

        let t = targets(&grid);
        assert_eq!(t.iter().filter(|&&v| v == 2.0).count(), 7);
        assert_eq!(t.iter().filter(|&&v| v == 1.0).count(), 9);
        assert_eq!(grid.misplaced(), 9);
        assert!(!grid.is_won());
    }

    #[test]
    fn solved_deal_is_won_without_clicks() {
        let grid = PuzzleGrid::with_targets([0.0; TILE_COUNT]);
        assert!(grid.is_won());

        let grid = PuzzleGrid::with_targets([2.0; TILE_COUNT]);
        assert!(grid.is_won());
    }

    #[test]
    fn single_odd_row_and_column_is_solved_by_their_crossing() {
        // Toggle pattern of a click on (2, 1) applied to a solved board.
        let mut start = [0.0; TILE_COUNT];
        for (i, target) in start.iter_mut().enumerate() {
            if i % GRID_SIZE == 2 || i / GRID_SIZE == 1 {
                *target = 1.0;
            }
        }
        let mut grid = PuzzleGrid::with_targets(start);
        assert_eq!(grid.misplaced(), 7);

        assert_eq!(grid.apply_click(GRID_SIZE + 2), ClickOutcome::Won);
        assert!(grid.is_won());
    }

    #[test]
    fn won_board_ignores_clicks() {
        let mut grid = PuzzleGrid::with_targets([0.0; TILE_COUNT]);
        let before = targets(&grid);

        for index in 0..TILE_COUNT {
            assert_eq!(grid.apply_click(index), ClickOutcome::Ignored);
        }
        assert_eq!(targets(&grid), before);
        assert!(grid.is_won());
    }

    #[test]
    fn off_board_click_is_ignored() {
        let mut grid = PuzzleGrid::with_targets([1.0; TILE_COUNT]);
        assert_eq!(grid.apply_click(TILE_COUNT), ClickOutcome::Ignored);
        assert_eq!(targets(&grid), [1.0; TILE_COUNT]);
    }

    #[test]
    fn win_matches_parity_after_click_sequences() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for _ in 0..64 {
            let mut grid = PuzzleGrid::new();
            grid.new_game(&mut rng);
            for _ in 0..12 {
                let before = targets(&grid);
                let outcome = grid.apply_click(rng.random_range(0..TILE_COUNT));
                let all_even = targets(&grid)
                    .iter()
                    .all(|t| (t.floor() as i64) % 2 == 0);

                assert_eq!(grid.is_won(), all_even || outcome == ClickOutcome::Ignored);
                if outcome == ClickOutcome::Ignored {
                    assert_eq!(targets(&grid), before);
                }
            }
        }
    }

    #[test]
    fn targets_only_grow() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let mut grid = PuzzleGrid::new();
        grid.new_game(&mut rng);
        for _ in 0..20 {
            let before = targets(&grid);
            grid.apply_click(rng.random_range(0..TILE_COUNT));
            for (old, new) in before.iter().zip(targets(&grid)) {
                assert!(new >= *old);
            }
        }
    }

    #[test]
    fn deals_are_reproducible_per_seed() {
        let mut a = PuzzleGrid::new();
        let mut b = PuzzleGrid::new();
        a.new_game(&mut ChaCha8Rng::seed_from_u64(42));
        b.new_game(&mut ChaCha8Rng::seed_from_u64(42));

        assert_eq!(targets(&a), targets(&b));
        for target in targets(&a) {
            assert!(target == 0.0 || target == 1.0);
        }
        assert!(a.angles().tiles().iter().all(|tile| tile.current == 0.0));
    }

    #[test]
    fn new_game_clears_the_latch() {
        let mut grid = PuzzleGrid::with_targets([0.0; TILE_COUNT]);
        assert!(grid.is_won());

        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let outcome = grid.new_game(&mut rng);
        assert_eq!(grid.is_won(), outcome == ClickOutcome::Won);
        assert_eq!(grid.is_won(), grid.misplaced() == 0);
    }
}
