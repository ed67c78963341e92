//! Per-tile rotation state and its linear advance over time.
//!
//! Angles are measured in quarter turns: an angle of `1.0` is a switch rotated
//! by 90 degrees. A tile's `target` is only ever raised by puzzle logic, and
//! `current` chases it at a fixed rate with no easing.

use crate::puzzle::TILE_COUNT;

/// Quarter turns per second. A single flip takes a third of a second.
pub const QUARTER_TURNS_PER_SECOND: f32 = 3.0;

/// Rotation state of one switch.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Tile {
    /// Angle currently drawn.
    pub current: f32,
    /// Angle the tile is animating toward.
    pub target: f32,
}

impl Tile {
    /// Whether the tile still has rotation left to play.
    pub fn is_animating(&self) -> bool {
        self.current < self.target
    }

    /// A tile sits correctly once its target is an even number of quarter turns.
    pub fn is_correctly_placed(&self) -> bool {
        (self.target.floor() as i64).rem_euclid(2) == 0
    }
}

/// Angles of every tile on the board, row-major.
#[derive(Clone, Debug, Default)]
pub struct AnimationState {
    tiles: [Tile; TILE_COUNT],
}

impl AnimationState {
    /// Creates a board at rest with every angle at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Puts every tile back to angle zero with the given targets.
    pub fn reset(&mut self, targets: [f32; TILE_COUNT]) {
        for (tile, target) in self.tiles.iter_mut().zip(targets) {
            *tile = Tile {
                current: 0.0,
                target,
            };
        }
    }

    /// Moves every lagging tile toward its target by `dt` seconds worth of
    /// rotation, never past it.
    ///
    /// Returns `true` while any tile has rotation left, meaning the caller
    /// should schedule another frame.
    pub fn advance(&mut self, dt: f32) -> bool {
        let step = if dt.is_finite() && dt > 0.0 {
            dt * QUARTER_TURNS_PER_SECOND
        } else {
            0.0
        };

        let mut animating = false;
        for tile in &mut self.tiles {
            if tile.is_animating() {
                tile.current = (tile.current + step).min(tile.target);
                animating |= tile.is_animating();
            }
        }

        if animating {
            tracing::trace!(dt, "switches still rotating");
        }
        animating
    }

    /// Whether any tile has rotation left to play.
    pub fn is_animating(&self) -> bool {
        self.tiles.iter().any(Tile::is_animating)
    }

    /// Raises one tile's target by a quarter turn.
    pub(crate) fn bump_target(&mut self, index: usize) {
        self.tiles[index].target += 1.0;
    }

    /// All tiles, row-major.
    pub fn tiles(&self) -> &[Tile; TILE_COUNT] {
        &self.tiles
    }

    /// The angles to upload for this frame.
    pub fn current_angles(&self) -> [f32; TILE_COUNT] {
        self.tiles.map(|tile| tile.current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board(targets: [f32; TILE_COUNT]) -> AnimationState {
        let mut state = AnimationState::new();
        state.reset(targets);
        state
    }

    #[test]
    fn advance_is_linear_and_clamped() {
        let mut state = board([1.0; TILE_COUNT]);

        assert!(state.advance(0.1));
        for tile in state.tiles() {
            assert!((tile.current - 0.3).abs() < 1e-6);
        }

        assert!(!state.advance(10.0));
        for tile in state.tiles() {
            assert_eq!(tile.current, tile.target);
        }
    }

    #[test]
    fn tiles_at_rest_do_not_move() {
        let mut targets = [0.0; TILE_COUNT];
        targets[5] = 2.0;
        let mut state = board(targets);

        assert!(state.advance(0.5));
        assert_eq!(state.tiles()[0].current, 0.0);
        assert!((state.tiles()[5].current - 1.5).abs() < 1e-6);
        assert!(!state.advance(0.5));
        assert_eq!(state.tiles()[5].current, 2.0);
    }

    #[test]
    fn converges_for_any_positive_steps_without_overshoot() {
        let mut targets = [0.0; TILE_COUNT];
        for (i, target) in targets.iter_mut().enumerate() {
            *target = (i % 5) as f32;
        }
        let mut state = board(targets);
        let steps = [0.016, 0.001, 0.25, 0.033, 0.0005, 0.1];

        let mut frames = 0;
        while state.advance(steps[frames % steps.len()]) {
            for tile in state.tiles() {
                assert!(tile.current <= tile.target);
            }
            frames += 1;
            assert!(frames < 10_000, "animation never settled");
        }

        for tile in state.tiles() {
            assert!((tile.target - tile.current).abs() < 1e-6);
        }
    }

    #[test]
    fn degenerate_steps_are_ignored() {
        let mut state = board([1.0; TILE_COUNT]);

        assert!(state.advance(-1.0));
        assert!(state.advance(f32::NAN));
        assert!(state.advance(f32::INFINITY));
        assert!(state.tiles().iter().all(|tile| tile.current == 0.0));
    }

    #[test]
    fn placement_follows_target_parity() {
        let at = |target| Tile {
            current: 0.0,
            target,
        };
        assert!(at(0.0).is_correctly_placed());
        assert!(!at(1.0).is_correctly_placed());
        assert!(at(2.0).is_correctly_placed());
        assert!(!at(3.0).is_correctly_placed());
    }

    #[test]
    fn reset_zeroes_current_angles() {
        let mut state = board([3.0; TILE_COUNT]);
        state.advance(1.0);

        state.reset([1.0; TILE_COUNT]);
        assert_eq!(state.current_angles(), [0.0; TILE_COUNT]);
        assert!(state.is_animating());
    }
}
