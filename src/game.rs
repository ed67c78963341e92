//! The switch board as one component the host drives from its event loop.
//!
//! [`SwitchGame`] owns the board, the frame clock and the renderer. The host
//! forwards four events to it: [`paint`](SwitchGame::paint) on every redraw,
//! [`on_pointer_release`](SwitchGame::on_pointer_release) on a click,
//! [`on_resize`](SwitchGame::on_resize) and [`on_new_game`](SwitchGame::on_new_game).
//!
//! GPU resources are created on the first paint, so a game can be built before
//! any window exists.

use std::path::PathBuf;
use std::time::Instant;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::gpu::GpuContext;
use crate::picking::flip_y;
use crate::puzzle::{ClickOutcome, PuzzleGrid};
use crate::render::{RenderError, SwitchRenderer};

/// Whether the host should schedule another frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameStatus {
    /// At least one switch is still turning.
    Animating,
    /// Everything is at rest; nothing changes until the next event.
    Idle,
}

/// What a pointer release did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointerOutcome {
    /// A switch was hit and the board changed. The host should redraw.
    Accepted,
    /// The click missed, the board is solved, or nothing is drawn yet.
    Ignored,
}

/// Measures the time between paints.
///
/// A restarted clock measures from the restart instead of the last paint, so
/// idle time spent without redraws never turns into a jump in the animation.
#[derive(Clone, Copy, Debug, Default)]
pub struct FrameClock {
    last: Option<Instant>,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seconds since the previous tick or restart; zero for the first tick.
    pub fn tick(&mut self, now: Instant) -> f32 {
        let dt = self
            .last
            .map_or(0.0, |last| now.saturating_duration_since(last).as_secs_f32());
        self.last = Some(now);
        dt
    }

    /// Makes the next tick measure from `now`.
    pub fn restart(&mut self, now: Instant) {
        self.last = Some(now);
    }
}

type WinCallback = Box<dyn FnMut()>;

/// The board, its clock and its renderer.
pub struct SwitchGame {
    grid: PuzzleGrid,
    rng: ChaCha8Rng,
    clock: FrameClock,
    renderer: Option<SwitchRenderer>,
    viewport: (u32, u32),
    asset: PathBuf,
    win_callbacks: Vec<WinCallback>,
}

impl SwitchGame {
    /// Creates a game with a fresh deal drawn from `rng`.
    ///
    /// `asset` is only read on the first [`paint`](Self::paint).
    pub fn new(asset: impl Into<PathBuf>, mut rng: ChaCha8Rng) -> Self {
        let mut grid = PuzzleGrid::new();
        grid.new_game(&mut rng);

        Self {
            grid,
            rng,
            clock: FrameClock::new(),
            renderer: None,
            viewport: (0, 0),
            asset: asset.into(),
            win_callbacks: Vec::new(),
        }
    }

    /// Creates a game dealt from `seed`, or from OS entropy without one.
    pub fn with_seed(asset: impl Into<PathBuf>, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => {
                tracing::info!(seed, "using fixed seed");
                ChaCha8Rng::seed_from_u64(seed)
            }
            None => ChaCha8Rng::from_rng(&mut rand::rng()),
        };
        Self::new(asset, rng)
    }

    /// Registers a callback that runs every time the board gets solved.
    pub fn on_win(&mut self, callback: impl FnMut() + 'static) {
        self.win_callbacks.push(Box::new(callback));
    }

    /// Advances the animation and draws the board onto `target`.
    ///
    /// The first call loads the switch asset and builds the pipelines; a
    /// failure there is returned and should be treated as fatal.
    pub fn paint(
        &mut self,
        gpu: &GpuContext,
        target: &wgpu::TextureView,
    ) -> Result<FrameStatus, RenderError> {
        let renderer = match self.renderer.take() {
            Some(renderer) => renderer,
            None => {
                let (width, height) = self.viewport;
                SwitchRenderer::new(gpu, &self.asset, width, height)?
            }
        };
        let renderer = self.renderer.insert(renderer);

        let dt = self.clock.tick(Instant::now());
        let animating = self.grid.advance(dt);

        if !renderer.render(gpu, target, &self.grid.angles().current_angles()) {
            tracing::trace!("viewport is empty, nothing drawn");
        }

        Ok(if animating {
            FrameStatus::Animating
        } else {
            FrameStatus::Idle
        })
    }

    /// Handles a pointer release at window coordinates `(x, y)`, in physical
    /// pixels with `y` growing downwards.
    pub fn on_pointer_release(
        &mut self,
        gpu: &GpuContext,
        x: u32,
        y: u32,
    ) -> Result<PointerOutcome, RenderError> {
        if !self.accepts_clicks() {
            return Ok(PointerOutcome::Ignored);
        }
        let Some(renderer) = &self.renderer else {
            return Ok(PointerOutcome::Ignored);
        };
        let Some((_, height)) = renderer.framebuffer_size() else {
            return Ok(PointerOutcome::Ignored);
        };

        let hit = renderer.pick(gpu, x, flip_y(height, y))?;
        tracing::debug!(x, y, ?hit, "picked");

        Ok(match hit {
            Some(index) => self.click(index),
            None => PointerOutcome::Ignored,
        })
    }

    /// Whether a click could change the board. A solved board skips the
    /// readback entirely.
    fn accepts_clicks(&self) -> bool {
        !self.grid.is_won()
    }

    /// Whether [`paint`](Self::paint) would draw anything at the current
    /// viewport size. Hosts skip acquiring a surface texture otherwise.
    pub fn can_draw(&self) -> bool {
        let (width, height) = self.viewport;
        width > 0 && height > 0
    }

    /// Applies a click on switch `index`.
    fn click(&mut self, index: usize) -> PointerOutcome {
        match self.grid.apply_click(index) {
            ClickOutcome::Ignored => PointerOutcome::Ignored,
            outcome => {
                self.settle(outcome);
                PointerOutcome::Accepted
            }
        }
    }

    /// Follows the viewport to a new physical size.
    pub fn on_resize(&mut self, gpu: &GpuContext, width: u32, height: u32) {
        tracing::debug!(width, height, "viewport resized");
        self.viewport = (width, height);
        if let Some(renderer) = &mut self.renderer {
            renderer.resize(gpu, width, height);
        }
    }

    /// Deals a new board from the game's random source.
    pub fn on_new_game(&mut self) {
        let outcome = self.grid.new_game(&mut self.rng);
        self.settle(outcome);
    }

    /// Restarts the clock after the board changed and announces a win.
    fn settle(&mut self, outcome: ClickOutcome) {
        self.clock.restart(Instant::now());
        if outcome == ClickOutcome::Won {
            for callback in &mut self.win_callbacks {
                callback();
            }
        }
    }

    /// Whether the current board has been solved.
    pub fn is_won(&self) -> bool {
        self.grid.is_won()
    }

    pub fn grid(&self) -> &PuzzleGrid {
        &self.grid
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::puzzle::TILE_COUNT;
    use std::cell::Cell;
    use std::rc::Rc;
    use std::time::Duration;

    fn game() -> SwitchGame {
        SwitchGame::with_seed("assets/switch.stl", Some(7))
    }

    fn counter(game: &mut SwitchGame) -> Rc<Cell<u32>> {
        let wins = Rc::new(Cell::new(0));
        let seen = Rc::clone(&wins);
        game.on_win(move || seen.set(seen.get() + 1));
        wins
    }

    #[test]
    fn clock_measures_between_ticks() {
        let start = Instant::now();
        let mut clock = FrameClock::new();

        assert_eq!(clock.tick(start), 0.0);
        let dt = clock.tick(start + Duration::from_millis(250));
        assert!((dt - 0.25).abs() < 1e-6);
    }

    #[test]
    fn restarted_clock_forgets_idle_time() {
        let start = Instant::now();
        let mut clock = FrameClock::new();
        clock.tick(start);

        clock.restart(start + Duration::from_secs(10));
        let dt = clock.tick(start + Duration::from_millis(10_100));
        assert!((dt - 0.1).abs() < 1e-5);
    }

    #[test]
    fn clock_never_runs_backwards() {
        let start = Instant::now();
        let mut clock = FrameClock::new();
        clock.tick(start + Duration::from_secs(1));
        assert_eq!(clock.tick(start), 0.0);
    }

    #[test]
    fn seeded_games_deal_the_same_board() {
        let targets = |game: &SwitchGame| game.grid().angles().tiles().map(|tile| tile.target);
        assert_eq!(targets(&game()), targets(&game()));
    }

    #[test]
    fn new_game_starts_at_rest() {
        let mut game = game();
        game.on_new_game();

        for tile in game.grid().angles().tiles() {
            assert_eq!(tile.current, 0.0);
            assert!(tile.target == 0.0 || tile.target == 1.0);
        }
    }

    #[test]
    fn winning_click_fires_callbacks_once() {
        let mut game = game();
        let wins = counter(&mut game);

        // Every switch but the first row and column already placed: one click
        // on the corner solves the board.
        let mut targets = [0.0; TILE_COUNT];
        for (i, target) in targets.iter_mut().enumerate() {
            if i % 4 == 0 || i / 4 == 0 {
                *target = 1.0;
            }
        }
        game.grid = PuzzleGrid::with_targets(targets);

        assert_eq!(game.click(0), PointerOutcome::Accepted);
        assert!(game.is_won());
        assert_eq!(wins.get(), 1);

        assert_eq!(game.click(5), PointerOutcome::Ignored);
        assert_eq!(wins.get(), 1);
    }

    #[test]
    fn ordinary_click_is_accepted_without_win() {
        let mut game = game();
        let wins = counter(&mut game);
        game.grid = PuzzleGrid::with_targets([1.0; TILE_COUNT]);

        assert_eq!(game.click(0), PointerOutcome::Accepted);
        assert!(!game.is_won());
        assert_eq!(wins.get(), 0);
        assert!(game.grid().angles().is_animating());
    }

    #[test]
    fn solved_deal_announces_win() {
        let mut game = game();
        let wins = counter(&mut game);

        game.settle(ClickOutcome::Won);
        game.settle(ClickOutcome::Toggled);
        assert_eq!(wins.get(), 1);
    }

    #[test]
    fn solved_board_stops_accepting_clicks() {
        let mut game = game();
        game.grid = PuzzleGrid::with_targets([1.0; TILE_COUNT]);
        assert!(game.accepts_clicks());

        game.grid = PuzzleGrid::with_targets([2.0; TILE_COUNT]);
        assert!(!game.accepts_clicks());
    }

    #[test]
    fn empty_viewport_cannot_draw() {
        let mut game = game();
        assert!(!game.can_draw());

        game.viewport = (800, 600);
        assert!(game.can_draw());

        game.viewport = (800, 0);
        assert!(!game.can_draw());
    }

    #[test]
    fn off_board_click_is_ignored() {
        let mut game = game();
        assert_eq!(game.click(TILE_COUNT), PointerOutcome::Ignored);
    }
}
