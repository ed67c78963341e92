//! # Switches
//!
//! **A 4x4 board of rotating switches, drawn with wgpu and solved by clicking.**
//!
//! Clicking a switch turns every switch in its row and its column a quarter
//! turn. The board is solved once every switch has been turned an even number
//! of times.
//!
//! ## Quick Start
//!
//! ```no_run
//! use switches::*;
//!
//! fn main() -> anyhow::Result<()> {
//!     run(AppConfig::new().title("Switches").asset("assets/switch.stl"))
//! }
//! ```
//!
//! ## Layout
//!
//! - [`SwitchGame`] owns the board, the frame clock and the renderer; a host
//!   forwards redraws, clicks, resizes and new-game requests to it.
//! - [`PuzzleGrid`] and [`AnimationState`] are plain data and need no GPU.
//! - [`SwitchRenderer`] draws every switch with one instanced draw into an
//!   [`OffscreenFramebuffer`] holding a shaded image and an object-ID image;
//!   clicks are resolved by reading one texel of the latter back.

mod animation;
mod app;
mod camera;
mod framebuffer;
mod game;
mod geometry;
mod gpu;
mod input;
mod mesh;
mod picking;
mod puzzle;
mod render;

pub use animation::{AnimationState, QUARTER_TURNS_PER_SECOND, Tile};
pub use app::{AppConfig, run};
pub use camera::Camera;
pub use framebuffer::{DEPTH_STENCIL_FORMAT, OBJECT_ID_FORMAT, OffscreenFramebuffer, RenderTarget};
pub use game::{FrameClock, FrameStatus, PointerOutcome, SwitchGame};
pub use geometry::{GeometryError, SceneGeometry};
pub use gpu::{GpuContext, GpuError};
pub use input::{Command, Input};
pub use mesh::{InstanceAngles, SwitchMesh, Vertex};
pub use picking::{PickingResolver, decode_object_id, encode_object_id, flip_y, texel_origin};
pub use puzzle::{ClickOutcome, GRID_SIZE, PuzzleGrid, TILE_COUNT};
pub use render::{BACKGROUND, LIGHT_POSITION, RenderError, SwitchPass, SwitchRenderer, Uniforms};
