use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowAttributes, WindowId};

use crate::game::{FrameStatus, PointerOutcome, SwitchGame};
use crate::gpu::GpuContext;
use crate::input::{Command, Input};

/// Window and game settings.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    /// Scene-description file holding the switch model.
    pub asset: PathBuf,
    /// Fixed seed for the deals; drawn from the OS when unset.
    pub seed: Option<u64>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            title: "Switches".to_string(),
            width: 800,
            height: 600,
            asset: PathBuf::from("assets/switch.stl"),
            seed: None,
        }
    }
}

impl AppConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn asset(mut self, asset: impl Into<PathBuf>) -> Self {
        self.asset = asset.into();
        self
    }

    pub fn seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    fn solved_title(&self) -> String {
        format!("{} - solved! Press N for a new board", self.title)
    }
}

/// Opens the window and runs the game until it is closed.
///
/// Returns the first fatal error (no GPU, unreadable asset, broken shader)
/// after the event loop has shut down.
///
/// # Example
/// ```ignore
/// switches::run(AppConfig::new().title("Switches").seed(Some(42)))?;
/// ```
pub fn run(config: AppConfig) -> anyhow::Result<()> {
    let event_loop = EventLoop::new().context("failed to create event loop")?;
    // Redraws are requested explicitly while something moves.
    event_loop.set_control_flow(ControlFlow::Wait);

    let mut app = SwitchApp {
        config,
        state: AppState::Pending,
        failure: None,
    };
    event_loop.run_app(&mut app).context("event loop failed")?;

    match app.failure {
        Some(error) => Err(error),
        None => Ok(()),
    }
}

struct SwitchApp {
    config: AppConfig,
    state: AppState,
    failure: Option<anyhow::Error>,
}

enum AppState {
    Pending,
    Running(Running),
}

struct Running {
    window: Arc<Window>,
    gpu: GpuContext,
    game: SwitchGame,
    input: Input,
}

impl SwitchApp {
    fn fail(&mut self, event_loop: &ActiveEventLoop, error: anyhow::Error) {
        tracing::error!("{error:#}");
        self.failure.get_or_insert(error);
        event_loop.exit();
    }
}

impl ApplicationHandler for SwitchApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if !matches!(self.state, AppState::Pending) {
            return;
        }
        match Running::start(&self.config, event_loop) {
            Ok(running) => self.state = AppState::Running(running),
            Err(error) => self.fail(event_loop, error),
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let AppState::Running(running) = &mut self.state else {
            return;
        };

        let result = running.handle_event(&self.config, event_loop, event);
        if let Err(error) = result {
            self.fail(event_loop, error);
        }
    }
}

impl Running {
    fn start(config: &AppConfig, event_loop: &ActiveEventLoop) -> anyhow::Result<Self> {
        let window_attrs = WindowAttributes::default()
            .with_title(&config.title)
            .with_inner_size(winit::dpi::LogicalSize::new(config.width, config.height));
        let window = Arc::new(
            event_loop
                .create_window(window_attrs)
                .context("failed to create window")?,
        );
        let gpu = GpuContext::new(window.clone())?;

        let mut game = SwitchGame::with_seed(&config.asset, config.seed);
        let size = window.inner_size();
        game.on_resize(&gpu, size.width, size.height);

        let solved_title = config.solved_title();
        if game.is_won() {
            window.set_title(&solved_title);
        }
        let title_window = Arc::clone(&window);
        game.on_win(move || title_window.set_title(&solved_title));

        tracing::info!(width = size.width, height = size.height, "window ready");
        window.request_redraw();

        Ok(Self {
            window,
            gpu,
            game,
            input: Input::new(),
        })
    }

    fn handle_event(
        &mut self,
        config: &AppConfig,
        event_loop: &ActiveEventLoop,
        event: WindowEvent,
    ) -> anyhow::Result<()> {
        match self.input.handle_event(&event) {
            Some(Command::Pick { x, y }) => self.pick(x, y),
            Some(Command::NewGame) => {
                self.window.set_title(&config.title);
                self.game.on_new_game();
                self.window.request_redraw();
            }
            Some(Command::Quit) => event_loop.exit(),
            None => {}
        }

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => {
                self.gpu.resize(size.width, size.height);
                self.game.on_resize(&self.gpu, size.width, size.height);
                self.window.request_redraw();
            }
            WindowEvent::RedrawRequested => self.redraw()?,
            _ => {}
        }
        Ok(())
    }

    fn pick(&mut self, x: u32, y: u32) {
        match self.game.on_pointer_release(&self.gpu, x, y) {
            Ok(PointerOutcome::Accepted) => self.window.request_redraw(),
            Ok(PointerOutcome::Ignored) => {}
            Err(error) => tracing::warn!(%error, "click ignored"),
        }
    }

    fn redraw(&mut self) -> anyhow::Result<()> {
        // A minimized window keeps its old surface size but has nothing to show.
        if self.gpu.width() == 0 || self.gpu.height() == 0 || !self.game.can_draw() {
            return Ok(());
        }

        let output = match self.gpu.surface.get_current_texture() {
            Ok(output) => output,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                tracing::warn!("surface lost, reconfiguring");
                self.gpu.reconfigure();
                self.window.request_redraw();
                return Ok(());
            }
            Err(wgpu::SurfaceError::Timeout) => {
                tracing::warn!("timed out acquiring surface texture");
                self.window.request_redraw();
                return Ok(());
            }
            Err(error) => return Err(error).context("failed to acquire surface texture"),
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let status = self.game.paint(&self.gpu, &view)?;

        self.window.pre_present_notify();
        output.present();

        if status == FrameStatus::Animating {
            self.window.request_redraw();
        }
        Ok(())
    }
}
