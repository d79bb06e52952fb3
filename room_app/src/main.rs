//! Room viewer
//!
//! Opens the window, builds the Vulkan renderer and runs the play state until
//! the window closes or a state message ends it.

mod audio;
mod input_map;
mod play_state;

use room_engine::config::ViewerSettings;
use room_engine::foundation::logging;
use room_engine::foundation::time::FrameTimer;
use room_engine::render::vulkan::{VulkanError, VulkanRenderer, Window, WindowError};
use room_engine::render::{RenderBackend, RenderError, RendererConfig};
use thiserror::Error;

use play_state::PlayState;

/// Settings file read from the working directory
const SETTINGS_FILE: &str = "room_viewer.toml";

/// Longest simulated step; slower frames run the world in slow motion
const MAX_FRAME_TIME: f32 = 1.0 / 30.0;

/// Failures that stop the viewer before the first frame
#[derive(Error, Debug)]
enum AppError {
    #[error("Window: {0}")]
    Window(#[from] WindowError),

    #[error("Vulkan: {0}")]
    Vulkan(#[from] VulkanError),

    #[error("Renderer: {0}")]
    Render(#[from] RenderError),
}

struct ViewerApp {
    play: Option<PlayState>,
    // Dropped before the window owning its surface
    renderer: VulkanRenderer,
    window: Window,
    timer: FrameTimer,
}

impl ViewerApp {
    fn new(settings: &ViewerSettings) -> Result<Self, AppError> {
        let (width, height) = settings.window_size();
        log::info!("Creating {}x{} window...", width, height);
        let mut window = Window::new(&settings.title, width, height)?;

        log::info!("Creating Vulkan renderer...");
        let config = RendererConfig::new(settings.title.clone(), settings.asset_path("shaders"))
            .with_vsync(settings.vsync);
        let mut renderer = VulkanRenderer::new(&mut window, &config)?;

        log::info!("Loading {}...", settings.level_file);
        let mut play = PlayState::new(settings, &mut renderer)?;
        let (x, y) = window.cursor_pos();
        play.seed_cursor(x, y);

        Ok(Self {
            play: Some(play),
            renderer,
            window,
            timer: FrameTimer::new(),
        })
    }

    fn run(&mut self) {
        log::info!("Entering frame loop");
        while !self.window.should_close() {
            let Some(play) = self.play.as_mut() else {
                break;
            };

            self.window.poll_events();
            let events: Vec<_> = self
                .window
                .flush_events()
                .iter()
                .filter_map(input_map::to_input_event)
                .collect();

            self.timer.update();
            let delta_time = self.timer.delta_time().min(MAX_FRAME_TIME);

            if !play.frame(events, delta_time, &mut self.renderer) {
                self.window.set_should_close(true);
            }
        }
        log::info!(
            "Left frame loop after {} frames ({:.1} fps average)",
            self.timer.frame_count(),
            self.timer.average_fps()
        );
    }

    fn shutdown(&mut self) {
        if let Err(e) = self.renderer.wait_idle() {
            log::error!("Waiting for the GPU failed: {}", e);
        }
        if let Some(play) = self.play.take() {
            play.shutdown();
        }
    }
}

fn main() {
    logging::init_with_level("info");
    log::info!("Starting room viewer");

    let settings = ViewerSettings::load_or_default(SETTINGS_FILE);
    let mut app = match ViewerApp::new(&settings) {
        Ok(app) => app,
        Err(e) => {
            log::error!("Startup failed: {}", e);
            std::process::exit(1);
        }
    };

    app.run();
    app.shutdown();
    log::info!("Room viewer exited cleanly");
}
