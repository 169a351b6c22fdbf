use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info, warn};
use winit::{
    application::ApplicationHandler,
    event::*,
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

use edge_viewer::cli::Cli;
use edge_viewer::config::PipelineConfig;
use edge_viewer::core::{
    CapturePipeline, CaptureThread, EdgeDetector, LatestFrameSlot, ModeFlag, SyntheticCamera,
    ThroughputReport, WgpuSurface,
};
use edge_viewer::renderer::Renderer;
use edge_viewer::traits::RenderError;

// === Constants ===

const INITIAL_WINDOW_WIDTH: u32 = 800;
const INITIAL_WINDOW_HEIGHT: u32 = 600;

// === Application ===

struct App {
    config: PipelineConfig,
    mode: ModeFlag,
    slot: Arc<LatestFrameSlot>,
    reports: Receiver<ThroughputReport>,
    capture: CaptureThread,
    window: Option<Arc<Window>>,
    renderer: Option<Renderer<WgpuSurface>>,
}

impl App {
    fn new(config: PipelineConfig) -> Result<Self> {
        let mode = ModeFlag::new(config.initial_mode());
        let slot = Arc::new(LatestFrameSlot::new());
        let (tx, reports) = mpsc::channel();

        let camera = SyntheticCamera::new(
            config.capture_width,
            config.capture_height,
            config.row_padding,
        )
        .with_fps(config.capture_fps);
        let pipeline = CapturePipeline::new(
            EdgeDetector::new(config.edge_threshold),
            mode.clone(),
            Arc::clone(&slot),
        );
        let capture =
            CaptureThread::spawn(camera, pipeline, tx).context("Failed to start capture thread")?;

        Ok(Self {
            config,
            mode,
            slot,
            reports,
            capture,
            window: None,
            renderer: None,
        })
    }

    fn create_renderer(&self, window: Arc<Window>) -> Result<Renderer<WgpuSurface>, RenderError> {
        let surface = pollster::block_on(WgpuSurface::new(
            window,
            self.mode.clone(),
            self.config.show_hud,
        ))?;
        let mut renderer = Renderer::new(surface, Arc::clone(&self.slot));
        renderer.on_surface_created()?;
        Ok(renderer)
    }

    fn toggle_mode(&self) {
        info!("Mode switched to {}", self.mode.toggle());
    }

    fn redraw(&mut self) {
        let Some(renderer) = self.renderer.as_mut() else {
            return;
        };

        if let Some(report) = self.reports.try_iter().last() {
            renderer.surface_mut().set_report(report);
            if let Some(window) = &self.window {
                window.set_title(&format!(
                    "Edge Viewer - {} - {} fps - {}",
                    self.mode.snapshot(),
                    report.fps,
                    report.resolution()
                ));
            }
        }

        // Configuration errors already left the renderer non-ready; the next
        // `resumed` rebuilds it
        if let Err(e) = renderer.on_draw_frame() {
            warn!("Draw failed: {}", e);
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() {
            let window = match event_loop.create_window(
                Window::default_attributes()
                    .with_title("Edge Viewer")
                    .with_inner_size(winit::dpi::LogicalSize::new(
                        INITIAL_WINDOW_WIDTH,
                        INITIAL_WINDOW_HEIGHT,
                    )),
            ) {
                Ok(w) => Arc::new(w),
                Err(e) => {
                    error!("Failed to create window: {}", e);
                    event_loop.exit();
                    return;
                }
            };
            self.window = Some(window);
        }

        let result = match self.renderer.as_mut() {
            Some(renderer) if renderer.is_ready() => Ok(()),
            // Coming back from `suspended`: rebuild GPU resources in place
            Some(renderer) => renderer.on_surface_created(),
            None => match self.window.clone() {
                Some(window) => self
                    .create_renderer(window)
                    .map(|renderer| self.renderer = Some(renderer)),
                None => Ok(()),
            },
        };
        if let Err(e) = result {
            error!("Failed to initialize renderer: {}", e);
            event_loop.exit();
        }
    }

    fn suspended(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(renderer) = self.renderer.as_mut() {
            renderer.on_surface_destroyed();
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        // Let the overlay handle the event first
        if let Some(renderer) = self.renderer.as_mut() {
            if renderer.surface_mut().handle_window_event(&event) {
                return;
            }
        }

        match event {
            WindowEvent::CloseRequested
            | WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        state: ElementState::Pressed,
                        physical_key: PhysicalKey::Code(KeyCode::Escape),
                        ..
                    },
                ..
            } => event_loop.exit(),
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        state: ElementState::Pressed,
                        physical_key: PhysicalKey::Code(KeyCode::Space | KeyCode::KeyE),
                        repeat: false,
                        ..
                    },
                ..
            } => self.toggle_mode(),
            WindowEvent::Resized(size) => {
                if let Some(renderer) = self.renderer.as_mut() {
                    renderer.on_surface_changed(size.width, size.height);
                }
            }
            WindowEvent::RedrawRequested => self.redraw(),
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(frames) = self.capture.stop() {
            info!("Captured {} frames", frames);
        }
        self.renderer = None;
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = PipelineConfig::from_cli(&cli).context("Invalid configuration")?;
    info!(
        "Capturing {}x{} @ {} fps, starting in {} mode",
        config.capture_width,
        config.capture_height,
        config.capture_fps,
        config.initial_mode()
    );

    let event_loop = EventLoop::new()?;
    let mut app = App::new(config)?;

    info!("Edge Viewer - Controls: Space/E toggles edges, Escape to quit");
    event_loop.run_app(&mut app)?;

    Ok(())
}
