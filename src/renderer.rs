use std::sync::Arc;

use log::{debug, error, info};

use crate::core::slot::LatestFrameSlot;
use crate::core::throughput::ThroughputCounter;
use crate::traits::{FrameSurface, RenderError};

/// Renderer lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RendererState {
    Uninitialized,
    SurfaceReady,
    Drawing,
    Destroyed,
}

/// Result of one render tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawOutcome {
    /// Surface not ready; nothing drawn
    Skipped,
    /// A new frame was uploaded, then drawn
    Uploaded { width: u32, height: u32 },
    /// No new frame; the previous texture was drawn again
    Redrawn,
}

/// Render-thread consumer of the frame slot
///
/// Each tick takes the latest frame if there is one, uploads it, and draws
/// the full-screen quad. Without a new frame the previous texture content is
/// drawn again, so the surface never goes blank.
pub struct Renderer<S: FrameSurface> {
    surface: S,
    slot: Arc<LatestFrameSlot>,
    state: RendererState,
    texture_size: Option<(u32, u32)>,
    draw_counter: ThroughputCounter,
    display_fps: Option<u32>,
}

impl<S: FrameSurface> Renderer<S> {
    pub fn new(surface: S, slot: Arc<LatestFrameSlot>) -> Self {
        Self {
            surface,
            slot,
            state: RendererState::Uninitialized,
            texture_size: None,
            draw_counter: ThroughputCounter::new(),
            display_fps: None,
        }
    }

    /// Build GPU resources for a freshly created surface
    ///
    /// A failure here is a configuration error: the renderer stays
    /// uninitialized and draws are skipped until the surface is recreated.
    pub fn on_surface_created(&mut self) -> Result<(), RenderError> {
        if self.is_ready() {
            self.surface.destroy();
        }

        match self.surface.create() {
            Ok(()) => {
                info!("Surface ready");
                self.state = RendererState::SurfaceReady;
                self.texture_size = None;
                self.draw_counter.reset(std::time::Instant::now());
                Ok(())
            }
            Err(e) => {
                error!("Surface setup failed: {}", e);
                self.state = RendererState::Uninitialized;
                Err(e)
            }
        }
    }

    pub fn on_surface_changed(&mut self, width: u32, height: u32) {
        if self.is_ready() {
            self.surface.resize(width, height);
        }
    }

    /// One render tick
    pub fn on_draw_frame(&mut self) -> Result<DrawOutcome, RenderError> {
        if !self.is_ready() {
            return Ok(DrawOutcome::Skipped);
        }
        self.state = RendererState::Drawing;

        let mut outcome = DrawOutcome::Redrawn;
        if let Some(frame) = self.slot.take_if_new() {
            if !frame.is_tightly_packed() {
                return Err(RenderError::StrideMismatch {
                    width: frame.width(),
                    row_stride: frame.row_stride(),
                });
            }
            let uploaded = self.surface.upload(&frame);
            self.check(uploaded)?;
            let (width, height) = frame.dimensions();
            if self.texture_size != Some((width, height)) {
                info!("Texture now {}x{}", width, height);
                self.texture_size = Some((width, height));
            }
            outcome = DrawOutcome::Uploaded { width, height };
            // Frame is released here; the texture holds the pixels now
        }

        let drawn = self.surface.draw();
        self.check(drawn)?;

        if let Some(fps) = self.draw_counter.tick() {
            debug!("Display: {} fps", fps);
            self.display_fps = Some(fps);
        }
        Ok(outcome)
    }

    /// Tear the surface down on a configuration error
    ///
    /// The renderer stays non-ready until `on_surface_created` succeeds again.
    fn check(&mut self, result: Result<(), RenderError>) -> Result<(), RenderError> {
        if let Err(e) = &result {
            if e.is_configuration() {
                error!("Surface unusable, waiting for recreation: {}", e);
                self.surface.destroy();
                self.state = RendererState::Uninitialized;
                self.texture_size = None;
            }
        }
        result
    }

    /// Release GPU resources; a later `on_surface_created` starts over
    pub fn on_surface_destroyed(&mut self) {
        if self.state == RendererState::Destroyed {
            return;
        }
        if self.is_ready() {
            self.surface.destroy();
        }
        info!("Surface destroyed");
        self.state = RendererState::Destroyed;
        self.texture_size = None;
    }

    pub fn state(&self) -> RendererState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, RendererState::SurfaceReady | RendererState::Drawing)
    }

    /// Size of the frame currently held by the texture
    pub fn texture_size(&self) -> Option<(u32, u32)> {
        self.texture_size
    }

    /// Render ticks completed in the last full second
    pub fn display_fps(&self) -> Option<u32> {
        self.display_fps
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }
}

impl<S: FrameSurface> Drop for Renderer<S> {
    fn drop(&mut self) {
        if self.is_ready() {
            self.surface.destroy();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::frame::FrameBuffer;

    #[derive(Default)]
    struct CountingSurface {
        fail_create: bool,
        creates: u32,
        uploads: u32,
        draws: u32,
        destroys: u32,
        viewport: (u32, u32),
    }

    impl FrameSurface for CountingSurface {
        fn create(&mut self) -> Result<(), RenderError> {
            self.creates += 1;
            if self.fail_create {
                Err(RenderError::ShaderCompilation("bad entry point".into()))
            } else {
                Ok(())
            }
        }

        fn resize(&mut self, width: u32, height: u32) {
            self.viewport = (width, height);
        }

        fn upload(&mut self, _frame: &FrameBuffer) -> Result<(), RenderError> {
            self.uploads += 1;
            Ok(())
        }

        fn draw(&mut self) -> Result<(), RenderError> {
            self.draws += 1;
            Ok(())
        }

        fn destroy(&mut self) {
            self.destroys += 1;
        }
    }

    fn renderer(surface: CountingSurface) -> (Renderer<CountingSurface>, Arc<LatestFrameSlot>) {
        let slot = Arc::new(LatestFrameSlot::new());
        (Renderer::new(surface, slot.clone()), slot)
    }

    #[test]
    fn draw_before_surface_is_skipped() {
        let (mut r, slot) = renderer(CountingSurface::default());
        slot.publish(Box::new(FrameBuffer::solid(2, 2, [1, 2, 3, 4]).unwrap()));

        assert_eq!(r.on_draw_frame().unwrap(), DrawOutcome::Skipped);
        assert_eq!(r.surface().draws, 0);
        // Frame is left for the first real tick
        assert!(slot.is_dirty());
    }

    #[test]
    fn configuration_error_keeps_renderer_uninitialized() {
        let (mut r, _slot) = renderer(CountingSurface {
            fail_create: true,
            ..Default::default()
        });

        let err = r.on_surface_created().unwrap_err();
        assert!(err.is_configuration());
        assert_eq!(r.state(), RendererState::Uninitialized);
        assert_eq!(r.on_draw_frame().unwrap(), DrawOutcome::Skipped);
    }

    #[test]
    fn lifecycle_can_be_recreated() {
        let (mut r, slot) = renderer(CountingSurface::default());
        r.on_surface_created().unwrap();
        r.on_surface_changed(800, 600);
        assert_eq!(r.surface().viewport, (800, 600));

        slot.publish(Box::new(FrameBuffer::solid(2, 2, [1, 2, 3, 4]).unwrap()));
        assert_eq!(r.on_draw_frame().unwrap(), DrawOutcome::Uploaded { width: 2, height: 2 });
        assert_eq!(r.state(), RendererState::Drawing);

        r.on_surface_destroyed();
        assert_eq!(r.state(), RendererState::Destroyed);
        assert_eq!(r.on_draw_frame().unwrap(), DrawOutcome::Skipped);

        r.on_surface_created().unwrap();
        assert_eq!(r.state(), RendererState::SurfaceReady);
        assert_eq!(r.surface().creates, 2);
        assert_eq!(r.surface().destroys, 1);
    }

    #[test]
    fn resize_before_create_is_ignored() {
        let (mut r, _slot) = renderer(CountingSurface::default());
        r.on_surface_changed(10, 10);
        assert_eq!(r.surface().viewport, (0, 0));
    }
}
