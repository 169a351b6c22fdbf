use thiserror::Error;

use crate::core::frame::FrameBuffer;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("shader compilation failed: {0}")]
    ShaderCompilation(String),

    #[error("texture allocation failed: {0}")]
    TextureAllocation(String),

    #[error("no compatible display surface: {0}")]
    SurfaceUnavailable(String),

    #[error("frame rows are not tightly packed: width {width} needs stride {expected}, got {row_stride}", expected = .width * 4)]
    StrideMismatch { width: u32, row_stride: u32 },

    #[error("surface error: {0}")]
    Surface(#[from] wgpu::SurfaceError),
}

impl RenderError {
    /// Errors that leave the surface unusable until it is recreated
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::ShaderCompilation(_) | Self::TextureAllocation(_) | Self::SurfaceUnavailable(_)
        )
    }
}

/// GPU side of the renderer: one textured full-screen quad
///
/// The `Renderer` drives these callbacks and owns the lifecycle checks, so an
/// implementation can assume `create` ran before `upload`/`draw`.
pub trait FrameSurface {
    /// Compile the shader program, allocate the texture and quad geometry
    fn create(&mut self) -> Result<(), RenderError>;

    /// Match the viewport to a new drawable size
    fn resize(&mut self, width: u32, height: u32);

    /// Copy a tightly-packed RGBA frame into the texture
    fn upload(&mut self, frame: &FrameBuffer) -> Result<(), RenderError>;

    /// Draw the quad sampling whatever the texture currently holds
    fn draw(&mut self) -> Result<(), RenderError>;

    /// Release GPU resources
    fn destroy(&mut self);
}
