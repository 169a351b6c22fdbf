pub mod cli;
pub mod config;
pub mod core;
pub mod renderer;
pub mod traits;

pub use crate::core::{
    CapturePipeline, CaptureThread, EdgeDetector, FrameBuffer, LatestFrameSlot, ModeFlag,
    ProcessingMode, RawFrame, SyntheticCamera, ThroughputCounter, ThroughputReport,
};
pub use renderer::{DrawOutcome, Renderer, RendererState};
