pub mod capture_thread;
pub mod edges;
pub mod frame;
pub mod gpu_context;
pub mod hud;
pub mod mode;
pub mod pipeline;
pub mod slot;
pub mod surface_renderer;
pub mod synthetic;
pub mod throughput;

pub use capture_thread::CaptureThread;
pub use edges::{EdgeDetector, DEFAULT_EDGE_THRESHOLD};
pub use frame::{FrameBuffer, FrameError, RawFrame, BYTES_PER_PIXEL};
pub use gpu_context::GpuContext;
pub use mode::{ModeFlag, ProcessingMode};
pub use pipeline::{CapturePipeline, FrameOutcome, ThroughputReport};
pub use slot::LatestFrameSlot;
pub use surface_renderer::WgpuSurface;
pub use synthetic::SyntheticCamera;
pub use throughput::{ThroughputCounter, REPORT_WINDOW};
