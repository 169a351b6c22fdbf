use thiserror::Error;

use crate::core::frame::{FrameError, RawFrame};

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("capture source stopped")]
    Stopped,

    #[error("malformed frame: {0}")]
    Frame(#[from] FrameError),
}

/// Delivers raw frames at the source's own cadence
///
/// The returned frame borrows the source's buffer and is only valid until the
/// next call; consumers copy what they need before returning.
pub trait CaptureSource: Send {
    fn next_frame(&mut self) -> Result<RawFrame<'_>, CaptureError>;
}
