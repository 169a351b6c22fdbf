use thiserror::Error;

use crate::core::frame::FrameBuffer;
use crate::core::mode::ProcessingMode;

/// A processing stage could not transform one frame
#[derive(Debug, Error)]
#[error("processing failed: {reason}")]
pub struct ProcessError {
    pub reason: String,
}

impl ProcessError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }
}

/// Synchronous frame transform run on the capture thread
///
/// `Ok(None)` means passthrough: the caller keeps the input frame untouched.
/// On `Err` the caller also falls back to the input frame, so an
/// implementation never has to hand the buffer back.
pub trait FrameProcessor: Send {
    fn process(
        &mut self,
        frame: &FrameBuffer,
        mode: ProcessingMode,
    ) -> Result<Option<FrameBuffer>, ProcessError>;
}

impl<P: FrameProcessor + ?Sized> FrameProcessor for Box<P> {
    fn process(
        &mut self,
        frame: &FrameBuffer,
        mode: ProcessingMode,
    ) -> Result<Option<FrameBuffer>, ProcessError> {
        (**self).process(frame, mode)
    }
}

/// Stage that never touches the frame
#[derive(Debug, Default, Clone, Copy)]
pub struct Passthrough;

impl FrameProcessor for Passthrough {
    fn process(
        &mut self,
        _frame: &FrameBuffer,
        _mode: ProcessingMode,
    ) -> Result<Option<FrameBuffer>, ProcessError> {
        Ok(None)
    }
}
