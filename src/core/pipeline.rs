use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use log::{debug, info, warn};

use crate::core::frame::{FrameBuffer, RawFrame};
use crate::core::mode::{ModeFlag, ProcessingMode};
use crate::core::slot::LatestFrameSlot;
use crate::core::throughput::ThroughputCounter;
use crate::traits::FrameProcessor;

/// One throughput sample for the UI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThroughputReport {
    pub fps: u32,
    pub width: u32,
    pub height: u32,
}

impl ThroughputReport {
    /// Resolution formatted as `WxH`
    pub fn resolution(&self) -> String {
        format!("{}x{}", self.width, self.height)
    }
}

impl fmt::Display for ThroughputReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} fps @ {}x{}", self.fps, self.width, self.height)
    }
}

/// What happened to one captured frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameOutcome {
    pub mode: ProcessingMode,
    /// The processor failed and the unmodified frame was published instead
    pub fell_back: bool,
    /// An unconsumed frame was overwritten in the slot
    pub dropped_previous: bool,
    pub report: Option<ThroughputReport>,
}

/// Capture/analysis side of the handoff
///
/// Runs on the capture thread: copies each borrowed camera frame into an owned
/// tightly-packed buffer, runs the processor with one mode snapshot, and
/// publishes the result to the slot for the render thread.
pub struct CapturePipeline<P: FrameProcessor> {
    processor: P,
    mode: ModeFlag,
    slot: Arc<LatestFrameSlot>,
    counter: ThroughputCounter,
    last_dimensions: (u32, u32),
    frames_processed: u64,
    frames_dropped: u64,
}

impl<P: FrameProcessor> CapturePipeline<P> {
    pub fn new(processor: P, mode: ModeFlag, slot: Arc<LatestFrameSlot>) -> Self {
        Self::with_counter(processor, mode, slot, ThroughputCounter::new())
    }

    pub fn with_counter(
        processor: P,
        mode: ModeFlag,
        slot: Arc<LatestFrameSlot>,
        counter: ThroughputCounter,
    ) -> Self {
        Self {
            processor,
            mode,
            slot,
            counter,
            last_dimensions: (0, 0),
            frames_processed: 0,
            frames_dropped: 0,
        }
    }

    pub fn on_frame(&mut self, raw: RawFrame<'_>) -> FrameOutcome {
        self.on_frame_at(raw, Instant::now())
    }

    /// Process one frame that completed capture at `now`
    pub fn on_frame_at(&mut self, raw: RawFrame<'_>, now: Instant) -> FrameOutcome {
        if !raw.is_tightly_packed() {
            debug!(
                "Repacking {}x{} frame from stride {}",
                raw.width(),
                raw.height(),
                raw.row_stride()
            );
        }
        let frame = raw.to_packed();

        let mode = self.mode.snapshot();
        let (frame, fell_back) = self.run_processor(frame, mode);

        self.last_dimensions = frame.dimensions();
        let dropped_previous = self.slot.publish(Box::new(frame));
        if dropped_previous {
            self.frames_dropped += 1;
        }
        self.frames_processed += 1;

        let report = self.counter.tick_at(now).map(|fps| self.report(fps));

        FrameOutcome {
            mode,
            fell_back,
            dropped_previous,
            report,
        }
    }

    /// Close the current window if it has expired, without a new frame
    pub fn poll_report(&mut self, now: Instant) -> Option<ThroughputReport> {
        self.counter.roll_window(now).map(|fps| self.report(fps))
    }

    fn run_processor(&mut self, frame: FrameBuffer, mode: ProcessingMode) -> (FrameBuffer, bool) {
        match self.processor.process(&frame, mode) {
            Ok(None) => (frame, false),
            Ok(Some(processed)) if processed.dimensions() == frame.dimensions() => {
                (processed.into_packed(), false)
            }
            Ok(Some(processed)) => {
                warn!(
                    "Processor returned {}x{} for a {}x{} frame; showing input",
                    processed.width(),
                    processed.height(),
                    frame.width(),
                    frame.height()
                );
                (frame, true)
            }
            Err(e) => {
                warn!("Frame {} {}; showing input", self.frames_processed, e);
                (frame, true)
            }
        }
    }

    fn report(&self, fps: u32) -> ThroughputReport {
        let (width, height) = self.last_dimensions;
        let report = ThroughputReport { fps, width, height };
        info!("Capture: {}", report);
        report
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames_processed
    }

    /// Frames overwritten in the slot before the renderer took them
    pub fn frames_dropped(&self) -> u64 {
        self.frames_dropped
    }

    pub fn slot(&self) -> &Arc<LatestFrameSlot> {
        &self.slot
    }

    pub fn mode(&self) -> &ModeFlag {
        &self.mode
    }

    pub fn processor(&self) -> &P {
        &self.processor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{Passthrough, ProcessError};
    use std::time::Duration;

    struct Failing;

    impl FrameProcessor for Failing {
        fn process(
            &mut self,
            _frame: &FrameBuffer,
            _mode: ProcessingMode,
        ) -> Result<Option<FrameBuffer>, ProcessError> {
            Err(ProcessError::new("sensor glitch"))
        }
    }

    struct WrongSize;

    impl FrameProcessor for WrongSize {
        fn process(
            &mut self,
            _frame: &FrameBuffer,
            _mode: ProcessingMode,
        ) -> Result<Option<FrameBuffer>, ProcessError> {
            Ok(Some(FrameBuffer::solid(1, 1, [0, 0, 0, 255]).unwrap()))
        }
    }

    fn raw_pixels() -> Vec<u8> {
        (0..4 * 4 * 4).map(|i| i as u8).collect()
    }

    #[test]
    fn failure_publishes_unmodified_frame() {
        let slot = Arc::new(LatestFrameSlot::new());
        let mut pipeline = CapturePipeline::new(Failing, ModeFlag::default(), slot.clone());
        let pixels = raw_pixels();

        let outcome = pipeline.on_frame(RawFrame::new(&pixels, 4, 4, 16).unwrap());
        assert!(outcome.fell_back);
        assert_eq!(slot.take_if_new().unwrap().pixels(), pixels.as_slice());

        // The next frame is still processed normally
        pipeline.on_frame(RawFrame::new(&pixels, 4, 4, 16).unwrap());
        assert!(slot.is_dirty());
    }

    #[test]
    fn mismatched_output_falls_back() {
        let slot = Arc::new(LatestFrameSlot::new());
        let mut pipeline = CapturePipeline::new(WrongSize, ModeFlag::default(), slot.clone());
        let pixels = raw_pixels();

        assert!(pipeline.on_frame(RawFrame::new(&pixels, 4, 4, 16).unwrap()).fell_back);
        assert_eq!(slot.take_if_new().unwrap().dimensions(), (4, 4));
    }

    #[test]
    fn dropped_frames_are_counted() {
        let slot = Arc::new(LatestFrameSlot::new());
        let mut pipeline = CapturePipeline::new(Passthrough, ModeFlag::default(), slot.clone());
        let pixels = raw_pixels();

        for _ in 0..3 {
            pipeline.on_frame(RawFrame::new(&pixels, 4, 4, 16).unwrap());
        }
        assert_eq!(pipeline.frames_processed(), 3);
        assert_eq!(pipeline.frames_dropped(), 2);
    }

    #[test]
    fn report_carries_last_resolution() {
        let start = Instant::now();
        let slot = Arc::new(LatestFrameSlot::new());
        let mut pipeline = CapturePipeline::with_counter(
            Passthrough,
            ModeFlag::default(),
            slot,
            ThroughputCounter::starting_at(start),
        );
        let pixels = raw_pixels();
        pipeline.on_frame_at(RawFrame::new(&pixels, 4, 4, 16).unwrap(), start);

        let report = pipeline.poll_report(start + Duration::from_millis(1200)).unwrap();
        assert_eq!(report.fps, 1);
        assert_eq!(report.resolution(), "4x4");
        assert_eq!(report.to_string(), "1 fps @ 4x4");
    }
}
