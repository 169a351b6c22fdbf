use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use log::{error, info, warn};

use crate::core::pipeline::{CapturePipeline, ThroughputReport};
use crate::traits::{CaptureError, CaptureSource, FrameProcessor};

/// Dedicated capture/analysis thread
///
/// Pulls frames from the source and pushes them through the pipeline until
/// stopped or the source runs dry. Never waits on the render thread.
pub struct CaptureThread {
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<u64>>,
}

impl CaptureThread {
    pub fn spawn<S, P>(
        mut source: S,
        mut pipeline: CapturePipeline<P>,
        reports: Sender<ThroughputReport>,
    ) -> io::Result<Self>
    where
        S: CaptureSource + 'static,
        P: FrameProcessor + 'static,
    {
        let running = Arc::new(AtomicBool::new(true));
        let thread_running = Arc::clone(&running);

        let handle = thread::Builder::new()
            .name("capture".into())
            .spawn(move || {
                info!("Capture thread started");
                while thread_running.load(Ordering::Acquire) {
                    let outcome = match source.next_frame() {
                        Ok(raw) => pipeline.on_frame(raw),
                        Err(CaptureError::Stopped) => break,
                        Err(CaptureError::Frame(e)) => {
                            warn!("Skipping malformed frame: {}", e);
                            continue;
                        }
                        Err(e) => {
                            error!("Capture failed: {}", e);
                            break;
                        }
                    };

                    if let Some(report) = outcome.report {
                        // UI gone is fine; keep feeding the slot until stopped
                        let _ = reports.send(report);
                    }
                }
                thread_running.store(false, Ordering::Release);
                info!(
                    "Capture thread stopped after {} frames ({} dropped at the slot)",
                    pipeline.frames_processed(),
                    pipeline.frames_dropped()
                );
                pipeline.frames_processed()
            })?;

        Ok(Self {
            running,
            handle: Some(handle),
        })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Signal the thread and wait for it, returning the frames it processed
    pub fn stop(&mut self) -> Option<u64> {
        self.running.store(false, Ordering::Release);
        let handle = self.handle.take()?;
        match handle.join() {
            Ok(frames) => Some(frames),
            Err(_) => {
                error!("Capture thread panicked");
                None
            }
        }
    }
}

impl Drop for CaptureThread {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::mode::ModeFlag;
    use crate::core::slot::LatestFrameSlot;
    use crate::core::synthetic::SyntheticCamera;
    use crate::core::frame::RawFrame;
    use crate::traits::Passthrough;
    use std::sync::mpsc;

    /// Hands out one frame whose header overstates its buffer, then two good ones
    struct GlitchySource {
        buffer: Vec<u8>,
        calls: u32,
    }

    impl CaptureSource for GlitchySource {
        fn next_frame(&mut self) -> Result<RawFrame<'_>, CaptureError> {
            self.calls += 1;
            match self.calls {
                1 => Ok(RawFrame::new(&self.buffer, 10, 10, 40)?),
                2 | 3 => Ok(RawFrame::new(&self.buffer, 2, 2, 8)?),
                _ => Err(CaptureError::Stopped),
            }
        }
    }

    #[test]
    fn drains_a_finite_source() {
        let slot = Arc::new(LatestFrameSlot::new());
        let pipeline = CapturePipeline::new(Passthrough, ModeFlag::default(), slot.clone());
        let camera = SyntheticCamera::new(16, 16, 8).with_frame_limit(10);
        let (tx, _rx) = mpsc::channel();

        let mut capture = CaptureThread::spawn(camera, pipeline, tx).unwrap();
        // Source stops on its own after ten frames
        while capture.is_running() {
            thread::yield_now();
        }
        assert_eq!(capture.stop(), Some(10));

        let last = slot.take_if_new().unwrap();
        assert!(last.is_tightly_packed());
        assert_eq!(last.dimensions(), (16, 16));
    }

    #[test]
    fn stop_interrupts_an_endless_source() {
        let slot = Arc::new(LatestFrameSlot::new());
        let pipeline = CapturePipeline::new(Passthrough, ModeFlag::default(), slot.clone());
        let camera = SyntheticCamera::new(8, 8, 0).with_fps(500);
        let (tx, rx) = mpsc::channel();
        drop(rx);

        let mut capture = CaptureThread::spawn(camera, pipeline, tx).unwrap();
        while !slot.is_dirty() {
            thread::yield_now();
        }
        assert!(capture.stop().unwrap() >= 1);
        assert!(!capture.is_running());
    }

    #[test]
    fn malformed_frame_is_skipped_not_fatal() {
        let slot = Arc::new(LatestFrameSlot::new());
        let pipeline = CapturePipeline::new(Passthrough, ModeFlag::default(), slot.clone());
        let source = GlitchySource {
            buffer: vec![0; 16],
            calls: 0,
        };
        let (tx, _rx) = mpsc::channel();

        let mut capture = CaptureThread::spawn(source, pipeline, tx).unwrap();
        while capture.is_running() {
            thread::yield_now();
        }
        assert_eq!(capture.stop(), Some(2));
        assert_eq!(slot.take_if_new().unwrap().dimensions(), (2, 2));
    }
}
