use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use edge_viewer::core::{
    CapturePipeline, FrameBuffer, LatestFrameSlot, ModeFlag, ProcessingMode, RawFrame,
    ThroughputCounter,
};
use edge_viewer::traits::{FrameProcessor, ProcessError};

/// Deterministic stand-in for the real stage: inverts RGB in edges mode,
/// passes through in raw mode, and records every call
#[derive(Default)]
struct InvertingProcessor {
    calls: Vec<ProcessingMode>,
}

impl FrameProcessor for InvertingProcessor {
    fn process(
        &mut self,
        frame: &FrameBuffer,
        mode: ProcessingMode,
    ) -> Result<Option<FrameBuffer>, ProcessError> {
        self.calls.push(mode);
        match mode {
            ProcessingMode::Raw => Ok(None),
            ProcessingMode::Edges => {
                let pixels = frame
                    .pixels()
                    .chunks(4)
                    .flat_map(|px| [255 - px[0], 255 - px[1], 255 - px[2], px[3]])
                    .collect();
                FrameBuffer::packed(pixels, frame.width(), frame.height())
                    .map(Some)
                    .map_err(|e| ProcessError::new(e.to_string()))
            }
        }
    }
}

fn tagged_pixels(width: u32, height: u32, tag: u8) -> Vec<u8> {
    [tag, 10, 20, 255]
        .iter()
        .copied()
        .cycle()
        .take((width * height * 4) as usize)
        .collect()
}

fn pipeline_at(
    mode: ProcessingMode,
    start: Instant,
) -> (CapturePipeline<InvertingProcessor>, ModeFlag, Arc<LatestFrameSlot>) {
    let flag = ModeFlag::new(mode);
    let slot = Arc::new(LatestFrameSlot::new());
    let pipeline = CapturePipeline::with_counter(
        InvertingProcessor::default(),
        flag.clone(),
        slot.clone(),
        ThroughputCounter::starting_at(start),
    );
    (pipeline, flag, slot)
}

// ============================================================================
// Slot Handoff
// ============================================================================

#[test]
fn test_three_publishes_collapse_into_latest() {
    let slot = LatestFrameSlot::new();
    for tag in 1..=3u8 {
        slot.publish(Box::new(FrameBuffer::solid(4, 4, [tag, 0, 0, 255]).unwrap()));
    }

    let taken = slot.take_if_new().expect("latest frame");
    assert_eq!(taken.pixels()[0], 3);
    assert!(slot.take_if_new().is_none());
}

#[test]
fn test_publish_never_waits_for_consumer() {
    let slot = Arc::new(LatestFrameSlot::new());
    let frames: Vec<Box<FrameBuffer>> = (0..1_000u32)
        .map(|i| Box::new(FrameBuffer::solid(8, 8, [(i % 256) as u8, 0, 0, 255]).unwrap()))
        .collect();
    let last_addr = &*frames[999] as *const FrameBuffer as usize;

    // Producer runs alone; nothing takes from the slot until it has finished
    let producer_slot = Arc::clone(&slot);
    let producer = thread::spawn(move || {
        frames
            .into_iter()
            .map(|frame| producer_slot.publish(frame))
            .collect::<Vec<bool>>()
    });
    let dropped = producer.join().unwrap();

    // First publish found the slot empty, every later one replaced a pending frame
    assert!(!dropped[0]);
    assert!(dropped[1..].iter().all(|&d| d));

    let taken = slot.take_if_new().expect("latest frame");
    assert_eq!(&*taken as *const FrameBuffer as usize, last_addr);
    assert_eq!(taken.pixels()[0], (999 % 256) as u8);
    assert!(slot.take_if_new().is_none());
}

// ============================================================================
// Mode Adoption
// ============================================================================

#[test]
fn test_mode_toggle_applies_to_next_frame() {
    let start = Instant::now();
    let (mut pipeline, flag, slot) = pipeline_at(ProcessingMode::Edges, start);
    let pixels = tagged_pixels(8, 8, 40);

    let n = pipeline.on_frame_at(RawFrame::new(&pixels, 8, 8, 32).unwrap(), start);
    assert_eq!(n.mode, ProcessingMode::Edges);
    assert_eq!(slot.take_if_new().unwrap().pixels()[0], 255 - 40);

    flag.toggle();

    let n1 = pipeline.on_frame_at(RawFrame::new(&pixels, 8, 8, 32).unwrap(), start);
    assert_eq!(n1.mode, ProcessingMode::Raw);
    assert_eq!(slot.take_if_new().unwrap().pixels()[0], 40);

    assert_eq!(
        pipeline.processor().calls,
        vec![ProcessingMode::Edges, ProcessingMode::Raw]
    );
}

// ============================================================================
// End To End
// ============================================================================

#[test]
fn test_five_raw_frames_end_to_end() {
    let start = Instant::now();
    let (mut pipeline, _flag, slot) = pipeline_at(ProcessingMode::Raw, start);

    for i in 0..5u8 {
        let pixels = tagged_pixels(100, 100, i + 1);
        let raw = RawFrame::new(&pixels, 100, 100, 400).unwrap();
        let outcome = pipeline.on_frame_at(raw, start + Duration::from_millis(100 * i as u64));
        assert!(outcome.report.is_none());
        assert!(!outcome.fell_back);
    }

    assert_eq!(pipeline.processor().calls, vec![ProcessingMode::Raw; 5]);

    let last = slot.take_if_new().expect("frame 5 pending");
    assert_eq!(last.dimensions(), (100, 100));
    assert_eq!(last.pixels(), tagged_pixels(100, 100, 5).as_slice());

    let report = pipeline
        .poll_report(start + Duration::from_millis(1001))
        .expect("window closed");
    assert_eq!(report.fps, 5);
    assert_eq!(report.resolution(), "100x100");
    assert!(pipeline.poll_report(start + Duration::from_millis(1500)).is_none());
}

#[test]
fn test_thirty_ticks_then_new_window() {
    let start = Instant::now();
    let (mut pipeline, _flag, _slot) = pipeline_at(ProcessingMode::Raw, start);
    let pixels = tagged_pixels(4, 4, 1);

    for i in 1..=30u64 {
        let raw = RawFrame::new(&pixels, 4, 4, 16).unwrap();
        assert!(pipeline.on_frame_at(raw, start + Duration::from_millis(33 * i)).report.is_none());
    }

    let raw = RawFrame::new(&pixels, 4, 4, 16).unwrap();
    let report = pipeline
        .on_frame_at(raw, start + Duration::from_millis(1010))
        .report
        .expect("31st frame closes the window");
    assert_eq!(report.fps, 30);

    // New window holds exactly the 31st frame
    let report = pipeline.poll_report(start + Duration::from_millis(2020)).unwrap();
    assert_eq!(report.fps, 1);
}

// ============================================================================
// Stride Handling
// ============================================================================

#[test]
fn test_padded_rows_are_repacked_before_publish() {
    let start = Instant::now();
    let (mut pipeline, _flag, slot) = pipeline_at(ProcessingMode::Raw, start);

    let (width, height) = (10u32, 3u32);
    let stride = width * 4 + 16;
    let mut pixels = vec![0xEEu8; (stride * height) as usize];
    for y in 0..height {
        let row = (y * stride) as usize;
        for x in 0..width as usize {
            pixels[row + x * 4..row + x * 4 + 4].copy_from_slice(&[y as u8, x as u8, 0, 255]);
        }
    }

    pipeline.on_frame_at(RawFrame::new(&pixels, width, height, stride).unwrap(), start);

    let frame = slot.take_if_new().unwrap();
    assert!(frame.is_tightly_packed());
    assert_eq!(frame.pixels().len(), (width * height * 4) as usize);
    assert!(!frame.pixels().contains(&0xEE));
    assert_eq!(&frame.row(2).unwrap()[9 * 4..], &[2, 9, 0, 255]);
}
