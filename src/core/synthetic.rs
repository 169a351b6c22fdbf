use std::thread;
use std::time::{Duration, Instant};

use crate::core::frame::{RawFrame, BYTES_PER_PIXEL};
use crate::traits::{CaptureError, CaptureSource};

/// Side length of the moving square, in pixels
const SQUARE_SIZE: u32 = 48;

/// Test-pattern camera
///
/// Renders a diagonal gradient with a bright square sliding across it into
/// one reused buffer, optionally with padding bytes at the end of each row
/// the way real camera planes are laid out. Paces itself to `fps` when a
/// cadence is set.
#[derive(Debug)]
pub struct SyntheticCamera {
    width: u32,
    height: u32,
    row_stride: u32,
    buffer: Vec<u8>,
    frame_index: u64,
    interval: Option<Duration>,
    next_deadline: Option<Instant>,
    remaining: Option<u64>,
}

impl SyntheticCamera {
    pub fn new(width: u32, height: u32, row_padding: u32) -> Self {
        let row_stride = width * BYTES_PER_PIXEL as u32 + row_padding;
        Self {
            width,
            height,
            row_stride,
            buffer: vec![0; row_stride as usize * height as usize],
            frame_index: 0,
            interval: None,
            next_deadline: None,
            remaining: None,
        }
    }

    /// Deliver frames no faster than `fps`
    pub fn with_fps(mut self, fps: u32) -> Self {
        self.interval = (fps > 0).then(|| Duration::from_secs(1) / fps);
        self
    }

    /// Stop after `count` frames
    pub fn with_frame_limit(mut self, count: u64) -> Self {
        self.remaining = Some(count);
        self
    }

    pub fn row_stride(&self) -> u32 {
        self.row_stride
    }

    pub fn frames_delivered(&self) -> u64 {
        self.frame_index
    }

    fn pace(&mut self) {
        let Some(interval) = self.interval else {
            return;
        };
        let now = Instant::now();
        match self.next_deadline {
            Some(deadline) if deadline > now => {
                thread::sleep(deadline - now);
                self.next_deadline = Some(deadline + interval);
            }
            // First frame, or running late: restart the cadence from now
            _ => self.next_deadline = Some(now + interval),
        }
    }

    fn paint(&mut self) {
        let span = self.width.saturating_sub(SQUARE_SIZE).max(1);
        let square_x = (self.frame_index * 4 % span as u64) as u32;
        let square_y = self.height.saturating_sub(SQUARE_SIZE) / 2;
        let shift = (self.frame_index % 256) as u32;

        for y in 0..self.height {
            let row = &mut self.buffer[(y * self.row_stride) as usize..][..self.row_stride as usize];
            let (pixels, padding) = row.split_at_mut(self.width as usize * BYTES_PER_PIXEL);
            for (x, px) in pixels.chunks_exact_mut(BYTES_PER_PIXEL).enumerate() {
                let x = x as u32;
                let inside = x >= square_x
                    && x < square_x + SQUARE_SIZE
                    && y >= square_y
                    && y < square_y + SQUARE_SIZE;
                if inside {
                    px.copy_from_slice(&[255, 255, 255, 255]);
                } else {
                    let r = ((x + shift) * 255 / self.width.max(1)) as u8;
                    let g = (y * 255 / self.height.max(1)) as u8;
                    px.copy_from_slice(&[r, g, 96, 255]);
                }
            }
            // Garbage in the padding, so a stride bug shows up on screen
            padding.fill(0xA5);
        }
    }
}

impl CaptureSource for SyntheticCamera {
    fn next_frame(&mut self) -> Result<RawFrame<'_>, CaptureError> {
        if let Some(remaining) = self.remaining.as_mut() {
            if *remaining == 0 {
                return Err(CaptureError::Stopped);
            }
            *remaining -= 1;
        }

        self.pace();
        self.paint();
        self.frame_index += 1;

        Ok(RawFrame::new(&self.buffer, self.width, self.height, self.row_stride)?)
    }
}
