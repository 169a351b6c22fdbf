use crate::core::frame::{FrameBuffer, BYTES_PER_PIXEL};
use crate::core::mode::ProcessingMode;
use crate::traits::{FrameProcessor, ProcessError};

pub const DEFAULT_EDGE_THRESHOLD: u16 = 96;

/// Sobel edge detector
///
/// Raw mode passes frames through. Edges mode converts to luma, takes the
/// 3x3 Sobel gradient magnitude and writes white where it exceeds the
/// threshold, black elsewhere (borders included).
#[derive(Debug, Clone)]
pub struct EdgeDetector {
    threshold: u16,
    luma: Vec<u8>,
}

impl EdgeDetector {
    pub fn new(threshold: u16) -> Self {
        Self {
            threshold,
            luma: Vec::new(),
        }
    }

    pub fn threshold(&self) -> u16 {
        self.threshold
    }

    fn fill_luma(&mut self, frame: &FrameBuffer) {
        let (width, height) = frame.dimensions();
        self.luma.clear();
        self.luma.reserve(width as usize * height as usize);
        for row in frame.rows() {
            for px in row.chunks_exact(BYTES_PER_PIXEL) {
                // Rec. 601 weights in fixed point
                let l = (77 * px[0] as u32 + 150 * px[1] as u32 + 29 * px[2] as u32) >> 8;
                self.luma.push(l as u8);
            }
        }
    }

    fn detect(&mut self, frame: &FrameBuffer) -> Result<FrameBuffer, ProcessError> {
        let (width, height) = frame.dimensions();
        if width < 3 || height < 3 {
            return Err(ProcessError::new(format!(
                "frame {}x{} is too small for a 3x3 kernel",
                width, height
            )));
        }

        self.fill_luma(frame);

        let w = width as usize;
        let h = height as usize;
        let luma = &self.luma;
        let at = |x: usize, y: usize| luma[y * w + x] as i32;
        let threshold = self.threshold as i32;

        let mut out = vec![0u8; w * h * BYTES_PER_PIXEL];
        for px in out.chunks_exact_mut(BYTES_PER_PIXEL) {
            px[3] = 255;
        }

        for y in 1..h - 1 {
            for x in 1..w - 1 {
                let gx = at(x + 1, y - 1) + 2 * at(x + 1, y) + at(x + 1, y + 1)
                    - at(x - 1, y - 1)
                    - 2 * at(x - 1, y)
                    - at(x - 1, y + 1);
                let gy = at(x - 1, y + 1) + 2 * at(x, y + 1) + at(x + 1, y + 1)
                    - at(x - 1, y - 1)
                    - 2 * at(x, y - 1)
                    - at(x + 1, y - 1);

                // L1 magnitude, close enough for thresholding
                if gx.abs() + gy.abs() > threshold {
                    let i = (y * w + x) * BYTES_PER_PIXEL;
                    out[i..i + 3].fill(255);
                }
            }
        }

        FrameBuffer::packed(out, width, height).map_err(|e| ProcessError::new(e.to_string()))
    }
}

impl Default for EdgeDetector {
    fn default() -> Self {
        Self::new(DEFAULT_EDGE_THRESHOLD)
    }
}

impl FrameProcessor for EdgeDetector {
    fn process(
        &mut self,
        frame: &FrameBuffer,
        mode: ProcessingMode,
    ) -> Result<Option<FrameBuffer>, ProcessError> {
        match mode {
            ProcessingMode::Raw => Ok(None),
            ProcessingMode::Edges => self.detect(frame).map(Some),
        }
    }
}
