use thiserror::Error;

/// Bytes per RGBA8 pixel
pub const BYTES_PER_PIXEL: usize = 4;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    #[error("frame dimensions must be non-zero, got {width}x{height}")]
    ZeroDimensions { width: u32, height: u32 },

    #[error("row stride {row_stride} is narrower than {width} RGBA pixels")]
    StrideTooNarrow { width: u32, row_stride: u32 },

    #[error("pixel buffer holds {actual} bytes, need at least {required}")]
    BufferTooShort { required: usize, actual: usize },
}

/// Validate frame geometry against a buffer length
fn check_layout(width: u32, height: u32, row_stride: u32, len: usize) -> Result<(), FrameError> {
    if width == 0 || height == 0 {
        return Err(FrameError::ZeroDimensions { width, height });
    }
    if (row_stride as usize) < width as usize * BYTES_PER_PIXEL {
        return Err(FrameError::StrideTooNarrow { width, row_stride });
    }
    let required = row_stride as usize * height as usize;
    if len < required {
        return Err(FrameError::BufferTooShort { required, actual: len });
    }
    Ok(())
}

/// Borrowed view of a captured frame
///
/// The bytes belong to the capture source and are only valid for the duration
/// of the call that handed them out. Only `new` builds one, so the layout is
/// always valid by the time the capture thread copies it.
#[derive(Debug, Clone, Copy)]
pub struct RawFrame<'a> {
    pixels: &'a [u8],
    width: u32,
    height: u32,
    row_stride: u32,
}

impl<'a> RawFrame<'a> {
    pub fn new(pixels: &'a [u8], width: u32, height: u32, row_stride: u32) -> Result<Self, FrameError> {
        check_layout(width, height, row_stride, pixels.len())?;
        Ok(Self { pixels, width, height, row_stride })
    }

    pub fn pixels(&self) -> &'a [u8] {
        self.pixels
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn row_stride(&self) -> u32 {
        self.row_stride
    }

    pub fn is_tightly_packed(&self) -> bool {
        self.row_stride as usize == self.width as usize * BYTES_PER_PIXEL
    }

    /// Copy into an owned buffer, dropping any per-row padding
    pub fn to_packed(&self) -> FrameBuffer {
        let row_bytes = self.width as usize * BYTES_PER_PIXEL;
        let stride = self.row_stride as usize;
        let height = self.height as usize;

        let pixels = if self.is_tightly_packed() {
            self.pixels[..row_bytes * height].to_vec()
        } else {
            let mut packed = Vec::with_capacity(row_bytes * height);
            for row in self.pixels.chunks(stride).take(height) {
                packed.extend_from_slice(&row[..row_bytes]);
            }
            packed
        };

        FrameBuffer {
            pixels,
            width: self.width,
            height: self.height,
            row_stride: row_bytes as u32,
        }
    }
}

/// Owned RGBA8 pixel buffer plus layout metadata
///
/// Immutable once built: the only way to change pixels is to produce a new
/// buffer, so ownership can move between threads without aliasing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameBuffer {
    pixels: Vec<u8>,
    width: u32,
    height: u32,
    row_stride: u32,
}

impl FrameBuffer {
    /// Build a buffer with an explicit row stride
    pub fn new(pixels: Vec<u8>, width: u32, height: u32, row_stride: u32) -> Result<Self, FrameError> {
        check_layout(width, height, row_stride, pixels.len())?;
        Ok(Self { pixels, width, height, row_stride })
    }

    /// Build a tightly-packed buffer (`row_stride == width * 4`)
    pub fn packed(pixels: Vec<u8>, width: u32, height: u32) -> Result<Self, FrameError> {
        Self::new(pixels, width, height, width.saturating_mul(BYTES_PER_PIXEL as u32))
    }

    /// Tightly-packed buffer filled with one RGBA colour
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Result<Self, FrameError> {
        let pixels = rgba
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * BYTES_PER_PIXEL)
            .collect();
        Self::packed(pixels, width, height)
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn into_pixels(self) -> Vec<u8> {
        self.pixels
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn row_stride(&self) -> u32 {
        self.row_stride
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn is_tightly_packed(&self) -> bool {
        self.row_stride as usize == self.width as usize * BYTES_PER_PIXEL
    }

    pub fn as_raw(&self) -> RawFrame<'_> {
        RawFrame {
            pixels: &self.pixels,
            width: self.width,
            height: self.height,
            row_stride: self.row_stride,
        }
    }

    /// Repack padded rows; a packed buffer is returned as-is
    pub fn into_packed(self) -> FrameBuffer {
        if self.is_tightly_packed() {
            self
        } else {
            self.as_raw().to_packed()
        }
    }

    /// One row of pixels without padding, or `None` past the last row
    pub fn row(&self, y: u32) -> Option<&[u8]> {
        if y >= self.height {
            return None;
        }
        let start = y as usize * self.row_stride as usize;
        self.pixels.get(start..start + self.width as usize * BYTES_PER_PIXEL)
    }

    /// Rows top to bottom, padding stripped
    pub fn rows(&self) -> impl Iterator<Item = &[u8]> {
        let row_bytes = self.width as usize * BYTES_PER_PIXEL;
        self.pixels
            .chunks(self.row_stride as usize)
            .take(self.height as usize)
            .map(move |row| &row[..row_bytes])
    }
}
