use bytes::Bytes;
use gl::types::GLenum;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::gpu::IDENTITY_MATRIX;

/// Texture-coordinate transform for sources that deliver rows top-down:
/// `v' = 1 - v`, column-major.
pub const FLIP_VERTICAL: [f32; 16] = [
    1.0, 0.0, 0.0, 0.0, //
    0.0, -1.0, 0.0, 0.0, //
    0.0, 0.0, 1.0, 0.0, //
    0.0, 1.0, 0.0, 1.0,
];

/// Frame data with zero-copy semantics
#[derive(Clone)]
pub struct Frame {
    /// Immutable frame data - can be shared across threads without copying
    pub data: Bytes,

    /// Frame metadata
    pub meta: Arc<FrameMetadata>,

    /// Capture timestamp for latency tracking
    pub timestamp: Instant,
}

/// Frame metadata
#[derive(Debug, Clone)]
pub struct FrameMetadata {
    pub sequence: u64,
    pub width: u32,
    pub height: u32,
    pub stride: u32,
    pub format: PixelFormat,
    /// How texture coordinates must be remapped to show this frame upright
    pub transform: [f32; 16],
    pub device_timestamp: Option<Duration>, // Hardware timestamp if available
}

/// Pixel formats we support
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelFormat {
    Rgb24,
    Rgba32,
    Yuyv4,
    Mjpeg,
    /// The producer wrote straight into the GPU image; `data` is empty
    External,
}

impl PixelFormat {
    /// Upload format for formats the GPU can take as-is.
    pub fn gl_format(self) -> Option<GLenum> {
        match self {
            PixelFormat::Rgb24 => Some(gl::RGB),
            PixelFormat::Rgba32 => Some(gl::RGBA),
            _ => None,
        }
    }

    pub fn bytes_per_pixel(self) -> Option<u32> {
        match self {
            PixelFormat::Rgb24 => Some(3),
            PixelFormat::Rgba32 => Some(4),
            PixelFormat::Yuyv4 => Some(2),
            PixelFormat::Mjpeg | PixelFormat::External => None,
        }
    }
}

impl Frame {
    /// Tightly packed RGB24 frame in top-down row order.
    pub fn rgb24(sequence: u64, width: u32, height: u32, data: Bytes) -> Self {
        Self {
            data,
            meta: Arc::new(FrameMetadata {
                sequence,
                width,
                height,
                stride: width * 3,
                format: PixelFormat::Rgb24,
                transform: FLIP_VERTICAL,
                device_timestamp: None,
            }),
            timestamp: Instant::now(),
        }
    }

    /// A frame the platform already placed in the external image.
    pub fn external(sequence: u64, width: u32, height: u32, transform: [f32; 16]) -> Self {
        Self {
            data: Bytes::new(),
            meta: Arc::new(FrameMetadata {
                sequence,
                width,
                height,
                stride: 0,
                format: PixelFormat::External,
                transform,
                device_timestamp: None,
            }),
            timestamp: Instant::now(),
        }
    }

    pub fn sequence(&self) -> u64 {
        self.meta.sequence
    }

    /// `true` when the pixels are in `data` and must be uploaded.
    pub fn has_pixels(&self) -> bool {
        self.meta.format != PixelFormat::External
    }

    /// Whether `data` holds a full image for the declared size.
    ///
    /// A size whose byte count overflows can never be complete.
    pub fn is_complete(&self) -> bool {
        match self.meta.format.bytes_per_pixel() {
            Some(bpp) => image_len(self.meta.width, self.meta.height, bpp)
                .is_some_and(|len| self.data.len() >= len),
            None => !self.data.is_empty() || self.meta.format == PixelFormat::External,
        }
    }
}

/// Bytes in a `width` x `height` image of `bpp` bytes per pixel, `None` on
/// overflow.
pub fn image_len(width: u32, height: u32, bpp: u32) -> Option<usize> {
    (width as usize)
        .checked_mul(height as usize)?
        .checked_mul(bpp as usize)
}

impl Default for FrameMetadata {
    fn default() -> Self {
        Self {
            sequence: 0,
            width: 0,
            height: 0,
            stride: 0,
            format: PixelFormat::Rgb24,
            transform: IDENTITY_MATRIX,
            device_timestamp: None,
        }
    }
}
