use std::sync::Arc;

use bytes::Bytes;
use color_eyre::{eyre::eyre, Result};

use super::frame::{image_len, Frame, FrameMetadata, PixelFormat};

/// Convert a captured frame into something the texture can upload directly.
///
/// RGB24 and RGBA frames pass through untouched.
pub fn decode_frame(frame: &Frame) -> Result<Frame> {
    let (pixels, width, height) = match frame.meta.format {
        PixelFormat::Rgb24 | PixelFormat::Rgba32 | PixelFormat::External => {
            return Ok(frame.clone())
        }
        PixelFormat::Mjpeg => {
            let mut decoder = zune_jpeg::JpegDecoder::new(&frame.data[..]);
            let pixels = decoder.decode()?;
            let (width, height) = decoder
                .dimensions()
                .ok_or_else(|| eyre!("JPEG without dimensions"))?;
            (pixels, width as u32, height as u32)
        }
        PixelFormat::Yuyv4 => {
            let (width, height) = (frame.meta.width, frame.meta.height);
            (yuyv_to_rgb24(&frame.data, width, height)?, width, height)
        }
    };

    Ok(Frame {
        data: Bytes::from(pixels),
        meta: Arc::new(FrameMetadata {
            width,
            height,
            stride: width * 3,
            format: PixelFormat::Rgb24,
            ..(*frame.meta).clone()
        }),
        timestamp: frame.timestamp,
    })
}

/// Packed YUYV 4:2:2 (BT.601, limited range) to RGB24.
pub fn yuyv_to_rgb24(data: &[u8], width: u32, height: u32) -> Result<Vec<u8>> {
    if width % 2 != 0 {
        return Err(eyre!("YUYV width must be even, got {width}"));
    }
    let Some(pixels) = image_len(width, height, 1).filter(|p| p.checked_mul(3).is_some()) else {
        return Err(eyre!("YUYV frame {width}x{height} is too large"));
    };
    if data.len() < pixels * 2 {
        return Err(eyre!(
            "short YUYV buffer: {} bytes for {width}x{height}",
            data.len()
        ));
    }

    let mut rgb = Vec::with_capacity(pixels * 3);
    for chunk in data[..pixels * 2].chunks_exact(4) {
        let (y0, u, y1, v) = (chunk[0], chunk[1], chunk[2], chunk[3]);
        rgb.extend_from_slice(&yuv_to_rgb(y0, u, v));
        rgb.extend_from_slice(&yuv_to_rgb(y1, u, v));
    }
    Ok(rgb)
}

fn yuv_to_rgb(y: u8, u: u8, v: u8) -> [u8; 3] {
    let c = (y as i32 - 16).max(0) * 298;
    let d = u as i32 - 128;
    let e = v as i32 - 128;

    let clamp = |x: i32| ((x + 128) >> 8).clamp(0, 255) as u8;
    [
        clamp(c + 409 * e),
        clamp(c - 100 * d - 208 * e),
        clamp(c + 516 * d),
    ]
}
