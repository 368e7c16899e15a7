//! V4L2 camera source with memory-mapped buffers

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use color_eyre::{eyre::eyre, Result};
use tracing::{info, instrument};
use v4l::buffer::Type;
use v4l::capability::Flags as CapFlags;
use v4l::io::traits::CaptureStream;
use v4l::prelude::MmapStream;
use v4l::video::Capture;
use v4l::{Device, FourCC};

use super::decoder::decode_frame;
use super::frame::{Frame, FrameMetadata, PixelFormat, FLIP_VERTICAL};
use super::CameraSource;
use crate::CaptureConfig;

pub struct V4l2Camera {
    device: Box<Device>,
    stream: Option<MmapStream<'static>>,
    config: CaptureConfig,
    width: u32,
    height: u32,
    format: PixelFormat,
    sequence: u64,
}

impl V4l2Camera {
    /// Open the configured device, or the first usable one when the path is empty.
    pub fn open(config: CaptureConfig) -> Result<Self> {
        let (path, format) = if config.device.is_empty() {
            auto_detect_device()?
        } else {
            (config.device.clone(), config.format)
        };
        info!("Initializing V4L2 capture: {path}");

        let device = Device::with_path(&path)?;

        let caps = device.query_caps()?;
        info!("Device: {} ({})", caps.card, caps.driver);

        if !caps.capabilities.contains(CapFlags::VIDEO_CAPTURE) {
            return Err(eyre!("Device doesn't support video capture"));
        }

        let mut fmt = device.format()?;
        fmt.width = config.width;
        fmt.height = config.height;
        fmt.fourcc = fourcc(format)?;
        // The driver may pick the closest size it supports.
        let fmt = device.set_format(&fmt)?;
        if fmt.fourcc != fourcc(format)? {
            return Err(eyre!("Device refused {format:?}, offered {}", fmt.fourcc));
        }
        info!(width = fmt.width, height = fmt.height, ?format, "capture format");

        Ok(Self {
            device: Box::new(device),
            stream: None,
            width: fmt.width,
            height: fmt.height,
            format,
            config,
            sequence: 0,
        })
    }
}

impl CameraSource for V4l2Camera {
    fn start(&mut self) -> Result<()> {
        let stream =
            MmapStream::with_buffers(&self.device, Type::VideoCapture, self.config.buffer_count)?;

        self.stream = Some(stream);
        info!(
            "Capture stream started with {} buffers",
            self.config.buffer_count
        );
        Ok(())
    }

    #[instrument(skip(self))]
    fn next_frame(&mut self) -> Result<Frame> {
        let timestamp = Instant::now();

        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| eyre!("Stream not started"))?;

        let (buf, meta) = stream.next()?;
        let used = (meta.bytesused as usize).min(buf.len());
        let data = Bytes::copy_from_slice(&buf[..used]);

        self.sequence += 1;

        let raw = Frame {
            data,
            meta: Arc::new(FrameMetadata {
                sequence: self.sequence,
                width: self.width,
                height: self.height,
                stride: self.width * self.format.bytes_per_pixel().unwrap_or(0),
                format: self.format,
                transform: FLIP_VERTICAL,
                device_timestamp: Some(
                    Duration::from_secs(meta.timestamp.sec as u64)
                        + Duration::from_micros(meta.timestamp.usec as u64),
                ),
            }),
            timestamp,
        };
        decode_frame(&raw)
    }

    fn stop(&mut self) -> Result<()> {
        // Dropping the stream turns streaming off and unmaps the buffers.
        self.stream = None;
        Ok(())
    }
}

fn fourcc(format: PixelFormat) -> Result<FourCC> {
    match format {
        PixelFormat::Mjpeg => Ok(FourCC::new(b"MJPG")),
        PixelFormat::Yuyv4 => Ok(FourCC::new(b"YUYV")),
        other => Err(eyre!("Unsupported pixel format {other:?}")),
    }
}

/// First capture device offering MJPEG or YUYV, probing `/dev/video0..9`.
pub fn auto_detect_device() -> Result<(String, PixelFormat)> {
    info!("Auto-detecting capture devices...");

    for i in 0..10 {
        let path = format!("/dev/video{i}");
        if !Path::new(&path).exists() {
            continue;
        }

        let Ok(dev) = Device::with_path(&path) else {
            continue;
        };
        let Ok(caps) = dev.query_caps() else {
            continue;
        };
        if !caps.capabilities.contains(CapFlags::VIDEO_CAPTURE) {
            continue;
        }
        for fmt in dev.enum_formats().unwrap_or_default() {
            if fmt.fourcc == FourCC::new(b"MJPG") {
                info!("Found MJPEG device: {} - {}", path, caps.card);
                return Ok((path, PixelFormat::Mjpeg));
            } else if fmt.fourcc == FourCC::new(b"YUYV") {
                info!("Found YUYV device: {} - {}", path, caps.card);
                return Ok((path, PixelFormat::Yuyv4));
            }
        }
    }

    Err(eyre!("No suitable capture device found"))
}
