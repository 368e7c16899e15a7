//! Synthetic camera: scrolling colour bars, paced to a fixed frame rate.

use std::time::{Duration, Instant};

use bytes::Bytes;
use color_eyre::{eyre::eyre, Result};
use tracing::info;

use super::{CameraSource, Frame};

const BARS: [[u8; 3]; 8] = [
    [255, 255, 255],
    [255, 255, 0],
    [0, 255, 255],
    [0, 255, 0],
    [255, 0, 255],
    [255, 0, 0],
    [0, 0, 255],
    [0, 0, 0],
];

pub struct TestPattern {
    width: u32,
    height: u32,
    interval: Duration,
    sequence: u64,
    next_due: Option<Instant>,
}

impl TestPattern {
    pub fn new(width: u32, height: u32, fps: u32) -> Self {
        Self {
            width,
            height,
            interval: Duration::from_secs(1) / fps.max(1),
            sequence: 0,
            next_due: None,
        }
    }

    /// Render frame `sequence` without pacing.
    pub fn render(&self, sequence: u64) -> Frame {
        let (width, height) = (self.width as usize, self.height as usize);
        let bar_width = (width / BARS.len()).max(1);
        let shift = (sequence as usize * 4) % width.max(1);

        let mut row = Vec::with_capacity(width * 3);
        for x in 0..width {
            let bar = ((x + shift) / bar_width) % BARS.len();
            row.extend_from_slice(&BARS[bar]);
        }
        let mut data = Vec::with_capacity(row.len() * height);
        for _ in 0..height {
            data.extend_from_slice(&row);
        }

        Frame::rgb24(sequence, self.width, self.height, Bytes::from(data))
    }
}

impl CameraSource for TestPattern {
    fn start(&mut self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(eyre!("test pattern needs a non-empty size"));
        }
        info!(width = self.width, height = self.height, "test pattern started");
        self.next_due = Some(Instant::now());
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Frame> {
        let due = self.next_due.ok_or_else(|| eyre!("Stream not started"))?;
        let now = Instant::now();
        if due > now {
            std::thread::sleep(due - now);
        }
        // Late frames are not made up for.
        self.next_due = Some(due.max(now) + self.interval);

        self.sequence += 1;
        Ok(self.render(self.sequence))
    }

    fn stop(&mut self) -> Result<()> {
        self.next_due = None;
        Ok(())
    }
}
