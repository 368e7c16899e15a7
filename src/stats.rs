//! Frame render timing: a running aggregate written on the render thread and
//! read as whole snapshots from anywhere.

use std::sync::Arc;

use arc_swap::ArcSwap;

/// Running statistics over frame render times, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameMetrics {
    pub last_frame_time_ms: f32,
    pub average_ms: f32,
    /// `f32::INFINITY` until the first frame
    pub min_ms: f32,
    pub max_ms: f32,
    pub frame_count: u64,
    pub total_time_ms: f64,
}

impl Default for FrameMetrics {
    fn default() -> Self {
        Self {
            last_frame_time_ms: 0.0,
            average_ms: 0.0,
            min_ms: f32::INFINITY,
            max_ms: 0.0,
            frame_count: 0,
            total_time_ms: 0.0,
        }
    }
}

impl FrameMetrics {
    pub fn record(&mut self, frame_time_ms: f32) {
        self.last_frame_time_ms = frame_time_ms;
        self.frame_count += 1;
        self.total_time_ms += f64::from(frame_time_ms);
        if frame_time_ms < self.min_ms {
            self.min_ms = frame_time_ms;
        }
        if frame_time_ms > self.max_ms {
            self.max_ms = frame_time_ms;
        }
        let average = (self.total_time_ms / self.frame_count as f64) as f32;
        // Rounding in the sum must not push the mean outside the observed range.
        self.average_ms = average.clamp(self.min_ms, self.max_ms);
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn is_empty(&self) -> bool {
        self.frame_count == 0
    }
}

/// Frames per second for a frame time, 0 for non-positive times.
pub fn ms_to_fps(ms: f32) -> f32 {
    if ms > 0.0 {
        1000.0 / ms
    } else {
        0.0
    }
}

/// Receives render timing from the render thread.
pub trait FrameObserver: Send {
    /// Called once per completed frame.
    fn on_frame_rendered(&mut self, frame_time_ms: f32);

    fn reset(&mut self);
}

/// Render-thread half: aggregates and publishes a copy after each update.
pub struct MetricsRecorder {
    metrics: FrameMetrics,
    published: Arc<ArcSwap<FrameMetrics>>,
}

/// Reader half, cheap to clone.
#[derive(Clone)]
pub struct MetricsReader {
    published: Arc<ArcSwap<FrameMetrics>>,
}

pub fn metrics_channel() -> (MetricsRecorder, MetricsReader) {
    let published = Arc::new(ArcSwap::from_pointee(FrameMetrics::default()));
    (
        MetricsRecorder {
            metrics: FrameMetrics::default(),
            published: published.clone(),
        },
        MetricsReader { published },
    )
}

impl MetricsRecorder {
    pub fn current(&self) -> &FrameMetrics {
        &self.metrics
    }

    fn publish(&self) {
        self.published.store(Arc::new(self.metrics));
    }
}

impl FrameObserver for MetricsRecorder {
    fn on_frame_rendered(&mut self, frame_time_ms: f32) {
        self.metrics.record(frame_time_ms);
        metrics::histogram!("iris_frame_render_time_ms").record(f64::from(frame_time_ms));
        self.publish();
    }

    fn reset(&mut self) {
        self.metrics.reset();
        self.publish();
    }
}

impl MetricsReader {
    /// The latest complete record.
    pub fn snapshot(&self) -> FrameMetrics {
        **self.published.load()
    }
}
