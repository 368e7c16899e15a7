//! Newest-frame hand-off between the camera thread and the render thread

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use crossbeam::utils::CachePadded;

use crate::capture::Frame;

struct Shared {
    /// Newest frame not yet latched by the renderer
    slot: ArcSwapOption<Frame>,

    /// Set when the consumer is dropped
    closed: AtomicBool,

    /// Statistics
    stats: CachePadded<Stats>,
}

#[derive(Default)]
struct Stats {
    submitted: AtomicU64,
    latched: AtomicU64,
    skipped: AtomicU64,
    dropped: AtomicU64,
}

/// Counters for a frame surface
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SurfaceStats {
    pub submitted: u64,
    pub latched: u64,
    /// Taken but never applied (unsupported format, short buffer)
    pub skipped: u64,
    pub dropped: u64,
}

/// Camera side: pushes frames into the renderer's external texture.
///
/// Handed to the camera collaborator once the texture exists. Cheap to clone.
#[derive(Clone)]
pub struct FrameProducer {
    shared: Arc<Shared>,
}

/// Render side: latches the newest frame, if any.
pub struct FrameConsumer {
    shared: Arc<Shared>,
}

/// Create a connected producer/consumer pair.
pub fn frame_surface() -> (FrameProducer, FrameConsumer) {
    let shared = Arc::new(Shared {
        slot: ArcSwapOption::empty(),
        closed: AtomicBool::new(false),
        stats: CachePadded::new(Stats::default()),
    });
    (
        FrameProducer {
            shared: shared.clone(),
        },
        FrameConsumer { shared },
    )
}

impl FrameProducer {
    /// Publish a frame. An older frame the renderer never latched is dropped.
    pub fn submit(&self, frame: Frame) {
        let previous = self.shared.slot.swap(Some(Arc::new(frame)));
        self.shared.stats.submitted.fetch_add(1, Ordering::Relaxed);
        if previous.is_some() {
            self.shared.stats.dropped.fetch_add(1, Ordering::Relaxed);
            metrics::counter!("iris_frames_dropped").increment(1);
        }
    }

    /// `false` once the consumer (and with it the texture) is gone.
    pub fn is_connected(&self) -> bool {
        !self.shared.closed.load(Ordering::Acquire)
    }

    pub fn stats(&self) -> SurfaceStats {
        self.shared.stats()
    }
}

impl FrameConsumer {
    /// Take the newest pending frame. Never blocks.
    ///
    /// The caller reports the outcome with [`mark_latched`](Self::mark_latched)
    /// or [`mark_skipped`](Self::mark_skipped).
    pub fn take_latest(&self) -> Option<Arc<Frame>> {
        self.shared.slot.swap(None)
    }

    pub fn mark_latched(&self) {
        self.shared.stats.latched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn mark_skipped(&self) {
        self.shared.stats.skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn stats(&self) -> SurfaceStats {
        self.shared.stats()
    }
}

impl Drop for FrameConsumer {
    fn drop(&mut self) {
        self.shared.closed.store(true, Ordering::Release);
        self.shared.slot.store(None);
    }
}

impl Shared {
    fn stats(&self) -> SurfaceStats {
        SurfaceStats {
            submitted: self.stats.submitted.load(Ordering::Relaxed),
            latched: self.stats.latched.load(Ordering::Relaxed),
            skipped: self.stats.skipped.load(Ordering::Relaxed),
            dropped: self.stats.dropped.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn frame(sequence: u64) -> Frame {
        Frame::rgb24(sequence, 1, 1, Bytes::from_static(&[1, 2, 3]))
    }

    #[test]
    fn consumer_sees_only_the_newest_frame() {
        let (producer, consumer) = frame_surface();
        producer.submit(frame(1));
        producer.submit(frame(2));
        producer.submit(frame(3));

        let latest = consumer.take_latest().unwrap();
        assert_eq!(latest.sequence(), 3);
        assert!(consumer.take_latest().is_none());
        consumer.mark_latched();

        let stats = consumer.stats();
        assert_eq!(
            stats,
            SurfaceStats {
                submitted: 3,
                latched: 1,
                skipped: 0,
                dropped: 2
            }
        );
    }

    #[test]
    fn empty_surface_yields_nothing() {
        let (_producer, consumer) = frame_surface();
        assert!(consumer.take_latest().is_none());
        assert_eq!(consumer.stats().latched, 0);
    }

    #[test]
    fn taking_a_frame_does_not_count_it_as_latched() {
        let (producer, consumer) = frame_surface();
        producer.submit(frame(1));
        assert!(consumer.take_latest().is_some());
        consumer.mark_skipped();

        let stats = producer.stats();
        assert_eq!(stats.latched, 0);
        assert_eq!(stats.skipped, 1);
    }

    #[test]
    fn producer_notices_disconnect() {
        let (producer, consumer) = frame_surface();
        assert!(producer.is_connected());
        drop(consumer);
        assert!(!producer.is_connected());
    }

    #[test]
    fn frames_cross_threads() {
        let (producer, consumer) = frame_surface();
        let handle = std::thread::spawn(move || {
            for sequence in 1..=100 {
                producer.submit(frame(sequence));
            }
        });
        handle.join().unwrap();
        assert_eq!(consumer.take_latest().unwrap().sequence(), 100);
    }
}
