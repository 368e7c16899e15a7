//! Camera side of the preview: frame types, the hand-off into the renderer's
//! texture and the sources that fill it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use color_eyre::Result;
use tracing::{error, info, warn};

pub mod decoder;
pub mod frame;
pub mod pattern;
pub mod surface;
#[cfg(feature = "v4l2-camera")]
pub mod v4l2;

pub use frame::{Frame, FrameMetadata, PixelFormat, FLIP_VERTICAL};
pub use pattern::TestPattern;
pub use surface::{frame_surface, FrameConsumer, FrameProducer, SurfaceStats};
#[cfg(feature = "v4l2-camera")]
pub use v4l2::V4l2Camera;

const RETRY_DELAY: Duration = Duration::from_millis(10);

/// Something that produces camera frames, one at a time.
///
/// `next_frame` may block until a frame is ready; it is only ever called from
/// the camera pump thread.
pub trait CameraSource: Send {
    fn start(&mut self) -> Result<()>;
    fn next_frame(&mut self) -> Result<Frame>;
    fn stop(&mut self) -> Result<()>;
}

impl<S: CameraSource + ?Sized> CameraSource for Box<S> {
    fn start(&mut self) -> Result<()> {
        (**self).start()
    }

    fn next_frame(&mut self) -> Result<Frame> {
        (**self).next_frame()
    }

    fn stop(&mut self) -> Result<()> {
        (**self).stop()
    }
}

/// Pump frames from `source` into `producer` until `stop` is set or the
/// renderer drops its end of the surface.
///
/// The source is started on entry and stopped on exit, so it can be pumped
/// again into the producer of a recreated texture. Capture errors are logged and retried; a bad frame never ends the pump.
pub fn run_camera<S: CameraSource + ?Sized>(
    source: &mut S,
    producer: FrameProducer,
    stop: Arc<AtomicBool>,
) -> Result<()> {
    source.start()?;
    info!("camera streaming");

    while !stop.load(Ordering::Relaxed) {
        if !producer.is_connected() {
            info!("texture released, stopping camera");
            break;
        }
        match source.next_frame() {
            Ok(frame) => producer.submit(frame),
            Err(e) => {
                warn!("Capture error: {e}");
                std::thread::sleep(RETRY_DELAY);
            }
        }
    }

    if let Err(e) = source.stop() {
        error!("Failed to stop camera: {e}");
    }
    let stats = producer.stats();
    info!(
        submitted = stats.submitted,
        latched = stats.latched,
        skipped = stats.skipped,
        dropped = stats.dropped,
        "camera stopped"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use color_eyre::eyre::eyre;

    struct Scripted {
        frames: Vec<Result<Frame>>,
        stopped: Arc<AtomicBool>,
        stop_after_script: Arc<AtomicBool>,
    }

    impl CameraSource for Scripted {
        fn start(&mut self) -> Result<()> {
            Ok(())
        }

        fn next_frame(&mut self) -> Result<Frame> {
            if self.frames.is_empty() {
                self.stop_after_script.store(true, Ordering::Relaxed);
                return Err(eyre!("script exhausted"));
            }
            self.frames.remove(0)
        }

        fn stop(&mut self) -> Result<()> {
            self.stopped.store(true, Ordering::Relaxed);
            Ok(())
        }
    }

    fn frame(sequence: u64) -> Frame {
        Frame::rgb24(sequence, 1, 1, Bytes::from_static(&[0, 0, 0]))
    }

    #[test]
    fn pump_survives_errors_and_delivers_the_newest_frame() {
        let (producer, consumer) = frame_surface();
        let stop = Arc::new(AtomicBool::new(false));
        let stopped = Arc::new(AtomicBool::new(false));
        let mut source = Scripted {
            frames: vec![Ok(frame(1)), Err(eyre!("EAGAIN")), Ok(frame(2))],
            stopped: stopped.clone(),
            stop_after_script: stop.clone(),
        };

        run_camera(&mut source, producer, stop).unwrap();

        assert!(stopped.load(Ordering::Relaxed));
        assert_eq!(consumer.take_latest().unwrap().sequence(), 2);
        assert_eq!(consumer.stats().submitted, 2);
    }

    #[test]
    fn pump_exits_when_the_texture_is_gone() {
        let (producer, consumer) = frame_surface();
        drop(consumer);
        let stopped = Arc::new(AtomicBool::new(false));
        let mut source = Scripted {
            frames: vec![Ok(frame(1))],
            stopped: stopped.clone(),
            stop_after_script: Arc::new(AtomicBool::new(false)),
        };

        run_camera(&mut source, producer.clone(), Arc::new(AtomicBool::new(false))).unwrap();
        assert!(stopped.load(Ordering::Relaxed));
        assert_eq!(producer.stats().submitted, 0);
    }
}
