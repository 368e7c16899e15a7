//! Marshalling UI requests onto the render thread.
//!
//! The UI never touches GPU state. It enqueues [`RenderTask`]s through a
//! [`RenderHandle`]; the render thread drains them between frames, so each
//! task runs entirely before or after any draw.

use std::sync::Arc;

use crossbeam::atomic::AtomicCell;
use flume::{Receiver, Sender, TryRecvError};
use tracing::{debug, warn};

use super::renderer::Renderer;
use crate::filter::FilterKind;
use crate::gpu::GlApi;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderTask {
    SetFilter(FilterKind),
    ResetMetrics,
    /// Release all GPU objects. Tasks queued after it are dropped.
    Release,
}

/// UI side of the queue. Sending never blocks.
#[derive(Clone)]
pub struct RenderHandle {
    tx: Sender<RenderTask>,
    active: Arc<AtomicCell<Option<FilterKind>>>,
}

impl RenderHandle {
    /// Returns `false` once the render thread is gone.
    pub fn send(&self, task: RenderTask) -> bool {
        self.tx.send(task).is_ok()
    }

    pub fn select_filter(&self, kind: FilterKind) -> bool {
        self.send(RenderTask::SetFilter(kind))
    }

    pub fn reset_metrics(&self) -> bool {
        self.send(RenderTask::ResetMetrics)
    }

    /// Filter the render thread last drew with; differs from the last
    /// selection after a fallback to Normal.
    pub fn active_filter(&self) -> Option<FilterKind> {
        self.active.load()
    }

    /// Queue the final release behind everything already queued.
    pub fn shutdown(&self) -> bool {
        self.send(RenderTask::Release)
    }
}

/// Receiving end of the queue, moved onto the render thread.
pub struct RenderTasks {
    rx: Receiver<RenderTask>,
    active: Arc<AtomicCell<Option<FilterKind>>>,
}

pub fn render_channel() -> (RenderHandle, RenderTasks) {
    let (tx, rx) = flume::unbounded();
    let active = Arc::new(AtomicCell::new(None));
    (
        RenderHandle {
            tx,
            active: active.clone(),
        },
        RenderTasks { rx, active },
    )
}

/// Render-thread side: owns the renderer and applies queued tasks.
pub struct RenderLoop<G: GlApi> {
    renderer: Renderer<G>,
    rx: Receiver<RenderTask>,
    active: Arc<AtomicCell<Option<FilterKind>>>,
    released: bool,
}

impl<G: GlApi> RenderLoop<G> {
    pub fn new(renderer: Renderer<G>, tasks: RenderTasks) -> Self {
        let render_loop = Self {
            renderer,
            rx: tasks.rx,
            active: tasks.active,
            released: false,
        };
        render_loop.publish_active();
        render_loop
    }

    pub fn renderer(&self) -> &Renderer<G> {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut Renderer<G> {
        &mut self.renderer
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Apply every queued task in FIFO order.
    ///
    /// Returns `false` once `Release` has run; the loop must stop drawing.
    pub fn run_pending(&mut self) -> bool {
        while !self.released {
            let task = match self.rx.try_recv() {
                Ok(task) => task,
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            };
            self.apply(task);
        }
        self.publish_active();
        !self.released
    }

    fn publish_active(&self) {
        self.active.store(self.renderer.active_filter());
    }

    fn apply(&mut self, task: RenderTask) {
        debug!(?task, "render task");
        match task {
            RenderTask::SetFilter(kind) => match self.renderer.set_filter(kind) {
                Ok(active) if active != kind => {
                    warn!(requested = %kind, active = %active, "filter swap fell back")
                }
                Ok(_) => {}
                Err(err) => warn!("filter swap failed: {err}"),
            },
            RenderTask::ResetMetrics => self.renderer.reset_metrics(),
            RenderTask::Release => {
                self.renderer.release();
                self.released = true;
                let dropped = self.rx.drain().count();
                if dropped > 0 {
                    debug!(dropped, "tasks after release dropped");
                }
            }
        }
    }

    /// Drain outstanding tasks, then release. Used when the host goes away.
    pub fn finish(&mut self) {
        self.run_pending();
        if !self.released {
            self.apply(RenderTask::Release);
        }
        self.publish_active();
    }

    pub fn draw_frame(&mut self) {
        if !self.released {
            self.renderer.on_draw_frame();
        }
    }
}
