//! The dedicated render thread.
//!
//! GL contexts are bound to the thread that made them current, so the host
//! window and the GL loader are both built inside the thread by the closure
//! passed to [`spawn`]. Everything else talks to the thread through its
//! [`RenderHandle`].

use std::thread::JoinHandle;

use color_eyre::{eyre::eyre, Result};
use tracing::{debug, info, warn};

use super::renderer::{Renderer, TextureCallback};
use super::tasks::{render_channel, RenderHandle, RenderLoop};
use crate::gpu::GlApi;
use crate::stats::FrameObserver;
use crate::ui::UiCommand;
use crate::RenderConfig;

/// Something that happened to the window since the last poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostEvent {
    Resized(u32, u32),
    CloseRequested,
    Input(UiCommand),
}

/// The window and context the renderer draws into.
pub trait SurfaceHost {
    fn drawable_size(&self) -> (u32, u32);

    /// Drain pending window events. Never blocks.
    fn poll_events(&mut self) -> Vec<HostEvent>;

    /// Show the frame just drawn; may wait for vsync.
    fn present(&mut self) -> Result<()>;
}

pub type InputCallback = Box<dyn FnMut(UiCommand) + Send>;

/// Callbacks the renderer reports through, moved onto the render thread.
pub struct RendererHooks {
    pub observer: Box<dyn FrameObserver>,
    pub on_texture_available: Option<TextureCallback>,
    /// Input the window received, forwarded to the UI
    pub on_input: Option<InputCallback>,
}

pub struct RenderThread {
    handle: RenderHandle,
    join: JoinHandle<Result<()>>,
}

impl RenderThread {
    pub fn handle(&self) -> RenderHandle {
        self.handle.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Queue the release behind outstanding tasks and wait for the thread.
    pub fn shutdown(self) -> Result<()> {
        self.handle.shutdown();
        self.join()
    }

    pub fn join(self) -> Result<()> {
        self.join
            .join()
            .map_err(|_| eyre!("render thread panicked"))?
    }
}

/// Start the render thread.
///
/// `make_host` runs on the new thread and returns the window plus the GL
/// entry points for its context.
pub fn spawn<G, H, F>(config: RenderConfig, hooks: RendererHooks, make_host: F) -> Result<RenderThread>
where
    G: GlApi + 'static,
    H: SurfaceHost + 'static,
    F: FnOnce() -> Result<(H, G)> + Send + 'static,
{
    let (handle, tasks) = render_channel();

    let join = std::thread::Builder::new()
        .name("iris-render".into())
        .spawn(move || {
            if let Some(core) = config.pin_core {
                pin_to_core(core);
            }

            let (mut host, gl) = make_host()?;
            let RendererHooks {
                observer,
                on_texture_available,
                mut on_input,
            } = hooks;

            let mut renderer = Renderer::new(gl, &config, observer);
            if let Some(callback) = on_texture_available {
                renderer.set_on_texture_available(callback);
            }
            let mut render_loop = RenderLoop::new(renderer, tasks);
            drive(&mut host, &mut render_loop, &mut on_input)
        })?;

    Ok(RenderThread { handle, join })
}

/// Run the surface lifecycle until the host closes or a release is queued.
pub fn drive<G: GlApi, H: SurfaceHost>(
    host: &mut H,
    render_loop: &mut RenderLoop<G>,
    on_input: &mut Option<InputCallback>,
) -> Result<()> {
    render_loop.renderer_mut().on_surface_created()?;
    let (width, height) = host.drawable_size();
    render_loop.renderer_mut().on_surface_resized(width, height);
    info!(width, height, "render loop started");

    loop {
        for event in host.poll_events() {
            match event {
                HostEvent::Resized(width, height) => {
                    render_loop.renderer_mut().on_surface_resized(width, height)
                }
                HostEvent::CloseRequested => {
                    info!("surface closing");
                    render_loop.finish();
                    return Ok(());
                }
                HostEvent::Input(command) => match on_input.as_mut() {
                    Some(callback) => callback(command),
                    None => debug!(?command, "input ignored"),
                },
            }
        }

        if !render_loop.run_pending() {
            info!("render loop released");
            return Ok(());
        }

        render_loop.draw_frame();
        if let Err(e) = host.present() {
            warn!("present failed: {e}");
        }
    }
}

fn pin_to_core(core: usize) {
    let Some(ids) = core_affinity::get_core_ids() else {
        warn!(core, "cannot query CPU cores, render thread not pinned");
        return;
    };
    match ids.into_iter().find(|id| id.id == core) {
        Some(id) if core_affinity::set_for_current(id) => info!(core, "render thread pinned"),
        _ => warn!(core, "failed to pin render thread"),
    }
}
