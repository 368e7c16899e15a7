//! SDL2 window with an OpenGL context, hosting the render thread's surface.

use std::ffi::c_void;

use color_eyre::{eyre::eyre, Result};
use sdl2::event::{Event, WindowEvent};
use sdl2::video::{GLContext, GLProfile, SwapInterval, Window};
use sdl2::{EventPump, Sdl, VideoSubsystem};
use tracing::{info, warn};

use crate::gpu::RawGl;
use crate::render::{HostEvent, SurfaceHost};
use crate::ui::UiCommand;
use crate::DisplayConfig;

/// SDL2 window owning the GL context the renderer draws with.
///
/// Must be created on the render thread: the context is made current on the
/// creating thread.
pub struct SdlSurfaceHost {
    _context: GLContext,
    window: Window,
    event_pump: EventPump,
    _video: VideoSubsystem,
    _sdl: Sdl,
}

impl SdlSurfaceHost {
    /// Open the window, create a GL 2.1 context and load its entry points.
    pub fn open(config: &DisplayConfig) -> Result<(Self, RawGl)> {
        let sdl = sdl2::init().map_err(|e| eyre!(e))?;
        let video = sdl.video().map_err(|e| eyre!(e))?;

        let gl_attr = video.gl_attr();
        gl_attr.set_context_profile(GLProfile::Compatibility);
        gl_attr.set_context_version(2, 1);
        gl_attr.set_double_buffer(true);

        let window = video
            .window(&config.title, config.width, config.height)
            .opengl()
            .resizable()
            .position_centered()
            .build()?;

        let context = window.gl_create_context().map_err(|e| eyre!(e))?;
        window.gl_make_current(&context).map_err(|e| eyre!(e))?;

        let interval = if config.vsync {
            SwapInterval::VSync
        } else {
            SwapInterval::Immediate
        };
        if let Err(e) = video.gl_set_swap_interval(interval) {
            warn!("Failed to set swap interval: {e}");
        }

        let gl = RawGl::load_with(|name| video.gl_get_proc_address(name) as *const c_void);
        info!(
            width = config.width,
            height = config.height,
            vsync = config.vsync,
            "GL window ready"
        );

        let event_pump = sdl.event_pump().map_err(|e| eyre!(e))?;
        Ok((
            Self {
                _context: context,
                window,
                event_pump,
                _video: video,
                _sdl: sdl,
            },
            gl,
        ))
    }
}

impl SurfaceHost for SdlSurfaceHost {
    fn drawable_size(&self) -> (u32, u32) {
        self.window.drawable_size()
    }

    fn poll_events(&mut self) -> Vec<HostEvent> {
        let mut events = Vec::new();
        for event in self.event_pump.poll_iter() {
            match event {
                Event::Quit { .. } => {
                    info!("Quit event received");
                    events.push(HostEvent::CloseRequested);
                }
                Event::Window {
                    win_event: WindowEvent::SizeChanged(..),
                    ..
                } => {
                    let (width, height) = self.window.drawable_size();
                    events.push(HostEvent::Resized(width, height));
                }
                Event::KeyDown {
                    keycode: Some(key),
                    repeat: false,
                    ..
                } => {
                    if let Some(command) = UiCommand::from_key(&key.name()) {
                        events.push(HostEvent::Input(command));
                    }
                }
                _ => {}
            }
        }
        events
    }

    fn present(&mut self) -> Result<()> {
        self.window.gl_swap_window();
        Ok(())
    }
}
