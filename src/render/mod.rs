//! The render thread: GPU state, the per-frame draw and the task queue that
//! feeds it.

pub mod geometry;
pub mod renderer;
pub mod tasks;
pub mod thread;

pub use geometry::QuadGeometry;
pub use renderer::{Renderer, RendererState, TextureCallback};
pub use tasks::{render_channel, RenderHandle, RenderLoop, RenderTask, RenderTasks};
pub use thread::{spawn, HostEvent, RenderThread, RendererHooks, SurfaceHost};
