pub mod sdl;

pub use sdl::SdlSurfaceHost;
