//! The render-thread state machine: surface setup, per-frame drawing and
//! filter swaps.

use std::time::Instant;

use tracing::{debug, error, info, instrument, trace, warn};

use crate::capture::{frame_surface, FrameProducer};
use crate::error::{GlError, RenderError, RenderResult};
use crate::filter::{Filter, FilterKind, ShaderDialect};
use crate::gpu::{
    check_gl, create_external_texture, drain_gl_errors, ExternalTexture, GlApi, IDENTITY_MATRIX,
};
use crate::stats::FrameObserver;
use crate::RenderConfig;

use super::geometry::{QuadGeometry, QUAD_VERTEX_COUNT};

/// Hands the camera the producer end of a freshly created texture.
pub type TextureCallback = Box<dyn FnMut(FrameProducer) + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RendererState {
    Uninitialized,
    SurfaceReady,
    Rendering,
    Released,
}

/// Owns every GPU object of the preview. Must stay on the thread that owns
/// the GL context.
pub struct Renderer<G: GlApi> {
    gl: G,
    dialect: ShaderDialect,
    clear_color: [f32; 4],
    state: RendererState,
    /// Filter to build when the surface is (re)created
    pending_filter: FilterKind,
    texture: Option<ExternalTexture>,
    geometry: Option<QuadGeometry>,
    filter: Option<Filter>,
    viewport: (u32, u32),
    observer: Box<dyn FrameObserver>,
    on_texture_available: Option<TextureCallback>,
}

impl<G: GlApi> Renderer<G> {
    pub fn new(gl: G, config: &RenderConfig, observer: Box<dyn FrameObserver>) -> Self {
        Self {
            gl,
            dialect: config.dialect,
            clear_color: config.clear_color,
            state: RendererState::Uninitialized,
            pending_filter: config.default_filter,
            texture: None,
            geometry: None,
            filter: None,
            viewport: (0, 0),
            observer,
            on_texture_available: None,
        }
    }

    pub fn set_on_texture_available(&mut self, callback: TextureCallback) {
        self.on_texture_available = Some(callback);
    }

    pub fn state(&self) -> RendererState {
        self.state
    }

    pub fn active_filter(&self) -> Option<FilterKind> {
        self.filter.as_ref().map(Filter::kind)
    }

    /// Program of the active filter, 0 when there is none.
    pub fn program_handle(&self) -> u32 {
        self.filter.as_ref().map_or(0, Filter::program_handle)
    }

    pub fn viewport(&self) -> (u32, u32) {
        self.viewport
    }

    /// Transform of the last latched camera frame.
    pub fn transform_matrix(&self) -> [f32; 16] {
        self.texture
            .as_ref()
            .map_or(IDENTITY_MATRIX, |texture| *texture.transform_matrix())
    }

    /// Build the texture, quad and initial filter.
    ///
    /// Errors are fatal to the surface and leave the renderer uninitialized
    /// with nothing allocated. Calling this again after a context loss
    /// rebuilds everything; the old handles died with the old context.
    #[instrument(skip(self))]
    pub fn on_surface_created(&mut self) -> RenderResult<()> {
        match self.state {
            RendererState::Released => return Err(RenderError::Released),
            RendererState::Uninitialized => {}
            RendererState::SurfaceReady | RendererState::Rendering => {
                info!("surface recreated, rebuilding GPU objects");
                self.forget_gpu_objects();
            }
        }

        if let Err(err) = self.build_surface() {
            error!("surface setup failed: {err}");
            self.release_gpu_objects();
            self.state = RendererState::Uninitialized;
            return Err(err);
        }

        self.state = RendererState::SurfaceReady;
        info!(filter = ?self.active_filter(), dialect = ?self.dialect, "surface ready");
        Ok(())
    }

    fn build_surface(&mut self) -> RenderResult<()> {
        let (producer, consumer) = frame_surface();
        let texture = create_external_texture(&self.gl, self.dialect.texture_target(), consumer)?;
        self.texture = Some(texture);
        if let Some(callback) = self.on_texture_available.as_mut() {
            callback(producer);
        }

        self.geometry = Some(QuadGeometry::create(&self.gl)?);

        let kind = self.pending_filter;
        self.filter = Some(match self.init_filter(kind) {
            Ok(filter) => filter,
            Err(err) if kind != FilterKind::Normal => {
                warn!("{err}, starting with Normal");
                metrics::counter!("iris_filter_fallbacks").increment(1);
                self.init_filter(FilterKind::Normal)?
            }
            Err(err) => return Err(err),
        });

        let [r, g, b, a] = self.clear_color;
        self.gl.clear_color(r, g, b, a);
        check_gl(&self.gl, "glClearColor")?;
        Ok(())
    }

    pub fn on_surface_resized(&mut self, width: u32, height: u32) {
        if self.state == RendererState::Released {
            return;
        }
        debug!(width, height, "surface resized");
        self.viewport = (width, height);
        self.gl.viewport(
            0,
            0,
            i32::try_from(width).unwrap_or(i32::MAX),
            i32::try_from(height).unwrap_or(i32::MAX),
        );
    }

    /// Draw one frame. Never fails: a bad frame is logged and skipped.
    pub fn on_draw_frame(&mut self) {
        if !matches!(
            self.state,
            RendererState::SurfaceReady | RendererState::Rendering
        ) {
            return;
        }

        let start = Instant::now();
        match self.draw() {
            Ok(true) => {
                self.state = RendererState::Rendering;
                let elapsed_ms = start.elapsed().as_secs_f32() * 1000.0;
                self.observer.on_frame_rendered(elapsed_ms);
            }
            Ok(false) => trace!("no active filter, frame skipped"),
            Err(err) => {
                warn!("frame skipped: {err}");
                metrics::counter!("iris_frames_skipped").increment(1);
                drain_gl_errors(&self.gl);
            }
        }
    }

    fn draw(&mut self) -> Result<bool, GlError> {
        let gl = &self.gl;
        gl.clear(gl::COLOR_BUFFER_BIT);

        let Some(texture) = self.texture.as_mut() else {
            return Ok(false);
        };
        texture.update_tex_image(gl)?;

        let (Some(filter), Some(geometry)) = (self.filter.as_ref(), self.geometry.as_ref()) else {
            return Ok(false);
        };
        let Some(locations) = filter.locations() else {
            return Ok(false);
        };

        filter.use_program(gl);
        geometry.bind(gl, locations);
        if locations.transform >= 0 {
            gl.uniform_matrix4(locations.transform, texture.transform_matrix());
        }
        texture.bind(gl, 0);
        if locations.texture >= 0 {
            gl.uniform_1i(locations.texture, 0);
        }
        gl.draw_arrays(gl::TRIANGLE_STRIP, 0, QUAD_VERTEX_COUNT);
        check_gl(gl, "glDrawArrays")?;
        Ok(true)
    }

    /// Swap the active filter, releasing the old program before the new one
    /// is built. A filter that fails to build is replaced by Normal.
    ///
    /// Returns the filter actually active afterwards. Before the surface
    /// exists the choice is only remembered.
    pub fn set_filter(&mut self, kind: FilterKind) -> RenderResult<FilterKind> {
        match self.state {
            RendererState::Released => {
                warn!(filter = %kind, "filter change after release ignored");
                return Err(RenderError::Released);
            }
            RendererState::Uninitialized => {
                self.pending_filter = kind;
                return Ok(kind);
            }
            RendererState::SurfaceReady | RendererState::Rendering => {}
        }

        if let Some(mut old) = self.filter.take() {
            old.release(&self.gl);
        }

        let active = match self.init_filter(kind) {
            Ok(filter) => filter,
            Err(err) if kind != FilterKind::Normal => {
                warn!("{err}, falling back to Normal");
                metrics::counter!("iris_filter_fallbacks").increment(1);
                self.init_filter(FilterKind::Normal)?
            }
            Err(err) => return Err(err),
        };

        let kind = active.kind();
        debug!(filter = %kind, program = active.program_handle(), "filter active");
        self.filter = Some(active);
        self.pending_filter = kind;
        Ok(kind)
    }

    fn init_filter(&self, kind: FilterKind) -> RenderResult<Filter> {
        let mut filter = Filter::new(kind);
        if let Err(err) = filter.init(&self.gl, self.dialect) {
            filter.release(&self.gl);
            return Err(err);
        }
        Ok(filter)
    }

    pub fn reset_metrics(&mut self) {
        self.observer.reset();
    }

    /// Release every GPU object. Terminal, and safe to call again.
    pub fn release(&mut self) {
        if self.state == RendererState::Released {
            return;
        }
        self.release_gpu_objects();
        if let Err(err) = check_gl(&self.gl, "release") {
            error!("error while releasing GPU objects: {err}");
        }
        self.state = RendererState::Released;
        info!("renderer released");
    }

    fn release_gpu_objects(&mut self) {
        if let Some(mut filter) = self.filter.take() {
            filter.release(&self.gl);
        }
        if let Some(mut geometry) = self.geometry.take() {
            geometry.release(&self.gl);
        }
        if let Some(mut texture) = self.texture.take() {
            texture.release(&self.gl);
        }
    }

    fn forget_gpu_objects(&mut self) {
        self.filter = None;
        self.geometry = None;
        self.texture = None;
    }
}
