//! The texture camera frames land in.

use gl::types::{GLenum, GLint, GLuint};
use tracing::{debug, trace};

use super::{check_gl, GlApi, IDENTITY_MATRIX};
use crate::capture::FrameConsumer;
use crate::error::GlError;

/// Allocate and configure the texture bound to the external sampling target.
///
/// Linear filtering, clamp-to-edge on both axes: a streamed image must never
/// be sampled outside its defined region. Any GL error fails the whole
/// operation and the texture is deleted again.
pub fn create_external_texture(
    gl: &impl GlApi,
    target: GLenum,
    consumer: FrameConsumer,
) -> Result<ExternalTexture, GlError> {
    let handle = gl.gen_texture();
    check_gl(gl, "glGenTextures")?;

    if let Err(err) = configure(gl, target, handle) {
        gl.delete_texture(handle);
        return Err(err);
    }

    debug!(texture = handle, target, "created external texture");
    Ok(ExternalTexture {
        handle,
        target,
        consumer,
        transform: IDENTITY_MATRIX,
        size: None,
        latched_sequence: None,
    })
}

fn configure(gl: &impl GlApi, target: GLenum, handle: GLuint) -> Result<(), GlError> {
    gl.bind_texture(target, handle);
    check_gl(gl, "glBindTexture")?;

    let params = [
        (gl::TEXTURE_MIN_FILTER, gl::LINEAR, "glTexParameteri(MIN_FILTER)"),
        (gl::TEXTURE_MAG_FILTER, gl::LINEAR, "glTexParameteri(MAG_FILTER)"),
        (gl::TEXTURE_WRAP_S, gl::CLAMP_TO_EDGE, "glTexParameteri(WRAP_S)"),
        (gl::TEXTURE_WRAP_T, gl::CLAMP_TO_EDGE, "glTexParameteri(WRAP_T)"),
    ];
    for (pname, value, operation) in params {
        gl.tex_parameter_i(target, pname, value as GLint);
        check_gl(gl, operation)?;
    }
    Ok(())
}

/// GPU texture fed by the camera, plus the transform of the latest frame.
pub struct ExternalTexture {
    handle: GLuint,
    target: GLenum,
    consumer: FrameConsumer,
    transform: [f32; 16],
    size: Option<(u32, u32)>,
    latched_sequence: Option<u64>,
}

impl ExternalTexture {
    pub fn handle(&self) -> GLuint {
        self.handle
    }

    pub fn target(&self) -> GLenum {
        self.target
    }

    /// Transform of the most recently latched frame (identity before any).
    pub fn transform_matrix(&self) -> &[f32; 16] {
        &self.transform
    }

    pub fn latched_sequence(&self) -> Option<u64> {
        self.latched_sequence
    }

    /// Latch the newest camera frame into the texture.
    ///
    /// Returns `Ok(false)` when no new frame arrived; the previous image and
    /// transform stay in place.
    pub fn update_tex_image(&mut self, gl: &impl GlApi) -> Result<bool, GlError> {
        if self.handle == 0 {
            return Ok(false);
        }
        let Some(frame) = self.consumer.take_latest() else {
            return Ok(false);
        };

        if frame.has_pixels() {
            let Some(format) = frame.meta.format.gl_format() else {
                trace!(format = ?frame.meta.format, "frame format cannot be uploaded, skipping");
                self.consumer.mark_skipped();
                return Ok(false);
            };
            if !frame.is_complete() {
                trace!(sequence = frame.sequence(), "incomplete frame, skipping");
                self.consumer.mark_skipped();
                return Ok(false);
            }

            gl.bind_texture(self.target, self.handle);
            gl.tex_image_2d(
                self.target,
                frame.meta.width,
                frame.meta.height,
                format,
                &frame.data,
            );
            check_gl(gl, "glTexImage2D")?;

            let size = (frame.meta.width, frame.meta.height);
            if self.size != Some(size) {
                debug!(width = size.0, height = size.1, "camera frame size changed");
                self.size = Some(size);
            }
        }

        self.transform = frame.meta.transform;
        self.latched_sequence = Some(frame.sequence());
        self.consumer.mark_latched();
        Ok(true)
    }

    /// Bind to texture `unit` (0-based).
    pub fn bind(&self, gl: &impl GlApi, unit: u32) {
        gl.active_texture(gl::TEXTURE0 + unit);
        gl.bind_texture(self.target, self.handle);
    }

    /// Delete the texture. Safe to call more than once.
    pub fn release(&mut self, gl: &impl GlApi) {
        if self.handle != 0 {
            gl.delete_texture(self.handle);
            self.handle = 0;
            self.size = None;
        }
    }
}
