//! The GPU seam: every GL call the renderer makes goes through [`GlApi`].
//!
//! [`RawGl`] forwards to the driver via the `gl` crate. Tests substitute a
//! recording fake so the rendering core can be exercised without a context.

use gl::types::{GLenum, GLint, GLsizei, GLuint};

use crate::error::GlError;

pub mod raw;
pub mod shader;
pub mod texture;

#[cfg(test)]
pub(crate) mod fake;

pub use raw::RawGl;
pub use shader::ShaderProgram;
pub use texture::{create_external_texture, ExternalTexture};

/// `GL_TEXTURE_EXTERNAL_OES` from `OES_EGL_image_external`, absent from the
/// desktop bindings.
pub const TEXTURE_EXTERNAL_OES: GLenum = 0x8D65;

/// Column-major 4x4 identity.
pub const IDENTITY_MATRIX: [f32; 16] = [
    1.0, 0.0, 0.0, 0.0, //
    0.0, 1.0, 0.0, 0.0, //
    0.0, 0.0, 1.0, 0.0, //
    0.0, 0.0, 0.0, 1.0,
];

/// The subset of OpenGL (ES 2.0 compatible) used by the rendering core.
///
/// Implementations must only be called from the thread that owns the current
/// GL context. Object handles follow GL conventions: 0 is "no object", and a
/// location of -1 means the name is not active in the program.
pub trait GlApi {
    fn get_error(&self) -> GLenum;

    // Textures
    fn gen_texture(&self) -> GLuint;
    fn bind_texture(&self, target: GLenum, texture: GLuint);
    fn tex_parameter_i(&self, target: GLenum, pname: GLenum, param: GLint);
    fn tex_image_2d(&self, target: GLenum, width: u32, height: u32, format: GLenum, pixels: &[u8]);
    fn delete_texture(&self, texture: GLuint);
    fn active_texture(&self, unit: GLenum);

    // Shaders and programs
    fn create_shader(&self, kind: GLenum) -> GLuint;
    fn shader_source(&self, shader: GLuint, source: &str);
    fn compile_shader(&self, shader: GLuint);
    fn shader_compile_status(&self, shader: GLuint) -> bool;
    fn shader_info_log(&self, shader: GLuint) -> String;
    fn delete_shader(&self, shader: GLuint);
    fn create_program(&self) -> GLuint;
    fn attach_shader(&self, program: GLuint, shader: GLuint);
    fn link_program(&self, program: GLuint);
    fn program_link_status(&self, program: GLuint) -> bool;
    fn program_info_log(&self, program: GLuint) -> String;
    fn delete_program(&self, program: GLuint);
    fn use_program(&self, program: GLuint);
    fn attrib_location(&self, program: GLuint, name: &str) -> GLint;
    fn uniform_location(&self, program: GLuint, name: &str) -> GLint;

    // Vertex data
    fn gen_buffer(&self) -> GLuint;
    fn bind_buffer(&self, target: GLenum, buffer: GLuint);
    fn buffer_data_f32(&self, target: GLenum, data: &[f32]);
    fn delete_buffer(&self, buffer: GLuint);
    fn vertex_attrib_pointer_f32(&self, index: GLuint, size: GLint, stride: GLsizei, offset: usize);
    fn enable_vertex_attrib_array(&self, index: GLuint);

    // Uniforms
    fn uniform_matrix4(&self, location: GLint, matrix: &[f32; 16]);
    fn uniform_1i(&self, location: GLint, value: GLint);

    // Framebuffer
    fn viewport(&self, x: GLint, y: GLint, width: GLsizei, height: GLsizei);
    fn clear_color(&self, r: f32, g: f32, b: f32, a: f32);
    fn clear(&self, mask: GLenum);
    fn draw_arrays(&self, mode: GLenum, first: GLint, count: GLsizei);
}

/// Fail with the first pending GL error, draining the rest of the queue.
pub fn check_gl(gl: &impl GlApi, operation: &'static str) -> Result<(), GlError> {
    let first = gl.get_error();
    if first == gl::NO_ERROR {
        return Ok(());
    }
    drain_gl_errors(gl);
    Err(GlError::new(operation, first))
}

/// Discard all pending GL errors.
pub fn drain_gl_errors(gl: &impl GlApi) {
    // GL keeps one flag per error kind, so this terminates quickly.
    for _ in 0..16 {
        if gl.get_error() == gl::NO_ERROR {
            break;
        }
    }
}

pub fn gl_error_name(code: GLenum) -> &'static str {
    match code {
        gl::NO_ERROR => "GL_NO_ERROR",
        gl::INVALID_ENUM => "GL_INVALID_ENUM",
        gl::INVALID_VALUE => "GL_INVALID_VALUE",
        gl::INVALID_OPERATION => "GL_INVALID_OPERATION",
        gl::INVALID_FRAMEBUFFER_OPERATION => "GL_INVALID_FRAMEBUFFER_OPERATION",
        gl::OUT_OF_MEMORY => "GL_OUT_OF_MEMORY",
        gl::STACK_UNDERFLOW => "GL_STACK_UNDERFLOW",
        gl::STACK_OVERFLOW => "GL_STACK_OVERFLOW",
        _ => "unknown GL error",
    }
}

/// Map a program location to an attribute index, `None` when inactive.
pub fn active_location(location: GLint) -> Option<GLuint> {
    GLuint::try_from(location).ok()
}

#[cfg(test)]
mod tests {
    use super::fake::FakeGl;
    use super::*;

    #[test]
    fn check_gl_reports_first_error_and_drains() {
        let gl = FakeGl::new();
        gl.push_error(gl::INVALID_ENUM);
        gl.push_error(gl::INVALID_VALUE);

        let err = check_gl(&gl, "glTexParameteri").unwrap_err();
        assert_eq!(err.operation, "glTexParameteri");
        assert_eq!(err.code, gl::INVALID_ENUM);
        assert!(check_gl(&gl, "next").is_ok());
    }

    #[test]
    fn gl_error_display_names_the_code() {
        let err = GlError::new("glDrawArrays", gl::INVALID_OPERATION);
        assert_eq!(
            err.to_string(),
            "glDrawArrays failed: GL_INVALID_OPERATION (0x0502)"
        );
    }

    #[test]
    fn negative_locations_are_inactive() {
        assert_eq!(active_location(-1), None);
        assert_eq!(active_location(3), Some(3));
    }
}
