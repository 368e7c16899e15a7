//! [`GlApi`] backed by the driver through the `gl` crate.

use std::ffi::{c_void, CString};
use std::sync::Once;

use gl::types::{GLchar, GLenum, GLint, GLsizei, GLsizeiptr, GLuint};

use super::GlApi;

static GL_INIT_ONCE: Once = Once::new();

/// Raw OpenGL calls against whatever context is current on this thread.
///
/// Holding a `RawGl` is a promise that the host made a context current on the
/// render thread before the first call and keeps it current until the renderer
/// is released.
#[derive(Debug)]
pub struct RawGl {
    _private: (),
}

impl RawGl {
    /// Load GL function pointers from the host's loader.
    ///
    /// Pointers are loaded exactly once per process.
    pub fn load_with<F>(loader: F) -> Self
    where
        F: FnMut(&'static str) -> *const c_void,
    {
        let mut loader = Some(loader);
        GL_INIT_ONCE.call_once(|| {
            if let Some(loader) = loader.take() {
                gl::load_with(loader);
            }
        });

        Self { _private: () }
    }
}

fn c_string(name: &str) -> CString {
    // GLSL identifiers never contain NUL.
    CString::new(name.replace('\0', "")).unwrap_or_default()
}

fn read_log(len: GLint, fetch: impl FnOnce(GLsizei, *mut GLsizei, *mut GLchar)) -> String {
    let capacity = len.max(1) as usize;
    let mut buf = vec![0u8; capacity];
    let mut written: GLsizei = 0;
    fetch(capacity as GLsizei, &mut written, buf.as_mut_ptr().cast());
    buf.truncate(written.max(0) as usize);
    String::from_utf8_lossy(&buf).trim_end().to_owned()
}

// SAFETY (all methods below): the render thread owns the current context and
// every pointer handed to GL outlives the call.
impl GlApi for RawGl {
    fn get_error(&self) -> GLenum {
        unsafe { gl::GetError() }
    }

    fn gen_texture(&self) -> GLuint {
        let mut texture = 0;
        unsafe { gl::GenTextures(1, &mut texture) };
        texture
    }

    fn bind_texture(&self, target: GLenum, texture: GLuint) {
        unsafe { gl::BindTexture(target, texture) }
    }

    fn tex_parameter_i(&self, target: GLenum, pname: GLenum, param: GLint) {
        unsafe { gl::TexParameteri(target, pname, param) }
    }

    fn tex_image_2d(&self, target: GLenum, width: u32, height: u32, format: GLenum, pixels: &[u8]) {
        unsafe {
            gl::PixelStorei(gl::UNPACK_ALIGNMENT, 1);
            gl::TexImage2D(
                target,
                0,
                format as GLint,
                width as GLsizei,
                height as GLsizei,
                0,
                format,
                gl::UNSIGNED_BYTE,
                pixels.as_ptr().cast(),
            );
        }
    }

    fn delete_texture(&self, texture: GLuint) {
        unsafe { gl::DeleteTextures(1, &texture) }
    }

    fn active_texture(&self, unit: GLenum) {
        unsafe { gl::ActiveTexture(unit) }
    }

    fn create_shader(&self, kind: GLenum) -> GLuint {
        unsafe { gl::CreateShader(kind) }
    }

    fn shader_source(&self, shader: GLuint, source: &str) {
        let ptr = source.as_ptr().cast::<GLchar>();
        let len = source.len() as GLint;
        unsafe { gl::ShaderSource(shader, 1, &ptr, &len) }
    }

    fn compile_shader(&self, shader: GLuint) {
        unsafe { gl::CompileShader(shader) }
    }

    fn shader_compile_status(&self, shader: GLuint) -> bool {
        let mut status = 0;
        unsafe { gl::GetShaderiv(shader, gl::COMPILE_STATUS, &mut status) };
        status == gl::TRUE as GLint
    }

    fn shader_info_log(&self, shader: GLuint) -> String {
        let mut len = 0;
        unsafe { gl::GetShaderiv(shader, gl::INFO_LOG_LENGTH, &mut len) };
        read_log(len, |cap, written, buf| unsafe {
            gl::GetShaderInfoLog(shader, cap, written, buf)
        })
    }

    fn delete_shader(&self, shader: GLuint) {
        unsafe { gl::DeleteShader(shader) }
    }

    fn create_program(&self) -> GLuint {
        unsafe { gl::CreateProgram() }
    }

    fn attach_shader(&self, program: GLuint, shader: GLuint) {
        unsafe { gl::AttachShader(program, shader) }
    }

    fn link_program(&self, program: GLuint) {
        unsafe { gl::LinkProgram(program) }
    }

    fn program_link_status(&self, program: GLuint) -> bool {
        let mut status = 0;
        unsafe { gl::GetProgramiv(program, gl::LINK_STATUS, &mut status) };
        status == gl::TRUE as GLint
    }

    fn program_info_log(&self, program: GLuint) -> String {
        let mut len = 0;
        unsafe { gl::GetProgramiv(program, gl::INFO_LOG_LENGTH, &mut len) };
        read_log(len, |cap, written, buf| unsafe {
            gl::GetProgramInfoLog(program, cap, written, buf)
        })
    }

    fn delete_program(&self, program: GLuint) {
        unsafe { gl::DeleteProgram(program) }
    }

    fn use_program(&self, program: GLuint) {
        unsafe { gl::UseProgram(program) }
    }

    fn attrib_location(&self, program: GLuint, name: &str) -> GLint {
        let name = c_string(name);
        unsafe { gl::GetAttribLocation(program, name.as_ptr()) }
    }

    fn uniform_location(&self, program: GLuint, name: &str) -> GLint {
        let name = c_string(name);
        unsafe { gl::GetUniformLocation(program, name.as_ptr()) }
    }

    fn gen_buffer(&self) -> GLuint {
        let mut buffer = 0;
        unsafe { gl::GenBuffers(1, &mut buffer) };
        buffer
    }

    fn bind_buffer(&self, target: GLenum, buffer: GLuint) {
        unsafe { gl::BindBuffer(target, buffer) }
    }

    fn buffer_data_f32(&self, target: GLenum, data: &[f32]) {
        unsafe {
            gl::BufferData(
                target,
                std::mem::size_of_val(data) as GLsizeiptr,
                data.as_ptr().cast(),
                gl::STATIC_DRAW,
            )
        }
    }

    fn delete_buffer(&self, buffer: GLuint) {
        unsafe { gl::DeleteBuffers(1, &buffer) }
    }

    fn vertex_attrib_pointer_f32(&self, index: GLuint, size: GLint, stride: GLsizei, offset: usize) {
        // With an ARRAY_BUFFER bound the pointer argument is a byte offset.
        unsafe {
            gl::VertexAttribPointer(
                index,
                size,
                gl::FLOAT,
                gl::FALSE,
                stride,
                offset as *const c_void,
            )
        }
    }

    fn enable_vertex_attrib_array(&self, index: GLuint) {
        unsafe { gl::EnableVertexAttribArray(index) }
    }

    fn uniform_matrix4(&self, location: GLint, matrix: &[f32; 16]) {
        unsafe { gl::UniformMatrix4fv(location, 1, gl::FALSE, matrix.as_ptr()) }
    }

    fn uniform_1i(&self, location: GLint, value: GLint) {
        unsafe { gl::Uniform1i(location, value) }
    }

    fn viewport(&self, x: GLint, y: GLint, width: GLsizei, height: GLsizei) {
        unsafe { gl::Viewport(x, y, width, height) }
    }

    fn clear_color(&self, r: f32, g: f32, b: f32, a: f32) {
        unsafe { gl::ClearColor(r, g, b, a) }
    }

    fn clear(&self, mask: GLenum) {
        unsafe { gl::Clear(mask) }
    }

    fn draw_arrays(&self, mode: GLenum, first: GLint, count: GLsizei) {
        unsafe { gl::DrawArrays(mode, first, count) }
    }
}
