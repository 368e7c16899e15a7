//! One-shot compilation of a vertex + fragment pair into a linked program.

use gl::types::GLuint;
use tracing::debug;

use super::{check_gl, GlApi};
use crate::error::{GlError, ShaderError, ShaderStage};

/// A linked GPU program. The handle is never 0.
#[derive(Debug, PartialEq, Eq)]
pub struct ShaderProgram {
    handle: GLuint,
}

impl ShaderProgram {
    /// Compile both stages and link them.
    ///
    /// On failure every GL object created along the way is deleted, so no
    /// partially built program ever escapes. There is no retry.
    pub fn compile(gl: &impl GlApi, vertex: &str, fragment: &str) -> Result<Self, ShaderError> {
        let vertex_shader = compile_stage(gl, ShaderStage::Vertex, vertex)?;
        let fragment_shader = match compile_stage(gl, ShaderStage::Fragment, fragment) {
            Ok(shader) => shader,
            Err(err) => {
                gl.delete_shader(vertex_shader);
                return Err(err);
            }
        };

        let result = link(gl, vertex_shader, fragment_shader);

        // Linked programs keep their own copy of the binaries.
        gl.delete_shader(vertex_shader);
        gl.delete_shader(fragment_shader);

        result.map(|handle| {
            debug!(program = handle, "linked shader program");
            Self { handle }
        })
    }

    pub fn handle(&self) -> GLuint {
        self.handle
    }

    /// Delete the program. Consumes `self` so the handle cannot be reused.
    pub fn delete(self, gl: &impl GlApi) {
        gl.delete_program(self.handle);
    }
}

fn compile_stage(gl: &impl GlApi, stage: ShaderStage, source: &str) -> Result<GLuint, ShaderError> {
    let shader = gl.create_shader(stage.gl_enum());
    if shader == 0 {
        let code = gl.get_error();
        return Err(GlError::new("glCreateShader", code).into());
    }

    gl.shader_source(shader, source);
    gl.compile_shader(shader);

    if !gl.shader_compile_status(shader) {
        let log = gl.shader_info_log(shader);
        gl.delete_shader(shader);
        return Err(ShaderError::Compile { stage, log });
    }

    Ok(shader)
}

fn link(gl: &impl GlApi, vertex: GLuint, fragment: GLuint) -> Result<GLuint, ShaderError> {
    let program = gl.create_program();
    if program == 0 {
        let code = gl.get_error();
        return Err(GlError::new("glCreateProgram", code).into());
    }

    gl.attach_shader(program, vertex);
    gl.attach_shader(program, fragment);
    if let Err(err) = check_gl(gl, "glAttachShader") {
        gl.delete_program(program);
        return Err(err.into());
    }

    gl.link_program(program);
    if !gl.program_link_status(program) {
        let log = gl.program_info_log(program);
        gl.delete_program(program);
        return Err(ShaderError::Link { log });
    }

    Ok(program)
}
