//! The full-screen quad every filter draws onto.

use std::mem::size_of;

use gl::types::{GLsizei, GLuint};

use crate::error::GlError;
use crate::filter::ProgramLocations;
use crate::gpu::{check_gl, GlApi};

/// Interleaved `(x, y, u, v)` for a full-viewport triangle strip.
pub const QUAD_VERTICES: [f32; 16] = [
    -1.0, -1.0, 0.0, 0.0, //
    1.0, -1.0, 1.0, 0.0, //
    -1.0, 1.0, 0.0, 1.0, //
    1.0, 1.0, 1.0, 1.0,
];

pub const QUAD_VERTEX_COUNT: GLsizei = 4;

const COMPONENTS: usize = 2;
const STRIDE: GLsizei = (4 * size_of::<f32>()) as GLsizei;
const TEX_COORD_OFFSET: usize = COMPONENTS * size_of::<f32>();

/// The quad every frame is drawn on. Uploaded once, never modified.
#[derive(Debug)]
pub struct QuadGeometry {
    buffer: GLuint,
}

impl QuadGeometry {
    pub fn create(gl: &impl GlApi) -> Result<Self, GlError> {
        let buffer = gl.gen_buffer();
        let result = check_gl(gl, "glGenBuffers").and_then(|()| {
            gl.bind_buffer(gl::ARRAY_BUFFER, buffer);
            gl.buffer_data_f32(gl::ARRAY_BUFFER, &QUAD_VERTICES);
            let uploaded = check_gl(gl, "glBufferData");
            gl.bind_buffer(gl::ARRAY_BUFFER, 0);
            uploaded
        });

        match result {
            Ok(()) => Ok(Self { buffer }),
            Err(err) => {
                if buffer != 0 {
                    gl.delete_buffer(buffer);
                }
                Err(err)
            }
        }
    }

    pub fn buffer(&self) -> GLuint {
        self.buffer
    }

    /// Point the program's position and texcoord attributes into the quad.
    /// Inactive attributes are skipped.
    pub fn bind(&self, gl: &impl GlApi, locations: &ProgramLocations) {
        gl.bind_buffer(gl::ARRAY_BUFFER, self.buffer);
        if let Some(position) = locations.position {
            gl.vertex_attrib_pointer_f32(position, COMPONENTS as i32, STRIDE, 0);
            gl.enable_vertex_attrib_array(position);
        }
        if let Some(tex_coord) = locations.tex_coord {
            gl.vertex_attrib_pointer_f32(tex_coord, COMPONENTS as i32, STRIDE, TEX_COORD_OFFSET);
            gl.enable_vertex_attrib_array(tex_coord);
        }
    }

    pub fn release(&mut self, gl: &impl GlApi) {
        if self.buffer != 0 {
            gl.delete_buffer(self.buffer);
            self.buffer = 0;
        }
    }
}
