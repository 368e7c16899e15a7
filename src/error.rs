//! Error types for the GL rendering core

use std::fmt;

use gl::types::GLenum;
use thiserror::Error;

use crate::filter::FilterKind;

/// Which stage of a shader program failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    pub fn gl_enum(self) -> GLenum {
        match self {
            ShaderStage::Vertex => gl::VERTEX_SHADER,
            ShaderStage::Fragment => gl::FRAGMENT_SHADER,
        }
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderStage::Vertex => f.write_str("vertex"),
            ShaderStage::Fragment => f.write_str("fragment"),
        }
    }
}

/// A GL call reported an error through `glGetError`
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{operation} failed: {} (0x{code:04X})", error_name(.code))]
pub struct GlError {
    pub operation: &'static str,
    pub code: GLenum,
}

impl GlError {
    pub fn new(operation: &'static str, code: GLenum) -> Self {
        Self { operation, code }
    }
}

/// Failures while building a shader program
#[derive(Debug, Clone, Error)]
pub enum ShaderError {
    #[error("failed to compile {stage} shader: {log}")]
    Compile { stage: ShaderStage, log: String },

    #[error("failed to link program: {log}")]
    Link { log: String },

    #[error(transparent)]
    Gl(#[from] GlError),
}

/// Errors surfaced by the renderer
#[derive(Debug, Clone, Error)]
pub enum RenderError {
    #[error(transparent)]
    Gl(#[from] GlError),

    #[error("failed to initialize {filter} filter")]
    FilterInit {
        filter: FilterKind,
        #[source]
        source: ShaderError,
    },

    #[error("renderer has been released")]
    Released,
}

fn error_name(code: &GLenum) -> &'static str {
    crate::gpu::gl_error_name(*code)
}

pub type RenderResult<T> = Result<T, RenderError>;
