//! Colour filters applied to the camera preview.
//!
//! A [`Filter`] is a [`FilterKind`] plus the GPU program built for it. The
//! kind is resolved once at the UI boundary; the render path never compares
//! names.

use std::fmt;
use std::str::FromStr;

use gl::types::{GLint, GLuint};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{RenderError, RenderResult};
use crate::gpu::{active_location, GlApi, ShaderProgram};

pub mod shaders;

pub use shaders::ShaderDialect;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterKind {
    #[default]
    Normal,
    #[serde(alias = "grey")]
    Gray,
    Sepia,
}

impl FilterKind {
    pub const ALL: [FilterKind; 3] = [FilterKind::Normal, FilterKind::Gray, FilterKind::Sepia];

    pub fn name(self) -> &'static str {
        match self {
            FilterKind::Normal => "Normal",
            FilterKind::Gray => "Gray",
            FilterKind::Sepia => "Sepia",
        }
    }
}

impl fmt::Display for FilterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown filter {0:?}, expected one of Normal, Gray, Sepia")]
pub struct UnknownFilter(pub String);

impl FromStr for FilterKind {
    type Err = UnknownFilter;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "normal" => Ok(FilterKind::Normal),
            "gray" | "grey" => Ok(FilterKind::Gray),
            "sepia" => Ok(FilterKind::Sepia),
            _ => Err(UnknownFilter(s.to_owned())),
        }
    }
}

/// Input locations of a linked filter program, resolved once at init.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgramLocations {
    pub position: Option<GLuint>,
    pub tex_coord: Option<GLuint>,
    pub texture: GLint,
    pub transform: GLint,
}

impl ProgramLocations {
    fn resolve(gl: &impl GlApi, program: GLuint) -> Self {
        Self {
            position: active_location(gl.attrib_location(program, shaders::POSITION_ATTRIBUTE)),
            tex_coord: active_location(gl.attrib_location(program, shaders::TEXCOORD_ATTRIBUTE)),
            texture: gl.uniform_location(program, shaders::TEXTURE_UNIFORM),
            transform: gl.uniform_location(program, shaders::TRANSFORM_UNIFORM),
        }
    }
}

/// A filter and, while initialized, the program that implements it.
#[derive(Debug)]
pub struct Filter {
    kind: FilterKind,
    program: Option<ShaderProgram>,
    locations: Option<ProgramLocations>,
}

impl Filter {
    pub fn new(kind: FilterKind) -> Self {
        Self {
            kind,
            program: None,
            locations: None,
        }
    }

    pub fn kind(&self) -> FilterKind {
        self.kind
    }

    /// Compile and link this filter's program.
    ///
    /// Re-initializing an initialized filter first releases the old program.
    pub fn init(&mut self, gl: &impl GlApi, dialect: ShaderDialect) -> RenderResult<()> {
        self.release(gl);

        let vertex = shaders::vertex_source(dialect);
        let fragment = shaders::fragment_source(dialect, self.kind);
        let program = ShaderProgram::compile(gl, &vertex, &fragment).map_err(|source| {
            RenderError::FilterInit {
                filter: self.kind,
                source,
            }
        })?;

        let locations = ProgramLocations::resolve(gl, program.handle());
        debug!(filter = %self.kind, program = program.handle(), ?locations, "filter initialized");
        self.locations = Some(locations);
        self.program = Some(program);
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.program.is_some()
    }

    /// Make this filter's program current. No-op before `init`.
    pub fn use_program(&self, gl: &impl GlApi) {
        if let Some(program) = &self.program {
            gl.use_program(program.handle());
        }
    }

    /// Program handle, 0 when not initialized.
    pub fn program_handle(&self) -> GLuint {
        self.program.as_ref().map_or(0, ShaderProgram::handle)
    }

    pub fn locations(&self) -> Option<&ProgramLocations> {
        self.locations.as_ref()
    }

    /// Delete the program. Safe on a released or never initialized filter.
    pub fn release(&mut self, gl: &impl GlApi) {
        self.locations = None;
        if let Some(program) = self.program.take() {
            debug!(filter = %self.kind, program = program.handle(), "filter released");
            program.delete(gl);
        }
    }
}
