//! Recording [`GlApi`] used by the unit tests.
//!
//! Tracks live objects so tests can assert on resource ownership (at most one
//! program alive, no double deletes) and injects compile, link and GL errors.

use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use gl::types::{GLenum, GLint, GLsizei, GLuint};

use super::GlApi;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    GenTexture(GLuint),
    BindTexture { target: GLenum, texture: GLuint },
    TexParameter { target: GLenum, pname: GLenum, param: GLint },
    TexImage { target: GLenum, width: u32, height: u32, format: GLenum },
    DeleteTexture(GLuint),
    ActiveTexture(GLenum),
    CreateShader { kind: GLenum, shader: GLuint },
    CompileShader(GLuint),
    DeleteShader(GLuint),
    CreateProgram(GLuint),
    AttachShader { program: GLuint, shader: GLuint },
    LinkProgram(GLuint),
    DeleteProgram(GLuint),
    UseProgram(GLuint),
    GenBuffer(GLuint),
    BindBuffer { target: GLenum, buffer: GLuint },
    BufferData { target: GLenum, len: usize },
    DeleteBuffer(GLuint),
    VertexAttribPointer { index: GLuint, size: GLint, stride: GLsizei, offset: usize },
    EnableVertexAttribArray(GLuint),
    UniformMatrix4 { location: GLint, matrix: [f32; 16] },
    Uniform1i { location: GLint, value: GLint },
    Viewport { x: GLint, y: GLint, width: GLsizei, height: GLsizei },
    ClearColor([f32; 4]),
    Clear(GLenum),
    DrawArrays { mode: GLenum, first: GLint, count: GLsizei },
}

#[derive(Default)]
struct FakeState {
    next_id: GLuint,
    errors: VecDeque<GLenum>,
    calls: Vec<Call>,
    shader_sources: HashMap<GLuint, String>,
    program_shaders: HashMap<GLuint, Vec<GLuint>>,
    live_programs: BTreeSet<GLuint>,
    live_shaders: BTreeSet<GLuint>,
    live_textures: BTreeSet<GLuint>,
    live_buffers: BTreeSet<GLuint>,
    max_live_programs: usize,
    double_deletes: usize,
    compile_failure: Option<String>,
    link_failure: Option<String>,
    injected: HashMap<&'static str, GLenum>,
}

impl FakeState {
    fn next_id(&mut self) -> GLuint {
        self.next_id += 1;
        self.next_id
    }

    fn hit(&mut self, op: &'static str) {
        if let Some(code) = self.injected.remove(op) {
            self.errors.push_back(code);
        }
    }

    fn release(set: &mut BTreeSet<GLuint>, id: GLuint, double_deletes: &mut usize) {
        if id != 0 && !set.remove(&id) {
            *double_deletes += 1;
        }
    }
}

/// Shared handle: clones observe the same recorded state.
#[derive(Clone, Default)]
pub struct FakeGl {
    state: Arc<Mutex<FakeState>>,
}

impl FakeGl {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    pub fn push_error(&self, code: GLenum) {
        self.state().errors.push_back(code);
    }

    /// Shaders whose source contains `pattern` fail to compile.
    pub fn fail_compile_containing(&self, pattern: &str) {
        self.state().compile_failure = Some(pattern.to_owned());
    }

    /// Programs with an attached shader containing `pattern` fail to link.
    pub fn fail_link_containing(&self, pattern: &str) {
        self.state().link_failure = Some(pattern.to_owned());
    }

    pub fn clear_failures(&self) {
        let mut state = self.state();
        state.compile_failure = None;
        state.link_failure = None;
    }

    /// Raise `code` once, right after the next call to `op`.
    pub fn inject_error(&self, op: &'static str, code: GLenum) {
        self.state().injected.insert(op, code);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }

    pub fn live_programs(&self) -> Vec<GLuint> {
        self.state().live_programs.iter().copied().collect()
    }

    pub fn max_live_programs(&self) -> usize {
        self.state().max_live_programs
    }

    pub fn live_shaders(&self) -> usize {
        self.state().live_shaders.len()
    }

    pub fn live_textures(&self) -> usize {
        self.state().live_textures.len()
    }

    pub fn live_buffers(&self) -> usize {
        self.state().live_buffers.len()
    }

    pub fn double_deletes(&self) -> usize {
        self.state().double_deletes
    }

    pub fn draw_count(&self) -> usize {
        self.state()
            .calls
            .iter()
            .filter(|call| matches!(call, Call::DrawArrays { .. }))
            .count()
    }

    fn record(&self, op: &'static str, call: Call) {
        let mut state = self.state();
        state.calls.push(call);
        state.hit(op);
    }
}

impl GlApi for FakeGl {
    fn get_error(&self) -> GLenum {
        self.state().errors.pop_front().unwrap_or(gl::NO_ERROR)
    }

    fn gen_texture(&self) -> GLuint {
        let mut state = self.state();
        let id = state.next_id();
        state.live_textures.insert(id);
        state.calls.push(Call::GenTexture(id));
        state.hit("gen_texture");
        id
    }

    fn bind_texture(&self, target: GLenum, texture: GLuint) {
        self.record("bind_texture", Call::BindTexture { target, texture });
    }

    fn tex_parameter_i(&self, target: GLenum, pname: GLenum, param: GLint) {
        self.record("tex_parameter_i", Call::TexParameter { target, pname, param });
    }

    fn tex_image_2d(&self, target: GLenum, width: u32, height: u32, format: GLenum, _pixels: &[u8]) {
        self.record(
            "tex_image_2d",
            Call::TexImage {
                target,
                width,
                height,
                format,
            },
        );
    }

    fn delete_texture(&self, texture: GLuint) {
        let mut state = self.state();
        let FakeState {
            live_textures,
            double_deletes,
            ..
        } = &mut *state;
        FakeState::release(live_textures, texture, double_deletes);
        state.calls.push(Call::DeleteTexture(texture));
    }

    fn active_texture(&self, unit: GLenum) {
        self.record("active_texture", Call::ActiveTexture(unit));
    }

    fn create_shader(&self, kind: GLenum) -> GLuint {
        let mut state = self.state();
        let id = state.next_id();
        state.live_shaders.insert(id);
        state.calls.push(Call::CreateShader { kind, shader: id });
        id
    }

    fn shader_source(&self, shader: GLuint, source: &str) {
        self.state().shader_sources.insert(shader, source.to_owned());
    }

    fn compile_shader(&self, shader: GLuint) {
        self.record("compile_shader", Call::CompileShader(shader));
    }

    fn shader_compile_status(&self, shader: GLuint) -> bool {
        let state = self.state();
        match (&state.compile_failure, state.shader_sources.get(&shader)) {
            (Some(pattern), Some(source)) => !source.contains(pattern.as_str()),
            _ => true,
        }
    }

    fn shader_info_log(&self, shader: GLuint) -> String {
        format!("0:1: error: injected failure in shader {shader}")
    }

    fn delete_shader(&self, shader: GLuint) {
        let mut state = self.state();
        let FakeState {
            live_shaders,
            double_deletes,
            ..
        } = &mut *state;
        FakeState::release(live_shaders, shader, double_deletes);
        state.calls.push(Call::DeleteShader(shader));
    }

    fn create_program(&self) -> GLuint {
        let mut state = self.state();
        let id = state.next_id();
        state.live_programs.insert(id);
        state.max_live_programs = state.max_live_programs.max(state.live_programs.len());
        state.calls.push(Call::CreateProgram(id));
        id
    }

    fn attach_shader(&self, program: GLuint, shader: GLuint) {
        let mut state = self.state();
        state.program_shaders.entry(program).or_default().push(shader);
        state.calls.push(Call::AttachShader { program, shader });
    }

    fn link_program(&self, program: GLuint) {
        self.record("link_program", Call::LinkProgram(program));
    }

    fn program_link_status(&self, program: GLuint) -> bool {
        let state = self.state();
        let Some(pattern) = &state.link_failure else {
            return true;
        };
        !state
            .program_shaders
            .get(&program)
            .into_iter()
            .flatten()
            .filter_map(|shader| state.shader_sources.get(shader))
            .any(|source| source.contains(pattern.as_str()))
    }

    fn program_info_log(&self, program: GLuint) -> String {
        format!("injected link failure in program {program}")
    }

    fn delete_program(&self, program: GLuint) {
        let mut state = self.state();
        let FakeState {
            live_programs,
            double_deletes,
            ..
        } = &mut *state;
        FakeState::release(live_programs, program, double_deletes);
        state.calls.push(Call::DeleteProgram(program));
    }

    fn use_program(&self, program: GLuint) {
        self.record("use_program", Call::UseProgram(program));
    }

    fn attrib_location(&self, _program: GLuint, name: &str) -> GLint {
        match name {
            "aPosition" => 0,
            "aTexCoord" => 1,
            _ => -1,
        }
    }

    fn uniform_location(&self, _program: GLuint, name: &str) -> GLint {
        match name {
            "uTexture" => 0,
            "uTransform" => 1,
            _ => -1,
        }
    }

    fn gen_buffer(&self) -> GLuint {
        let mut state = self.state();
        let id = state.next_id();
        state.live_buffers.insert(id);
        state.calls.push(Call::GenBuffer(id));
        state.hit("gen_buffer");
        id
    }

    fn bind_buffer(&self, target: GLenum, buffer: GLuint) {
        self.record("bind_buffer", Call::BindBuffer { target, buffer });
    }

    fn buffer_data_f32(&self, target: GLenum, data: &[f32]) {
        self.record(
            "buffer_data",
            Call::BufferData {
                target,
                len: data.len(),
            },
        );
    }

    fn delete_buffer(&self, buffer: GLuint) {
        let mut state = self.state();
        let FakeState {
            live_buffers,
            double_deletes,
            ..
        } = &mut *state;
        FakeState::release(live_buffers, buffer, double_deletes);
        state.calls.push(Call::DeleteBuffer(buffer));
    }

    fn vertex_attrib_pointer_f32(&self, index: GLuint, size: GLint, stride: GLsizei, offset: usize) {
        self.record(
            "vertex_attrib_pointer",
            Call::VertexAttribPointer {
                index,
                size,
                stride,
                offset,
            },
        );
    }

    fn enable_vertex_attrib_array(&self, index: GLuint) {
        self.record("enable_vertex_attrib_array", Call::EnableVertexAttribArray(index));
    }

    fn uniform_matrix4(&self, location: GLint, matrix: &[f32; 16]) {
        self.record(
            "uniform_matrix4",
            Call::UniformMatrix4 {
                location,
                matrix: *matrix,
            },
        );
    }

    fn uniform_1i(&self, location: GLint, value: GLint) {
        self.record("uniform_1i", Call::Uniform1i { location, value });
    }

    fn viewport(&self, x: GLint, y: GLint, width: GLsizei, height: GLsizei) {
        self.record(
            "viewport",
            Call::Viewport {
                x,
                y,
                width,
                height,
            },
        );
    }

    fn clear_color(&self, r: f32, g: f32, b: f32, a: f32) {
        self.record("clear_color", Call::ClearColor([r, g, b, a]));
    }

    fn clear(&self, mask: GLenum) {
        self.record("clear", Call::Clear(mask));
    }

    fn draw_arrays(&self, mode: GLenum, first: GLint, count: GLsizei) {
        self.record("draw_arrays", Call::DrawArrays { mode, first, count });
    }
}
