//! GLSL programs built from vertex/fragment files

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::Path;
use std::rc::Rc;

use glow::HasContext;

use super::native;
use crate::render::device::RawHandle;
use crate::render::shader::{ShaderId, ShaderProgram, UniformLocation, UniformValue};
use crate::render::{RenderError, RenderResult};

/// Linked program with a per-name location cache
pub struct GlShader {
    gl: Rc<glow::Context>,
    id: ShaderId,
    program: glow::NativeProgram,
    locations: RefCell<HashMap<String, Option<UniformLocation>>>,
}

impl GlShader {
    /// Compile and link the two stages
    pub fn from_files(gl: Rc<glow::Context>, id: ShaderId, vertex: &Path, fragment: &Path) -> RenderResult<Self> {
        let read = |path: &Path| {
            std::fs::read_to_string(path)
                .map_err(|e| RenderError::ShaderBuildFailed(format!("{id:?}: {}: {e}", path.display())))
        };
        Self::from_sources(gl, id, &read(vertex)?, &read(fragment)?)
    }

    /// Compile and link from source text
    pub fn from_sources(gl: Rc<glow::Context>, id: ShaderId, vertex: &str, fragment: &str) -> RenderResult<Self> {
        unsafe {
            let program = gl
                .create_program()
                .map_err(|e| RenderError::ShaderBuildFailed(format!("{id:?}: {e}")))?;

            let mut stages = Vec::with_capacity(2);
            for (kind, source) in [(glow::VERTEX_SHADER, vertex), (glow::FRAGMENT_SHADER, fragment)] {
                let stage = gl
                    .create_shader(kind)
                    .map_err(|e| RenderError::ShaderBuildFailed(format!("{id:?}: {e}")))?;
                gl.shader_source(stage, source);
                gl.compile_shader(stage);
                if !gl.get_shader_compile_status(stage) {
                    let log = gl.get_shader_info_log(stage);
                    gl.delete_shader(stage);
                    stages.into_iter().for_each(|s| gl.delete_shader(s));
                    gl.delete_program(program);
                    return Err(RenderError::ShaderBuildFailed(format!("{id:?} compile: {log}")));
                }
                gl.attach_shader(program, stage);
                stages.push(stage);
            }

            gl.link_program(program);
            for stage in stages {
                gl.detach_shader(program, stage);
                gl.delete_shader(stage);
            }
            if !gl.get_program_link_status(program) {
                let log = gl.get_program_info_log(program);
                gl.delete_program(program);
                return Err(RenderError::ShaderBuildFailed(format!("{id:?} link: {log}")));
            }

            log::debug!("Linked {id:?}");
            Ok(Self {
                gl,
                id,
                program,
                locations: RefCell::new(HashMap::new()),
            })
        }
    }

    /// Which program this is
    pub fn id(&self) -> ShaderId {
        self.id
    }
}

impl ShaderProgram for GlShader {
    fn bind(&self) {
        unsafe { self.gl.use_program(Some(self.program)) }
    }

    fn uniform_location(&self, name: &str) -> Option<UniformLocation> {
        if let Some(&cached) = self.locations.borrow().get(name) {
            return cached;
        }
        let location = unsafe { self.gl.get_uniform_location(self.program, name) }.map(|l| UniformLocation(l.0));
        if location.is_none() {
            log::trace!("{:?} has no active uniform '{name}'", self.id);
        }
        self.locations.borrow_mut().insert(name.to_string(), location);
        location
    }

    fn set_uniform_at(&self, location: UniformLocation, value: UniformValue) {
        let location = glow::NativeUniformLocation(location.0);
        let at = Some(&location);
        unsafe {
            match value {
                UniformValue::Int(v) => self.gl.uniform_1_i32(at, v),
                UniformValue::Bool(v) => self.gl.uniform_1_i32(at, i32::from(v)),
                UniformValue::Float(v) => self.gl.uniform_1_f32(at, v),
                UniformValue::Vec3([x, y, z]) => self.gl.uniform_3_f32(at, x, y, z),
                UniformValue::Vec4([x, y, z, w]) => self.gl.uniform_4_f32(at, x, y, z, w),
                UniformValue::Mat3(m) => self.gl.uniform_matrix_3_f32_slice(at, false, m.as_slice()),
                UniformValue::Mat4(m) => self.gl.uniform_matrix_4_f32_slice(at, false, m.as_slice()),
            }
        }
    }

    fn bind_uniform_block(&self, block: &str, binding: u32, buffer: RawHandle) {
        unsafe {
            let Some(index) = self.gl.get_uniform_block_index(self.program, block) else {
                log::trace!("{:?} has no uniform block '{block}'", self.id);
                return;
            };
            self.gl.uniform_block_binding(self.program, index, binding);
            self.gl
                .bind_buffer_base(glow::UNIFORM_BUFFER, binding, native(buffer, glow::NativeBuffer));
        }
    }
}

impl Drop for GlShader {
    fn drop(&mut self) {
        unsafe { self.gl.delete_program(self.program) }
    }
}
