//! # Meshes
//!
//! CPU-side [`MeshData`] as produced by the OBJ loader or the built-in
//! primitives, and the uploaded [`GpuMesh`] with its draw contract.
//!
//! Every draw call binds the uniform blocks it depends on immediately before
//! drawing. GPU state is global, so nothing here assumes an earlier draw left
//! a block bound.

use bytemuck::{Pod, Zeroable};
use std::f32::consts::PI;
use std::rc::Rc;

use crate::foundation::math::Mat4;

use super::device::{GraphicsDevice, Primitive, RawHandle};
use super::handles::{OwnedBuffer, OwnedVertexArray};
use super::shader::{bindings, names, ShaderProgram, UniformValue};
use super::uniforms::MaterialBlock;
use super::RenderResult;

/// Interleaved vertex: position, normal, texture coordinate
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    /// Position in model space
    pub position: [f32; 3],
    /// Unit normal
    pub normal: [f32; 3],
    /// Texture coordinates
    pub tex_coord: [f32; 2],
}

impl Vertex {
    /// Component count of each attribute, in shader location order
    pub const ATTRIBUTES: [u32; 3] = [3, 3, 2];

    /// Create a new vertex
    pub fn new(position: [f32; 3], normal: [f32; 3], tex_coord: [f32; 2]) -> Self {
        Self {
            position,
            normal,
            tex_coord,
        }
    }
}

/// Geometry ready for upload
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    /// Vertex list
    pub vertices: Vec<Vertex>,
    /// Triangle list indices
    pub indices: Vec<u32>,
    /// Whether the source provided texture coordinates
    pub has_tex_coords: bool,
}

impl MeshData {
    /// Create from vertices and indices, assuming no texture coordinates
    pub fn new(vertices: Vec<Vertex>, indices: Vec<u32>) -> Self {
        Self {
            vertices,
            indices,
            has_tex_coords: false,
        }
    }

    /// Mark whether texture coordinates are meaningful
    pub fn with_tex_coords(mut self, has_tex_coords: bool) -> Self {
        self.has_tex_coords = has_tex_coords;
        self
    }

    /// Unit cube centred on the origin, one quad per face
    pub fn cube() -> Self {
        let faces: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
            ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
            ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
            ([1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]),
            ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
            ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
            ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
        ];

        let mut vertices = Vec::with_capacity(24);
        let mut indices = Vec::with_capacity(36);
        for (normal, right, up) in faces {
            let base = vertices.len() as u32;
            for (u, v) in [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)] {
                let (su, sv) = (u - 0.5, v - 0.5);
                let position = [
                    0.5 * normal[0] + su * right[0] + sv * up[0],
                    0.5 * normal[1] + su * right[1] + sv * up[1],
                    0.5 * normal[2] + su * right[2] + sv * up[2],
                ];
                vertices.push(Vertex::new(position, normal, [u, v]));
            }
            indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }

        Self::new(vertices, indices).with_tex_coords(true)
    }

    /// Unit-radius UV sphere
    pub fn uv_sphere(stacks: u32, slices: u32) -> Self {
        let stacks = stacks.max(2);
        let slices = slices.max(3);
        let mut vertices = Vec::with_capacity(((stacks + 1) * (slices + 1)) as usize);
        let mut indices = Vec::with_capacity((stacks * slices * 6) as usize);

        for i in 0..=stacks {
            let v = i as f32 / stacks as f32;
            let phi = v * PI;
            for j in 0..=slices {
                let u = j as f32 / slices as f32;
                let theta = u * 2.0 * PI;
                let p = [phi.sin() * theta.cos(), phi.cos(), phi.sin() * theta.sin()];
                vertices.push(Vertex::new(p, p, [u, 1.0 - v]));
            }
        }

        let row = slices + 1;
        for i in 0..stacks {
            for j in 0..slices {
                let a = i * row + j;
                let b = a + row;
                indices.extend_from_slice(&[a, b, a + 1, a + 1, b, b + 1]);
            }
        }

        Self::new(vertices, indices).with_tex_coords(true)
    }

    /// Vertices flattened to the interleaved float stream
    pub fn interleaved(&self) -> &[f32] {
        bytemuck::cast_slice(&self.vertices)
    }
}

/// Uploaded mesh owning its vertex array, buffers and material block
pub struct GpuMesh {
    device: Rc<dyn GraphicsDevice>,
    vao: OwnedVertexArray,
    _vbo: OwnedBuffer,
    _ibo: OwnedBuffer,
    index_count: i32,
    has_tex_coords: bool,
    material: OwnedBuffer,
    material_override: Option<RawHandle>,
}

impl GpuMesh {
    /// Upload geometry and an initial material block
    pub fn upload(device: Rc<dyn GraphicsDevice>, data: &MeshData, material: &MaterialBlock) -> RenderResult<Self> {
        let handles = device.create_geometry(data.interleaved(), &Vertex::ATTRIBUTES, Some(&data.indices))?;
        let vao = OwnedVertexArray::new(Rc::clone(&device), handles.vao);
        let vbo = OwnedBuffer::new(Rc::clone(&device), handles.vbo);
        let ibo = handles.ibo.map_or_else(
            || OwnedBuffer::invalid(Rc::clone(&device)),
            |ibo| OwnedBuffer::new(Rc::clone(&device), ibo),
        );
        let material_raw = device.create_uniform_buffer(bytemuck::bytes_of(material))?;
        let material = OwnedBuffer::new(Rc::clone(&device), material_raw);

        log::debug!(
            "Uploaded mesh: {} vertices, {} indices, vao {}",
            data.vertices.len(),
            data.indices.len(),
            vao.raw()
        );

        Ok(Self {
            device,
            vao,
            _vbo: vbo,
            _ibo: ibo,
            index_count: data.indices.len() as i32,
            has_tex_coords: data.has_tex_coords,
            material,
            material_override: None,
        })
    }

    /// Point `Material` at a per-frame buffer owned elsewhere
    pub fn set_material_buffer(&mut self, buffer: RawHandle) {
        self.material_override = Some(buffer);
    }

    fn material_buffer(&self) -> RawHandle {
        self.material_override.unwrap_or_else(|| self.material.raw())
    }

    fn draw_indexed(&self) {
        self.device.draw_elements(self.vao.raw(), Primitive::Triangles, self.index_count);
    }

    /// Draw with the `Material` block bound
    pub fn draw(&self, shader: &dyn ShaderProgram) {
        shader.bind_uniform_block(names::MATERIAL_BLOCK, bindings::MATERIAL, self.material_buffer());
        self.draw_indexed();
    }

    /// Draw with `Material` plus either `Light` or the `lights` array
    pub fn draw_lit(&self, shader: &dyn ShaderProgram, light_buffer: RawHandle, multi_light: bool) {
        let block = if multi_light {
            names::LIGHTS_BLOCK
        } else {
            names::LIGHT_BLOCK
        };
        shader.bind_uniform_block(names::MATERIAL_BLOCK, bindings::MATERIAL, self.material_buffer());
        shader.bind_uniform_block(block, bindings::LIGHTS, light_buffer);
        self.draw_indexed();
    }

    /// Draw with `PBR_Material` and `lights`
    pub fn draw_pbr(&self, shader: &dyn ShaderProgram, material_buffer: RawHandle, light_buffer: RawHandle) {
        shader.bind_uniform_block(names::PBR_MATERIAL_BLOCK, bindings::MATERIAL, material_buffer);
        shader.bind_uniform_block(names::LIGHTS_BLOCK, bindings::LIGHTS, light_buffer);
        self.draw_indexed();
    }

    /// Draw geometry only
    pub fn draw_basic(&self, shader: &dyn ShaderProgram) {
        shader.bind();
        self.draw_indexed();
    }

    /// Render depth from the light into `framebuffer`, then restore the
    /// default target. The caller clears the depth once per frame.
    pub fn draw_shadow_map(
        &self,
        shadow_shader: &dyn ShaderProgram,
        light_mvp: &Mat4,
        framebuffer: RawHandle,
        width: u32,
        height: u32,
    ) {
        self.device.bind_framebuffer(Some(framebuffer));
        self.device.viewport(0, 0, width as i32, height as i32);
        shadow_shader.bind();
        shadow_shader.set_uniform(names::MVP_MATRIX, UniformValue::Mat4(*light_mvp));
        self.draw_indexed();
        self.device.bind_framebuffer(None);
    }

    /// Whether the source mesh carried texture coordinates
    pub fn has_texture_coords(&self) -> bool {
        self.has_tex_coords
    }

    /// Vertex array name
    pub fn vao(&self) -> RawHandle {
        self.vao.raw()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::shader::ShaderId;
    use crate::render::testing::{Call, MockShader, RecordingDevice};

    fn upload(device: &Rc<RecordingDevice>) -> GpuMesh {
        GpuMesh::upload(device.clone(), &MeshData::cube(), &MaterialBlock::zeroed()).expect("upload")
    }

    #[test]
    fn cube_has_six_quads() {
        let cube = MeshData::cube();
        assert_eq!(cube.vertices.len(), 24);
        assert_eq!(cube.indices.len(), 36);
        assert!(cube.vertices.iter().all(|v| v.position.iter().all(|c| c.abs() <= 0.5 + f32::EPSILON)));
    }

    #[test]
    fn sphere_vertices_lie_on_unit_sphere() {
        let sphere = MeshData::uv_sphere(8, 12);
        for v in &sphere.vertices {
            let len = v.position.iter().map(|c| c * c).sum::<f32>().sqrt();
            approx::assert_relative_eq!(len, 1.0, epsilon = 1e-5);
        }
        assert!(sphere.indices.iter().all(|&i| (i as usize) < sphere.vertices.len()));
    }

    #[test]
    fn draw_lit_binds_light_block_by_mode() {
        let device = RecordingDevice::shared();
        let mesh = upload(&device);
        let shader = MockShader::new(ShaderId::Default, device.clone());

        mesh.draw_lit(&shader, 42, false);
        mesh.draw_lit(&shader, 43, true);

        assert!(device.has(|c| matches!(c, Call::BindBlock(_, name, 1, 42) if name == "Light")));
        assert!(device.has(|c| matches!(c, Call::BindBlock(_, name, 1, 43) if name == "lights")));
        assert_eq!(device.count(|c| matches!(c, Call::DrawElements(_, _, 36))), 2);
    }

    #[test]
    fn material_override_replaces_owned_block() {
        let device = RecordingDevice::shared();
        let mut mesh = upload(&device);
        let shader = MockShader::new(ShaderId::Default, device.clone());

        mesh.set_material_buffer(99);
        mesh.draw(&shader);

        assert!(device.has(|c| matches!(c, Call::BindBlock(_, name, 0, 99) if name == "Material")));
    }

    #[test]
    fn shadow_draw_restores_default_target() {
        let device = RecordingDevice::shared();
        let mesh = upload(&device);
        let shader = MockShader::new(ShaderId::Shadow, device.clone());
        device.clear_log();

        mesh.draw_shadow_map(&shader, &Mat4::identity(), 5, 1024, 1024);

        let calls = device.calls();
        assert_eq!(calls.first(), Some(&Call::BindFramebuffer(Some(5))));
        assert_eq!(calls.last(), Some(&Call::BindFramebuffer(None)));
        assert!(device.has(|c| *c == Call::Viewport(0, 0, 1024, 1024)));
    }
}
