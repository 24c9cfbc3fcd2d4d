//! Built-in draw geometry
//!
//! Persistent shapes (unit cube, strip quad, two-triangle screen quad) are
//! uploaded once and reused by the environment, bake and screen-space
//! passes. Overlay shapes that change every frame (minimap border, camera
//! dot) go through [`draw_transient`], which uploads, draws and releases in
//! one call.

use std::rc::Rc;

use super::device::{GraphicsDevice, Primitive};
use super::handles::{OwnedBuffer, OwnedVertexArray};
use super::RenderResult;

#[rustfmt::skip]
const CUBE_POSITIONS: [f32; 108] = [
    -1.0,  1.0, -1.0,  -1.0, -1.0, -1.0,   1.0, -1.0, -1.0,
     1.0, -1.0, -1.0,   1.0,  1.0, -1.0,  -1.0,  1.0, -1.0,
    -1.0, -1.0,  1.0,  -1.0, -1.0, -1.0,  -1.0,  1.0, -1.0,
    -1.0,  1.0, -1.0,  -1.0,  1.0,  1.0,  -1.0, -1.0,  1.0,
     1.0, -1.0, -1.0,   1.0, -1.0,  1.0,   1.0,  1.0,  1.0,
     1.0,  1.0,  1.0,   1.0,  1.0, -1.0,   1.0, -1.0, -1.0,
    -1.0, -1.0,  1.0,  -1.0,  1.0,  1.0,   1.0,  1.0,  1.0,
     1.0,  1.0,  1.0,   1.0, -1.0,  1.0,  -1.0, -1.0,  1.0,
    -1.0,  1.0, -1.0,   1.0,  1.0, -1.0,   1.0,  1.0,  1.0,
     1.0,  1.0,  1.0,  -1.0,  1.0,  1.0,  -1.0,  1.0, -1.0,
    -1.0, -1.0, -1.0,  -1.0, -1.0,  1.0,   1.0, -1.0, -1.0,
     1.0, -1.0, -1.0,  -1.0, -1.0,  1.0,   1.0, -1.0,  1.0,
];

/// Position + uv, drawn as a strip
#[rustfmt::skip]
const STRIP_QUAD: [f32; 20] = [
    -1.0,  1.0, 0.0,  0.0, 1.0,
    -1.0, -1.0, 0.0,  0.0, 0.0,
     1.0,  1.0, 0.0,  1.0, 1.0,
     1.0, -1.0, 0.0,  1.0, 0.0,
];

/// 2D position + uv, two triangles
#[rustfmt::skip]
const SCREEN_QUAD: [f32; 24] = [
    -1.0,  1.0,  0.0, 1.0,
    -1.0, -1.0,  0.0, 0.0,
     1.0, -1.0,  1.0, 0.0,

    -1.0,  1.0,  0.0, 1.0,
     1.0, -1.0,  1.0, 0.0,
     1.0,  1.0,  1.0, 1.0,
];

/// Non-indexed vertex array with a fixed draw call
pub struct StaticShape {
    device: Rc<dyn GraphicsDevice>,
    vao: OwnedVertexArray,
    _vbo: OwnedBuffer,
    primitive: Primitive,
    count: i32,
}

impl StaticShape {
    /// Upload interleaved `vertices` laid out as `attributes` component counts
    pub fn upload(
        device: Rc<dyn GraphicsDevice>,
        vertices: &[f32],
        attributes: &[u32],
        primitive: Primitive,
    ) -> RenderResult<Self> {
        let stride: u32 = attributes.iter().sum();
        let handles = device.create_geometry(vertices, attributes, None)?;
        Ok(Self {
            vao: OwnedVertexArray::new(Rc::clone(&device), handles.vao),
            _vbo: OwnedBuffer::new(Rc::clone(&device), handles.vbo),
            device,
            primitive,
            count: (vertices.len() as u32 / stride.max(1)) as i32,
        })
    }

    /// Issue the draw
    pub fn draw(&self) {
        self.device.draw_arrays(self.vao.raw(), self.primitive, 0, self.count);
    }

    /// Vertex array name
    pub fn vao(&self) -> super::device::RawHandle {
        self.vao.raw()
    }

    /// Vertices per draw
    pub fn vertex_count(&self) -> i32 {
        self.count
    }
}

/// Shapes shared by the environment, bake and screen-space passes
pub struct StaticGeometry {
    /// Unit cube, 36 vertices
    pub cube: StaticShape,
    /// Four-vertex strip quad used by the BRDF bake and the SSAO passes
    pub quad: StaticShape,
    /// Six-vertex quad used by post-processing
    pub screen_quad: StaticShape,
}

impl StaticGeometry {
    /// Upload every shape
    pub fn new(device: &Rc<dyn GraphicsDevice>) -> RenderResult<Self> {
        Ok(Self {
            cube: StaticShape::upload(Rc::clone(device), &CUBE_POSITIONS, &[3], Primitive::Triangles)?,
            quad: StaticShape::upload(Rc::clone(device), &STRIP_QUAD, &[3, 2], Primitive::TriangleStrip)?,
            screen_quad: StaticShape::upload(Rc::clone(device), &SCREEN_QUAD, &[2, 2], Primitive::Triangles)?,
        })
    }
}

/// Upload 3-component positions, draw them once, release the buffers
pub fn draw_transient(device: &Rc<dyn GraphicsDevice>, positions: &[f32], primitive: Primitive) -> RenderResult<()> {
    let shape = StaticShape::upload(Rc::clone(device), positions, &[3], primitive)?;
    shape.draw();
    Ok(())
}
