//! [`GraphicsDevice`] over `glow`

use std::rc::Rc;

use glow::HasContext;

use super::native;
use crate::render::device::{
    AttachmentPoint, Capability, ClearMask, CubeFace, DepthFunc, Filter, GeometryHandles, GraphicsDevice, PolygonMode,
    Primitive, RawHandle, ResourceClass, TextureData, TextureDesc, TextureFormat, TextureTarget, Wrap,
    INVALID_HANDLE,
};
use crate::render::{RenderError, RenderResult};

/// OpenGL implementation of the device contract
pub struct GlDevice {
    gl: Rc<glow::Context>,
}

impl GlDevice {
    /// Wrap a context whose function pointers are already loaded
    pub fn new(gl: Rc<glow::Context>) -> Self {
        unsafe {
            log::info!(
                "OpenGL device: {} ({})",
                gl.get_parameter_string(glow::RENDERER),
                gl.get_parameter_string(glow::VERSION)
            );
        }
        Self { gl }
    }

    /// Shared context for shader programs
    pub fn context(&self) -> Rc<glow::Context> {
        Rc::clone(&self.gl)
    }
}

/// `(internal format, pixel format, component type)`
fn format_triple(format: TextureFormat) -> (i32, u32, u32) {
    let (internal, pixel, ty) = match format {
        TextureFormat::R8 => (glow::R8, glow::RED, glow::UNSIGNED_BYTE),
        TextureFormat::Rg8 => (glow::RG8, glow::RG, glow::UNSIGNED_BYTE),
        TextureFormat::Rgb8 => (glow::RGB8, glow::RGB, glow::UNSIGNED_BYTE),
        TextureFormat::Rgba8 => (glow::RGBA8, glow::RGBA, glow::UNSIGNED_BYTE),
        TextureFormat::R32F => (glow::R32F, glow::RED, glow::FLOAT),
        TextureFormat::Rg16F => (glow::RG16F, glow::RG, glow::FLOAT),
        TextureFormat::Rgb16F => (glow::RGB16F, glow::RGB, glow::FLOAT),
        TextureFormat::Rgba16F => (glow::RGBA16F, glow::RGBA, glow::FLOAT),
        TextureFormat::Rgba32F => (glow::RGBA32F, glow::RGBA, glow::FLOAT),
        TextureFormat::Depth24 => (glow::DEPTH_COMPONENT24, glow::DEPTH_COMPONENT, glow::FLOAT),
        TextureFormat::Depth32F => (glow::DEPTH_COMPONENT32F, glow::DEPTH_COMPONENT, glow::FLOAT),
    };
    (internal as i32, pixel, ty)
}

fn target_enum(target: TextureTarget) -> u32 {
    match target {
        TextureTarget::Texture2D => glow::TEXTURE_2D,
        TextureTarget::CubeMap => glow::TEXTURE_CUBE_MAP,
    }
}

/// Image target of a 2D texture or one cubemap face
fn image_target(face: Option<CubeFace>) -> u32 {
    face.map_or(glow::TEXTURE_2D, |f| glow::TEXTURE_CUBE_MAP_POSITIVE_X + f.index())
}

fn filter_enum(filter: Filter) -> i32 {
    (match filter {
        Filter::Nearest => glow::NEAREST,
        Filter::Linear => glow::LINEAR,
        Filter::LinearMipmapLinear => glow::LINEAR_MIPMAP_LINEAR,
    }) as i32
}

fn wrap_enum(wrap: Wrap) -> i32 {
    (match wrap {
        Wrap::Repeat => glow::REPEAT,
        Wrap::ClampToEdge => glow::CLAMP_TO_EDGE,
    }) as i32
}

fn attachment_enum(point: AttachmentPoint) -> u32 {
    match point {
        AttachmentPoint::Color(index) => glow::COLOR_ATTACHMENT0 + index,
        AttachmentPoint::Depth => glow::DEPTH_ATTACHMENT,
    }
}

fn primitive_enum(primitive: Primitive) -> u32 {
    match primitive {
        Primitive::Triangles => glow::TRIANGLES,
        Primitive::TriangleStrip => glow::TRIANGLE_STRIP,
        Primitive::Points => glow::POINTS,
        Primitive::LineLoop => glow::LINE_LOOP,
    }
}

fn capability_enum(capability: Capability) -> u32 {
    match capability {
        Capability::DepthTest => glow::DEPTH_TEST,
        Capability::CullFace => glow::CULL_FACE,
        Capability::SeamlessCubeMap => glow::TEXTURE_CUBE_MAP_SEAMLESS,
    }
}

fn texture(handle: RawHandle) -> Option<glow::NativeTexture> {
    native(handle, glow::NativeTexture)
}

fn framebuffer(handle: RawHandle) -> Option<glow::NativeFramebuffer> {
    native(handle, glow::NativeFramebuffer)
}

fn renderbuffer(handle: RawHandle) -> Option<glow::NativeRenderbuffer> {
    native(handle, glow::NativeRenderbuffer)
}

fn backend_error(what: &str) -> impl FnOnce(String) -> RenderError + '_ {
    move |e| RenderError::ResourceCreationFailed(format!("{what}: {e}"))
}

impl GraphicsDevice for GlDevice {
    fn create_texture(&self, desc: &TextureDesc) -> RenderResult<RawHandle> {
        let (internal, pixel, ty) = format_triple(desc.format);
        let target = target_enum(desc.target);
        unsafe {
            let tex = self.gl.create_texture().map_err(backend_error("texture"))?;
            self.gl.bind_texture(target, Some(tex));

            let faces: Vec<Option<CubeFace>> = match desc.target {
                TextureTarget::Texture2D => vec![None],
                TextureTarget::CubeMap => CubeFace::ALL.iter().copied().map(Some).collect(),
            };
            for level in 0..desc.mip_levels {
                let width = (desc.width >> level).max(1) as i32;
                let height = (desc.height >> level).max(1) as i32;
                for &face in &faces {
                    self.gl
                        .tex_image_2d(image_target(face), level as i32, internal, width, height, 0, pixel, ty, None);
                }
            }

            self.gl.tex_parameter_i32(target, glow::TEXTURE_MIN_FILTER, filter_enum(desc.min_filter));
            self.gl.tex_parameter_i32(target, glow::TEXTURE_MAG_FILTER, filter_enum(desc.mag_filter));
            for axis in [glow::TEXTURE_WRAP_S, glow::TEXTURE_WRAP_T, glow::TEXTURE_WRAP_R] {
                self.gl.tex_parameter_i32(target, axis, wrap_enum(desc.wrap));
            }
            self.gl.tex_parameter_i32(target, glow::TEXTURE_MAX_LEVEL, desc.mip_levels as i32 - 1);
            self.gl.bind_texture(target, None);

            log::debug!("Created {:?} {:?} {}x{}", desc.target, desc.format, desc.width, desc.height);
            Ok(tex.0.get())
        }
    }

    fn upload_texture(
        &self,
        texture_handle: RawHandle,
        face: Option<CubeFace>,
        level: u32,
        format: TextureFormat,
        size: (u32, u32),
        data: TextureData<'_>,
    ) -> RenderResult<()> {
        let tex = texture(texture_handle)
            .ok_or_else(|| RenderError::ResourceCreationFailed("upload into an invalid texture".into()))?;
        let (internal, pixel, ty) = format_triple(format);
        let bytes: Option<&[u8]> = match data {
            TextureData::Empty => None,
            TextureData::Bytes(bytes) => Some(bytes),
            TextureData::Floats(floats) => Some(bytemuck::cast_slice(floats)),
        };
        let bind_target = if face.is_some() { glow::TEXTURE_CUBE_MAP } else { glow::TEXTURE_2D };
        unsafe {
            self.gl.bind_texture(bind_target, Some(tex));
            self.gl.pixel_store_i32(glow::UNPACK_ALIGNMENT, 1);
            self.gl.tex_image_2d(
                image_target(face),
                level as i32,
                internal,
                size.0 as i32,
                size.1 as i32,
                0,
                pixel,
                ty,
                bytes,
            );
            self.gl.bind_texture(bind_target, None);
        }
        Ok(())
    }

    fn generate_mipmaps(&self, texture_handle: RawHandle, target: TextureTarget) {
        let target = target_enum(target);
        unsafe {
            self.gl.bind_texture(target, texture(texture_handle));
            self.gl.generate_mipmap(target);
            self.gl.bind_texture(target, None);
        }
    }

    fn create_framebuffer(&self) -> RenderResult<RawHandle> {
        unsafe {
            let fb = self.gl.create_framebuffer().map_err(backend_error("framebuffer"))?;
            Ok(fb.0.get())
        }
    }

    fn create_renderbuffer(&self) -> RenderResult<RawHandle> {
        unsafe {
            let rb = self.gl.create_renderbuffer().map_err(backend_error("renderbuffer"))?;
            Ok(rb.0.get())
        }
    }

    fn renderbuffer_storage(&self, handle: RawHandle, format: TextureFormat, width: u32, height: u32) {
        let (internal, _, _) = format_triple(format);
        unsafe {
            self.gl.bind_renderbuffer(glow::RENDERBUFFER, renderbuffer(handle));
            self.gl
                .renderbuffer_storage(glow::RENDERBUFFER, internal as u32, width as i32, height as i32);
        }
    }

    fn attach_texture(
        &self,
        fb: RawHandle,
        point: AttachmentPoint,
        texture_handle: RawHandle,
        face: Option<CubeFace>,
        level: u32,
    ) {
        unsafe {
            self.gl.bind_framebuffer(glow::FRAMEBUFFER, framebuffer(fb));
            self.gl.framebuffer_texture_2d(
                glow::FRAMEBUFFER,
                attachment_enum(point),
                image_target(face),
                texture(texture_handle),
                level as i32,
            );
        }
    }

    fn attach_renderbuffer(&self, fb: RawHandle, point: AttachmentPoint, rb: RawHandle) {
        unsafe {
            self.gl.bind_framebuffer(glow::FRAMEBUFFER, framebuffer(fb));
            self.gl
                .framebuffer_renderbuffer(glow::FRAMEBUFFER, attachment_enum(point), glow::RENDERBUFFER, renderbuffer(rb));
        }
    }

    fn set_draw_buffers(&self, fb: RawHandle, count: u32) {
        unsafe {
            self.gl.bind_framebuffer(glow::FRAMEBUFFER, framebuffer(fb));
            if count == 0 {
                self.gl.draw_buffer(glow::NONE);
                self.gl.read_buffer(glow::NONE);
            } else {
                let outputs: Vec<u32> = (0..count).map(|i| glow::COLOR_ATTACHMENT0 + i).collect();
                self.gl.draw_buffers(&outputs);
            }
        }
    }

    fn framebuffer_complete(&self, fb: RawHandle) -> bool {
        unsafe {
            self.gl.bind_framebuffer(glow::FRAMEBUFFER, framebuffer(fb));
            let status = self.gl.check_framebuffer_status(glow::FRAMEBUFFER);
            self.gl.bind_framebuffer(glow::FRAMEBUFFER, None);
            if status != glow::FRAMEBUFFER_COMPLETE {
                log::error!("Framebuffer {fb} status 0x{status:x}");
            }
            status == glow::FRAMEBUFFER_COMPLETE
        }
    }

    fn create_uniform_buffer(&self, bytes: &[u8]) -> RenderResult<RawHandle> {
        unsafe {
            let buffer = self.gl.create_buffer().map_err(backend_error("uniform buffer"))?;
            self.gl.bind_buffer(glow::UNIFORM_BUFFER, Some(buffer));
            self.gl.buffer_data_u8_slice(glow::UNIFORM_BUFFER, bytes, glow::STATIC_DRAW);
            self.gl.bind_buffer(glow::UNIFORM_BUFFER, None);
            Ok(buffer.0.get())
        }
    }

    fn create_geometry(&self, vertices: &[f32], attributes: &[u32], indices: Option<&[u32]>) -> RenderResult<GeometryHandles> {
        let stride: u32 = attributes.iter().sum();
        unsafe {
            let vao = self.gl.create_vertex_array().map_err(backend_error("vertex array"))?;
            let vbo = self.gl.create_buffer().map_err(backend_error("vertex buffer"))?;
            self.gl.bind_vertex_array(Some(vao));
            self.gl.bind_buffer(glow::ARRAY_BUFFER, Some(vbo));
            self.gl
                .buffer_data_u8_slice(glow::ARRAY_BUFFER, bytemuck::cast_slice(vertices), glow::STATIC_DRAW);

            let mut offset = 0;
            for (index, &components) in attributes.iter().enumerate() {
                self.gl.enable_vertex_attrib_array(index as u32);
                self.gl.vertex_attrib_pointer_f32(
                    index as u32,
                    components as i32,
                    glow::FLOAT,
                    false,
                    (stride * 4) as i32,
                    (offset * 4) as i32,
                );
                offset += components;
            }

            let ibo = match indices {
                Some(indices) => {
                    let ibo = self.gl.create_buffer().map_err(backend_error("index buffer"))?;
                    self.gl.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, Some(ibo));
                    self.gl
                        .buffer_data_u8_slice(glow::ELEMENT_ARRAY_BUFFER, bytemuck::cast_slice(indices), glow::STATIC_DRAW);
                    Some(ibo.0.get())
                }
                None => None,
            };
            self.gl.bind_vertex_array(None);
            self.gl.bind_buffer(glow::ARRAY_BUFFER, None);

            Ok(GeometryHandles {
                vao: vao.0.get(),
                vbo: vbo.0.get(),
                ibo,
            })
        }
    }

    fn release(&self, class: ResourceClass, handle: RawHandle) {
        if handle == INVALID_HANDLE {
            return;
        }
        unsafe {
            match class {
                ResourceClass::Texture => texture(handle).into_iter().for_each(|t| self.gl.delete_texture(t)),
                ResourceClass::Framebuffer => framebuffer(handle).into_iter().for_each(|f| self.gl.delete_framebuffer(f)),
                ResourceClass::Renderbuffer => {
                    renderbuffer(handle).into_iter().for_each(|r| self.gl.delete_renderbuffer(r));
                }
                ResourceClass::Buffer => {
                    native(handle, glow::NativeBuffer).into_iter().for_each(|b| self.gl.delete_buffer(b));
                }
                ResourceClass::VertexArray => {
                    native(handle, glow::NativeVertexArray).into_iter().for_each(|v| self.gl.delete_vertex_array(v));
                }
            }
        }
    }

    fn bind_framebuffer(&self, fb: Option<RawHandle>) {
        unsafe { self.gl.bind_framebuffer(glow::FRAMEBUFFER, fb.and_then(framebuffer)) }
    }

    fn viewport(&self, x: i32, y: i32, width: i32, height: i32) {
        unsafe { self.gl.viewport(x, y, width, height) }
    }

    fn clear_color(&self, [r, g, b, a]: [f32; 4]) {
        unsafe { self.gl.clear_color(r, g, b, a) }
    }

    fn clear(&self, mask: ClearMask) {
        let mut bits = 0;
        if mask.contains(ClearMask::COLOR) {
            bits |= glow::COLOR_BUFFER_BIT;
        }
        if mask.contains(ClearMask::DEPTH) {
            bits |= glow::DEPTH_BUFFER_BIT;
        }
        unsafe { self.gl.clear(bits) }
    }

    fn set_capability(&self, capability: Capability, enabled: bool) {
        unsafe {
            if enabled {
                self.gl.enable(capability_enum(capability));
            } else {
                self.gl.disable(capability_enum(capability));
            }
        }
    }

    fn depth_func(&self, func: DepthFunc) {
        let func = match func {
            DepthFunc::Less => glow::LESS,
            DepthFunc::LessEqual => glow::LEQUAL,
        };
        unsafe { self.gl.depth_func(func) }
    }

    fn polygon_mode(&self, mode: PolygonMode) {
        let mode = match mode {
            PolygonMode::Fill => glow::FILL,
            PolygonMode::Line => glow::LINE,
        };
        unsafe { self.gl.polygon_mode(glow::FRONT_AND_BACK, mode) }
    }

    fn point_size(&self, size: f32) {
        unsafe { self.gl.point_size(size) }
    }

    fn bind_texture(&self, unit: u32, target: TextureTarget, texture_handle: Option<RawHandle>) {
        unsafe {
            self.gl.active_texture(glow::TEXTURE0 + unit);
            self.gl.bind_texture(target_enum(target), texture_handle.and_then(texture));
        }
    }

    fn blit_depth(
        &self,
        source: RawHandle,
        (src_w, src_h): (u32, u32),
        destination: Option<RawHandle>,
        (dst_w, dst_h): (u32, u32),
    ) {
        unsafe {
            self.gl.bind_framebuffer(glow::READ_FRAMEBUFFER, framebuffer(source));
            self.gl.bind_framebuffer(glow::DRAW_FRAMEBUFFER, destination.and_then(framebuffer));
            // depth only allows NEAREST filtering
            self.gl.blit_framebuffer(
                0,
                0,
                src_w as i32,
                src_h as i32,
                0,
                0,
                dst_w as i32,
                dst_h as i32,
                glow::DEPTH_BUFFER_BIT,
                glow::NEAREST,
            );
            self.gl.bind_framebuffer(glow::FRAMEBUFFER, destination.and_then(framebuffer));
        }
    }

    fn draw_arrays(&self, vao: RawHandle, primitive: Primitive, first: i32, count: i32) {
        unsafe {
            self.gl.bind_vertex_array(native(vao, glow::NativeVertexArray));
            self.gl.draw_arrays(primitive_enum(primitive), first, count);
            self.gl.bind_vertex_array(None);
        }
    }

    fn draw_elements(&self, vao: RawHandle, primitive: Primitive, count: i32) {
        unsafe {
            self.gl.bind_vertex_array(native(vao, glow::NativeVertexArray));
            self.gl.draw_elements(primitive_enum(primitive), count, glow::UNSIGNED_INT, 0);
            self.gl.bind_vertex_array(None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn float_formats_use_float_components() {
        assert_eq!(format_triple(TextureFormat::Rgb16F), (glow::RGB16F as i32, glow::RGB, glow::FLOAT));
        assert_eq!(format_triple(TextureFormat::Rgba8).2, glow::UNSIGNED_BYTE);
    }

    #[test]
    fn cube_faces_map_to_consecutive_targets() {
        assert_eq!(image_target(None), glow::TEXTURE_2D);
        assert_eq!(image_target(Some(CubeFace::NegativeZ)), glow::TEXTURE_CUBE_MAP_NEGATIVE_Z);
    }

    #[test]
    fn attachments_offset_from_color0() {
        assert_eq!(attachment_enum(AttachmentPoint::Color(2)), glow::COLOR_ATTACHMENT2);
        assert_eq!(attachment_enum(AttachmentPoint::Depth), glow::DEPTH_ATTACHMENT);
    }
}
