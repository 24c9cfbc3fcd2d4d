//! # Graphics Device Contract
//!
//! The narrow set of GPU operations the render core issues. The OpenGL
//! backend implements it over `glow`; tests implement it with a recorder that
//! logs every call so pass ordering can be asserted without a context.
//!
//! All methods take `&self`: GPU state is global to the context and the device
//! is shared as `Rc<dyn GraphicsDevice>` between the registry, meshes and
//! handle wrappers. Handles are plain `u32` names; [`INVALID_HANDLE`] marks an
//! empty slot.

use bitflags::bitflags;

use super::RenderResult;

/// Backend-native object name
pub type RawHandle = u32;

/// Sentinel for "no object"; releasing it is a no-op
pub const INVALID_HANDLE: RawHandle = u32::MAX;

/// Which deletion call a handle needs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceClass {
    /// Texture object
    Texture,
    /// Framebuffer object
    Framebuffer,
    /// Renderbuffer object
    Renderbuffer,
    /// Vertex, index or uniform buffer
    Buffer,
    /// Vertex array object
    VertexArray,
}

/// Texture binding target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureTarget {
    /// `TEXTURE_2D`
    Texture2D,
    /// `TEXTURE_CUBE_MAP`
    CubeMap,
}

/// One face of a cubemap, in `+X, -X, +Y, -Y, +Z, -Z` order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CubeFace {
    /// +X
    PositiveX,
    /// -X
    NegativeX,
    /// +Y
    PositiveY,
    /// -Y
    NegativeY,
    /// +Z
    PositiveZ,
    /// -Z
    NegativeZ,
}

impl CubeFace {
    /// All faces in upload order
    pub const ALL: [Self; 6] = [
        Self::PositiveX,
        Self::NegativeX,
        Self::PositiveY,
        Self::NegativeY,
        Self::PositiveZ,
        Self::NegativeZ,
    ];

    /// Offset from `TEXTURE_CUBE_MAP_POSITIVE_X`
    pub fn index(self) -> u32 {
        self as u32
    }
}

/// Internal storage format of a texture or renderbuffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    /// Single 8-bit channel
    R8,
    /// Two 8-bit channels
    Rg8,
    /// 8-bit RGB
    Rgb8,
    /// 8-bit RGBA
    Rgba8,
    /// Single 32-bit float channel
    R32F,
    /// Two half-float channels
    Rg16F,
    /// Half-float RGB
    Rgb16F,
    /// Half-float RGBA
    Rgba16F,
    /// Full-float RGBA
    Rgba32F,
    /// 24-bit depth, renderbuffer use
    Depth24,
    /// 32-bit float depth, sampled shadow maps
    Depth32F,
}

impl TextureFormat {
    /// 8-bit format for an image with `channels` channels, if uploadable
    pub fn for_channels(channels: u8) -> Option<Self> {
        match channels {
            1 => Some(Self::R8),
            2 => Some(Self::Rg8),
            3 => Some(Self::Rgb8),
            4 => Some(Self::Rgba8),
            _ => None,
        }
    }

    /// Whether this is a depth format
    pub fn is_depth(self) -> bool {
        matches!(self, Self::Depth24 | Self::Depth32F)
    }
}

/// Sampler filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Filter {
    /// Nearest texel
    Nearest,
    /// Bilinear
    Linear,
    /// Trilinear across mip levels (minification only)
    LinearMipmapLinear,
}

/// Sampler wrap mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Wrap {
    /// Tile
    Repeat,
    /// Clamp to the edge texel
    ClampToEdge,
}

/// Everything needed to allocate a texture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureDesc {
    /// 2D or cubemap
    pub target: TextureTarget,
    /// Storage format
    pub format: TextureFormat,
    /// Width of level 0
    pub width: u32,
    /// Height of level 0
    pub height: u32,
    /// Minification filter
    pub min_filter: Filter,
    /// Magnification filter
    pub mag_filter: Filter,
    /// Wrap mode on every axis
    pub wrap: Wrap,
    /// Mip levels to allocate (1 = base only)
    pub mip_levels: u32,
}

impl TextureDesc {
    /// Single-level 2D texture with linear filtering and edge clamping
    pub fn texture_2d(format: TextureFormat, width: u32, height: u32) -> Self {
        Self {
            target: TextureTarget::Texture2D,
            format,
            width,
            height,
            min_filter: Filter::Linear,
            mag_filter: Filter::Linear,
            wrap: Wrap::ClampToEdge,
            mip_levels: 1,
        }
    }

    /// Single-level cubemap with square faces of edge `size`
    pub fn cube_map(format: TextureFormat, size: u32) -> Self {
        Self {
            target: TextureTarget::CubeMap,
            ..Self::texture_2d(format, size, size)
        }
    }

    /// Override both filters
    pub fn with_filter(mut self, min: Filter, mag: Filter) -> Self {
        self.min_filter = min;
        self.mag_filter = mag;
        self
    }

    /// Override the wrap mode
    pub fn with_wrap(mut self, wrap: Wrap) -> Self {
        self.wrap = wrap;
        self
    }

    /// Allocate a mip chain of `levels` levels
    pub fn with_mips(mut self, levels: u32) -> Self {
        self.mip_levels = levels.max(1);
        self
    }
}

/// Pixel payload for a texture upload
#[derive(Debug, Clone, Copy)]
pub enum TextureData<'a> {
    /// Allocate storage only
    Empty,
    /// Tightly packed bytes
    Bytes(&'a [u8]),
    /// Tightly packed floats
    Floats(&'a [f32]),
}

/// Framebuffer attachment slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttachmentPoint {
    /// `COLOR_ATTACHMENTn`
    Color(u32),
    /// `DEPTH_ATTACHMENT`
    Depth,
}

/// Depth comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepthFunc {
    /// Pass when closer
    Less,
    /// Pass when closer or equal; used by the sky at depth 1.0
    LessEqual,
}

/// Primitive topology
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
    /// Independent triangles
    Triangles,
    /// Triangle strip
    TriangleStrip,
    /// Points sized by `point_size`
    Points,
    /// Closed line loop
    LineLoop,
}

/// Toggleable fixed-function state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Depth testing
    DepthTest,
    /// Back-face culling
    CullFace,
    /// Filtering across cubemap seams
    SeamlessCubeMap,
}

/// Polygon rasterization mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolygonMode {
    /// Filled polygons
    Fill,
    /// Outlines only
    Line,
}

bitflags! {
    /// Buffers affected by a clear
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ClearMask: u8 {
        /// Color attachments
        const COLOR = 0b01;
        /// Depth attachment
        const DEPTH = 0b10;
    }
}

/// Names created for one vertex array
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeometryHandles {
    /// Vertex array object
    pub vao: RawHandle,
    /// Interleaved vertex buffer
    pub vbo: RawHandle,
    /// Index buffer, if indexed
    pub ibo: Option<RawHandle>,
}

/// GPU operations used by the render core
pub trait GraphicsDevice {
    /// Allocate a texture with storage for every face and level in `desc`
    fn create_texture(&self, desc: &TextureDesc) -> RenderResult<RawHandle>;

    /// Fill one level of a 2D texture (`face == None`) or one cubemap face
    fn upload_texture(
        &self,
        texture: RawHandle,
        face: Option<CubeFace>,
        level: u32,
        format: TextureFormat,
        size: (u32, u32),
        data: TextureData<'_>,
    ) -> RenderResult<()>;

    /// Regenerate the mip chain from level 0
    fn generate_mipmaps(&self, texture: RawHandle, target: TextureTarget);

    /// Create an empty framebuffer object
    fn create_framebuffer(&self) -> RenderResult<RawHandle>;

    /// Create an empty renderbuffer object
    fn create_renderbuffer(&self) -> RenderResult<RawHandle>;

    /// (Re)allocate renderbuffer storage
    fn renderbuffer_storage(&self, renderbuffer: RawHandle, format: TextureFormat, width: u32, height: u32);

    /// Attach a texture level (or cubemap face) to a framebuffer
    fn attach_texture(
        &self,
        framebuffer: RawHandle,
        point: AttachmentPoint,
        texture: RawHandle,
        face: Option<CubeFace>,
        level: u32,
    );

    /// Attach a renderbuffer to a framebuffer
    fn attach_renderbuffer(&self, framebuffer: RawHandle, point: AttachmentPoint, renderbuffer: RawHandle);

    /// Enable `count` color outputs; zero disables color writes entirely
    fn set_draw_buffers(&self, framebuffer: RawHandle, count: u32);

    /// Whether the framebuffer is complete
    fn framebuffer_complete(&self, framebuffer: RawHandle) -> bool;

    /// Create a uniform buffer holding a copy of `bytes`
    fn create_uniform_buffer(&self, bytes: &[u8]) -> RenderResult<RawHandle>;

    /// Create a vertex array over interleaved float vertices.
    ///
    /// `attributes` lists the component count of each attribute in order.
    fn create_geometry(&self, vertices: &[f32], attributes: &[u32], indices: Option<&[u32]>) -> RenderResult<GeometryHandles>;

    /// Delete an object; [`INVALID_HANDLE`] is ignored
    fn release(&self, class: ResourceClass, handle: RawHandle);

    /// Bind a framebuffer, `None` for the default target
    fn bind_framebuffer(&self, framebuffer: Option<RawHandle>);

    /// Set the viewport rectangle
    fn viewport(&self, x: i32, y: i32, width: i32, height: i32);

    /// Set the clear color
    fn clear_color(&self, color: [f32; 4]);

    /// Clear the bound target (depth clears to 1.0)
    fn clear(&self, mask: ClearMask);

    /// Enable or disable fixed-function state
    fn set_capability(&self, capability: Capability, enabled: bool);

    /// Set the depth comparison
    fn depth_func(&self, func: DepthFunc);

    /// Set polygon rasterization for both faces
    fn polygon_mode(&self, mode: PolygonMode);

    /// Rasterized point size
    fn point_size(&self, size: f32);

    /// Bind a texture to a unit, `None` to unbind
    fn bind_texture(&self, unit: u32, target: TextureTarget, texture: Option<RawHandle>);

    /// Copy depth from `source` into `destination` (`None` = default target),
    /// scaling the full source extent onto the full destination extent
    fn blit_depth(
        &self,
        source: RawHandle,
        source_size: (u32, u32),
        destination: Option<RawHandle>,
        destination_size: (u32, u32),
    );

    /// Non-indexed draw
    fn draw_arrays(&self, vao: RawHandle, primitive: Primitive, first: i32, count: i32);

    /// Indexed draw of `count` u32 indices
    fn draw_elements(&self, vao: RawHandle, primitive: Primitive, count: i32);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_counts_map_to_formats() {
        assert_eq!(TextureFormat::for_channels(1), Some(TextureFormat::R8));
        assert_eq!(TextureFormat::for_channels(4), Some(TextureFormat::Rgba8));
        assert_eq!(TextureFormat::for_channels(5), None);
    }

    #[test]
    fn cube_faces_are_in_gl_order() {
        let indices: Vec<u32> = CubeFace::ALL.iter().map(|f| f.index()).collect();
        assert_eq!(indices, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn mip_count_never_zero() {
        let desc = TextureDesc::cube_map(TextureFormat::Rgb16F, 128).with_mips(0);
        assert_eq!(desc.mip_levels, 1);
        assert_eq!(desc.width, desc.height);
    }
}
