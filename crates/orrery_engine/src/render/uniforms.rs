//! # Uniform Blocks
//!
//! CPU mirrors of the std140 uniform blocks the shaders declare. Every `vec3`
//! occupies a 16-byte slot, so each is followed by an explicit padding field;
//! GLSL `bool` is four bytes in std140, hence the `u32` flags. Sizes are
//! asserted at compile time.
//!
//! Blocks are snapshots: each upload creates a new GPU buffer through the
//! [`UniformArena`], which keeps the current frame's buffers alive until the
//! next [`UniformArena::begin_frame`].

use bytemuck::{Pod, Zeroable};
use std::rc::Rc;

use super::device::{GraphicsDevice, RawHandle};
use super::handles::OwnedBuffer;
use super::RenderResult;

/// Upper bound on lights in the `lights` array block
pub const MAX_LIGHT: usize = 10;

/// Blinn-Phong material, block name `Material`
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct MaterialBlock {
    /// Diffuse color
    pub kd: [f32; 3],
    /// Padding to 16 bytes
    pub _padding0: f32,
    /// Specular color
    pub ks: [f32; 3],
    /// Specular exponent
    pub shininess: f32,
    /// Opacity
    pub transparency: f32,
    /// Padding to 48 bytes
    pub _padding1: [f32; 3],
}

/// One light, block name `Light`
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct LightBlock {
    /// World-space position
    pub position: [f32; 3],
    /// Padding to 16 bytes
    pub _padding0: f32,
    /// Light color
    pub color: [f32; 3],
    /// Padding to 16 bytes
    pub _padding1: f32,
    /// Spot direction
    pub direction: [f32; 3],
    /// Padding to 16 bytes
    pub _padding2: f32,
    /// Nonzero for a spotlight
    pub is_spotlight: u32,
    /// Nonzero when the light projects a texture
    pub has_texture: u32,
    /// Padding to 64 bytes
    pub _padding3: [u32; 2],
}

/// Fixed-capacity light list, block name `lights`.
///
/// Unused slots are zeroed; the live count goes in the `lightCount` uniform.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct LightArrayBlock {
    /// Light slots
    pub lights: [LightBlock; MAX_LIGHT],
}

/// Shadow toggles, block name `shadowSettings`
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct ShadowSettingBlock {
    /// Nonzero when shadows are sampled
    pub shadow_enabled: u32,
    /// Nonzero for percentage-closer filtering
    pub pcf_enabled: u32,
    /// Padding to 16 bytes
    pub _padding: [u32; 2],
}

/// Metal/roughness material, block name `PBR_Material`
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct PbrMaterialBlock {
    /// Base color
    pub albedo: [f32; 3],
    /// Metalness in [0, 1]
    pub metallic: f32,
    /// Roughness in [0, 1]
    pub roughness: f32,
    /// Ambient occlusion factor
    pub ao: f32,
    /// Padding to 32 bytes
    pub _padding: [f32; 2],
}

const _: () = assert!(std::mem::size_of::<MaterialBlock>() == 48);
const _: () = assert!(std::mem::size_of::<LightBlock>() == 64);
const _: () = assert!(std::mem::size_of::<LightArrayBlock>() == 64 * MAX_LIGHT);
const _: () = assert!(std::mem::size_of::<ShadowSettingBlock>() == 16);
const _: () = assert!(std::mem::size_of::<PbrMaterialBlock>() == 32);

impl LightArrayBlock {
    /// Pack up to [`MAX_LIGHT`] lights; extras are dropped
    pub fn pack(lights: impl IntoIterator<Item = LightBlock>) -> (Self, usize) {
        let mut block = Self::zeroed();
        let mut count = 0;
        for (slot, light) in block.lights.iter_mut().zip(lights) {
            *slot = light;
            count += 1;
        }
        (block, count)
    }
}

impl ShadowSettingBlock {
    /// Build from the two toggles
    pub fn new(shadow_enabled: bool, pcf_enabled: bool) -> Self {
        Self {
            shadow_enabled: shadow_enabled.into(),
            pcf_enabled: pcf_enabled.into(),
            _padding: [0; 2],
        }
    }
}

/// Creates a fresh buffer for every uploaded snapshot
///
/// Buffers live until the next [`begin_frame`](Self::begin_frame), which
/// bounds GPU memory to one frame's worth of uploads.
pub struct UniformArena {
    device: Rc<dyn GraphicsDevice>,
    frame_buffers: Vec<OwnedBuffer>,
    total_created: u64,
}

impl UniformArena {
    /// Empty arena
    pub fn new(device: Rc<dyn GraphicsDevice>) -> Self {
        Self {
            device,
            frame_buffers: Vec::new(),
            total_created: 0,
        }
    }

    /// Release the previous frame's buffers
    pub fn begin_frame(&mut self) {
        if !self.frame_buffers.is_empty() {
            log::trace!("Releasing {} uniform buffers from previous frame", self.frame_buffers.len());
        }
        self.frame_buffers.clear();
    }

    /// Copy `block` into a new uniform buffer and return its name
    pub fn upload<T: Pod>(&mut self, block: &T) -> RenderResult<RawHandle> {
        let raw = self.device.create_uniform_buffer(bytemuck::bytes_of(block))?;
        self.frame_buffers.push(OwnedBuffer::new(Rc::clone(&self.device), raw));
        self.total_created += 1;
        Ok(raw)
    }

    /// Buffers currently held for this frame
    pub fn live_count(&self) -> usize {
        self.frame_buffers.len()
    }

    /// Buffers created since construction
    pub fn total_created(&self) -> u64 {
        self.total_created
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::device::ResourceClass;
    use crate::render::testing::{Call, RecordingDevice};

    fn light(x: f32) -> LightBlock {
        LightBlock {
            position: [x, 0.0, 0.0],
            color: [1.0; 3],
            ..LightBlock::zeroed()
        }
    }

    #[test]
    fn light_fields_sit_on_std140_offsets() {
        let block = LightBlock {
            position: [1.0, 2.0, 3.0],
            color: [4.0, 5.0, 6.0],
            direction: [7.0, 8.0, 9.0],
            is_spotlight: 1,
            has_texture: 1,
            ..LightBlock::zeroed()
        };
        let words: &[u32] = bytemuck::cast_slice(bytemuck::bytes_of(&block));

        assert_eq!(f32::from_bits(words[4]), 4.0);
        assert_eq!(f32::from_bits(words[8]), 7.0);
        assert_eq!(words[12], 1);
        assert_eq!(words[13], 1);
    }

    #[test]
    fn pack_caps_at_max_light() {
        let (block, count) = LightArrayBlock::pack((0..12).map(|i| light(i as f32)));
        assert_eq!(count, MAX_LIGHT);
        assert_eq!(block.lights[9].position[0], 9.0);
    }

    #[test]
    fn pack_zeroes_unused_slots() {
        let (block, count) = LightArrayBlock::pack([light(1.0), light(2.0)]);
        assert_eq!(count, 2);
        assert_eq!(block.lights[2], LightBlock::zeroed());
    }

    #[test]
    fn arena_creates_fresh_buffers_and_frees_them_next_frame() {
        let device = RecordingDevice::shared();
        let mut arena = UniformArena::new(device.clone());

        let a = arena.upload(&ShadowSettingBlock::new(true, false)).expect("upload");
        let b = arena.upload(&ShadowSettingBlock::new(true, false)).expect("upload");
        assert_ne!(a, b);
        assert_eq!(arena.live_count(), 2);

        arena.begin_frame();
        assert_eq!(arena.live_count(), 0);
        assert_eq!(arena.total_created(), 2);
        assert_eq!(device.count(|c| matches!(c, Call::Release(ResourceClass::Buffer, _))), 2);
    }
}
