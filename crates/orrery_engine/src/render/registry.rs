//! # GPU Resource Registry
//!
//! Owns every offscreen render target. Each [`ResourceKind`] is built on its
//! first request and the same target is returned on later requests. A kind
//! whose construction failed is remembered and never retried, so a broken
//! feature costs one error log instead of one per frame.
//!
//! Target sizes are fixed when the registry is created. Resizing the window
//! does not rebuild anything.
//!
//! Dropping the registry (or calling [`RenderTargetRegistry::release_all`])
//! releases every handle; it must happen while the context is still current.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::rc::Rc;

use crate::core::config::{OrreryConfig, RenderConfig};

use super::device::{
    AttachmentPoint, Filter, GraphicsDevice, RawHandle, TextureDesc, TextureFormat, INVALID_HANDLE,
};
use super::handles::{OwnedFramebuffer, OwnedRenderbuffer, OwnedTexture};
use super::{RenderError, RenderResult};

/// Render target families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// Depth-only shadow map
    Shadow,
    /// Position, normal and albedo attachments plus depth
    GBuffer,
    /// Raw ambient occlusion
    Ssao,
    /// Blurred ambient occlusion
    SsaoBlur,
    /// Offscreen scene color plus depth
    PostProcess,
    /// Framebuffer and depth store used by the environment bake
    IblCapture,
}

impl ResourceKind {
    /// Every kind
    pub const ALL: [Self; 6] = [
        Self::Shadow,
        Self::GBuffer,
        Self::Ssao,
        Self::SsaoBlur,
        Self::PostProcess,
        Self::IblCapture,
    ];
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Depth storage of a target
#[derive(Debug)]
pub enum DepthAttachment {
    /// No depth
    None,
    /// Sampleable depth texture
    Texture(OwnedTexture),
    /// Write-only depth store
    Renderbuffer(OwnedRenderbuffer),
}

/// A framebuffer with its attachments
#[derive(Debug)]
pub struct RenderTarget {
    framebuffer: OwnedFramebuffer,
    colors: Vec<OwnedTexture>,
    depth: DepthAttachment,
    width: u32,
    height: u32,
}

/// Copyable summary of a target for use while other targets are borrowed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetView {
    /// Framebuffer name
    pub framebuffer: RawHandle,
    /// Up to three color textures, [`INVALID_HANDLE`] when absent
    pub colors: [RawHandle; 3],
    /// Depth texture or renderbuffer, [`INVALID_HANDLE`] when absent
    pub depth: RawHandle,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl RenderTarget {
    /// Framebuffer name
    pub fn framebuffer(&self) -> RawHandle {
        self.framebuffer.raw()
    }

    /// Color attachment `index`
    pub fn color(&self, index: usize) -> Option<RawHandle> {
        self.colors.get(index).map(OwnedTexture::raw)
    }

    /// Depth storage
    pub fn depth(&self) -> &DepthAttachment {
        &self.depth
    }

    /// `(width, height)`
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Copyable summary
    pub fn view(&self) -> TargetView {
        let mut colors = [INVALID_HANDLE; 3];
        for (slot, texture) in colors.iter_mut().zip(&self.colors) {
            *slot = texture.raw();
        }
        let depth = match &self.depth {
            DepthAttachment::None => INVALID_HANDLE,
            DepthAttachment::Texture(t) => t.raw(),
            DepthAttachment::Renderbuffer(r) => r.raw(),
        };
        TargetView {
            framebuffer: self.framebuffer.raw(),
            colors,
            depth,
            width: self.width,
            height: self.height,
        }
    }
}

/// Fixed sizes every target is built with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetSizes {
    /// G-buffer and SSAO targets
    pub screen: (u32, u32),
    /// Post-process target, matching the default framebuffer
    pub window: (u32, u32),
    /// Square shadow map edge
    pub shadow: u32,
    /// Square capture edge for the environment bake
    pub capture: u32,
}

impl TargetSizes {
    /// Sizes taken from the startup configuration
    pub fn from_config(config: &OrreryConfig) -> Self {
        let RenderConfig {
            screen_size,
            shadow_map_size,
            ibl,
            ..
        } = &config.render;
        Self {
            screen: *screen_size,
            window: (config.window.width, config.window.height),
            shadow: *shadow_map_size,
            capture: ibl.environment,
        }
    }
}

/// Create-once store of render targets
pub struct RenderTargetRegistry {
    device: Rc<dyn GraphicsDevice>,
    sizes: TargetSizes,
    targets: HashMap<ResourceKind, RenderTarget>,
    failed: HashSet<ResourceKind>,
}

impl RenderTargetRegistry {
    /// Empty registry; nothing is allocated until requested
    pub fn new(device: Rc<dyn GraphicsDevice>, sizes: TargetSizes) -> Self {
        Self {
            device,
            sizes,
            targets: HashMap::new(),
            failed: HashSet::new(),
        }
    }

    /// The target for `kind`, building it on first use
    pub fn get_or_create(&mut self, kind: ResourceKind) -> RenderResult<&RenderTarget> {
        if self.failed.contains(&kind) {
            return Err(RenderError::ResourceCreationFailed(format!("{kind} target unavailable")));
        }

        if !self.targets.contains_key(&kind) {
            match self.build(kind) {
                Ok(target) => {
                    log::debug!("Created {kind} target {}x{}", target.width, target.height);
                    self.targets.insert(kind, target);
                }
                Err(e) => {
                    log::error!("Resource creation failure, {kind} disabled: {e}");
                    self.failed.insert(kind);
                    return Err(e);
                }
            }
        }

        self.targets
            .get(&kind)
            .ok_or_else(|| RenderError::ResourceCreationFailed(format!("{kind} target missing")))
    }

    /// Already built target, without creating
    pub fn get(&self, kind: ResourceKind) -> Option<&RenderTarget> {
        self.targets.get(&kind)
    }

    /// Whether `kind` failed and is disabled
    pub fn is_failed(&self, kind: ResourceKind) -> bool {
        self.failed.contains(&kind)
    }

    /// Disable a kind after a failure detected outside the registry
    pub fn mark_failed(&mut self, kind: ResourceKind) {
        self.targets.remove(&kind);
        self.failed.insert(kind);
    }

    /// Forget a failure so the next request builds `kind` again.
    ///
    /// Returns whether `kind` was disabled.
    pub fn clear_failure(&mut self, kind: ResourceKind) -> bool {
        self.failed.remove(&kind)
    }

    /// Number of live targets
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    /// Whether nothing has been built
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Sizes used for construction
    pub fn sizes(&self) -> TargetSizes {
        self.sizes
    }

    /// Release every target
    pub fn release_all(&mut self) {
        if !self.targets.is_empty() {
            log::info!("Releasing {} render targets", self.targets.len());
        }
        self.targets.clear();
    }

    fn texture(&self, desc: &TextureDesc) -> RenderResult<OwnedTexture> {
        Ok(OwnedTexture::new(Rc::clone(&self.device), self.device.create_texture(desc)?))
    }

    fn depth_renderbuffer(&self, framebuffer: RawHandle, (width, height): (u32, u32)) -> RenderResult<OwnedRenderbuffer> {
        let rb = OwnedRenderbuffer::new(Rc::clone(&self.device), self.device.create_renderbuffer()?);
        self.device.renderbuffer_storage(rb.raw(), TextureFormat::Depth24, width, height);
        self.device.attach_renderbuffer(framebuffer, AttachmentPoint::Depth, rb.raw());
        Ok(rb)
    }

    fn build(&self, kind: ResourceKind) -> RenderResult<RenderTarget> {
        let device = &self.device;
        let framebuffer = OwnedFramebuffer::new(Rc::clone(device), device.create_framebuffer()?);
        let fb = framebuffer.raw();

        let (size, color_formats, depth): ((u32, u32), Vec<(TextureFormat, Filter)>, _) = match kind {
            ResourceKind::Shadow => {
                let s = self.sizes.shadow;
                let depth = self.texture(&TextureDesc::texture_2d(TextureFormat::Depth32F, s, s))?;
                device.attach_texture(fb, AttachmentPoint::Depth, depth.raw(), None, 0);
                ((s, s), Vec::new(), DepthAttachment::Texture(depth))
            }
            ResourceKind::GBuffer => {
                let size = self.sizes.screen;
                let depth = self.depth_renderbuffer(fb, size)?;
                (
                    size,
                    vec![
                        (TextureFormat::Rgba16F, Filter::Nearest),
                        (TextureFormat::Rgba16F, Filter::Nearest),
                        (TextureFormat::Rgba8, Filter::Nearest),
                    ],
                    DepthAttachment::Renderbuffer(depth),
                )
            }
            ResourceKind::Ssao | ResourceKind::SsaoBlur => {
                (self.sizes.screen, vec![(TextureFormat::R32F, Filter::Nearest)], DepthAttachment::None)
            }
            ResourceKind::PostProcess => {
                let size = self.sizes.window;
                let depth = self.depth_renderbuffer(fb, size)?;
                (size, vec![(TextureFormat::Rgb8, Filter::Linear)], DepthAttachment::Renderbuffer(depth))
            }
            ResourceKind::IblCapture => {
                let s = self.sizes.capture;
                let depth = self.depth_renderbuffer(fb, (s, s))?;
                ((s, s), Vec::new(), DepthAttachment::Renderbuffer(depth))
            }
        };

        let mut colors = Vec::with_capacity(color_formats.len());
        for (index, &(format, filter)) in color_formats.iter().enumerate() {
            let texture = self.texture(&TextureDesc::texture_2d(format, size.0, size.1).with_filter(filter, filter))?;
            device.attach_texture(fb, AttachmentPoint::Color(index as u32), texture.raw(), None, 0);
            colors.push(texture);
        }
        device.set_draw_buffers(fb, colors.len() as u32);

        // the capture target gets its color attachment per bake pass
        if kind != ResourceKind::IblCapture && !device.framebuffer_complete(fb) {
            return Err(RenderError::IncompleteFramebuffer(kind.to_string()));
        }
        device.bind_framebuffer(None);

        Ok(RenderTarget {
            framebuffer,
            colors,
            depth,
            width: size.0,
            height: size.1,
        })
    }
}

impl Drop for RenderTargetRegistry {
    fn drop(&mut self) {
        self.release_all();
    }
}
