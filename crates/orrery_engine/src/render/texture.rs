//! Sampled textures: 2D images, six-face skyboxes, HDR environments and
//! the SSAO kernel/noise resources.
//!
//! Loading failures never abort the caller. A missing or undecodable image is
//! logged and the texture is left unset; a cubemap face with an unsupported
//! channel count is logged as a configuration error and left unpopulated.

use rand::Rng;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::assets::{AssetError, HdrImageData, ImageData};
use crate::foundation::math::{utils, Vec3};

use super::device::{CubeFace, Filter, GraphicsDevice, TextureData, TextureDesc, TextureFormat, TextureTarget, Wrap};
use super::handles::OwnedTexture;
use super::{RenderError, RenderResult};

/// Edge length of the SSAO rotation-noise tile
pub const SSAO_NOISE_SIZE: u32 = 4;

/// 2D texture with its dimensions
#[derive(Debug)]
pub struct Texture2D {
    texture: OwnedTexture,
    width: u32,
    height: u32,
}

impl Texture2D {
    /// Upload an 8-bit image with a mip chain and repeat wrapping
    pub fn from_image(device: &Rc<dyn GraphicsDevice>, image: &ImageData) -> RenderResult<Self> {
        let format = TextureFormat::for_channels(image.channels).ok_or_else(|| {
            RenderError::ResourceCreationFailed(format!("{} channel image cannot be uploaded", image.channels))
        })?;
        let levels = 32 - image.width.max(image.height).max(1).leading_zeros();
        let desc = TextureDesc::texture_2d(format, image.width, image.height)
            .with_filter(Filter::LinearMipmapLinear, Filter::Linear)
            .with_wrap(Wrap::Repeat)
            .with_mips(levels);

        let texture = OwnedTexture::new(Rc::clone(device), device.create_texture(&desc)?);
        device.upload_texture(
            texture.raw(),
            None,
            0,
            format,
            (image.width, image.height),
            TextureData::Bytes(&image.data),
        )?;
        device.generate_mipmaps(texture.raw(), TextureTarget::Texture2D);

        Ok(Self {
            texture,
            width: image.width,
            height: image.height,
        })
    }

    /// Load from disk; failures are logged and yield `None`
    pub fn load(device: &Rc<dyn GraphicsDevice>, path: &Path) -> Option<Self> {
        let image = ImageData::from_file(path)
            .map_err(|e| log::warn!("Asset load failure, texture unset: {e}"))
            .ok()?;
        Self::from_image(device, &image)
            .map_err(|e| log::error!("Texture upload failed for {}: {e}", path.display()))
            .ok()
    }

    /// Upload linear RGB floats as RGB16F with linear filtering
    pub fn from_hdr(device: &Rc<dyn GraphicsDevice>, image: &HdrImageData) -> RenderResult<Self> {
        let desc = TextureDesc::texture_2d(TextureFormat::Rgb16F, image.width, image.height);
        let texture = OwnedTexture::new(Rc::clone(device), device.create_texture(&desc)?);
        device.upload_texture(
            texture.raw(),
            None,
            0,
            TextureFormat::Rgb16F,
            (image.width, image.height),
            TextureData::Floats(&image.data),
        )?;
        Ok(Self {
            texture,
            width: image.width,
            height: image.height,
        })
    }

    /// Load an equirectangular HDR image; failures are logged and yield `None`
    pub fn load_hdr(device: &Rc<dyn GraphicsDevice>, path: &Path) -> Option<Self> {
        let image = HdrImageData::from_file(path)
            .map_err(|e| log::warn!("Asset load failure, HDR environment unset: {e}"))
            .ok()?;
        Self::from_hdr(device, &image)
            .map_err(|e| log::error!("HDR upload failed for {}: {e}", path.display()))
            .ok()
    }

    /// Wrap an already created texture
    pub fn from_owned(texture: OwnedTexture, width: u32, height: u32) -> Self {
        Self { texture, width, height }
    }

    /// Texture name
    pub fn raw(&self) -> super::device::RawHandle {
        self.texture.raw()
    }

    /// `(width, height)`
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// Cubemap texture
#[derive(Debug)]
pub struct CubeMap {
    texture: OwnedTexture,
    size: u32,
    populated: [bool; 6],
}

impl CubeMap {
    /// Build a skybox from six images in `+X, -X, +Y, -Y, +Z, -Z` order.
    ///
    /// Faces that fail to load or have 2 channels stay unpopulated. Errors
    /// only when no face could be read at all or the texture cannot be made.
    pub fn from_faces(device: &Rc<dyn GraphicsDevice>, paths: &[PathBuf]) -> RenderResult<Self> {
        let images: Vec<Option<ImageData>> = paths
            .iter()
            .take(6)
            .map(|path| {
                let image = ImageData::from_file(path)
                    .map_err(|e| log::warn!("Asset load failure for skybox face: {e}"))
                    .ok()?;
                if matches!(image.channels, 1 | 3 | 4) {
                    Some(image)
                } else {
                    let err = AssetError::UnsupportedChannels {
                        path: path.display().to_string(),
                        channels: image.channels,
                    };
                    log::error!("Configuration error, face left unpopulated: {err}");
                    None
                }
            })
            .collect();

        let size = images
            .iter()
            .flatten()
            .map(|image| image.width)
            .next()
            .ok_or_else(|| RenderError::ResourceCreationFailed("no readable skybox face".into()))?;

        let desc = TextureDesc::cube_map(TextureFormat::Rgb8, size);
        let texture = OwnedTexture::new(Rc::clone(device), device.create_texture(&desc)?);
        let mut populated = [false; 6];

        for ((face, image), slot) in CubeFace::ALL.iter().zip(&images).zip(populated.iter_mut()) {
            let Some(image) = image else { continue };
            let Some(format) = TextureFormat::for_channels(image.channels) else { continue };
            device.upload_texture(
                texture.raw(),
                Some(*face),
                0,
                format,
                (image.width, image.height),
                TextureData::Bytes(&image.data),
            )?;
            *slot = true;
        }

        log::info!(
            "Skybox cubemap {}x{} with {}/6 faces",
            size,
            size,
            populated.iter().filter(|&&p| p).count()
        );
        Ok(Self {
            texture,
            size,
            populated,
        })
    }

    /// Empty render-target cubemap (RGB16F) of edge `size` with `mips` levels
    pub fn render_target(device: &Rc<dyn GraphicsDevice>, size: u32, mips: u32) -> RenderResult<Self> {
        let min_filter = if mips > 1 {
            Filter::LinearMipmapLinear
        } else {
            Filter::Linear
        };
        let desc = TextureDesc::cube_map(TextureFormat::Rgb16F, size)
            .with_filter(min_filter, Filter::Linear)
            .with_mips(mips);
        let texture = OwnedTexture::new(Rc::clone(device), device.create_texture(&desc)?);
        if mips > 1 {
            device.generate_mipmaps(texture.raw(), TextureTarget::CubeMap);
        }
        Ok(Self {
            texture,
            size,
            populated: [true; 6],
        })
    }

    /// Texture name
    pub fn raw(&self) -> super::device::RawHandle {
        self.texture.raw()
    }

    /// Face edge length of level 0
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Whether `face` holds image data
    pub fn is_populated(&self, face: CubeFace) -> bool {
        self.populated[face.index() as usize]
    }
}

/// Hemisphere sample kernel, denser near the origin
pub fn ssao_kernel(rng: &mut impl Rng, size: usize) -> Vec<Vec3> {
    (0..size)
        .map(|i| {
            let sample = Vec3::new(
                rng.gen::<f32>() * 2.0 - 1.0,
                rng.gen::<f32>() * 2.0 - 1.0,
                rng.gen::<f32>(),
            )
            .try_normalize(f32::EPSILON)
            .unwrap_or_else(Vec3::z);
            let scale = i as f32 / size.max(1) as f32;
            sample * rng.gen::<f32>() * utils::lerp(0.1, 1.0, scale * scale)
        })
        .collect()
}

/// 4x4 RGBA32F tile of random tangent-plane rotations, repeat-wrapped
pub fn ssao_noise_texture(device: &Rc<dyn GraphicsDevice>, rng: &mut impl Rng) -> RenderResult<OwnedTexture> {
    let texels = (SSAO_NOISE_SIZE * SSAO_NOISE_SIZE) as usize;
    let noise: Vec<f32> = (0..texels)
        .flat_map(|_| [rng.gen::<f32>() * 2.0 - 1.0, rng.gen::<f32>() * 2.0 - 1.0, 0.0, 0.0])
        .collect();

    let desc = TextureDesc::texture_2d(TextureFormat::Rgba32F, SSAO_NOISE_SIZE, SSAO_NOISE_SIZE)
        .with_filter(Filter::Nearest, Filter::Nearest)
        .with_wrap(Wrap::Repeat);
    let texture = OwnedTexture::new(Rc::clone(device), device.create_texture(&desc)?);
    device.upload_texture(
        texture.raw(),
        None,
        0,
        TextureFormat::Rgba32F,
        (SSAO_NOISE_SIZE, SSAO_NOISE_SIZE),
        TextureData::Floats(&noise),
    )?;
    Ok(texture)
}
