//! Image loading utilities for texture data
//!
//! LDR images keep their native channel count so the caller can decide which
//! upload format applies (cubemap faces reject anything but 1, 3 or 4
//! channels). HDR images decode to linear RGB floats.

use crate::assets::AssetError;
use image::DynamicImage;
use std::path::Path;

/// Loaded 8-bit image data ready for GPU upload
#[derive(Debug, Clone)]
pub struct ImageData {
    /// Tightly packed pixel rows, `channels` bytes per pixel
    pub data: Vec<u8>,
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
    /// Number of color channels (1 to 4)
    pub channels: u8,
}

impl ImageData {
    /// Load an image from a file path, preserving its channel count
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, AssetError> {
        let path_ref = path.as_ref();

        log::debug!("Loading image from: {:?}", path_ref);

        if !path_ref.exists() {
            return Err(AssetError::NotFound(path_ref.display().to_string()));
        }

        let img = image::open(path_ref)
            .map_err(|e| AssetError::LoadFailed(format!("Failed to load image {}: {e}", path_ref.display())))?;

        let data = Self::from_dynamic(img);
        log::info!(
            "Loaded image {}x{} ({} channels) from {:?}",
            data.width,
            data.height,
            data.channels,
            path_ref
        );
        Ok(data)
    }

    /// Load image from memory (useful for embedded resources)
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, AssetError> {
        let img = image::load_from_memory(bytes)
            .map_err(|e| AssetError::LoadFailed(format!("Failed to load image from bytes: {e}")))?;
        Ok(Self::from_dynamic(img))
    }

    fn from_dynamic(img: DynamicImage) -> Self {
        let (width, height) = (img.width(), img.height());
        let channels = img.color().channel_count();
        let data = match channels {
            1 => img.into_luma8().into_raw(),
            2 => img.into_luma_alpha8().into_raw(),
            3 => img.into_rgb8().into_raw(),
            _ => img.into_rgba8().into_raw(),
        };
        Self {
            data,
            width,
            height,
            channels: channels.min(4),
        }
    }

    /// Create a solid color image (useful for testing and defaults)
    pub fn solid_color(width: u32, height: u32, color: [u8; 4]) -> Self {
        let pixel_count = (width * height) as usize;
        let data = color.iter().copied().cycle().take(pixel_count * 4).collect();

        Self {
            data,
            width,
            height,
            channels: 4,
        }
    }

    /// Get the size of the image data in bytes
    pub fn size_bytes(&self) -> usize {
        self.data.len()
    }
}

/// Floating point RGB image, rows flipped bottom-up for GL sampling
#[derive(Debug, Clone)]
pub struct HdrImageData {
    /// RGB triples, three floats per pixel
    pub data: Vec<f32>,
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
}

impl HdrImageData {
    /// Load a Radiance `.hdr` (or any decodable format) as linear RGB floats
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, AssetError> {
        let path_ref = path.as_ref();
        if !path_ref.exists() {
            return Err(AssetError::NotFound(path_ref.display().to_string()));
        }

        let img = image::open(path_ref)
            .map_err(|e| AssetError::LoadFailed(format!("Failed to load HDR image {}: {e}", path_ref.display())))?
            .flipv();
        let rgb = img.into_rgb32f();
        let (width, height) = rgb.dimensions();

        log::info!("Loaded HDR image {}x{} from {:?}", width, height, path_ref);

        Ok(Self {
            data: rgb.into_raw(),
            width,
            height,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_solid_color_image() {
        let img = ImageData::solid_color(4, 4, [255, 0, 0, 255]);
        assert_eq!(img.width, 4);
        assert_eq!(img.height, 4);
        assert_eq!(img.channels, 4);
        assert_eq!(img.size_bytes(), 4 * 4 * 4);
        assert_eq!(&img.data[0..4], &[255, 0, 0, 255]);
    }

    #[test]
    fn grayscale_keeps_single_channel() {
        let gray = DynamicImage::new_luma8(3, 2);
        let data = ImageData::from_dynamic(gray);
        assert_eq!(data.channels, 1);
        assert_eq!(data.size_bytes(), 6);
    }

    #[test]
    fn luma_alpha_reports_two_channels() {
        let data = ImageData::from_dynamic(DynamicImage::new_luma_a8(2, 2));
        assert_eq!(data.channels, 2);
    }

    #[test]
    fn missing_file_is_not_found() {
        let err = ImageData::from_file("definitely/not/here.png").unwrap_err();
        assert!(matches!(err, AssetError::NotFound(_)));
    }
}
