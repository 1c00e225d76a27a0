//! Environment images used as a reflection source by the shading pass.
//!
//! The image is treated as an equirectangular panorama: `u` follows the
//! azimuth and `v` runs from straight up (0) to straight down (1). Live
//! sources such as camera frames are pushed in as new images at runtime.
//!
//! # Supported Formats
//!
//! - PNG
//! - JPEG

use std::path::Path;

use crate::error::TextureError;

/// RGBA8 pixels destined for the environment texture.
#[derive(Debug, Clone, PartialEq)]
pub struct EnvironmentImage {
    /// Raw RGBA pixel data (width * height * 4 bytes).
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl EnvironmentImage {
    /// Wrap raw RGBA data, e.g. a captured video frame.
    pub fn from_rgba(data: Vec<u8>, width: u32, height: u32) -> Result<Self, TextureError> {
        let expected = width as usize * height as usize * 4;
        if data.len() != expected || width == 0 || height == 0 {
            return Err(TextureError::SizeMismatch {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self { data, width, height })
    }

    /// Load and decode an image file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, TextureError> {
        let bytes = std::fs::read(path.as_ref())?;
        Self::from_bytes(&bytes)
    }

    /// Decode an in-memory PNG or JPEG.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TextureError> {
        let img = image::load_from_memory(bytes)?.into_rgba8();
        let (width, height) = img.dimensions();
        Ok(Self {
            data: img.into_raw(),
            width,
            height,
        })
    }

    /// A 1x1 image of one colour.
    pub fn solid(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self {
            data: vec![r, g, b, a],
            width: 1,
            height: 1,
        }
    }

    /// Bytes per pixel row.
    pub fn bytes_per_row(&self) -> u32 {
        self.width * 4
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_rgba_checks_length() {
        assert!(EnvironmentImage::from_rgba(vec![0; 16], 2, 2).is_ok());
        match EnvironmentImage::from_rgba(vec![0; 15], 2, 2) {
            Err(TextureError::SizeMismatch { expected, actual }) => {
                assert_eq!((expected, actual), (16, 15));
            }
            other => panic!("unexpected result {:?}", other),
        }
        assert!(EnvironmentImage::from_rgba(Vec::new(), 0, 0).is_err());
    }

    #[test]
    fn test_decode_png() {
        let mut png = Vec::new();
        let img = image::RgbaImage::from_pixel(3, 2, image::Rgba([10, 20, 30, 255]));
        img.write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
            .unwrap();

        let env = EnvironmentImage::from_bytes(&png).unwrap();
        assert_eq!((env.width, env.height), (3, 2));
        assert_eq!(&env.data[..4], &[10, 20, 30, 255]);
        assert_eq!(env.bytes_per_row(), 12);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = EnvironmentImage::from_file("does/not/exist.png");
        assert!(matches!(result, Err(TextureError::Io(_))));
    }
}
