//! Image decoder backed by the `image` crate.
//!
//! Decodes any format the `image` build supports (PNG, JPEG, TGA, BMP)
//! straight from memory into the configured pixel layout.

use log::debug;

use super::texture::{FilterMode, PixelFormat, Texture};
use super::traits::Decoder;
use crate::error::LoadError;

/// Stock decoder: bytes -> `Texture`
#[derive(Debug, Clone, Copy)]
pub struct ImageDecoder {
    filter: FilterMode,
    format: PixelFormat,
}

impl ImageDecoder {
    pub fn new(filter: FilterMode, format: PixelFormat) -> Self {
        Self { filter, format }
    }

    pub fn filter(&self) -> FilterMode {
        self.filter
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }
}

impl Default for ImageDecoder {
    fn default() -> Self {
        Self::new(FilterMode::default(), PixelFormat::platform_default())
    }
}

impl Decoder<Texture> for ImageDecoder {
    fn decode(&self, key: &str, bytes: Vec<u8>) -> Result<Texture, LoadError> {
        if bytes.is_empty() {
            return Err(LoadError::EmptyPayload(key.to_string()));
        }

        let img = image::load_from_memory(&bytes)
            .map_err(|e| LoadError::decode(key, format!("Image decode error: {}", e)))?;
        // Input bytes are no longer needed once decoded
        drop(bytes);

        let (width, height) = (img.width(), img.height());
        let pixels = match self.format {
            PixelFormat::Rgba8 => img.to_rgba8().into_raw(),
            PixelFormat::Rgb8 => img.to_rgb8().into_raw(),
        };

        debug!(
            "Decoded '{}': {}x{} {:?} ({} bytes)",
            key,
            width,
            height,
            self.format,
            pixels.len()
        );

        Ok(Texture {
            width,
            height,
            format: self.format,
            filter: self.filter,
            pixels,
        })
    }
}

/// Encode a small solid-color PNG in memory (test fixture)
#[cfg(test)]
pub(crate) fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(width, height, image::Rgba([200, 10, 10, 255]));
    let mut out = std::io::Cursor::new(Vec::new());
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut out, image::ImageFormat::Png)
        .unwrap();
    out.into_inner()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_png_rgba() {
        let decoder = ImageDecoder::new(FilterMode::Point, PixelFormat::Rgba8);
        let tex = decoder.decode("card_ace", png_bytes(4, 3)).unwrap();
        assert_eq!(tex.resolution(), (4, 3));
        assert_eq!(tex.pixels.len(), 4 * 3 * 4);
        assert_eq!(tex.filter, FilterMode::Point);
        assert_eq!(&tex.pixels[..4], &[200, 10, 10, 255]);
    }

    #[test]
    fn test_decode_png_rgb() {
        let decoder = ImageDecoder::new(FilterMode::Bilinear, PixelFormat::Rgb8);
        let tex = decoder.decode("card_ace", png_bytes(2, 2)).unwrap();
        assert_eq!(tex.format, PixelFormat::Rgb8);
        assert_eq!(tex.pixels.len(), 2 * 2 * 3);
    }

    #[test]
    fn test_decode_garbage_fails() {
        let decoder = ImageDecoder::default();
        let err = decoder.decode("bad", vec![1, 2, 3, 4, 5]).unwrap_err();
        assert!(matches!(err, LoadError::Decode { ref key, .. } if key == "bad"));

        let err = decoder.decode("empty", Vec::new()).unwrap_err();
        assert_eq!(err, LoadError::EmptyPayload("empty".into()));
    }
}
