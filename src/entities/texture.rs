//! Decoded texture: the stock resource type.
//!
//! **Why**: Different targets want different pixel layouts:
//! - Desktop: 8-bit RGBA, 4 bytes/pixel
//! - Mobile (iOS/Android): 8-bit RGB, 3 bytes/pixel (less memory per card)
//!
//! **Used by**: `ImageDecoder` (produces), `ResourceCache` (memory accounting)

use serde::{Deserialize, Serialize};

use super::traits::Resource;

/// Destination pixel layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PixelFormat {
    Rgba8, // 4 bytes/pixel
    Rgb8,  // 3 bytes/pixel, no alpha
}

impl PixelFormat {
    /// Reduced format on constrained mobile targets, RGBA elsewhere.
    pub fn platform_default() -> Self {
        if cfg!(any(target_os = "ios", target_os = "android")) {
            PixelFormat::Rgb8
        } else {
            PixelFormat::Rgba8
        }
    }

    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            PixelFormat::Rgba8 => 4,
            PixelFormat::Rgb8 => 3,
        }
    }
}

impl Default for PixelFormat {
    fn default() -> Self {
        Self::platform_default()
    }
}

/// Sampling hint carried from config through the decoder onto the texture.
/// The loader never interprets it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FilterMode {
    Point,
    #[default]
    Bilinear,
    Trilinear,
}

/// Decoded image ready for upload
#[derive(Debug, Clone, PartialEq)]
pub struct Texture {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub filter: FilterMode,
    pub pixels: Vec<u8>,
}

impl Texture {
    pub fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

impl Resource for Texture {
    fn mem(&self) -> usize {
        self.pixels.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_texture_mem() {
        let tex = Texture {
            width: 2,
            height: 2,
            format: PixelFormat::Rgba8,
            filter: FilterMode::Point,
            pixels: vec![0; 16],
        };
        assert_eq!(tex.mem(), 16);
        assert_eq!(tex.resolution(), (2, 2));
        assert_eq!(PixelFormat::Rgb8.bytes_per_pixel(), 3);
    }
}
