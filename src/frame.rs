//! Single-channel luminance frames.

use image::{DynamicImage, GrayImage};
#[cfg(test)]
use image::Luma;

use crate::error::SessionError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    image: GrayImage,
}

impl Frame {
    /// Wrap a raw row-major luma buffer of exactly `width * height` bytes.
    pub fn from_raw(width: u32, height: u32, luma: Vec<u8>) -> Result<Self, SessionError> {
        if width == 0 || height == 0 || luma.len() != (width as usize) * (height as usize) {
            return Err(SessionError::EmptyFrame);
        }
        GrayImage::from_raw(width, height, luma)
            .map(|image| Self { image })
            .ok_or(SessionError::EmptyFrame)
    }

    pub fn from_gray(image: GrayImage) -> Result<Self, SessionError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(SessionError::EmptyFrame);
        }
        Ok(Self { image })
    }

    pub fn from_dynamic(img: DynamicImage) -> Result<Self, SessionError> {
        Self::from_gray(img.into_luma8())
    }

    #[cfg(test)]
    pub fn filled(width: u32, height: u32, value: u8) -> Self {
        Self {
            image: GrayImage::from_pixel(width, height, Luma([value])),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    pub fn pixels(&self) -> &[u8] {
        self.image.as_raw()
    }

    pub fn as_gray(&self) -> &GrayImage {
        &self.image
    }

    #[cfg(test)]
    pub fn with_rect(mut self, x0: u32, y0: u32, w: u32, h: u32, value: u8) -> Self {
        for y in y0..(y0 + h).min(self.height()) {
            for x in x0..(x0 + w).min(self.width()) {
                self.image.put_pixel(x, y, Luma([value]));
            }
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_buffer_must_match_geometry() {
        assert!(Frame::from_raw(4, 4, vec![0; 16]).is_ok());
        assert!(matches!(
            Frame::from_raw(4, 4, vec![0; 15]),
            Err(SessionError::EmptyFrame)
        ));
        assert!(matches!(
            Frame::from_raw(0, 4, vec![]),
            Err(SessionError::EmptyFrame)
        ));
    }

    #[test]
    fn color_images_are_reduced_to_luma() {
        let rgb = image::RgbImage::from_pixel(3, 2, image::Rgb([255, 255, 255]));
        let f = Frame::from_dynamic(DynamicImage::ImageRgb8(rgb)).unwrap();
        assert_eq!(f.dimensions(), (3, 2));
        assert!(f.pixels().iter().all(|&p| p == 255));
    }

    #[test]
    fn zero_sized_images_are_empty() {
        assert!(matches!(
            Frame::from_dynamic(DynamicImage::new_luma8(0, 0)),
            Err(SessionError::EmptyFrame)
        ));
    }
}
