use crate::error::{ReaderError, Result};
use image::RgbImage;
use serde::{Deserialize, Serialize};

/// Axis-aligned crop rectangle in image pixel coordinates
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Roi {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Roi {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Create ROI from exclusive bounds (x1, y1, x2, y2)
    pub fn from_bounds(x1: u32, y1: u32, x2: u32, y2: u32) -> Result<Self> {
        if x2 <= x1 || y2 <= y1 {
            return Err(ReaderError::InvalidImage(format!(
                "empty crop rectangle ({}, {})..({}, {})",
                x1, y1, x2, y2
            )));
        }

        Ok(Self::new(x1, y1, x2 - x1, y2 - y1))
    }

    /// Exclusive right edge
    pub fn x2(&self) -> u32 {
        self.x + self.width
    }

    /// Exclusive bottom edge
    pub fn y2(&self) -> u32 {
        self.y + self.height
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    pub fn is_valid(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    /// Whether the rectangle lies entirely inside a `width` x `height` image
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.is_valid() && self.x2() <= width && self.y2() <= height
    }

    /// Copy the covered pixels out of `image` into a new image
    pub fn crop(&self, image: &RgbImage) -> Result<RgbImage> {
        if !self.fits_within(image.width(), image.height()) {
            return Err(ReaderError::InvalidImage(format!(
                "crop {:?} outside {}x{} image",
                self,
                image.width(),
                image.height()
            )));
        }

        Ok(image::imageops::crop_imm(image, self.x, self.y, self.width, self.height).to_image())
    }
}
