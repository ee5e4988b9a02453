use crate::error::Result;
use crate::models::ocr_result::TextToken;
use image::RgbImage;

/// OCR engine trait - abstraction over text detection + recognition backends
pub trait OcrEngine: Send + Sync {
    /// Recognised strings with their polygons, in detection order.
    /// Low-confidence detections are already filtered out.
    fn detect_text(&self, image: &RgbImage) -> Result<Vec<TextToken>>;
}
