use super::engine::OcrEngine;
use crate::error::{ReaderError, Result};
use crate::models::config::OcrConfig;
use crate::models::ocr_result::{Point, Polygon, TextToken};
use base64::{engine::general_purpose, Engine as _};
use image::RgbImage;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, trace};

/// HTTP OCR client that talks to an external detection/recognition server
#[derive(Clone)]
pub struct HttpOcrClient {
    client: reqwest::blocking::Client,
    base_url: String,
    min_score: f64,
    overlap_iou: Option<f64>,
}

#[derive(Serialize)]
struct ImageRequest {
    image_base64: String,
}

/// Single text box with bounding polygon
#[derive(Deserialize, Clone, Debug)]
struct TextBox {
    #[serde(rename = "box")]
    bbox: Vec<Vec<f64>>, // 4 corner points [[x1,y1], [x2,y2], [x3,y3], [x4,y4]]
    text: String,
    score: f64,
}

#[derive(Deserialize)]
struct OcrResponse {
    boxes: Vec<TextBox>,
}

impl TextBox {
    fn into_token(self) -> Option<TextToken> {
        let points: Vec<Point> = self
            .bbox
            .iter()
            .filter_map(|p| match p.as_slice() {
                [x, y, ..] => Some(Point::new(*x, *y)),
                _ => None,
            })
            .collect();

        if points.is_empty() {
            return None;
        }
        Some(TextToken::new(self.text, Polygon::new(points)).with_score(self.score))
    }
}

impl HttpOcrClient {
    pub fn new(config: &OcrConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ReaderError::Ocr(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            min_score: config.min_score,
            overlap_iou: config.overlap_iou,
        })
    }

    /// Check if server is healthy
    pub fn health_check(&self) -> Result<()> {
        let url = format!("{}/health", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|e| ReaderError::Ocr(format!("Health check failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(ReaderError::Ocr(format!("Health check returned {}", response.status())));
        }
        Ok(())
    }

    /// Encode image to base64 PNG
    fn encode_image(image: &RgbImage) -> Result<String> {
        let mut buffer = Vec::new();
        image.write_to(&mut std::io::Cursor::new(&mut buffer), image::ImageFormat::Png)?;
        Ok(general_purpose::STANDARD.encode(&buffer))
    }

    /// Drop low-confidence boxes, then boxes overlapping an earlier kept box.
    /// Detection order is preserved.
    fn filter_boxes(&self, boxes: Vec<TextBox>) -> Vec<TextToken> {
        let mut kept: Vec<TextToken> = Vec::with_capacity(boxes.len());

        for token in boxes
            .into_iter()
            .filter(|b| b.score >= self.min_score)
            .filter_map(TextBox::into_token)
        {
            if let Some(threshold) = self.overlap_iou {
                if kept.iter().any(|k| k.polygon.iou(&token.polygon) > threshold) {
                    trace!("Suppressing overlapping box {:?}", token.text);
                    continue;
                }
            }
            kept.push(token);
        }
        kept
    }
}

impl OcrEngine for HttpOcrClient {
    fn detect_text(&self, image: &RgbImage) -> Result<Vec<TextToken>> {
        let image_base64 = Self::encode_image(image)?;
        let url = format!("{}/ocr", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&ImageRequest { image_base64 })
            .send()
            .map_err(|e| ReaderError::Ocr(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let error_text = response.text().unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ReaderError::Ocr(format!("OCR server error: {}", error_text)));
        }

        let data: OcrResponse = response
            .json()
            .map_err(|e| ReaderError::Ocr(format!("Failed to parse response: {}", e)))?;

        let tokens = self.filter_boxes(data.boxes);
        debug!("OCR returned {} tokens", tokens.len());
        Ok(tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn client(overlap_iou: Option<f64>) -> HttpOcrClient {
        HttpOcrClient::new(&OcrConfig {
            overlap_iou,
            ..OcrConfig::default()
        })
        .unwrap()
    }

    fn response(json: &str) -> Vec<TextBox> {
        serde_json::from_str::<OcrResponse>(json).unwrap().boxes
    }

    const SAMPLE: &str = r#"{
        "boxes": [
            { "box": [[10, 5], [60, 5], [60, 20], [10, 20]], "text": "lv42", "score": 0.98 },
            { "box": [[12, 6], [61, 6], [61, 21], [12, 21]], "text": "lv4Z", "score": 0.91 },
            { "box": [[220, 8], [280, 8], [280, 22], [220, 22]], "text": "1,000", "score": 0.35 },
            { "box": [[300, 8], [340, 8], [340, 22], [300, 22]], "text": "000", "score": 0.88 }
        ],
        "raw_text": "lv42 lv4Z 1,000 000"
    }"#;

    #[test]
    fn test_low_scores_are_dropped() {
        let tokens = client(None).filter_boxes(response(SAMPLE));
        let texts: Vec<&str> = tokens.iter().map(|t| t.text.as_str()).collect();

        assert_eq!(texts, vec!["lv42", "lv4Z", "000"]);
        assert_eq!(tokens[0].polygon.top_left(), Point::new(10.0, 5.0));
        assert_eq!(tokens[2].score, 0.88);
    }

    #[test]
    fn test_overlap_keeps_earlier_box() {
        let tokens = client(Some(0.5)).filter_boxes(response(SAMPLE));
        let texts: Vec<&str> = tokens.iter().map(|t| t.text.as_str()).collect();

        assert_eq!(texts, vec!["lv42", "000"]);
    }

    #[test]
    fn test_malformed_box_is_skipped() {
        let boxes = response(r#"{ "boxes": [ { "box": [[1]], "text": "x", "score": 1.0 } ] }"#);
        assert!(client(None).filter_boxes(boxes).is_empty());
    }

    #[test]
    fn test_encode_image_is_png() {
        let image = RgbImage::from_pixel(3, 2, Rgb([1, 2, 3]));
        let encoded = HttpOcrClient::encode_image(&image).unwrap();
        let bytes = general_purpose::STANDARD.decode(encoded).unwrap();

        let decoded = image::load_from_memory(&bytes).unwrap().to_rgb8();
        assert_eq!(decoded, image);
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let client = HttpOcrClient::new(&OcrConfig {
            base_url: "http://ocr:8000/".to_string(),
            ..OcrConfig::default()
        })
        .unwrap();
        assert_eq!(client.base_url, "http://ocr:8000");
    }
}
