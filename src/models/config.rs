use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// OCR server connection settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OcrConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    /// Boxes scored below this are dropped
    pub min_score: f64,
    /// Suppress later boxes overlapping an earlier one above this IoU
    #[serde(default)]
    pub overlap_iou: Option<f64>,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:39835".to_string(),
            timeout_secs: 30,
            min_score: 0.4,
            overlap_iou: None,
        }
    }
}

/// Panel location on the full screenshot
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MenuConfig {
    /// Fraction of each gradient profile zeroed at both ends
    pub edge_margin: f64,
    /// Profile percentile an edge peak must exceed
    pub percentile: f64,
    /// Strongest row edge this close to the centre (fraction of height) is a divider
    pub center_tolerance: f64,
}

impl Default for MenuConfig {
    fn default() -> Self {
        Self {
            edge_margin: 0.01,
            percentile: 90.0,
            center_tolerance: 0.1,
        }
    }
}

/// Row splitting
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RowConfig {
    /// Minimum distance between row starts, as a fraction of template height
    pub spacing_factor: f64,
}

impl Default for RowConfig {
    fn default() -> Self {
        Self {
            spacing_factor: 0.75,
        }
    }
}

/// Portrait segmentation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SegmentationConfig {
    pub target_height: u32,
    /// Disk radius of the morphological gradient
    pub gradient_radius: u8,
    /// Gradient below this marks a flat seed pixel
    pub flat_gradient_threshold: u8,
    /// Decorative region colour merged into the background. Sample-derived, tune freely.
    pub reject_color: [u8; 3],
    /// Euclidean distance in 0..1 RGB space under which a region counts as `reject_color`
    pub reject_distance: f64,
    pub min_width_fraction: f64,
    pub min_height_fraction: f64,
    pub expected_portraits: usize,
    /// Leftmost portrait of a Boss-Specific row is the boss icon
    pub skip_first_portrait: bool,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            target_height: 256,
            gradient_radius: 2,
            flat_gradient_threshold: 10,
            reject_color: [32, 129, 206],
            reject_distance: 0.2,
            min_width_fraction: 0.1,
            min_height_fraction: 0.2,
            expected_portraits: 6,
            skip_first_portrait: true,
        }
    }
}

/// Portrait identification
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MatcherConfig {
    /// Shorter side of a resized probe and edge of every canonical reference
    pub probe_size: u32,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self { probe_size: 128 }
    }
}

/// Fractions of the row image used by the text field rules
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct LayoutConfig {
    pub half: f64,
    pub upper_tertile: f64,
    pub lower_tertile: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            half: 0.5,
            upper_tertile: 0.33,
            lower_tertile: 0.66,
        }
    }
}

/// Bundled resource locations
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AssetConfig {
    pub library_dir: PathBuf,
    pub row_template_dir: PathBuf,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            library_dir: "assets/portraits".into(),
            row_template_dir: "assets/rows".into(),
        }
    }
}

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub ocr: OcrConfig,
    #[serde(default)]
    pub menu: MenuConfig,
    #[serde(default)]
    pub rows: RowConfig,
    #[serde(default)]
    pub segmentation: SegmentationConfig,
    #[serde(default)]
    pub matcher: MatcherConfig,
    #[serde(default)]
    pub layout: LayoutConfig,
    #[serde(default)]
    pub assets: AssetConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_config_default() {
        let config = AppConfig::default();

        assert_eq!(config.ocr.base_url, "http://127.0.0.1:39835");
        assert_eq!(config.ocr.min_score, 0.4);
        assert!(config.ocr.overlap_iou.is_none());

        assert_eq!(config.menu.edge_margin, 0.01);
        assert_eq!(config.menu.percentile, 90.0);
        assert_eq!(config.menu.center_tolerance, 0.1);

        assert_eq!(config.rows.spacing_factor, 0.75);

        assert_eq!(config.segmentation.target_height, 256);
        assert_eq!(config.segmentation.flat_gradient_threshold, 10);
        assert_eq!(config.segmentation.reject_color, [32, 129, 206]);
        assert_eq!(config.segmentation.reject_distance, 0.2);
        assert_eq!(config.segmentation.expected_portraits, 6);
        assert!(config.segmentation.skip_first_portrait);

        assert_eq!(config.matcher.probe_size, 128);
        assert_eq!(config.layout.half, 0.5);
        assert_eq!(config.layout.upper_tertile, 0.33);
        assert_eq!(config.layout.lower_tertile, 0.66);
    }

    #[test]
    fn test_app_config_serialization() {
        let config = AppConfig::default();
        let json = serde_json::to_string_pretty(&config).unwrap();

        let deserialized: AppConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let json = r#"{ "ocr": { "base_url": "http://ocr:8000", "timeout_secs": 5, "min_score": 0.6 } }"#;
        let config: AppConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.ocr.base_url, "http://ocr:8000");
        assert_eq!(config.ocr.min_score, 0.6);
        assert!(config.ocr.overlap_iou.is_none());
        assert_eq!(config.segmentation, SegmentationConfig::default());
    }
}
