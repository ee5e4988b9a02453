use super::peaks::find_peaks;
use super::preprocessing::{median, resize_to_width, Plane};
use super::template_matcher::{vertical_profile, PreparedTemplate};
use crate::error::{ReaderError, Result};
use crate::models::config::RowConfig;
use crate::models::record::Mode;
use crate::models::roi::Roi;
use image::RgbImage;
use std::path::Path;
use tracing::debug;

pub const OVERALL_ROW_TEMPLATE: &str = "overall_mode_row.png";
pub const BOSS_ROW_TEMPLATE: &str = "boss_mode_row.png";

/// Empty-row reference images, one per mode
#[derive(Debug, Clone)]
pub struct RowTemplates {
    overall: RgbImage,
    boss_specific: RgbImage,
}

impl RowTemplates {
    pub fn new(overall: RgbImage, boss_specific: RgbImage) -> Self {
        Self {
            overall,
            boss_specific,
        }
    }

    /// Load both templates from `dir`
    pub fn load<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        let read = |name: &str| -> Result<RgbImage> {
            let path = dir.join(name);
            if !path.is_file() {
                return Err(ReaderError::MissingRowTemplate(path));
            }
            Ok(image::open(&path)?.to_rgb8())
        };

        Ok(Self::new(read(OVERALL_ROW_TEMPLATE)?, read(BOSS_ROW_TEMPLATE)?))
    }

    pub fn get(&self, mode: Mode) -> &RgbImage {
        match mode {
            Mode::Overall => &self.overall,
            Mode::BossSpecific => &self.boss_specific,
        }
    }
}

/// Cuts a panel into rows by correlating it with a row template
pub struct RowSplitter {
    config: RowConfig,
}

impl RowSplitter {
    pub fn new(config: RowConfig) -> Self {
        Self { config }
    }

    /// Top offsets of every row, ascending, plus the scaled row height
    pub fn row_offsets(&self, panel: &RgbImage, template: &RgbImage) -> (Vec<usize>, u32) {
        let template = resize_to_width(template, panel.width());
        let row_height = template.height();

        let panel_gray = Plane::from_luma(&image::imageops::grayscale(panel));
        let template_gray = PreparedTemplate::new(&Plane::from_luma(&image::imageops::grayscale(&template)));

        let profile = vertical_profile(&panel_gray, &template_gray);
        let spacing = self.config.spacing_factor * row_height as f64;
        let offsets = find_peaks(&profile, median(&profile), Some(spacing));

        debug!("Row correlation peaks at {:?} (row height {})", offsets, row_height);
        (offsets, row_height)
    }

    /// One crop per row, top to bottom. An empty vector means no rows were found.
    pub fn split(&self, panel: &RgbImage, template: &RgbImage) -> Result<Vec<RgbImage>> {
        let (offsets, row_height) = self.row_offsets(panel, template);

        offsets
            .into_iter()
            .map(|y| Roi::new(0, y as u32, panel.width(), row_height).crop(panel))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    const GAP: u32 = 4;

    fn template() -> RgbImage {
        RgbImage::from_fn(40, 20, |x, y| {
            let v = ((x * 37 + y * 91 + x * y * 13) % 200 + 20) as u8;
            Rgb([v, v, v])
        })
    }

    fn tiled_panel(rows: u32) -> RgbImage {
        let template = template();
        let pitch = template.height() + GAP;
        let mut panel = RgbImage::new(template.width(), GAP + rows * pitch);
        for row in 0..rows {
            image::imageops::replace(&mut panel, &template, 0, (GAP + row * pitch) as i64);
        }
        panel
    }

    #[test]
    fn test_tiled_rows_are_found_in_order() {
        let splitter = RowSplitter::new(RowConfig::default());
        let panel = tiled_panel(4);

        let (offsets, height) = splitter.row_offsets(&panel, &template());
        assert_eq!(offsets, vec![4, 28, 52, 76]);
        assert_eq!(height, 20);

        let rows = splitter.split(&panel, &template()).unwrap();
        assert_eq!(rows.len(), 4);
        for row in &rows {
            assert_eq!(row, &template(), "every crop should be exactly one row");
        }
    }

    #[test]
    fn test_template_is_scaled_to_panel_width() {
        let splitter = RowSplitter::new(RowConfig::default());
        let small = image::imageops::resize(&template(), 20, 10, image::imageops::FilterType::Nearest);

        let (_, height) = splitter.row_offsets(&tiled_panel(2), &small);
        assert_eq!(height, 20);
    }

    #[test]
    fn test_blank_panel_has_no_rows() {
        let splitter = RowSplitter::new(RowConfig::default());
        let panel = RgbImage::from_pixel(40, 100, Rgb([12, 12, 12]));

        assert!(splitter.split(&panel, &template()).unwrap().is_empty());
    }

    #[test]
    fn test_panel_shorter_than_template_has_no_rows() {
        let splitter = RowSplitter::new(RowConfig::default());
        let panel = RgbImage::from_pixel(40, 10, Rgb([12, 12, 12]));

        assert!(splitter.split(&panel, &template()).unwrap().is_empty());
    }

    #[test]
    fn test_missing_template_file() {
        let dir = std::env::temp_dir().join(format!("raid_rows_missing_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();

        match RowTemplates::load(&dir) {
            Err(ReaderError::MissingRowTemplate(path)) => assert!(path.ends_with(OVERALL_ROW_TEMPLATE)),
            other => panic!("expected missing template, got {:?}", other),
        }
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_templates_by_mode() {
        let templates = RowTemplates::new(RgbImage::new(3, 1), RgbImage::new(5, 1));
        assert_eq!(templates.get(Mode::Overall).width(), 3);
        assert_eq!(templates.get(Mode::BossSpecific).width(), 5);
    }
}
