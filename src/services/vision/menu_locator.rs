use super::peaks::{find_peaks, strongest_first};
use super::preprocessing::{column_energy, percentile, row_energy, sobel_5, Plane};
use crate::error::{Axis, ReaderError, Result};
use crate::models::config::MenuConfig;
use crate::models::roi::Roi;
use image::{DynamicImage, RgbImage};
use tracing::debug;

/// Finds the results panel inside a full screenshot from its strongest
/// straight edges
pub struct MenuLocator {
    config: MenuConfig,
}

impl MenuLocator {
    pub fn new(config: MenuConfig) -> Self {
        Self { config }
    }

    /// Panel rectangle in screenshot coordinates
    pub fn locate(&self, screenshot: &DynamicImage) -> Result<Roi> {
        let gray = Plane::from_luma(&screenshot.to_luma8());
        let (dx, dy) = sobel_5(&gray);

        let columns = self.edge_peaks(column_energy(&dx));
        let rows = self.edge_peaks(row_energy(&dy));

        let (x1, x2) = pick_columns(&columns.0, &columns.1)?;
        let (y1, y2) = self.pick_rows(&rows.0, &rows.1)?;

        let roi = Roi::from_bounds(x1 as u32, y1 as u32, x2 as u32, y2 as u32)?;
        debug!("Panel located at {:?}", roi);
        Ok(roi)
    }

    /// Panel rectangle with the cropped panel, always 3-channel without alpha
    pub fn crop_panel(&self, screenshot: &DynamicImage) -> Result<(Roi, RgbImage)> {
        let roi = self.locate(screenshot)?;
        let panel = roi.crop(&screenshot.to_rgb8())?;
        Ok((roi, panel))
    }

    /// Profile with its margins cleared plus the peaks above its percentile
    fn edge_peaks(&self, mut profile: Vec<f64>) -> (Vec<f64>, Vec<usize>) {
        let n = profile.len();
        let head = (self.config.edge_margin * n as f64) as usize;
        let tail = ((1.0 - self.config.edge_margin) * n as f64) as usize;
        profile[..head.min(n)].iter_mut().for_each(|v| *v = 0.0);
        profile[tail.min(n)..].iter_mut().for_each(|v| *v = 0.0);

        let threshold = percentile(&profile, self.config.percentile);
        let peaks = find_peaks(&profile, threshold, None);
        (profile, peaks)
    }

    fn pick_rows(&self, profile: &[f64], peaks: &[usize]) -> Result<(usize, usize)> {
        let ordered = strongest_first(profile, peaks);
        let center = profile.len() as f64 / 2.0;
        let tolerance = self.config.center_tolerance * profile.len() as f64;

        // A dominant edge across the middle is the divider between panel halves
        let skip = match ordered.first() {
            Some(&top) if (top as f64 - center).abs() < tolerance => 1,
            _ => 0,
        };

        match ordered.get(skip..skip + 2) {
            Some(&[a, b]) => Ok((a.min(b), a.max(b))),
            _ => Err(ReaderError::GeometryNotFound {
                axis: Axis::Rows,
                found: ordered.len(),
                needed: skip + 2,
            }),
        }
    }
}

fn pick_columns(profile: &[f64], peaks: &[usize]) -> Result<(usize, usize)> {
    match strongest_first(profile, peaks).as_slice() {
        &[a, b, ..] => Ok((a.min(b), a.max(b))),
        _ => Err(ReaderError::GeometryNotFound {
            axis: Axis::Columns,
            found: peaks.len(),
            needed: 2,
        }),
    }
}
