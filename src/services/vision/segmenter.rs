use super::preprocessing::resize_to_height;
use crate::error::{ReaderError, Result};
use crate::models::config::SegmentationConfig;
use crate::models::roi::Roi;
use image::{GrayImage, Luma, RgbImage};
use imageproc::contrast::otsu_level;
use imageproc::distance_transform::Norm;
use imageproc::morphology::{dilate, erode};
use imageproc::region_labelling::{connected_components, Connectivity};
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use tracing::{debug, trace};

/// One portrait cut out of a resized row. Portraits come back in
/// component label order, not left to right.
#[derive(Debug, Clone)]
pub struct Portrait {
    /// Position inside the resized row
    pub roi: Roi,
    pub image: RgbImage,
}

/// Per-label statistics collected from one labelling pass
#[derive(Debug, Clone, Default)]
struct Region {
    pixels: u64,
    color_sum: [f64; 3],
    bounds: Option<(u32, u32, u32, u32)>,
}

impl Region {
    fn add(&mut self, x: u32, y: u32, color: &[u8]) {
        self.pixels += 1;
        for (sum, &c) in self.color_sum.iter_mut().zip(color) {
            *sum += c as f64;
        }
        self.bounds = Some(match self.bounds {
            None => (x, y, x, y),
            Some((x1, y1, x2, y2)) => (x1.min(x), y1.min(y), x2.max(x), y2.max(y)),
        });
    }

    /// Mean colour scaled to 0..1
    fn mean_color(&self) -> [f64; 3] {
        let n = self.pixels.max(1) as f64;
        self.color_sum.map(|s| s / n / 255.0)
    }

    fn roi(&self) -> Option<Roi> {
        self.bounds.map(|(x1, y1, x2, y2)| Roi::new(x1, y1, x2 - x1 + 1, y2 - y1 + 1))
    }
}

/// Arena of regions indexed by label
fn collect_regions(labels: &[u32], image: &RgbImage) -> Vec<Region> {
    let count = labels.iter().copied().max().unwrap_or(0) as usize + 1;
    let mut regions = vec![Region::default(); count];
    let width = image.width();

    for (i, (&label, pixel)) in labels.iter().zip(image.pixels()).enumerate() {
        let (x, y) = (i as u32 % width, i as u32 / width);
        regions[label as usize].add(x, y, &pixel.0);
    }
    regions
}

/// Splits a result row into character portraits with a marker watershed
pub struct PortraitSegmenter {
    config: SegmentationConfig,
}

impl PortraitSegmenter {
    pub fn new(config: SegmentationConfig) -> Self {
        Self { config }
    }

    /// Portrait crops of the row resized to the working height
    pub fn segment(&self, row: &RgbImage) -> Result<Vec<Portrait>> {
        if row.width() == 0 || row.height() == 0 {
            return Err(ReaderError::InvalidImage("empty row image".to_string()));
        }

        let resized = resize_to_height(row, self.config.target_height);
        let binary = binarize(&image::imageops::grayscale(&resized));
        let gradient = morphological_gradient(&binary, self.config.gradient_radius);

        let labels = watershed(&gradient, seed_labels(&gradient, self.config.flat_gradient_threshold));
        let mask = self.foreground_mask(&resized, &labels);

        let components = connected_components(&mask, Connectivity::Eight, Luma([0u8])).into_raw();
        let regions = collect_regions(&components, &resized);

        let (width, height) = resized.dimensions();
        let min_area = self.config.min_width_fraction * width as f64 * self.config.min_height_fraction * height as f64;

        let mut portraits = Vec::new();
        for (label, region) in regions.iter().enumerate().skip(1) {
            let Some(roi) = region.roi() else {
                continue;
            };
            if (roi.area() as f64) < min_area {
                trace!("Dropping region {} ({}x{}): below minimum area", label, roi.width, roi.height);
                continue;
            }
            portraits.push(Portrait {
                roi,
                image: roi.crop(&resized)?,
            });
        }

        debug!("Segmented {} portraits from {}x{} row", portraits.len(), width, height);
        Ok(portraits)
    }

    /// Non-background watershed regions, minus regions of the reject colour
    fn foreground_mask(&self, image: &RgbImage, labels: &[u32]) -> GrayImage {
        let regions = collect_regions(labels, image);
        let background = most_frequent(&regions);

        let rejected: Vec<bool> = regions
            .iter()
            .enumerate()
            .map(|(label, region)| {
                label != background && region.pixels > 0 && self.is_reject_color(region.mean_color())
            })
            .collect();

        let data = labels
            .iter()
            .map(|&l| {
                let l = l as usize;
                if l == background || rejected[l] {
                    0
                } else {
                    255
                }
            })
            .collect();

        GrayImage::from_raw(image.width(), image.height(), data)
            .unwrap_or_else(|| GrayImage::new(image.width(), image.height()))
    }

    fn is_reject_color(&self, mean: [f64; 3]) -> bool {
        let reference = self.config.reject_color.map(|c| c as f64 / 255.0);
        let distance = mean
            .iter()
            .zip(reference)
            .map(|(m, r)| (m - r).powi(2))
            .sum::<f64>()
            .sqrt();
        distance < self.config.reject_distance
    }
}

/// Global Otsu threshold to a 0/255 image
fn binarize(gray: &GrayImage) -> GrayImage {
    let level = otsu_level(gray);
    GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        Luma([if gray.get_pixel(x, y)[0] > level { 255 } else { 0 }])
    })
}

/// Local max minus local min over a diamond of the given radius
fn morphological_gradient(binary: &GrayImage, radius: u8) -> GrayImage {
    let high = dilate(binary, Norm::L1, radius);
    let low = erode(binary, Norm::L1, radius);
    GrayImage::from_fn(binary.width(), binary.height(), |x, y| {
        Luma([high.get_pixel(x, y)[0].saturating_sub(low.get_pixel(x, y)[0])])
    })
}

/// 4-connected components of flat pixels; 0 marks pixels left to flood
fn seed_labels(gradient: &GrayImage, threshold: u8) -> Vec<u32> {
    let flat = GrayImage::from_fn(gradient.width(), gradient.height(), |x, y| {
        Luma([if gradient.get_pixel(x, y)[0] < threshold { 255 } else { 0 }])
    });
    connected_components(&flat, Connectivity::Four, Luma([0u8])).into_raw()
}

/// Priority flood from the seed labels over `cost`, 4-connected.
/// Equal costs flood in insertion order.
fn watershed(cost: &GrayImage, mut labels: Vec<u32>) -> Vec<u32> {
    let (width, height) = (cost.width() as usize, cost.height() as usize);
    let cost = cost.as_raw();
    let mut heap = BinaryHeap::new();
    let mut age: u64 = 0;

    for (i, &label) in labels.iter().enumerate() {
        if label != 0 {
            heap.push(Reverse((cost[i], age, i)));
            age += 1;
        }
    }

    while let Some(Reverse((_, _, i))) = heap.pop() {
        let (x, y) = (i % width, i / width);
        let neighbours = [
            (x > 0).then(|| i - 1),
            (x + 1 < width).then(|| i + 1),
            (y > 0).then(|| i - width),
            (y + 1 < height).then(|| i + width),
        ];

        for n in neighbours.into_iter().flatten() {
            if labels[n] == 0 {
                labels[n] = labels[i];
                heap.push(Reverse((cost[n], age, n)));
                age += 1;
            }
        }
    }
    labels
}

/// Label covering the most pixels; lowest label on a tie
fn most_frequent(regions: &[Region]) -> usize {
    let mut best = 0;
    for (label, region) in regions.iter().enumerate() {
        if region.pixels > regions[best].pixels {
            best = label;
        }
    }
    best
}
