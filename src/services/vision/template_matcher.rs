use super::library::ReferenceLibrary;
use super::preprocessing::{flatten_alpha, resize_shorter_side, Plane};
use crate::error::{ReaderError, Result};
use crate::models::config::MatcherConfig;
use image::{DynamicImage, RgbImage};
use rayon::prelude::*;
use std::sync::Arc;
use tracing::debug;

/// Template plane with its mean already removed
#[derive(Debug, Clone)]
pub struct PreparedTemplate {
    pub width: usize,
    pub height: usize,
    centered: Vec<f64>,
    sum_sq: f64,
}

impl PreparedTemplate {
    pub fn new(plane: &Plane) -> Self {
        let n = plane.data.len().max(1) as f64;
        let mean = plane.data.iter().map(|&v| v as f64).sum::<f64>() / n;
        let centered: Vec<f64> = plane.data.iter().map(|&v| v as f64 - mean).collect();
        let sum_sq = centered.iter().map(|v| v * v).sum();

        Self {
            width: plane.width,
            height: plane.height,
            centered,
            sum_sq,
        }
    }

    /// Mean-subtracted normalized correlation with the window of `image`
    /// whose top-left corner is `(ox, oy)`. Flat windows or templates score 0.
    pub fn score_at(&self, image: &Plane, ox: usize, oy: usize) -> f64 {
        if ox + self.width > image.width || oy + self.height > image.height {
            return 0.0;
        }

        let n = (self.width * self.height) as f64;
        let mut window_sum = 0.0;
        let mut window_sq = 0.0;
        let mut cross = 0.0;

        for ty in 0..self.height {
            let row = &image.data[(oy + ty) * image.width + ox..(oy + ty) * image.width + ox + self.width];
            let tpl = &self.centered[ty * self.width..(ty + 1) * self.width];
            for (&w, &t) in row.iter().zip(tpl) {
                let w = w as f64;
                window_sum += w;
                window_sq += w * w;
                cross += w * t;
            }
        }

        let window_var = window_sq - window_sum * window_sum / n;
        let denom = (window_var * self.sum_sq).sqrt();
        if denom <= f64::EPSILON {
            return 0.0;
        }
        cross / denom
    }
}

/// Correlation of `template` against `image` at horizontal offset 0,
/// for every vertical offset where the template fits
pub fn vertical_profile(image: &Plane, template: &PreparedTemplate) -> Vec<f64> {
    if template.height > image.height || template.width > image.width {
        return Vec::new();
    }

    (0..=image.height - template.height)
        .into_par_iter()
        .map(|oy| template.score_at(image, 0, oy))
        .collect()
}

/// Per-channel R, G, B templates of one image
pub fn prepare_channels(image: &RgbImage) -> [PreparedTemplate; 3] {
    [0, 1, 2].map(|c| PreparedTemplate::new(&Plane::from_channel(image, c)))
}

/// Identification result
#[derive(Debug, Clone, PartialEq)]
pub struct PortraitMatch {
    pub id: String,
    /// Sum of the three channel correlations, at most 3.0
    pub score: f64,
}

/// Identifies portraits against a reference library
pub struct PortraitMatcher {
    library: Arc<ReferenceLibrary>,
    probe_size: u32,
}

impl PortraitMatcher {
    pub fn new(library: Arc<ReferenceLibrary>, config: &MatcherConfig) -> Result<Self> {
        if library.is_empty() {
            return Err(ReaderError::EmptyReferenceLibrary);
        }
        Ok(Self {
            library,
            probe_size: config.probe_size,
        })
    }

    /// Best matching reference; the first maximum in library order wins
    pub fn identify(&self, probe: &DynamicImage) -> Result<PortraitMatch> {
        let probe = resize_shorter_side(&flatten_alpha(probe), self.probe_size);
        let planes = [0, 1, 2].map(|c| Plane::from_channel(&probe, c));

        let mut best: Option<PortraitMatch> = None;
        for (id, reference) in self.library.iter() {
            let score: f64 = reference
                .channels()
                .iter()
                .zip(&planes)
                .map(|(template, plane)| template.score_at(plane, 0, 0))
                .sum();

            if best.as_ref().map_or(true, |b| score > b.score) {
                best = Some(PortraitMatch {
                    id: id.to_string(),
                    score,
                });
            }
        }

        let best = best.ok_or(ReaderError::EmptyReferenceLibrary)?;
        debug!("Portrait matched {} (score {:.3})", best.id, best.score);
        Ok(best)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgb};

    fn textured(seed: u32) -> RgbImage {
        RgbImage::from_fn(128, 128, |x, y| {
            Rgb([
                ((x * 7 + y * 3 + seed * 11) % 251) as u8,
                ((x * y + seed * 29) % 241) as u8,
                ((x * 13 + y * y + seed * 5) % 239) as u8,
            ])
        })
    }

    fn library_of(ids: &[(&str, u32)]) -> Arc<ReferenceLibrary> {
        let entries = ids
            .iter()
            .map(|(id, seed)| (id.to_string(), DynamicImage::ImageRgb8(textured(*seed))));
        Arc::new(ReferenceLibrary::from_images(entries, 128).unwrap())
    }

    #[test]
    fn test_score_identical_is_one() {
        let gray = GrayImage::from_fn(16, 16, |x, y| Luma([((x * 17 + y * 5) % 200) as u8]));
        let plane = Plane::from_luma(&gray);
        let template = PreparedTemplate::new(&plane);

        assert!((template.score_at(&plane, 0, 0) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_score_flat_window_is_zero() {
        let flat = Plane::from_luma(&GrayImage::from_pixel(8, 8, Luma([90])));
        let textured = Plane::from_luma(&GrayImage::from_fn(8, 8, |x, y| Luma([(x * 20 + y) as u8])));

        assert_eq!(PreparedTemplate::new(&flat).score_at(&textured, 0, 0), 0.0);
        assert_eq!(PreparedTemplate::new(&textured).score_at(&flat, 0, 0), 0.0);
    }

    #[test]
    fn test_score_is_brightness_invariant() {
        let gray = GrayImage::from_fn(10, 10, |x, y| Luma([((x * 9 + y * 4) % 100) as u8]));
        let brighter = GrayImage::from_fn(10, 10, |x, y| Luma([gray.get_pixel(x, y)[0] * 2 + 30]));
        let template = PreparedTemplate::new(&Plane::from_luma(&gray));

        let score = template.score_at(&Plane::from_luma(&brighter), 0, 0);
        assert!((score - 1.0).abs() < 1e-9, "linear brightness change must not matter, got {}", score);
    }

    #[test]
    fn test_vertical_profile_peaks_at_template_offset() {
        let template_img = GrayImage::from_fn(6, 4, |x, y| Luma([((x * 31 + y * 57) % 190 + 10) as u8]));
        let mut image = GrayImage::from_pixel(6, 20, Luma([0]));
        for y in 0..4 {
            for x in 0..6 {
                image.put_pixel(x, y + 9, *template_img.get_pixel(x, y));
            }
        }

        let profile = vertical_profile(&Plane::from_luma(&image), &PreparedTemplate::new(&Plane::from_luma(&template_img)));
        assert_eq!(profile.len(), 17);

        let best = (0..profile.len()).max_by(|&a, &b| profile[a].total_cmp(&profile[b])).unwrap();
        assert_eq!(best, 9);
        assert!((profile[9] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_vertical_profile_template_too_tall() {
        let image = Plane::from_luma(&GrayImage::new(4, 3));
        let template = PreparedTemplate::new(&Plane::from_luma(&GrayImage::new(4, 5)));
        assert!(vertical_profile(&image, &template).is_empty());
    }

    #[test]
    fn test_identical_probe_matches_with_max_score() {
        let matcher = PortraitMatcher::new(
            library_of(&[("alice", 1), ("bob", 2), ("carol", 3)]),
            &MatcherConfig::default(),
        )
        .unwrap();

        let result = matcher.identify(&DynamicImage::ImageRgb8(textured(2))).unwrap();
        assert_eq!(result.id, "bob");
        assert!((result.score - 3.0).abs() < 1e-9, "expected perfect score, got {}", result.score);
    }

    #[test]
    fn test_library_order_does_not_change_winner() {
        let config = MatcherConfig::default();
        let probe = DynamicImage::ImageRgb8(textured(3));

        let forward = PortraitMatcher::new(library_of(&[("a", 1), ("b", 2), ("c", 3)]), &config).unwrap();
        let reversed = PortraitMatcher::new(library_of(&[("c", 3), ("b", 2), ("a", 1)]), &config).unwrap();

        assert_eq!(forward.identify(&probe).unwrap().id, "c");
        assert_eq!(reversed.identify(&probe).unwrap().id, "c");
    }

    #[test]
    fn test_tie_keeps_first_identifier() {
        let matcher = PortraitMatcher::new(
            library_of(&[("zeta", 4), ("alpha", 4)]),
            &MatcherConfig::default(),
        )
        .unwrap();

        let result = matcher.identify(&DynamicImage::ImageRgb8(textured(4))).unwrap();
        assert_eq!(result.id, "alpha", "lexicographically first identifier wins a tie");
    }

    #[test]
    fn test_empty_library_is_rejected() {
        let library = Arc::new(ReferenceLibrary::default());
        assert!(matches!(
            PortraitMatcher::new(library, &MatcherConfig::default()),
            Err(ReaderError::EmptyReferenceLibrary)
        ));
    }
}
