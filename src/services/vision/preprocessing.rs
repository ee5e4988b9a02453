use image::imageops::FilterType;
use image::{DynamicImage, GrayImage, Rgb, RgbImage};

/// Single-channel floating point image, row-major
#[derive(Debug, Clone, PartialEq)]
pub struct Plane {
    pub width: usize,
    pub height: usize,
    pub data: Vec<f32>,
}

impl Plane {
    pub fn from_luma(image: &GrayImage) -> Self {
        Self {
            width: image.width() as usize,
            height: image.height() as usize,
            data: image.as_raw().iter().map(|&v| v as f32).collect(),
        }
    }

    /// One colour channel (0 = R, 1 = G, 2 = B)
    pub fn from_channel(image: &RgbImage, channel: usize) -> Self {
        Self {
            width: image.width() as usize,
            height: image.height() as usize,
            data: image.pixels().map(|p| p[channel] as f32).collect(),
        }
    }

    #[inline]
    pub fn at(&self, x: usize, y: usize) -> f32 {
        self.data[y * self.width + x]
    }
}

/// Drop alpha, painting fully transparent pixels white
pub fn flatten_alpha(image: &DynamicImage) -> RgbImage {
    if !image.color().has_alpha() {
        return image.to_rgb8();
    }

    let rgba = image.to_rgba8();
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let p = rgba.get_pixel(x, y);
        if p[3] == 0 {
            Rgb([255, 255, 255])
        } else {
            Rgb([p[0], p[1], p[2]])
        }
    })
}

/// Bicubic resize; returns a plain copy when the size already matches
pub fn resize_exact(image: &RgbImage, width: u32, height: u32) -> RgbImage {
    if image.dimensions() == (width, height) {
        return image.clone();
    }
    image::imageops::resize(image, width.max(1), height.max(1), FilterType::CatmullRom)
}

/// Resize to `height`, keeping the aspect ratio (width truncated)
pub fn resize_to_height(image: &RgbImage, height: u32) -> RgbImage {
    let width = (image.width() as f64 * height as f64 / image.height().max(1) as f64) as u32;
    resize_exact(image, width, height)
}

/// Resize to `width`, keeping the aspect ratio (height truncated)
pub fn resize_to_width(image: &RgbImage, width: u32) -> RgbImage {
    let height = (image.height() as f64 * width as f64 / image.width().max(1) as f64) as u32;
    resize_exact(image, width, height)
}

/// Resize so the shorter side equals `side`, keeping the aspect ratio
pub fn resize_shorter_side(image: &RgbImage, side: u32) -> RgbImage {
    if image.height() > image.width() {
        resize_to_width(image, side)
    } else {
        resize_to_height(image, side)
    }
}

#[inline]
fn reflect_101(index: isize, len: usize) -> usize {
    if len == 1 {
        return 0;
    }
    let last = len as isize - 1;
    let mut i = index;
    while i < 0 || i > last {
        i = if i < 0 { -i } else { 2 * last - i };
    }
    i as usize
}

const SMOOTH_5: [f32; 5] = [1.0, 4.0, 6.0, 4.0, 1.0];
const DERIV_5: [f32; 5] = [-1.0, -2.0, 0.0, 2.0, 1.0];

fn convolve_rows(plane: &Plane, kernel: &[f32; 5]) -> Plane {
    let mut out = vec![0.0f32; plane.data.len()];
    for y in 0..plane.height {
        for x in 0..plane.width {
            let mut acc = 0.0;
            for (k, weight) in kernel.iter().enumerate() {
                let sx = reflect_101(x as isize + k as isize - 2, plane.width);
                acc += weight * plane.at(sx, y);
            }
            out[y * plane.width + x] = acc;
        }
    }
    Plane { width: plane.width, height: plane.height, data: out }
}

fn convolve_cols(plane: &Plane, kernel: &[f32; 5]) -> Plane {
    let mut out = vec![0.0f32; plane.data.len()];
    for y in 0..plane.height {
        for x in 0..plane.width {
            let mut acc = 0.0;
            for (k, weight) in kernel.iter().enumerate() {
                let sy = reflect_101(y as isize + k as isize - 2, plane.height);
                acc += weight * plane.at(x, sy);
            }
            out[y * plane.width + x] = acc;
        }
    }
    Plane { width: plane.width, height: plane.height, data: out }
}

/// 5x5 Sobel derivatives `(d/dx, d/dy)` with reflected borders
pub fn sobel_5(plane: &Plane) -> (Plane, Plane) {
    let dx = convolve_cols(&convolve_rows(plane, &DERIV_5), &SMOOTH_5);
    let dy = convolve_rows(&convolve_cols(plane, &DERIV_5), &SMOOTH_5);
    (dx, dy)
}

/// Absolute value of the per-column mean (one entry per x)
pub fn column_energy(plane: &Plane) -> Vec<f64> {
    let mut sums = vec![0.0f64; plane.width];
    for y in 0..plane.height {
        for (x, sum) in sums.iter_mut().enumerate() {
            *sum += plane.at(x, y) as f64;
        }
    }
    sums.iter().map(|s| (s / plane.height.max(1) as f64).abs()).collect()
}

/// Absolute value of the per-row mean (one entry per y)
pub fn row_energy(plane: &Plane) -> Vec<f64> {
    (0..plane.height)
        .map(|y| {
            let row = &plane.data[y * plane.width..(y + 1) * plane.width];
            (row.iter().map(|&v| v as f64).sum::<f64>() / plane.width.max(1) as f64).abs()
        })
        .collect()
}

/// Percentile with linear interpolation between closest ranks
pub fn percentile(values: &[f64], q: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let rank = (q / 100.0).clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (rank - lo as f64)
}

pub fn median(values: &[f64]) -> f64 {
    percentile(values, 50.0)
}
