//! Representative colour extraction for a single chart patch
//!
//! The strategy depends on how many pixels each colour channel contributes
//! (for RAW mosaics green gets about half the pixels, red and blue a quarter
//! each):
//!
//! | pixels per channel | strategy |
//! |---|---|
//! | `<= 400` | not applicable, sentinel sample |
//! | `<= 900` | blur, dense centre window, trimmed mean / median |
//! | `<= 3600` | blur, 50% centre zone, mean blended with median |
//! | larger | blur, Gaussian-weighted statistics over the whole patch |
//!
//! Every statistic on mosaic data is computed per filter colour through
//! channel masks; colours are never interpolated or mixed.

use serde::{Deserialize, Serialize};

use crate::image_source::PatchPixels;
use crate::stats::{
    gaussian_blur_interleaved, gaussian_blur_mosaic, gaussian_mask, median, trimmed_mean,
    std_dev, weighted_mean_std,
};

const EPSILON: f64 = 1e-6;

/// Tunable limits for [`sample`]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SamplerConfig {
    /// Patches with at most this many pixels per channel are not sampled
    pub not_applicable_max: usize,
    pub small_max: usize,
    pub medium_max: usize,

    /// Fraction of values dropped from each tail for trimmed means
    pub trim: f64,
    pub small_blur_sigma: f64,
    pub medium_blur_sigma: f64,
    pub large_blur_sigma: f64,

    /// Small-patch window side as a fraction of the shorter patch side
    pub small_window_fraction: f64,
    pub small_window_min: usize,
    pub small_window_max: usize,

    /// Gaussian weight sigma as a fraction of the shorter patch side
    pub mask_sigma_scale: f64,
    /// Half-side of the large-patch median core as a fraction of the shorter side
    pub median_core_fraction: f64,

    /// Mean/median agreement required at 100 pixels per channel
    pub reliable_threshold: f64,
    /// Upper bound on the size-adapted agreement threshold
    pub max_adaptive_threshold: f64,
    /// Patches with no more pixels per channel than this are never reliable
    pub min_reliable_pixels: usize,
    pub edge_threshold: f64,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            not_applicable_max: 400,
            small_max: 900,
            medium_max: 3600,
            trim: 0.1,
            small_blur_sigma: 1.2,
            medium_blur_sigma: 1.2,
            large_blur_sigma: 1.5,
            small_window_fraction: 0.6,
            small_window_min: 5,
            small_window_max: 21,
            mask_sigma_scale: 0.33,
            median_core_fraction: 0.3,
            reliable_threshold: 0.02,
            max_adaptive_threshold: 0.1,
            min_reliable_pixels: 32,
            edge_threshold: 0.25,
        }
    }
}

/// Which strategy produced a sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SamplingMethod {
    NotApplicable,
    SmallPatch,
    MediumPatch,
    LargePatch,
}

impl SamplingMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            SamplingMethod::NotApplicable => "not applicable",
            SamplingMethod::SmallPatch => "small patch sampling",
            SamplingMethod::MediumPatch => "medium patch central zone",
            SamplingMethod::LargePatch => "large patch gaussian mask",
        }
    }
}

/// Colour statistics of one patch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchSample {
    pub mean_rgb: [f64; 3],
    pub median_rgb: [f64; 3],
    pub std_rgb: [f64; 3],
    /// Per-channel |mean - median|
    pub delta: [f64; 3],
    /// Mean delta relative to mean intensity
    pub normalized_delta: f64,
    /// Border vs interior contrast; -1 when not measured
    pub edge_score: f64,
    pub reliable: bool,
    pub method: SamplingMethod,
    /// Smallest per-channel pixel count of the patch
    pub pixel_count: usize,
}

impl PatchSample {
    /// Zero-confidence sample for patches too small to measure
    pub fn not_applicable(pixel_count: usize) -> Self {
        Self {
            mean_rgb: [0.0; 3],
            median_rgb: [0.0; 3],
            std_rgb: [255.0; 3],
            delta: [0.0; 3],
            normalized_delta: 100.0,
            edge_score: -1.0,
            reliable: false,
            method: SamplingMethod::NotApplicable,
            pixel_count,
        }
    }

    pub fn is_applicable(&self) -> bool {
        self.method != SamplingMethod::NotApplicable
    }

    /// All-zero or fully clipped mean, typically a masked or invalid patch
    pub fn is_blank_or_saturated(&self, white_level: f64) -> bool {
        self.mean_rgb.iter().all(|&c| c == 0.0) || self.mean_rgb.iter().all(|&c| c >= white_level)
    }

    /// Mean colour scaled to 0..1 by the image white level
    pub fn mean_normalized(&self, white_level: f64) -> [f64; 3] {
        self.mean_rgb.map(|c| c / white_level)
    }

    pub fn median_normalized(&self, white_level: f64) -> [f64; 3] {
        self.median_rgb.map(|c| c / white_level)
    }
}

/// Half-open pixel window `[x0, x1) x [y0, y1)`
#[derive(Debug, Clone, Copy)]
struct Window {
    x0: usize,
    y0: usize,
    x1: usize,
    y1: usize,
}

impl Window {
    fn full(width: usize, height: usize) -> Self {
        Self { x0: 0, y0: 0, x1: width, y1: height }
    }

    /// Window reaching `half_w`/`half_h` either side of the centre, inclusive
    fn centred(width: usize, height: usize, half_w: usize, half_h: usize) -> Self {
        let (cx, cy) = (width / 2, height / 2);
        Self {
            x0: cx.saturating_sub(half_w),
            y0: cy.saturating_sub(half_h),
            x1: (cx + half_w + 1).min(width),
            y1: (cy + half_h + 1).min(height),
        }
    }
}

/// Blurred patch plus the channel masks needed to read it
struct Prepared<'a> {
    pixels: &'a PatchPixels,
    values: Vec<f64>,
    masks: Option<[Vec<bool>; 3]>,
}

impl<'a> Prepared<'a> {
    fn new(pixels: &'a PatchPixels, sigma: f64) -> Self {
        let (w, h) = (pixels.width, pixels.height);
        let (values, masks) = match &pixels.mosaic {
            Some(info) => (
                gaussian_blur_mosaic(&pixels.data, w, h, sigma),
                Some(info.masks(w, h)),
            ),
            None => (gaussian_blur_interleaved(&pixels.data, w, h, 3, sigma), None),
        };
        Self { pixels, values, masks }
    }

    /// Values of channel `ch` inside `win`, optionally with their weights
    fn channel(&self, ch: usize, win: Window, weights: Option<&[f64]>) -> (Vec<f64>, Vec<f64>) {
        let w = self.pixels.width;
        let mut values = Vec::new();
        let mut picked = Vec::new();
        for y in win.y0..win.y1 {
            for x in win.x0..win.x1 {
                let i = y * w + x;
                let v = match &self.masks {
                    Some(masks) if masks[ch][i] => self.values[i],
                    Some(_) => continue,
                    None => self.values[i * 3 + ch],
                };
                values.push(v);
                if let Some(weights) = weights {
                    picked.push(weights[i]);
                }
            }
        }
        (values, picked)
    }

    /// Trimmed mean, median and standard deviation per channel
    fn window_stats(&self, win: Window, trim: f64) -> ([f64; 3], [f64; 3], [f64; 3]) {
        let mut mean = [0.0; 3];
        let mut med = [0.0; 3];
        let mut std = [0.0; 3];
        for ch in 0..3 {
            let (values, _) = self.channel(ch, win, None);
            mean[ch] = trimmed_mean(&values, trim);
            med[ch] = median(&values);
            std[ch] = std_dev(&values);
        }
        (mean, med, std)
    }
}

struct Estimate {
    mean: [f64; 3],
    median: [f64; 3],
    std: [f64; 3],
}

fn sample_small(pixels: &PatchPixels, cfg: &SamplerConfig) -> Estimate {
    let prepared = Prepared::new(pixels, cfg.small_blur_sigma);
    let shorter = pixels.width.min(pixels.height) as f64;
    let side = ((shorter * cfg.small_window_fraction) as usize)
        .min(cfg.small_window_max)
        .max(cfg.small_window_min);
    let half = side / 2;

    let win = Window::centred(pixels.width, pixels.height, half, half);
    let (mean, median, std) = prepared.window_stats(win, cfg.trim);
    Estimate { mean, median, std }
}

fn sample_medium(pixels: &PatchPixels, cfg: &SamplerConfig) -> Estimate {
    let prepared = Prepared::new(pixels, cfg.medium_blur_sigma);
    let half_w = (pixels.width / 2 / 2).max(1);
    let half_h = (pixels.height / 2 / 2).max(1);

    let win = Window::centred(pixels.width, pixels.height, half_w, half_h);
    let (trimmed, median, std) = prepared.window_stats(win, cfg.trim);
    let mean = [0, 1, 2].map(|c| (trimmed[c] + median[c]) / 2.0);
    Estimate { mean, median, std }
}

fn sample_large(pixels: &PatchPixels, cfg: &SamplerConfig) -> Estimate {
    let (w, h) = (pixels.width, pixels.height);
    let prepared = Prepared::new(pixels, cfg.large_blur_sigma);
    let mask = gaussian_mask(w, h, cfg.mask_sigma_scale);

    let mut mean = [0.0; 3];
    let mut std = [0.0; 3];
    for ch in 0..3 {
        let (values, weights) = prepared.channel(ch, Window::full(w, h), Some(&mask));
        (mean[ch], std[ch]) = weighted_mean_std(&values, &weights);
    }

    let radius = ((w.min(h) as f64 * cfg.median_core_fraction) as usize).max(1);
    let (cx, cy) = (w / 2, h / 2);
    let core = Window {
        x0: cx.saturating_sub(radius),
        y0: cy.saturating_sub(radius),
        x1: (cx + radius).min(w),
        y1: (cy + radius).min(h),
    };
    let core_median = [0, 1, 2].map(|ch| median(&prepared.channel(ch, core, None).0));

    Estimate {
        mean,
        median: core_median,
        std,
    }
}

/// Border-band vs interior intensity contrast of the unblurred patch
pub fn edge_score(pixels: &PatchPixels) -> f64 {
    let (w, h) = (pixels.width, pixels.height);
    let band = (w.min(h) / 10).max(2);
    if w <= 2 * band || h <= 2 * band {
        return 0.0;
    }

    let grey = |i: usize| -> f64 {
        match pixels.mosaic {
            Some(_) => pixels.data[i],
            None => (pixels.data[i * 3] + pixels.data[i * 3 + 1] + pixels.data[i * 3 + 2]) / 3.0,
        }
    };

    let (mut centre_sum, mut centre_n) = (0.0, 0usize);
    let (mut border_sum, mut border_n) = (0.0, 0usize);
    for y in 0..h {
        for x in 0..w {
            let v = grey(y * w + x);
            if x >= band && x < w - band && y >= band && y < h - band {
                centre_sum += v;
                centre_n += 1;
            } else {
                border_sum += v;
                border_n += 1;
            }
        }
    }

    let centre = centre_sum / centre_n as f64;
    let border = border_sum / border_n as f64;
    (centre - border).abs() / (centre + EPSILON)
}

/// Smallest number of pixels any colour channel contributes
pub fn pixels_per_channel(pixels: &PatchPixels) -> usize {
    match &pixels.mosaic {
        Some(info) => info
            .channel_counts(pixels.width, pixels.height)
            .into_iter()
            .min()
            .unwrap_or(0),
        None => pixels.width * pixels.height,
    }
}

/// Mean/median agreement a patch with `n` pixels per channel must meet
pub fn adaptive_threshold(n: usize, cfg: &SamplerConfig) -> f64 {
    (cfg.reliable_threshold * (100.0 / n as f64).sqrt()).min(cfg.max_adaptive_threshold)
}

/// Estimate the representative colour of one patch
pub fn sample(pixels: &PatchPixels, cfg: &SamplerConfig) -> PatchSample {
    let n = pixels_per_channel(pixels);
    if n <= cfg.not_applicable_max {
        return PatchSample::not_applicable(n);
    }

    let edge = edge_score(pixels);
    let (estimate, method) = if n <= cfg.small_max {
        (sample_small(pixels, cfg), SamplingMethod::SmallPatch)
    } else if n <= cfg.medium_max {
        (sample_medium(pixels, cfg), SamplingMethod::MediumPatch)
    } else {
        (sample_large(pixels, cfg), SamplingMethod::LargePatch)
    };

    let delta = [0, 1, 2].map(|c| (estimate.mean[c] - estimate.median[c]).abs());
    let normalized_delta =
        (delta.iter().sum::<f64>() / 3.0) / (estimate.mean.iter().sum::<f64>() / 3.0 + EPSILON);

    let reliable = n > cfg.min_reliable_pixels
        && normalized_delta <= adaptive_threshold(n, cfg)
        && edge <= cfg.edge_threshold;

    PatchSample {
        mean_rgb: estimate.mean,
        median_rgb: estimate.median,
        std_rgb: estimate.std,
        delta,
        normalized_delta,
        edge_score: edge,
        reliable,
        method,
        pixel_count: n,
    }
}
