//! Robust statistics and smoothing kernels for patch sampling

/// Gaussian kernels are truncated at this many standard deviations
const KERNEL_TRUNCATE: f64 = 4.0;

fn sorted(values: &[f64]) -> Vec<f64> {
    let mut v = values.to_vec();
    v.sort_by(|a, b| a.total_cmp(b));
    v
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Median; the two middle values are averaged for even lengths
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let v = sorted(values);
    let mid = v.len() / 2;
    if v.len() % 2 == 0 {
        (v[mid - 1] + v[mid]) / 2.0
    } else {
        v[mid]
    }
}

/// Mean after dropping `trim` of the values from each tail
pub fn trimmed_mean(values: &[f64], trim: f64) -> f64 {
    let v = sorted(values);
    let cut = (v.len() as f64 * trim) as usize;
    if cut > 0 && v.len() > 2 * cut {
        mean(&v[cut..v.len() - cut])
    } else {
        mean(&v)
    }
}

/// Population standard deviation
pub fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    (values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64).sqrt()
}

/// Weighted mean and weighted population standard deviation
pub fn weighted_mean_std(values: &[f64], weights: &[f64]) -> (f64, f64) {
    let total: f64 = weights.iter().sum();
    if values.is_empty() || total <= 0.0 {
        return (0.0, 0.0);
    }
    let m = values.iter().zip(weights).map(|(v, w)| v * w).sum::<f64>() / total;
    let var = values
        .iter()
        .zip(weights)
        .map(|(v, w)| w * (v - m).powi(2))
        .sum::<f64>()
        / total;
    (m, var.sqrt())
}

/// Normalised 1D Gaussian kernel of radius `round(4 * sigma)`
pub fn gaussian_kernel(sigma: f64) -> Vec<f64> {
    let radius = (KERNEL_TRUNCATE * sigma + 0.5) as isize;
    let mut kernel: Vec<f64> = (-radius..=radius)
        .map(|i| (-(i * i) as f64 / (2.0 * sigma * sigma)).exp())
        .collect();
    let sum: f64 = kernel.iter().sum();
    kernel.iter_mut().for_each(|k| *k /= sum);
    kernel
}

/// Mirror an out-of-range index back into `0..n` (`d c b a | a b c d | d c b a`)
#[inline]
fn reflect(mut i: isize, n: usize) -> usize {
    let n = n as isize;
    loop {
        if i < 0 {
            i = -i - 1;
        } else if i >= n {
            i = 2 * n - i - 1;
        } else {
            return i as usize;
        }
    }
}

/// Separable Gaussian blur of one plane with reflected borders
pub fn gaussian_blur(plane: &[f64], width: usize, height: usize, sigma: f64) -> Vec<f64> {
    if width == 0 || height == 0 || sigma <= 0.0 {
        return plane.to_vec();
    }
    let kernel = gaussian_kernel(sigma);
    let radius = (kernel.len() / 2) as isize;

    let mut horizontal = vec![0.0; width * height];
    for y in 0..height {
        let row = &plane[y * width..(y + 1) * width];
        for x in 0..width {
            horizontal[y * width + x] = kernel
                .iter()
                .enumerate()
                .map(|(k, w)| w * row[reflect(x as isize + k as isize - radius, width)])
                .sum();
        }
    }

    let mut out = vec![0.0; width * height];
    for y in 0..height {
        for x in 0..width {
            out[y * width + x] = kernel
                .iter()
                .enumerate()
                .map(|(k, w)| {
                    w * horizontal[reflect(y as isize + k as isize - radius, height) * width + x]
                })
                .sum();
        }
    }
    out
}

/// Gaussian blur of an interleaved multi-channel buffer, channel by channel
pub fn gaussian_blur_interleaved(
    data: &[f64],
    width: usize,
    height: usize,
    channels: usize,
    sigma: f64,
) -> Vec<f64> {
    let mut out = vec![0.0; data.len()];
    for c in 0..channels {
        let plane: Vec<f64> = data.iter().skip(c).step_by(channels).copied().collect();
        let blurred = gaussian_blur(&plane, width, height, sigma);
        for (i, v) in blurred.into_iter().enumerate() {
            out[i * channels + c] = v;
        }
    }
    out
}

/// Gaussian blur of a 2x2 mosaic that never mixes filter colours.
///
/// Each of the four parity lattices is extracted, blurred on its own with
/// `sigma / 2` (lattice spacing is two sensor pixels) and written back.
pub fn gaussian_blur_mosaic(plane: &[f64], width: usize, height: usize, sigma: f64) -> Vec<f64> {
    let mut out = plane.to_vec();
    for py in 0..2 {
        for px in 0..2 {
            let sw = (width + 1 - px) / 2;
            let sh = (height + 1 - py) / 2;
            if sw == 0 || sh == 0 {
                continue;
            }
            let mut sub = Vec::with_capacity(sw * sh);
            for sy in 0..sh {
                for sx in 0..sw {
                    sub.push(plane[(py + 2 * sy) * width + px + 2 * sx]);
                }
            }
            let blurred = gaussian_blur(&sub, sw, sh, sigma / 2.0);
            for sy in 0..sh {
                for sx in 0..sw {
                    out[(py + 2 * sy) * width + px + 2 * sx] = blurred[sy * sw + sx];
                }
            }
        }
    }
    out
}

/// 2D Gaussian weight mask centred on the patch, peak normalised to 1
pub fn gaussian_mask(width: usize, height: usize, sigma_scale: f64) -> Vec<f64> {
    let sigma = width.min(height) as f64 * sigma_scale;
    let (cx, cy) = (width as f64 / 2.0, height as f64 / 2.0);
    let mut mask: Vec<f64> = (0..height)
        .flat_map(|y| {
            (0..width).map(move |x| {
                let d2 = (x as f64 - cx).powi(2) + (y as f64 - cy).powi(2);
                (-d2 / (2.0 * sigma * sigma)).exp()
            })
        })
        .collect();
    let peak = mask.iter().copied().fold(0.0f64, f64::max);
    if peak > 0.0 {
        mask.iter_mut().for_each(|m| *m /= peak);
    }
    mask
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_median() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), 2.0);
        assert_eq!(median(&[4.0, 1.0, 2.0, 3.0]), 2.5);
        assert_eq!(median(&[]), 0.0);
    }

    #[test]
    fn test_trimmed_mean_drops_outliers() {
        let mut values = vec![10.0; 18];
        values.push(1000.0);
        values.push(-1000.0);
        // 20 values, 2 trimmed from each tail
        assert_eq!(trimmed_mean(&values, 0.1), 10.0);
        // Fewer than 10 values: nothing to trim
        assert_eq!(trimmed_mean(&[1.0, 2.0, 6.0], 0.1), 3.0);
    }

    #[test]
    fn test_std_and_weighted() {
        assert!((std_dev(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]) - 2.0).abs() < 1e-12);
        let (m, s) = weighted_mean_std(&[1.0, 3.0], &[3.0, 1.0]);
        assert!((m - 1.5).abs() < 1e-12);
        assert!((s - 0.75f64.sqrt()).abs() < 1e-12);
        assert_eq!(weighted_mean_std(&[], &[]), (0.0, 0.0));
    }

    #[test]
    fn test_kernel_normalised() {
        let k = gaussian_kernel(1.2);
        assert_eq!(k.len(), 11);
        assert!((k.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert!(k[5] > k[4] && (k[4] - k[6]).abs() < 1e-15);
    }

    #[test]
    fn test_reflect() {
        assert_eq!(reflect(-1, 5), 0);
        assert_eq!(reflect(-3, 5), 2);
        assert_eq!(reflect(5, 5), 4);
        assert_eq!(reflect(7, 5), 2);
        // Kernel wider than the plane
        assert_eq!(reflect(-4, 2), 0);
    }

    #[test]
    fn test_blur_preserves_constant() {
        let plane = vec![42.0; 7 * 5];
        for v in gaussian_blur(&plane, 7, 5, 1.5) {
            assert!((v - 42.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_blur_smooths_spike() {
        let mut plane = vec![0.0; 9 * 9];
        plane[4 * 9 + 4] = 81.0;
        let out = gaussian_blur(&plane, 9, 9, 1.2);
        assert!(out[4 * 9 + 4] < 81.0);
        assert!(out[4 * 9 + 5] > 0.0);
        assert!((out.iter().sum::<f64>() - 81.0).abs() < 1e-6);
    }

    #[test]
    fn test_mosaic_blur_keeps_lattices_apart() {
        // Alternating 10 / 20 columns and 30 rows below: three separate levels
        let (w, h) = (6, 6);
        let plane: Vec<f64> = (0..w * h)
            .map(|i| {
                let (x, y) = (i % w, i / w);
                match (x % 2, y % 2) {
                    (0, 0) => 10.0,
                    (1, 1) => 30.0,
                    _ => 20.0,
                }
            })
            .collect();
        let out = gaussian_blur_mosaic(&plane, w, h, 1.5);
        for (a, b) in plane.iter().zip(out.iter()) {
            assert!((a - b).abs() < 1e-9);
        }
    }

    #[test]
    fn test_mask_peak() {
        let mask = gaussian_mask(10, 6, 0.33);
        let peak = mask.iter().copied().fold(0.0f64, f64::max);
        assert!((peak - 1.0).abs() < 1e-12);
        assert_eq!(mask[3 * 10 + 5], 1.0);
        assert!(mask[0] < 0.1);
    }
}
