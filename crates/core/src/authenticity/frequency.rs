//! Frequency-domain authenticity.
//!
//! Printing and screen re-capture leave fingerprints in the spectrum:
//! halftone combs, aliasing, artificial sharpening. Two measures are
//! combined: a Fourier low/mid/high energy balance and a single-level
//! wavelet decomposition scored on sub-band energy and kurtosis.
//!
//! Results degrade sharply below ~64x40 pixels; callers gate on that
//! floor and this function answers a neutral 0.5 under it.

use crate::imaging::fourier::fft2_log_magnitude;
use crate::imaging::gray::Gray;

const MIN_WIDTH: usize = 64;
const MIN_HEIGHT: usize = 40;
const TARGET_SIZE: usize = 128;

/// Combined frequency-domain authenticity score in [0, 1].
pub fn frequency_authenticity(gray: &Gray) -> f64 {
    if gray.is_empty() {
        return 0.0;
    }
    if gray.width < MIN_WIDTH || gray.height < MIN_HEIGHT {
        return 0.5;
    }

    // Bound the transform size, preserving aspect ratio.
    let scale = (TARGET_SIZE as f64 / gray.width as f64)
        .min(TARGET_SIZE as f64 / gray.height as f64)
        .min(1.0);
    let (w, h) = (
        ((gray.width as f64) * scale).round() as usize,
        ((gray.height as f64) * scale).round() as usize,
    );
    let image = if (w, h) != (gray.width, gray.height) {
        gray.resize(w, h)
    } else {
        gray.clone()
    };

    let fourier = fourier_balance(&image);
    let wavelet = wavelet_statistics(&image);

    // Small regions lean more on the Fourier side.
    let score = if w * h < 5000 {
        fourier * 0.7 + wavelet * 0.3
    } else {
        fourier * 0.6 + wavelet * 0.4
    };
    score.clamp(0.0, 1.0)
}

/// Low/mid/high energy balance plus spectral variance.
fn fourier_balance(image: &Gray) -> f64 {
    let (w, h) = (image.width, image.height);
    let spectrum = fft2_log_magnitude(&image.to_f64(), w, h);
    let (cx, cy) = (w as f64 / 2.0, h as f64 / 2.0);
    let min_dim = w.min(h) as f64;
    let low_radius = min_dim / 8.0;
    let mid_radius = min_dim / 4.0;

    let mut low = vec![0f64; spectrum.len()];
    let mut mid = vec![0f64; spectrum.len()];
    let mut high = vec![0f64; spectrum.len()];
    for y in 0..h {
        for x in 0..w {
            let i = y * w + x;
            let d = ((x as f64 - cx).powi(2) + (y as f64 - cy).powi(2)).sqrt();
            if d <= low_radius {
                low[i] = spectrum[i];
            } else if d <= mid_radius {
                mid[i] = spectrum[i];
            } else {
                high[i] = spectrum[i];
            }
        }
    }

    let low_energy: f64 = low.iter().sum();
    let mid_energy: f64 = mid.iter().sum();
    let high_energy: f64 = high.iter().sum();
    let total = low_energy + mid_energy + high_energy;
    if total == 0.0 {
        return 0.0;
    }

    // Natural captures spread roughly 40/40/20 across the bands; strong
    // departures indicate blur or artificial sharpening.
    let balance = 1.0 - (0.4 - low_energy / total).abs() - (0.4 - mid_energy / total).abs()
        - (0.2 - high_energy / total).abs();
    let balance_score = (balance * 2.5).clamp(0.0, 1.0);

    let variance_score = ((masked_variance(&low) + masked_variance(&mid)) / 20.0).min(1.0);

    balance_score * 0.7 + variance_score * 0.3
}

fn masked_variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n
}

// ── Wavelet decomposition ────────────────────────────────────────────

/// Daubechies-4 decomposition low-pass filter taps.
const DEC_LO: [f64; 8] = [
    -0.010597401784997278,
    0.032883011666982945,
    0.030841381835986965,
    -0.18703481171888114,
    -0.02798376941698385,
    0.6308807679295904,
    0.7148465705525415,
    0.23037781330885523,
];

/// Matching high-pass taps via the quadrature-mirror relation.
const DEC_HI: [f64; 8] = [
    -0.23037781330885523,
    0.7148465705525415,
    -0.6308807679295904,
    -0.02798376941698385,
    0.18703481171888114,
    0.030841381835986965,
    -0.032883011666982945,
    -0.010597401784997278,
];

/// Sub-band energy distribution and detail kurtosis of one decomposition
/// level.
fn wavelet_statistics(image: &Gray) -> f64 {
    let Some((ca, ch, cv, cd)) = dwt2(&image.to_f64(), image.width, image.height) else {
        return 0.0;
    };

    let energy = |band: &[f64]| band.iter().map(|v| v * v).sum::<f64>();
    let ca_energy = energy(&ca);
    let detail_energy = energy(&ch) + energy(&cv) + energy(&cd);
    let total = ca_energy + detail_energy;
    if total == 0.0 {
        return 0.0;
    }

    let detail_ratio = detail_energy / total;
    let energy_score = if detail_ratio > 0.1 {
        (detail_ratio * 4.0).min(1.0)
    } else {
        0.0
    };

    let avg_kurtosis = (kurtosis(&ch) + kurtosis(&cv) + kurtosis(&cd)) / 3.0;
    // Natural detail coefficients are leptokurtic around the Gaussian
    // reference value of 3.
    let kurtosis_score = (1.0 - (avg_kurtosis - 3.0).abs() / 10.0).max(0.0);

    energy_score * 0.6 + kurtosis_score * 0.4
}

/// Single-level 2D discrete wavelet transform with symmetric extension.
/// Returns `(approximation, horizontal, vertical, diagonal)` sub-bands.
fn dwt2(data: &[f64], width: usize, height: usize) -> Option<(Vec<f64>, Vec<f64>, Vec<f64>, Vec<f64>)> {
    if width < DEC_LO.len() || height < DEC_LO.len() {
        return None;
    }

    // Rows first.
    let out_w = (width + DEC_LO.len() - 1) / 2;
    let mut rows_lo = vec![0f64; out_w * height];
    let mut rows_hi = vec![0f64; out_w * height];
    let mut row = vec![0f64; width];
    for y in 0..height {
        row.copy_from_slice(&data[y * width..(y + 1) * width]);
        let lo = dwt1d(&row, &DEC_LO);
        let hi = dwt1d(&row, &DEC_HI);
        rows_lo[y * out_w..(y + 1) * out_w].copy_from_slice(&lo);
        rows_hi[y * out_w..(y + 1) * out_w].copy_from_slice(&hi);
    }

    // Then columns of each half.
    let out_h = (height + DEC_LO.len() - 1) / 2;
    let mut ca = vec![0f64; out_w * out_h];
    let mut ch = vec![0f64; out_w * out_h];
    let mut cv = vec![0f64; out_w * out_h];
    let mut cd = vec![0f64; out_w * out_h];
    let mut column = vec![0f64; height];
    for x in 0..out_w {
        for y in 0..height {
            column[y] = rows_lo[y * out_w + x];
        }
        let lo = dwt1d(&column, &DEC_LO);
        let hi = dwt1d(&column, &DEC_HI);
        for y in 0..out_h {
            ca[y * out_w + x] = lo[y];
            ch[y * out_w + x] = hi[y];
        }

        for y in 0..height {
            column[y] = rows_hi[y * out_w + x];
        }
        let lo = dwt1d(&column, &DEC_LO);
        let hi = dwt1d(&column, &DEC_HI);
        for y in 0..out_h {
            cv[y * out_w + x] = lo[y];
            cd[y * out_w + x] = hi[y];
        }
    }

    Some((ca, ch, cv, cd))
}

/// Convolve with symmetric boundary extension and downsample by two.
fn dwt1d(signal: &[f64], filter: &[f64]) -> Vec<f64> {
    let n = signal.len() as isize;
    let fl = filter.len() as isize;
    let out_len = ((n + fl - 1) / 2) as usize;

    let sample = |i: isize| -> f64 {
        // Symmetric half-sample reflection: ... s1 s0 | s0 s1 ... sn-1 | sn-1 ...
        let mut idx = i;
        if idx < 0 {
            idx = -idx - 1;
        }
        if idx >= n {
            idx = 2 * n - idx - 1;
        }
        signal[idx.clamp(0, n - 1) as usize]
    };

    (0..out_len)
        .map(|k| {
            let base = 2 * k as isize + 1;
            (0..fl).map(|j| filter[j as usize] * sample(base - j)).sum()
        })
        .collect()
}

/// Fourth standardized moment; 0 for degenerate input.
pub fn kurtosis(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    let n = data.len() as f64;
    let mean = data.iter().sum::<f64>() / n;
    let variance = data.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
    if variance <= 1e-12 {
        return 0.0;
    }
    let std = variance.sqrt();
    data.iter().map(|v| ((v - mean) / std).powi(4)).sum::<f64>() / n
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn noise_image(w: usize, h: usize) -> Gray {
        let mut g = Gray::new(w, h);
        let mut state = 0x2545f4914f6cdd1du64;
        for v in &mut g.data {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            *v = (state >> 33) as u8;
        }
        g
    }

    #[test]
    fn test_kurtosis_of_gaussian_like_data() {
        // Sum of uniforms approximates a normal; kurtosis near 3.
        let mut state = 0x1234_5678u64;
        let data: Vec<f64> = (0..20000)
            .map(|_| {
                let mut acc = 0.0;
                for _ in 0..12 {
                    state = state
                        .wrapping_mul(6364136223846793005)
                        .wrapping_add(1442695040888963407);
                    acc += ((state >> 33) as f64) / (u32::MAX >> 1) as f64;
                }
                acc - 6.0
            })
            .collect();
        let k = kurtosis(&data);
        assert!((k - 3.0).abs() < 0.3, "kurtosis {k}");
    }

    #[test]
    fn test_kurtosis_degenerate_is_zero() {
        assert_relative_eq!(kurtosis(&[5.0; 100]), 0.0);
        assert_relative_eq!(kurtosis(&[]), 0.0);
    }

    #[test]
    fn test_dwt1d_output_length() {
        let signal = vec![1.0; 64];
        assert_eq!(dwt1d(&signal, &DEC_LO).len(), (64 + 8 - 1) / 2);
    }

    #[test]
    fn test_dwt_constant_signal_has_no_detail() {
        // The high-pass filter sums to zero, so a constant signal puts
        // all energy in the approximation band.
        let signal = vec![10.0; 64];
        let detail = dwt1d(&signal, &DEC_HI);
        for v in detail {
            assert!(v.abs() < 1e-9, "detail {v}");
        }
    }

    #[test]
    fn test_dwt2_subband_shapes() {
        let data = vec![0.0; 64 * 40];
        let (ca, ch, cv, cd) = dwt2(&data, 64, 40).unwrap();
        let expected = ((64 + 7) / 2) * ((40 + 7) / 2);
        assert_eq!(ca.len(), expected);
        assert_eq!(ch.len(), expected);
        assert_eq!(cv.len(), expected);
        assert_eq!(cd.len(), expected);
    }

    #[test]
    fn test_below_floor_returns_neutral() {
        assert_relative_eq!(frequency_authenticity(&noise_image(32, 20)), 0.5);
        assert_relative_eq!(frequency_authenticity(&noise_image(100, 20)), 0.5);
    }

    #[test]
    fn test_score_in_unit_range() {
        for image in [
            Gray::from_data(vec![128; 128 * 80], 128, 80),
            noise_image(128, 80),
        ] {
            let s = frequency_authenticity(&image);
            assert!((0.0..=1.0).contains(&s), "score {s}");
        }
    }

    #[test]
    fn test_large_input_is_bounded() {
        // 400x300 resizes under the 128 cap without panicking.
        let s = frequency_authenticity(&noise_image(400, 300));
        assert!((0.0..=1.0).contains(&s));
    }

    #[test]
    fn test_deterministic() {
        let image = noise_image(100, 64);
        assert_eq!(
            frequency_authenticity(&image),
            frequency_authenticity(&image)
        );
    }
}
