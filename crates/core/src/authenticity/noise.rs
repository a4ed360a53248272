//! Sensor-noise-pattern authenticity.
//!
//! Subtracting a denoised copy leaves the residual high-frequency noise a
//! real capture carries. Prints and screens flatten that residual, while
//! heavy scanner processing skews its spectrum. Scanned originals score
//! leniently: an almost-clean residual still earns the benefit of the
//! doubt.

use crate::imaging::blur::gaussian_blur_f64;
use crate::imaging::fourier::fft2_magnitude;
use crate::imaging::gray::Gray;

/// Residual-noise authenticity score in [0, 1].
pub fn noise_authenticity(gray: &Gray) -> f64 {
    if gray.is_empty() {
        return 0.0;
    }
    let image = if gray.width < 40 || gray.height < 40 {
        gray.resize(80, 50)
    } else {
        gray.clone()
    };
    let (w, h) = (image.width, image.height);

    let float: Vec<f64> = image.to_f64();
    let denoised = gaussian_blur_f64(&float, w, h, 5, 1.0);
    let residual: Vec<f64> = float.iter().zip(&denoised).map(|(a, b)| a - b).collect();

    let n = residual.len() as f64;
    let mean = residual.iter().sum::<f64>() / n;
    let variance = residual.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
    let abs_mean = mean.abs();

    // Spectral ratio: sensor noise keeps energy in the outer band.
    let spectrum = fft2_magnitude(&residual, w, h);
    let (cx, cy) = (w as f64 / 2.0, h as f64 / 2.0);
    let radius = w.min(h) as f64 / 4.0;
    let mut high = 0.0;
    let mut total = 0.0;
    for y in 0..h {
        for x in 0..w {
            let v = spectrum[y * w + x];
            total += v;
            let d = ((x as f64 - cx).powi(2) + (y as f64 - cy).powi(2)).sqrt();
            if d > radius {
                high += v;
            }
        }
    }
    let high_freq_ratio = high / (total + 1e-7);

    let variance_score = if variance > 2.0 {
        (variance / 50.0).min(1.0)
    } else {
        0.0
    };
    let mean_score = (1.0 - abs_mean / 15.0).max(0.0);
    let frequency_score = (high_freq_ratio * 2.0).min(1.0);

    let mut score = variance_score * 0.5 + mean_score * 0.3 + frequency_score * 0.2;

    // Very clean residuals look scanned rather than forged.
    if variance < 1.0 && abs_mean < 2.0 {
        score = score.max(0.4);
    }
    score
}
