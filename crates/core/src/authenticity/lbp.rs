//! Local-binary-pattern texture authenticity.
//!
//! Genuine documents carry print texture that separates them from photos
//! of photos and flat reproductions: uniform patterns dominate, entropy
//! stays moderate, and local variance is neither flat nor chaotic.

use crate::imaging::gray::Gray;

const RADIUS: f64 = 2.0;
const POINTS: usize = 16;

/// Texture authenticity score in [0, 1] from uniform-pattern statistics.
pub fn lbp_authenticity(gray: &Gray) -> f64 {
    if gray.is_empty() {
        return 0.0;
    }
    let image = if gray.width < 50 || gray.height < 50 {
        gray.resize(100, 60)
    } else {
        gray.clone()
    };

    let labels = label_image(&image);
    if labels.is_empty() {
        return 0.0;
    }

    // Histogram over POINTS + 2 uniform-pattern bins.
    let bins = POINTS + 2;
    let mut hist = vec![0f64; bins];
    for &l in &labels {
        hist[l as usize] += 1.0;
    }
    let total: f64 = hist.iter().sum();
    for v in &mut hist {
        *v /= total;
    }

    let uniformity: f64 = hist[..bins - 2].iter().sum();

    let entropy: f64 = hist
        .iter()
        .filter(|&&p| p > 0.0)
        .map(|&p| -p * p.log2())
        .sum();
    let normalized_entropy = (entropy / 4.0).min(1.0);

    let mean = labels.iter().map(|&l| l as f64).sum::<f64>() / labels.len() as f64;
    let variance = labels
        .iter()
        .map(|&l| {
            let d = l as f64 - mean;
            d * d
        })
        .sum::<f64>()
        / labels.len() as f64;
    let normalized_variance = (variance / 1000.0).min(1.0);

    let score = uniformity * 0.5 + (1.0 - normalized_entropy) * 0.3 + normalized_variance * 0.2;
    score.min(1.0)
}

/// Rotation-invariant uniform labels: patterns with at most two 0/1
/// transitions map to their popcount, the rest to one overflow bin.
fn label_image(image: &Gray) -> Vec<u8> {
    let (w, h) = (image.width, image.height);
    let r = RADIUS.ceil() as usize;
    if w <= 2 * r || h <= 2 * r {
        return Vec::new();
    }

    let offsets: Vec<(f64, f64)> = (0..POINTS)
        .map(|k| {
            let angle = std::f64::consts::TAU * k as f64 / POINTS as f64;
            (RADIUS * angle.cos(), -RADIUS * angle.sin())
        })
        .collect();

    let mut labels = Vec::with_capacity((w - 2 * r) * (h - 2 * r));
    for y in r..h - r {
        for x in r..w - r {
            let center = image.at(x, y) as f64;
            let mut bits = [false; POINTS];
            for (k, &(dx, dy)) in offsets.iter().enumerate() {
                bits[k] = bilinear(image, x as f64 + dx, y as f64 + dy) >= center;
            }

            let transitions = (0..POINTS)
                .filter(|&k| bits[k] != bits[(k + 1) % POINTS])
                .count();
            let label = if transitions <= 2 {
                bits.iter().filter(|&&b| b).count() as u8
            } else {
                (POINTS + 1) as u8
            };
            labels.push(label);
        }
    }
    labels
}

fn bilinear(image: &Gray, x: f64, y: f64) -> f64 {
    let x0 = x.floor() as usize;
    let y0 = y.floor() as usize;
    let x1 = (x0 + 1).min(image.width - 1);
    let y1 = (y0 + 1).min(image.height - 1);
    let fx = x - x0 as f64;
    let fy = y - y0 as f64;

    let v00 = image.at(x0, y0) as f64;
    let v10 = image.at(x1, y0) as f64;
    let v01 = image.at(x0, y1) as f64;
    let v11 = image.at(x1, y1) as f64;
    v00 * (1.0 - fx) * (1.0 - fy)
        + v10 * fx * (1.0 - fy)
        + v01 * (1.0 - fx) * fy
        + v11 * fx * fy
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noise_image(w: usize, h: usize) -> Gray {
        let mut g = Gray::new(w, h);
        let mut state = 0x853c49e6748fea9bu64;
        for v in &mut g.data {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            *v = (state >> 33) as u8;
        }
        g
    }

    #[test]
    fn test_score_in_unit_range() {
        for image in [
            Gray::from_data(vec![128; 80 * 60], 80, 60),
            noise_image(80, 60),
        ] {
            let s = lbp_authenticity(&image);
            assert!((0.0..=1.0).contains(&s), "score {s}");
        }
    }

    #[test]
    fn test_flat_image_scores_entropy_component_only() {
        // All-equal neighborhoods produce all-ones patterns: the
        // histogram collapses into the single all-set bin, so only the
        // zero-entropy term contributes.
        let s = lbp_authenticity(&Gray::from_data(vec![200; 80 * 60], 80, 60));
        assert!((s - 0.3).abs() < 1e-9, "flat score {s}");
    }

    #[test]
    fn test_smooth_gradient_is_mostly_uniform() {
        // A ramp yields two-transition half-circle patterns: uniform
        // labels dominate and the score clears the structured band.
        let mut g = Gray::new(80, 60);
        for y in 0..60 {
            for x in 0..80 {
                g.set(x, y, (x * 3) as u8);
            }
        }
        let s = lbp_authenticity(&g);
        assert!(s > 0.5, "gradient score {s}");
    }

    #[test]
    fn test_noise_scores_below_gradient() {
        let mut g = Gray::new(80, 60);
        for y in 0..60 {
            for x in 0..80 {
                g.set(x, y, (x * 3) as u8);
            }
        }
        let gradient = lbp_authenticity(&g);
        let noisy = lbp_authenticity(&noise_image(80, 60));
        assert!(noisy < gradient);
    }

    #[test]
    fn test_small_input_is_resized_not_skipped() {
        let s = lbp_authenticity(&noise_image(20, 20));
        assert!((0.0..=1.0).contains(&s));
    }

    #[test]
    fn test_empty_input_scores_zero() {
        assert_eq!(lbp_authenticity(&Gray::new(0, 0)), 0.0);
    }

    #[test]
    fn test_deterministic() {
        let image = noise_image(80, 60);
        assert_eq!(lbp_authenticity(&image), lbp_authenticity(&image));
    }
}
