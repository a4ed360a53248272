//! Planar homography estimation for geometric match verification.
//!
//! Direct Linear Transform over normalized correspondences, wrapped in a
//! seeded RANSAC loop so repeated runs give identical inlier sets.

use nalgebra::{DMatrix, Matrix3, Vector3};
use rand::prelude::*;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum HomographyError {
    #[error("too few correspondences: need {needed}, got {got}")]
    TooFewPoints { needed: usize, got: usize },
    #[error("degenerate geometry: {0}")]
    Degenerate(String),
    #[error("insufficient inliers: need {needed}, found {found}")]
    InsufficientInliers { needed: usize, found: usize },
}

/// Apply a 3x3 homography to a point.
pub fn project(h: &Matrix3<f64>, x: f64, y: f64) -> [f64; 2] {
    let p = h * Vector3::new(x, y, 1.0);
    if p[2].abs() < 1e-15 {
        return [f64::NAN, f64::NAN];
    }
    [p[0] / p[2], p[1] / p[2]]
}

/// Euclidean distance between `project(h, src)` and `dst`.
pub fn reprojection_error(h: &Matrix3<f64>, src: &[f64; 2], dst: &[f64; 2]) -> f64 {
    let p = project(h, src[0], src[1]);
    let dx = p[0] - dst[0];
    let dy = p[1] - dst[1];
    (dx * dx + dy * dy).sqrt()
}

/// Translate centroid to origin and scale to mean distance sqrt(2),
/// the standard conditioning step before the linear solve.
fn normalize_points(pts: &[[f64; 2]]) -> (Matrix3<f64>, Vec<[f64; 2]>) {
    let n = pts.len() as f64;
    let cx: f64 = pts.iter().map(|p| p[0]).sum::<f64>() / n;
    let cy: f64 = pts.iter().map(|p| p[1]).sum::<f64>() / n;

    let mean_dist: f64 = pts
        .iter()
        .map(|p| ((p[0] - cx).powi(2) + (p[1] - cy).powi(2)).sqrt())
        .sum::<f64>()
        / n;

    let s = if mean_dist > 1e-15 {
        std::f64::consts::SQRT_2 / mean_dist
    } else {
        1.0
    };

    let t = Matrix3::new(s, 0.0, -s * cx, 0.0, s, -s * cy, 0.0, 0.0, 1.0);
    let normalized = pts.iter().map(|p| [s * (p[0] - cx), s * (p[1] - cy)]).collect();
    (t, normalized)
}

/// Estimate a homography from >= 4 correspondences.
pub fn estimate_dlt(src: &[[f64; 2]], dst: &[[f64; 2]]) -> Result<Matrix3<f64>, HomographyError> {
    let n = src.len();
    if n < 4 || dst.len() < 4 {
        return Err(HomographyError::TooFewPoints {
            needed: 4,
            got: n.min(dst.len()),
        });
    }
    if src.len() != dst.len() {
        return Err(HomographyError::Degenerate(
            "source and destination counts differ".into(),
        ));
    }

    let (t_src, src_n) = normalize_points(src);
    let (t_dst, dst_n) = normalize_points(dst);

    let mut a = DMatrix::zeros(2 * n, 9);
    for i in 0..n {
        let (sx, sy) = (src_n[i][0], src_n[i][1]);
        let (dx, dy) = (dst_n[i][0], dst_n[i][1]);

        a[(2 * i, 3)] = -sx;
        a[(2 * i, 4)] = -sy;
        a[(2 * i, 5)] = -1.0;
        a[(2 * i, 6)] = dy * sx;
        a[(2 * i, 7)] = dy * sy;
        a[(2 * i, 8)] = dy;

        a[(2 * i + 1, 0)] = sx;
        a[(2 * i + 1, 1)] = sy;
        a[(2 * i + 1, 2)] = 1.0;
        a[(2 * i + 1, 6)] = -dx * sx;
        a[(2 * i + 1, 7)] = -dx * sy;
        a[(2 * i + 1, 8)] = -dx;
    }

    // The solution is the eigenvector of A^T A with the smallest
    // eigenvalue; solving the 9x9 symmetric problem sidesteps thin-SVD
    // shape concerns.
    let ata = a.transpose() * &a;
    let eig = nalgebra::SymmetricEigen::new(ata);

    let mut min_idx = 0;
    let mut min_val = eig.eigenvalues[0].abs();
    for i in 1..9 {
        let v = eig.eigenvalues[i].abs();
        if v < min_val {
            min_val = v;
            min_idx = i;
        }
    }
    let hv: Vec<f64> = (0..9).map(|j| eig.eigenvectors[(j, min_idx)]).collect();
    let h_norm = Matrix3::new(hv[0], hv[1], hv[2], hv[3], hv[4], hv[5], hv[6], hv[7], hv[8]);

    let t_dst_inv = t_dst
        .try_inverse()
        .ok_or_else(|| HomographyError::Degenerate("destination transform not invertible".into()))?;
    let h = t_dst_inv * h_norm * t_src;

    let scale = h[(2, 2)];
    if scale.abs() < 1e-15 {
        Ok(h)
    } else {
        Ok(h / scale)
    }
}

#[derive(Debug, Clone)]
pub struct RansacConfig {
    pub max_iters: usize,
    /// Inlier threshold on reprojection error, in pixels.
    pub inlier_threshold: f64,
    pub min_inliers: usize,
    /// Fixed seed: the sampling sequence, and therefore the fitted model,
    /// is reproducible across calls.
    pub seed: u64,
}

impl Default for RansacConfig {
    fn default() -> Self {
        Self {
            max_iters: 1000,
            inlier_threshold: 5.0,
            min_inliers: 4,
            seed: 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RansacResult {
    pub h: Matrix3<f64>,
    pub inlier_mask: Vec<bool>,
    pub n_inliers: usize,
}

/// Robust homography fit: sample minimal sets, keep the consensus model,
/// refit on all inliers.
pub fn fit_ransac(
    src: &[[f64; 2]],
    dst: &[[f64; 2]],
    config: &RansacConfig,
) -> Result<RansacResult, HomographyError> {
    let n = src.len();
    if n < 4 {
        return Err(HomographyError::TooFewPoints { needed: 4, got: n });
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut best_inliers = 0usize;
    let mut best_mask = vec![false; n];
    let mut best_h = Matrix3::identity();

    for _ in 0..config.max_iters {
        let mut indices = [0usize; 4];
        let mut attempts = 0;
        loop {
            for idx in &mut indices {
                *idx = rng.gen_range(0..n);
            }
            let distinct = (0..4).all(|i| (i + 1..4).all(|j| indices[i] != indices[j]));
            if distinct || attempts > 100 {
                break;
            }
            attempts += 1;
        }

        let s4: Vec<[f64; 2]> = indices.iter().map(|&i| src[i]).collect();
        let d4: Vec<[f64; 2]> = indices.iter().map(|&i| dst[i]).collect();
        let Ok(h) = estimate_dlt(&s4, &d4) else {
            continue;
        };

        let mut count = 0usize;
        let mut mask = vec![false; n];
        for i in 0..n {
            if reprojection_error(&h, &src[i], &dst[i]) < config.inlier_threshold {
                mask[i] = true;
                count += 1;
            }
        }

        if count > best_inliers {
            best_inliers = count;
            best_mask = mask;
            best_h = h;
            if count * 10 > n * 9 {
                break;
            }
        }
    }

    if best_inliers < config.min_inliers {
        return Err(HomographyError::InsufficientInliers {
            needed: config.min_inliers,
            found: best_inliers,
        });
    }

    let inlier_src: Vec<[f64; 2]> = (0..n).filter(|&i| best_mask[i]).map(|i| src[i]).collect();
    let inlier_dst: Vec<[f64; 2]> = (0..n).filter(|&i| best_mask[i]).map(|i| dst[i]).collect();
    let h_refit = estimate_dlt(&inlier_src, &inlier_dst).unwrap_or(best_h);

    let mut final_mask = vec![false; n];
    let mut final_inliers = 0usize;
    for i in 0..n {
        if reprojection_error(&h_refit, &src[i], &dst[i]) < config.inlier_threshold {
            final_mask[i] = true;
            final_inliers += 1;
        }
    }

    Ok(RansacResult {
        h: h_refit,
        inlier_mask: final_mask,
        n_inliers: final_inliers,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn test_homography() -> Matrix3<f64> {
        Matrix3::new(1.4, 0.05, 120.0, -0.02, 1.3, 80.0, 0.0001, -0.00005, 1.0)
    }

    #[test]
    fn test_dlt_exact_four_points() {
        let h_true = test_homography();
        let src = [[0.0, 0.0], [100.0, 0.0], [100.0, 60.0], [0.0, 60.0]];
        let dst: Vec<[f64; 2]> = src.iter().map(|s| project(&h_true, s[0], s[1])).collect();

        let h_est = estimate_dlt(&src, &dst).unwrap();
        for (s, d) in src.iter().zip(&dst) {
            assert!(reprojection_error(&h_est, s, d) < 1e-6);
        }
    }

    #[test]
    fn test_dlt_overdetermined_grid() {
        let h_true = test_homography();
        let mut src = Vec::new();
        let mut dst = Vec::new();
        for i in 0..5 {
            for j in 0..5 {
                let s = [i as f64 * 20.0, j as f64 * 12.0];
                src.push(s);
                dst.push(project(&h_true, s[0], s[1]));
            }
        }
        let h_est = estimate_dlt(&src, &dst).unwrap();
        for (s, d) in src.iter().zip(&dst) {
            assert!(reprojection_error(&h_est, s, d) < 1e-6);
        }
    }

    #[test]
    fn test_dlt_too_few_points() {
        let pts = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0]];
        assert!(matches!(
            estimate_dlt(&pts, &pts),
            Err(HomographyError::TooFewPoints { .. })
        ));
    }

    #[test]
    fn test_ransac_rejects_outliers() {
        let h_true = test_homography();
        let mut src = Vec::new();
        let mut dst = Vec::new();
        for i in 0..16 {
            let s = [(i % 4) as f64 * 30.0, (i / 4) as f64 * 20.0];
            src.push(s);
            dst.push(project(&h_true, s[0], s[1]));
        }
        // Gross outliers.
        for i in 0..6 {
            src.push([5.0 + i as f64 * 13.0, 7.0 + i as f64 * 11.0]);
            dst.push([500.0 - i as f64 * 40.0, 3.0 + i as f64 * 90.0]);
        }

        let result = fit_ransac(&src, &dst, &RansacConfig::default()).unwrap();
        assert!(result.n_inliers >= 16, "inliers {}", result.n_inliers);
        for i in 0..16 {
            assert!(result.inlier_mask[i], "point {i} should be an inlier");
        }
    }

    #[test]
    fn test_ransac_is_deterministic_for_fixed_seed() {
        let h_true = test_homography();
        let mut src = Vec::new();
        let mut dst = Vec::new();
        for i in 0..12 {
            let s = [(i % 4) as f64 * 25.0, (i / 4) as f64 * 18.0];
            src.push(s);
            dst.push(project(&h_true, s[0], s[1]));
        }
        src.push([3.0, 90.0]);
        dst.push([700.0, 700.0]);

        let config = RansacConfig::default();
        let a = fit_ransac(&src, &dst, &config).unwrap();
        let b = fit_ransac(&src, &dst, &config).unwrap();
        assert_eq!(a.inlier_mask, b.inlier_mask);
        assert_eq!(a.n_inliers, b.n_inliers);
    }

    #[test]
    fn test_ransac_insufficient_inliers() {
        // Pure noise: no consistent model covering 9 of 10 points exists.
        let src: Vec<[f64; 2]> = (0..10)
            .map(|i| [(i * 7 % 13) as f64 * 9.0, (i * 5 % 11) as f64 * 8.0])
            .collect();
        let dst: Vec<[f64; 2]> = (0..10)
            .map(|i| [(i * 11 % 17) as f64 * 23.0, (i * 3 % 7) as f64 * 31.0])
            .collect();
        let config = RansacConfig {
            min_inliers: 9,
            inlier_threshold: 0.5,
            ..RansacConfig::default()
        };
        assert!(matches!(
            fit_ransac(&src, &dst, &config),
            Err(HomographyError::InsufficientInliers { .. })
        ));
    }

    #[test]
    fn test_project_roundtrip() {
        let h = test_homography();
        let h_inv = h.try_inverse().unwrap();
        let p = [50.0, 75.0];
        let q = project(&h, p[0], p[1]);
        let back = project(&h_inv, q[0], q[1]);
        assert_relative_eq!(p[0], back[0], epsilon = 1e-8);
        assert_relative_eq!(p[1], back[1], epsilon = 1e-8);
    }
}
