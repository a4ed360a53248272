//! Gray-level co-occurrence texture authenticity.
//!
//! Second-order statistics over multiple offsets and directions; genuine
//! card stock shows moderate contrast, high homogeneity, and organized
//! correlation structure.

use crate::imaging::gray::Gray;

const LEVELS: usize = 8;
const DISTANCES: [usize; 2] = [1, 2];
/// Offsets as (row, col) steps for 0, 45, 90, and 135 degrees.
const ANGLES: [(i32, i32); 4] = [(0, 1), (-1, 1), (-1, 0), (-1, -1)];

/// Averaged co-occurrence properties combined into one authenticity
/// score in [0, 1].
pub fn glcm_authenticity(gray: &Gray) -> f64 {
    if gray.is_empty() {
        return 0.0;
    }
    let image = if gray.width < 30 || gray.height < 30 {
        gray.resize(60, 40)
    } else {
        gray.clone()
    };

    // Quantize to a small number of levels to keep the matrices dense.
    let quantized: Vec<u8> = image.data.iter().map(|&v| v / 32).collect();

    let mut contrast_sum = 0.0;
    let mut homogeneity_sum = 0.0;
    let mut energy_sum = 0.0;
    let mut correlation_sum = 0.0;
    let mut combos = 0usize;

    for &distance in &DISTANCES {
        for &(dr, dc) in &ANGLES {
            let offset = (dr * distance as i32, dc * distance as i32);
            if let Some(props) = cooccurrence_properties(&quantized, image.width, image.height, offset)
            {
                contrast_sum += props.contrast;
                homogeneity_sum += props.homogeneity;
                energy_sum += props.energy;
                correlation_sum += props.correlation;
                combos += 1;
            }
        }
    }
    if combos == 0 {
        return 0.0;
    }

    let avg_contrast = contrast_sum / combos as f64;
    let avg_homogeneity = homogeneity_sum / combos as f64;
    let avg_energy = energy_sum / combos as f64;
    let avg_correlation = correlation_sum / combos as f64;

    let contrast_score = 1.0 - (avg_contrast / 10.0).min(1.0);
    let homogeneity_score = (avg_homogeneity * 2.0).min(1.0);
    let energy_score = (avg_energy * 5.0).min(1.0);
    let correlation_score = (avg_correlation + 0.5).min(1.0).max(0.0);

    contrast_score * 0.3 + homogeneity_score * 0.3 + energy_score * 0.2 + correlation_score * 0.2
}

struct GlcmProperties {
    contrast: f64,
    homogeneity: f64,
    energy: f64,
    correlation: f64,
}

/// Symmetric, normalized co-occurrence matrix for one (row, col) offset,
/// reduced to the four texture properties.
fn cooccurrence_properties(
    data: &[u8],
    width: usize,
    height: usize,
    (dr, dc): (i32, i32),
) -> Option<GlcmProperties> {
    let mut matrix = [[0f64; LEVELS]; LEVELS];
    let mut pairs = 0usize;

    for y in 0..height as i32 {
        for x in 0..width as i32 {
            let (ny, nx) = (y + dr, x + dc);
            if ny < 0 || nx < 0 || ny >= height as i32 || nx >= width as i32 {
                continue;
            }
            let a = data[y as usize * width + x as usize] as usize;
            let b = data[ny as usize * width + nx as usize] as usize;
            matrix[a][b] += 1.0;
            matrix[b][a] += 1.0; // symmetric
            pairs += 2;
        }
    }
    if pairs == 0 {
        return None;
    }
    for row in &mut matrix {
        for v in row.iter_mut() {
            *v /= pairs as f64;
        }
    }

    let mut contrast = 0.0;
    let mut homogeneity = 0.0;
    let mut asm = 0.0;
    let mut mean_i = 0.0;
    for (i, row) in matrix.iter().enumerate() {
        for (j, &p) in row.iter().enumerate() {
            let diff = i as f64 - j as f64;
            contrast += p * diff * diff;
            homogeneity += p / (1.0 + diff * diff);
            asm += p * p;
            mean_i += p * i as f64;
        }
    }

    let mut var_i = 0.0;
    for (i, row) in matrix.iter().enumerate() {
        let pi: f64 = row.iter().sum();
        var_i += pi * (i as f64 - mean_i).powi(2);
    }

    // With a symmetric matrix the marginals coincide, so one mean and
    // variance serve both axes.
    let correlation = if var_i > 1e-12 {
        let mut corr = 0.0;
        for (i, row) in matrix.iter().enumerate() {
            for (j, &p) in row.iter().enumerate() {
                corr += p * (i as f64 - mean_i) * (j as f64 - mean_i);
            }
        }
        corr / var_i
    } else {
        1.0
    };

    Some(GlcmProperties {
        contrast,
        homogeneity,
        energy: asm.sqrt(),
        correlation,
    })
}
