use crate::imaging::blur::gaussian_blur;
use crate::imaging::gray::Gray;

/// Horizontal and vertical Sobel responses with clamped borders.
pub fn sobel_gradients(image: &Gray) -> (Vec<f64>, Vec<f64>) {
    let (w, h) = (image.width, image.height);
    let mut gx = vec![0f64; w * h];
    let mut gy = vec![0f64; w * h];
    if w == 0 || h == 0 {
        return (gx, gy);
    }

    let sample = |x: isize, y: isize| -> f64 {
        let cx = x.max(0).min(w as isize - 1) as usize;
        let cy = y.max(0).min(h as isize - 1) as usize;
        image.data[cy * w + cx] as f64
    };

    for y in 0..h as isize {
        for x in 0..w as isize {
            let tl = sample(x - 1, y - 1);
            let tc = sample(x, y - 1);
            let tr = sample(x + 1, y - 1);
            let ml = sample(x - 1, y);
            let mr = sample(x + 1, y);
            let bl = sample(x - 1, y + 1);
            let bc = sample(x, y + 1);
            let br = sample(x + 1, y + 1);

            let i = y as usize * w + x as usize;
            gx[i] = (tr + 2.0 * mr + br) - (tl + 2.0 * ml + bl);
            gy[i] = (bl + 2.0 * bc + br) - (tl + 2.0 * tc + tr);
        }
    }
    (gx, gy)
}

/// Mean Sobel gradient magnitude over the whole image.
pub fn mean_gradient_magnitude(image: &Gray) -> f64 {
    if image.data.is_empty() {
        return 0.0;
    }
    let (gx, gy) = sobel_gradients(image);
    let total: f64 = gx
        .iter()
        .zip(&gy)
        .map(|(&x, &y)| (x * x + y * y).sqrt())
        .sum();
    total / image.data.len() as f64
}

/// Canny edge mask: Gaussian smoothing, Sobel gradients, non-maximum
/// suppression along the quantized gradient direction, then double
/// thresholding with hysteresis.
pub fn canny(image: &Gray, low: f64, high: f64) -> Gray {
    let (w, h) = (image.width, image.height);
    if w < 3 || h < 3 {
        return Gray::new(w, h);
    }

    let smoothed = gaussian_blur(image, 5);
    let (gx, gy) = sobel_gradients(&smoothed);
    let mag: Vec<f64> = gx
        .iter()
        .zip(&gy)
        .map(|(&x, &y)| (x * x + y * y).sqrt())
        .collect();

    // Non-maximum suppression over four quantized directions.
    let mut thin = vec![0f64; w * h];
    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let i = y * w + x;
            let m = mag[i];
            if m == 0.0 {
                continue;
            }
            let angle = gy[i].atan2(gx[i]).to_degrees().rem_euclid(180.0);
            let (a, b) = if !(22.5..157.5).contains(&angle) {
                (mag[i - 1], mag[i + 1])
            } else if angle < 67.5 {
                (mag[(y - 1) * w + (x + 1)], mag[(y + 1) * w + (x - 1)])
            } else if angle < 112.5 {
                (mag[(y - 1) * w + x], mag[(y + 1) * w + x])
            } else {
                (mag[(y - 1) * w + (x - 1)], mag[(y + 1) * w + (x + 1)])
            };
            if m >= a && m >= b {
                thin[i] = m;
            }
        }
    }

    // Double threshold, then grow weak edges that touch strong ones.
    const STRONG: u8 = 255;
    const WEAK: u8 = 1;
    let mut mask = vec![0u8; w * h];
    let mut stack = Vec::new();
    for (i, &m) in thin.iter().enumerate() {
        if m >= high {
            mask[i] = STRONG;
            stack.push(i);
        } else if m >= low {
            mask[i] = WEAK;
        }
    }

    while let Some(i) = stack.pop() {
        let x = (i % w) as isize;
        let y = (i / w) as isize;
        for dy in -1..=1isize {
            for dx in -1..=1isize {
                let (nx, ny) = (x + dx, y + dy);
                if nx < 0 || ny < 0 || nx >= w as isize || ny >= h as isize {
                    continue;
                }
                let j = ny as usize * w + nx as usize;
                if mask[j] == WEAK {
                    mask[j] = STRONG;
                    stack.push(j);
                }
            }
        }
    }

    for v in &mut mask {
        if *v != STRONG {
            *v = 0;
        }
    }
    Gray::from_data(mask, w, h)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn vertical_step(width: usize, height: usize) -> Gray {
        let mut g = Gray::new(width, height);
        for y in 0..height {
            for x in width / 2..width {
                g.set(x, y, 200);
            }
        }
        g
    }

    #[test]
    fn test_sobel_flat_image_is_zero() {
        let g = Gray::from_data(vec![77; 49], 7, 7);
        let (gx, gy) = sobel_gradients(&g);
        assert!(gx.iter().all(|&v| v == 0.0));
        assert!(gy.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_sobel_responds_to_vertical_edge() {
        let g = vertical_step(8, 8);
        let (gx, gy) = sobel_gradients(&g);
        // Strong horizontal gradient at the step, no vertical component.
        let i = 4 * 8 + 4;
        assert!(gx[i].abs() > 0.0);
        assert_relative_eq!(gy[i], 0.0);
    }

    #[test]
    fn test_mean_gradient_zero_for_flat() {
        let g = Gray::from_data(vec![10; 64], 8, 8);
        assert_relative_eq!(mean_gradient_magnitude(&g), 0.0);
    }

    #[test]
    fn test_canny_finds_step_edge() {
        let g = vertical_step(20, 20);
        let edges = canny(&g, 50.0, 150.0);
        assert!(edges.fill_ratio() > 0.0);
        // Edge pixels concentrate around the step column.
        let mut on_step = 0;
        for y in 0..20 {
            for x in 8..12 {
                if edges.at(x, y) > 0 {
                    on_step += 1;
                }
            }
        }
        assert!(on_step > 10);
    }

    #[test]
    fn test_canny_flat_image_has_no_edges() {
        let g = Gray::from_data(vec![128; 400], 20, 20);
        let edges = canny(&g, 50.0, 150.0);
        assert_relative_eq!(edges.fill_ratio(), 0.0);
    }

    #[test]
    fn test_canny_tiny_image_is_empty() {
        let g = Gray::from_data(vec![0, 255], 2, 1);
        let edges = canny(&g, 50.0, 150.0);
        assert_relative_eq!(edges.fill_ratio(), 0.0);
    }
}
