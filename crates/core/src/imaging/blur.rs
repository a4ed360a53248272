use crate::imaging::gray::Gray;

/// Precompute a 1D Gaussian kernel of the given size.
///
/// `kernel_size` must be odd and >= 1. Sigma is derived as
/// `kernel_size / 6.0`.
pub fn gaussian_kernel_1d(kernel_size: usize) -> Vec<f32> {
    gaussian_kernel_with_sigma(kernel_size, kernel_size as f64 / 6.0)
}

/// 1D Gaussian kernel with an explicit sigma, normalized to sum 1.
pub fn gaussian_kernel_with_sigma(kernel_size: usize, sigma: f64) -> Vec<f32> {
    debug_assert!(kernel_size >= 1 && kernel_size % 2 == 1);
    let half = (kernel_size / 2) as f64;
    let mut kernel: Vec<f64> = (0..kernel_size)
        .map(|i| {
            let x = i as f64 - half;
            (-x * x / (2.0 * sigma * sigma)).exp()
        })
        .collect();
    let sum: f64 = kernel.iter().sum();
    for v in &mut kernel {
        *v /= sum;
    }
    kernel.iter().map(|&v| v as f32).collect()
}

/// Separable Gaussian blur with clamped borders.
pub fn gaussian_blur(image: &Gray, kernel_size: usize) -> Gray {
    if kernel_size <= 1 || image.is_empty() {
        return image.clone();
    }
    let kernel = gaussian_kernel_1d(kernel_size);
    let half = kernel.len() / 2;
    let (w, h) = (image.width, image.height);

    let mut temp = vec![0f32; w * h];
    for y in 0..h {
        for x in 0..w {
            let mut sum = 0.0f32;
            for (k, &kw) in kernel.iter().enumerate() {
                let sx = (x as isize + k as isize - half as isize)
                    .max(0)
                    .min((w - 1) as isize) as usize;
                sum += image.data[y * w + sx] as f32 * kw;
            }
            temp[y * w + x] = sum;
        }
    }

    let mut out = Gray::new(w, h);
    for y in 0..h {
        for x in 0..w {
            let mut sum = 0.0f32;
            for (k, &kw) in kernel.iter().enumerate() {
                let sy = (y as isize + k as isize - half as isize)
                    .max(0)
                    .min((h - 1) as isize) as usize;
                sum += temp[sy * w + x] * kw;
            }
            out.data[y * w + x] = sum.round().clamp(0.0, 255.0) as u8;
        }
    }
    out
}

/// Separable Gaussian blur over a float buffer, used where the residual
/// after subtraction matters and byte rounding would destroy it.
pub fn gaussian_blur_f64(
    data: &[f64],
    width: usize,
    height: usize,
    kernel_size: usize,
    sigma: f64,
) -> Vec<f64> {
    if kernel_size <= 1 || width == 0 || height == 0 {
        return data.to_vec();
    }
    let kernel: Vec<f64> = gaussian_kernel_with_sigma(kernel_size, sigma)
        .iter()
        .map(|&v| v as f64)
        .collect();
    let half = kernel.len() / 2;

    let mut temp = vec![0f64; width * height];
    for y in 0..height {
        for x in 0..width {
            let mut sum = 0.0;
            for (k, &kw) in kernel.iter().enumerate() {
                let sx = (x as isize + k as isize - half as isize)
                    .max(0)
                    .min((width - 1) as isize) as usize;
                sum += data[y * width + sx] * kw;
            }
            temp[y * width + x] = sum;
        }
    }

    let mut out = vec![0f64; width * height];
    for y in 0..height {
        for x in 0..width {
            let mut sum = 0.0;
            for (k, &kw) in kernel.iter().enumerate() {
                let sy = (y as isize + k as isize - half as isize)
                    .max(0)
                    .min((height - 1) as isize) as usize;
                sum += temp[sy * width + x] * kw;
            }
            out[y * width + x] = sum;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kernel_sums_to_one() {
        let k = gaussian_kernel_1d(7);
        let sum: f32 = k.iter().sum();
        assert!((sum - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_kernel_is_symmetric() {
        let k = gaussian_kernel_1d(7);
        for i in 0..k.len() / 2 {
            assert!((k[i] - k[k.len() - 1 - i]).abs() < 1e-6);
        }
    }

    #[test]
    fn test_kernel_center_is_largest() {
        let k = gaussian_kernel_with_sigma(5, 1.0);
        let center = k[2];
        for (i, &v) in k.iter().enumerate() {
            if i != 2 {
                assert!(center >= v);
            }
        }
    }

    #[test]
    fn test_blur_uniform_image_unchanged() {
        let image = Gray::from_data(vec![128; 100], 10, 10);
        let blurred = gaussian_blur(&image, 5);
        assert!(blurred.data.iter().all(|&v| (v as i32 - 128).abs() <= 1));
    }

    #[test]
    fn test_blur_spreads_impulse() {
        let mut image = Gray::new(11, 11);
        image.set(5, 5, 255);
        let blurred = gaussian_blur(&image, 5);
        assert!(blurred.at(5, 5) < 255);
        assert!(blurred.at(6, 5) > 0);
        assert!(blurred.at(5, 6) > 0);
    }

    #[test]
    fn test_kernel_size_1_is_identity() {
        let image = Gray::from_data(vec![42; 25], 5, 5);
        assert_eq!(gaussian_blur(&image, 1), image);
    }

    #[test]
    fn test_f64_blur_preserves_mass_of_uniform() {
        let data = vec![10.0; 36];
        let out = gaussian_blur_f64(&data, 6, 6, 5, 1.0);
        for v in out {
            assert!((v - 10.0).abs() < 1e-9);
        }
    }
}
