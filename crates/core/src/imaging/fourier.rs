use rustfft::num_complex::Complex;
use rustfft::FftPlanner;

/// 2D FFT magnitude spectrum of a real-valued image, with the DC
/// component shifted to the center.
pub fn fft2_magnitude(data: &[f64], width: usize, height: usize) -> Vec<f64> {
    debug_assert_eq!(data.len(), width * height);
    if width == 0 || height == 0 {
        return Vec::new();
    }

    let mut planner = FftPlanner::<f64>::new();
    let row_fft = planner.plan_fft_forward(width);
    let col_fft = planner.plan_fft_forward(height);

    let mut buffer: Vec<Complex<f64>> =
        data.iter().map(|&v| Complex::new(v, 0.0)).collect();

    for row in buffer.chunks_exact_mut(width) {
        row_fft.process(row);
    }

    let mut column = vec![Complex::new(0.0, 0.0); height];
    for x in 0..width {
        for y in 0..height {
            column[y] = buffer[y * width + x];
        }
        col_fft.process(&mut column);
        for y in 0..height {
            buffer[y * width + x] = column[y];
        }
    }

    // Shift quadrants so low frequencies sit at the center.
    let mut out = vec![0f64; width * height];
    for y in 0..height {
        for x in 0..width {
            let sx = (x + width / 2) % width;
            let sy = (y + height / 2) % height;
            out[sy * width + sx] = buffer[y * width + x].norm();
        }
    }
    out
}

/// Shifted log-magnitude spectrum: `ln(1 + |F|)` per bin.
pub fn fft2_log_magnitude(data: &[f64], width: usize, height: usize) -> Vec<f64> {
    let mut spectrum = fft2_magnitude(data, width, height);
    for v in &mut spectrum {
        *v = (*v + 1.0).ln();
    }
    spectrum
}

/// Mean of spectrum bins whose distance from the center lies in
/// `[r_inner, r_outer)`. Returns 0 when the ring is empty.
pub fn ring_mean(spectrum: &[f64], width: usize, height: usize, r_inner: f64, r_outer: f64) -> f64 {
    let (cx, cy) = (width as f64 / 2.0, height as f64 / 2.0);
    let mut sum = 0.0;
    let mut count = 0usize;
    for y in 0..height {
        for x in 0..width {
            let d = ((x as f64 - cx).powi(2) + (y as f64 - cy).powi(2)).sqrt();
            if d >= r_inner && d < r_outer {
                sum += spectrum[y * width + x];
                count += 1;
            }
        }
    }
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}
