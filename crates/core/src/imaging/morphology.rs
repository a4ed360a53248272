use crate::imaging::gray::Gray;

/// Binary dilation with a square structuring element of side `kernel`.
pub fn dilate(mask: &Gray, kernel: usize) -> Gray {
    transform(mask, kernel, |any_set| any_set)
}

/// Binary erosion with a square structuring element of side `kernel`.
pub fn erode(mask: &Gray, kernel: usize) -> Gray {
    let mut inverted = mask.clone();
    for v in &mut inverted.data {
        *v = if *v > 0 { 0 } else { 255 };
    }
    let mut out = dilate(&inverted, kernel);
    for v in &mut out.data {
        *v = if *v > 0 { 0 } else { 255 };
    }
    out
}

/// Closing: dilation followed by erosion. Fills small holes.
pub fn close(mask: &Gray, kernel: usize) -> Gray {
    erode(&dilate(mask, kernel), kernel)
}

/// Opening: erosion followed by dilation. Removes small specks.
pub fn open(mask: &Gray, kernel: usize) -> Gray {
    dilate(&erode(mask, kernel), kernel)
}

/// Repeated dilation, matching the iterated form used for text grouping.
pub fn dilate_iter(mask: &Gray, kernel: usize, iterations: usize) -> Gray {
    let mut out = mask.clone();
    for _ in 0..iterations {
        out = dilate(&out, kernel);
    }
    out
}

fn transform(mask: &Gray, kernel: usize, accept: impl Fn(bool) -> bool) -> Gray {
    let (w, h) = (mask.width, mask.height);
    if kernel <= 1 || w == 0 || h == 0 {
        return mask.clone();
    }
    let half = (kernel / 2) as isize;
    let mut out = Gray::new(w, h);
    for y in 0..h as isize {
        for x in 0..w as isize {
            let mut any_set = false;
            'scan: for dy in -half..=half {
                for dx in -half..=half {
                    let (nx, ny) = (x + dx, y + dy);
                    if nx < 0 || ny < 0 || nx >= w as isize || ny >= h as isize {
                        continue;
                    }
                    if mask.data[ny as usize * w + nx as usize] > 0 {
                        any_set = true;
                        break 'scan;
                    }
                }
            }
            if accept(any_set) {
                out.data[y as usize * w + x as usize] = 255;
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dot_mask() -> Gray {
        let mut m = Gray::new(9, 9);
        m.set(4, 4, 255);
        m
    }

    #[test]
    fn test_dilate_grows_single_pixel() {
        let d = dilate(&dot_mask(), 3);
        for y in 3..=5 {
            for x in 3..=5 {
                assert_eq!(d.at(x, y), 255);
            }
        }
        assert_eq!(d.at(0, 0), 0);
    }

    #[test]
    fn test_erode_removes_single_pixel() {
        let e = erode(&dot_mask(), 3);
        assert_eq!(e.fill_ratio(), 0.0);
    }

    #[test]
    fn test_open_removes_speck_keeps_block() {
        let mut m = Gray::new(12, 12);
        m.set(1, 1, 255); // speck
        for y in 5..10 {
            for x in 5..10 {
                m.set(x, y, 255); // 5x5 block
            }
        }
        let o = open(&m, 3);
        assert_eq!(o.at(1, 1), 0);
        assert_eq!(o.at(7, 7), 255);
    }

    #[test]
    fn test_close_fills_hole() {
        let mut m = Gray::new(12, 12);
        for y in 3..9 {
            for x in 3..9 {
                m.set(x, y, 255);
            }
        }
        m.set(6, 6, 0); // one-pixel hole
        let c = close(&m, 3);
        assert_eq!(c.at(6, 6), 255);
    }

    #[test]
    fn test_kernel_one_is_identity() {
        let m = dot_mask();
        assert_eq!(dilate(&m, 1), m);
        assert_eq!(erode(&m, 1), m);
    }

    #[test]
    fn test_dilate_iter_grows_further() {
        let once = dilate(&dot_mask(), 3);
        let twice = dilate_iter(&dot_mask(), 3, 2);
        assert!(twice.fill_ratio() > once.fill_ratio());
        assert_eq!(twice.at(2, 4), 255);
    }
}
