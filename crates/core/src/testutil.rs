//! Synthetic frames shared across module tests.

use crate::shared::frame::Frame;
use crate::shared::region::Region;

/// Header-colored BGR value well inside the default blue hue window.
pub const HEADER_BLUE: [u8; 3] = [200, 80, 20];

/// Card-like frame: blue header band over a light body.
pub fn card_frame(width: u32, height: u32) -> Frame {
    let mut frame = Frame::filled(width, height, [230, 230, 230]);
    let header_rows = (height as f64 * 0.3) as u32;
    for y in 0..header_rows {
        for x in 0..width {
            frame.set_pixel(x, y, HEADER_BLUE);
        }
    }
    frame
}

/// Light blue body color, still inside the default header hue window the
/// way a real card's tinted background is.
pub const BODY_BLUE: [u8; 3] = [230, 200, 170];

/// Card content with realistic structure: strong blue header, light blue
/// body, photo-like noise patch on the left, dark text strokes on the
/// right.
pub fn textured_card(width: u32, height: u32) -> Frame {
    let mut frame = Frame::filled(width, height, BODY_BLUE);
    let header_rows = (height as f64 * 0.3) as u32;
    for y in 0..header_rows {
        for x in 0..width {
            frame.set_pixel(x, y, HEADER_BLUE);
        }
    }

    // Photo area: left quarter, vertically centered, deterministic noise.
    let photo_w = width / 4;
    let photo_y0 = height / 4;
    let photo_y1 = photo_y0 + height / 2;
    let mut state = 0x2545f4914f6cdd1du64;
    for y in photo_y0..photo_y1 {
        for x in 0..photo_w {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            let v = (state >> 33) as u8;
            frame.set_pixel(x, y, [v, v.wrapping_add(40), v.wrapping_add(80)]);
        }
    }

    // Text strokes: short dark horizontal lines on the right body.
    let text_x0 = width * 2 / 5;
    let mut y = header_rows + 6;
    while y + 2 < height {
        for x in text_x0..(width - 8).max(text_x0) {
            if (x / 12) % 2 == 0 {
                frame.set_pixel(x, y, [40, 40, 40]);
                frame.set_pixel(x, y + 1, [40, 40, 40]);
            }
        }
        y += 8;
    }
    frame
}

/// Dark background frame with a solid header-colored rectangle.
pub fn frame_with_blue_rect(width: u32, height: u32, rect: Region) -> Frame {
    let mut frame = Frame::filled(width, height, [30, 30, 30]);
    for y in rect.y..rect.y + rect.height {
        for x in rect.x..rect.x + rect.width {
            frame.set_pixel(x as u32, y as u32, HEADER_BLUE);
        }
    }
    frame
}

/// Dark background frame with a textured card pasted at `rect`.
pub fn frame_with_card(width: u32, height: u32, rect: Region) -> Frame {
    let mut frame = Frame::filled(width, height, [30, 30, 30]);
    let card = textured_card(rect.width as u32, rect.height as u32);
    for y in 0..rect.height as u32 {
        for x in 0..rect.width as u32 {
            frame.set_pixel(rect.x as u32 + x, rect.y as u32 + y, card.pixel(x, y));
        }
    }
    frame
}
