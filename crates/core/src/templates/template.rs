use serde::Serialize;

use crate::imaging::gray::{grayscale, Gray};
use crate::imaging::hsv::{bgr_to_hsv, HsvRange};
use crate::shared::constants::{
    HEADER_BAND_FRACTION, TEMPLATE_BACKUP, TEMPLATE_BRIGHT, TEMPLATE_DARK, TEMPLATE_IMPROVED,
    TEMPLATE_MAX_WIDTH, TEMPLATE_NORMAL, TEMPLATE_NORMAL_BRIGHT, TEMPLATE_NORMAL_DARK,
    TEMPLATE_PRIMARY,
};
use crate::shared::frame::Frame;

/// Catalog slot for a reference image, keyed by the lighting condition it
/// was prepared for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum TemplateKind {
    Primary,
    Improved,
    Backup,
    Bright,
    NormalBright,
    Normal,
    NormalDark,
    Dark,
}

impl TemplateKind {
    pub const ALL: [TemplateKind; 8] = [
        TemplateKind::Primary,
        TemplateKind::Improved,
        TemplateKind::Backup,
        TemplateKind::Bright,
        TemplateKind::NormalBright,
        TemplateKind::Normal,
        TemplateKind::NormalDark,
        TemplateKind::Dark,
    ];

    /// Well-known file name under the asset directory.
    pub fn file_name(&self) -> &'static str {
        match self {
            TemplateKind::Primary => TEMPLATE_PRIMARY,
            TemplateKind::Improved => TEMPLATE_IMPROVED,
            TemplateKind::Backup => TEMPLATE_BACKUP,
            TemplateKind::Bright => TEMPLATE_BRIGHT,
            TemplateKind::NormalBright => TEMPLATE_NORMAL_BRIGHT,
            TemplateKind::Normal => TEMPLATE_NORMAL,
            TemplateKind::NormalDark => TEMPLATE_NORMAL_DARK,
            TemplateKind::Dark => TEMPLATE_DARK,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateKind::Primary => "primary",
            TemplateKind::Improved => "improved",
            TemplateKind::Backup => "backup",
            TemplateKind::Bright => "bright",
            TemplateKind::NormalBright => "normal_bright",
            TemplateKind::Normal => "normal",
            TemplateKind::NormalDark => "normal_dark",
            TemplateKind::Dark => "dark",
        }
    }
}

/// Hue/saturation/value window of the document's header color, in the
/// half-degree hue convention.
pub fn default_header_range() -> HsvRange {
    HsvRange::new((90, 140), (40, 255), (40, 255))
}

/// A reference document image plus the metrics computed once at load time.
///
/// Immutable after construction; lives for the process lifetime inside the
/// catalog.
#[derive(Clone, Debug)]
pub struct Template {
    pub kind: TemplateKind,
    pub image: Frame,
    pub gray: Gray,
    pub brightness: f64,
    pub contrast: f64,
    pub header_color_ratio: f64,
    pub quality_score: f64,
}

impl Template {
    /// Characterize a reference image: downscale oversized assets, then
    /// compute grayscale brightness/contrast, the header-color ratio over
    /// the top band, and the combined quality score.
    pub fn from_frame(kind: TemplateKind, frame: Frame, header_range: &HsvRange) -> Self {
        let image = if frame.width() > TEMPLATE_MAX_WIDTH {
            let new_w = TEMPLATE_MAX_WIDTH;
            let new_h =
                ((frame.height() as f64) * (new_w as f64 / frame.width() as f64)).round() as u32;
            frame.resize(new_w, new_h.max(1))
        } else {
            frame
        };

        let gray = grayscale(&image);
        let brightness = gray.mean();
        let contrast = gray.stddev();

        let hsv = bgr_to_hsv(&image);
        let header_h = ((image.height() as f64) * HEADER_BAND_FRACTION) as usize;
        let header_color_ratio = if header_h > 0 {
            hsv.ratio_in_rect(header_range, 0, 0, image.width() as usize, header_h)
        } else {
            0.0
        };

        let quality_score = header_color_ratio * 0.7 + (contrast / 100.0) * 0.3;

        Self {
            kind,
            image,
            gray,
            brightness,
            contrast,
            header_color_ratio,
            quality_score,
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}
