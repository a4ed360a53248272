use thiserror::Error;

use crate::imaging::gray::grayscale;
use crate::shared::frame::Frame;
use crate::templates::catalog::TemplateCatalog;
use crate::templates::template::{Template, TemplateKind};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SelectError {
    #[error("no template available for selection")]
    NoTemplateAvailable,
}

/// Ordered template preferences for a frame brightness bucket.
///
/// Every bucket leads with the primary reference; the brightness variants
/// follow in decreasing relevance to the measured lighting.
pub fn priority_for_brightness(brightness: f64) -> [TemplateKind; 5] {
    use TemplateKind::*;
    if brightness > 150.0 {
        [Primary, Bright, NormalBright, Normal, Improved]
    } else if brightness > 120.0 {
        [Primary, NormalBright, Normal, Bright, Improved]
    } else if brightness > 90.0 {
        [Primary, Normal, NormalDark, NormalBright, Improved]
    } else if brightness > 60.0 {
        [Primary, NormalDark, Dark, Normal, Improved]
    } else {
        [Primary, Dark, NormalDark, Normal, Improved]
    }
}

/// Pick the best-matching reference for the frame's mean brightness.
///
/// Falls back to the primary template when no bucket preference is
/// loaded; fails only when the catalog has nothing usable at all.
pub fn select<'a>(catalog: &'a TemplateCatalog, frame: &Frame) -> Result<&'a Template, SelectError> {
    let brightness = grayscale(frame).mean();
    select_for_brightness(catalog, brightness)
}

pub fn select_for_brightness(
    catalog: &TemplateCatalog,
    brightness: f64,
) -> Result<&Template, SelectError> {
    for kind in priority_for_brightness(brightness) {
        if let Some(template) = catalog.get(kind) {
            log::debug!(
                "selected {} template for frame brightness {brightness:.1}",
                kind.as_str()
            );
            return Ok(template);
        }
    }
    catalog.primary().ok_or(SelectError::NoTemplateAvailable)
}
