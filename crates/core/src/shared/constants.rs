/// Template catalog file names, keyed by lighting condition.
///
/// The asset directory is expected to contain some subset of these; the
/// loader skips whatever is missing.
pub const TEMPLATE_PRIMARY: &str = "template_card.png";
pub const TEMPLATE_IMPROVED: &str = "template_card_improved.png";
pub const TEMPLATE_BACKUP: &str = "template_card_backup.png";
pub const TEMPLATE_BRIGHT: &str = "template_brightness_+30.png";
pub const TEMPLATE_NORMAL_BRIGHT: &str = "template_brightness_+15.png";
pub const TEMPLATE_NORMAL: &str = "template_brightness_+0.png";
pub const TEMPLATE_NORMAL_DARK: &str = "template_brightness_-15.png";
pub const TEMPLATE_DARK: &str = "template_brightness_-30.png";

/// Templates wider than this are downscaled at load time.
pub const TEMPLATE_MAX_WIDTH: u32 = 300;

/// Fraction of a document region occupied by the colored header band.
pub const HEADER_BAND_FRACTION: f64 = 0.3;

/// Overlay label bands on combined confidence.
pub const OVERLAY_STRONG_CONFIDENCE: f64 = 0.7;
pub const OVERLAY_MEDIUM_CONFIDENCE: f64 = 0.5;
