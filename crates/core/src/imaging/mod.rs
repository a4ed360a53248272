//! CPU pixel operations shared by every detection stage.
//!
//! All routines work on plain byte buffers; color conversion happens once
//! at the boundary and the rest of the pipeline reads single-channel data.

pub mod blur;
pub mod contours;
pub mod edges;
pub mod fourier;
pub mod gray;
pub mod hsv;
pub mod morphology;
