//! Document rectification
//!
//! Finds the largest four-cornered contour in a photograph and warps it to an
//! upright rectangle.

pub mod corners;
pub mod pipeline;

pub use corners::{order_corners, output_dimensions, Quad};
pub use pipeline::{
    Rectification, RectifiedDocument, Rectifier, RectifyParams, StepTiming, DEFAULT_KEEP_OUTPUTS,
};
