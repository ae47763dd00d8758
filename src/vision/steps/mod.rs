//! Individual image operations backing [`ImageprocVision`](super::ImageprocVision)

pub mod blur;
pub mod contours;
pub mod denoise;
pub mod edges;
pub mod grayscale;
pub mod resize;
pub mod warp;
