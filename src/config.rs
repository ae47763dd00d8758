use crate::rectify::{RectifyParams, DEFAULT_KEEP_OUTPUTS};
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "docscan-server")]
#[command(about = "Identity document scanning server: MRZ decoding, ID card text and rectification")]
#[command(version)]
pub struct Args {
    /// Host address to bind to
    #[arg(long, env = "DOCSCAN_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "DOCSCAN_PORT", default_value = "9393")]
    pub port: u16,

    /// Maximum upload size in bytes (default: 20MB)
    #[arg(long, env = "DOCSCAN_MAX_FILE_SIZE", default_value = "20971520")]
    pub max_file_size: usize,

    /// Directory for OCR models and rectified images (default: <user cache>/docscan)
    #[arg(long, env = "DOCSCAN_CACHE_DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Rectified images kept in the cache directory (0 keeps all)
    #[arg(long, env = "DOCSCAN_KEEP_RECTIFIED", default_value = "100")]
    pub keep_rectified: usize,

    /// Maximum working width for rectification
    #[arg(long, env = "DOCSCAN_MAX_WIDTH", default_value = "720")]
    pub max_width: u32,

    /// Maximum working height for rectification
    #[arg(long, env = "DOCSCAN_MAX_HEIGHT", default_value = "1280")]
    pub max_height: u32,

    /// Grayscale opening radius applied before blurring (0 disables)
    #[arg(long, env = "DOCSCAN_OPEN_RADIUS", default_value = "2")]
    pub open_radius: u8,

    /// Gaussian blur sigma applied before edge detection
    #[arg(long, env = "DOCSCAN_BLUR_SIGMA", default_value = "1.5")]
    pub blur_sigma: f32,

    /// Canny low threshold
    #[arg(long, env = "DOCSCAN_CANNY_LOW", default_value = "30")]
    pub canny_low: f32,

    /// Canny high threshold
    #[arg(long, env = "DOCSCAN_CANNY_HIGH", default_value = "90")]
    pub canny_high: f32,

    /// Edge dilation radius in pixels (0 disables)
    #[arg(long, env = "DOCSCAN_DILATE_RADIUS", default_value = "1")]
    pub dilate_radius: u8,

    /// Minimum contour area considered a document candidate
    #[arg(long, env = "DOCSCAN_MIN_AREA", default_value = "100")]
    pub min_area: f64,

    /// Polygon approximation tolerance as a fraction of the perimeter
    #[arg(long, env = "DOCSCAN_APPROX_EPSILON", default_value = "0.02")]
    pub approx_epsilon: f64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub max_file_size: usize,
    pub cache_dir: PathBuf,
    pub keep_rectified: usize,
    pub rectify: RectifyParams,
}

impl Config {
    /// Defaults for everything except the cache directory
    pub fn with_cache_dir(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 9393,
            max_file_size: 20 * 1024 * 1024,
            cache_dir: cache_dir.into(),
            keep_rectified: DEFAULT_KEEP_OUTPUTS,
            rectify: RectifyParams::default(),
        }
    }

    pub fn rectify_params(&self) -> RectifyParams {
        self.rectify
    }

    /// Where rectified images are written
    pub fn output_dir(&self) -> PathBuf {
        self.cache_dir.join("rectified")
    }
}

impl From<Args> for Config {
    fn from(args: Args) -> Self {
        let cache_dir = args.cache_dir.unwrap_or_else(default_cache_dir);

        Self {
            host: args.host,
            port: args.port,
            max_file_size: args.max_file_size,
            cache_dir,
            keep_rectified: args.keep_rectified,
            rectify: RectifyParams {
                max_width: args.max_width,
                max_height: args.max_height,
                open_radius: args.open_radius,
                blur_sigma: args.blur_sigma,
                canny_low: args.canny_low,
                canny_high: args.canny_high,
                dilate_radius: args.dilate_radius,
                min_area: args.min_area,
                approx_epsilon: args.approx_epsilon,
            },
        }
    }
}

fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("docscan")
}
