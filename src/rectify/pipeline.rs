use crate::error::ScanError;
use crate::vision::{ImageprocVision, VisionPrimitives};
use image::{DynamicImage, GrayImage};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Instant;

use super::corners::{self, Quad};

/// Tunables for the rectification pipeline
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RectifyParams {
    /// Working resolution bounds; larger photos are shrunk to fit
    pub max_width: u32,
    pub max_height: u32,
    /// Grayscale opening radius in pixels, 0 to skip
    pub open_radius: u8,
    pub blur_sigma: f32,
    pub canny_low: f32,
    pub canny_high: f32,
    /// Edge dilation radius in pixels, 0 to skip
    pub dilate_radius: u8,
    /// Contours enclosing less area than this are ignored
    pub min_area: f64,
    /// Polygon tolerance as a fraction of the contour perimeter
    pub approx_epsilon: f64,
}

impl Default for RectifyParams {
    fn default() -> Self {
        Self {
            max_width: 720,
            max_height: 1280,
            open_radius: 2,
            blur_sigma: 1.5,
            canny_low: 30.0,
            canny_high: 90.0,
            dilate_radius: 1,
            min_area: 100.0,
            approx_epsilon: 0.02,
        }
    }
}

/// Timing information for a single pipeline step
#[derive(Debug, Clone, Serialize)]
pub struct StepTiming {
    pub name: String,
    pub time_ms: u64,
}

/// In-memory rectification result
#[derive(Debug, Clone, Serialize)]
pub struct Rectification {
    /// Warped image (not serialized)
    #[serde(skip)]
    pub image: DynamicImage,
    /// Detected corners in working-resolution coordinates
    pub corners: Quad,
    pub width: u32,
    pub height: u32,
    pub steps: Vec<StepTiming>,
}

/// Rectified image persisted to the output directory
#[derive(Debug, Clone, Serialize)]
pub struct RectifiedDocument {
    pub path: PathBuf,
    pub corners: Quad,
    pub width: u32,
    pub height: u32,
    pub total_time_ms: u64,
    pub steps: Vec<StepTiming>,
}

/// Rectified images kept in the output directory unless configured otherwise
pub const DEFAULT_KEEP_OUTPUTS: usize = 100;

const OUTPUT_PREFIX: &str = "rectified-";
const OUTPUT_SUFFIX: &str = ".png";

/// Locates a document in a photograph and warps it upright.
///
/// Every step runs strictly after the previous one. Intermediate buffers live
/// only for the duration of a call. Only the newest `keep_outputs` results
/// stay on disk.
pub struct Rectifier<V = ImageprocVision> {
    vision: V,
    params: RectifyParams,
    output_dir: PathBuf,
    keep_outputs: usize,
}

impl Rectifier<ImageprocVision> {
    pub fn with_defaults(output_dir: impl Into<PathBuf>) -> Self {
        Self::new(ImageprocVision, RectifyParams::default(), output_dir)
    }
}

impl<V: VisionPrimitives> Rectifier<V> {
    pub fn new(vision: V, params: RectifyParams, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            vision,
            params,
            output_dir: output_dir.into(),
            keep_outputs: DEFAULT_KEEP_OUTPUTS,
        }
    }

    /// Keep at most `keep` rectified images on disk, 0 for no limit
    pub fn with_retention(mut self, keep: usize) -> Self {
        self.keep_outputs = keep;
        self
    }

    pub fn params(&self) -> &RectifyParams {
        &self.params
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Rectify the photograph at `source` and write the result as PNG into
    /// the output directory
    pub fn rectify(&self, source: &Path) -> Result<RectifiedDocument, ScanError> {
        let start = Instant::now();
        tracing::info!(source = %source.display(), "Starting document rectification");

        let mut timings = Vec::new();
        let image = run_step("load", &mut timings, || self.vision.load(source))?;

        let rectification = self.rectify_with(image, timings)?;
        let mut steps = rectification.steps;

        let path = run_step("save", &mut steps, || self.persist(&rectification.image))?;

        let total_time_ms = start.elapsed().as_millis() as u64;
        tracing::info!(
            output = %path.display(),
            width = rectification.width,
            height = rectification.height,
            total_time_ms,
            "Document rectified"
        );

        Ok(RectifiedDocument {
            path,
            corners: rectification.corners,
            width: rectification.width,
            height: rectification.height,
            total_time_ms,
            steps,
        })
    }

    /// Rectify an already decoded image without touching the filesystem
    pub fn rectify_image(&self, image: DynamicImage) -> Result<Rectification, ScanError> {
        self.rectify_with(image, Vec::new())
    }

    /// Find the ordered document corners in a binary edge map
    pub fn locate_in_edges(&self, edges: &GrayImage) -> Result<Quad, ScanError> {
        let contours = self.vision.find_contours(edges)?;
        tracing::debug!(contours = contours.len(), "Contours extracted");

        let candidate = corners::largest_quadrilateral(
            &self.vision,
            &contours,
            self.params.min_area,
            self.params.approx_epsilon,
        )
        .ok_or(ScanError::NoDocumentDetected)?;

        tracing::debug!(area = candidate.area, "Document candidate selected");

        let quad = candidate.corners.map(|p| (p.x as f32, p.y as f32));
        Ok(corners::order_corners(quad))
    }

    fn rectify_with(
        &self,
        image: DynamicImage,
        mut timings: Vec<StepTiming>,
    ) -> Result<Rectification, ScanError> {
        let p = self.params;

        let working = run_step("resize", &mut timings, || {
            self.vision.resize_within(image, p.max_width, p.max_height)
        })?;

        let quad = {
            let gray = run_step("grayscale", &mut timings, || self.vision.grayscale(&working))?;
            let opened = run_step("open", &mut timings, || {
                self.vision.morphological_open(&gray, p.open_radius)
            })?;
            let blurred = run_step("blur", &mut timings, || {
                self.vision.gaussian_blur(&opened, p.blur_sigma)
            })?;
            let edges = run_step("canny", &mut timings, || {
                self.vision.canny(&blurred, p.canny_low, p.canny_high)
            })?;
            let edges = run_step("dilate", &mut timings, || {
                self.vision.dilate(&edges, p.dilate_radius)
            })?;
            run_step("locate", &mut timings, || self.locate_in_edges(&edges))?
        };

        let (width, height) = corners::output_dimensions(&quad);
        tracing::debug!(?quad, width, height, "Corners ordered");

        let warped = run_step("warp", &mut timings, || {
            self.vision.warp_perspective(
                &working,
                quad,
                corners::destination(width, height),
                width,
                height,
            )
        })?;

        Ok(Rectification {
            image: warped,
            corners: quad,
            width,
            height,
            steps: timings,
        })
    }

    fn persist(&self, image: &DynamicImage) -> Result<PathBuf, ScanError> {
        std::fs::create_dir_all(&self.output_dir).map_err(|e| {
            ScanError::Internal(format!("Failed to create output directory: {}", e))
        })?;

        // Timestamped names sort oldest first
        let prefix = format!(
            "{}{}-",
            OUTPUT_PREFIX,
            chrono::Utc::now().format("%Y%m%d%H%M%S%6f")
        );
        let (_file, path) = tempfile::Builder::new()
            .prefix(&prefix)
            .suffix(OUTPUT_SUFFIX)
            .tempfile_in(&self.output_dir)
            .and_then(|file| file.keep().map_err(|e| e.error))
            .map_err(|e| ScanError::Internal(format!("Failed to create output file: {}", e)))?;

        self.vision.save(image, &path)?;

        if self.keep_outputs > 0 {
            prune_outputs(&self.output_dir, self.keep_outputs);
        }
        Ok(path)
    }
}

/// Delete all but the newest `keep` rectified images in `dir`. Failures are
/// logged and otherwise ignored.
fn prune_outputs(dir: &Path, keep: usize) {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!(dir = %dir.display(), "Cannot list output directory: {}", e);
            return;
        }
    };

    let mut outputs: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.starts_with(OUTPUT_PREFIX) && name.ends_with(OUTPUT_SUFFIX))
        })
        .collect();

    if outputs.len() <= keep {
        return;
    }

    outputs.sort();
    let excess = outputs.len() - keep;
    for path in &outputs[..excess] {
        match std::fs::remove_file(path) {
            Ok(()) => tracing::debug!(path = %path.display(), "Pruned old rectified image"),
            Err(e) => tracing::warn!(path = %path.display(), "Failed to prune: {}", e),
        }
    }
}

fn run_step<T, F>(name: &str, timings: &mut Vec<StepTiming>, step: F) -> Result<T, ScanError>
where
    F: FnOnce() -> Result<T, ScanError>,
{
    let step_start = Instant::now();
    let result = step()?;
    timings.push(StepTiming {
        name: name.to_string(),
        time_ms: step_start.elapsed().as_millis() as u64,
    });
    Ok(result)
}
