use image::{GrayImage, Luma, RgbImage};
use imageproc::edges::canny;
use tracing::debug;

use crate::config::{EdgeConfig, SkewConfig};
use crate::error::{Result, SkewError};
use crate::geometry::{LineSegment, SkewEstimate};
use crate::hough::extract_segments;

/// Binary edge grid produced by the edge detector (255 = edge, 0 = background)
#[derive(Debug, Clone)]
pub struct EdgeMap {
    edges: GrayImage,
}

impl EdgeMap {
    pub fn from_gray(edges: GrayImage) -> Self {
        Self { edges }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.edges.dimensions()
    }

    pub fn is_edge(&self, x: u32, y: u32) -> bool {
        self.edges.get_pixel(x, y)[0] > 0
    }

    pub fn edge_count(&self) -> usize {
        self.edges.pixels().filter(|p| p[0] > 0).count()
    }
}

/// Result of the core pipeline on one rasterized page
#[derive(Debug, Clone)]
pub struct PageAnalysis {
    pub estimate: SkewEstimate,
    /// Segments that contributed to the estimate
    pub segments: Vec<LineSegment>,
}

/// Convert RGB to an 8-bit luminance copy; the source is left untouched
pub fn to_grayscale(img: &RgbImage) -> GrayImage {
    let (width, height) = img.dimensions();
    let mut gray = GrayImage::new(width, height);

    for (x, y, pixel) in img.enumerate_pixels() {
        // ITU-R BT.601 luma
        let luma = 0.299 * pixel[0] as f64 + 0.587 * pixel[1] as f64 + 0.114 * pixel[2] as f64;
        gray.put_pixel(x, y, Luma([luma.round().min(255.0) as u8]));
    }

    gray
}

/// Apply Canny edge detection with the configured hysteresis thresholds
pub fn detect_edges(gray: &GrayImage, config: &EdgeConfig) -> EdgeMap {
    EdgeMap::from_gray(canny(gray, config.low_threshold, config.high_threshold))
}

/// Run edge detection, line extraction and angle estimation on a page.
///
/// Fails with [`SkewError::NoLinesDetected`] when nothing measurable is found,
/// so a blank page is never reported as upright.
pub fn analyze_page(page: &RgbImage, config: &SkewConfig) -> Result<PageAnalysis> {
    let gray = to_grayscale(page);
    debug!(width = gray.width(), height = gray.height(), "converted page to grayscale");

    let edges = detect_edges(&gray, &config.edges);
    debug!(
        low = config.edges.low_threshold,
        high = config.edges.high_threshold,
        edge_pixels = edges.edge_count(),
        "applied Canny edge detection"
    );

    let segments = extract_segments(&edges, &config.lines).ok_or(SkewError::NoLinesDetected)?;
    debug!(count = segments.len(), "extracted line segments");

    let segments: Vec<LineSegment> = segments
        .into_iter()
        .filter(|s| !s.is_degenerate())
        .collect();

    let estimate = SkewEstimate::from_segments(&segments, config.correction_deadband)
        .ok_or(SkewError::NoLinesDetected)?;

    Ok(PageAnalysis { estimate, segments })
}
