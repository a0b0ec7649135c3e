use std::path::Path;
use tracing::{debug, info, warn};

use crate::config::SkewConfig;
use crate::detection::analyze_page;
use crate::error::{Result, SkewError};
use crate::overlay::{overlay_path, write_overlay};
use crate::raster::{detect_input_kind, rasterize};
use crate::report::SkewReport;

/// Estimate the skew of a document or image file.
///
/// When `visualize` is set, a line overlay is written next to the input.
/// A failure there is logged and does not affect the returned report.
pub fn analyze(path: &Path, config: &SkewConfig, visualize: bool) -> Result<SkewReport> {
    config.validate()?;
    if !path.exists() {
        return Err(SkewError::InputNotFound(path.to_path_buf()));
    }

    let kind = detect_input_kind(path);
    info!(path = %path.display(), %kind, "rasterizing input");

    let page = rasterize(path, kind, config.raster_zoom)?;
    debug!(width = page.width(), height = page.height(), "page ready");

    let analysis = analyze_page(&page, config)?;
    info!(
        lines = analysis.estimate.lines_detected,
        median = analysis.estimate.median_angle_degrees,
        "estimated skew"
    );

    if visualize {
        let output_path = overlay_path(path);
        match write_overlay(&page, &analysis.segments, config.overlay_scale, &output_path) {
            Ok(()) => info!(path = %output_path.display(), "saved line overlay"),
            Err(e) => warn!(path = %output_path.display(), error = %e, "could not save line overlay"),
        }
    }

    Ok(SkewReport::new(analysis.estimate, kind))
}
