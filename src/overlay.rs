use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};
use imageproc::drawing::draw_line_segment_mut;
use nalgebra::Matrix3;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::geometry::LineSegment;

/// Suffix appended to the input stem for the overlay file
pub const OVERLAY_SUFFIX: &str = "_lines_detected.jpg";

/// Colour used to draw detected segments
pub const LINE_COLOR: Rgb<u8> = Rgb([0, 255, 0]);

/// `<dir>/<stem>_lines_detected.jpg` next to the input
pub fn overlay_path(input: &Path) -> PathBuf {
    let stem = input.file_stem().unwrap_or_default().to_string_lossy();
    let parent = input.parent().unwrap_or(Path::new("."));
    parent.join(format!("{}{}", stem, OVERLAY_SUFFIX))
}

/// Dimensions of the page after scaling, never collapsing to zero
fn scaled_dimensions(width: u32, height: u32, scale: f32) -> (u32, u32) {
    let w = ((width as f32 * scale).round() as u32).max(1);
    let h = ((height as f32 * scale).round() as u32).max(1);
    (w, h)
}

/// Draw segments onto a down-scaled copy of the page.
///
/// Canvas and endpoints go through the same scaling so the overlay stays
/// aligned with the page content.
pub fn render_overlay(page: &RgbImage, segments: &[LineSegment], scale: f32) -> RgbImage {
    let (width, height) = scaled_dimensions(page.width(), page.height(), scale);
    let mut canvas = imageops::resize(page, width, height, FilterType::Triangle);

    let to_canvas = Matrix3::new_scaling(scale as f64);
    for segment in segments {
        let s = segment.transformed(&to_canvas);
        draw_line_segment_mut(
            &mut canvas,
            (s.x1 as f32, s.y1 as f32),
            (s.x2 as f32, s.y2 as f32),
            LINE_COLOR,
        );
    }

    canvas
}

/// Render the overlay and save it as JPEG
pub fn write_overlay(
    page: &RgbImage,
    segments: &[LineSegment],
    scale: f32,
    output_path: &Path,
) -> Result<()> {
    let canvas = render_overlay(page, segments, scale);
    canvas.save_with_format(output_path, image::ImageFormat::Jpeg)?;
    Ok(())
}
