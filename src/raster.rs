//! Input sniffing and rasterization.
//!
//! PDF pages are rendered by poppler's `pdftoppm`; raster images are decoded
//! with the `image` crate. Either way the page arrives as 8-bit RGB.

use image::{ImageFormat, ImageReader, RgbImage};
use serde::Serialize;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::process::Command;
use tracing::debug;

use crate::error::{Result, SkewError};

/// Native resolution of a PDF page in user-space units per inch
pub const PDF_NATIVE_DPI: f32 = 72.0;

/// External renderer for PDF pages
pub const PDF_RENDERER: &str = "pdftoppm";

const PDF_MAGIC: &[u8] = b"%PDF-";

/// Bytes read when sniffing file content
const SNIFF_LEN: usize = 64;

/// Kind of document a page was taken from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InputKind {
    Pdf,
    Image,
}

impl InputKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            InputKind::Pdf => "pdf",
            InputKind::Image => "image",
        }
    }
}

impl std::fmt::Display for InputKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decide the input kind: extension first, then content, defaulting to image
pub fn detect_input_kind(path: &Path) -> InputKind {
    if let Some(kind) = kind_from_extension(path) {
        return kind;
    }

    let mut header = Vec::with_capacity(SNIFF_LEN);
    let read = File::open(path).and_then(|f| f.take(SNIFF_LEN as u64).read_to_end(&mut header));

    match read {
        Ok(_) => kind_from_content(&header).unwrap_or(InputKind::Image),
        Err(_) => InputKind::Image,
    }
}

fn kind_from_extension(path: &Path) -> Option<InputKind> {
    let ext = path.extension()?.to_str()?;
    if ext.eq_ignore_ascii_case("pdf") {
        Some(InputKind::Pdf)
    } else if ImageFormat::from_extension(ext).is_some() {
        Some(InputKind::Image)
    } else {
        None
    }
}

fn kind_from_content(header: &[u8]) -> Option<InputKind> {
    if header.starts_with(PDF_MAGIC) {
        Some(InputKind::Pdf)
    } else if image::guess_format(header).is_ok() {
        Some(InputKind::Image)
    } else {
        None
    }
}

/// Rasterize the input into an RGB page.
///
/// For PDFs only the first page is rendered, at `zoom` times its native DPI.
pub fn rasterize(path: &Path, kind: InputKind, zoom: f32) -> Result<RgbImage> {
    match kind {
        InputKind::Pdf => render_first_pdf_page(path, zoom),
        InputKind::Image => decode_image(path),
    }
}

fn decode_image(path: &Path) -> Result<RgbImage> {
    let img = ImageReader::open(path)
        .map_err(|e| SkewError::decode(path, e))?
        .with_guessed_format()
        .map_err(|e| SkewError::decode(path, e))?
        .decode()
        .map_err(|e| SkewError::decode(path, e))?;

    debug!(color = ?img.color(), "decoded raster image");
    Ok(img.to_rgb8())
}

/// Rendering resolution for a zoom factor over the native 72 DPI
pub fn render_dpi(zoom: f32) -> u32 {
    (PDF_NATIVE_DPI * zoom).round().max(1.0) as u32
}

fn render_first_pdf_page(path: &Path, zoom: f32) -> Result<RgbImage> {
    let dpi = render_dpi(zoom);

    // Dropped on every exit path, removing the rendered page
    let scratch = tempfile::tempdir().map_err(|e| SkewError::decode(path, e))?;
    let prefix = scratch.path().join("page");

    let output = Command::new(PDF_RENDERER)
        .args(["-f", "1", "-l", "1", "-singlefile", "-png", "-r"])
        .arg(dpi.to_string())
        .arg(path)
        .arg(&prefix)
        .output()
        .map_err(|e| SkewError::decode(path, format!("cannot run {PDF_RENDERER}: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(SkewError::decode(
            path,
            format!("{PDF_RENDERER} exited with {}: {}", output.status, stderr.trim()),
        ));
    }

    let rendered = prefix.with_extension("png");
    let img = image::open(&rendered).map_err(|e| SkewError::decode(path, e))?;
    debug!(dpi, width = img.width(), height = img.height(), "rendered first PDF page");

    Ok(img.to_rgb8())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn test_kind_from_extension() {
        assert_eq!(detect_input_kind(Path::new("scan.PDF")), InputKind::Pdf);
        assert_eq!(detect_input_kind(Path::new("scan.png")), InputKind::Image);
        assert_eq!(detect_input_kind(Path::new("scan.jpeg")), InputKind::Image);
    }

    #[test]
    fn test_kind_from_content() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = dir.path().join("upload.bin");
        std::fs::write(&pdf, b"%PDF-1.7\n%\xe2\xe3\xcf\xd3\n").unwrap();
        assert_eq!(detect_input_kind(&pdf), InputKind::Pdf);

        let png = dir.path().join("upload");
        RgbaImage::from_pixel(2, 2, Rgba([0, 0, 0, 255]))
            .save_with_format(&png, ImageFormat::Png)
            .unwrap();
        assert_eq!(detect_input_kind(&png), InputKind::Image);
    }

    #[test]
    fn test_unknown_defaults_to_image() {
        let dir = tempfile::tempdir().unwrap();
        let blob = dir.path().join("notes.xyz");
        std::fs::write(&blob, b"hello").unwrap();
        assert_eq!(detect_input_kind(&blob), InputKind::Image);
        assert_eq!(detect_input_kind(Path::new("/nonexistent/blob")), InputKind::Image);
    }

    #[test]
    fn test_decode_drops_alpha() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page.png");
        RgbaImage::from_pixel(4, 3, Rgba([10, 20, 30, 128]))
            .save(&path)
            .unwrap();

        let rgb = rasterize(&path, InputKind::Image, 2.0).unwrap();
        assert_eq!(rgb.dimensions(), (4, 3));
        assert_eq!(rgb.get_pixel(0, 0).0, [10, 20, 30]);
    }

    #[test]
    fn test_undecodable_image() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.png");
        std::fs::write(&path, b"not an image").unwrap();

        let err = rasterize(&path, InputKind::Image, 2.0).unwrap_err();
        assert!(matches!(err, SkewError::DecodeFailure { .. }));
    }

    #[test]
    fn test_render_dpi() {
        assert_eq!(render_dpi(2.0), 144);
        assert_eq!(render_dpi(1.0), 72);
        assert_eq!(render_dpi(1.5), 108);
        assert_eq!(render_dpi(0.001), 1);
    }

    #[test]
    fn test_serialized_kind() {
        assert_eq!(serde_json::to_string(&InputKind::Pdf).unwrap(), "\"pdf\"");
        assert_eq!(serde_json::to_string(&InputKind::Image).unwrap(), "\"image\"");
    }
}
