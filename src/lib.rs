pub mod cli;
pub mod config;
pub mod detection;
pub mod error;
pub mod geometry;
pub mod hough;
pub mod overlay;
pub mod pipeline;
pub mod raster;
pub mod report;

pub use cli::Cli;
pub use config::{EdgeConfig, LineConfig, SkewConfig};
pub use detection::{analyze_page, detect_edges, to_grayscale, EdgeMap, PageAnalysis};
pub use error::{Result, SkewError};
pub use geometry::{normalize_angle, LineSegment, SkewEstimate};
pub use hough::extract_segments;
pub use overlay::{overlay_path, render_overlay, write_overlay};
pub use pipeline::analyze;
pub use raster::{detect_input_kind, rasterize, render_dpi, InputKind};
pub use report::SkewReport;
