use nalgebra::{Matrix3, Vector3};
use serde::Serialize;

/// Half-width of the band every orientation is folded into (degrees)
pub const ANGLE_BAND: f64 = 45.0;

/// A straight segment between two pixel positions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LineSegment {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl LineSegment {
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn dx(&self) -> i32 {
        self.x2 - self.x1
    }

    pub fn dy(&self) -> i32 {
        self.y2 - self.y1
    }

    /// Both endpoints coincide, so the segment has no orientation
    pub fn is_degenerate(&self) -> bool {
        self.dx() == 0 && self.dy() == 0
    }

    /// Orientation of the endpoint difference in degrees, (-180, 180]
    pub fn raw_angle_degrees(&self) -> f64 {
        (self.dy() as f64).atan2(self.dx() as f64).to_degrees()
    }

    /// Angle sample for this segment, or `None` when it is degenerate
    pub fn angle_sample(&self) -> Option<f64> {
        if self.is_degenerate() {
            None
        } else {
            Some(normalize_angle(self.raw_angle_degrees()))
        }
    }

    /// Map both endpoints through an affine transform, truncating to pixels
    pub fn transformed(&self, matrix: &Matrix3<f64>) -> Self {
        let (x1, y1) = transform_point(matrix, self.x1 as f64, self.y1 as f64);
        let (x2, y2) = transform_point(matrix, self.x2 as f64, self.y2 as f64);
        Self::new(x1 as i32, y1 as i32, x2 as i32, y2 as i32)
    }
}

/// Transform a point using a homogeneous 3x3 matrix
pub fn transform_point(matrix: &Matrix3<f64>, x: f64, y: f64) -> (f64, f64) {
    let p = Vector3::new(x, y, 1.0);
    let result = matrix * p;
    (result.x / result.z, result.y / result.z)
}

/// Fold an orientation into (-45, 45], the offset from the nearest axis.
///
/// Orientations 90° apart describe the same page rotation, so the fold is
/// taken modulo 90. Idempotent on values already inside the band.
pub fn normalize_angle(degrees: f64) -> f64 {
    let folded = ANGLE_BAND - (ANGLE_BAND - degrees).rem_euclid(2.0 * ANGLE_BAND);
    // rem_euclid may round up to the modulus for tiny negative inputs
    if folded <= -ANGLE_BAND {
        folded + 2.0 * ANGLE_BAND
    } else {
        folded
    }
}

/// Median with linear interpolation between the two middle values
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Population standard deviation (divides by n)
pub fn population_std_dev(values: &[f64]) -> Option<f64> {
    let mean = mean(values)?;
    let variance =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    Some(variance.sqrt())
}

/// Aggregate skew estimate over all contributing segments
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkewEstimate {
    /// Primary estimate, robust against stray diagonal strokes
    pub median_angle_degrees: f64,
    pub mean_angle_degrees: f64,
    pub std_dev_degrees: f64,
    /// Number of non-degenerate segments that produced a sample
    pub lines_detected: usize,
    pub needs_correction: bool,
}

impl SkewEstimate {
    /// Build an estimate from detected segments.
    ///
    /// Degenerate segments are skipped. Returns `None` when no segment is left,
    /// which callers must treat as "undetermined", never as zero skew.
    pub fn from_segments(segments: &[LineSegment], deadband: f64) -> Option<Self> {
        let samples: Vec<f64> = segments.iter().filter_map(LineSegment::angle_sample).collect();
        Self::from_samples(&samples, deadband)
    }

    /// Build an estimate from already-normalized angle samples.
    pub fn from_samples(samples: &[f64], deadband: f64) -> Option<Self> {
        let median_angle_degrees = median(samples)?;
        let mean_angle_degrees = mean(samples)?;
        let std_dev_degrees = population_std_dev(samples)?;

        Some(Self {
            median_angle_degrees,
            mean_angle_degrees,
            std_dev_degrees,
            lines_detected: samples.len(),
            needs_correction: needs_correction(median_angle_degrees, deadband),
        })
    }

    /// Rotation (degrees) that would bring the page back to upright
    pub fn correction_angle(&self) -> f64 {
        -self.median_angle_degrees
    }
}

/// A correction is recommended only strictly outside the deadband
pub fn needs_correction(median_degrees: f64, deadband: f64) -> bool {
    median_degrees.abs() > deadband
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_stays_in_band() {
        let mut raw = -180.0;
        while raw <= 180.0 {
            let folded = normalize_angle(raw);
            assert!(folded > -45.0 && folded <= 45.0, "{raw} -> {folded}");
            raw += 0.25;
        }
    }

    #[test]
    fn test_normalize_matches_quadrant_rule() {
        assert!((normalize_angle(50.0) - -40.0).abs() < 1e-9);
        assert!((normalize_angle(-50.0) - 40.0).abs() < 1e-9);
        assert!((normalize_angle(88.0) - -2.0).abs() < 1e-9);
        assert!((normalize_angle(-88.0) - 2.0).abs() < 1e-9);
        assert!((normalize_angle(2.3) - 2.3).abs() < 1e-9);
    }

    #[test]
    fn test_normalize_boundaries() {
        assert_eq!(normalize_angle(45.0), 45.0);
        assert_eq!(normalize_angle(-45.0), 45.0);
        assert_eq!(normalize_angle(180.0), 0.0);
        assert_eq!(normalize_angle(-180.0), 0.0);
        assert_eq!(normalize_angle(-1e-18), 0.0);
    }

    #[test]
    fn test_normalize_idempotent() {
        for raw in [-179.5, -91.0, -45.0, -44.9, -3.2, 0.0, 12.0, 45.0, 46.0, 135.0] {
            let once = normalize_angle(raw);
            assert!((normalize_angle(once) - once).abs() < 1e-12);
        }
    }

    #[test]
    fn test_reversed_segment_has_same_sample() {
        let forward = LineSegment::new(0, 0, 100, 4);
        let backward = LineSegment::new(100, 4, 0, 0);
        let a = forward.angle_sample().unwrap();
        let b = backward.angle_sample().unwrap();
        assert!((a - b).abs() < 1e-9);
    }

    #[test]
    fn test_degenerate_segment_is_skipped() {
        assert!(LineSegment::new(5, 5, 5, 5).angle_sample().is_none());
        assert!(SkewEstimate::from_segments(&[LineSegment::new(5, 5, 5, 5)], 0.5).is_none());
    }

    #[test]
    fn test_median_even_interpolates() {
        assert_eq!(median(&[1.0, 4.0, 2.0, 3.0]), Some(2.5));
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&[]), None);
    }

    #[test]
    fn test_population_std_dev() {
        let sd = population_std_dev(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        assert!((sd - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_deadband_boundary() {
        assert!(!needs_correction(0.5, 0.5));
        assert!(!needs_correction(-0.5, 0.5));
        assert!(needs_correction(0.5000001, 0.5));
        assert!(needs_correction(-0.6, 0.5));
    }

    #[test]
    fn test_median_resists_outliers() {
        let mut samples: Vec<f64> = (0..50).map(|i| 1.0 + (i % 5) as f64 * 0.01).collect();
        let clean = SkewEstimate::from_samples(&samples, 0.5).unwrap();
        samples.extend([40.0, 40.0, -40.0, 40.0]);
        let noisy = SkewEstimate::from_samples(&samples, 0.5).unwrap();

        let median_shift = (noisy.median_angle_degrees - clean.median_angle_degrees).abs();
        let mean_shift = (noisy.mean_angle_degrees - clean.mean_angle_degrees).abs();
        assert!(median_shift < mean_shift);
    }

    #[test]
    fn test_ruled_page_estimate() {
        // 150 ruled lines at +2.3 degrees across a 1600 px wide page
        let slope = 2.3_f64.to_radians().tan();
        let segments: Vec<LineSegment> = (0..150)
            .map(|i| {
                let y = 40 + i * 14;
                LineSegment::new(100, y, 1500, y + (1400.0 * slope).round() as i32)
            })
            .collect();
        let estimate = SkewEstimate::from_segments(&segments, 0.5).unwrap();

        assert!((estimate.median_angle_degrees - 2.3).abs() < 0.3);
        assert_eq!(estimate.lines_detected, 150);
        assert!(estimate.needs_correction);
        assert!((estimate.correction_angle() + estimate.median_angle_degrees).abs() < 1e-12);
    }

    #[test]
    fn test_upright_form_needs_no_correction() {
        let segments: Vec<LineSegment> = (0..80)
            .map(|i| {
                let y = 20 + i * 10;
                let tilt = (i % 3) - 1;
                LineSegment::new(50, y, 850, y + tilt)
            })
            .collect();
        let estimate = SkewEstimate::from_segments(&segments, 0.5).unwrap();

        assert_eq!(estimate.lines_detected, 80);
        assert!(!estimate.needs_correction);
    }

    #[test]
    fn test_scaling_transform() {
        let scale = Matrix3::new_scaling(0.5);
        let segment = LineSegment::new(10, 20, 30, 41).transformed(&scale);
        assert_eq!(segment, LineSegment::new(5, 10, 15, 20));
    }
}
