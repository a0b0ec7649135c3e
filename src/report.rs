use serde::Serialize;
use std::fmt;

use crate::geometry::SkewEstimate;
use crate::raster::InputKind;

/// Marker understood by CI runners that scrape step outputs from stdout
pub const AUTOMATION_OUTPUT_NAME: &str = "rotation_result";

/// Final result of one run: the estimate plus where the page came from
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkewReport {
    #[serde(flatten)]
    pub estimate: SkewEstimate,
    pub input_kind: InputKind,
}

impl SkewReport {
    pub fn new(estimate: SkewEstimate, input_kind: InputKind) -> Self {
        Self {
            estimate,
            input_kind,
        }
    }

    /// Single-line JSON payload
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// `::set-output name=rotation_result::<json>`
    pub fn automation_line(&self) -> serde_json::Result<String> {
        Ok(format!(
            "::set-output name={}::{}",
            AUTOMATION_OUTPUT_NAME,
            self.to_json()?
        ))
    }
}

/// Human readable summary
impl fmt::Display for SkewReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let e = &self.estimate;
        let banner = "=".repeat(50);

        writeln!(f, "Input kind:      {}", self.input_kind)?;
        writeln!(f, "Lines detected:  {}", e.lines_detected)?;
        writeln!(f, "Median angle:    {:.2}°", e.median_angle_degrees)?;
        writeln!(f, "Mean angle:      {:.2}°", e.mean_angle_degrees)?;
        writeln!(f, "Std deviation:   {:.2}°", e.std_dev_degrees)?;
        writeln!(f)?;
        writeln!(f, "{banner}")?;
        writeln!(f, "RESULT: the page is skewed by {:.2}°", e.median_angle_degrees)?;
        writeln!(f, "{banner}")?;
        writeln!(f)?;

        if e.needs_correction {
            writeln!(
                f,
                "Recommendation: rotate the page by {:.2}° to correct it",
                e.correction_angle()
            )
        } else {
            writeln!(f, "The page is already well aligned.")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(median: f64, needs_correction: bool) -> SkewReport {
        SkewReport::new(
            SkewEstimate {
                median_angle_degrees: median,
                mean_angle_degrees: 2.0,
                std_dev_degrees: 0.25,
                lines_detected: 150,
                needs_correction,
            },
            InputKind::Pdf,
        )
    }

    #[test]
    fn test_json_field_names() {
        let value: serde_json::Value =
            serde_json::from_str(&report(2.3, true).to_json().unwrap()).unwrap();

        assert_eq!(value["medianAngleDegrees"], 2.3);
        assert_eq!(value["meanAngleDegrees"], 2.0);
        assert_eq!(value["stdDevDegrees"], 0.25);
        assert_eq!(value["linesDetected"], 150);
        assert_eq!(value["needsCorrection"], true);
        assert_eq!(value["inputKind"], "pdf");
        assert_eq!(value.as_object().unwrap().len(), 6);
    }

    #[test]
    fn test_json_is_single_line() {
        let json = report(2.3, true).to_json().unwrap();
        assert!(!json.contains('\n'));
    }

    #[test]
    fn test_automation_line() {
        let line = report(2.3, true).automation_line().unwrap();
        assert!(line.starts_with("::set-output name=rotation_result::{"));
    }

    #[test]
    fn test_text_recommends_rotation() {
        let text = report(2.3, true).to_string();
        assert!(text.contains("skewed by 2.30°"));
        assert!(text.contains("rotate the page by -2.30°"));
    }

    #[test]
    fn test_text_for_aligned_page() {
        let text = report(0.1, false).to_string();
        assert!(text.contains("already well aligned"));
        assert!(!text.contains("Recommendation"));
    }
}
