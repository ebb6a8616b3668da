//! Prediction output formatting
//!
//! Turns a [`PredictionResult`] into what callers display: a headline, a
//! confidence band and a percentage. Also pairs model feature importances
//! with schema slot names.

use crate::models::{AttendanceLabel, PredictionResult, FEATURE_LABELS, FEATURE_SCHEMA};
use serde::{Deserialize, Serialize};

/// Attend probability above which a prediction is reported as high probability
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.7;

/// Configuration for output formatting
#[derive(Debug, Clone)]
pub struct OutputConfig {
    /// Strictly-greater threshold for the high band (default: 0.7)
    pub confidence_threshold: f32,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
        }
    }
}

/// Coarse confidence band shown next to the prediction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceBand {
    High,
    Low,
}

impl ConfidenceBand {
    pub fn description(&self) -> &'static str {
        match self {
            ConfidenceBand::High => "High Probability",
            ConfidenceBand::Low => "Low Probability",
        }
    }
}

/// Display-ready view of a prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionView {
    pub label: AttendanceLabel,
    pub probability: f32,
    pub headline: String,
    pub confidence_band: ConfidenceBand,
    pub probability_percent: String,
}

/// Formats prediction results for presentation
#[derive(Debug, Clone, Default)]
pub struct OutputFormatter {
    config: OutputConfig,
}

impl OutputFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: OutputConfig) -> Self {
        Self { config }
    }

    pub fn format(&self, result: &PredictionResult) -> PredictionView {
        PredictionView {
            label: result.label,
            probability: result.probability,
            headline: headline(result.label).to_string(),
            confidence_band: self.band(result.probability),
            probability_percent: format!("{:.2}%", result.probability * 100.0),
        }
    }

    pub fn band(&self, probability: f32) -> ConfidenceBand {
        if probability > self.config.confidence_threshold {
            ConfidenceBand::High
        } else {
            ConfidenceBand::Low
        }
    }
}

fn headline(label: AttendanceLabel) -> &'static str {
    match label {
        AttendanceLabel::Attend => "Will Attend",
        AttendanceLabel::NotAttend => "Will Not Attend",
    }
}

/// Importance of one schema slot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub feature: String,
    pub label: String,
    pub importance: f32,
}

/// Pair importances with slot names, most important first.
///
/// Returns `None` when the slice does not cover the schema exactly.
pub fn feature_importance_report(importances: &[f32]) -> Option<Vec<FeatureImportance>> {
    if importances.len() != FEATURE_SCHEMA.len() {
        return None;
    }
    let mut report: Vec<FeatureImportance> = FEATURE_SCHEMA
        .iter()
        .zip(FEATURE_LABELS)
        .zip(importances)
        .map(|((feature, label), importance)| FeatureImportance {
            feature: feature.to_string(),
            label: label.to_string(),
            importance: *importance,
        })
        .collect();
    report.sort_by(|a, b| {
        b.importance
            .partial_cmp(&a.importance)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    Some(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(label: AttendanceLabel, probability: f32) -> PredictionResult {
        PredictionResult { label, probability }
    }

    #[test]
    fn test_headlines() {
        let formatter = OutputFormatter::new();
        assert_eq!(formatter.format(&result(AttendanceLabel::Attend, 0.9)).headline, "Will Attend");
        assert_eq!(
            formatter.format(&result(AttendanceLabel::NotAttend, 0.2)).headline,
            "Will Not Attend"
        );
    }

    #[test]
    fn test_band_threshold_is_strict() {
        let formatter = OutputFormatter::new();
        assert_eq!(formatter.band(0.71), ConfidenceBand::High);
        assert_eq!(formatter.band(0.7), ConfidenceBand::Low);
        assert_eq!(formatter.band(0.1), ConfidenceBand::Low);
    }

    #[test]
    fn test_custom_threshold() {
        let formatter = OutputFormatter::with_config(OutputConfig {
            confidence_threshold: 0.5,
        });
        assert_eq!(formatter.band(0.6), ConfidenceBand::High);
    }

    #[test]
    fn test_percentage_rendering() {
        let view = OutputFormatter::new().format(&result(AttendanceLabel::Attend, 0.8345));
        assert_eq!(view.probability_percent, "83.45%");
        assert_eq!(view.confidence_band.description(), "High Probability");
    }

    #[test]
    fn test_importance_report_sorted() {
        let importances = [0.3, 0.25, 0.05, 0.1, 0.02, 0.08, 0.04, 0.06, 0.01, 0.09];
        let report = feature_importance_report(&importances).unwrap();
        assert_eq!(report.len(), 10);
        assert_eq!(report[0].feature, "months_as_member");
        assert_eq!(report[0].label, "Months as Member");
        assert_eq!(report[1].feature, "weight");
        assert_eq!(report.last().unwrap().feature, "category_unknown");
    }

    #[test]
    fn test_importance_report_requires_full_schema() {
        assert!(feature_importance_report(&[0.5, 0.5]).is_none());
    }
}
