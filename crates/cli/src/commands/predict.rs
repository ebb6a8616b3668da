//! Prediction commands

use anyhow::Result;
use colored::Colorize;
use predictor_lib::predictor::OnnxModel;
use predictor_lib::{AttendanceLabel, AttendancePredictor, ModelState, RawAttributeRecord};

use crate::client::{ApiClient, PredictionReport};
use crate::config::Settings;
use crate::output::{self, color_headline, color_probability, print_json, OutputFormat};

/// Load the model from disk and predict a single booking
pub fn predict_local(settings: &Settings, record: &RawAttributeRecord) -> Result<()> {
    let state = ModelState::from_load(OnnxModel::load(&settings.model));
    let predictor = AttendancePredictor::new(state);

    let result = predictor.predict(record)?;
    let report = PredictionReport::new(
        settings.formatter().format(&result),
        predictor.model_version().unwrap_or("unknown"),
    );

    print_report(&report, settings.format);
    Ok(())
}

/// Ask a running attendance server for a prediction
pub async fn predict_remote(
    client: &ApiClient,
    record: &RawAttributeRecord,
    format: OutputFormat,
) -> Result<()> {
    let report: PredictionReport = client.post("v1/predict", record).await?;

    print_report(&report, format);
    if matches!(format, OutputFormat::Table) {
        if let Some(at) = chrono::DateTime::from_timestamp(report.generated_at, 0) {
            output::print_info(&format!(
                "Served by {} at {}",
                client.base_url(),
                at.format("%Y-%m-%d %H:%M:%S UTC")
            ));
        }
    }
    Ok(())
}

fn print_report(report: &PredictionReport, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(report),
        OutputFormat::Table => {
            let view = &report.prediction;
            println!("{}", "Attendance Prediction".bold());
            println!("{}", "=".repeat(40));
            println!("Prediction:     {}", color_headline(view));
            println!("Probability:    {}", color_probability(view));
            println!("Confidence:     {}", view.confidence_band.description());
            println!("Model version:  {}", report.model_version.cyan());
            println!();

            match view.label {
                AttendanceLabel::Attend => {
                    output::print_success("Member is expected to attend this class")
                }
                AttendanceLabel::NotAttend => {
                    output::print_warning("Member is likely to miss this class")
                }
            }
        }
    }
}
