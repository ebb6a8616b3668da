//! Encoding, schema and model inspection commands

use anyhow::Result;
use colored::Colorize;
use predictor_lib::predictor::{
    feature_importance_report, FeatureImportance, OnnxModel, RecordEncoder,
};
use predictor_lib::{
    FeatureEncoder, PredictionError, RawAttributeRecord, FEATURE_LABELS, FEATURE_SCHEMA,
};
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use crate::config::Settings;
use crate::output::{format_importance, print_info, print_json, print_table, OutputFormat};

/// Row for the schema table
#[derive(Tabled, Serialize)]
struct SlotRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Feature")]
    name: &'static str,
    #[tabled(rename = "Description")]
    description: &'static str,
}

/// Row for the encoded vector table
#[derive(Tabled)]
struct EncodedRow {
    #[tabled(rename = "Feature")]
    name: &'static str,
    #[tabled(rename = "Value")]
    value: f32,
}

/// Row for the importance table
#[derive(Tabled)]
struct ImportanceRow {
    #[tabled(rename = "Feature")]
    label: String,
    #[tabled(rename = "Importance")]
    importance: String,
}

/// Encode a booking without touching the model
pub fn show_encoding(record: &RawAttributeRecord, format: OutputFormat) -> Result<()> {
    let features = FeatureEncoder::new()
        .encode(record)
        .map_err(PredictionError::from)?;

    match format {
        OutputFormat::Json => print_json(&features),
        OutputFormat::Table => {
            let rows: Vec<EncodedRow> = features
                .named()
                .map(|(name, value)| EncodedRow { name, value })
                .collect();
            println!("{}", Table::new(rows).with(Style::rounded()));
        }
    }
    Ok(())
}

/// List the feature slots in model input order
pub fn show_schema(format: OutputFormat) {
    let rows: Vec<SlotRow> = FEATURE_SCHEMA
        .iter()
        .zip(FEATURE_LABELS)
        .enumerate()
        .map(|(index, (name, description))| SlotRow {
            index,
            name: *name,
            description,
        })
        .collect();
    print_table(&rows, format);
}

#[derive(Serialize)]
struct ModelSummary<'a> {
    model_path: String,
    version: &'a str,
    classes: &'a [i64],
    positive_class: i64,
    feature_importances: Option<Vec<FeatureImportance>>,
}

/// Load the model and print its metadata and feature importances
pub fn show_model(settings: &Settings) -> Result<()> {
    let model = OnnxModel::load(&settings.model).map_err(|e| PredictionError::ModelUnavailable {
        reason: format!("{:#}", e),
    })?;
    let metadata = model.metadata();
    let summary = ModelSummary {
        model_path: settings.model.model_path.display().to_string(),
        version: &metadata.version,
        classes: &metadata.classes,
        positive_class: metadata.positive_class,
        feature_importances: metadata
            .feature_importances
            .as_deref()
            .and_then(feature_importance_report),
    };

    match settings.format {
        OutputFormat::Json => print_json(&summary),
        OutputFormat::Table => {
            println!("{}", "Attendance Model".bold());
            println!("{}", "=".repeat(40));
            println!("Path:            {}", summary.model_path.cyan());
            println!("Version:         {}", summary.version);
            println!("Classes:         {:?}", summary.classes);
            println!("Positive class:  {}", summary.positive_class);
            println!();

            match &summary.feature_importances {
                Some(report) => {
                    println!("{}", "Feature Importance".bold());
                    let rows: Vec<ImportanceRow> = report
                        .iter()
                        .map(|entry| ImportanceRow {
                            label: entry.label.clone(),
                            importance: format_importance(entry.importance),
                        })
                        .collect();
                    println!("{}", Table::new(rows).with(Style::rounded()));
                }
                None => print_info("Model metadata carries no feature importances"),
            }
        }
    }
    Ok(())
}
