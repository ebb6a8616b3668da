//! Fitness Attendance Predictor CLI
//!
//! A command-line tool for predicting class attendance locally or through a
//! running attendance server, and for inspecting the feature encoding.

mod client;
mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use commands::{inspect, predict};
use predictor_lib::{PredictionError, RawAttributeRecord};
use std::path::PathBuf;
use std::process::ExitCode;

/// Exit code for rejected input
const EXIT_INVALID_INPUT: u8 = 2;
/// Exit code when no model could be loaded
const EXIT_MODEL_UNAVAILABLE: u8 = 3;
/// Exit code when the model failed during inference
const EXIT_INFERENCE: u8 = 4;

/// Fitness Attendance Predictor CLI
#[derive(Parser)]
#[command(name = "fap")]
#[command(author, version, about = "CLI for the Fitness Attendance Predictor", long_about = None)]
pub struct Cli {
    /// Path to the ONNX model (can also be set via FAP_MODEL env var)
    #[arg(long, env = "FAP_MODEL", global = true)]
    pub model: Option<PathBuf>,

    /// Model metadata file (defaults to the `.meta.json` sidecar of the model)
    #[arg(long, env = "FAP_MODEL_METADATA", global = true)]
    pub metadata: Option<PathBuf>,

    /// Expected SHA-256 of the model file
    #[arg(long, env = "FAP_MODEL_SHA256", global = true)]
    pub model_sha256: Option<String>,

    /// Attendance server URL, used by `--remote` (can also be set via FAP_API_URL)
    #[arg(long, env = "FAP_API_URL", global = true)]
    pub api_url: Option<String>,

    /// Output format
    #[arg(long, short, global = true)]
    pub format: Option<output::OutputFormat>,

    /// Enable verbose output
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Predict whether a member will attend a booked class
    Predict {
        #[command(flatten)]
        record: RecordArgs,

        /// Send the request to the attendance server instead of loading the model locally
        #[arg(long)]
        remote: bool,
    },

    /// Show the feature vector a booking encodes to
    Encode {
        #[command(flatten)]
        record: RecordArgs,
    },

    /// List the feature schema the model is trained on
    Schema,

    /// Show model details and feature importances
    Model,
}

/// Booking attributes, passed through as entered
#[derive(Args, Debug, Clone)]
pub struct RecordArgs {
    /// Membership duration in months
    #[arg(long)]
    pub months: String,

    /// Member weight in kg
    #[arg(long)]
    pub weight: String,

    /// Days between booking and class
    #[arg(long)]
    pub days_before: String,

    /// Class day (Mon..Sun)
    #[arg(long)]
    pub day: String,

    /// Class time (AM/PM)
    #[arg(long)]
    pub time: String,

    /// Class category (HIIT, Cycling, Strength, Yoga, Aqua, unknown)
    #[arg(long)]
    pub category: String,
}

impl RecordArgs {
    pub fn to_record(&self) -> RawAttributeRecord {
        RawAttributeRecord::new(
            self.months.as_str(),
            self.weight.as_str(),
            self.days_before.as_str(),
            self.day.as_str(),
            self.time.as_str(),
            self.category.as_str(),
        )
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.verbose {
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::new("debug"))
            .with_writer(std::io::stderr)
            .init();
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            output::print_error(&format!("{:#}", err));
            ExitCode::from(exit_code(&err))
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let settings = config::Settings::resolve(&cli)?;

    match cli.command {
        Commands::Predict { record, remote } => {
            if remote {
                let client = client::ApiClient::new(&settings.api_url)?;
                predict::predict_remote(&client, &record.to_record(), settings.format).await?;
            } else {
                predict::predict_local(&settings, &record.to_record())?;
            }
        }
        Commands::Encode { record } => {
            inspect::show_encoding(&record.to_record(), settings.format)?;
        }
        Commands::Schema => {
            inspect::show_schema(settings.format);
        }
        Commands::Model => {
            inspect::show_model(&settings)?;
        }
    }

    Ok(())
}

fn exit_code(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<PredictionError>() {
        Some(PredictionError::Encoding(_)) => EXIT_INVALID_INPUT,
        Some(PredictionError::ModelUnavailable { .. }) => EXIT_MODEL_UNAVAILABLE,
        Some(PredictionError::Inference { .. }) => EXIT_INFERENCE,
        None => match err.downcast_ref::<client::ApiError>() {
            Some(api) => match api.kind.as_str() {
                "invalid_field" | "unknown_day" | "invalid_body" => EXIT_INVALID_INPUT,
                "model_unavailable" => EXIT_MODEL_UNAVAILABLE,
                "inference_error" => EXIT_INFERENCE,
                _ => 1,
            },
            None => 1,
        },
    }
}
