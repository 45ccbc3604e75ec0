//! Offline model training

use anyhow::{Context, Result};
use colored::Colorize;
use insights_lib::pipeline::{train, ForestConfig, TrainingConfig};
use serde::Serialize;
use std::path::Path;
use tabled::Tabled;

use super::load_data_dir;
use crate::output::{print_info, print_success, print_table, OutputFormat};

/// Row for the vocabulary table
#[derive(Tabled, Serialize)]
struct VocabularyRow {
    #[tabled(rename = "Column")]
    column: &'static str,
    #[tabled(rename = "Code")]
    code: usize,
    #[tabled(rename = "Value")]
    value: String,
}

#[derive(Serialize)]
struct TrainingSummary<'a> {
    version: &'a str,
    vocabulary_version: &'a str,
    training_rows: usize,
    contamination: f64,
    threshold: f64,
    output: String,
    checksum: String,
}

/// Train a model from a data directory and write the artifact
pub async fn run_train(
    data_dir: &Path,
    output: &Path,
    forest: ForestConfig,
    version: Option<String>,
    format: OutputFormat,
) -> Result<()> {
    let raw = load_data_dir(data_dir).await?;
    if raw.has_empty_source() {
        anyhow::bail!(
            "Training data in {:?} is incomplete: {} logs, {} tasks, {} metrics",
            data_dir,
            raw.logs.len(),
            raw.tasks.len(),
            raw.metrics.len()
        );
    }

    let batch = raw.decode().context("Invalid training data")?;
    let model = train(&batch, &TrainingConfig { forest, version }).context("Training failed")?;
    let checksum = model.save(output)?;

    let rows: Vec<VocabularyRow> = model
        .vocabulary
        .tables()
        .into_iter()
        .flat_map(|(column, table)| {
            table
                .values()
                .iter()
                .enumerate()
                .map(move |(code, value)| VocabularyRow {
                    column,
                    code,
                    value: value.clone(),
                })
        })
        .collect();

    match format {
        OutputFormat::Json => {
            let summary = TrainingSummary {
                version: &model.version,
                vocabulary_version: &model.vocabulary.version,
                training_rows: model.training_rows,
                contamination: model.contamination(),
                threshold: model.forest().threshold(),
                output: output.display().to_string(),
                checksum,
            };
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        OutputFormat::Table => {
            print_success(&format!(
                "Model {} trained on {} rows",
                model.version.cyan(),
                model.training_rows
            ));
            print_info(&format!("Artifact: {}", output.display()));
            print_info(&format!("SHA-256:  {}", checksum));
            println!();
            println!("{} {}", "Vocabulary".bold(), model.vocabulary.version);
            print_table(&rows, format);
        }
    }

    Ok(())
}
