//! Training pipeline: dataset table in, model artifact and lookup lists out.

use std::path::Path;

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use thiserror::Error;

use crate::artifact::{
    ARTIFACT_FORMAT_VERSION, ArtifactError, ArtifactPaths, ModelArtifact, write_lookup_list,
};
use crate::dataset::{DatasetError, SymptomTable};
use crate::ml::forest::{ForestError, TrainDataset, TrainOptions, train_random_forest};
use crate::ml::label_encoder::LabelEncoder;
use crate::ml::metrics::{ConfusionMatrix, PerClassStats};

#[derive(Debug, Error)]
pub enum TrainError {
    #[error(transparent)]
    Dataset(#[from] DatasetError),
    #[error("Dataset has no labelled rows")]
    NoRows,
    #[error("Holdout fraction must be in [0, 1), got {0}")]
    InvalidHoldout(f32),
    #[error("Holdout leaves no rows to train on")]
    HoldoutTooLarge,
    #[error("Training failed: {0}")]
    Forest(#[from] ForestError),
    #[error(transparent)]
    Artifact(#[from] ArtifactError),
}

#[derive(Debug, Clone)]
pub struct TrainerOptions {
    pub forest: TrainOptions,
    /// Fraction of rows held out for evaluation before the final fit; `0` disables it.
    pub holdout: f32,
}

impl Default for TrainerOptions {
    fn default() -> Self {
        Self {
            forest: TrainOptions::default(),
            holdout: 0.0,
        }
    }
}

/// Accuracy on rows the evaluation model never saw.
#[derive(Debug, Clone)]
pub struct HoldoutReport {
    pub rows: usize,
    pub accuracy: f32,
    /// `(disease, stats)` for every class, in encoder order.
    pub per_class: Vec<(String, PerClassStats)>,
}

/// Result of a training run, ready to persist.
#[derive(Debug, Clone)]
pub struct TrainOutput {
    pub artifact: ModelArtifact,
    pub symptoms: Vec<String>,
    pub diseases: Vec<String>,
    pub holdout: Option<HoldoutReport>,
}

/// Fit the disease encoder and the forest on `table`.
///
/// With a holdout, a first model trained on the remaining rows is scored on
/// the held-out rows; the persisted model is always fit on every row.
pub fn train(table: &SymptomTable, options: &TrainerOptions) -> Result<TrainOutput, TrainError> {
    if table.records.is_empty() {
        return Err(TrainError::NoRows);
    }
    if !(0.0..1.0).contains(&options.holdout) {
        return Err(TrainError::InvalidHoldout(options.holdout));
    }

    let encoder = LabelEncoder::fit(table.records.iter().map(|record| &record.disease));
    let x: Vec<Vec<f32>> = table.records.iter().map(|r| r.features.clone()).collect();
    let y: Vec<usize> = table
        .records
        .iter()
        .map(|record| encoder.transform(&record.disease))
        .collect::<Option<_>>()
        .ok_or_else(|| ForestError::Invalid("label missing from encoder".to_string()))?;
    let dataset = TrainDataset {
        feature_len: table.feature_columns.len(),
        n_classes: encoder.len(),
        x,
        y,
    };

    let holdout = if options.holdout > 0.0 {
        Some(evaluate_holdout(&dataset, &encoder, options)?)
    } else {
        None
    };

    tracing::info!(
        "Training {} trees on {} rows x {} features ({} diseases)",
        options.forest.n_estimators,
        dataset.x.len(),
        dataset.feature_len,
        dataset.n_classes
    );
    let classifier = train_random_forest(&dataset, &options.forest)?;

    let artifact = ModelArtifact {
        format_version: ARTIFACT_FORMAT_VERSION,
        classifier,
        disease_encoder: encoder,
        feature_columns: table.feature_columns.clone(),
        symptom_columns: table.symptom_columns.clone(),
    };
    artifact.validate()?;
    Ok(TrainOutput {
        symptoms: artifact.symptom_list(),
        diseases: artifact.disease_list(),
        artifact,
        holdout,
    })
}

/// Write the artifact and both lookup lists into `out_dir`.
pub fn persist(output: &TrainOutput, out_dir: &Path) -> Result<ArtifactPaths, TrainError> {
    let paths = ArtifactPaths::in_dir(out_dir);
    output.artifact.save_json(&paths.model)?;
    write_lookup_list(&paths.symptoms, &output.symptoms)?;
    write_lookup_list(&paths.diseases, &output.diseases)?;
    tracing::info!("Saved model to {}", paths.model.display());
    Ok(paths)
}

fn evaluate_holdout(
    dataset: &TrainDataset,
    encoder: &LabelEncoder,
    options: &TrainerOptions,
) -> Result<HoldoutReport, TrainError> {
    let n = dataset.x.len();
    let test_rows = ((n as f32) * options.holdout).ceil() as usize;
    if test_rows >= n {
        return Err(TrainError::HoldoutTooLarge);
    }
    let mut order: Vec<usize> = (0..n).collect();
    order.shuffle(&mut StdRng::seed_from_u64(options.forest.seed));
    let (test_idx, train_idx) = order.split_at(test_rows);

    let subset = |indices: &[usize]| TrainDataset {
        feature_len: dataset.feature_len,
        n_classes: dataset.n_classes,
        x: indices.iter().map(|&i| dataset.x[i].clone()).collect(),
        y: indices.iter().map(|&i| dataset.y[i]).collect(),
    };
    let train_set = subset(train_idx);
    let test_set = subset(test_idx);
    let model = train_random_forest(&train_set, &options.forest)?;

    let cm = ConfusionMatrix::from_pairs(
        dataset.n_classes,
        test_set
            .x
            .iter()
            .zip(&test_set.y)
            .map(|(row, &truth)| (truth, model.predict_class_index(row))),
    );
    let per_class = encoder
        .classes()
        .iter()
        .cloned()
        .zip(cm.per_class())
        .collect();
    let report = HoldoutReport {
        rows: test_rows,
        accuracy: cm.accuracy(),
        per_class,
    };
    tracing::info!(
        "Holdout accuracy {:.4} on {} rows",
        report.accuracy,
        report.rows
    );
    Ok(report)
}
