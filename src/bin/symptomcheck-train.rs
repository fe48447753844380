//! Trains the disease classifier from a symptom CSV and writes the service artifacts.

use std::path::PathBuf;

use symptomcheck::dataset::load_csv;
use symptomcheck::logging;
use symptomcheck::ml::forest::TrainOptions;
use symptomcheck::trainer::{self, HoldoutReport, TrainerOptions};

fn main() {
    if let Err(err) = logging::init("symptomcheck-train") {
        eprintln!("File logging disabled: {err}");
    }
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let options = parse_args(std::env::args().skip(1).collect())?;
    if !options.dataset.is_file() {
        return Err(format!(
            "Dataset path is not a file: {}",
            options.dataset.display()
        ));
    }

    let table = load_csv(&options.dataset).map_err(|err| err.to_string())?;
    let trainer_options = TrainerOptions {
        forest: TrainOptions {
            n_estimators: options.estimators,
            seed: options.seed,
            ..TrainOptions::default()
        },
        holdout: options.holdout,
    };
    let output = trainer::train(&table, &trainer_options).map_err(|err| err.to_string())?;
    let paths = trainer::persist(&output, &options.out_dir).map_err(|err| err.to_string())?;

    println!("Model trained and saved successfully!");
    println!("model: {}", paths.model.display());
    println!("symptoms: {}", output.symptoms.len());
    println!("diseases: {}", output.diseases.len());
    if table.dropped_rows > 0 {
        println!("skipped rows without a disease: {}", table.dropped_rows);
    }
    if let Some(report) = &output.holdout {
        print_report(report);
    }
    Ok(())
}

fn print_report(report: &HoldoutReport) {
    println!(
        "holdout accuracy: {:.4} ({} rows)",
        report.accuracy, report.rows
    );
    for (disease, stats) in &report.per_class {
        if stats.support == 0 {
            continue;
        }
        println!(
            "  {:<32}  precision={:.3}  recall={:.3}  f1={:.3}  support={}",
            disease,
            stats.precision,
            stats.recall,
            stats.f1(),
            stats.support
        );
    }
}

#[derive(Debug, Clone)]
struct CliOptions {
    dataset: PathBuf,
    out_dir: PathBuf,
    estimators: usize,
    seed: u64,
    holdout: f32,
}

fn parse_args(args: Vec<String>) -> Result<CliOptions, String> {
    let mut dataset: Option<PathBuf> = None;
    let mut out_dir = PathBuf::from(".");
    let mut estimators = TrainOptions::default().n_estimators;
    let mut seed = TrainOptions::default().seed;
    let mut holdout = 0.0f32;

    let mut idx = 0usize;
    while idx < args.len() {
        match args[idx].as_str() {
            "-h" | "--help" => return Err(help_text()),
            "--dataset" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--dataset requires a value".to_string())?;
                dataset = Some(PathBuf::from(value));
            }
            "--out-dir" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--out-dir requires a value".to_string())?;
                out_dir = PathBuf::from(value);
            }
            "--estimators" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--estimators requires a value".to_string())?;
                estimators = value
                    .parse::<usize>()
                    .ok()
                    .filter(|n| *n > 0)
                    .ok_or_else(|| format!("Invalid --estimators value: {value}"))?;
            }
            "--seed" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--seed requires a value".to_string())?;
                seed = value
                    .parse::<u64>()
                    .map_err(|_| format!("Invalid --seed value: {value}"))?;
            }
            "--holdout" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--holdout requires a value".to_string())?;
                holdout = value
                    .parse::<f32>()
                    .map_err(|_| format!("Invalid --holdout value: {value}"))?;
            }
            unknown => return Err(format!("Unknown argument: {unknown}\n\n{}", help_text())),
        }
        idx += 1;
    }

    let dataset = dataset.ok_or_else(help_text)?;
    Ok(CliOptions {
        dataset,
        out_dir,
        estimators,
        seed,
        holdout,
    })
}

fn help_text() -> String {
    [
        "symptomcheck-train",
        "",
        "Trains a random forest disease classifier from a symptom CSV.",
        "",
        "Usage:",
        "  symptomcheck-train --dataset <file.csv> [--out-dir <dir>] [options]",
        "",
        "Options:",
        "  --dataset <file>    CSV with a Disease column and one 0/1 column per symptom (required).",
        "  --out-dir <dir>     Where model.json and the lookup lists are written (default: .).",
        "  --estimators <n>    Number of trees (default: 200).",
        "  --seed <n>          Random seed (default: 42).",
        "  --holdout <f32>     Fraction of rows scored on a held-out model, 0 disables (default: 0).",
    ]
    .join("\n")
}
