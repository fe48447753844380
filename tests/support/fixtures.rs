use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use symptomcheck::config::AgePolicy;
use symptomcheck::dataset::read_csv;
use symptomcheck::ml::forest::TrainOptions;
use symptomcheck::predict::AdviceTable;
use symptomcheck::server::AppState;
use symptomcheck::trainer::{self, TrainOutput, TrainerOptions};

pub const SYMPTOMS: [&str; 7] = [
    "chest_pain",
    "cough",
    "fever",
    "headache",
    "itching",
    "nausea",
    "skin_rash",
];

pub const DISEASES: [&str; 3] = ["Common Cold", "Fungal infection", "Migraine"];

/// Twelve patients per disease; the symptom sets never overlap between diseases.
pub fn sample_csv() -> String {
    let mut csv = String::from(
        "Patient_ID,Disease,itching,skin_rash,fever,cough,headache,nausea,chest_pain,Age,Gender\n",
    );
    let genders = ["Male", "Female", "Other"];
    let mut id = 0;
    for i in 0..12 {
        let gender = genders[i % genders.len()];
        let age = 18 + (i * 5) % 60;
        id += 1;
        csv.push_str(&format!(
            "{id},Fungal infection,1,{},0,0,0,0,0,{age},{gender}\n",
            i % 2
        ));
        id += 1;
        csv.push_str(&format!(
            "{id},Common Cold,0,0,1,1,{},0,0,{age},{gender}\n",
            (i % 3 == 0) as u8
        ));
        id += 1;
        csv.push_str(&format!(
            "{id},Migraine,0,0,0,0,1,{},0,{age},{gender}\n",
            i % 2
        ));
    }
    csv
}

pub fn write_sample_csv(dir: &Path) -> PathBuf {
    let path = dir.join("dataset.csv");
    std::fs::write(&path, sample_csv()).unwrap();
    path
}

pub fn trainer_options() -> TrainerOptions {
    TrainerOptions {
        forest: TrainOptions {
            n_estimators: 25,
            ..TrainOptions::default()
        },
        holdout: 0.0,
    }
}

pub fn trained_output() -> TrainOutput {
    let table = read_csv(sample_csv().as_bytes()).unwrap();
    trainer::train(&table, &trainer_options()).unwrap()
}

pub fn advice() -> AdviceTable {
    AdviceTable::from_entries(BTreeMap::from([
        ("default".to_string(), "Rest and drink fluids.".to_string()),
        (
            "Fungal infection".to_string(),
            "Keep the skin clean and dry.".to_string(),
        ),
    ]))
    .unwrap()
}

pub fn trained_state() -> AppState {
    AppState::from_artifact(trained_output().artifact, advice(), AgePolicy::default()).unwrap()
}
