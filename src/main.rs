//! Entry point for the symptomcheck prediction service.

use std::path::PathBuf;

use symptomcheck::{config, logging, server};

#[tokio::main]
async fn main() {
    if let Err(err) = logging::init("symptomcheck") {
        eprintln!("File logging disabled: {err}");
    }
    if let Err(err) = run().await {
        tracing::error!("{err}");
        eprintln!("{err}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), String> {
    let config_path = parse_args(std::env::args().skip(1).collect())?;
    let config = match &config_path {
        Some(path) => config::load_from(path),
        None => config::load_or_default(),
    }
    .map_err(|err| err.to_string())?;

    let state = server::load_state(&config).map_err(|err| err.to_string())?;
    server::serve(&config, state)
        .await
        .map_err(|err| err.to_string())
}

fn parse_args(args: Vec<String>) -> Result<Option<PathBuf>, String> {
    let mut config_path = None;
    let mut idx = 0usize;
    while idx < args.len() {
        match args[idx].as_str() {
            "-h" | "--help" => return Err(help_text()),
            "--config" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--config requires a value".to_string())?;
                config_path = Some(PathBuf::from(value));
            }
            unknown => return Err(format!("Unknown argument: {unknown}\n\n{}", help_text())),
        }
        idx += 1;
    }
    Ok(config_path)
}

fn help_text() -> String {
    [
        "symptomcheck",
        "",
        "Serves symptom-based disease predictions over HTTP.",
        "",
        "Usage:",
        "  symptomcheck [--config <file>]",
        "",
        "Options:",
        "  --config <file>  Config file (default: symptomcheck.toml in the app directory).",
    ]
    .join("\n")
}
