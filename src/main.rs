use anyhow::Context;
use clap::{Parser, Subcommand};
use genstudio::config::Config;
use genstudio::providers::build_client;
use genstudio::App;
use serde_json::Value;
use std::path::{Path, PathBuf};

#[derive(Debug, Parser)]
#[command(name = "genstudio", version, about = "Map canvas form data to generation provider payloads")]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "genstudio.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List registered model ids
    Models,
    /// Print the provider payload built from a form-data JSON file
    Map { model: String, data: PathBuf },
    /// Build the payload and submit it to the model's provider
    Submit {
        model: String,
        data: PathBuf,
        #[arg(long, default_value = "local")]
        user: String,
    },
}

fn read_data(path: &Path) -> anyhow::Result<Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read form data '{}'", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Form data '{}' is not valid JSON", path.display()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::from_file(&cli.config)?;
    genstudio::logging::init(&config.logging, &config.app.log_level)?;

    let app = App::from_config(config)?;

    match cli.command {
        Command::Models => {
            for id in app.registry.model_ids() {
                println!("{id}");
            }
        }
        Command::Map { model, data } => {
            let data = read_data(&data)?;
            let request = app.submitter().prepare(&model, &data)?;
            println!("{}", serde_json::to_string_pretty(&request.input)?);
        }
        Command::Submit { model, data, user } => {
            let data = read_data(&data)?;
            let submitter = app.submitter();
            let provider = submitter.provider_for(&model)?;
            let client = build_client(provider, &app.config.providers)?;
            let submission = submitter.with_client(client).submit(&user, &model, &data).await?;
            println!("{}", serde_json::to_string_pretty(&submission)?);
        }
    }
    Ok(())
}
