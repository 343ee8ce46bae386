use chrono;
use clap::{Parser, Subcommand};
use env_logger::fmt::Formatter;
use log::{info, Record};
use pathopredict::config::{
    default_categories_dir, default_models_dir, registered_kind, ServeConfig,
    DEFAULT_FRONTEND_URL, REGISTERED_MODELS,
};
use pathopredict::features::category_store::CategoryStore;
use pathopredict::input::read_records;
use pathopredict::model::model_manager::ModelRegistry;
use pathopredict::serve::{run_server, PredictionResponse};
use std::io::Write;
use std::path::PathBuf;

/// Serve bacterial identification, MIC and resistance gene classifiers
#[derive(Parser, Debug)]
#[command(
    name = "pathopredict",
    version,
    about = "Serve pre-trained microbiology classification models over HTTP",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Load every registered model and serve the prediction API
    Serve {
        /// host to listen to
        #[arg(short('H'), long, default_value = "127.0.0.1")]
        host: String,

        /// port to listen to
        #[arg(short, long, default_value = "8000")]
        port: u16,

        /// directory holding one sub-directory per model.
        /// Defaults to $PATHOPREDICT_HOME/models
        #[arg(short, long)]
        models_dir: Option<PathBuf>,

        /// directory holding `<model>.json` category files.
        /// Defaults to $PATHOPREDICT_HOME/category_features_unique_values
        #[arg(short, long)]
        categories_dir: Option<PathBuf>,

        /// origin of the frontend allowed by CORS
        #[arg(long, env = "FRONTEND_URL", default_value = DEFAULT_FRONTEND_URL)]
        frontend_url: String,

        /// additional allowed origins.
        /// You can provide this option multiple times
        #[arg(long, action = clap::ArgAction::Append)]
        allowed_origin: Vec<String>,
    },

    /// Run one model over a file of records and print the predictions
    Predict {
        /// registered model name
        #[arg(short('M'), long, required = true)]
        model: String,

        /// JSON array of records, or one record per line for .jsonl files
        #[arg(required = true)]
        input: PathBuf,

        #[arg(short, long)]
        models_dir: Option<PathBuf>,

        #[arg(short, long)]
        categories_dir: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::builder()
        .format(|buf: &mut Formatter, record: &Record| {
            writeln!(
                buf,
                "[{} {}] {}",
                chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
                record.level(),
                record.args()
            )
        })
        .filter_module("ort", log::LevelFilter::Warn)
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            host,
            port,
            models_dir,
            categories_dir,
            frontend_url,
            allowed_origin,
        } => {
            let mut allowed_origins = vec![frontend_url];
            allowed_origins.extend(allowed_origin);
            let config = ServeConfig {
                host,
                port,
                models_dir: models_dir.unwrap_or_else(default_models_dir),
                categories_dir: categories_dir.unwrap_or_else(default_categories_dir),
                allowed_origins,
            };
            run_server(config).await?;
        }

        Commands::Predict {
            model,
            input,
            models_dir,
            categories_dir,
        } => {
            let kind = registered_kind(&model).ok_or_else(|| {
                let known: Vec<&str> = REGISTERED_MODELS.iter().map(|(name, _)| *name).collect();
                anyhow::anyhow!("Model {model} not found. Known models: {}", known.join(", "))
            })?;
            let registry = ModelRegistry::load(
                &models_dir.unwrap_or_else(default_models_dir),
                CategoryStore::new(categories_dir.unwrap_or_else(default_categories_dir)),
                &[(model.as_str(), kind)],
            )
            .await?;

            let records = read_records(&input)?;
            info!("read {} records from {:?}", records.len(), input);
            let predictions = registry.predict(&model, &records)?;
            println!(
                "{}",
                serde_json::to_string_pretty(&PredictionResponse { predictions })?
            );
        }
    }

    Ok(())
}
