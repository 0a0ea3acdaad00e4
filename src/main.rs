use clap::{Parser, Subcommand};
use std::io::Read;
use std::sync::Arc;
use tracing::{error, info, warn};
use visibility_worker::cache::CacheManager;
use visibility_worker::database::Database;
use visibility_worker::plans::ConfigPlanSource;
use visibility_worker::providers::openai::{
    OpenAiClient, OpenAiCompletionProvider, OpenAiWebSearchProvider,
};
use visibility_worker::providers::{FallbackProvider, ProviderRegistry};
use visibility_worker::usage::UsageLedger;
use visibility_worker::visibility::classify::OpenAiClassifier;
use visibility_worker::visibility::persist::RunPersister;
use visibility_worker::visibility::{BatchRunner, JobEnvelope, VISIBILITY_JOB_TYPE};
use visibility_worker::{AppError, Config};

#[derive(Parser)]
#[command(name = "visibility-worker")]
#[command(about = "Quota-enforced AI brand-visibility probe runner")]
struct Cli {
    #[arg(short, long, help = "Path to configuration file")]
    config: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations and exit
    Migrate,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from_file(path),
        None => Config::load(),
    };
    let config = match config {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(&config.logging.level))
        .init();

    if let Err(e) = run(cli, config).await {
        error!("Worker failed: {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: Config) -> Result<(), AppError> {
    let database = Database::new_from_config(&config.database).await?;
    database.health_check().await?;
    database.migrate().await?;

    if let Some(Commands::Migrate) = cli.command {
        info!("Migrations complete");
        return Ok(());
    }

    let cache = CacheManager::new_from_config(&config.cache).await?;
    info!(backend = cache.backend_type(), "cache initialized");

    // One job envelope per invocation, read from stdin
    let mut raw = String::new();
    std::io::stdin()
        .read_to_string(&mut raw)
        .map_err(|e| AppError::Job(format!("failed to read job from stdin: {}", e)))?;
    let envelope: JobEnvelope = serde_json::from_str(&raw)
        .map_err(|e| AppError::Job(format!("invalid job envelope: {}", e)))?;

    if envelope.job_type != VISIBILITY_JOB_TYPE {
        warn!(job_type = %envelope.job_type, "unknown job type, ignoring");
        return Ok(());
    }

    let openai = Arc::new(OpenAiClient::new(config.openai.clone()));
    let openai_provider = Arc::new(FallbackProvider::new(
        Arc::new(OpenAiWebSearchProvider::new(openai.clone())),
        Arc::new(OpenAiCompletionProvider::new(openai.clone())),
    ));

    let runner = BatchRunner::new(
        UsageLedger::new(database.connection().clone(), cache.counters()),
        RunPersister::new(database.connection().clone()),
        database.prompts(),
        Arc::new(ConfigPlanSource::new(database.users(), config.plans.clone())),
        ProviderRegistry::new().with_openai(openai_provider),
        Arc::new(OpenAiClassifier::new(openai)),
    );

    let summaries = runner.run_job(&envelope.data).await?;
    println!(
        "{}",
        serde_json::to_string(&summaries)
            .map_err(|e| AppError::Job(format!("summary encoding failed: {}", e)))?
    );

    Ok(())
}
