#![forbid(unsafe_code)]

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use uuid::Uuid;

use tripartite::gateway::{NoopUsageSink, ProviderGateway, StderrUsageSink};
use tripartite::{
    quality, CallerIdentity, FallbackController, FallbackMode, PipelineConfig,
    PipelineOrchestrator, PipelineRequest, PipelineResult, StageBackends, StderrObserver,
};

#[derive(Parser)]
#[command(name = "tripartite", version, about = "Three-stage AI research flow CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full flow from a request JSON file
    Run {
        /// Path to a PipelineRequest JSON file
        #[arg(long)]
        request: PathBuf,

        /// Write the result JSON here instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,

        /// Reject results scoring below the threshold instead of passing
        /// them through
        #[arg(long)]
        strict: bool,

        /// Quality threshold in [0, 1]
        #[arg(long, default_value_t = 0.7)]
        threshold: f64,

        /// Skip Stage 1 (query interpretation)
        #[arg(long)]
        no_interpret: bool,

        /// Skip Stage 2 (web intelligence retrieval)
        #[arg(long)]
        no_search: bool,

        /// Skip Stage 3 (response synthesis)
        #[arg(long)]
        no_style: bool,

        /// Log per-call usage records to stderr
        #[arg(long)]
        usage: bool,
    },
    /// Score a stored result JSON without re-running the flow
    Score {
        /// Path to a PipelineResult JSON file
        #[arg(long)]
        result: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Run {
            request,
            out,
            strict,
            threshold,
            no_interpret,
            no_search,
            no_style,
            usage,
        } => {
            let raw = fs::read_to_string(&request)?;
            let request: PipelineRequest = serde_json::from_str(&raw)?;

            let gateway: Arc<dyn tripartite::ChatGateway> = if usage {
                Arc::new(ProviderGateway::from_env(Arc::new(StderrUsageSink))?)
            } else {
                Arc::new(ProviderGateway::from_env(Arc::new(NoopUsageSink))?)
            };

            let orchestrator = Arc::new(
                PipelineOrchestrator::new(StageBackends::openrouter_defaults(gateway))
                    .with_observer(Arc::new(StderrObserver)),
            );
            let controller = FallbackController::new(orchestrator);

            let config = PipelineConfig {
                interpret: !no_interpret,
                search: !no_search,
                style: !no_style,
                fallback_mode: if strict {
                    FallbackMode::Strict
                } else {
                    FallbackMode::Graceful
                },
                quality_threshold: threshold,
            };

            // Auth enforcement is a caller concern; the CLI is its own caller.
            let identity = CallerIdentity::new(
                Uuid::new_v4(),
                std::env::var("TRIPARTITE_ACCESS_TOKEN").unwrap_or_else(|_| "cli-local".into()),
            );

            let guarded = controller
                .execute_advanced_flow(&identity, &request, &config)
                .await?;

            eprintln!(
                "[flow] quality: {:.3} (threshold {:.2}, passes: {})",
                guarded.quality_score, config.quality_threshold, guarded.passes_threshold
            );

            let json = serde_json::to_string_pretty(&guarded.result)?;
            match out {
                Some(path) => fs::write(path, json)?,
                None => println!("{json}"),
            }
        }
        Commands::Score { result } => {
            let raw = fs::read_to_string(&result)?;
            let result: PipelineResult = serde_json::from_str(&raw)?;
            println!("{:.3}", quality::score(&result));
        }
    }
    Ok(())
}
