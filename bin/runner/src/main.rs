use agentflow_agents::{HttpDispatcher, create_default_config_from_tags};
use agentflow_flow::{Engine, FlowService};
use agentflow_runner::config::RunnerConfig;
use agentflow_runner::error::RunnerError;
use agentflow_runner::{flow_file, summary};
use clap::{Parser, Subcommand};
use rootcause::Report;
use std::path::PathBuf;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "agentflow", version, about = "Run agent flow graphs")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every agent node of a flow once
    Run {
        /// Flow document to run
        flow: PathBuf,
        /// Write the updated execution records back to the flow document
        #[arg(long)]
        write: bool,
        /// Per-node timeout in seconds
        #[arg(long)]
        timeout_secs: Option<u64>,
        /// Agent backend origin
        #[arg(long)]
        origin: Option<String>,
    },
    /// Check a flow document without running it
    Validate {
        /// Flow document to check
        flow: PathBuf,
    },
    /// Print the default config for an agent type
    NewConfig {
        /// Agent type, e.g. web_searcher or webSearcher
        agent_type: String,
        /// Backend model provider
        #[arg(long, default_value = "openai")]
        model: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let outcome = match cli.command {
        Commands::Run {
            flow,
            write,
            timeout_secs,
            origin,
        } => run(flow, write, timeout_secs, origin).await,
        Commands::Validate { flow } => validate(flow),
        Commands::NewConfig { agent_type, model } => new_config(&agent_type, &model),
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(report) => {
            tracing::error!("{report}");
            ExitCode::FAILURE
        }
    }
}

async fn run(
    path: PathBuf,
    write: bool,
    timeout_secs: Option<u64>,
    origin: Option<String>,
) -> Result<(), Report<RunnerError>> {
    let config = RunnerConfig::from_env()
        .map_err(|e| RunnerError::Config {
            reason: e.to_string(),
        })?
        .with_overrides(origin, timeout_secs);
    let engine_config = config.engine_config()?;
    let store = flow_file::load(&path)?;
    tracing::info!(
        path = %path.display(),
        origin = %config.backend.origin,
        node_timeout_secs = config.engine.node_timeout_secs,
        "running flow"
    );

    let engine = Engine::with_config(
        HttpDispatcher::new(config.backend.origin.clone()),
        engine_config,
    );
    let handle = FlowService::spawn(store, engine);

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received; stopping before the next node");
            on_signal.cancel();
        }
    });

    let report = handle
        .run_with_cancel(cancel)
        .await
        .map_err(|e| RunnerError::Run {
            reason: e.to_string(),
        })?;
    let state = handle.snapshot().await.map_err(|e| RunnerError::Run {
        reason: e.to_string(),
    })?;

    print!("{}", summary::render(&report, &state));
    if write {
        flow_file::save(&path, &state)?;
        tracing::info!(path = %path.display(), "execution records written");
    }
    Ok(())
}

fn validate(path: PathBuf) -> Result<(), Report<RunnerError>> {
    let store = flow_file::load(&path)?;
    let order = agentflow_flow::execution_order(store.nodes(), store.edges()).map_err(|source| {
        RunnerError::Cyclic {
            path: path.clone(),
            source,
        }
    })?;
    println!(
        "{}: {} nodes, {} edges, run order: {}",
        path.display(),
        store.nodes().len(),
        store.edges().len(),
        order
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" -> ")
    );
    Ok(())
}

fn new_config(agent_type: &str, model: &str) -> Result<(), Report<RunnerError>> {
    let config = create_default_config_from_tags(agent_type, model).map_err(|e| {
        RunnerError::Config {
            reason: e.to_string(),
        }
    })?;
    let json = serde_json::to_string_pretty(&config).map_err(|e| RunnerError::Config {
        reason: e.to_string(),
    })?;
    println!("{json}");
    Ok(())
}
