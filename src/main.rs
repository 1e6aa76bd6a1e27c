use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{CommandFactory, Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use sheetflow_core::config::AppConfig;
use sheetflow_core::credentials::resolve_credentials;
use sheetflow_core::ExecutionContext;
use sheetflow_local::LocalBackend;
use sheetflow_nodes::{NodeEnv, NodeRegistry};
use sheetflow_runner::{PipelineDef, PipelineExecutor};

#[derive(Parser)]
#[command(name = "sheetflow", version, about = "Spreadsheet pipelines built from small nodes")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "sheetflow.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a pipeline against the local backend
    Run {
        /// Pipeline definition (TOML)
        pipeline: PathBuf,
        /// Store file to load and save (overrides [backend].store)
        #[arg(long)]
        store: Option<PathBuf>,
        /// Default credentials file for authenticate steps
        #[arg(long)]
        credentials: Option<String>,
    },
    /// Check a pipeline without running it
    Validate {
        /// Pipeline definition (TOML)
        pipeline: PathBuf,
    },
    /// List available node kinds
    Nodes,
    /// Show which credential source resolves
    Credentials {
        /// Credentials file to try before the environment
        #[arg(long)]
        path: Option<PathBuf>,
    },
    /// Show current configuration
    Config,
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("sheetflow=info,warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // Handle completions before config loading
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = Cli::command();
        clap_complete::generate(*shell, &mut cmd, "sheetflow", &mut std::io::stdout());
        return Ok(());
    }

    let mut config = AppConfig::load_or_default(&cli.config)?;
    info!(config = %cli.config.display(), "Configuration loaded");

    match cli.command {
        Commands::Run {
            pipeline,
            store,
            credentials,
        } => {
            if credentials.is_some() {
                config.credentials.path = credentials;
            }
            let store = store.unwrap_or_else(|| config.store_path());
            run_pipeline(&pipeline, &store, config).await?;
        }
        Commands::Validate { pipeline } => {
            let def = PipelineDef::load(&pipeline)?;
            let executor = PipelineExecutor::new(registry(&LocalBackend::in_memory(), config));
            executor.validate(&def)?;
            println!("{}: {} steps, ok", def.name, def.steps.len());
        }
        Commands::Nodes => {
            let registry = registry(&LocalBackend::in_memory(), config);
            for descriptor in registry.descriptors() {
                println!("{:<26} {}", descriptor.kind, descriptor.description);
                for input in descriptor.inputs {
                    println!("    in  {:<16} {:?}  {}", input.name, input.kind, input.description);
                }
                for output in descriptor.outputs {
                    println!("    out {:<16} {}", output.name, output.description);
                }
            }
        }
        Commands::Credentials { path } => {
            let path = path.or_else(|| config.credentials_path());
            let resolved = resolve_credentials(path.as_deref(), &config.credentials.env_var)?;
            println!("source:  {}", resolved.source);
            println!("account: {}", resolved.credentials.client_email);
            println!("project: {}", resolved.credentials.project_id);
        }
        Commands::Config => {
            println!("{}", toml::to_string_pretty(&config)?);
        }
        Commands::Completions { .. } => unreachable!("handled before config load"),
    }

    Ok(())
}

fn registry(backend: &LocalBackend, config: AppConfig) -> NodeRegistry {
    NodeRegistry::with_builtins(NodeEnv::new(Arc::new(backend.connector()), config))
}

async fn run_pipeline(pipeline: &Path, store: &Path, config: AppConfig) -> anyhow::Result<()> {
    let def = PipelineDef::load(pipeline)?;
    let backend = LocalBackend::open(store).await?;
    let executor = PipelineExecutor::new(registry(&backend, config));

    let mut ctx = ExecutionContext::new();
    let result = executor.run(&def, &mut ctx).await;

    // Steps that succeeded before a failure have already written; keep them.
    backend.save().await?;
    info!(store = %store.display(), "Store saved");

    match result {
        Ok(report) => {
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
        Err(e) => {
            error!(pipeline = %def.name, error = %e, "Run failed");
            Err(e.into())
        }
    }
}
