use clap::{Parser, Subcommand};
use compose::{CommandRunner, DryRunRunner, OutputStream, SystemRunner};
use deployer::readiness::{DEFAULT_PROBE_INTERVAL, DEFAULT_PROBE_TIMEOUT};
use deployer::{ops, DeployConfig, DeployError, DeployResult, Deployment, WaitStrategy};
use std::error::Error;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "shipyard")]
#[command(about = "Deploy a Docker Compose Django project on this host")]
struct Cli {
    /// Project directory holding the compose file and .env
    #[arg(short = 'C', long = "dir", global = true, default_value = ".")]
    dir: PathBuf,
    /// Compose file, relative to the project directory
    #[arg(short = 'f', long = "file", global = true)]
    file: Option<PathBuf>,
    /// Environment file, relative to the project directory
    #[arg(long, global = true)]
    env_file: Option<PathBuf>,
    /// Config file (defaults to shipyard.toml in the project directory, if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Pull, build, restart, migrate and collect static files (default)
    Deploy {
        /// Print commands instead of running them
        #[arg(long)]
        dry_run: bool,
        /// Print the run report as JSON
        #[arg(long)]
        json: bool,
        /// Poll the database with a readiness probe instead of a fixed wait
        #[arg(long)]
        wait_probe: bool,
        /// Fixed wait length, or probe timeout with --wait-probe
        #[arg(long, value_name = "SECS")]
        wait_secs: Option<u64>,
    },
    /// Show container status
    Status,
    /// Show container logs
    Logs {
        /// Only show logs for this service
        service: Option<String>,
        /// Keep streaming new output
        #[arg(long)]
        follow: bool,
        /// Number of lines to show from the end of the logs
        #[arg(long)]
        tail: Option<u32>,
    },
    /// Create a Django admin user
    Createsuperuser,
    /// Open a Django shell in the web container
    Shell,
    /// Check the project directory and tools before deploying
    Check {
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli).await {
        eprintln!("✗ {}", e);
        let mut source = e.source();
        while let Some(cause) = source {
            eprintln!("  caused by: {}", cause);
            source = cause.source();
        }
        std::process::exit(e.exit_code());
    }
}

fn load_config(cli: &Cli) -> DeployResult<DeployConfig> {
    let mut config = DeployConfig::load(&cli.dir, cli.config.as_deref())?;
    if let Some(file) = &cli.file {
        config = config.with_compose_file(file);
    }
    if let Some(env_file) = &cli.env_file {
        config = config.with_env_file(env_file);
    }
    config.validate()?;
    Ok(config)
}

/// Apply `--wait-probe` / `--wait-secs` on top of the configured strategy.
fn wait_override(current: WaitStrategy, probe: bool, secs: Option<u64>) -> WaitStrategy {
    let secs = secs.map(Duration::from_secs);
    match (probe, current) {
        (false, WaitStrategy::Fixed(duration)) => WaitStrategy::Fixed(secs.unwrap_or(duration)),
        (true, WaitStrategy::Fixed(_)) => WaitStrategy::Probe {
            interval: DEFAULT_PROBE_INTERVAL,
            timeout: secs
                .unwrap_or(DEFAULT_PROBE_TIMEOUT)
                .max(DEFAULT_PROBE_INTERVAL),
        },
        (_, WaitStrategy::Probe { interval, timeout }) => WaitStrategy::Probe {
            interval,
            timeout: secs.map_or(timeout, |t| t.max(interval)),
        },
    }
}

async fn run(cli: Cli) -> DeployResult<()> {
    let config = load_config(&cli)?;
    let system = SystemRunner::new();

    match cli.command.unwrap_or(Commands::Deploy {
        dry_run: false,
        json: false,
        wait_probe: false,
        wait_secs: None,
    }) {
        Commands::Deploy {
            dry_run,
            json,
            wait_probe,
            wait_secs,
        } => {
            let wait = wait_override(config.wait, wait_probe, wait_secs);
            let config = config.with_wait(wait);
            config.validate()?;

            // With --json, stdout carries nothing but the report.
            let output = if json {
                OutputStream::Stderr
            } else {
                OutputStream::Stdout
            };
            let dry = DryRunRunner::new().with_output(output);
            let live = system.clone().with_output(output);
            let runner: &dyn CommandRunner = if dry_run { &dry } else { &live };

            let report = Deployment::new(config, runner)
                .with_dry_run(dry_run)
                .with_output(output)
                .run()
                .await?;

            output.line(format!(
                "✓ Deployment completed in {:.1}s",
                report.total_duration_ms() as f64 / 1000.0
            ));
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            }
            info!(run_id = %report.run_id, "done");
        }
        Commands::Status => ops::status(&config, &system).await?,
        Commands::Logs {
            service,
            follow,
            tail,
        } => ops::logs(&config, &system, service.as_deref(), follow, tail).await?,
        Commands::Createsuperuser => ops::create_superuser(&config, &system).await?,
        Commands::Shell => ops::django_shell(&config, &system).await?,
        Commands::Check { json } => {
            let report = ops::check(&config, &system).await;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                report.print();
            }
            let blocking = report.blocking_problems();
            if blocking > 0 {
                return Err(DeployError::CheckFailed(blocking));
            }
        }
    }

    Ok(())
}
