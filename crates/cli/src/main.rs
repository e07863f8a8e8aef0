mod tree_commands;
mod wizard_commands;

use std::path::PathBuf;

use {
    clap::{Parser, Subcommand},
    tracing::debug,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(name = "ragkit", about = "Setup wizard for ragkit knowledge bases")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Directory holding wizard progress and settings (overrides the
    /// platform data directory).
    #[arg(long, global = true, env = "RAGKIT_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Where the finalized settings are written (`.toml` or `.json`).
    #[arg(long, global = true, env = "RAGKIT_SETTINGS_FILE")]
    settings_file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Guided setup wizard.
    Wizard {
        #[command(subcommand)]
        action: wizard_commands::WizardAction,
    },
    /// Effective file count and size of a scanned folder tree.
    TreeStats(tree_commands::TreeStatsArgs),
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_telemetry(&cli);
    debug!(version = env!("CARGO_PKG_VERSION"), "ragkit starting");

    match cli.command {
        Commands::Wizard { action } => {
            let data_dir = match cli.data_dir {
                Some(dir) => dir,
                None => ragkit_config::data_dir().ok_or_else(|| {
                    anyhow::anyhow!("could not determine a data directory; pass --data-dir")
                })?,
            };
            wizard_commands::handle_wizard(action, &data_dir, cli.settings_file).await
        },
        Commands::TreeStats(args) => tree_commands::handle_tree_stats(args),
    }
}
