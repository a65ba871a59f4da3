mod notice_commands;
mod send_commands;

use {
    clap::{Parser, Subcommand},
    tracing::debug,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(name = "murmur", about = "Send chat messages from the command line")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Config file to use instead of the standard locations.
    #[arg(long, global = true, env = "MURMUR_CONFIG")]
    config: Option<std::path::PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Send a message to a stream topic or to direct message recipients.
    Send(send_commands::SendArgs),
    /// Render the empty-feed notice to stdout.
    Notice(notice_commands::NoticeArgs),
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr)
                    .with_ansi(true),
            )
            .init();
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<murmur_config::MurmurConfig> {
    match &cli.config {
        Some(path) => murmur_config::load_config(path),
        None => Ok(murmur_config::discover_and_load()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_telemetry(&cli);

    debug!(version = env!("CARGO_PKG_VERSION"), "murmur starting");

    match &cli.command {
        Commands::Send(args) => {
            let config = load_config(&cli)?;
            send_commands::handle_send(&config, args).await
        },
        Commands::Notice(args) => notice_commands::handle_notice(args),
    }
}
