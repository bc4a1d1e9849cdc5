use clap::{Parser, Subcommand};
use std::path::PathBuf;

use audio_enhancer::cleanup;
use audio_enhancer::monitoring::{SummaryOutcome, SummaryReporter};
use audio_enhancer::serve;
use audio_enhancer::store::LogStore;
use audio_enhancer::{Config, DynError};

#[derive(Parser, Debug)]
#[command(author, version, about = "Audio enhancement backend for the ai-coustics API")]
struct Args {
    /// Path to config file (TOML format); environment variables override it
    #[arg(short, long, global = true, env = "AUDIO_ENHANCER_CONFIG")]
    config: Option<PathBuf>,

    /// Directory holding audio.db and the enhanced files
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server with the daily cleanup and summary tasks
    Serve {
        /// Port to listen on (overrides config file)
        #[arg(short, long)]
        port: Option<u16>,

        /// Directory holding enhance.html
        #[arg(long)]
        static_dir: Option<PathBuf>,
    },
    /// Delete enhanced files older than the retention window once and exit
    Cleanup,
    /// Post today's summary to Slack once and exit
    Summary,
}

fn main() -> Result<(), DynError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let mut config = Config::load(args.config.as_deref())?;
    if let Some(data_dir) = args.data_dir {
        config.data_dir = data_dir;
    }

    let rt = tokio::runtime::Runtime::new()?;
    match args.command {
        Command::Serve { port, static_dir } => {
            if let Some(port) = port {
                config.port = port;
            }
            if let Some(static_dir) = static_dir {
                config.static_dir = static_dir;
            }
            rt.block_on(serve::serve(config))
        }
        Command::Cleanup => rt.block_on(async {
            let report = cleanup::sweep_once(
                &config.enhanced_dir(),
                config.retention(),
                std::time::SystemTime::now(),
            )
            .await?;
            println!(
                "Removed {} files ({:.2} MB) older than {} days",
                report.removed_count,
                report.removed_mb(),
                config.storage_days
            );
            Ok::<(), DynError>(())
        }),
        Command::Summary => rt.block_on(async {
            let store = LogStore::new(config.db_path(), config.enhanced_dir());
            store.initialize().await?;
            let reporter = SummaryReporter::new(
                store,
                config.slack_webhook_url.clone(),
                config.slack_channel.clone(),
            );
            match reporter.send_daily_summary().await? {
                SummaryOutcome::Sent => println!("Daily summary sent"),
                SummaryOutcome::SkippedNoWebhook => println!("Slack webhook not configured"),
                SummaryOutcome::SkippedNoRequests => println!("No requests today, nothing sent"),
                SummaryOutcome::Rejected(status) => {
                    return Err(format!("Webhook rejected the summary: HTTP {}", status).into())
                }
            }
            Ok::<(), DynError>(())
        }),
    }
}
