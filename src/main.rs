use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use dealmon::{AppConfig, CheckerRegistry, DealMon, SmtpMailer};

#[derive(Parser, Debug)]
#[command(name = "dealmon", version, about = "Watches retailer product pages and emails when a deal appears")]
struct Args {
    /// Path to the JSON configuration file
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    /// Check every product once and exit
    #[arg(long)]
    once: bool,

    /// Also write daily-rotated logs to this directory
    #[arg(long)]
    log_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    // Held until exit so buffered file logs are flushed
    let _log_guard = init_tracing(args.log_dir.as_deref())?;

    info!("Starting DealMon {}", env!("CARGO_PKG_VERSION"));

    let config = AppConfig::load_or_default(&args.config);
    let registry = CheckerRegistry::with_default_sites();
    let mailer = Arc::new(SmtpMailer::new(config.settings.email.smtp_mailer.clone()));
    let mut monitor = DealMon::new(&config, &registry, mailer);

    if args.once {
        let outcomes = monitor.run_once().await?;
        let deals = outcomes
            .iter()
            .filter(|o| o.result.as_ref().is_ok_and(|r| r.deal))
            .count();
        info!("Checked {} products, {} deals found", outcomes.len(), deals);
        return Ok(());
    }

    monitor
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
            }
            info!("Shutting down...");
        })
        .await?;

    Ok(())
}

fn init_tracing(log_dir: Option<&std::path::Path>) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("dealmon=info"));
    let stdout_layer = fmt::layer();

    match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "dealmon.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(filter)
                .with(stdout_layer)
                .with(fmt::layer().with_ansi(false).with_writer(writer))
                .try_init()?;
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(stdout_layer)
                .try_init()?;
            Ok(None)
        }
    }
}
