//! `eufycam` command line: log in, list devices, stream, history, timelapse

use anyhow::Context;
use clap::{Parser, Subcommand};
use eufycam_sdk::{
    AuthState, ClientConfig, EufyClient, EufyError, FfmpegCapture, HistoryQuery,
    TimelapseOptions,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "eufycam", version, about = "Eufy Security cloud camera client")]
struct Cli {
    #[arg(long, env = "EUFY_EMAIL")]
    email: String,

    #[arg(long, env = "EUFY_PASSWORD", hide_env_values = true)]
    password: String,

    /// Code received by email after a previous `login` asked for one
    #[arg(long, env = "EUFY_VERIFY_CODE", hide_env_values = true)]
    verify_code: Option<String>,

    #[arg(long, env = "EUFY_BASE_URL")]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Log in and report the outcome
    Login,
    /// Send a new verification code (invalidates earlier ones)
    RequestCode,
    /// List registered devices
    Devices,
    /// Start a live stream and print its URL
    Stream { device: String },
    /// Show recorded events
    History {
        device: String,
        #[arg(long, default_value_t = 24)]
        hours: u32,
    },
    /// Capture one frame per interval into a directory until Ctrl-C
    Timelapse {
        device: String,
        dir: PathBuf,
        #[arg(long, default_value_t = 1)]
        interval_secs: u64,
        /// Stop after this many failed captures in a row
        #[arg(long)]
        max_failures: Option<u32>,
        #[arg(long, default_value = "ffmpeg")]
        ffmpeg: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = ClientConfig::new(cli.email, cli.password);
    if let Some(code) = cli.verify_code {
        config = config.with_verify_code(code);
    }
    if let Some(base_url) = cli.base_url {
        config = config.with_base_url(base_url);
    }
    let client = Arc::new(EufyClient::new(config).context("invalid client configuration")?);

    match cli.command {
        Command::Login => match client.login().await? {
            AuthState::Authenticated => println!("✅ Logged in"),
            _ => println!(
                "⚠️  {}",
                client
                    .session()
                    .last_auth_message()
                    .unwrap_or("login failed")
            ),
        },
        Command::RequestCode => {
            client.request_verification_code().await?;
            println!("📧 Verification code requested");
        }
        Command::Devices => {
            for device in report(client.list_devices().await)? {
                println!(
                    "{}\tstation={}\tdevice={}",
                    device.device_name, device.station_sn, device.device_sn
                );
            }
        }
        Command::Stream { device } => {
            let stream = report(client.start_stream(&device).await)?;
            println!("{}", stream.url);
        }
        Command::History { device, hours } => {
            let query = HistoryQuery::last_hours(hours)?;
            let records = report(client.history(&device, &query).await)?;
            for record in records {
                println!(
                    "{} → {}\t{}",
                    record.start_time,
                    record.end_time,
                    record.pic_url.as_deref().unwrap_or("-")
                );
            }
        }
        Command::Timelapse {
            device,
            dir,
            interval_secs,
            max_failures,
            ffmpeg,
        } => {
            let capture = Arc::new(FfmpegCapture {
                binary: ffmpeg,
                ..FfmpegCapture::default()
            });
            let options = TimelapseOptions {
                interval: Duration::from_secs(interval_secs),
                max_consecutive_failures: max_failures,
            };

            let (handle, cancel) = client.spawn_timelapse(device, dir, capture, options);

            let signal_cancel = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::info!("Interrupted, stopping timelapse");
                    signal_cancel.cancel();
                }
            });

            let summary = report(handle.await.context("timelapse task panicked")?)?;
            println!(
                "🎞️  {} frames captured, {} failed",
                summary.captured, summary.failed
            );
        }
    }

    Ok(())
}

/// Print a friendly line for recoverable failures before bailing out
fn report<T>(result: eufycam_sdk::Result<T>) -> anyhow::Result<T> {
    match result {
        Ok(value) => Ok(value),
        Err(EufyError::VerificationRequired(message)) => {
            anyhow::bail!("{} (rerun with --verify-code)", message)
        }
        Err(err) if err.is_recoverable() => anyhow::bail!("{}", err),
        Err(err) => Err(err.into()),
    }
}
