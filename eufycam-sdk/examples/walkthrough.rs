//! Walk through the API with a real account: login, devices, history and a
//! short timelapse.
//!
//! EUFY_EMAIL=... EUFY_PASSWORD=... cargo run --example walkthrough -- "Front Door"

use eufycam_sdk::{
    AuthState, ClientConfig, EufyClient, EufyError, FfmpegCapture, HistoryQuery, Result,
    TimelapseOptions,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<()> {
    println!("🔐 Eufy Security walkthrough\n");

    let (Ok(email), Ok(password)) = (std::env::var("EUFY_EMAIL"), std::env::var("EUFY_PASSWORD"))
    else {
        println!("❌ Set EUFY_EMAIL and EUFY_PASSWORD first");
        return Ok(());
    };
    let device_name = std::env::args().nth(1).unwrap_or_else(|| "Front Door".to_string());

    let mut config = ClientConfig::new(email, password);
    if let Ok(code) = std::env::var("EUFY_VERIFY_CODE") {
        config = config.with_verify_code(code);
    }
    let client = Arc::new(EufyClient::new(config)?);

    // Step 1: Log in
    println!("📝 Logging in...");
    match client.login().await? {
        AuthState::Authenticated => println!("✅ Logged in"),
        AuthState::AwaitingVerification => {
            println!("📧 {}", client.session().last_auth_message().unwrap_or_default());
            println!("   Rerun with EUFY_VERIFY_CODE set");
            return Ok(());
        }
        AuthState::Unauthenticated => {
            println!("❌ {}", client.session().last_auth_message().unwrap_or_default());
            return Ok(());
        }
    }

    // Step 2: Devices
    println!("\n📷 Devices:");
    for device in client.list_devices().await? {
        println!("   {} ({} / {})", device.device_name, device.station_sn, device.device_sn);
    }

    // Step 3: Last day of events
    println!("\n🗂️  Events for {}:", device_name);
    let query = HistoryQuery::last_hours(24)?;
    match client.history(&device_name, &query).await {
        Ok(records) => {
            for record in records.iter().take(10) {
                println!("   {} → {}", record.start_time, record.end_time);
            }
            println!("   ({} total)", records.len());
        }
        Err(EufyError::DeviceNotFound(name)) => {
            println!("⚠️  No device named {:?}", name);
            return Ok(());
        }
        Err(e) => println!("❌ Failed: {}", e),
    }

    // Step 4: Ten seconds of timelapse
    println!("\n🎞️  Capturing for 10 seconds...");
    let dir = PathBuf::from("timelapse");
    let (handle, cancel) = client.clone().spawn_timelapse(
        device_name,
        dir.clone(),
        Arc::new(FfmpegCapture::default()),
        TimelapseOptions::default(),
    );

    tokio::time::sleep(Duration::from_secs(10)).await;
    cancel.cancel();

    match handle.await {
        Ok(Ok(summary)) => println!(
            "✅ {} frames in {} ({} failed)",
            summary.captured,
            dir.display(),
            summary.failed
        ),
        Ok(Err(e)) => println!("❌ Timelapse failed: {}", e),
        Err(e) => println!("❌ Timelapse task died: {}", e),
    }

    println!("\n✨ Done!");
    Ok(())
}
