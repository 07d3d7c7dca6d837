//! hubcat - command line client for the hub
//!
//! Usage:
//!   hubcat listen
//!   hubcat publish <topic> <payload>
//!
//! Settings are read from `MHUB_CONFIG_PATH` (default `config/mhub.yaml`).

use anyhow::{Context, Result};
use mhub_client::bin_common::{
    init_tracing, load_config_from_env, parse_args, Command, ConfigType, HubSettings,
};
use mhub_client::hubstream::{ClientEvent, HubClient, Message};
use std::time::Duration;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenv::dotenv().ok();

    let command = Command::parse(&parse_args())?;

    let config_path = load_config_from_env(ConfigType::Hub);
    let settings = HubSettings::load(&config_path)
        .with_context(|| format!("loading settings from {}", config_path.display()))?;

    init_tracing(settings.effective_log_level());
    settings.log();

    match command {
        Command::Listen => listen(&settings).await,
        Command::Publish { topic, payload } => publish(&settings, &topic, &payload).await,
    }
}

async fn listen(settings: &HubSettings) -> Result<()> {
    let client = settings
        .client_builder()
        .handler(|message: Message| {
            println!(
                "{} {} {}",
                message.subscriber_id(),
                message.topic(),
                String::from_utf8_lossy(message.payload())
            );
        })
        .build()
        .await
        .context("building hub client")?;

    client.start()?;

    println!("════════════════════════════════════════");
    println!("Listening on {} as {}", settings.address, client.subscriber_id());
    println!("Topics: {:?}", client.topics());
    println!("Press Ctrl+C to stop");
    println!("════════════════════════════════════════");

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut ticker = tokio::time::interval(Duration::from_millis(250));

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                info!("Ctrl+C received, stopping");
                break;
            }
            _ = ticker.tick() => drain_events(&client),
        }
    }

    let metrics = client.metrics();
    client.shutdown().await?;

    println!("════════════════════════════════════════");
    println!("Frames received:  {}", metrics.frames_received);
    println!("Malformed frames: {}", metrics.malformed_frames);
    println!("Reconnects:       {}", metrics.reconnect_count);
    println!("════════════════════════════════════════");
    Ok(())
}

fn drain_events(client: &HubClient) {
    while let Some(event) = client.try_recv_event() {
        match event {
            ClientEvent::Connected => info!("Connected"),
            ClientEvent::Disconnected => warn!("Disconnected"),
            ClientEvent::Reconnecting(attempt) => info!("Reconnecting (attempt {})", attempt + 1),
            ClientEvent::MalformedFrame { len, reason } => {
                warn!("Dropped {} byte frame: {}", len, reason)
            }
            ClientEvent::Error(e) => warn!("{}", e),
        }
    }
}

async fn publish(settings: &HubSettings, topic: &str, payload: &str) -> Result<()> {
    let client = settings
        .client_builder()
        .build()
        .await
        .context("building hub client")?;

    client
        .publish(topic, payload)
        .await
        .with_context(|| format!("publishing on {}", topic))?;
    println!("Published to {} as {}", topic, client.subscriber_id());

    client.shutdown().await?;
    Ok(())
}
