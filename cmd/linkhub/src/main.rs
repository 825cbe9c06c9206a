//! linkhub - single-call IAX2 hub endpoint.

mod audio_io;

use std::net::UdpSocket;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use linkhub_hub::auth::ChallengeVerifier;
use linkhub_hub::registration::HttpRegistrar;
use linkhub_hub::{HubConfig, Scheduler};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Single-call IAX2 hub endpoint bridging network voice and local audio
/// hardware.
#[derive(Parser, Debug)]
#[command(name = "linkhub")]
#[command(about = "Single-call IAX2 hub endpoint")]
#[command(version)]
struct Args {
    /// Config file (JSON or YAML)
    #[arg(short, long)]
    config: PathBuf,

    /// Override the configured bind address
    #[arg(long)]
    bind: Option<String>,

    /// Override the configured UDP port
    #[arg(long)]
    port: Option<u16>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let mut config = HubConfig::load(&args.config).context("loading configuration")?;
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    if let Some(port) = args.port {
        config.port = port;
    }

    // The key may be inline PEM text or a path to a PEM file.
    let pem = if config.public_key_pem.trim_start().starts_with("-----BEGIN") {
        config.public_key_pem.clone()
    } else {
        std::fs::read_to_string(&config.public_key_pem)
            .with_context(|| format!("reading public key file {}", config.public_key_pem))?
    };
    let verifier = ChallengeVerifier::from_pem(&pem).context("loading trusted public key")?;

    let socket = UdpSocket::bind(config.bind_target())
        .with_context(|| format!("binding UDP socket on {}", config.bind_target()))?;

    let (capture, playback) =
        audio_io::open(&config.audio_device).context("opening audio device")?;

    let registrar = HttpRegistrar::new(&config);

    info!(
        node = config.node_id,
        addr = config.bind_target(),
        "listening for IAX2 traffic"
    );

    let mut scheduler = Scheduler::new(
        socket,
        verifier,
        capture,
        playback,
        registrar,
        config.registration_interval_ms,
    )
    .context("starting event loop")?;
    scheduler.run();

    Ok(())
}
