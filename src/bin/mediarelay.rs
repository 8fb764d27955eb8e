use std::sync::Arc;

use clap::Parser;
use mediarelay::config::RelayConfig;
use mediarelay::router::Registry;
use mediarelay::rtsp;

/// A media plane relay for RTSP/RTMP/WebRTC/MJPEG producers and consumers.
#[derive(Parser, Debug)]
#[command(name = "mediarelay", version)]
struct Args {
    /// Path to a YAML config file. Missing file falls back to defaults.
    #[arg(short, long, default_value = "mediarelay.yaml")]
    config: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let config = match RelayConfig::load(&args.config) {
        Ok(config) => config,
        Err(err) => {
            log::warn!("couldn't load {}: {err}, using defaults", args.config);
            RelayConfig::default()
        }
    };

    let registry = Arc::new(Registry::new());

    for (name, url) in config.streams.clone() {
        let registry = registry.clone();
        tokio::spawn(async move {
            match rtsp::dial_producer(&url).await {
                Ok(producer) => {
                    let stream = registry.get_or_new(&name);
                    stream.add_producer(producer);
                    log::info!("stream {name} ready from {url}");
                }
                Err(err) => log::error!("couldn't dial stream {name} ({url}): {err}"),
            }
        });
    }

    let listener = tokio::net::TcpListener::bind(&config.rtsp_listen).await?;
    log::info!("rtsp server listening on {}", config.rtsp_listen);

    loop {
        let (socket, peer) = listener.accept().await?;
        let registry = registry.clone();
        tokio::spawn(async move {
            log::debug!("rtsp session from {peer}");
            if let Err(err) = rtsp::serve_session(socket, registry).await {
                log::warn!("rtsp session {peer} ended: {err}");
            }
        });
    }
}
