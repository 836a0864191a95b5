//! liveseek Player (liveseek-player) - Demo entry point
//!
//! Drives a `PlaybackSession` over the simulated engine from line commands on
//! stdin and prints outward player events as JSON lines on stdout. Logs go to
//! stderr (or the configured log file).

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use liveseek_common::ErrorKind;
use liveseek_player::engine::sim::SimEngineFactory;
use liveseek_player::engine::{EngineEvent, TimeRange};
use liveseek_player::provider::from_sync_fn;
use liveseek_player::{Error, PlaybackSession, PlayerConfig};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use url::Url;
use uuid::Uuid;

/// Command-line arguments for liveseek-player
#[derive(Parser, Debug)]
#[command(name = "liveseek-player")]
#[command(about = "Live-stream playback controller demo")]
#[command(version)]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Base stream URL (overrides `stream_url` from the config file)
    #[arg(short, long, env = "LIVESEEK_STREAM_URL")]
    url: Option<String>,

    /// Log level (overrides `logging.level` from the config file)
    #[arg(short, long, env = "LIVESEEK_LOG_LEVEL")]
    log_level: Option<String>,

    /// Simulated engine clock tick (milliseconds)
    #[arg(long, default_value = "1000")]
    tick_ms: u64,
}

const HELP: &str = "commands: load [url] | play | pause | seek <s> | scrub start|end | \
rate <x> | time | error network|media|other | stall | reset | quit";

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = PlayerConfig::load_or_default(args.config.as_deref())
        .context("Failed to load configuration")?;
    if let Some(level) = &args.log_level {
        config.logging.level = level.clone();
    }
    init_tracing(&config.logging.level, config.logging.file.as_deref())?;

    let base_url = match args.url.clone().or_else(|| config.stream_url.clone()) {
        Some(url) => url,
        None => bail!("No stream URL: pass --url or set stream_url in the config file"),
    };
    config.stream_url = Some(base_url.clone());

    info!("Starting liveseek player for {}", base_url);

    let factory = SimEngineFactory::new()
        .with_auto_events()
        .with_seekable(Some(TimeRange::new(0.0, 0.0)));

    let session = Arc::new(
        PlaybackSession::builder(config)
            .engine_factory(factory.clone())
            .url_provider(from_sync_fn(move || tokenized_url(&base_url)))
            .build()
            .context("Failed to build playback session")?,
    );
    info!("Session {} ready. {}", session.id(), HELP);

    // Outward events as JSON lines
    let mut events = session.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => match serde_json::to_string(&event) {
                    Ok(json) => println!("{}", json),
                    Err(e) => warn!("Failed to serialize {}: {}", event.name(), e),
                },
                Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                    warn!("Event printer lagged, {} events dropped", n);
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    // Simulated engine clock
    let tick = Duration::from_millis(args.tick_ms.max(1));
    let ticker = {
        let factory = factory.clone();
        let session = Arc::clone(&session);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(tick);
            loop {
                interval.tick().await;
                factory.tick(tick.as_secs_f64());
                if !session.paused() {
                    session.emit_time_update();
                }
            }
        })
    };

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read stdin")? else {
                    break;
                };
                match handle_command(&session, &factory, line.trim()).await {
                    Ok(true) => {}
                    Ok(false) => break,
                    Err(e) => warn!("{:#}", e),
                }
            }
            _ = &mut shutdown => break,
        }
    }

    ticker.abort();
    session.reset();
    info!("Player shutdown complete");
    Ok(())
}

/// Run one stdin command; returns false to quit
async fn handle_command(
    session: &PlaybackSession,
    factory: &SimEngineFactory,
    line: &str,
) -> Result<bool> {
    let mut parts = line.split_whitespace();
    let Some(command) = parts.next() else {
        return Ok(true);
    };
    let arg = parts.next();

    match command {
        "load" => session.load(arg)?,
        "play" => session.play().await?,
        "pause" => session.pause(),
        "seek" => session.set_current_time(parse_number(arg, "seek")?),
        "scrub" => match arg {
            Some("start") => session.begin_scrub(),
            Some("end") => session.end_scrub(),
            _ => bail!("usage: scrub start|end"),
        },
        "rate" => session.set_playback_rate(parse_number(arg, "rate")?),
        "time" => {
            let status = serde_json::json!({
                "current_time": session.current_time(),
                "duration": session.duration(),
                "live": session.is_live(),
                "rate": session.playback_rate(),
                "seeking": session.seeking(),
                "buffering": session.buffering(),
                "generation": session.generation(),
            });
            println!("{}", status);
        }
        "error" => {
            let kind = match arg {
                Some("network") => ErrorKind::Network,
                Some("media") => ErrorKind::Media,
                Some("other") => ErrorKind::Other,
                _ => bail!("usage: error network|media|other"),
            };
            factory.emit(EngineEvent::Error {
                kind,
                detail: "simulated engine failure".to_string(),
            });
        }
        "stall" => {
            factory.emit(EngineEvent::Waiting);
        }
        "reset" => session.reset(),
        "help" => println!("{}", HELP),
        "quit" | "exit" => return Ok(false),
        other => bail!("unknown command {:?} ({})", other, HELP),
    }
    std::io::stdout().flush().ok();
    Ok(true)
}

fn parse_number(arg: Option<&str>, command: &str) -> Result<f64> {
    let value = arg.with_context(|| format!("usage: {} <number>", command))?;
    value
        .parse::<f64>()
        .with_context(|| format!("{}: not a number: {}", command, value))
}

/// Base URL with a fresh access token, like a signed stream URL
fn tokenized_url(base: &str) -> liveseek_player::Result<String> {
    let mut url = Url::parse(base).map_err(|source| Error::InvalidUrl {
        url: base.to_string(),
        source,
    })?;
    url.query_pairs_mut()
        .append_pair("token", &Uuid::new_v4().simple().to_string());
    Ok(url.to_string())
}

fn init_tracing(level: &str, file: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "liveseek_player={level},liveseek_common={level}",
            level = level
        ))
    });
    let registry = tracing_subscriber::registry().with(filter);

    match file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_ansi(false)
                        .with_writer(std::sync::Mutex::new(file)),
                )
                .init();
        }
        None => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
    }
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
