use anyhow::Result;
use colored::Colorize;
use std::path::PathBuf;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use worldclock::prelude::*;
use worldclock::{ENGINE_NAME, VERSION};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // 1. Load configuration. The only argument is an optional TOML path.
    let config_path = std::env::args_os().nth(1).map(PathBuf::from);
    let config = WorldClockConfig::load(config_path.as_deref())?;

    // 2. Initialize structured logging. RUST_LOG wins over the config file.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.as_str()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    info!("{} v{}", ENGINE_NAME.cyan(), VERSION);

    // 3. Create the engine; the stored state is loaded here.
    let engine = WorldClockEngine::from_config(config)?;

    // 4. Log every rendered frame, state change and lifecycle event.
    spawn_loggers(&engine);

    // 5. Attach a single overview view; this starts the ticker.
    engine.attach_view(ViewKind::Overview).await;

    // 6. Run the engine until Ctrl+C.
    engine.run().await?;

    Ok(())
}

fn spawn_loggers(engine: &WorldClockEngine) {
    spawn_listener(engine.subscribe_frames(), "Frame", |frame| {
        if let FrameContent::Overview(readings) = &frame.content {
            let line = readings
                .iter()
                .map(|r| format!("{} {}", r.name.bold(), r.display))
                .collect::<Vec<_>>()
                .join(" | ");
            info!("[FRAME #{}] {}", frame.tick_count, line);
        }
    });

    spawn_listener(engine.subscribe_state_events(), "State", |event| {
        let state = event.state();
        info!(
            "[STATE] {} cities, settings {:?}",
            state.cities.len(),
            state.settings
        );
    });

    spawn_listener(engine.subscribe_system_events(), "System", |event| {
        info!("[SYSTEM] => {:?}", event);
    });
}

/// Feeds every event on `rx` to `on_event` until the channel closes.
///
/// A lagging listener logs how much it missed and keeps going.
fn spawn_listener<T>(
    mut rx: broadcast::Receiver<T>,
    label: &'static str,
    mut on_event: impl FnMut(T) + Send + 'static,
) -> JoinHandle<()>
where
    T: Clone + Send + 'static,
{
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => on_event(event),
                Err(RecvError::Lagged(skipped)) => {
                    warn!("{} listener skipped {} events.", label, skipped);
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}
