//! Scene server entry point.
//!
//! Loads a scene from a content directory, runs it under the runtime until
//! Ctrl-C, and logs the session traffic the scene produces.
mod config;
mod logging;

use anyhow::{Context, Result};
use runtime::{Event, LifecycleEvent, Runtime, RuntimeConfig, SessionEvent, Topic};
use sim_content::ContentFactory;
use tokio::sync::broadcast::{self, error::RecvError};

use config::ServerConfig;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let config = ServerConfig::from_env();
    let _guard = logging::setup_logging(config.log_dir.as_deref(), config.session_id.as_deref())?;

    let factory = ContentFactory::new(&config.content_dir);
    let runtime_config = RuntimeConfig {
        sim: factory.load_config()?,
        tick_interval: config.tick_interval,
        ..RuntimeConfig::default()
    };

    let runtime = Runtime::builder()
        .config(runtime_config)
        .content(factory, config.scene.clone())
        .build()
        .await
        .with_context(|| format!("Failed to start scene '{}'", config.scene))?;

    let handle = runtime.handle();
    let sessions = handle.subscribe(Topic::Session);
    let lifecycle = handle.subscribe(Topic::Lifecycle);
    let monitor = tokio::spawn(monitor(sessions, lifecycle));

    tracing::info!(
        scene = %config.scene,
        content = %config.content_dir.display(),
        tick_ms = config.tick_interval.as_millis() as u64,
        "Server running; press Ctrl-C to stop"
    );

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;
    tracing::info!("Shutdown requested");

    let stopped_at = runtime.shutdown().await?;
    monitor.abort();
    tracing::info!(%stopped_at, "Server stopped");
    Ok(())
}

/// Logs session and lifecycle events until the channels close.
async fn monitor(
    mut sessions: broadcast::Receiver<Event>,
    mut lifecycle: broadcast::Receiver<Event>,
) {
    loop {
        let received = tokio::select! {
            event = sessions.recv() => event,
            event = lifecycle.recv() => event,
        };
        match received {
            Ok(event) => log_event(&event),
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(target: "server", skipped, "Event monitor lagged");
            }
            Err(RecvError::Closed) => break,
        }
    }
}

fn log_event(event: &Event) {
    match event {
        Event::Session(SessionEvent::Entered { session, actor }) => {
            tracing::info!(target: "server", %session, %actor, "Session entered");
        }
        Event::Session(SessionEvent::Left { session, actor }) => {
            tracing::info!(target: "server", %session, %actor, "Session left");
        }
        Event::Session(SessionEvent::MoveBody {
            session,
            scene,
            portal,
        }) => {
            tracing::info!(target: "server", %session, %scene, ?portal, "Body move requested");
        }
        Event::Session(SessionEvent::ClientAction { session, action }) => {
            tracing::debug!(target: "server", %session, action = %action.name, "Client action");
        }
        Event::Lifecycle(LifecycleEvent::Reloaded { scene, mapped, .. }) => {
            tracing::info!(target: "server", %scene, mapped, "Scene reloaded");
        }
        Event::Lifecycle(LifecycleEvent::Stopped { scene, timestamp }) => {
            tracing::info!(target: "server", %scene, %timestamp, "Scene stopped");
        }
        Event::Lifecycle(LifecycleEvent::Started { .. }) | Event::Replication(_) => {}
    }
}
