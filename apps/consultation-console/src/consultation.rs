use anyhow::{Context, Result};
use futures::future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use call_session_cell::{CallEvent, CallSessionManager, CallStatus, LoopbackMediaGateway, LoopbackNetwork};
use shared_config::CallConfig;
use shared_models::Identity;

const DEFAULT_REMOTE: &str = "patient-console";
const TALK_TIME: Duration = Duration::from_secs(1);

/// Scripted consultation between the configured identity and an in-process
/// remote party: dial, answer, mute, hide video, hang up.
pub async fn run(config: CallConfig) -> Result<()> {
    let network = LoopbackNetwork::new();

    let remote_id = config.auto_dial.clone().unwrap_or_else(|| DEFAULT_REMOTE.to_string());
    let remote_config = CallConfig {
        auto_dial: None,
        ..config.for_identity(remote_id.clone())
    };

    // The remote registers first so an auto-dial has someone to reach
    let remote = start_party(&remote_config, &network).await?;
    let local = start_party(&config, &network).await?;

    let loggers = vec![
        spawn_event_logger(remote.local_identity().clone(), remote.events()),
        spawn_event_logger(local.local_identity().clone(), local.events()),
    ];

    if config.auto_dial.is_none() {
        let target = Identity::new(remote_id).context("invalid remote identity")?;
        local.start_outgoing(target).await?;
    }

    let ring = config.ring_timeout();
    wait_for(&remote, CallStatus::Incoming, ring).await?;
    remote.answer().await?;
    wait_for(&local, CallStatus::Connected, ring).await?;
    wait_for(&remote, CallStatus::Connected, ring).await?;

    match local.toggle_mute().await? {
        Some(muted) => info!("Local microphone muted: {}", muted),
        None => warn!("No local audio track to mute"),
    }
    match local.toggle_video().await? {
        Some(hidden) => info!("Local camera hidden: {}", hidden),
        None => warn!("No local video track to hide"),
    }

    let snapshot = local.snapshot();
    info!(
        status = %snapshot.status,
        remote = ?snapshot.remote_identity,
        muted = snapshot.muted,
        video_hidden = snapshot.video_hidden,
        "Consultation in progress"
    );

    tokio::time::sleep(TALK_TIME).await;
    local.end_call().await?;
    wait_for(&remote, CallStatus::Idle, ring).await?;

    future::try_join(local.shutdown(), remote.shutdown()).await?;
    drop(local);
    drop(remote);

    for result in future::join_all(loggers).await {
        if let Err(err) = result {
            warn!("Event logger stopped abnormally: {}", err);
        }
    }

    info!("Consultation console finished");
    Ok(())
}

async fn start_party(config: &CallConfig, network: &LoopbackNetwork) -> Result<CallSessionManager> {
    let media = Arc::new(LoopbackMediaGateway::new());
    CallSessionManager::start(config, media, network)
        .await
        .with_context(|| format!("failed to start session for {}", config.local_identity))
}

async fn wait_for(manager: &CallSessionManager, status: CallStatus, limit: Duration) -> Result<()> {
    let mut state = manager.subscribe();
    tokio::time::timeout(limit, state.wait_for(|snapshot| snapshot.status == status))
        .await
        .with_context(|| format!("{} did not reach {} in time", manager.local_identity(), status))?
        .context("call session stopped")?;
    Ok(())
}

fn spawn_event_logger(identity: Identity, mut events: broadcast::Receiver<CallEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(CallEvent::Ended(summary)) => match serde_json::to_string(&summary) {
                    Ok(json) => info!(%identity, "Call summary: {}", json),
                    Err(err) => warn!(%identity, "Could not serialize call summary: {}", err),
                },
                Ok(event) => info!(%identity, "{:?}", event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(%identity, "Event logger lagged, skipped {} events", skipped)
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}
