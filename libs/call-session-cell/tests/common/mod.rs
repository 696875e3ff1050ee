#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use call_session_cell::{
    CallEvent, CallSessionManager, CallStatus, LoopbackMediaGateway, LoopbackNetwork,
};
use shared_config::CallConfig;
use shared_models::Identity;
use shared_utils::test_utils::TestParticipant;

pub const WAIT: Duration = Duration::from_secs(3);

pub struct Party {
    pub identity: Identity,
    pub manager: CallSessionManager,
    pub media: LoopbackMediaGateway,
}

impl Party {
    pub async fn join(network: &LoopbackNetwork, participant: TestParticipant) -> Self {
        let config = participant.config();
        Self::join_with(network, &config).await
    }

    pub async fn join_with(network: &LoopbackNetwork, config: &CallConfig) -> Self {
        let media = LoopbackMediaGateway::new();
        let manager = CallSessionManager::start(config, Arc::new(media.clone()), network)
            .await
            .expect("manager should start");
        Self {
            identity: manager.local_identity().clone(),
            manager,
            media,
        }
    }

    pub async fn doctor(network: &LoopbackNetwork) -> Self {
        Self::join(network, TestParticipant::doctor()).await
    }

    pub async fn patient(network: &LoopbackNetwork) -> Self {
        Self::join(network, TestParticipant::patient()).await
    }

    pub async fn wait_for(&self, status: CallStatus) {
        wait_for_status(&self.manager, status).await;
    }

    /// Waits until the gateway has handed out `count` streams, including
    /// ones still resolving after their attempt was cancelled.
    pub async fn wait_acquired(&self, count: usize) {
        let deadline = tokio::time::Instant::now() + WAIT;
        while self.media.acquired_count() < count {
            assert!(
                tokio::time::Instant::now() < deadline,
                "{} acquired {} of {} stream(s)",
                self.identity,
                self.media.acquired_count(),
                count
            );
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    /// Waits until every acquired stream has been released.
    pub async fn wait_released(&self) {
        let deadline = tokio::time::Instant::now() + WAIT;
        while self.media.outstanding() > 0 {
            assert!(
                tokio::time::Instant::now() < deadline,
                "{} still holds {} stream(s)",
                self.identity,
                self.media.outstanding()
            );
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

pub async fn wait_for_status(manager: &CallSessionManager, status: CallStatus) {
    let mut state = manager.subscribe();
    tokio::time::timeout(WAIT, state.wait_for(|snapshot| snapshot.status == status))
        .await
        .unwrap_or_else(|_| panic!("timed out waiting for {}", status))
        .expect("session driver stopped");
}

/// Caller dials, callee answers, both end up connected.
pub async fn connect(caller: &Party, callee: &Party) {
    caller
        .manager
        .start_outgoing(callee.identity.clone())
        .await
        .expect("outgoing call should be placed");
    callee.wait_for(CallStatus::Incoming).await;
    callee.manager.answer().await.expect("answer should succeed");
    caller.wait_for(CallStatus::Connected).await;
    callee.wait_for(CallStatus::Connected).await;
}

/// Drains whatever events are currently buffered.
pub fn drain_events(events: &mut tokio::sync::broadcast::Receiver<CallEvent>) -> Vec<CallEvent> {
    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push(event);
    }
    seen
}

pub fn status_changes(events: &[CallEvent]) -> Vec<(CallStatus, CallStatus)> {
    events
        .iter()
        .filter_map(|event| match event {
            CallEvent::StatusChanged { from, to } => Some((*from, *to)),
            _ => None,
        })
        .collect()
}
