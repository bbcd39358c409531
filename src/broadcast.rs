use crate::session::Session;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Spawn the free-running countdown for one tab
pub fn spawn_timer_ticker(session: Session) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(session.config.tick_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately; skip it so a fresh selection gets its full first second
        interval.tick().await;

        loop {
            interval.tick().await;
            session.tick().await;
        }
    })
}

/// Spawn the sync poller for one tab.
///
/// The durable slot is polled on a fixed interval. Tabs in the same process
/// also get nudged right after a write, which only shortens the delay.
pub fn spawn_sync_poller(session: Session) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(session.config.sync_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut nudges = session.nudges();
        let mut nudges_open = true;

        loop {
            tokio::select! {
                _ = interval.tick() => {}
                result = nudges.recv(), if nudges_open => {
                    match result {
                        Ok(()) | Err(RecvError::Lagged(_)) => {}
                        Err(RecvError::Closed) => {
                            tracing::warn!("{} tab lost the in-process sync bus, polling only", session.role);
                            nudges_open = false;
                        }
                    }
                }
            }

            session.poll_once().await;
        }
    })
}

/// Hide the notification of the given generation after `delay`, unless a newer one replaced it
pub fn spawn_notification_hider(session: Session, generation: u64, delay: Duration) {
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        if session.hide_notification_if(generation).await {
            tracing::debug!("{} tab auto-hid notification {}", session.role, generation);
        }
    });
}
