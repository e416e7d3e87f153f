use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::services::registry::BookingRegistry;

/// Saves every dirty booking that is not busy. A booking whose lock is held by an in-flight
/// operation is skipped and picked up on the next pass. Returns how many were written.
pub async fn autosave_pass(registry: &BookingRegistry) -> usize {
    let mut saved = 0;

    for shared in registry.all() {
        let Ok(mut controller) = shared.try_lock() else {
            tracing::debug!("booking busy, deferring autosave");
            continue;
        };

        match controller.save_if_dirty().await {
            Ok(true) => saved += 1,
            Ok(false) => {}
            Err(e) => {
                tracing::error!(
                    booking_id = %controller.booking().id,
                    error = %e,
                    "autosave failed, will retry next interval"
                );
            }
        }
    }

    if saved > 0 {
        tracing::debug!(saved, "autosave pass complete");
    }
    saved
}

pub fn spawn_autosave(registry: Arc<BookingRegistry>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            autosave_pass(&registry).await;
        }
    })
}
