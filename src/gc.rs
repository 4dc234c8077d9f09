use crate::state::LobbyRegistry;
use std::time::Duration;

/// Spawn a background task that disposes lobbies nobody has been in for `max_idle`.
///
/// Lobbies are normally disposed when their last player leaves; this catches
/// lobbies that were created but never joined.
pub fn spawn_idle_lobby_reaper(registry: LobbyRegistry, max_idle: Duration) {
    let interval = (max_idle / 4).max(Duration::from_secs(5));

    tokio::spawn(async move {
        loop {
            tokio::time::sleep(interval).await;

            let removed = registry.sweep_idle(max_idle).await;
            if removed > 0 {
                tracing::debug!(
                    "Idle sweep removed {} lobbies, {} remain",
                    removed,
                    registry.len().await
                );
            }
        }
    });
}
