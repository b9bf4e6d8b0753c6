//! Relay of locally-originated group changes onto the push channel.

use std::sync::Weak;

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use vigil_store::GroupChange;

use crate::channel::SyncChannel;

/// Forward each [`GroupChange`] from the store as a `groupCreated`,
/// `groupUpdated` or `groupDeleted` message.
///
/// Changes made while disconnected are dropped, the same as any other
/// outbound message. Exits on cancellation, when the store's feed closes,
/// or when the channel is gone.
pub(crate) async fn relay_group_changes(
    channel: Weak<SyncChannel>,
    mut changes: broadcast::Receiver<GroupChange>,
    cancel: CancellationToken,
) {
    loop {
        let received = tokio::select! {
            _ = cancel.cancelled() => return,
            received = changes.recv() => received,
        };

        match received {
            Ok(change) => {
                let Some(channel) = channel.upgrade() else {
                    return;
                };
                let payload = match change.payload() {
                    Ok(payload) => payload,
                    Err(e) => {
                        tracing::error!(group_id = %change.group_id(), error = %e, "Failed to encode group change");
                        continue;
                    }
                };
                if channel.send(change.message_type(), &payload) {
                    tracing::debug!(
                        group_id = %change.group_id(),
                        message_type = change.message_type(),
                        "Relayed group change"
                    );
                }
            }
            Err(broadcast::error::RecvError::Lagged(n)) => {
                tracing::warn!(skipped = n, "Group relay lagged, some changes were not sent");
            }
            Err(broadcast::error::RecvError::Closed) => {
                tracing::info!("Store change feed closed, group relay shutting down");
                break;
            }
        }
    }
}
