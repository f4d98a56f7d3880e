use crate::bot::{Handlers, Telegram};
use crate::error::Res;
use std::time::Duration;
use tracing::{error, info, warn};

const POLL_TIMEOUT: Duration = Duration::from_secs(30);
const RETRY_DELAY: Duration = Duration::from_secs(5);

/// Long-polls Telegram and hands every update to `handlers` until Ctrl-C is pressed.
///
/// An update whose expense could not be recorded is not retried. The user is told instead, so
/// that they can send it again.
pub(crate) async fn poll(telegram: &Telegram, handlers: &mut Handlers) -> Res<()> {
    let mut offset = None;
    info!("Polling Telegram for updates, press Ctrl-C to stop");
    loop {
        let updates = tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Stopping");
                return Ok(());
            }
            updates = telegram.get_updates(offset, POLL_TIMEOUT) => updates,
        };
        let updates = match updates {
            Ok(updates) => updates,
            Err(e) => {
                warn!("Failed to get updates, retrying in {RETRY_DELAY:?}: {e:#}");
                tokio::time::sleep(RETRY_DELAY).await;
                continue;
            }
        };
        for update in updates {
            offset = Some(update.update_id + 1);
            if let Err(e) = handlers.process_update(&update).await {
                error!(update_id = update.update_id, "Failed to process update: {e}");
                handlers.notify_failure(&update).await;
            }
        }
    }
}
