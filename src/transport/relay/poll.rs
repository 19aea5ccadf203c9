use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{RelayApi, RelayStatus};
use crate::transport::ConnectionState;
use crate::transport::state::LinkState;

/// What one status observation means for the local link.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub(crate) enum PollStep {
    /// Nothing changed.
    Steady,
    /// The relay is retrying the device link; stay optimistic.
    EnterReconnecting,
    /// The relay restored the link.
    Reconnected,
    /// The link is gone for good; polling ends.
    Lost,
}

/// Maps the local state and one status observation (`None` when the call failed)
/// to the transition the poller applies.
pub(crate) fn next_step(local: ConnectionState, observed: Option<&RelayStatus>) -> PollStep {
    let Some(status) = observed else {
        return PollStep::Lost;
    };

    match (status.connected, status.reconnecting, local) {
        (true, _, ConnectionState::Reconnecting | ConnectionState::Disconnected) => {
            PollStep::Reconnected
        }
        (true, _, _) | (false, true, ConnectionState::Reconnecting) => PollStep::Steady,
        (false, true, _) => PollStep::EnterReconnecting,
        (false, false, _) => PollStep::Lost,
    }
}

/// Owned handle to the status poller; dropping it stops the task.
#[derive(Debug)]
pub(crate) struct PollHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl PollHandle {
    pub(crate) fn spawn(api: Arc<dyn RelayApi>, link: Arc<LinkState>, interval: Duration) -> Self {
        let cancel = CancellationToken::new();
        let task = tokio::spawn(run(api, link, interval, cancel.clone()));
        Self { cancel, task }
    }

    /// Cancels the poller and waits for it to exit.
    pub(crate) async fn stop(mut self) {
        self.cancel.cancel();
        if let Err(error) = (&mut self.task).await {
            if !error.is_cancelled() {
                warn!(?error, "status poller ended abnormally");
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn run(
    api: Arc<dyn RelayApi>,
    link: Arc<LinkState>,
    period: Duration,
    cancel: CancellationToken,
) {
    let period = period.max(Duration::from_millis(1));
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let observed = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            observed = api.status() => observed,
        };
        // An explicit disconnect may land while the status call resolves.
        if cancel.is_cancelled() {
            break;
        }
        let observed = match observed {
            Ok(status) => Some(status),
            Err(error) => {
                warn!(?error, "relay status request failed");
                None
            }
        };

        match next_step(link.get(), observed.as_ref()) {
            PollStep::Steady => {}
            PollStep::EnterReconnecting => {
                info!("relay is re-establishing the device link");
                link.set(ConnectionState::Reconnecting);
            }
            PollStep::Reconnected => {
                info!("relay restored the device link");
                link.set(ConnectionState::Connected);
                link.reconnect_observer.notify("reconnect");
            }
            PollStep::Lost => {
                warn!("relay reports the device link as lost");
                link.set_device_name(None);
                link.set(ConnectionState::Disconnected);
                link.disconnect_observer.notify("disconnect");
                break;
            }
        }
    }
    debug!("status poller stopped");
}
