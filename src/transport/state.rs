use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::watch;
use tracing::{debug, warn};

use super::{ConnectionState, Observer};

type SharedObserver = Arc<dyn Fn() + Send + Sync>;

/// Holds at most one observer; registering replaces the previous one.
#[derive(Default)]
pub(crate) struct ObserverSlot {
    observer: Mutex<Option<SharedObserver>>,
}

impl fmt::Debug for ObserverSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registered = self
            .observer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some();
        f.debug_struct("ObserverSlot")
            .field("registered", &registered)
            .finish()
    }
}

impl ObserverSlot {
    pub(crate) fn replace(&self, observer: Observer) {
        *self.observer.lock().unwrap_or_else(PoisonError::into_inner) = Some(Arc::from(observer));
    }

    /// Runs the observer outside the lock, swallowing panics.
    pub(crate) fn notify(&self, event: &'static str) {
        let observer = self
            .observer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let Some(observer) = observer else {
            debug!(event, "no observer registered");
            return;
        };
        if catch_unwind(AssertUnwindSafe(|| observer())).is_err() {
            warn!(event, "connectivity observer panicked");
        }
    }
}

/// State shared between a transport and its background tasks.
#[derive(Debug)]
pub(crate) struct LinkState {
    state: watch::Sender<ConnectionState>,
    device_name: Mutex<Option<String>>,
    pub(crate) disconnect_observer: ObserverSlot,
    pub(crate) reconnect_observer: ObserverSlot,
}

impl LinkState {
    pub(crate) fn new() -> Arc<Self> {
        let (state, _receiver) = watch::channel(ConnectionState::Disconnected);
        Arc::new(Self {
            state,
            device_name: Mutex::new(None),
            disconnect_observer: ObserverSlot::default(),
            reconnect_observer: ObserverSlot::default(),
        })
    }

    pub(crate) fn get(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Stores `next`, returning the previous state.
    pub(crate) fn set(&self, next: ConnectionState) -> ConnectionState {
        let previous = self.state.send_replace(next);
        if previous != next {
            debug!(%previous, %next, "link state changed");
        }
        previous
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    pub(crate) fn device_name(&self) -> Option<String> {
        self.device_name
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn set_device_name(&self, name: Option<String>) {
        *self
            .device_name
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = name;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn last_registered_observer_wins() {
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));
        let slot = ObserverSlot::default();

        let counter = Arc::clone(&first);
        slot.replace(Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        let counter = Arc::clone(&second);
        slot.replace(Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        slot.notify("disconnect");

        assert_eq!(0, first.load(Ordering::SeqCst));
        assert_eq!(1, second.load(Ordering::SeqCst));
    }

    #[test]
    fn panicking_observer_does_not_escape() {
        let slot = ObserverSlot::default();
        slot.replace(Box::new(|| panic!("observer failure")));

        slot.notify("reconnect");
    }

    #[test]
    fn set_reports_previous_state_and_reaches_subscribers() {
        let link = LinkState::new();
        let receiver = link.subscribe();

        let previous = link.set(ConnectionState::Connecting);

        assert_eq!(ConnectionState::Disconnected, previous);
        assert_eq!(ConnectionState::Connecting, *receiver.borrow());
    }
}
