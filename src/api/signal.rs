//! Change counter for views that show server data.

use tokio::sync::watch;

/// Monotonic counter bumped after every successful mutation.
///
/// Views subscribe and reload when the value moves. Clones share the counter.
#[derive(Debug, Clone)]
pub struct RefreshSignal {
    tx: watch::Sender<u64>,
}

impl Default for RefreshSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl RefreshSignal {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(0);
        Self { tx }
    }

    /// Increment the counter and return the new value.
    pub fn bump(&self) -> u64 {
        let mut value = 0;
        self.tx.send_modify(|current| {
            *current = current.wrapping_add(1);
            value = *current;
        });
        value
    }

    pub fn current(&self) -> u64 {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.tx.subscribe()
    }
}
