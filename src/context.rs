use std::sync::Arc;

use tokio::sync::broadcast;

use crate::relay::RelayServer;

/// RelayContext carries the shared relay handle and the shutdown signal.
#[derive(Clone)]
pub struct RelayContext {
    relay: Arc<RelayServer>,
    /// Broadcasts a shutdown signal to all active tasks.
    ///
    /// When a background task or the HTTP server is spawned, it is handed a
    /// broadcast receiver. When a graceful shutdown is initiated, a `()`
    /// value is sent via the `broadcast::Sender`; each task receives it,
    /// reaches a safe terminal state, and completes.
    notify_shutdown: broadcast::Sender<()>,
}

impl RelayContext {
    /// Creates a new RelayContext around a relay server.
    pub fn new(relay: Arc<RelayServer>) -> Self {
        let (notify_shutdown, _) = broadcast::channel(2);
        Self {
            relay,
            notify_shutdown,
        }
    }

    /// Returns a handle to the relay server.
    pub fn relay(&self) -> Arc<RelayServer> {
        self.relay.clone()
    }

    /// Returns a broadcast receiver handle for the shutdown signal.
    pub fn shutdown_signal(&self) -> Shutdown {
        Shutdown::new(self.notify_shutdown.subscribe())
    }

    /// Sends a shutdown signal to all subscribed tasks.
    pub fn shutdown(&self) {
        let _ = self.notify_shutdown.send(());
    }
}

/// Listens for the shutdown signal.
///
/// Shutdown is signalled using a `broadcast::Receiver`. Only a single value
/// is ever sent; once it has been sent, every task should shut down.
///
/// The `Shutdown` struct listens for the signal and tracks that it has been
/// received, so callers may await it more than once.
#[derive(Debug)]
pub struct Shutdown {
    /// `true` if the shutdown signal has been received.
    shutdown: bool,
    /// The receive half of the channel used to listen for shutdown.
    notify: broadcast::Receiver<()>,
}

impl Shutdown {
    /// Create a new `Shutdown` backed by the given `broadcast::Receiver`.
    pub fn new(notify: broadcast::Receiver<()>) -> Shutdown {
        Shutdown {
            shutdown: false,
            notify,
        }
    }

    /// Receive the shutdown notice, waiting if necessary.
    pub async fn recv(&mut self) {
        // If the shutdown signal has already been received, then return
        // immediately.
        if self.shutdown {
            return;
        }

        // Cannot receive a "lag error" as only one value is ever sent.
        let _ = self.notify.recv().await;

        // Remember that the signal has been received.
        self.shutdown = true;
    }
}
