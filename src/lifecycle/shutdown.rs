//! Broadcast stop signal shared by the server and its background tasks.
//!
//! `main` owns one `Shutdown`; the server's graceful-shutdown future holds a
//! receiver, and `signals::wait_for_signal` fires it. Progress tick tasks
//! are not subscribers: they end with their response bodies.

use tokio::sync::broadcast;

pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        // One slot: the signal carries no payload and fires at most once.
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    /// A receiver whose `recv()` completes once `trigger` runs.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Ask every subscriber to stop. Returns how many were listening.
    pub fn trigger(&self) -> usize {
        let listening = self.tx.send(()).unwrap_or(0);
        tracing::info!(listeners = listening, "Shutdown triggered");
        listening
    }

    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
