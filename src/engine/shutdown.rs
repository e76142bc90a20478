//! Run cancellation

use tokio::sync::watch;

/// Observed by running streams; once triggered, no new page is requested
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
    parent: Option<Box<ShutdownSignal>>,
}

/// Triggers every `ShutdownSignal` cloned from its channel
#[derive(Debug)]
pub struct ShutdownTrigger {
    tx: watch::Sender<bool>,
}

impl ShutdownSignal {
    /// Create a connected trigger and signal
    pub fn channel() -> (ShutdownTrigger, Self) {
        let (tx, rx) = watch::channel(false);
        (ShutdownTrigger { tx }, Self { rx, parent: None })
    }

    /// A signal that is never triggered
    pub fn never() -> Self {
        let (_tx, rx) = watch::channel(false);
        Self { rx, parent: None }
    }

    /// A signal that fires when either `self` or the returned trigger fires
    pub fn linked(&self) -> (ShutdownTrigger, Self) {
        let (trigger, mut child) = Self::channel();
        child.parent = Some(Box::new(self.clone()));
        (trigger, child)
    }

    /// Whether shutdown was requested
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow() || self.parent.as_ref().is_some_and(|p| p.is_cancelled())
    }
}

impl ShutdownTrigger {
    /// Request shutdown
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    /// Whether shutdown was already requested
    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }
}
