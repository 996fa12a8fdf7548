//! Shutdown coordination.
//!
//! A single [`Shutdown`] owns the stop flag. The server and tests hold
//! [`ShutdownSignal`]s; a signal taken after the trigger still fires, and
//! dropping the owner counts as a trigger.

use tokio::sync::watch;

/// Owner of the service-wide stop flag.
#[derive(Debug)]
pub struct Shutdown {
    stopped: watch::Sender<bool>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (stopped, _) = watch::channel(false);
        Self { stopped }
    }

    /// A handle that resolves once shutdown is requested.
    pub fn signal(&self) -> ShutdownSignal {
        ShutdownSignal {
            stopped: self.stopped.subscribe(),
        }
    }

    /// Request shutdown. Idempotent.
    pub fn trigger(&self) {
        self.stopped.send_replace(true);
    }

    pub fn is_triggered(&self) -> bool {
        *self.stopped.borrow()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Waits for a [`Shutdown`] to be triggered or dropped.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    stopped: watch::Receiver<bool>,
}

impl ShutdownSignal {
    pub async fn wait(mut self) {
        // Err means the owner is gone, which is a stop as well.
        let _ = self.stopped.wait_for(|stopped| *stopped).await;
    }
}
