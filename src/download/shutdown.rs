//! Run-wide shutdown signal.

use tokio::sync::watch;

/// Create a linked trigger/listener pair.
pub fn shutdown_channel() -> (ShutdownTrigger, Shutdown) {
    let (sender, receiver) = watch::channel(false);
    (ShutdownTrigger { sender }, Shutdown { receiver })
}

/// Trips the shutdown signal.
pub struct ShutdownTrigger {
    sender: watch::Sender<bool>,
}

impl ShutdownTrigger {
    pub fn trigger(&self) {
        self.sender.send_replace(true);
    }
}

/// Cloneable listener for the shutdown signal.
#[derive(Clone)]
pub struct Shutdown {
    receiver: watch::Receiver<bool>,
}

impl Shutdown {
    pub fn is_triggered(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Resolve once shutdown is triggered. Never resolves if the trigger is
    /// dropped without firing.
    pub async fn wait(mut self) {
        let fired = self.receiver.wait_for(|stop| *stop).await.is_ok();
        if !fired {
            std::future::pending::<()>().await;
        }
    }
}
