//! Cancellation of a running checklist.

use tokio::sync::watch;

/// Triggers an [`Interrupt`].
#[derive(Debug, Clone)]
pub struct InterruptHandle {
    tx: watch::Sender<bool>,
}

impl InterruptHandle {
    /// Marks the run as interrupted.
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }
}

/// A cloneable signal that the current run should stop.
#[derive(Debug, Clone)]
pub struct Interrupt {
    rx: watch::Receiver<bool>,
}

impl Interrupt {
    /// Creates a linked handle and interrupt.
    #[must_use]
    pub fn new() -> (InterruptHandle, Self) {
        let (tx, rx) = watch::channel(false);
        (InterruptHandle { tx }, Self { rx })
    }

    /// An interrupt that never fires.
    #[must_use]
    pub fn never() -> Self {
        let (_, interrupt) = Self::new();
        interrupt
    }

    /// An interrupt triggered by Ctrl-C. Must be called inside a tokio runtime.
    #[must_use]
    pub fn on_ctrl_c() -> Self {
        let (handle, interrupt) = Self::new();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupt received, stopping checks");
                handle.trigger();
            }
        });
        interrupt
    }

    /// Returns true once the interrupt has fired.
    #[must_use]
    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves when the interrupt fires; pends forever if it never can.
    pub async fn triggered(&self) {
        let mut rx = self.rx.clone();
        if rx.wait_for(|fired| *fired).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

impl Default for Interrupt {
    fn default() -> Self {
        Self::never()
    }
}
