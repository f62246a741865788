use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;

use crate::error::TransportError;

/// Cancellation and deadline carried through a request.
///
/// Clones observe the same cancellation signal.
#[derive(Clone, Debug, Default)]
pub struct Context {
    cancel: Option<watch::Receiver<bool>>,
    deadline: Option<Instant>,
}

/// Cancels the [`Context`] it was created with, and every clone of it.
#[derive(Debug)]
pub struct CancelHandle {
    cancel_tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        log::debug!("Cancelling request context");
        // send_replace succeeds even once every receiver is gone
        self.cancel_tx.send_replace(true);
    }
}

impl Context {
    /// A context that is never cancelled and has no deadline.
    pub fn background() -> Self {
        Self::default()
    }

    pub fn with_cancel() -> (Self, CancelHandle) {
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let ctx = Self {
            cancel: Some(cancel_rx),
            deadline: None,
        };
        (ctx, CancelHandle { cancel_tx })
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Keeps the earlier of the existing deadline and `deadline`.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(current) => current.min(deadline),
            None => deadline,
        });
        self
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// The reason this context is done, if it already is.
    pub fn err(&self) -> Option<TransportError> {
        if self.cancel.as_ref().is_some_and(|rx| *rx.borrow()) {
            return Some(TransportError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(TransportError::DeadlineExceeded),
            _ => None,
        }
    }

    /// Resolves once the context is cancelled or its deadline passes.
    /// Never resolves for a background context.
    pub async fn done(&self) -> TransportError {
        let cancelled = async {
            match self.cancel.clone() {
                Some(mut rx) => {
                    let closed = rx.wait_for(|cancelled| *cancelled).await.is_err();
                    // a dropped handle can no longer cancel
                    if closed {
                        std::future::pending::<()>().await;
                    }
                }
                None => std::future::pending::<()>().await,
            }
        };

        match self.deadline {
            Some(deadline) => tokio::select! {
                biased;
                _ = cancelled => TransportError::Cancelled,
                _ = tokio::time::sleep_until(deadline) => TransportError::DeadlineExceeded,
            },
            None => {
                cancelled.await;
                TransportError::Cancelled
            }
        }
    }
}
