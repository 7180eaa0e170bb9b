use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;

/// A cloneable cancellation flag shared between a task and its owners.
#[derive(Clone)]
pub struct Token {
    inner: Arc<Inner>,
}

struct Inner {
    cancelled: AtomicBool,
    notify: Notify,
}

impl Token {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                cancelled: AtomicBool::new(false),
                notify: Notify::new(),
            }),
        }
    }

    pub fn cancel(&self) {
        if !self.inner.cancelled.swap(true, Ordering::SeqCst) {
            self.inner.notify.notify_waiters();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    pub async fn cancelled(&self) {
        loop {
            if self.is_cancelled() {
                return;
            }
            let notified = self.inner.notify.notified();
            // The flag may have been set between the check and registering.
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }

    pub fn guard(&self) -> Guard {
        Guard {
            token: self.clone(),
        }
    }
}

impl Default for Token {
    fn default() -> Self {
        Self::new()
    }
}

/// Cancels its token when dropped.
pub struct Guard {
    token: Token,
}

impl Drop for Guard {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::Token;

    #[tokio::test]
    async fn cancel_wakes_waiters() {
        let token = Token::new();
        let waiter = {
            let token = token.clone();
            tokio::spawn(async move { token.cancelled().await })
        };
        token.cancel();
        waiter.await.unwrap();
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn guard_cancels_on_drop() {
        let token = Token::new();
        let guard = token.guard();
        assert!(!token.is_cancelled());
        drop(guard);
        assert!(token.is_cancelled());
        // Completes immediately once cancelled.
        token.cancelled().await;
    }
}
