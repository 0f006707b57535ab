use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use super::article::Article;
use super::error::FeedError;

const CANCEL_POLL_SLICE: Duration = Duration::from_millis(50);

#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn sleep(&self, total: Duration) -> bool {
        let mut remaining = total;
        while !remaining.is_zero() {
            if self.is_cancelled() {
                return false;
            }
            let slice = remaining.min(CANCEL_POLL_SLICE);
            thread::sleep(slice);
            remaining = remaining.saturating_sub(slice);
        }
        !self.is_cancelled()
    }
}

pub type EventSink = Box<dyn FnMut(Article) + Send>;
pub type ErrorSink = Box<dyn FnMut(FeedError) + Send>;

/// Handle returned by [`EventFeed::subscribe`]. Dropping it unsubscribes.
pub struct Subscription {
    token: CancelToken,
    worker: Option<JoinHandle<()>>,
}

impl Subscription {
    pub fn new(token: CancelToken, worker: Option<JoinHandle<()>>) -> Self {
        Self { token, worker }
    }

    pub fn is_active(&self) -> bool {
        !self.token.is_cancelled()
    }

    pub fn unsubscribe(&mut self) {
        self.token.cancel();
        // Blocking stream reads may outlive the cancel; the worker checks the
        // token before delivering anything, so it is detached rather than joined.
        self.worker.take();
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

pub trait EventFeed: Send {
    fn name(&self) -> &'static str;

    fn subscribe(&self, on_event: EventSink, on_error: ErrorSink) -> Subscription;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_is_shared_and_idempotent() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        token.cancel();
        assert!(clone.is_cancelled());
        assert!(!clone.sleep(Duration::from_secs(5)));
    }

    #[test]
    fn unsubscribe_twice_is_harmless() {
        let token = CancelToken::new();
        let mut subscription = Subscription::new(token.clone(), None);
        assert!(subscription.is_active());
        subscription.unsubscribe();
        subscription.unsubscribe();
        assert!(!subscription.is_active());
        assert!(token.is_cancelled());
    }
}
