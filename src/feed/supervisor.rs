use std::sync::mpsc::{self, Receiver, Sender};
use std::time::Duration;

use tracing::{info, warn};

use super::article::Article;
use super::error::FeedError;
use super::source::{EventFeed, Subscription};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Backoff {
    base: Duration,
    max: Duration,
    current: Duration,
}

impl Backoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        let max = max.max(base);
        Self {
            base,
            max,
            current: base,
        }
    }

    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = self.current.saturating_mul(2).min(self.max);
        delay
    }

    pub fn reset(&mut self) {
        self.current = self.base;
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(Duration::from_secs(2), Duration::from_secs(30))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Origin {
    Live { generation: u64 },
    Synthetic { generation: u64 },
}

enum FeedMessage {
    Article(Origin, Article),
    Failed(Origin, FeedError),
}

#[derive(Debug, Default, PartialEq)]
pub struct FeedPoll {
    pub articles: Vec<Article>,
    /// At least one article in `articles` came from the live stream.
    pub live: bool,
    pub demo_mode: bool,
    pub demo_mode_changed: bool,
}

pub struct FeedSupervisor {
    live: Option<Box<dyn EventFeed>>,
    synthetic: Box<dyn EventFeed>,
    tx: Sender<FeedMessage>,
    rx: Receiver<FeedMessage>,
    live_subscription: Option<Subscription>,
    synthetic_subscription: Option<Subscription>,
    live_generation: u64,
    synthetic_generation: u64,
    backoff: Backoff,
    reconnect_at: Option<Duration>,
    demo_mode: bool,
    demo_mode_changed: bool,
    stopped: bool,
}

impl FeedSupervisor {
    /// `live` is `None` when demo mode is forced; the synthetic feed then runs
    /// for the whole session.
    pub fn new(
        live: Option<Box<dyn EventFeed>>,
        synthetic: Box<dyn EventFeed>,
        backoff: Backoff,
    ) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            live,
            synthetic,
            tx,
            rx,
            live_subscription: None,
            synthetic_subscription: None,
            live_generation: 0,
            synthetic_generation: 0,
            backoff,
            reconnect_at: None,
            demo_mode: false,
            demo_mode_changed: false,
            stopped: false,
        }
    }

    pub fn start(&mut self) {
        if self.stopped {
            return;
        }
        if self.live.is_some() {
            self.connect_live();
        } else {
            self.enter_demo_mode();
        }
    }

    pub fn demo_mode(&self) -> bool {
        self.demo_mode
    }

    pub fn reconnect_pending(&self) -> Option<Duration> {
        self.reconnect_at
    }

    fn connect_live(&mut self) {
        let Some(live) = self.live.as_ref() else {
            return;
        };

        self.live_generation += 1;
        let origin = Origin::Live {
            generation: self.live_generation,
        };
        let event_tx = self.tx.clone();
        let error_tx = self.tx.clone();
        info!(feed = live.name(), "connecting article stream");
        self.live_subscription = Some(live.subscribe(
            Box::new(move |article| {
                let _ = event_tx.send(FeedMessage::Article(origin, article));
            }),
            Box::new(move |error| {
                let _ = error_tx.send(FeedMessage::Failed(origin, error));
            }),
        ));
    }

    fn enter_demo_mode(&mut self) {
        if !self.demo_mode {
            info!("entering demo mode");
            self.demo_mode = true;
            self.demo_mode_changed = true;
        }
        if self.synthetic_subscription.is_some() {
            return;
        }

        self.synthetic_generation += 1;
        let origin = Origin::Synthetic {
            generation: self.synthetic_generation,
        };
        let event_tx = self.tx.clone();
        let error_tx = self.tx.clone();
        self.synthetic_subscription = Some(self.synthetic.subscribe(
            Box::new(move |article| {
                let _ = event_tx.send(FeedMessage::Article(origin, article));
            }),
            Box::new(move |error| {
                let _ = error_tx.send(FeedMessage::Failed(origin, error));
            }),
        ));
    }

    fn leave_demo_mode(&mut self) {
        if let Some(mut subscription) = self.synthetic_subscription.take() {
            subscription.unsubscribe();
        }
        if self.demo_mode {
            info!("live stream delivering, leaving demo mode");
            self.demo_mode = false;
            self.demo_mode_changed = true;
        }
        self.backoff.reset();
    }

    pub fn poll(&mut self, now: Duration) -> FeedPoll {
        if self.stopped {
            return FeedPoll::default();
        }

        if self.reconnect_at.is_some_and(|deadline| deadline <= now) {
            self.reconnect_at = None;
            self.connect_live();
        }

        let mut articles = Vec::new();
        let mut live = false;
        while let Ok(message) = self.rx.try_recv() {
            match message {
                FeedMessage::Article(Origin::Live { generation }, article) => {
                    if generation != self.live_generation {
                        continue;
                    }
                    self.leave_demo_mode();
                    live = true;
                    articles.push(article);
                }
                FeedMessage::Article(Origin::Synthetic { generation }, article) => {
                    if generation != self.synthetic_generation
                        || self.synthetic_subscription.is_none()
                    {
                        continue;
                    }
                    articles.push(article);
                }
                FeedMessage::Failed(Origin::Live { generation }, error) => {
                    if generation != self.live_generation || !error.is_transport() {
                        continue;
                    }
                    self.live_subscription = None;
                    let delay = self.backoff.next_delay();
                    warn!(%error, retry_in_ms = delay.as_millis() as u64, "article stream failed");
                    self.reconnect_at = Some(now + delay);
                    self.enter_demo_mode();
                }
                FeedMessage::Failed(Origin::Synthetic { .. }, error) => {
                    warn!(%error, "synthetic feed reported an error");
                }
            }
        }

        let demo_mode_changed = std::mem::take(&mut self.demo_mode_changed);
        FeedPoll {
            articles,
            live,
            demo_mode: self.demo_mode,
            demo_mode_changed,
        }
    }

    pub fn shutdown(&mut self) {
        self.stopped = true;
        self.reconnect_at = None;
        if let Some(mut subscription) = self.live_subscription.take() {
            subscription.unsubscribe();
        }
        if let Some(mut subscription) = self.synthetic_subscription.take() {
            subscription.unsubscribe();
        }
    }
}

impl Drop for FeedSupervisor {
    fn drop(&mut self) {
        self.shutdown();
    }
}
