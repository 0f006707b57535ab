mod article;
mod error;
mod metrics;
mod poller;
mod source;
mod sse;
mod supervisor;
mod synthetic;

pub use article::{Article, SentimentLabel, SourceType, parse_timestamp};
pub use error::FeedError;
pub use metrics::{CategoryCount, EntityItem, KpiMetrics, MetricsUpdate, ToneData, demo_metrics};
pub use poller::{HttpMetricsApi, MetricsApi, MetricsPoller};
pub use source::{CancelToken, EventFeed, Subscription};
pub use sse::LiveStream;
pub use supervisor::{Backoff, FeedPoll, FeedSupervisor};
pub use synthetic::{SyntheticFeed, SyntheticTiming};

#[cfg(test)]
pub(crate) use article::test_article;
#[cfg(test)]
pub(crate) use supervisor::tests::ScriptedFeed;
