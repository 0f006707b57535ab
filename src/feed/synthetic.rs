use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::Duration;

use chrono::Utc;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use super::article::{Article, SentimentLabel, SourceType};
use super::source::{CancelToken, ErrorSink, EventFeed, EventSink, Subscription};

const TITLES: &[&str] = &[
    "IBM Announces New Quantum Computing Breakthrough",
    "watsonx.ai Enhances RAG Capabilities for Enterprise",
    "IBM Cloud Security Report: Global Threat Landscape 2026",
    "New IBM Mainframe z17 Targets AI Workloads",
    "Watson NLP Integration Expands to 12 New Languages",
    "IBM and Samsung Partner on Next-Gen Semiconductor Design",
    "Global AI Regulation: IBM Calls for Open Standards",
    "IBM Research Publishes Foundation Model Benchmark",
    "watsonx.governance: Explainable AI at Enterprise Scale",
    "IBM Consulting Deploys AI Agents for Supply Chain Optimization",
    "Conflict in Eastern Europe Disrupts Tech Supply Chains",
    "IBM Open-Sources New Granite Embedding Models",
    "Federal Reserve Warns of AI-Driven Market Volatility",
    "IBM Japan Announces Partnership with METI for AI Policy",
    "Climate Tech: IBM Applies AI to Carbon Tracking",
];

const TOPICS: &[&str] = &[
    "Technology",
    "Finance",
    "Politics",
    "Conflict",
    "Environment",
    "Health",
    "Other",
];

const DOMAINS: &[&str] = &[
    "ibm.com",
    "gdelt.org",
    "reuters.com",
    "bloomberg.com",
    "nikkei.com",
];

const SOURCE_TYPES: &[SourceType] = &[SourceType::Gdelt, SourceType::IbmCrawl, SourceType::Box];

const FIRST_SYNTHETIC_ID: u64 = 1001;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SyntheticTiming {
    pub first_delay: Duration,
    pub min_interval: Duration,
    pub max_interval: Duration,
}

impl Default for SyntheticTiming {
    fn default() -> Self {
        Self {
            first_delay: Duration::from_millis(1500),
            min_interval: Duration::from_secs(3),
            max_interval: Duration::from_secs(9),
        }
    }
}

impl SyntheticTiming {
    pub fn next_interval<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        let low = self.min_interval.min(self.max_interval);
        let high = self.min_interval.max(self.max_interval);
        if low == high {
            return low;
        }
        rng.gen_range(low..high)
    }
}

fn pick<'a, T, R: Rng + ?Sized>(rng: &mut R, items: &'a [T]) -> &'a T {
    // Tables are non-empty constants.
    &items[rng.gen_range(0..items.len())]
}

pub fn generate_article<R: Rng + ?Sized>(rng: &mut R, sequence: u64) -> Article {
    let sentiment_label = *[
        SentimentLabel::Positive,
        SentimentLabel::Neutral,
        SentimentLabel::Negative,
    ]
    .choose(rng)
    .unwrap_or(&SentimentLabel::Neutral);

    let score: f32 = match sentiment_label {
        SentimentLabel::Positive => rng.gen_range(0.3..1.0),
        SentimentLabel::Negative => rng.gen_range(-1.0..-0.3),
        SentimentLabel::Neutral => rng.gen_range(-0.2..0.2),
    };

    Article {
        id: format!("mock-{sequence}"),
        title: (*pick(rng, TITLES)).to_owned(),
        domain: (*pick(rng, DOMAINS)).to_owned(),
        topic: (*pick(rng, TOPICS)).to_owned(),
        sentiment_label,
        sentiment_score: (score * 100.0).round() / 100.0,
        source_type: *pick(rng, SOURCE_TYPES),
        published: Utc::now(),
    }
}

pub struct SyntheticFeed {
    timing: SyntheticTiming,
    seed: Option<u64>,
    sequence: Arc<AtomicU64>,
}

impl SyntheticFeed {
    pub fn new(timing: SyntheticTiming, seed: Option<u64>) -> Self {
        Self {
            timing,
            seed,
            sequence: Arc::new(AtomicU64::new(FIRST_SYNTHETIC_ID)),
        }
    }
}

impl EventFeed for SyntheticFeed {
    fn name(&self) -> &'static str {
        "synthetic"
    }

    fn subscribe(&self, mut on_event: EventSink, _on_error: ErrorSink) -> Subscription {
        let token = CancelToken::new();
        let worker_token = token.clone();
        let timing = self.timing;
        let sequence = Arc::clone(&self.sequence);
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed ^ sequence.load(Ordering::Relaxed)),
            None => StdRng::from_entropy(),
        };

        let worker = thread::spawn(move || {
            if !worker_token.sleep(timing.first_delay) {
                return;
            }
            loop {
                let id = sequence.fetch_add(1, Ordering::Relaxed);
                on_event(generate_article(&mut rng, id));
                let wait = timing.next_interval(&mut rng);
                if !worker_token.sleep(wait) {
                    return;
                }
            }
        });

        Subscription::new(token, Some(worker))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;

    use super::*;

    #[test]
    fn generated_articles_are_valid_and_consistent() {
        let mut rng = StdRng::seed_from_u64(7);
        for sequence in 0..200 {
            let article = generate_article(&mut rng, sequence);
            assert!(article.validate().is_ok());
            assert_eq!(article.id, format!("mock-{sequence}"));
            match article.sentiment_label {
                SentimentLabel::Positive => assert!(article.sentiment_score >= 0.3),
                SentimentLabel::Negative => assert!(article.sentiment_score <= -0.3),
                SentimentLabel::Neutral => assert!(article.sentiment_score.abs() <= 0.2),
            }
        }
    }

    #[test]
    fn intervals_stay_inside_the_configured_range() {
        let timing = SyntheticTiming::default();
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..500 {
            let interval = timing.next_interval(&mut rng);
            assert!(interval >= Duration::from_secs(3));
            assert!(interval < Duration::from_secs(9));
        }
    }

    #[test]
    fn same_seed_gives_same_sequence() {
        let mut first = StdRng::seed_from_u64(99);
        let mut second = StdRng::seed_from_u64(99);
        for sequence in 0..20 {
            let a = generate_article(&mut first, sequence);
            let b = generate_article(&mut second, sequence);
            assert_eq!((a.title, a.topic, a.sentiment_score), (b.title, b.topic, b.sentiment_score));
        }
    }

    #[test]
    fn worker_emits_then_stops_after_unsubscribe() {
        let feed = SyntheticFeed::new(
            SyntheticTiming {
                first_delay: Duration::ZERO,
                min_interval: Duration::from_millis(5),
                max_interval: Duration::from_millis(10),
            },
            Some(3),
        );
        let (tx, rx) = mpsc::channel();
        let mut subscription = feed.subscribe(
            Box::new(move |article| {
                let _ = tx.send(article);
            }),
            Box::new(|_| {}),
        );

        let first = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(first.id, "mock-1001");
        subscription.unsubscribe();
        assert!(!subscription.is_active());
    }
}
