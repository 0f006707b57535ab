use std::collections::VecDeque;
use std::time::Duration;

use tracing::{debug, warn};

use crate::feed::{Article, CancelToken};

use super::graph::{Cluster, NodeRequest};

pub(in crate::app) const STAGE_COUNT: usize = 7;
const TERMINAL_STAGE: usize = STAGE_COUNT - 1;
const COOLDOWN: Duration = Duration::from_millis(1_500);

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(in crate::app) enum StageStatus {
    #[default]
    Queue,
    Active,
    Done,
    Alert,
}

impl StageStatus {
    pub(in crate::app) fn label(self) -> &'static str {
        match self {
            Self::Queue => "QUEUE",
            Self::Active => "ACTIVE",
            Self::Done => "DONE",
            Self::Alert => "ALERT",
        }
    }
}

pub(in crate::app) struct StageDef {
    pub(in crate::app) name: &'static str,
    pub(in crate::app) description: &'static str,
    pub(in crate::app) dwell: Duration,
}

pub(in crate::app) const STAGES: [StageDef; STAGE_COUNT] = [
    StageDef {
        name: "Article Ingestion",
        description: "Receiving articles from crawlers",
        dwell: Duration::from_millis(350),
    },
    StageDef {
        name: "Language Detection",
        description: "Identifying language (en/ja)",
        dwell: Duration::from_millis(250),
    },
    StageDef {
        name: "Tokenization",
        description: "Morphological analysis and tokenization",
        dwell: Duration::from_millis(900),
    },
    StageDef {
        name: "Sentiment Scoring",
        description: "Calculating sentiment score (-1.0 to 1.0)",
        dwell: Duration::from_millis(700),
    },
    StageDef {
        name: "Entity Extraction",
        description: "Extracting named entities (persons/orgs/places)",
        dwell: Duration::from_millis(800),
    },
    StageDef {
        name: "Topic Classification",
        description: "Classifying into topic categories",
        dwell: Duration::from_millis(600),
    },
    StageDef {
        name: "Conflict Flag Detection",
        description: "Detecting conflict and tension topics",
        dwell: Duration::from_millis(250),
    },
];

#[derive(Clone, Debug, PartialEq, Eq)]
pub(in crate::app) struct StageTransition {
    pub(in crate::app) article_id: String,
    pub(in crate::app) stage: usize,
    pub(in crate::app) status: StageStatus,
}

#[derive(Clone, Debug, PartialEq)]
pub(in crate::app) enum PipelineEvent {
    Started { article_id: String },
    Transition(StageTransition),
    Completed {
        article_id: String,
        node: NodeRequest,
    },
}

pub(in crate::app) fn cluster_for(article: &Article) -> Cluster {
    let topic = article.topic.to_lowercase();
    if topic.contains("conflict") || topic.contains("war") {
        Cluster::Conflict
    } else if article.sentiment_score < -0.3 {
        Cluster::Sentiment
    } else if topic.contains("tech") || topic.contains("ai") {
        Cluster::Topic
    } else if topic.contains("finance") || topic.contains("econom") {
        Cluster::Entity
    } else {
        Cluster::Output
    }
}

enum Phase {
    Idle,
    Running {
        article: Article,
        stage: usize,
        deadline: Duration,
    },
    Cooldown {
        until: Duration,
    },
}

pub(in crate::app) struct PipelineMachine {
    pending: VecDeque<Article>,
    phase: Phase,
    cancel: CancelToken,
}

impl PipelineMachine {
    pub(in crate::app) fn new(cancel: CancelToken) -> Self {
        Self {
            pending: VecDeque::new(),
            phase: Phase::Idle,
            cancel,
        }
    }

    pub(in crate::app) fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub(in crate::app) fn in_flight(&self) -> Option<&str> {
        match &self.phase {
            Phase::Running { article, .. } => Some(article.id.as_str()),
            Phase::Idle | Phase::Cooldown { .. } => None,
        }
    }

    pub(in crate::app) fn is_halted(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub(in crate::app) fn enqueue(&mut self, article: Article) -> bool {
        if self.is_halted() {
            return false;
        }
        if let Err(error) = article.validate() {
            warn!(id = %article.id, %error, "dropping malformed article");
            return false;
        }
        self.pending.push_back(article);
        true
    }

    /// Runs every transition due at `now`. Deadlines chain from the previous
    /// deadline, so a late poll replays the same sequence.
    pub(in crate::app) fn poll(&mut self, now: Duration) -> Vec<PipelineEvent> {
        let mut events = Vec::new();
        while !self.is_halted() && self.advance(now, &mut events) {}
        events
    }

    fn advance(&mut self, now: Duration, events: &mut Vec<PipelineEvent>) -> bool {
        match std::mem::replace(&mut self.phase, Phase::Idle) {
            Phase::Idle => {
                let Some(article) = self.pending.pop_front() else {
                    return false;
                };
                debug!(id = %article.id, "pipeline start");
                events.push(PipelineEvent::Started {
                    article_id: article.id.clone(),
                });
                self.activate(article, 0, now, events);
                true
            }
            Phase::Running {
                article,
                stage,
                deadline,
            } => {
                if now < deadline {
                    self.phase = Phase::Running {
                        article,
                        stage,
                        deadline,
                    };
                    return false;
                }

                events.push(PipelineEvent::Transition(StageTransition {
                    article_id: article.id.clone(),
                    stage,
                    status: StageStatus::Done,
                }));
                if stage < TERMINAL_STAGE {
                    self.activate(article, stage + 1, deadline, events);
                } else {
                    let node = NodeRequest {
                        id: article.id.clone(),
                        cluster: cluster_for(&article),
                        label: article.topic,
                        title: article.title,
                    };
                    events.push(PipelineEvent::Completed {
                        article_id: article.id,
                        node,
                    });
                    self.phase = Phase::Cooldown {
                        until: deadline + COOLDOWN,
                    };
                }
                true
            }
            Phase::Cooldown { until } => {
                if now < until {
                    self.phase = Phase::Cooldown { until };
                    return false;
                }
                true
            }
        }
    }

    fn activate(
        &mut self,
        article: Article,
        stage: usize,
        started: Duration,
        events: &mut Vec<PipelineEvent>,
    ) {
        let status = if stage == TERMINAL_STAGE && article.is_conflict() {
            StageStatus::Alert
        } else {
            StageStatus::Active
        };
        events.push(PipelineEvent::Transition(StageTransition {
            article_id: article.id.clone(),
            stage,
            status,
        }));
        self.phase = Phase::Running {
            article,
            stage,
            deadline: started + STAGES[stage].dwell,
        };
    }

    pub(in crate::app) fn halt(&mut self) {
        self.cancel.cancel();
        self.pending.clear();
        self.phase = Phase::Idle;
    }
}
