use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::feed::{
    Article, CategoryCount, EntityItem, KpiMetrics, MetricsUpdate, ToneData, demo_metrics,
};

use super::graph::NodeRequest;
use super::pipeline::{PipelineEvent, STAGE_COUNT, StageStatus};

pub(in crate::app) const ARTICLE_QUEUE_LEN: usize = 15;

#[derive(Clone, Debug, PartialEq)]
pub(in crate::app) struct QueuedArticle {
    pub(in crate::app) article: Article,
    pub(in crate::app) received_at: DateTime<Utc>,
    pub(in crate::app) processing: bool,
}

#[derive(Default)]
pub(in crate::app) struct GraphStateStore {
    articles: VecDeque<QueuedArticle>,
    stages: [StageStatus; STAGE_COUNT],
    kpi: KpiMetrics,
    categories: Vec<CategoryCount>,
    tone: ToneData,
    entities: Vec<EntityItem>,
    pending_nodes: Vec<NodeRequest>,
    demo_mode: bool,
}

impl GraphStateStore {
    pub(in crate::app) fn articles(&self) -> &VecDeque<QueuedArticle> {
        &self.articles
    }

    pub(in crate::app) fn stages(&self) -> &[StageStatus; STAGE_COUNT] {
        &self.stages
    }

    pub(in crate::app) fn kpi(&self) -> &KpiMetrics {
        &self.kpi
    }

    pub(in crate::app) fn categories(&self) -> &[CategoryCount] {
        &self.categories
    }

    pub(in crate::app) fn tone(&self) -> &ToneData {
        &self.tone
    }

    pub(in crate::app) fn entities(&self) -> &[EntityItem] {
        &self.entities
    }

    pub(in crate::app) fn pending_nodes(&self) -> &[NodeRequest] {
        &self.pending_nodes
    }

    pub(in crate::app) fn demo_mode(&self) -> bool {
        self.demo_mode
    }

    pub(in crate::app) fn add_article(
        &mut self,
        article: Article,
        received_at: DateTime<Utc>,
    ) -> &VecDeque<QueuedArticle> {
        self.articles.push_front(QueuedArticle {
            article,
            received_at,
            processing: true,
        });
        self.articles.truncate(ARTICLE_QUEUE_LEN);
        &self.articles
    }

    pub(in crate::app) fn mark_article_done(&mut self, id: &str) -> &VecDeque<QueuedArticle> {
        for entry in self.articles.iter_mut().filter(|entry| entry.article.id == id) {
            entry.processing = false;
        }
        &self.articles
    }

    pub(in crate::app) fn set_stage_status(
        &mut self,
        stage: usize,
        status: StageStatus,
    ) -> &[StageStatus; STAGE_COUNT] {
        if let Some(slot) = self.stages.get_mut(stage) {
            *slot = status;
        }
        &self.stages
    }

    pub(in crate::app) fn reset_stages(&mut self) -> &[StageStatus; STAGE_COUNT] {
        self.stages = [StageStatus::Queue; STAGE_COUNT];
        &self.stages
    }

    pub(in crate::app) fn enqueue_node(&mut self, node: NodeRequest) -> &[NodeRequest] {
        self.pending_nodes.push(node);
        &self.pending_nodes
    }

    pub(in crate::app) fn drain_nodes(&mut self) -> Vec<NodeRequest> {
        std::mem::take(&mut self.pending_nodes)
    }

    pub(in crate::app) fn apply_pipeline(&mut self, event: PipelineEvent) {
        match event {
            PipelineEvent::Started { article_id } => {
                debug!(%article_id, "pipeline started");
                self.reset_stages();
            }
            PipelineEvent::Transition(transition) => {
                debug!(
                    article_id = %transition.article_id,
                    stage = transition.stage,
                    status = transition.status.label(),
                    "stage transition"
                );
                self.set_stage_status(transition.stage, transition.status);
            }
            PipelineEvent::Completed { article_id, node } => {
                self.mark_article_done(&article_id);
                self.enqueue_node(node);
            }
        }
    }

    pub(in crate::app) fn set_demo_mode(&mut self, demo_mode: bool) -> bool {
        if demo_mode && !self.demo_mode {
            info!("installing demo metrics");
            for update in demo_metrics() {
                self.install(update);
            }
        }
        self.demo_mode = demo_mode;
        self.demo_mode
    }

    pub(in crate::app) fn mark_live(&mut self, at: DateTime<Utc>) -> &KpiMetrics {
        self.kpi.connected = true;
        self.kpi.last_updated = at.to_rfc3339();
        &self.kpi
    }

    pub(in crate::app) fn apply_polled(&mut self, update: MetricsUpdate) -> bool {
        if self.demo_mode {
            return false;
        }
        self.install(update);
        true
    }

    fn install(&mut self, update: MetricsUpdate) {
        match update {
            MetricsUpdate::Kpi(kpi) => self.kpi = kpi,
            MetricsUpdate::Categories(categories) => self.categories = categories,
            MetricsUpdate::Tone(tone) => self.tone = tone,
            MetricsUpdate::Entities(entities) => self.entities = entities,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::graph::Cluster;
    use crate::app::pipeline::StageTransition;
    use crate::feed::test_article;

    fn node(id: &str) -> NodeRequest {
        NodeRequest {
            id: id.to_owned(),
            cluster: Cluster::Output,
            label: "Other".to_owned(),
            title: String::new(),
        }
    }

    #[test]
    fn article_queue_is_newest_first_and_bounded() {
        let mut store = GraphStateStore::default();
        for n in 0..20 {
            store.add_article(test_article(&format!("a{n}"), "Health", 0.0), Utc::now());
        }
        let queue = store.articles();
        assert_eq!(queue.len(), ARTICLE_QUEUE_LEN);
        assert_eq!(queue[0].article.id, "a19");
        assert_eq!(queue[14].article.id, "a5");
        assert!(queue.iter().all(|entry| entry.processing));

        let queue = store.mark_article_done("a19");
        assert!(!queue[0].processing);
        assert!(queue[1].processing);
    }

    #[test]
    fn pipeline_events_mirror_into_stages_and_node_queue() {
        let mut store = GraphStateStore::default();
        store.add_article(test_article("p1", "Finance", 0.2), Utc::now());
        store.apply_pipeline(PipelineEvent::Transition(StageTransition {
            article_id: "p1".into(),
            stage: 3,
            status: StageStatus::Active,
        }));
        assert_eq!(store.stages()[3], StageStatus::Active);
        store.apply_pipeline(PipelineEvent::Started {
            article_id: "p1".into(),
        });
        assert!(store.stages().iter().all(|s| *s == StageStatus::Queue));

        store.apply_pipeline(PipelineEvent::Completed {
            article_id: "p1".into(),
            node: node("p1"),
        });
        assert!(!store.articles()[0].processing);
        assert_eq!(store.pending_nodes().len(), 1);
        assert_eq!(store.drain_nodes(), vec![node("p1")]);
        assert!(store.pending_nodes().is_empty());
    }

    #[test]
    fn out_of_range_stage_is_ignored() {
        let mut store = GraphStateStore::default();
        let stages = store.set_stage_status(STAGE_COUNT + 3, StageStatus::Done);
        assert!(stages.iter().all(|s| *s == StageStatus::Queue));
    }

    #[test]
    fn demo_mode_installs_mock_metrics_and_ignores_polls() {
        let mut store = GraphStateStore::default();
        assert!(store.apply_polled(MetricsUpdate::Kpi(KpiMetrics {
            throughput: 5.0,
            ..KpiMetrics::default()
        })));
        assert_eq!(store.kpi().throughput, 5.0);

        assert!(store.set_demo_mode(true));
        assert_eq!(store.kpi().total_today, 4_821);
        assert_eq!(store.categories().len(), 7);
        assert_eq!(store.entities().len(), 5);
        assert!(!store.apply_polled(MetricsUpdate::Entities(Vec::new())));
        assert_eq!(store.entities().len(), 5);

        assert!(!store.set_demo_mode(false));
        assert!(store.apply_polled(MetricsUpdate::Entities(Vec::new())));
        assert!(store.entities().is_empty());
    }
}
