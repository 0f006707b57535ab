use serde::{Deserialize, Serialize};

use super::article::SentimentLabel;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct KpiMetrics {
    pub throughput: f32,
    pub total_today: u64,
    pub active_sources: u32,
    #[serde(default)]
    pub connected: bool,
    #[serde(default)]
    pub last_updated: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CategoryCount {
    pub topic: String,
    pub count: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EntityItem {
    pub text: String,
    pub count: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToneData {
    pub average_score: f32,
    pub label: SentimentLabel,
    pub sample_size: u64,
}

impl Default for ToneData {
    fn default() -> Self {
        Self {
            average_score: 0.0,
            label: SentimentLabel::Neutral,
            sample_size: 0,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct CategoriesResponse {
    pub(super) categories: Vec<CategoryCount>,
}

#[derive(Debug, Deserialize)]
pub(super) struct EntitiesResponse {
    pub(super) entities: Vec<EntityItem>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum MetricsUpdate {
    Kpi(KpiMetrics),
    Categories(Vec<CategoryCount>),
    Tone(ToneData),
    Entities(Vec<EntityItem>),
}

pub fn demo_metrics() -> Vec<MetricsUpdate> {
    let categories = [
        ("Technology", 142),
        ("Politics", 98),
        ("Finance", 76),
        ("Conflict", 54),
        ("Environment", 33),
        ("Health", 21),
        ("Other", 18),
    ]
    .into_iter()
    .map(|(topic, count)| CategoryCount {
        topic: topic.to_owned(),
        count,
    })
    .collect();

    let entities = [
        ("IBM", 312),
        ("watsonx", 198),
        ("Arvind Krishna", 87),
        ("United States", 73),
        ("OpenAI", 61),
    ]
    .into_iter()
    .map(|(text, count)| EntityItem {
        text: text.to_owned(),
        count,
    })
    .collect();

    vec![
        MetricsUpdate::Kpi(KpiMetrics {
            throughput: 198.0,
            total_today: 4821,
            active_sources: 3,
            connected: false,
            last_updated: chrono::Utc::now().to_rfc3339(),
        }),
        MetricsUpdate::Categories(categories),
        MetricsUpdate::Tone(ToneData {
            average_score: -0.18,
            label: SentimentLabel::Neutral,
            sample_size: 100,
        }),
        MetricsUpdate::Entities(entities),
    ]
}
