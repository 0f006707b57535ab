use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::error::FeedError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SentimentLabel {
    Positive,
    Neutral,
    Negative,
}

impl SentimentLabel {
    pub fn label(self) -> &'static str {
        match self {
            Self::Positive => "POSITIVE",
            Self::Neutral => "NEUTRAL",
            Self::Negative => "NEGATIVE",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    Gdelt,
    IbmCrawl,
    Box,
}

impl SourceType {
    pub fn label(self) -> &'static str {
        match self {
            Self::Gdelt => "gdelt",
            Self::IbmCrawl => "ibm_crawl",
            Self::Box => "box",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub domain: String,
    pub topic: String,
    pub sentiment_label: SentimentLabel,
    pub sentiment_score: f32,
    pub source_type: SourceType,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub published: DateTime<Utc>,
}

impl Article {
    pub fn validate(&self) -> Result<(), FeedError> {
        if self.id.trim().is_empty() {
            return Err(FeedError::Invalid("empty id"));
        }
        if !self.sentiment_score.is_finite() || !(-1.0..=1.0).contains(&self.sentiment_score) {
            return Err(FeedError::Invalid("sentiment score outside [-1, 1]"));
        }
        Ok(())
    }

    pub fn is_conflict(&self) -> bool {
        self.topic.to_lowercase().contains("conflict")
    }
}

pub fn parse_article(raw: &str) -> Result<Article, FeedError> {
    let article: Article = serde_json::from_str(raw)?;
    article.validate()?;
    Ok(article)
}

pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }

    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .map(|naive| naive.and_utc())
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid ISO-8601 timestamp: {raw}")))
}

#[cfg(test)]
pub(crate) fn test_article(id: &str, topic: &str, sentiment_score: f32) -> Article {
    Article {
        id: id.to_owned(),
        title: format!("{topic} headline {id}"),
        domain: "reuters.com".to_owned(),
        topic: topic.to_owned(),
        sentiment_label: if sentiment_score > 0.3 {
            SentimentLabel::Positive
        } else if sentiment_score < -0.3 {
            SentimentLabel::Negative
        } else {
            SentimentLabel::Neutral
        },
        sentiment_score,
        source_type: SourceType::Gdelt,
        published: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"{
        "id": "a-1",
        "title": "IBM Open-Sources New Granite Embedding Models",
        "domain": "ibm.com",
        "source_type": "ibm_crawl",
        "sentiment_label": "POSITIVE",
        "sentiment_score": 0.62,
        "topic": "Technology",
        "published": "2026-03-01T09:30:00Z"
    }"#;

    #[test]
    fn parses_a_complete_article() {
        let article = parse_article(VALID).unwrap();
        assert_eq!(article.id, "a-1");
        assert_eq!(article.source_type, SourceType::IbmCrawl);
        assert_eq!(article.sentiment_label, SentimentLabel::Positive);
        assert_eq!(article.published.to_rfc3339(), "2026-03-01T09:30:00+00:00");
    }

    #[test]
    fn accepts_naive_timestamps_and_missing_domain() {
        let raw = r#"{"id":"b","title":"t","topic":"Finance","sentiment_label":"NEUTRAL",
            "sentiment_score":0.0,"source_type":"box","published":"2026-03-01T09:30:00.125"}"#;
        let article = parse_article(raw).unwrap();
        assert!(article.domain.is_empty());
        assert_eq!(article.published.timestamp_subsec_millis(), 125);
    }

    #[test]
    fn rejects_malformed_and_invalid_payloads() {
        assert!(matches!(parse_article("{not json"), Err(FeedError::Malformed(_))));

        let missing_topic = r#"{"id":"c","title":"t","sentiment_label":"NEUTRAL",
            "sentiment_score":0.0,"source_type":"box","published":"2026-03-01T09:30:00Z"}"#;
        assert!(matches!(parse_article(missing_topic), Err(FeedError::Malformed(_))));

        let out_of_range = VALID.replace("0.62", "1.7");
        assert!(matches!(parse_article(&out_of_range), Err(FeedError::Invalid(_))));

        let empty_id = VALID.replace("\"a-1\"", "\"  \"");
        assert!(matches!(parse_article(&empty_id), Err(FeedError::Invalid(_))));

        let bad_time = VALID.replace("2026-03-01T09:30:00Z", "yesterday");
        assert!(parse_article(&bad_time).is_err());
    }

    #[test]
    fn conflict_detection_ignores_case() {
        assert!(test_article("x", "Regional CONFLICT", 0.0).is_conflict());
        assert!(!test_article("x", "Technology", 0.0).is_conflict());
    }
}
