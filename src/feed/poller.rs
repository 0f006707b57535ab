use std::sync::mpsc::{self, Receiver};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use reqwest::blocking::Client;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::metrics::{
    CategoriesResponse, CategoryCount, EntitiesResponse, EntityItem, KpiMetrics, MetricsUpdate,
    ToneData,
};
use super::source::CancelToken;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

pub trait MetricsApi: Send + 'static {
    fn kpi(&self) -> Result<KpiMetrics>;
    fn categories(&self) -> Result<Vec<CategoryCount>>;
    fn tone(&self) -> Result<ToneData>;
    fn top_entities(&self) -> Result<Vec<EntityItem>>;
}

pub struct HttpMetricsApi {
    client: Client,
    base_url: String,
}

impl HttpMetricsApi {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("failed to build metrics HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
        })
    }

    fn fetch_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}{path}", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .with_context(|| format!("request to {url} failed"))?;
        if !response.status().is_success() {
            return Err(anyhow!("API {path} answered {}", response.status()));
        }
        response
            .json::<T>()
            .with_context(|| format!("invalid JSON from {url}"))
    }
}

impl MetricsApi for HttpMetricsApi {
    fn kpi(&self) -> Result<KpiMetrics> {
        self.fetch_json("/kpi")
    }

    fn categories(&self) -> Result<Vec<CategoryCount>> {
        self.fetch_json::<CategoriesResponse>("/categories")
            .map(|response| response.categories)
    }

    fn tone(&self) -> Result<ToneData> {
        self.fetch_json("/tone")
    }

    fn top_entities(&self) -> Result<Vec<EntityItem>> {
        self.fetch_json::<EntitiesResponse>("/entities/top")
            .map(|response| response.entities)
    }
}

pub(super) fn poll_once(api: &dyn MetricsApi) -> Vec<MetricsUpdate> {
    let mut updates = Vec::with_capacity(4);
    match api.kpi() {
        Ok(kpi) => updates.push(MetricsUpdate::Kpi(kpi)),
        Err(error) => debug!(%error, "kpi poll failed"),
    }
    match api.categories() {
        Ok(categories) => updates.push(MetricsUpdate::Categories(categories)),
        Err(error) => debug!(%error, "categories poll failed"),
    }
    match api.tone() {
        Ok(tone) => updates.push(MetricsUpdate::Tone(tone)),
        Err(error) => debug!(%error, "tone poll failed"),
    }
    match api.top_entities() {
        Ok(entities) => updates.push(MetricsUpdate::Entities(entities)),
        Err(error) => debug!(%error, "entities poll failed"),
    }
    updates
}

pub struct MetricsPoller {
    rx: Receiver<MetricsUpdate>,
    token: CancelToken,
    worker: Option<JoinHandle<()>>,
}

impl MetricsPoller {
    pub fn spawn(api: Box<dyn MetricsApi>, interval: Duration) -> Self {
        let (tx, rx) = mpsc::channel::<MetricsUpdate>();
        let token = CancelToken::new();
        let worker_token = token.clone();

        let worker = thread::spawn(move || {
            loop {
                for update in poll_once(api.as_ref()) {
                    if worker_token.is_cancelled() || tx.send(update).is_err() {
                        return;
                    }
                }
                if !worker_token.sleep(interval) {
                    return;
                }
            }
        });

        Self {
            rx,
            token,
            worker: Some(worker),
        }
    }

    pub fn drain(&self) -> Vec<MetricsUpdate> {
        self.rx.try_iter().collect()
    }

    pub fn stop(&mut self) {
        self.token.cancel();
        self.worker.take();
    }
}

impl Drop for MetricsPoller {
    fn drop(&mut self) {
        self.stop();
    }
}
