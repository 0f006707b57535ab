use std::io::{BufRead, BufReader};
use std::thread;
use std::time::Duration;

use reqwest::blocking::Client;
use tracing::{debug, info};

use super::article::{Article, parse_article};
use super::error::FeedError;
use super::source::{CancelToken, ErrorSink, EventFeed, EventSink, Subscription};

const ARTICLE_EVENT: &str = "new_article";

#[derive(Clone, Debug, PartialEq, Eq)]
pub(super) struct SseEvent {
    pub(super) name: String,
    pub(super) data: String,
}

#[derive(Debug, Default)]
pub(super) struct SseDecoder {
    name: Option<String>,
    data: Vec<String>,
    poisoned: bool,
}

impl SseDecoder {
    pub(super) fn push_line(&mut self, line: &str) -> Option<SseEvent> {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        match field {
            "event" => self.name = Some(value.to_owned()),
            "data" => self.data.push(value.to_owned()),
            _ => {}
        }
        None
    }

    /// Drops the event being assembled once its terminating blank line
    /// arrives.
    pub(super) fn poison(&mut self) {
        self.poisoned = true;
    }

    fn dispatch(&mut self) -> Option<SseEvent> {
        let name = self.name.take();
        if std::mem::take(&mut self.poisoned) {
            self.data.clear();
            return None;
        }
        if self.data.is_empty() {
            return None;
        }
        let data = std::mem::take(&mut self.data).join("\n");
        Some(SseEvent {
            name: name.unwrap_or_else(|| "message".to_owned()),
            data,
        })
    }
}

pub struct LiveStream {
    url: String,
}

impl LiveStream {
    pub fn new(base_url: &str) -> Self {
        Self {
            url: format!("{}/articles/stream", base_url.trim_end_matches('/')),
        }
    }

    #[cfg(test)]
    pub fn url(&self) -> &str {
        &self.url
    }
}

fn read_stream(url: &str, token: &CancelToken, on_event: &mut EventSink) -> Result<(), FeedError> {
    let client = Client::builder().timeout(None::<Duration>).build()?;
    let response = client
        .get(url)
        .header("Accept", "text/event-stream")
        .send()?;
    if !response.status().is_success() {
        return Err(FeedError::Status(response.status().as_u16()));
    }
    info!(url, "article stream connected");

    pump_events(BufReader::new(response), token, on_event)
}

fn pump_events(
    mut reader: impl BufRead,
    token: &CancelToken,
    on_event: &mut dyn FnMut(Article),
) -> Result<(), FeedError> {
    let mut decoder = SseDecoder::default();
    let mut raw = Vec::new();
    loop {
        if token.is_cancelled() {
            return Ok(());
        }
        raw.clear();
        let read = reader.read_until(b'\n', &mut raw).map_err(|error| {
            debug!(%error, "article stream read failed");
            FeedError::Closed
        })?;
        if read == 0 {
            break;
        }
        if raw.last() == Some(&b'\n') {
            raw.pop();
        }

        let line = match std::str::from_utf8(&raw) {
            Ok(line) => line,
            Err(error) => {
                debug!(%error, "dropping event with invalid UTF-8");
                decoder.poison();
                continue;
            }
        };
        let Some(event) = decoder.push_line(line) else {
            continue;
        };
        if event.name != ARTICLE_EVENT {
            continue;
        }
        match parse_article(&event.data) {
            Ok(article) => on_event(article),
            Err(error) => debug!(%error, "dropping malformed article event"),
        }
    }

    if token.is_cancelled() {
        Ok(())
    } else {
        Err(FeedError::Closed)
    }
}

impl EventFeed for LiveStream {
    fn name(&self) -> &'static str {
        "live"
    }

    fn subscribe(&self, mut on_event: EventSink, mut on_error: ErrorSink) -> Subscription {
        let token = CancelToken::new();
        let worker_token = token.clone();
        let url = self.url.clone();

        let worker = thread::spawn(move || {
            let result = read_stream(&url, &worker_token, &mut on_event);
            if let Err(error) = result
                && !worker_token.is_cancelled()
            {
                on_error(error);
            }
        });

        Subscription::new(token, Some(worker))
    }
}
