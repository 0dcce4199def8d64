// tests/common/mod.rs
// Shared helpers: an in-memory Transport with per-request latency.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use skyscript::{Aggregator, Endpoints, FetchClient, FetchError, Transport};
use url::Url;

pub const APOD_BASE: &str = "https://apod.test/planetary/apod";
pub const HOROSCOPE_BASE: &str = "https://horoscope.test/api/v1/get-horoscope/daily";
pub const API_KEY: &str = "TEST_KEY";

pub type Reply = (Duration, Result<String, FetchError>);

pub struct FakeTransport {
    calls: Mutex<Vec<Url>>,
    respond: Box<dyn Fn(&Url) -> Reply + Send + Sync>,
}

impl FakeTransport {
    pub fn new(respond: impl Fn(&Url) -> Reply + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            respond: Box::new(respond),
        })
    }

    /// Both sources answer instantly with generated payloads.
    pub fn instant() -> Arc<Self> {
        Self::new(|url| (Duration::ZERO, Ok(default_body(url))))
    }

    pub fn calls(&self) -> Vec<Url> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// `date=` values of every APOD request, in issue order.
    pub fn apod_dates(&self) -> Vec<String> {
        self.calls()
            .iter()
            .filter(|u| is_apod(u))
            .filter_map(|u| query(u, "date"))
            .collect()
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn get(&self, url: &Url) -> Result<String, FetchError> {
        self.calls.lock().push(url.clone());
        let (delay, reply) = (self.respond)(url);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        reply
    }
}

pub fn aggregator(transport: Arc<FakeTransport>) -> Aggregator {
    let endpoints = Endpoints::new(APOD_BASE, HOROSCOPE_BASE, API_KEY).unwrap();
    Aggregator::new(FetchClient::new(transport), endpoints)
}

pub fn is_apod(url: &Url) -> bool {
    url.host_str() == Some("apod.test")
}

pub fn query(url: &Url, key: &str) -> Option<String> {
    url.query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}

pub fn apod_body(date: &str) -> String {
    serde_json::json!({
        "title": format!("APOD {date}"),
        "date": date,
        "explanation": "generated",
        "url": format!("https://img.test/{date}.jpg"),
        "media_type": "image"
    })
    .to_string()
}

pub fn horoscope_body(sign: &str) -> String {
    serde_json::json!({
        "status": 200,
        "success": true,
        "data": { "date": "today", "horoscope_data": format!("Reading for {sign}") }
    })
    .to_string()
}

pub fn default_body(url: &Url) -> String {
    if is_apod(url) {
        apod_body(&query(url, "date").unwrap_or_default())
    } else {
        horoscope_body(&query(url, "sign").unwrap_or_default())
    }
}

pub fn fixture(name: &str) -> String {
    std::fs::read_to_string(format!("tests/fixtures/{name}"))
        .unwrap_or_else(|e| panic!("missing tests/fixtures/{name}: {e}"))
}
