//! In-memory [`HttpClient`] that replays canned responses per URL.

use super::client::HttpClient;
use async_trait::async_trait;
use reqwest::{Request, Response};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

#[derive(Debug, Clone)]
pub(crate) enum Reply {
    /// Respond with this status code and body.
    Status(u16, String),
    /// Fail at the request level, before any response exists.
    Fail,
}

impl Reply {
    pub(crate) fn ok(body: impl Into<String>) -> Self {
        Reply::Status(200, body.into())
    }
}

/// Pops one reply per request for the requested URL; the last reply for a
/// URL repeats forever.
#[derive(Default)]
pub(crate) struct ScriptedClient {
    replies: Mutex<HashMap<String, VecDeque<Reply>>>,
    requests: Mutex<Vec<String>>,
}

impl ScriptedClient {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn on(self, url: &str, replies: Vec<Reply>) -> Self {
        self.replies
            .lock()
            .unwrap()
            .insert(url.to_string(), replies.into());
        self
    }

    /// Number of requests made against `url` so far.
    pub(crate) fn hits(&self, url: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|u| u.as_str() == url)
            .count()
    }

    fn next_reply(&self, url: &str) -> Reply {
        let mut replies = self.replies.lock().unwrap();
        let queue = replies
            .get_mut(url)
            .unwrap_or_else(|| panic!("no scripted reply for {url}"));
        if queue.len() > 1 {
            queue.pop_front().unwrap()
        } else {
            queue.front().cloned().unwrap()
        }
    }
}

#[async_trait]
impl HttpClient for ScriptedClient {
    async fn execute(&self, req: Request) -> reqwest::Result<Response> {
        let url = req.url().to_string();
        self.requests.lock().unwrap().push(url.clone());

        match self.next_reply(&url) {
            Reply::Status(code, body) => Ok(http::Response::builder()
                .status(code)
                .body(body)
                .unwrap()
                .into()),
            // reqwest rejects non-http schemes before doing any I/O.
            Reply::Fail => {
                let bad = Request::new(
                    reqwest::Method::GET,
                    "ftp://feed.invalid/".parse().unwrap(),
                );
                reqwest::Client::new().execute(bad).await
            }
        }
    }
}

/// Builds a station-information payload from `(id, lat, lon)` triples.
pub(crate) fn information_json(stations: &[(&str, f64, f64)]) -> String {
    let stations: Vec<_> = stations
        .iter()
        .map(|(id, lat, lon)| serde_json::json!({ "station_id": id, "lat": lat, "lon": lon }))
        .collect();
    serde_json::json!({ "data": { "stations": stations } }).to_string()
}

/// Builds a station-status payload from `(id, num_bikes_available)` pairs.
pub(crate) fn status_json(stations: &[(&str, i64)]) -> String {
    let stations: Vec<_> = stations
        .iter()
        .map(|(id, bikes)| {
            serde_json::json!({
                "station_id": id,
                "num_bikes_available": bikes,
                "num_docks_available": 0,
                "is_renting": 1
            })
        })
        .collect();
    serde_json::json!({ "data": { "stations": stations } }).to_string()
}
