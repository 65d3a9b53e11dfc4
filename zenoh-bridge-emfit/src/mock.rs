//! Scripted status source for tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use reqwest::StatusCode;

use crate::error::FetchError;
use crate::fetcher::StatusSource;

/// One scripted response.
#[derive(Debug, Clone)]
pub enum Response {
    Body(String),
    /// Body delivered after a delay.
    Slow(String, Duration),
    Status(StatusCode),
}

/// Returns scripted responses in order, repeating the last one forever.
#[derive(Debug)]
pub struct MockSource {
    responses: Mutex<VecDeque<Response>>,
    calls: AtomicUsize,
}

impl MockSource {
    pub fn scripted(responses: Vec<Response>) -> Self {
        assert!(!responses.is_empty(), "mock needs at least one response");
        Self {
            responses: Mutex::new(responses.into()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Always answer with `body`.
    pub fn ok(body: &str) -> Self {
        Self::scripted(vec![Self::body(body)])
    }

    pub fn body(body: &str) -> Response {
        Response::Body(body.to_string())
    }

    pub fn slow(body: &str, latency: Duration) -> Response {
        Response::Slow(body.to_string(), latency)
    }

    pub fn server_error() -> Response {
        Response::Status(StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Replace the script, e.g. to change presence between polls.
    pub fn set(&self, responses: Vec<Response>) {
        *self.responses.lock() = responses.into();
    }

    /// Number of fetches issued so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn next(&self) -> Response {
        let mut responses = self.responses.lock();
        if responses.len() > 1 {
            responses.pop_front().unwrap_or_else(Self::server_error)
        } else {
            responses.front().cloned().unwrap_or_else(Self::server_error)
        }
    }
}

impl StatusSource for MockSource {
    async fn fetch(&self) -> Result<String, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.next() {
            Response::Body(body) => Ok(body),
            Response::Slow(body, latency) => {
                tokio::time::sleep(latency).await;
                Ok(body)
            }
            Response::Status(status) => Err(FetchError::Status(status)),
        }
    }

    fn describe(&self) -> String {
        "mock".to_string()
    }
}
