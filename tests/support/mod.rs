//! Mock collection endpoints for integration tests.
//!
//! wiremock serves the endpoints from its own runtime while the blocking client under test
//! runs on the test thread; every async call on the mock goes through `block_on`.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::runtime::{Builder, Runtime};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

use up_restutil::{ClientConfig, RestClient};

/// A mock server plus the runtime that drives it. The server is declared first so it is
/// dropped (and its `.expect(n)` checks verified) before the runtime shuts down.
pub struct TestServer {
    server: MockServer,
    rt: Runtime,
}

impl TestServer {
    pub fn start() -> Self {
        let rt = Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .unwrap();
        let server = rt.block_on(MockServer::start());
        Self { server, rt }
    }

    pub fn mount(&self, mock: Mock) -> &Self {
        self.rt.block_on(mock.mount(&self.server));
        self
    }

    /// Absolute URL of `path` on this server.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.server.uri(), path)
    }

    pub fn requests(&self) -> Vec<Request> {
        self.rt
            .block_on(self.server.received_requests())
            .unwrap_or_default()
    }

    pub fn count(&self, method: &str, path: &str) -> usize {
        self.requests()
            .iter()
            .filter(|r| is(r, method, path))
            .count()
    }

    /// Check every `.expect(n)` mounted so far.
    pub fn verify(&self) {
        self.rt.block_on(self.server.verify());
    }
}

pub fn is(request: &Request, method: &str, path: &str) -> bool {
    request.method.as_str() == method && request.url.path() == path
}

pub fn header<'a>(request: &'a Request, name: &str) -> Option<&'a str> {
    request.headers.get(name).and_then(|v| v.to_str().ok())
}

pub fn body_str(request: &Request) -> String {
    String::from_utf8_lossy(&request.body).into_owned()
}

/// Response start times of one endpoint; with a fixed response delay the overlap of the
/// resulting windows is the number of requests that were open together.
#[derive(Clone, Default)]
pub struct InFlight {
    starts: Arc<Mutex<Vec<Instant>>>,
}

pub struct DelayedReply {
    pub tracker: InFlight,
    pub delay: Duration,
    pub body: String,
}

impl Respond for DelayedReply {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        self.tracker.starts.lock().unwrap().push(Instant::now());
        ResponseTemplate::new(200)
            .set_body_string(self.body.clone())
            .set_delay(self.delay)
    }
}

impl InFlight {
    /// Most requests whose `[start, start + delay)` windows overlap at one point.
    pub fn peak(&self, delay: Duration) -> usize {
        let starts = self.starts.lock().unwrap();
        starts
            .iter()
            .map(|s| {
                starts
                    .iter()
                    .filter(|t| **t <= *s && s.duration_since(**t) < delay)
                    .count()
            })
            .max()
            .unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.starts.lock().unwrap().len()
    }
}

/// Client that ignores proxy environment variables so requests reach the mock server.
pub fn test_client(pool_size: usize) -> RestClient {
    RestClient::new(&ClientConfig {
        pool_size,
        socks_proxy: None,
        env_proxy: false,
    })
    .unwrap()
}

/// `__ids` body: concatenated `{"id": ...}` objects.
pub fn ids_body(ids: &[&str]) -> String {
    ids.iter().map(|id| format!("{{\"id\":\"{id}\"}}\n")).collect()
}

/// Output lines, sorted.
pub fn sorted_lines(out: &[u8]) -> Vec<String> {
    let mut lines: Vec<String> = String::from_utf8_lossy(out)
        .lines()
        .map(str::to_string)
        .collect();
    lines.sort();
    lines
}
