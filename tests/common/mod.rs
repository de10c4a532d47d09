#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use sofascore_ingest::{Endpoints, FetchSettings, SofaClient};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// Canned responses per request path. The last response of a path repeats.
type Routes = HashMap<String, VecDeque<(u16, String)>>;

/// Called with the request path before the response is written.
type Hook = Arc<dyn Fn(&str) + Send + Sync>;

/// A minimal HTTP/1.1 server answering GET requests from a fixed route table.
pub struct StubServer {
    pub base: String,
    requests: Arc<Mutex<Vec<String>>>,
}

impl StubServer {
    pub async fn start(routes: Vec<(&str, Vec<(u16, &str)>)>) -> Self {
        Self::start_with_hook(routes, |_| {}).await
    }

    /// Like [`StubServer::start`], running `hook` on every request before answering it.
    pub async fn start_with_hook(
        routes: Vec<(&str, Vec<(u16, &str)>)>,
        hook: impl Fn(&str) + Send + Sync + 'static,
    ) -> Self {
        let hook: Hook = Arc::new(hook);
        let routes: Routes = routes
            .into_iter()
            .map(|(path, responses)| {
                let responses = responses
                    .into_iter()
                    .map(|(status, body)| (status, body.to_string()))
                    .collect();
                (path.to_string(), responses)
            })
            .collect();
        let routes = Arc::new(Mutex::new(routes));
        let requests = Arc::new(Mutex::new(Vec::new()));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());

        let served = requests.clone();
        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                let routes = routes.clone();
                let served = served.clone();
                let hook = hook.clone();
                tokio::spawn(async move {
                    handle(stream, routes, served, hook).await;
                });
            }
        });

        Self { base, requests }
    }

    pub fn endpoints(&self) -> Endpoints {
        Endpoints::with_base(&self.base)
    }

    /// Paths requested so far, in arrival order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub fn hits(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

async fn handle(
    mut stream: TcpStream,
    routes: Arc<Mutex<Routes>>,
    served: Arc<Mutex<Vec<String>>>,
    hook: Hook,
) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        match stream.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }
    let head = String::from_utf8_lossy(&buf);
    let path = head
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .unwrap_or("/")
        .to_string();
    served.lock().unwrap().push(path.clone());
    hook(&path);

    let (status, body) = {
        let mut routes = routes.lock().unwrap();
        match routes.get_mut(&path) {
            Some(responses) if responses.len() > 1 => responses.pop_front().unwrap(),
            Some(responses) => responses.front().cloned().unwrap(),
            None => (
                404,
                r#"{"error":{"code":404,"message":"Not Found"}}"#.to_string(),
            ),
        }
    };

    let response = format!(
        "HTTP/1.1 {status} Stub\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    let _ = stream.write_all(response.as_bytes()).await;
    let _ = stream.shutdown().await;
}

/// Fast settings for tests: no real pacing, tiny backoff.
pub fn fast_settings() -> FetchSettings {
    FetchSettings {
        timeout_secs: 5,
        requests_per_second: 1_000,
        max_retries: 2,
        backoff_base_ms: 1,
        ..FetchSettings::default()
    }
}

pub fn events_path(date: &str) -> String {
    format!("/api/v1/sport/football/scheduled-events/{date}")
}

pub fn event_path(id: u64, kind: &str) -> String {
    format!("/api/v1/event/{id}/{kind}")
}

/// A client talking to the stub directly, whatever proxy the environment sets.
pub fn client(endpoints: Endpoints, settings: FetchSettings) -> SofaClient {
    let http = reqwest::Client::builder()
        .no_proxy()
        .timeout(settings.timeout())
        .build()
        .unwrap();
    SofaClient::with_client(http, endpoints, settings).unwrap()
}
