//! In-process data server for orchestrator and controller tests.

use std::{collections::HashMap, sync::Arc, time::Duration};

use anyhow::Result;
use axum::{
    extract::State,
    http::{header::CONTENT_TYPE, StatusCode, Uri},
    response::{IntoResponse, Response},
    Router,
};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::Mutex};

#[derive(Clone)]
struct Route {
    status: StatusCode,
    body: String,
    delay: Duration,
}

#[derive(Clone)]
struct ServerState {
    routes: Arc<HashMap<String, Route>>,
    requests: Arc<Mutex<Vec<String>>>,
}

#[derive(Default)]
pub(crate) struct DataServerBuilder {
    routes: HashMap<String, Route>,
}

pub(crate) struct DataServer {
    pub base_url: String,
    requests: Arc<Mutex<Vec<String>>>,
}

impl DataServerBuilder {
    pub fn json(self, path: &str, body: Value) -> Self {
        self.delayed_json(path, body, Duration::ZERO)
    }

    pub fn delayed_json(mut self, path: &str, body: Value, delay: Duration) -> Self {
        self.routes.insert(
            path.to_string(),
            Route {
                status: StatusCode::OK,
                body: body.to_string(),
                delay,
            },
        );
        self
    }

    pub fn status(mut self, path: &str, status: StatusCode) -> Self {
        self.routes.insert(
            path.to_string(),
            Route {
                status,
                body: String::new(),
                delay: Duration::ZERO,
            },
        );
        self
    }

    pub async fn spawn(self) -> Result<DataServer> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let requests = Arc::new(Mutex::new(Vec::new()));
        let state = ServerState {
            routes: Arc::new(self.routes),
            requests: Arc::clone(&requests),
        };
        let app = Router::new().fallback(serve).with_state(state);
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        Ok(DataServer {
            base_url: format!("http://{addr}"),
            requests,
        })
    }
}

impl DataServer {
    pub fn builder() -> DataServerBuilder {
        DataServerBuilder::default()
    }

    /// Request targets seen so far, path and query.
    pub async fn requests(&self) -> Vec<String> {
        self.requests.lock().await.clone()
    }
}

async fn serve(State(state): State<ServerState>, uri: Uri) -> Response {
    state.requests.lock().await.push(uri.to_string());
    let Some(route) = state.routes.get(uri.path()).cloned() else {
        return StatusCode::NOT_FOUND.into_response();
    };
    if !route.delay.is_zero() {
        tokio::time::sleep(route.delay).await;
    }
    (route.status, [(CONTENT_TYPE, "application/json")], route.body).into_response()
}

/// Daily series starting 2021-01-01.
pub(crate) fn series_json(counts: &[i64]) -> Value {
    let start = chrono::NaiveDate::from_ymd_opt(2021, 1, 1).expect("date");
    Value::Array(
        counts
            .iter()
            .enumerate()
            .map(|(i, count)| {
                let date = start + chrono::Days::new(i as u64);
                json!([date.format("%Y-%m-%d").to_string(), count])
            })
            .collect(),
    )
}

pub(crate) fn cases_json(name: &str, population: Option<u64>, counts: &[i64]) -> Value {
    json!({ "name": name, "population": population, "cases": series_json(counts) })
}

pub(crate) fn deaths_json(name: &str, population: Option<u64>, counts: &[i64]) -> Value {
    json!({ "name": name, "population": population, "deaths": series_json(counts) })
}
