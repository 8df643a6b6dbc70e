//! 脚本化传输 - 测试替身
//!
//! 按 (方法, 路径) 预先排好响应队列，并记录收到的每个请求

use crate::error::{ApiError, AppResult};
use crate::infrastructure::http::{HttpMethod, HttpRequest, HttpResponse, HttpTransport};
use async_trait::async_trait;
use serde_json::{json, Value as JsonValue};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

enum Scripted {
    Respond(HttpResponse),
    Fail(ApiError),
    /// 等到 `Notify` 放行后才返回
    Held(Arc<Notify>, HttpResponse),
}

#[derive(Default)]
pub struct ScriptedTransport {
    scripts: Mutex<HashMap<(HttpMethod, String), VecDeque<Scripted>>>,
    requests: Mutex<Vec<HttpRequest>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

/// 请求返回或被丢弃时减少在途计数
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, method: HttpMethod, path: &str, response: HttpResponse) {
        self.enqueue(method, path, Scripted::Respond(response));
    }

    pub fn push_json(&self, method: HttpMethod, path: &str, status: u16, body: JsonValue) {
        self.push(method, path, HttpResponse::new(status, body.to_string()));
    }

    pub fn push_error(&self, method: HttpMethod, path: &str, error: ApiError) {
        self.enqueue(method, path, Scripted::Fail(error));
    }

    /// 排入一个被挂起的响应，返回放行用的 `Notify`
    pub fn push_held(&self, method: HttpMethod, path: &str, status: u16, body: JsonValue) -> Arc<Notify> {
        let release = Arc::new(Notify::new());
        self.enqueue(
            method,
            path,
            Scripted::Held(release.clone(), HttpResponse::new(status, body.to_string())),
        );
        release
    }

    /// 已收到的全部请求
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    /// 指定路径收到的请求数
    pub fn request_count(&self, path: &str) -> usize {
        self.requests()
            .iter()
            .filter(|r| r.path == path)
            .count()
    }

    /// 同一时刻最多有几个请求在途
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn total_requests(&self) -> usize {
        self.requests().len()
    }

    pub fn last_request(&self, path: &str) -> Option<HttpRequest> {
        self.requests()
            .into_iter()
            .rev()
            .find(|r| r.path == path)
    }

    fn enqueue(&self, method: HttpMethod, path: &str, scripted: Scripted) {
        if let Ok(mut scripts) = self.scripts.lock() {
            scripts
                .entry((method, path.to_string()))
                .or_default()
                .push_back(scripted);
        }
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn send(&self, request: HttpRequest) -> AppResult<HttpResponse> {
        let key = (request.method, request.path.clone());
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request);
        }
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let _in_flight = InFlight(&self.in_flight);

        let next = self
            .scripts
            .lock()
            .ok()
            .and_then(|mut scripts| scripts.get_mut(&key).and_then(|q| q.pop_front()));

        match next {
            Some(Scripted::Respond(response)) => Ok(response),
            Some(Scripted::Fail(error)) => Err(error.into()),
            Some(Scripted::Held(release, response)) => {
                release.notified().await;
                Ok(response)
            }
            None => Ok(HttpResponse::new(
                404,
                json!({ "detail": format!("no script for {} {}", key.0.as_str(), key.1) }).to_string(),
            )),
        }
    }
}
