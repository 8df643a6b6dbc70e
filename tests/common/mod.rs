#![allow(dead_code)]

use mathwiz_client::app::App;
use mathwiz_client::config::Config;
use mathwiz_client::infrastructure::{MemoryStore, ScriptedTransport};
use mathwiz_client::models::UploadFile;
use mathwiz_client::services::navigation::RecordingNavigator;
use mathwiz_client::services::session::{LOGGED_IN_KEY, TOKEN_KEY, USER_KEY};
use std::sync::Arc;

pub const MB: usize = 1024 * 1024;

pub struct Harness {
    pub app: App,
    pub transport: Arc<ScriptedTransport>,
    pub store: Arc<MemoryStore>,
    pub navigator: Arc<RecordingNavigator>,
}

/// 未登录的应用
pub fn anonymous() -> Harness {
    build(MemoryStore::new())
}

/// 已登录（token = abc123）的应用
pub fn logged_in() -> Harness {
    build(MemoryStore::with_entries(&[
        (USER_KEY, r#"{"name":"Ada","email":"ada@example.com","current_xp":10}"#),
        (TOKEN_KEY, "abc123"),
        (LOGGED_IN_KEY, "true"),
    ]))
}

fn build(store: MemoryStore) -> Harness {
    let transport = Arc::new(ScriptedTransport::new());
    let store = Arc::new(store);
    let navigator = Arc::new(RecordingNavigator::new());
    let app = App::from_parts(
        Config::default(),
        store.clone(),
        transport.clone(),
        navigator.clone(),
    );
    Harness {
        app,
        transport,
        store,
        navigator,
    }
}

pub fn jpeg(size: usize) -> UploadFile {
    UploadFile::new("problem.jpg", "image/jpeg", vec![0xFF; size])
}

/// 让出执行权，直到某个接口收到指定数量的请求
pub async fn wait_for_requests(transport: &ScriptedTransport, path: &str, count: usize) {
    while transport.request_count(path) < count {
        tokio::task::yield_now().await;
    }
}
