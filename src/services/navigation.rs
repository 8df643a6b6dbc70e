//! 页面跳转能力
//!
//! 会话层只需要"跳到登录页"，具体怎么跳由调用方注入

use std::sync::Mutex;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Login,
    Register,
    Dashboard,
    Solver,
    Chat,
    Bookmarks,
    CsPractice,
}

impl Route {
    /// 需要登录才能访问的页面
    pub fn is_protected(self) -> bool {
        !matches!(self, Route::Login | Route::Register)
    }

    pub fn path(self) -> &'static str {
        match self {
            Route::Login => "/login",
            Route::Register => "/register",
            Route::Dashboard => "/dashboard",
            Route::Solver => "/solver",
            Route::Chat => "/chat",
            Route::Bookmarks => "/bookmarks",
            Route::CsPractice => "/cs",
        }
    }
}

pub trait Navigator: Send + Sync {
    fn navigate(&self, route: Route);
}

/// 只记日志的默认实现（命令行下没有页面可跳）
#[derive(Debug, Default)]
pub struct LogNavigator;

impl Navigator for LogNavigator {
    fn navigate(&self, route: Route) {
        info!("➡️ 跳转到 {}", route.path());
    }
}

/// 记录跳转历史
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    visited: Mutex<Vec<Route>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn visited(&self) -> Vec<Route> {
        self.visited.lock().map(|v| v.clone()).unwrap_or_default()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, route: Route) {
        if let Ok(mut visited) = self.visited.lock() {
            visited.push(route);
        }
    }
}
