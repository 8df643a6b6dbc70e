//! 流程上下文
//!
//! 封装"这是哪个页面上的第几个流程"这一信息

use std::fmt::Display;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_FLOW_ID: AtomicU64 = AtomicU64::new(1);

/// 流程上下文
///
/// 每个流程实例一份，只用于日志
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowCtx {
    /// 进程内唯一的流程编号
    pub flow_id: u64,

    /// 所在页面
    pub screen: &'static str,
}

impl FlowCtx {
    pub fn new(screen: &'static str) -> Self {
        Self {
            flow_id: NEXT_FLOW_ID.fetch_add(1, Ordering::Relaxed),
            screen,
        }
    }
}

impl Display for FlowCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[流程 #{} {}]", self.flow_id, self.screen)
    }
}
