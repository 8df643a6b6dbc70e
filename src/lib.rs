//! # MathWiz Client
//!
//! MathWiz 辅导后端的 Rust 客户端：登录会话、拍题识别、分步解题、逐步追问、
//! 对话、收藏、CS 练习、每日一题
//!
//! ## 架构设计
//!
//! 本系统采用分层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有稀缺资源（持久化存储、HTTP 客户端），只暴露能力
//! - `KeyValueStore` - 成组写入/清除的键值存储（`FileStore` / `MemoryStore`）
//! - `HttpTransport` - 发送单个 HTTP 请求（`ReqwestTransport` / `ScriptedTransport`）
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，每个服务对应后端的一组接口
//! - `SessionManager` - 会话的唯一持有者，提供登录、登出、认证头
//! - `ApiClient` - 附带认证头、支持取消、统一错误转换
//! - `TutorService` / `ChatService` / `BookmarkService` / `CsService` / `PuzzleService` / `AccountService`
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一次输入"的完整处理流程
//! - `FlowCtx` - 上下文封装（流程编号 + 页面）
//! - `Orchestrator` - 流程编排（识别 → 确认 → 处理 → 追问）
//!
//! ### ④ 应用层（App）
//! - `app` - 组装依赖，按页面创建流程实例
//!
//! ## 模块结构

pub mod app;
pub mod config;
pub mod error;
pub mod infrastructure;
pub mod logger;
pub mod models;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use app::App;
pub use config::Config;
pub use error::{AppError, AppResult};
pub use infrastructure::{FileStore, HttpTransport, KeyValueStore, MemoryStore, ReqwestTransport};
pub use models::{SolutionResult, UploadFile};
pub use services::{ApiClient, SessionManager};
pub use workflow::{FlowPhase, FlowView, Orchestrator};
