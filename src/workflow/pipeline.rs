//! 处理管线的三个阶段
//!
//! 识别（可选）→ 处理（必需）→ 逐步追问（可选）

use crate::error::AppResult;
use crate::models::solution::ExplanationRequest;
use crate::models::upload::UploadFile;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// 需要先识别成文本的原始输入
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawInput {
    /// 图片或 PDF
    Image(UploadFile),
    /// 手写板导出的 data URL
    Drawing(String),
}

/// 识别阶段：原始输入 → 文本
#[async_trait]
pub trait Extractor: Send + Sync {
    async fn extract(&self, input: &RawInput, cancel: &CancellationToken) -> AppResult<String>;
}

/// 处理阶段：文本 → 结构化结果
#[async_trait]
pub trait Processor: Send + Sync {
    type Output: Clone + Send + Sync + 'static;

    /// 用于日志和 `Busy` 错误
    fn name(&self) -> &'static str;

    async fn process(&self, text: &str, cancel: &CancellationToken) -> AppResult<Self::Output>;
}

/// 追问阶段：对解答中的某一步提问
#[async_trait]
pub trait Explainer: Send + Sync {
    async fn explain(&self, request: &ExplanationRequest, cancel: &CancellationToken) -> AppResult<String>;
}
