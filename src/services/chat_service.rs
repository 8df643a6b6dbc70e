//! 对话服务 - 业务能力层

use crate::error::{AppResult, ValidationError};
use crate::models::chat::{ChatMessage, ChatReply, ChatRequest};
use crate::services::api_client::{ApiClient, Auth};
use crate::utils::truncate_text;
use tokio_util::sync::CancellationToken;
use tracing::info;

pub const CHAT_ENDPOINT: &str = "/api/chat";

/// 对话服务
///
/// 不保存历史，历史由调用方（对话流程）持有并随请求发送。
#[derive(Clone)]
pub struct ChatService {
    api: ApiClient,
}

impl ChatService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub async fn ask(
        &self,
        question: &str,
        history: &[ChatMessage],
        cancel: &CancellationToken,
    ) -> AppResult<ChatReply> {
        if question.trim().is_empty() {
            return Err(ValidationError::EmptyInput.into());
        }
        info!(
            "💬 提问: {} (历史 {} 条)",
            truncate_text(question, 80),
            history.len()
        );
        let request = ChatRequest {
            question: question.to_string(),
            history: history.to_vec(),
        };
        self.api
            .post_json(CHAT_ENDPOINT, &request, Auth::Required, cancel)
            .await
    }
}
