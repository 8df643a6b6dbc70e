//! 每日一题服务 - 业务能力层

use crate::error::{AppResult, ValidationError};
use crate::models::puzzle::{DailyPuzzle, PuzzleAnswer, PuzzleVerdict};
use crate::services::api_client::{ApiClient, Auth};
use tokio_util::sync::CancellationToken;
use tracing::info;

pub const DAILY_PUZZLE_ENDPOINT: &str = "/api/daily-puzzle";
pub const SUBMIT_PUZZLE_ENDPOINT: &str = "/api/submit-puzzle";

#[derive(Clone)]
pub struct PuzzleService {
    api: ApiClient,
}

impl PuzzleService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub async fn daily(&self, cancel: &CancellationToken) -> AppResult<DailyPuzzle> {
        self.api
            .get_json(DAILY_PUZZLE_ENDPOINT, Auth::Required, cancel)
            .await
    }

    pub async fn submit(
        &self,
        puzzle_id: &str,
        user_answer: &str,
        cancel: &CancellationToken,
    ) -> AppResult<PuzzleVerdict> {
        if user_answer.trim().is_empty() {
            return Err(ValidationError::EmptyInput.into());
        }
        let answer = PuzzleAnswer {
            puzzle_id: puzzle_id.to_string(),
            user_answer: user_answer.trim().to_string(),
        };
        let verdict: PuzzleVerdict = self
            .api
            .post_json(SUBMIT_PUZZLE_ENDPOINT, &answer, Auth::Required, cancel)
            .await?;
        info!(
            "🧩 每日一题 {}: {}",
            verdict.puzzle_id,
            if verdict.is_correct { "正确" } else { "错误" }
        );
        Ok(verdict)
    }
}
