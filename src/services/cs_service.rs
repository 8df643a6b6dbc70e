//! 计算机科学练习服务 - 业务能力层

use crate::error::{AppResult, ValidationError};
use crate::models::cs::{
    CsFeedback, CsQuestion, CsQuestionRequest, CsQuestionType, CsSubmission, LearningAid,
    LearningAidRequest, LearningAidType,
};
use crate::services::api_client::{ApiClient, Auth};
use tokio_util::sync::CancellationToken;
use tracing::info;

pub const CS_QUESTIONS_ENDPOINT: &str = "/cs/questions";
pub const CS_SUBMIT_ENDPOINT: &str = "/cs/submit";
pub const CS_LEARNING_AIDS_ENDPOINT: &str = "/cs/learning-aids";

#[derive(Clone)]
pub struct CsService {
    api: ApiClient,
}

impl CsService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// 按章节出题
    pub async fn questions(
        &self,
        chapter_name: &str,
        requested_type: Option<CsQuestionType>,
        cancel: &CancellationToken,
    ) -> AppResult<CsQuestion> {
        if chapter_name.trim().is_empty() {
            return Err(ValidationError::EmptyInput.into());
        }
        let request = CsQuestionRequest {
            chapter_name: chapter_name.to_string(),
            requested_question_type: requested_type,
        };
        let question: CsQuestion = self
            .api
            .post_json(CS_QUESTIONS_ENDPOINT, &request, Auth::Anonymous, cancel)
            .await?;
        info!("📘 获得题目 {} ({:?})", question.id(), question.question_type());
        Ok(question)
    }

    /// 提交答案
    pub async fn submit(&self, submission: &CsSubmission, cancel: &CancellationToken) -> AppResult<CsFeedback> {
        if submission.answer.trim().is_empty() {
            return Err(ValidationError::EmptyInput.into());
        }
        self.api
            .post_json(CS_SUBMIT_ENDPOINT, submission, Auth::Anonymous, cancel)
            .await
    }

    pub async fn learning_aid(
        &self,
        chapter_name: &str,
        aid_type: LearningAidType,
        cancel: &CancellationToken,
    ) -> AppResult<LearningAid> {
        if chapter_name.trim().is_empty() {
            return Err(ValidationError::EmptyInput.into());
        }
        let request = LearningAidRequest {
            chapter_name: chapter_name.to_string(),
            aid_type,
        };
        self.api
            .post_json(CS_LEARNING_AIDS_ENDPOINT, &request, Auth::Anonymous, cancel)
            .await
    }
}
