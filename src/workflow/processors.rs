//! 管线阶段的具体实现
//!
//! 把业务服务适配成流程需要的 `Extractor` / `Processor` / `Explainer`

use crate::error::AppResult;
use crate::models::chat::ChatMessage;
use crate::models::cs::{CsFeedback, CsQuestion, CsSubmission};
use crate::models::solution::{ExplanationRequest, SolutionResult};
use crate::services::{ChatService, CsService, TutorService};
use crate::workflow::pipeline::{Explainer, Extractor, Processor, RawInput};
use async_trait::async_trait;
use std::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// 图片 OCR 与手写识别
pub struct TutorExtractor {
    tutor: TutorService,
}

impl TutorExtractor {
    pub fn new(tutor: TutorService) -> Self {
        Self { tutor }
    }
}

#[async_trait]
impl Extractor for TutorExtractor {
    async fn extract(&self, input: &RawInput, cancel: &CancellationToken) -> AppResult<String> {
        match input {
            RawInput::Image(file) => self.tutor.extract_image(file, cancel).await,
            RawInput::Drawing(data_url) => self.tutor.recognize_drawing(data_url, cancel).await,
        }
    }
}

/// 解题
pub struct SolveProcessor {
    tutor: TutorService,
}

impl SolveProcessor {
    pub fn new(tutor: TutorService) -> Self {
        Self { tutor }
    }
}

#[async_trait]
impl Processor for SolveProcessor {
    type Output = SolutionResult;

    fn name(&self) -> &'static str {
        "解题"
    }

    async fn process(&self, text: &str, cancel: &CancellationToken) -> AppResult<SolutionResult> {
        self.tutor.solve(text, cancel).await
    }
}

pub struct TutorExplainer {
    tutor: TutorService,
}

impl TutorExplainer {
    pub fn new(tutor: TutorService) -> Self {
        Self { tutor }
    }
}

#[async_trait]
impl Explainer for TutorExplainer {
    async fn explain(&self, request: &ExplanationRequest, cancel: &CancellationToken) -> AppResult<String> {
        self.tutor.explain(request, cancel).await
    }
}

/// 对话
///
/// 持有本次对话的历史，只有成功的问答才会追加进去。
pub struct ChatProcessor {
    chat: ChatService,
    history: Mutex<Vec<ChatMessage>>,
}

impl ChatProcessor {
    pub fn new(chat: ChatService) -> Self {
        Self {
            chat,
            history: Mutex::new(Vec::new()),
        }
    }

    pub fn history(&self) -> Vec<ChatMessage> {
        self.history.lock().map(|h| h.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Processor for ChatProcessor {
    type Output = String;

    fn name(&self) -> &'static str {
        "对话"
    }

    async fn process(&self, text: &str, cancel: &CancellationToken) -> AppResult<String> {
        let history = self.history();
        let reply = self.chat.ask(text, &history, cancel).await?;
        if let Ok(mut history) = self.history.lock() {
            history.push(ChatMessage::user(text));
            history.push(ChatMessage::ai(reply.answer.clone()));
        }
        Ok(reply.answer)
    }
}

/// 提交一道 CS 题的答案
pub struct CsSubmissionProcessor {
    cs: CsService,
    question: CsQuestion,
}

impl CsSubmissionProcessor {
    pub fn new(cs: CsService, question: CsQuestion) -> Self {
        Self { cs, question }
    }

    pub fn question(&self) -> &CsQuestion {
        &self.question
    }
}

#[async_trait]
impl Processor for CsSubmissionProcessor {
    type Output = CsFeedback;

    fn name(&self) -> &'static str {
        "提交答案"
    }

    async fn process(&self, text: &str, cancel: &CancellationToken) -> AppResult<CsFeedback> {
        let submission = CsSubmission::for_question(&self.question, text);
        self.cs.submit(&submission, cancel).await
    }
}
