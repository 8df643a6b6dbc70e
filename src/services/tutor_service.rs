//! 解题服务 - 业务能力层
//!
//! 识别、解题、步骤追问、练习题、错因诊断、函数作图。只处理单次请求，不关心流程

use crate::error::{ApiError, AppResult};
use crate::models::solution::{ExplanationRequest, ExplanationResponse, SolutionResult};
use crate::models::tutor::{
    Diagnosis, GraphImage, ImageUploadResponse, PracticeProblem, PracticeRequest,
    RecognitionResponse,
};
use crate::infrastructure::HttpRequest;
use crate::models::upload::UploadFile;
use crate::services::api_client::{reject_application_error, ApiClient, Auth};
use crate::utils::truncate_text;
use regex::Regex;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

pub const UPLOAD_IMAGE_ENDPOINT: &str = "/upload-image";
pub const RECOGNIZE_DRAWING_ENDPOINT: &str = "/recognize-drawing";
pub const SOLVE_TEXT_ENDPOINT: &str = "/solve-text";
pub const EXPLAIN_STEP_ENDPOINT: &str = "/explain-step";
pub const PRACTICE_ENDPOINT: &str = "/generate-practice-problem";
pub const DIAGNOSE_ENDPOINT: &str = "/diagnose-solution";
pub const GRAPH_ENDPOINT: &str = "/generate-graph";
pub const TTS_ENDPOINT: &str = "/text-to-speech";

/// 解题服务
///
/// 职责：
/// - 每个方法对应一个后端接口
/// - 2xx 中的 error 字段转换为应用错误
/// - 返回的经验值写回会话
#[derive(Clone)]
pub struct TutorService {
    api: ApiClient,
}

impl TutorService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// 上传图片做 OCR，返回规范化后的文本
    pub async fn extract_image(&self, file: &UploadFile, cancel: &CancellationToken) -> AppResult<String> {
        info!("🖼️ 正在识别图片: {} ({} 字节)", file.file_name, file.size());
        let response: ImageUploadResponse = self
            .api
            .post_file(UPLOAD_IMAGE_ENDPOINT, "file", file, Auth::Anonymous, cancel)
            .await?;

        reject_application_error(UPLOAD_IMAGE_ENDPOINT, response.error.as_deref())?;
        if response.status != "success" {
            return Err(ApiError::application(
                UPLOAD_IMAGE_ENDPOINT,
                format!("OCR failed with status '{}'", response.status),
            )
            .into());
        }

        let text = normalize_extracted_text(response.extracted_text.as_deref().unwrap_or_default());
        info!("✓ 识别完成: {}", truncate_text(&text, 50));
        Ok(text)
    }

    /// 识别手写板图像
    pub async fn recognize_drawing(&self, data_url: &str, cancel: &CancellationToken) -> AppResult<String> {
        let response: RecognitionResponse = self
            .api
            .post_json(
                RECOGNIZE_DRAWING_ENDPOINT,
                &json!({ "drawing_data_url": data_url }),
                Auth::Anonymous,
                cancel,
            )
            .await?;
        reject_application_error(RECOGNIZE_DRAWING_ENDPOINT, response.error.as_deref())?;
        Ok(normalize_extracted_text(
            response.recognized_text.as_deref().unwrap_or_default(),
        ))
    }

    /// 提交题目文本，返回分步解答
    pub async fn solve(&self, question_text: &str, cancel: &CancellationToken) -> AppResult<SolutionResult> {
        info!("🧮 正在解题: {}", truncate_text(question_text, 80));
        let result: SolutionResult = self
            .api
            .post_json(
                SOLVE_TEXT_ENDPOINT,
                &json!({ "question_text": question_text }),
                Auth::Required,
                cancel,
            )
            .await?;

        // 失败的解答也可能带回经验值
        self.api.session().record_xp(result.updated_xp);
        reject_application_error(SOLVE_TEXT_ENDPOINT, result.error.as_deref())?;
        info!("✓ 解题完成，共 {} 步", result.steps.len());
        Ok(result)
    }

    /// 追问某个步骤
    pub async fn explain(&self, request: &ExplanationRequest, cancel: &CancellationToken) -> AppResult<String> {
        debug!(
            "追问第 {} 步 ({})",
            request.step_number_to_explain,
            request.query_type.as_str()
        );
        let response: ExplanationResponse = self
            .api
            .post_json(EXPLAIN_STEP_ENDPOINT, request, Auth::Required, cancel)
            .await?;
        self.api.session().record_xp(response.updated_xp);
        reject_application_error(EXPLAIN_STEP_ENDPOINT, response.error.as_deref())?;
        Ok(response.explanation)
    }

    /// 生成练习题
    pub async fn practice(
        &self,
        topic: &str,
        previous_problem: Option<&str>,
        cancel: &CancellationToken,
    ) -> AppResult<PracticeProblem> {
        let request = PracticeRequest {
            topic: topic.trim().to_string(),
            previous_problem: previous_problem.map(str::to_string),
        };
        if request.topic.is_empty() {
            return Err(crate::error::ValidationError::EmptyInput.into());
        }
        let problem: PracticeProblem = self
            .api
            .post_json(PRACTICE_ENDPOINT, &request, Auth::Required, cancel)
            .await?;
        self.api.session().record_xp(problem.updated_xp);
        reject_application_error(PRACTICE_ENDPOINT, problem.error.as_deref())?;
        Ok(problem)
    }

    /// 诊断用户自己的解题步骤
    pub async fn diagnose(
        &self,
        problem_text: &str,
        user_steps: &str,
        cancel: &CancellationToken,
    ) -> AppResult<Diagnosis> {
        if problem_text.trim().is_empty() || user_steps.trim().is_empty() {
            return Err(crate::error::ValidationError::EmptyInput.into());
        }
        let diagnosis: Diagnosis = self
            .api
            .post_json(
                DIAGNOSE_ENDPOINT,
                &json!({ "problem_text": problem_text, "user_steps": user_steps }),
                Auth::Required,
                cancel,
            )
            .await?;
        reject_application_error(DIAGNOSE_ENDPOINT, diagnosis.error.as_deref())?;
        Ok(diagnosis)
    }

    /// 函数作图，返回图片 data URL
    pub async fn graph(&self, equation: &str, cancel: &CancellationToken) -> AppResult<String> {
        if equation.trim().is_empty() {
            return Err(crate::error::ValidationError::EmptyInput.into());
        }
        let graph: GraphImage = self
            .api
            .post_json(GRAPH_ENDPOINT, &json!({ "equation": equation }), Auth::Required, cancel)
            .await?;
        reject_application_error(GRAPH_ENDPOINT, graph.error.as_deref())?;
        graph
            .image_data_url
            .ok_or_else(|| ApiError::application(GRAPH_ENDPOINT, "No graph image returned").into())
    }

    /// 朗读文本，返回 MP3 字节
    pub async fn text_to_speech(&self, text: &str, cancel: &CancellationToken) -> AppResult<Vec<u8>> {
        if text.trim().is_empty() {
            return Err(crate::error::ValidationError::EmptyInput.into());
        }
        let request = HttpRequest::get(TTS_ENDPOINT).query("text", text);
        let response = self.api.send(request, Auth::Anonymous, cancel).await?;
        Ok(response.body)
    }
}

/// 规范化识别出的文本
///
/// 统一换行符，去掉行尾空白，最多保留一个空行，去掉首尾空白。
pub fn normalize_extracted_text(raw: &str) -> String {
    let unified = raw.replace("\r\n", "\n").replace('\r', "\n");
    let trimmed_lines = unified
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n");
    let mut text = trimmed_lines;
    if let Ok(re) = Regex::new(r"\n{3,}") {
        text = re.replace_all(&text, "\n\n").to_string();
    }
    text.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::infrastructure::{HttpMethod, HttpResponse, MemoryStore, RequestBody, ScriptedTransport};
    use crate::models::solution::{ExplainKind, Step};
    use crate::services::navigation::LogNavigator;
    use crate::services::session::{SessionManager, LOGGED_IN_KEY, TOKEN_KEY, USER_KEY};
    use std::sync::Arc;

    fn service() -> (TutorService, Arc<ScriptedTransport>, Arc<SessionManager>) {
        let transport = Arc::new(ScriptedTransport::new());
        let session = Arc::new(SessionManager::new(
            Arc::new(MemoryStore::with_entries(&[
                (USER_KEY, r#"{"name":"Ada","email":"ada@example.com","current_xp":5}"#),
                (TOKEN_KEY, "abc123"),
                (LOGGED_IN_KEY, "true"),
            ])),
            transport.clone(),
            Arc::new(LogNavigator),
        ));
        session.initialize();
        let api = ApiClient::new(transport.clone(), session.clone());
        (TutorService::new(api), transport, session)
    }

    #[test]
    fn test_normalize_extracted_text() {
        let raw = "  2x + 5 = 11   \r\n\r\n\r\n\r\nSolve for x.\t\n";
        assert_eq!(normalize_extracted_text(raw), "2x + 5 = 11\n\nSolve for x.");
        assert_eq!(normalize_extracted_text("   \n  "), "");
    }

    #[tokio::test]
    async fn test_extract_image_sends_multipart_file() {
        let (tutor, transport, _) = service();
        transport.push_json(
            HttpMethod::Post,
            UPLOAD_IMAGE_ENDPOINT,
            200,
            json!({"status": "success", "extracted_text": "x^2 = 4\r\n"}),
        );

        let file = UploadFile::new("eq.png", "image/png", vec![1, 2, 3]);
        let text = tutor
            .extract_image(&file, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(text, "x^2 = 4");

        let request = transport.last_request(UPLOAD_IMAGE_ENDPOINT).unwrap();
        assert!(matches!(
            request.body,
            RequestBody::Multipart { ref field, ref mime, .. } if field == "file" && mime == "image/png"
        ));
    }

    #[tokio::test]
    async fn test_extract_image_error_status_is_application_error() {
        let (tutor, transport, _) = service();
        transport.push_json(
            HttpMethod::Post,
            UPLOAD_IMAGE_ENDPOINT,
            200,
            json!({"status": "error", "error": "Failed to process image: blurry"}),
        );

        let file = UploadFile::new("eq.png", "image/png", vec![1]);
        let err = tutor
            .extract_image(&file, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Api(ApiError::Application { .. })));
        assert_eq!(err.user_message(), "Failed to process image: blurry");
    }

    #[tokio::test]
    async fn test_solve_records_xp_and_uses_auth() {
        let (tutor, transport, session) = service();
        transport.push_json(
            HttpMethod::Post,
            SOLVE_TEXT_ENDPOINT,
            200,
            json!({
                "original_problem": "2x+5=11",
                "steps": [{"step_number": 1, "explanation": "Subtract 5"}],
                "final_answer": "x=3",
                "updated_xp": 15
            }),
        );

        let result = tutor.solve("2x+5=11", &CancellationToken::new()).await.unwrap();
        assert_eq!(result.final_answer.as_deref(), Some("x=3"));
        assert_eq!(session.current_user().unwrap().current_xp, Some(15));

        let request = transport.last_request(SOLVE_TEXT_ENDPOINT).unwrap();
        assert_eq!(request.header_value("Authorization"), Some("Bearer abc123"));
        assert_eq!(request.body, RequestBody::Json(json!({"question_text": "2x+5=11"})));
    }

    #[tokio::test]
    async fn test_failed_solve_still_records_xp() {
        let (tutor, transport, session) = service();
        transport.push_json(
            HttpMethod::Post,
            SOLVE_TEXT_ENDPOINT,
            200,
            json!({"steps": [], "error": "Could not parse the problem", "updated_xp": 7}),
        );

        let err = tutor.solve("???", &CancellationToken::new()).await.unwrap_err();
        assert_eq!(err.user_message(), "Could not parse the problem");
        assert_eq!(session.current_user().unwrap().current_xp, Some(7));
    }

    #[tokio::test]
    async fn test_explain_serializes_query_type() {
        let (tutor, transport, _) = service();
        transport.push_json(
            HttpMethod::Post,
            EXPLAIN_STEP_ENDPOINT,
            200,
            json!({"explanation": "Because subtraction undoes addition."}),
        );

        let request = ExplanationRequest {
            problem_text: "2x+5=11".into(),
            all_steps: vec![Step {
                step_number: 1,
                explanation: "Subtract 5".into(),
            }],
            step_number_to_explain: 1,
            query_type: ExplainKind::Why,
        };
        let text = tutor.explain(&request, &CancellationToken::new()).await.unwrap();
        assert_eq!(text, "Because subtraction undoes addition.");

        let sent = transport.last_request(EXPLAIN_STEP_ENDPOINT).unwrap();
        match sent.body {
            RequestBody::Json(body) => {
                assert_eq!(body["query_type"], "why");
                assert_eq!(body["step_number_to_explain"], 1);
            }
            other => panic!("unexpected body: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_inputs_never_reach_network() {
        let (tutor, transport, _) = service();
        let cancel = CancellationToken::new();
        assert!(tutor.practice("  ", None, &cancel).await.unwrap_err().is_validation());
        assert!(tutor.diagnose("x=1", "", &cancel).await.unwrap_err().is_validation());
        assert!(tutor.graph("", &cancel).await.unwrap_err().is_validation());
        assert!(tutor.text_to_speech(" ", &cancel).await.unwrap_err().is_validation());
        assert_eq!(transport.total_requests(), 0);
    }

    #[tokio::test]
    async fn test_text_to_speech_sends_text_as_query() {
        let (tutor, transport, _) = service();
        transport.push(HttpMethod::Get, TTS_ENDPOINT, HttpResponse::new(200, vec![0xFF, 0xFB]));

        let audio = tutor
            .text_to_speech("x = 3?", &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(audio, vec![0xFF, 0xFB]);
        let request = transport.last_request(TTS_ENDPOINT).unwrap();
        assert_eq!(request.path, TTS_ENDPOINT);
        assert_eq!(request.query, vec![("text".to_string(), "x = 3?".to_string())]);
    }

    #[tokio::test]
    async fn test_graph_without_image_is_error() {
        let (tutor, transport, _) = service();
        transport.push_json(HttpMethod::Post, GRAPH_ENDPOINT, 200, json!({"image_data_url": null}));
        let err = tutor.graph("y=x^2", &CancellationToken::new()).await.unwrap_err();
        assert_eq!(err.user_message(), "No graph image returned");
    }
}
