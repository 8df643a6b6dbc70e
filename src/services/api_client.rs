//! API 客户端 - 业务能力层
//!
//! 所有业务接口共用的请求封装：附带认证头、支持取消、统一错误转换

use crate::error::{ApiError, AppError, AppResult};
use crate::infrastructure::{HttpRequest, HttpResponse, HttpTransport, RequestBody};
use crate::models::upload::UploadFile;
use crate::services::session::SessionManager;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// 是否需要附带认证头
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Auth {
    Required,
    Anonymous,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HealthStatus {
    pub status: String,
}

/// API 客户端
///
/// 克隆成本很低，各服务各持一份。
#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn HttpTransport>,
    session: Arc<SessionManager>,
}

impl ApiClient {
    pub fn new(transport: Arc<dyn HttpTransport>, session: Arc<SessionManager>) -> Self {
        Self { transport, session }
    }

    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    /// 发送请求并返回原始响应（非 2xx 已转换为错误）
    pub async fn send(
        &self,
        request: HttpRequest,
        auth: Auth,
        cancel: &CancellationToken,
    ) -> AppResult<HttpResponse> {
        let endpoint = request.path.clone();
        let request = match auth {
            // 每次请求都重新生成认证头
            Auth::Required => request.headers(self.session.auth_header()),
            Auth::Anonymous => request,
        };

        if cancel.is_cancelled() {
            return Err(AppError::Cancelled);
        }

        debug!("📡 请求 {} {}", request.method.as_str(), endpoint);
        let response = tokio::select! {
            _ = cancel.cancelled() => {
                debug!("请求已取消: {}", endpoint);
                return Err(AppError::Cancelled);
            }
            response = self.transport.send(request) => response?,
        };

        if !response.is_success() {
            let err = ApiError::from_response(&endpoint, response.status, &response.body);
            warn!("⚠️ {} 返回 {}: {}", endpoint, response.status, err);
            return Err(err.into());
        }
        Ok(response)
    }

    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        auth: Auth,
        cancel: &CancellationToken,
    ) -> AppResult<T> {
        self.fetch_json(HttpRequest::get(path), auth, cancel).await
    }

    /// 发送任意请求并反序列化响应体
    pub async fn fetch_json<T: DeserializeOwned>(
        &self,
        request: HttpRequest,
        auth: Auth,
        cancel: &CancellationToken,
    ) -> AppResult<T> {
        let endpoint = request.path.clone();
        let response = self.send(request, auth, cancel).await?;
        response.json(&endpoint)
    }

    pub async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
        auth: Auth,
        cancel: &CancellationToken,
    ) -> AppResult<T> {
        let body: JsonValue =
            serde_json::to_value(body).map_err(|e| ApiError::decode(path, e))?;
        let response = self
            .send(HttpRequest::post(path).json(body), auth, cancel)
            .await?;
        response.json(path)
    }

    /// 以 multipart 上传单个文件
    pub async fn post_file<T: DeserializeOwned>(
        &self,
        path: &str,
        field: &str,
        file: &UploadFile,
        auth: Auth,
        cancel: &CancellationToken,
    ) -> AppResult<T> {
        let mut request = HttpRequest::post(path);
        request.body = RequestBody::Multipart {
            field: field.to_string(),
            file_name: file.file_name.clone(),
            mime: file.mime.clone(),
            bytes: file.bytes.clone(),
        };
        let response = self.send(request, auth, cancel).await?;
        response.json(path)
    }

    pub async fn delete(&self, path: &str, auth: Auth, cancel: &CancellationToken) -> AppResult<()> {
        self.send(HttpRequest::delete(path), auth, cancel).await?;
        Ok(())
    }

    /// 健康检查
    pub async fn health(&self) -> AppResult<HealthStatus> {
        self.get_json("/health", Auth::Anonymous, &CancellationToken::new())
            .await
    }
}

/// 把 2xx 响应里的 error 字段转换为应用错误
pub fn reject_application_error(endpoint: &str, error: Option<&str>) -> AppResult<()> {
    match error {
        Some(message) if !message.trim().is_empty() => {
            warn!("⚠️ {} 返回应用错误: {}", endpoint, message);
            Err(ApiError::application(endpoint, message).into())
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::{HttpMethod, MemoryStore, ScriptedTransport};
    use crate::services::navigation::LogNavigator;
    use crate::services::session::{LOGGED_IN_KEY, TOKEN_KEY, USER_KEY};
    use serde_json::json;

    fn client(entries: &[(&str, &str)]) -> (ApiClient, Arc<ScriptedTransport>) {
        let transport = Arc::new(ScriptedTransport::new());
        let session = Arc::new(SessionManager::new(
            Arc::new(MemoryStore::with_entries(entries)),
            transport.clone(),
            Arc::new(LogNavigator),
        ));
        session.initialize();
        (ApiClient::new(transport.clone(), session), transport)
    }

    #[tokio::test]
    async fn test_authenticated_request_carries_bearer_token() {
        let (api, transport) = client(&[
            (USER_KEY, r#"{"name":"Ada","email":"ada@example.com"}"#),
            (TOKEN_KEY, "abc123"),
            (LOGGED_IN_KEY, "true"),
        ]);
        transport.push_json(HttpMethod::Get, "/api/users/me", 200, json!({"ok": true}));

        let _: JsonValue = api
            .get_json("/api/users/me", Auth::Required, &CancellationToken::new())
            .await
            .unwrap();
        let request = transport.last_request("/api/users/me").unwrap();
        assert_eq!(request.header_value("Authorization"), Some("Bearer abc123"));
    }

    #[tokio::test]
    async fn test_non_success_status_becomes_status_error() {
        let (api, transport) = client(&[]);
        transport.push_json(HttpMethod::Post, "/solve-text", 401, json!({"detail": "Not authenticated"}));

        let err = api
            .post_json::<_, JsonValue>(
                "/solve-text",
                &json!({"question_text": "1+1"}),
                Auth::Required,
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Api(ApiError::Status { status: 401, .. })));
        assert_eq!(err.user_message(), "Not authenticated");
    }

    #[tokio::test]
    async fn test_cancelled_token_sends_nothing() {
        let (api, transport) = client(&[]);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = api
            .get_json::<JsonValue>("/health", Auth::Anonymous, &cancel)
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(transport.total_requests(), 0);
    }

    #[tokio::test]
    async fn test_cancel_during_flight_returns_cancelled() {
        let (api, transport) = client(&[]);
        let _release = transport.push_held(HttpMethod::Get, "/health", 200, json!({"status": "ok"}));
        let cancel = CancellationToken::new();

        let call = api.get_json::<HealthStatus>("/health", Auth::Anonymous, &cancel);
        let canceller = async {
            tokio::task::yield_now().await;
            cancel.cancel();
        };
        let (result, _) = tokio::join!(call, canceller);
        assert!(result.unwrap_err().is_cancelled());
    }

    #[test]
    fn test_application_error_field() {
        assert!(reject_application_error("/solve-text", None).is_ok());
        assert!(reject_application_error("/solve-text", Some("  ")).is_ok());
        let err = reject_application_error("/solve-text", Some("Bad input")).unwrap_err();
        assert_eq!(err.user_message(), "Bad input");
    }
}
