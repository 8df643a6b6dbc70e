//! 账户服务 - 业务能力层
//!
//! 注册和读取个人资料；登录/登出在会话管理器里

use crate::error::{AppResult, ValidationError};
use crate::models::user::{RegistrationRequest, RegistrationResponse, UserProfile};
use crate::services::api_client::{reject_application_error, ApiClient, Auth};
use tokio_util::sync::CancellationToken;
use tracing::info;

pub const REGISTER_ENDPOINT: &str = "/api/register";
pub const ME_ENDPOINT: &str = "/api/users/me";
pub const USER_DATA_ENDPOINT: &str = "/user/data";

const MIN_PASSWORD_LEN: usize = 6;

#[derive(Clone)]
pub struct AccountService {
    api: ApiClient,
}

impl AccountService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// 注册新用户，返回服务端消息
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
        cancel: &CancellationToken,
    ) -> AppResult<String> {
        let request = validate_registration(name, email, password)?;
        let response: RegistrationResponse = self
            .api
            .post_json(REGISTER_ENDPOINT, &request, Auth::Anonymous, cancel)
            .await?;
        reject_application_error(REGISTER_ENDPOINT, response.error.as_deref())?;
        info!("✓ 注册成功: {}", request.email);
        Ok(response.message)
    }

    pub async fn me(&self, cancel: &CancellationToken) -> AppResult<UserProfile> {
        let profile: UserProfile = self.api.get_json(ME_ENDPOINT, Auth::Required, cancel).await?;
        self.api.session().record_xp(Some(profile.current_xp));
        Ok(profile)
    }

    /// 读取用户数据（含经验值）
    pub async fn user_data(&self, cancel: &CancellationToken) -> AppResult<UserProfile> {
        let profile: UserProfile = self
            .api
            .get_json(USER_DATA_ENDPOINT, Auth::Required, cancel)
            .await?;
        self.api.session().record_xp(Some(profile.current_xp));
        Ok(profile)
    }
}

fn validate_registration(name: &str, email: &str, password: &str) -> AppResult<RegistrationRequest> {
    let invalid = |reason: &str| ValidationError::Registration {
        reason: reason.to_string(),
    };
    let (name, email) = (name.trim(), email.trim());
    if name.is_empty() {
        return Err(invalid("name is required").into());
    }
    if email.is_empty() || !email.contains('@') {
        return Err(invalid("a valid email is required").into());
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(invalid("password must be at least 6 characters").into());
    }
    Ok(RegistrationRequest {
        name: name.to_string(),
        email: email.to_string(),
        password: password.to_string(),
    })
}
