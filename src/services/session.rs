//! 会话管理服务 - 业务能力层
//!
//! 登录状态的唯一来源：登录、登出、生成认证请求头，并在重启后恢复状态

use crate::error::{ApiError, AppError, AppResult, AuthError};
use crate::infrastructure::{HttpRequest, HttpTransport, KeyValueStore};
use crate::models::user::{Credentials, LoginResponse, User};
use crate::services::navigation::{Navigator, Route};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

pub const USER_KEY: &str = "user";
pub const TOKEN_KEY: &str = "token";
pub const LOGGED_IN_KEY: &str = "isLoggedIn";
const SESSION_KEYS: [&str; 3] = [USER_KEY, TOKEN_KEY, LOGGED_IN_KEY];

pub const LOGIN_ENDPOINT: &str = "/api/login";

/// 认证请求头集合，未登录时为空
pub type AuthHeader = BTreeMap<String, String>;

/// 会话的只读快照
///
/// `is_logged_in == true` 时 `user` 和 `token` 一定存在。
#[derive(Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub user: Option<User>,
    pub token: Option<String>,
    pub is_logged_in: bool,
    pub is_loading: bool,
}

impl SessionSnapshot {
    fn logged_out(is_loading: bool) -> Self {
        Self {
            user: None,
            token: None,
            is_logged_in: false,
            is_loading,
        }
    }

    fn logged_in(user: User, token: String) -> Self {
        Self {
            user: Some(user),
            token: Some(token),
            is_logged_in: true,
            is_loading: false,
        }
    }
}

impl std::fmt::Debug for SessionSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionSnapshot")
            .field("user", &self.user)
            .field("token", &self.token.as_ref().map(|_| "***"))
            .field("is_logged_in", &self.is_logged_in)
            .field("is_loading", &self.is_loading)
            .finish()
    }
}

/// 会话管理器
///
/// 职责：
/// - 独占会话状态，对外只给快照
/// - `user`/`token`/`isLoggedIn` 三个键总是成组写入、成组清除
/// - 认证头每次都从存储重新读取 token，不信任内存副本
/// - 不监听其他请求的 401/403
pub struct SessionManager {
    store: Arc<dyn KeyValueStore>,
    transport: Arc<dyn HttpTransport>,
    navigator: Arc<dyn Navigator>,
    state: watch::Sender<SessionSnapshot>,
    initialized: AtomicBool,
}

impl SessionManager {
    /// 创建会话管理器
    ///
    /// 调用 `initialize` 之前会话处于加载中（不确定）状态。
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        transport: Arc<dyn HttpTransport>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        let (state, _) = watch::channel(SessionSnapshot::logged_out(true));
        Self {
            store,
            transport,
            navigator,
            state,
            initialized: AtomicBool::new(false),
        }
    }

    /// 从持久化存储恢复会话，只执行一次
    ///
    /// 三个键任一缺失、不一致或无法解析时清除全部键，保持未登录。
    pub fn initialize(&self) -> SessionSnapshot {
        if self.initialized.swap(true, Ordering::SeqCst) {
            return self.snapshot();
        }
        self.state.send_modify(|s| s.is_loading = true);

        match self.restore() {
            Some((user, token)) => {
                info!("✓ 已恢复登录状态: {}", user.email);
                self.state.send_replace(SessionSnapshot::logged_in(user, token));
            }
            None => {
                self.clear_persisted();
                self.state.send_replace(SessionSnapshot::logged_out(false));
            }
        }
        self.snapshot()
    }

    fn restore(&self) -> Option<(User, String)> {
        let read = |key: &str| match self.store.get(key) {
            Ok(value) => value,
            Err(e) => {
                warn!("⚠️ 读取会话键 {} 失败: {}", key, e);
                None
            }
        };

        let logged_in = read(LOGGED_IN_KEY);
        let token = read(TOKEN_KEY);
        let user_raw = read(USER_KEY);

        match (logged_in.as_deref(), token, user_raw) {
            (Some("true"), Some(token), Some(user_raw)) if !token.is_empty() => {
                match serde_json::from_str::<User>(&user_raw) {
                    Ok(user) => Some((user, token)),
                    Err(e) => {
                        warn!("⚠️ 存储中的用户信息无法解析，清除会话: {}", e);
                        None
                    }
                }
            }
            (None, None, None) => None,
            _ => {
                warn!("⚠️ 存储中的会话不完整，清除会话");
                None
            }
        }
    }

    /// 登录
    ///
    /// 以表单格式提交，成功后三个键一起写入。任何失败都会清除全部会话状态，
    /// 错误原样返回给调用方。
    pub async fn login(&self, credentials: &Credentials) -> AppResult<User> {
        info!("🔐 正在登录: {}", credentials.email);
        self.state.send_modify(|s| s.is_loading = true);

        let outcome = match self.request_token(credentials).await {
            Ok((user, token)) => self.persist(&user, &token).map(|_| (user, token)),
            Err(e) => Err(e),
        };

        match outcome {
            Ok((user, token)) => {
                info!("✓ 登录成功: {}", user.email);
                self.state
                    .send_replace(SessionSnapshot::logged_in(user.clone(), token));
                Ok(user)
            }
            Err(e) => {
                warn!("❌ 登录失败: {}", e);
                self.clear_persisted();
                self.state.send_replace(SessionSnapshot::logged_out(false));
                Err(e)
            }
        }
    }

    async fn request_token(&self, credentials: &Credentials) -> AppResult<(User, String)> {
        let request = HttpRequest::post(LOGIN_ENDPOINT).form(vec![
            ("username".to_string(), credentials.email.clone()),
            ("password".to_string(), credentials.password.clone()),
            ("grant_type".to_string(), "password".to_string()),
        ]);

        let response = self.transport.send(request).await.map_err(|e| match e {
            AppError::Api(api) => AuthError::LoginFailed(api).into(),
            other => other,
        })?;

        if !response.is_success() {
            let api = ApiError::from_response(LOGIN_ENDPOINT, response.status, &response.body);
            return Err(AuthError::LoginFailed(api).into());
        }

        let body: LoginResponse = response.json(LOGIN_ENDPOINT)?;
        let token = body
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::MissingToken)?;
        let user = body.user.ok_or(AuthError::MissingUser)?;
        Ok((user, token))
    }

    fn persist(&self, user: &User, token: &str) -> AppResult<()> {
        let user_json = serde_json::to_string(user)
            .map_err(|e| ApiError::decode(LOGIN_ENDPOINT, e))?;
        self.store.set_many(&[
            (USER_KEY, user_json.as_str()),
            (TOKEN_KEY, token),
            (LOGGED_IN_KEY, "true"),
        ])
    }

    /// 登出：清除全部状态并跳转到登录页，不请求服务端
    pub fn logout(&self) {
        info!("👋 已登出");
        self.clear_persisted();
        self.state.send_replace(SessionSnapshot::logged_out(false));
        self.navigator.navigate(Route::Login);
    }

    /// 生成认证请求头
    ///
    /// token 每次从存储读取；没有 token 时返回空集合。
    pub fn auth_header(&self) -> AuthHeader {
        let mut header = AuthHeader::new();
        match self.store.get(TOKEN_KEY) {
            Ok(Some(token)) if !token.is_empty() => {
                header.insert("Authorization".to_string(), format!("Bearer {}", token));
            }
            Ok(_) => {}
            Err(e) => debug!("读取 token 失败，不附带认证头: {}", e),
        }
        header
    }

    /// 记录服务端返回的最新经验值（只改内存中的用户）
    pub fn record_xp(&self, updated_xp: Option<u32>) {
        let Some(xp) = updated_xp else {
            return;
        };
        self.state.send_if_modified(|s| match s.user.as_mut() {
            Some(user) if user.current_xp != Some(xp) => {
                info!("⭐ 经验值更新: {}", xp);
                user.current_xp = Some(xp);
                true
            }
            _ => false,
        });
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.borrow().clone()
    }

    /// 订阅会话变化
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.state.subscribe()
    }

    pub fn is_logged_in(&self) -> bool {
        self.state.borrow().is_logged_in
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().is_loading
    }

    pub fn current_user(&self) -> Option<User> {
        self.state.borrow().user.clone()
    }

    fn clear_persisted(&self) {
        if let Err(e) = self.store.remove_many(&SESSION_KEYS) {
            warn!("⚠️ 清除会话存储失败: {}", e);
        }
    }
}
