use serde_json::Value;
use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 客户端校验错误（不会发出任何请求）
    #[error("校验错误: {0}")]
    Validation(#[from] ValidationError),
    /// API 调用错误
    #[error("API错误: {0}")]
    Api(#[from] ApiError),
    /// 登录/会话错误
    #[error("认证错误: {0}")]
    Auth(#[from] AuthError),
    /// 本地持久化存储错误
    #[error("存储错误: {0}")]
    Storage(#[from] StorageError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 同类请求仍在进行中
    #[error("{operation} 正在进行中，请稍候")]
    Busy { operation: &'static str },
    /// 请求已取消（流程已关闭）
    #[error("请求已取消")]
    Cancelled,
    /// 当前状态不允许该操作
    #[error("当前状态 {phase} 不允许执行 {operation}")]
    InvalidState {
        phase: &'static str,
        operation: &'static str,
    },
    /// 输入能力不可用（麦克风/摄像头）
    #[error("{0} 不可用")]
    Capability(&'static str),
}

/// 客户端校验错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// 输入为空
    #[error("请输入题目内容")]
    EmptyInput,
    /// 没有选择文件
    #[error("请先选择文件")]
    NoFile,
    /// 文件类型不允许
    #[error("不支持的文件类型 {mime}，允许的类型: {allowed}")]
    UnsupportedFileType { mime: String, allowed: String },
    /// 文件过大
    #[error("文件过大: {size} 字节，最大允许 {max} 字节")]
    FileTooLarge { size: u64, max: u64 },
    /// 解答中没有这个步骤
    #[error("步骤 {step_number} 不存在")]
    UnknownStep { step_number: u32 },
    /// 注册信息不完整
    #[error("注册信息无效: {reason}")]
    Registration { reason: String },
}

/// API 调用错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// 网络请求失败
    #[error("API请求失败 ({endpoint}): {message}")]
    Transport { endpoint: String, message: String },
    /// 请求超时
    #[error("API请求超时 ({endpoint})")]
    Timeout { endpoint: String },
    /// 非 2xx 响应
    #[error("{message}")]
    Status {
        endpoint: String,
        status: u16,
        message: String,
    },
    /// 2xx 响应中带有 error 字段
    #[error("{message}")]
    Application { endpoint: String, message: String },
    /// 响应体解析失败
    #[error("无法解析响应 ({endpoint}): {message}")]
    Decode { endpoint: String, message: String },
}

impl ApiError {
    /// 把非 2xx 响应转换为错误
    ///
    /// 消息优先级：服务端 `detail` → 服务端 `error` → 通用 HTTP 状态消息
    pub fn from_response(endpoint: &str, status: u16, body: &[u8]) -> Self {
        let parsed: Option<Value> = serde_json::from_slice(body).ok();
        let message = parsed
            .as_ref()
            .and_then(|v| server_message(v, "detail"))
            .or_else(|| parsed.as_ref().and_then(|v| server_message(v, "error")))
            .unwrap_or_else(|| generic_status_message(status));

        ApiError::Status {
            endpoint: endpoint.to_string(),
            status,
            message,
        }
    }

    pub fn application(endpoint: &str, message: impl Into<String>) -> Self {
        ApiError::Application {
            endpoint: endpoint.to_string(),
            message: message.into(),
        }
    }

    pub fn decode(endpoint: &str, source: impl std::fmt::Display) -> Self {
        ApiError::Decode {
            endpoint: endpoint.to_string(),
            message: source.to_string(),
        }
    }

    /// HTTP 状态码（仅 `Status` 变体）
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub fn generic_status_message(status: u16) -> String {
    format!("HTTP error — status {}", status)
}

// FastAPI 的校验错误把 detail 写成数组，这时保留其 JSON 形式
fn server_message(body: &Value, field: &str) -> Option<String> {
    match body.get(field)? {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// 登录/会话错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// 登录响应缺少 access_token
    #[error("登录响应缺少 access_token")]
    MissingToken,
    /// 登录响应缺少 user
    #[error("登录响应缺少用户信息")]
    MissingUser,
    /// 登录请求失败
    #[error("登录失败: {0}")]
    LoginFailed(ApiError),
    /// 需要登录
    #[error("请先登录")]
    NotLoggedIn,
}

/// 本地存储错误
#[derive(Debug, Error)]
pub enum StorageError {
    /// 读写失败
    #[error("读写存储文件失败 ({path}): {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 存储文件内容损坏
    #[error("存储文件已损坏 ({path}): {message}")]
    Corrupt { path: String, message: String },
    /// 锁中毒
    #[error("存储锁不可用")]
    Poisoned,
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 读取配置文件失败
    #[error("读取配置文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// TOML 解析失败
    #[error("TOML解析失败 ({path}): {source}")]
    TomlParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

impl AppError {
    /// 面向用户的提示文本
    ///
    /// 界面上的内联错误和通知都使用这段文本。
    pub fn user_message(&self) -> String {
        match self {
            AppError::Api(ApiError::Status { message, .. })
            | AppError::Api(ApiError::Application { message, .. }) => message.clone(),
            AppError::Auth(AuthError::LoginFailed(inner)) => inner.to_string(),
            AppError::Validation(e) => e.to_string(),
            other => other.to_string(),
        }
    }

    /// 是否是校验错误（校验错误从不发出请求）
    pub fn is_validation(&self) -> bool {
        matches!(self, AppError::Validation(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, AppError::Cancelled)
    }
}

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
