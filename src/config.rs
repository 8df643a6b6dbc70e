use crate::error::{AppResult, ConfigError};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// 上传文件默认大小上限 (10MB)
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

/// 程序配置
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 后端 API 地址
    pub api_base_url: String,
    /// 会话存储文件路径
    pub storage_path: String,
    /// 上传文件大小上限（字节）
    pub max_upload_bytes: u64,
    /// 是否允许上传 PDF
    pub allow_pdf_uploads: bool,
    /// 单个请求超时（秒）
    pub request_timeout_secs: u64,
    /// 是否显示详细日志
    pub verbose_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000".to_string(),
            storage_path: ".mathwiz/storage.json".to_string(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            allow_pdf_uploads: true,
            request_timeout_secs: 60,
            verbose_logging: false,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// 从 TOML 文件加载配置，缺失的字段使用默认值
    pub fn from_toml_file(path: &Path) -> AppResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFailed {
            path: path.display().to_string(),
            source,
        })?;
        let config = toml::from_str(&content).map_err(|source| ConfigError::TomlParseFailed {
            path: path.display().to_string(),
            source,
        })?;
        Ok(config)
    }

    /// 先读文件（如果给出），再用环境变量覆盖
    pub fn load(path: Option<&Path>) -> AppResult<Self> {
        let base = match path {
            Some(path) => Self::from_toml_file(path)?,
            None => Self::default(),
        };
        Ok(base.with_env_overrides())
    }

    fn with_env_overrides(self) -> Self {
        Self {
            api_base_url: std::env::var("MATHWIZ_API_BASE_URL").unwrap_or(self.api_base_url),
            storage_path: std::env::var("MATHWIZ_STORAGE_PATH").unwrap_or(self.storage_path),
            max_upload_bytes: std::env::var("MATHWIZ_MAX_UPLOAD_BYTES").ok().and_then(|v| v.parse().ok()).unwrap_or(self.max_upload_bytes),
            allow_pdf_uploads: std::env::var("MATHWIZ_ALLOW_PDF").ok().and_then(|v| v.parse().ok()).unwrap_or(self.allow_pdf_uploads),
            request_timeout_secs: std::env::var("MATHWIZ_REQUEST_TIMEOUT_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(self.request_timeout_secs),
            verbose_logging: std::env::var("VERBOSE_LOGGING").ok().and_then(|v| v.parse().ok()).unwrap_or(self.verbose_logging),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn toml_file_fills_missing_fields_with_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "api_base_url = \"https://tutor.example.com\"").unwrap();
        writeln!(file, "max_upload_bytes = 2048").unwrap();

        let config = Config::from_toml_file(file.path()).unwrap();
        assert_eq!(config.api_base_url, "https://tutor.example.com");
        assert_eq!(config.max_upload_bytes, 2048);
        assert_eq!(config.request_timeout_secs, 60);
        assert!(config.allow_pdf_uploads);
    }

    #[test]
    fn unparsable_toml_is_a_config_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "max_upload_bytes = \"lots\"").unwrap();

        let err = Config::from_toml_file(file.path()).unwrap_err();
        assert!(matches!(
            err,
            crate::error::AppError::Config(ConfigError::TomlParseFailed { .. })
        ));
    }

    #[test]
    fn default_upload_limit_is_ten_megabytes() {
        assert_eq!(Config::default().max_upload_bytes, 10 * 1024 * 1024);
    }
}
