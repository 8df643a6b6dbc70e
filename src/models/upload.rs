//! 待上传的文件与上传前校验

use crate::error::{AppResult, ValidationError};
use phf::phf_set;
use std::path::Path;

/// 图片类型，总是允许
static IMAGE_MIME_TYPES: phf::Set<&'static str> = phf_set! {
    "image/jpeg",
    "image/png",
};

const PDF_MIME: &str = "application/pdf";

/// 一个待上传的文件
#[derive(Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub file_name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(file_name: impl Into<String>, mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            mime: mime.into(),
            bytes,
        }
    }

    /// 从磁盘读取文件，MIME 类型按扩展名推断
    pub async fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let mime = mime_guess::from_path(path)
            .first_raw()
            .unwrap_or("application/octet-stream");
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "upload".to_string());
        Ok(Self::new(file_name, mime, bytes))
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn preview(&self) -> FilePreview {
        FilePreview {
            file_name: self.file_name.clone(),
            mime: self.mime.clone(),
            size: self.size(),
        }
    }
}

impl std::fmt::Debug for UploadFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadFile")
            .field("file_name", &self.file_name)
            .field("mime", &self.mime)
            .field("size", &self.bytes.len())
            .finish()
    }
}

/// 选中文件后显示的预览信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePreview {
    pub file_name: String,
    pub mime: String,
    pub size: u64,
}

/// 上传策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadPolicy {
    pub max_bytes: u64,
    pub allow_pdf: bool,
}

impl UploadPolicy {
    pub fn new(max_bytes: u64, allow_pdf: bool) -> Self {
        Self {
            max_bytes,
            allow_pdf,
        }
    }

    pub fn allows_mime(&self, mime: &str) -> bool {
        let mime = mime.trim().to_ascii_lowercase();
        IMAGE_MIME_TYPES.contains(mime.as_str()) || (self.allow_pdf && mime == PDF_MIME)
    }

    /// 允许的类型列表（用于提示）
    pub fn allowed_list(&self) -> String {
        let mut allowed: Vec<&str> = IMAGE_MIME_TYPES.iter().copied().collect();
        allowed.sort_unstable();
        if self.allow_pdf {
            allowed.push(PDF_MIME);
        }
        allowed.join(", ")
    }

    /// 上传前校验：先查类型，再查大小
    pub fn validate(&self, file: Option<&UploadFile>) -> AppResult<()> {
        let file = file.ok_or(ValidationError::NoFile)?;
        if !self.allows_mime(&file.mime) {
            return Err(ValidationError::UnsupportedFileType {
                mime: file.mime.clone(),
                allowed: self.allowed_list(),
            }
            .into());
        }
        if file.size() > self.max_bytes {
            return Err(ValidationError::FileTooLarge {
                size: file.size(),
                max: self.max_bytes,
            }
            .into());
        }
        Ok(())
    }
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_MAX_UPLOAD_BYTES, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;

    const MB: usize = 1024 * 1024;

    #[test]
    fn test_rejects_wrong_type_and_oversize_distinctly() {
        let policy = UploadPolicy::default();

        let gif = UploadFile::new("a.gif", "image/gif", vec![0; 10]);
        assert!(matches!(
            policy.validate(Some(&gif)),
            Err(AppError::Validation(ValidationError::UnsupportedFileType { .. }))
        ));

        let big = UploadFile::new("a.jpg", "image/jpeg", vec![0; 12 * MB]);
        assert!(matches!(
            policy.validate(Some(&big)),
            Err(AppError::Validation(ValidationError::FileTooLarge { .. }))
        ));

        assert!(matches!(
            policy.validate(None),
            Err(AppError::Validation(ValidationError::NoFile))
        ));
    }

    #[test]
    fn test_pdf_depends_on_policy() {
        let pdf = UploadFile::new("hw.pdf", "application/pdf", vec![0; 100]);
        assert!(UploadPolicy::new(10 * MB as u64, true).validate(Some(&pdf)).is_ok());
        assert!(UploadPolicy::new(10 * MB as u64, false).validate(Some(&pdf)).is_err());
    }

    #[test]
    fn test_exactly_at_limit_is_allowed() {
        let policy = UploadPolicy::new(1024, false);
        let file = UploadFile::new("a.png", "image/png", vec![0; 1024]);
        assert!(policy.validate(Some(&file)).is_ok());
        assert_eq!(policy.allowed_list(), "image/jpeg, image/png");
    }
}
