//! 输入能力（语音、摄像头）
//!
//! 由调用方注入，不在流程里探测设备

use crate::error::AppResult;
use crate::models::upload::UploadFile;
use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// 语音转文字
#[async_trait]
pub trait SpeechRecognizer: Send + Sync {
    async fn transcribe(&self, cancel: &CancellationToken) -> AppResult<String>;
}

/// 拍照
#[async_trait]
pub trait Camera: Send + Sync {
    async fn capture(&self, cancel: &CancellationToken) -> AppResult<UploadFile>;
}

#[derive(Clone)]
pub enum SpeechInput {
    Available(Arc<dyn SpeechRecognizer>),
    Unavailable,
}

impl SpeechInput {
    pub fn available(recognizer: impl SpeechRecognizer + 'static) -> Self {
        SpeechInput::Available(Arc::new(recognizer))
    }
}

#[derive(Clone)]
pub enum CameraCapture {
    Available(Arc<dyn Camera>),
    Unavailable,
}

impl CameraCapture {
    pub fn available(camera: impl Camera + 'static) -> Self {
        CameraCapture::Available(Arc::new(camera))
    }
}
