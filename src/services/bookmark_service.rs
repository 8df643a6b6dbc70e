//! 收藏服务 - 业务能力层

use crate::error::{AppResult, ValidationError};
use crate::infrastructure::HttpRequest;
use crate::models::bookmark::{Bookmark, BookmarkCreate};
use crate::services::api_client::{ApiClient, Auth};
use tokio_util::sync::CancellationToken;
use tracing::info;

pub const BOOKMARKS_ENDPOINT: &str = "/api/bookmarks/";

#[derive(Clone)]
pub struct BookmarkService {
    api: ApiClient,
}

impl BookmarkService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// 分页列出当前用户的收藏
    pub async fn list(&self, skip: u32, limit: u32, cancel: &CancellationToken) -> AppResult<Vec<Bookmark>> {
        let request = HttpRequest::get(BOOKMARKS_ENDPOINT)
            .query("skip", skip.to_string())
            .query("limit", limit.to_string());
        self.api.fetch_json(request, Auth::Required, cancel).await
    }

    pub async fn create(&self, bookmark: &BookmarkCreate, cancel: &CancellationToken) -> AppResult<Bookmark> {
        if bookmark.question_text.trim().is_empty() {
            return Err(ValidationError::EmptyInput.into());
        }
        let created: Bookmark = self
            .api
            .post_json(BOOKMARKS_ENDPOINT, bookmark, Auth::Required, cancel)
            .await?;
        info!("🔖 已收藏 #{}", created.id);
        Ok(created)
    }

    pub async fn delete(&self, bookmark_id: i64, cancel: &CancellationToken) -> AppResult<()> {
        let path = format!("{}{}", BOOKMARKS_ENDPOINT, bookmark_id);
        self.api.delete(&path, Auth::Required, cancel).await?;
        info!("🗑️ 已删除收藏 #{}", bookmark_id);
        Ok(())
    }
}
