//! 应用上下文
//!
//! 组装基础设施和业务服务，并按页面创建流程实例

use crate::config::Config;
use crate::error::AppResult;
use crate::infrastructure::{FileStore, HttpTransport, KeyValueStore, ReqwestTransport};
use crate::models::cs::CsQuestion;
use crate::models::upload::UploadPolicy;
use crate::services::{
    AccountService, ApiClient, BookmarkService, ChatService, CsService, LogNavigator, Navigator,
    PuzzleService, SessionManager, TutorService,
};
use crate::utils::logging::log_startup;
use crate::workflow::{
    ChatProcessor, CsSubmissionProcessor, FlowCtx, Orchestrator, SolveProcessor, TutorExplainer,
    TutorExtractor,
};
use std::sync::Arc;

/// 应用主结构
///
/// 会话只有一份，由这里显式传给各个服务，不使用全局单例。
pub struct App {
    config: Config,
    session: Arc<SessionManager>,
    api: ApiClient,
}

impl App {
    /// 初始化应用：文件存储 + reqwest 传输，并恢复会话
    pub fn initialize(config: Config) -> AppResult<Self> {
        log_startup(&config);
        let store = Arc::new(FileStore::new(&config.storage_path));
        let transport = Arc::new(ReqwestTransport::new(
            config.api_base_url.clone(),
            config.request_timeout(),
        )?);
        Ok(Self::from_parts(config, store, transport, Arc::new(LogNavigator)))
    }

    /// 用注入的依赖组装应用
    pub fn from_parts(
        config: Config,
        store: Arc<dyn KeyValueStore>,
        transport: Arc<dyn HttpTransport>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        let session = Arc::new(SessionManager::new(store, transport.clone(), navigator));
        session.initialize();
        let api = ApiClient::new(transport, session.clone());
        Self {
            config,
            session,
            api,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn upload_policy(&self) -> UploadPolicy {
        UploadPolicy::new(self.config.max_upload_bytes, self.config.allow_pdf_uploads)
    }

    pub fn tutor(&self) -> TutorService {
        TutorService::new(self.api.clone())
    }

    pub fn chat(&self) -> ChatService {
        ChatService::new(self.api.clone())
    }

    pub fn bookmarks(&self) -> BookmarkService {
        BookmarkService::new(self.api.clone())
    }

    pub fn cs(&self) -> CsService {
        CsService::new(self.api.clone())
    }

    pub fn puzzles(&self) -> PuzzleService {
        PuzzleService::new(self.api.clone())
    }

    pub fn account(&self) -> AccountService {
        AccountService::new(self.api.clone())
    }

    /// 解题页：图片识别 → 解题 → 逐步追问
    pub fn solve_flow(&self) -> Orchestrator<SolveProcessor> {
        let tutor = self.tutor();
        Orchestrator::new(
            FlowCtx::new("solver"),
            SolveProcessor::new(tutor.clone()),
            self.upload_policy(),
        )
        .with_extractor(Arc::new(TutorExtractor::new(tutor.clone())))
        .with_explainer(Arc::new(TutorExplainer::new(tutor)))
    }

    /// 对话页：可以先识别图片再提问
    pub fn chat_flow(&self) -> Orchestrator<ChatProcessor> {
        Orchestrator::new(
            FlowCtx::new("chat"),
            ChatProcessor::new(self.chat()),
            self.upload_policy(),
        )
        .with_extractor(Arc::new(TutorExtractor::new(self.tutor())))
    }

    /// CS 练习页：一道题一个流程
    pub fn cs_submission_flow(&self, question: CsQuestion) -> Orchestrator<CsSubmissionProcessor> {
        Orchestrator::new(
            FlowCtx::new("cs-practice"),
            CsSubmissionProcessor::new(self.cs(), question),
            self.upload_policy(),
        )
    }
}
