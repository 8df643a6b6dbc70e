//! 业务能力层
//!
//! 描述"我能做什么"：每个服务对应后端的一组接口，只处理单次请求

pub mod account_service;
pub mod api_client;
pub mod bookmark_service;
pub mod chat_service;
pub mod cs_service;
pub mod navigation;
pub mod puzzle_service;
pub mod session;
pub mod tutor_service;

pub use account_service::AccountService;
pub use api_client::{ApiClient, Auth};
pub use bookmark_service::BookmarkService;
pub use chat_service::ChatService;
pub use cs_service::CsService;
pub use navigation::{LogNavigator, Navigator, Route};
pub use puzzle_service::PuzzleService;
pub use session::{AuthHeader, SessionManager, SessionSnapshot};
pub use tutor_service::TutorService;
