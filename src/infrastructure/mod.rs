//! 基础设施层
//!
//! 持有稀缺资源（持久化存储、HTTP 客户端），只暴露能力

pub mod http;
pub mod scripted;
pub mod storage;

pub use http::{HttpMethod, HttpRequest, HttpResponse, HttpTransport, ReqwestTransport, RequestBody};
pub use scripted::ScriptedTransport;
pub use storage::{FileStore, KeyValueStore, MemoryStore};
