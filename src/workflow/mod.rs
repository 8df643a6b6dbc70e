//! 流程层
//!
//! 描述"一次输入怎么走完"：识别 → 确认 → 处理 → 追问，只依赖业务能力（services）

pub mod capability;
pub mod explain;
pub mod flow_ctx;
pub mod orchestrator;
pub mod pipeline;
pub mod processors;
pub mod route_guard;

pub use capability::{Camera, CameraCapture, SpeechInput, SpeechRecognizer};
pub use explain::StepExplanations;
pub use flow_ctx::FlowCtx;
pub use orchestrator::{FlowPhase, FlowView, Orchestrator};
pub use pipeline::{Explainer, Extractor, Processor, RawInput};
pub use processors::{ChatProcessor, CsSubmissionProcessor, SolveProcessor, TutorExplainer, TutorExtractor};
pub use route_guard::{GateDecision, RouteGate};
