//! 请求编排 - 流程层
//!
//! 一个流程实例对应一个输入页面，流程顺序：
//! 1. 识别（可选）：图片 / 手写 / 语音 → 文本，合并进输入框，不自动提交
//! 2. 处理：用户确认后提交文本
//! 3. 追问（可选）：对解答的某一步问"为什么"/"怎么做"

use crate::error::{AppError, AppResult, ValidationError};
use crate::models::solution::{ExplainKind, ExplanationRecord, ExplanationRequest, SolutionResult};
use crate::models::upload::{FilePreview, UploadFile, UploadPolicy};
use crate::utils::truncate_text;
use crate::workflow::capability::{CameraCapture, SpeechInput, SpeechRecognizer};
use crate::workflow::explain::StepExplanations;
use crate::workflow::flow_ctx::FlowCtx;
use crate::workflow::pipeline::{Explainer, Extractor, Processor, RawInput};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// 流程阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowPhase {
    Idle,
    Extracting,
    Extracted,
    Processing,
    Completed,
    Failed,
}

impl FlowPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            FlowPhase::Idle => "Idle",
            FlowPhase::Extracting => "Extracting",
            FlowPhase::Extracted => "Extracted",
            FlowPhase::Processing => "Processing",
            FlowPhase::Completed => "Completed",
            FlowPhase::Failed => "Failed",
        }
    }
}

/// 流程状态的只读快照
#[derive(Debug, Clone, PartialEq)]
pub struct FlowView<T> {
    pub phase: FlowPhase,
    pub input: String,
    pub preview: Option<FilePreview>,
    pub result: Option<T>,
    pub error: Option<String>,
    /// 识别请求进行中（识别按钮应禁用）
    pub extracting: bool,
    /// 处理请求进行中（提交按钮应禁用）
    pub processing: bool,
}

struct FlowState<T> {
    phase: FlowPhase,
    input: String,
    preview: Option<FilePreview>,
    result: Option<T>,
    error: Option<String>,
    extract_call: Option<ActiveCall>,
    process_call: Option<ActiveCall>,
    next_call_id: u64,
    /// 每次重置加一，重置前发出的请求返回时作废
    epoch: u64,
    explanations: StepExplanations,
    /// 当前结果下的追问共用的取消范围，结果被替换或清空时取消
    explain_scope: CancellationToken,
    parent: CancellationToken,
}

/// 占用中的请求
struct ActiveCall {
    id: u64,
    token: CancellationToken,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CallKind {
    Extract,
    Process,
}

impl<T> FlowState<T> {
    fn slot(&self, kind: CallKind) -> &Option<ActiveCall> {
        match kind {
            CallKind::Extract => &self.extract_call,
            CallKind::Process => &self.process_call,
        }
    }

    fn slot_mut(&mut self, kind: CallKind) -> &mut Option<ActiveCall> {
        match kind {
            CallKind::Extract => &mut self.extract_call,
            CallKind::Process => &mut self.process_call,
        }
    }

    /// 有未被取消的请求在进行
    fn is_running(&self, kind: CallKind) -> bool {
        self.slot(kind)
            .as_ref()
            .is_some_and(|call| !call.token.is_cancelled())
    }
}

impl<T: Clone> FlowState<T> {
    fn new(parent: &CancellationToken) -> Self {
        Self {
            phase: FlowPhase::Idle,
            input: String::new(),
            preview: None,
            result: None,
            error: None,
            extract_call: None,
            process_call: None,
            next_call_id: 0,
            epoch: 0,
            explanations: StepExplanations::new(),
            explain_scope: parent.child_token(),
            parent: parent.clone(),
        }
    }

    fn view(&self) -> FlowView<T> {
        FlowView {
            phase: self.phase,
            input: self.input.clone(),
            preview: self.preview.clone(),
            result: self.result.clone(),
            error: self.error.clone(),
            extracting: self.is_running(CallKind::Extract),
            processing: self.is_running(CallKind::Process),
        }
    }

    fn clear_result(&mut self) {
        self.result = None;
        self.explanations.clear();
        self.explain_scope.cancel();
        self.explain_scope = self.parent.child_token();
    }
}

fn lock<T>(state: &Mutex<FlowState<T>>) -> MutexGuard<'_, FlowState<T>> {
    // 状态只在锁内做赋值，锁中毒时沿用其中的数据
    state.lock().unwrap_or_else(|e| e.into_inner())
}

/// 请求槽位的占用凭证
///
/// 离开作用域时释放槽位，调用方中途丢弃 future 也一样。
struct CallGuard<'a, T> {
    state: &'a Mutex<FlowState<T>>,
    retired: &'a Notify,
    kind: CallKind,
    id: u64,
}

impl<T> Drop for CallGuard<'_, T> {
    fn drop(&mut self) {
        let mut state = lock(self.state);
        let slot = state.slot_mut(self.kind);
        if slot.as_ref().is_some_and(|call| call.id == self.id) {
            *slot = None;
        }
        drop(state);
        self.retired.notify_waiters();
    }
}

/// 识别的输入来源
enum InputSource {
    File(FilePreview),
    Drawing,
    Speech,
}

impl InputSource {
    fn label(&self) -> &str {
        match self {
            InputSource::File(preview) => &preview.file_name,
            InputSource::Drawing => "手写板",
            InputSource::Speech => "语音",
        }
    }
}

/// 识别由谁来做
enum ExtractionJob {
    Extract(Arc<dyn Extractor>, RawInput),
    Transcribe(Arc<dyn SpeechRecognizer>),
}

impl ExtractionJob {
    async fn run(&self, cancel: &CancellationToken) -> AppResult<String> {
        match self {
            ExtractionJob::Extract(extractor, input) => extractor.extract(input, cancel).await,
            ExtractionJob::Transcribe(recognizer) => recognizer.transcribe(cancel).await,
        }
    }
}

/// 请求编排器
///
/// - 同一实例同时最多一个识别请求和一个处理请求，重复调用返回 `Busy`
/// - `reset()` 取消进行中的请求，被取消的请求退出之前不会发出新的同类请求
/// - 不同实例之间没有任何共享状态
/// - `close()` 之后返回的结果直接丢弃，不再修改状态
pub struct Orchestrator<P: Processor> {
    ctx: FlowCtx,
    processor: P,
    extractor: Option<Arc<dyn Extractor>>,
    explainer: Option<Arc<dyn Explainer>>,
    policy: UploadPolicy,
    state: Mutex<FlowState<P::Output>>,
    /// 请求槽位释放时通知
    retired: Notify,
    cancel: CancellationToken,
}

impl<P: Processor> Orchestrator<P> {
    pub fn new(ctx: FlowCtx, processor: P, policy: UploadPolicy) -> Self {
        let cancel = CancellationToken::new();
        Self {
            ctx,
            processor,
            extractor: None,
            explainer: None,
            policy,
            state: Mutex::new(FlowState::new(&cancel)),
            retired: Notify::new(),
            cancel,
        }
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn Extractor>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    pub fn with_explainer(mut self, explainer: Arc<dyn Explainer>) -> Self {
        self.explainer = Some(explainer);
        self
    }

    pub fn ctx(&self) -> &FlowCtx {
        &self.ctx
    }

    pub fn processor(&self) -> &P {
        &self.processor
    }

    pub fn view(&self) -> FlowView<P::Output> {
        self.state().view()
    }

    pub fn phase(&self) -> FlowPhase {
        self.state().phase
    }

    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// 修改输入框内容
    ///
    /// 清空输入时一并清掉旧结果。
    pub fn set_input(&self, text: impl Into<String>) {
        let text = text.into();
        let mut state = self.state();
        if text.trim().is_empty() {
            state.clear_result();
            state.error = None;
            if !state.is_running(CallKind::Extract) && !state.is_running(CallKind::Process) {
                state.phase = FlowPhase::Idle;
            }
        }
        state.input = text;
    }

    /// 选择文件并识别
    ///
    /// 类型或大小不合规时直接拒绝，不发任何请求。
    pub async fn select_file(&self, file: UploadFile) -> AppResult<String> {
        self.ensure_open()?;
        if let Err(e) = self.policy.validate(Some(&file)) {
            warn!("{} ⚠️ 文件被拒绝: {}", self.ctx, e);
            return Err(e);
        }
        let extractor = self.extractor()?;
        let source = InputSource::File(file.preview());
        let job = ExtractionJob::Extract(extractor, RawInput::Image(file));
        self.run_extraction(source, job).await
    }

    /// 识别手写板内容
    pub async fn select_drawing(&self, data_url: &str) -> AppResult<String> {
        self.ensure_open()?;
        if data_url.trim().is_empty() {
            return Err(ValidationError::EmptyInput.into());
        }
        let extractor = self.extractor()?;
        let job = ExtractionJob::Extract(extractor, RawInput::Drawing(data_url.to_string()));
        self.run_extraction(InputSource::Drawing, job).await
    }

    /// 语音输入
    pub async fn dictate(&self, speech: &SpeechInput) -> AppResult<String> {
        self.ensure_open()?;
        let recognizer = match speech {
            SpeechInput::Available(recognizer) => recognizer.clone(),
            SpeechInput::Unavailable => return Err(AppError::Capability("语音输入")),
        };
        self.run_extraction(InputSource::Speech, ExtractionJob::Transcribe(recognizer))
            .await
    }

    /// 拍照后按选择文件处理
    pub async fn capture(&self, camera: &CameraCapture) -> AppResult<String> {
        self.ensure_open()?;
        let camera = match camera {
            CameraCapture::Available(camera) => camera.clone(),
            CameraCapture::Unavailable => return Err(AppError::Capability("摄像头")),
        };
        let file = camera.capture(&self.cancel).await?;
        self.select_file(file).await
    }

    /// 提交输入框里的文本
    pub async fn submit(&self) -> AppResult<P::Output> {
        self.ensure_open()?;
        let operation = self.processor.name();
        if self.state().input.trim().is_empty() {
            return Err(ValidationError::EmptyInput.into());
        }

        let (_guard, token, (text, epoch)) = self
            .claim(CallKind::Process, operation, |state| {
                let text = state.input.trim().to_string();
                if text.is_empty() {
                    return Err(ValidationError::EmptyInput.into());
                }
                if state.is_running(CallKind::Extract) {
                    return Err(AppError::InvalidState {
                        phase: state.phase.as_str(),
                        operation,
                    });
                }
                state.error = None;
                state.phase = FlowPhase::Processing;
                Ok((text, state.epoch))
            })
            .await?;

        info!("{} 🚀 {}: {}", self.ctx, operation, truncate_text(&text, 80));
        let outcome = self.processor.process(&text, &token).await;

        let mut state = self.state();
        if token.is_cancelled() || state.epoch != epoch {
            debug!("{} {}结果已丢弃", self.ctx, operation);
            return Err(AppError::Cancelled);
        }
        match outcome {
            Ok(output) => {
                // 新结果整体替换旧结果
                state.clear_result();
                state.result = Some(output.clone());
                state.phase = FlowPhase::Completed;
                info!("{} ✓ {}完成", self.ctx, operation);
                Ok(output)
            }
            Err(e) => {
                warn!("{} ⚠️ {}失败: {}", self.ctx, operation, e);
                state.error = Some(e.user_message());
                state.phase = FlowPhase::Failed;
                Err(e)
            }
        }
    }

    /// 重置：输入、预览、结果、错误一起清空
    ///
    /// 进行中的识别和处理请求被取消，返回 `Cancelled`。
    pub fn reset(&self) {
        let mut state = self.state();
        for kind in [CallKind::Extract, CallKind::Process] {
            if let Some(call) = state.slot(kind) {
                call.token.cancel();
            }
        }
        state.phase = FlowPhase::Idle;
        state.input.clear();
        state.preview = None;
        state.error = None;
        state.epoch += 1;
        state.clear_result();
        debug!("{} 已重置", self.ctx);
    }

    /// 关闭流程（页面卸载）
    pub fn close(&self) {
        if !self.cancel.is_cancelled() {
            info!("{} 流程已关闭", self.ctx);
        }
        self.cancel.cancel();
    }

    /// 占用一个请求槽位
    ///
    /// 同类请求仍在进行时返回 `Busy`；若它已被重置取消、只是还没退出，等它退出后再占用。
    /// `prepare` 在锁内执行，返回错误时不占用槽位。
    async fn claim<R>(
        &self,
        kind: CallKind,
        operation: &'static str,
        mut prepare: impl FnMut(&mut FlowState<P::Output>) -> AppResult<R>,
    ) -> AppResult<(CallGuard<'_, P::Output>, CancellationToken, R)> {
        loop {
            self.ensure_open()?;
            let retired = self.retired.notified();
            {
                let mut state = self.state();
                let retiring = match state.slot(kind) {
                    Some(call) if !call.token.is_cancelled() => {
                        return Err(AppError::Busy { operation });
                    }
                    Some(_) => true,
                    None => false,
                };
                if !retiring {
                    let value = prepare(&mut *state)?;
                    state.next_call_id += 1;
                    let id = state.next_call_id;
                    let token = self.cancel.child_token();
                    *state.slot_mut(kind) = Some(ActiveCall {
                        id,
                        token: token.clone(),
                    });
                    let guard = CallGuard {
                        state: &self.state,
                        retired: &self.retired,
                        kind,
                        id,
                    };
                    return Ok((guard, token, value));
                }
            }
            debug!("{} 等待重置前的{}请求退出", self.ctx, operation);
            retired.await;
        }
    }

    async fn run_extraction(&self, source: InputSource, job: ExtractionJob) -> AppResult<String> {
        let (_guard, token, epoch) = self
            .claim(CallKind::Extract, "识别", |state| {
                if state.is_running(CallKind::Process) {
                    return Err(AppError::InvalidState {
                        phase: state.phase.as_str(),
                        operation: "识别",
                    });
                }
                match &source {
                    InputSource::File(preview) => {
                        state.preview = Some(preview.clone());
                        state.clear_result();
                    }
                    InputSource::Drawing => {
                        state.preview = None;
                        state.clear_result();
                    }
                    InputSource::Speech => {}
                }
                state.error = None;
                state.phase = FlowPhase::Extracting;
                Ok(state.epoch)
            })
            .await?;

        info!("{} 🔍 开始识别: {}", self.ctx, source.label());
        let outcome = job.run(&token).await;

        let mut state = self.state();
        if token.is_cancelled() || state.epoch != epoch {
            debug!("{} 识别结果已丢弃", self.ctx);
            return Err(AppError::Cancelled);
        }
        match outcome {
            Ok(text) => {
                state.input = merge_input(&state.input, &text);
                state.phase = FlowPhase::Extracted;
                info!("{} ✓ 识别完成: {}", self.ctx, truncate_text(&text, 50));
                Ok(text)
            }
            Err(e) => {
                warn!("{} ⚠️ 识别失败: {}", self.ctx, e);
                state.error = Some(e.user_message());
                state.phase = FlowPhase::Failed;
                Err(e)
            }
        }
    }

    fn extractor(&self) -> AppResult<Arc<dyn Extractor>> {
        self.extractor
            .clone()
            .ok_or(AppError::Capability("文本识别"))
    }

    fn ensure_open(&self) -> AppResult<()> {
        if self.cancel.is_cancelled() {
            Err(AppError::Cancelled)
        } else {
            Ok(())
        }
    }

    fn state(&self) -> MutexGuard<'_, FlowState<P::Output>> {
        lock(&self.state)
    }
}

impl<P> Orchestrator<P>
where
    P: Processor<Output = SolutionResult>,
{
    /// 追问某一步
    ///
    /// 各步骤互不影响，也不受处理请求影响；同一步骤以最后一次追问为准。
    pub async fn explain_step(&self, step_number: u32, kind: ExplainKind) -> AppResult<String> {
        self.ensure_open()?;
        let explainer = self
            .explainer
            .clone()
            .ok_or(AppError::Capability("步骤追问"))?;

        let (request, ticket, scope) = {
            let mut state = self.state();
            let Some(result) = state.result.as_ref().filter(|r| r.is_usable()) else {
                return Err(AppError::InvalidState {
                    phase: state.phase.as_str(),
                    operation: "追问",
                });
            };
            if result.step(step_number).is_none() {
                return Err(ValidationError::UnknownStep { step_number }.into());
            }
            let request = ExplanationRequest {
                problem_text: result
                    .original_problem
                    .clone()
                    .filter(|p| !p.trim().is_empty())
                    .unwrap_or_else(|| state.input.trim().to_string()),
                all_steps: result.ordered_steps().into_iter().cloned().collect(),
                step_number_to_explain: step_number,
                query_type: kind,
            };
            let ticket = state.explanations.begin(step_number, kind);
            (request, ticket, state.explain_scope.clone())
        };

        debug!("{} 追问第 {} 步 ({})", self.ctx, step_number, kind.as_str());
        let outcome = explainer.explain(&request, &scope).await;

        let mut state = self.state();
        if self.cancel.is_cancelled() {
            return Err(AppError::Cancelled);
        }
        if !state.explanations.finish(&ticket, &outcome) {
            debug!("{} 第 {} 步的追问结果已过期", self.ctx, step_number);
            return Err(AppError::Cancelled);
        }
        outcome
    }

    pub fn explanation(&self, step_number: u32) -> Option<ExplanationRecord> {
        self.state().explanations.get(step_number).cloned()
    }

    pub fn explanations(&self) -> Vec<(u32, ExplanationRecord)> {
        self.state().explanations.records()
    }
}

impl<P: Processor> Drop for Orchestrator<P> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// 识别出的文本追加到已有输入之后
fn merge_input(existing: &str, extracted: &str) -> String {
    if existing.trim().is_empty() {
        extracted.to_string()
    } else if extracted.is_empty() {
        existing.to_string()
    } else if existing.ends_with('\n') {
        format!("{}{}", existing, extracted)
    } else {
        format!("{}\n{}", existing, extracted)
    }
}
