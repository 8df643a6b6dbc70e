use serde::{Deserialize, Serialize};

/// 解答中的一个步骤
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub step_number: u32,
    pub explanation: String,
}

/// 一次解题结果
///
/// `step_number` 唯一但不一定连续，显示顺序以它为准。
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct SolutionResult {
    #[serde(default)]
    pub original_problem: Option<String>,
    #[serde(default)]
    pub steps: Vec<Step>,
    #[serde(default)]
    pub final_answer: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub updated_xp: Option<u32>,
}

impl SolutionResult {
    /// 按步骤号排序后的步骤
    pub fn ordered_steps(&self) -> Vec<&Step> {
        let mut steps: Vec<&Step> = self.steps.iter().collect();
        steps.sort_by_key(|s| s.step_number);
        steps
    }

    pub fn step(&self, step_number: u32) -> Option<&Step> {
        self.steps.iter().find(|s| s.step_number == step_number)
    }

    /// 带有 error 字段的结果不能用来显示步骤和答案
    pub fn is_usable(&self) -> bool {
        self.error.is_none()
    }
}

/// 追问类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExplainKind {
    Why,
    How,
}

impl ExplainKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ExplainKind::Why => "why",
            ExplainKind::How => "how",
        }
    }
}

impl std::str::FromStr for ExplainKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "why" => Ok(ExplainKind::Why),
            "how" => Ok(ExplainKind::How),
            other => Err(format!("unknown explanation kind: {}", other)),
        }
    }
}

/// `/explain-step` 请求
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExplanationRequest {
    pub problem_text: String,
    pub all_steps: Vec<Step>,
    pub step_number_to_explain: u32,
    pub query_type: ExplainKind,
}

/// `/explain-step` 响应
#[derive(Debug, Clone, Deserialize)]
pub struct ExplanationResponse {
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub updated_xp: Option<u32>,
}

/// 单个步骤的追问记录
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExplanationRecord {
    pub text: Option<String>,
    pub loading: bool,
    pub error: Option<String>,
    pub kind: ExplainKind,
}

impl ExplanationRecord {
    pub fn pending(kind: ExplainKind) -> Self {
        Self {
            text: None,
            loading: true,
            error: None,
            kind,
        }
    }
}
