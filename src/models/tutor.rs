use serde::{Deserialize, Serialize};

/// `/upload-image` 响应
#[derive(Debug, Clone, Deserialize)]
pub struct ImageUploadResponse {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub extracted_text: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// `/recognize-drawing` 响应
#[derive(Debug, Clone, Deserialize)]
pub struct RecognitionResponse {
    #[serde(default)]
    pub recognized_text: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PracticeRequest {
    pub topic: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_problem: Option<String>,
}

/// 练习题
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PracticeProblem {
    #[serde(default)]
    pub problem: Option<String>,
    #[serde(default)]
    pub solution_explanation: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub updated_xp: Option<u32>,
}

/// `/diagnose-solution` 响应
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Diagnosis {
    #[serde(default)]
    pub feedback: String,
    #[serde(default)]
    pub error: Option<String>,
}

/// `/generate-graph` 响应
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GraphImage {
    #[serde(default)]
    pub image_data_url: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}
