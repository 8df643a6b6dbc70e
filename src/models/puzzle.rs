use serde::{Deserialize, Serialize};

/// 每日一题
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DailyPuzzle {
    pub puzzle_id: String,
    pub question: String,
    #[serde(default)]
    pub difficulty: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PuzzleAnswer {
    pub puzzle_id: String,
    pub user_answer: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PuzzleVerdict {
    pub is_correct: bool,
    pub message: String,
    #[serde(default)]
    pub correct_answer: Option<String>,
    pub puzzle_id: String,
}
