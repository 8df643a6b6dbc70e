//! 计算机科学练习相关的数据结构

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CsQuestionType {
    Mcq,
    Coding,
    Theory,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct McqOption {
    pub id: String,
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CsQuestionRequest {
    pub chapter_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requested_question_type: Option<CsQuestionType>,
}

/// 一道 CS 题，按 `question_type` 区分
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "question_type", rename_all = "lowercase")]
pub enum CsQuestion {
    Mcq {
        id: String,
        chapter: String,
        question_text: String,
        options: Vec<McqOption>,
    },
    Coding {
        id: String,
        chapter: String,
        question_text: String,
        #[serde(default)]
        initial_code_stub: Option<String>,
    },
    Theory {
        id: String,
        chapter: String,
        question_text: String,
    },
}

impl CsQuestion {
    pub fn id(&self) -> &str {
        match self {
            CsQuestion::Mcq { id, .. }
            | CsQuestion::Coding { id, .. }
            | CsQuestion::Theory { id, .. } => id,
        }
    }

    pub fn question_text(&self) -> &str {
        match self {
            CsQuestion::Mcq { question_text, .. }
            | CsQuestion::Coding { question_text, .. }
            | CsQuestion::Theory { question_text, .. } => question_text,
        }
    }

    pub fn question_type(&self) -> CsQuestionType {
        match self {
            CsQuestion::Mcq { .. } => CsQuestionType::Mcq,
            CsQuestion::Coding { .. } => CsQuestionType::Coding,
            CsQuestion::Theory { .. } => CsQuestionType::Theory,
        }
    }

    pub fn options(&self) -> Option<&[McqOption]> {
        match self {
            CsQuestion::Mcq { options, .. } => Some(options),
            _ => None,
        }
    }
}

/// `/cs/submit` 请求
#[derive(Debug, Clone, Serialize)]
pub struct CsSubmission {
    pub question_id: String,
    pub question_type: CsQuestionType,
    pub question_text: String,
    pub answer: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<McqOption>>,
}

impl CsSubmission {
    pub fn for_question(question: &CsQuestion, answer: impl Into<String>) -> Self {
        Self {
            question_id: question.id().to_string(),
            question_type: question.question_type(),
            question_text: question.question_text().to_string(),
            answer: answer.into(),
            options: question.options().map(|o| o.to_vec()),
        }
    }
}

/// 判题反馈
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CsFeedback {
    pub correct: bool,
    pub explanation: String,
    #[serde(default)]
    pub detailed_solution: Option<String>,
    #[serde(default)]
    pub simulated_output: Option<String>,
    #[serde(default)]
    pub ai_feedback: Option<String>,
    #[serde(default)]
    pub correct_option_id: Option<String>,
    #[serde(default)]
    pub correct_option_text: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LearningAidType {
    Flashcards,
    Summary,
    KeyPoints,
}

impl std::str::FromStr for LearningAidType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "flashcards" => Ok(LearningAidType::Flashcards),
            "summary" => Ok(LearningAidType::Summary),
            "key_points" | "key-points" => Ok(LearningAidType::KeyPoints),
            other => Err(format!("unknown learning aid type: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LearningAidRequest {
    pub chapter_name: String,
    pub aid_type: LearningAidType,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Flashcard {
    pub question: String,
    pub answer: String,
}

/// 学习资料，按 `aid_type` 区分
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "aid_type", rename_all = "snake_case")]
pub enum LearningAid {
    Flashcards {
        chapter: String,
        flashcards: Vec<Flashcard>,
    },
    Summary {
        chapter: String,
        summary_text: String,
    },
    KeyPoints {
        chapter: String,
        key_points: Vec<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_question_union_dispatches_on_type() {
        let mcq: CsQuestion = serde_json::from_str(
            r#"{"id":"q1","chapter":"Graphs","question_text":"BFS uses?","question_type":"mcq",
                "options":[{"id":"a","text":"Queue"},{"id":"b","text":"Stack"}]}"#,
        )
        .unwrap();
        assert_eq!(mcq.question_type(), CsQuestionType::Mcq);
        assert_eq!(mcq.options().map(|o| o.len()), Some(2));

        let submission = CsSubmission::for_question(&mcq, "a");
        let json = serde_json::to_value(&submission).unwrap();
        assert_eq!(json["question_type"], "mcq");
        assert_eq!(json["options"][0]["text"], "Queue");

        let coding: CsQuestion = serde_json::from_str(
            r#"{"id":"q2","chapter":"Sorting","question_text":"Write merge sort","question_type":"coding"}"#,
        )
        .unwrap();
        assert!(matches!(coding, CsQuestion::Coding { initial_code_stub: None, .. }));
        assert!(serde_json::to_value(CsSubmission::for_question(&coding, "def f(): pass"))
            .unwrap()
            .get("options")
            .is_none());
    }

    #[test]
    fn test_learning_aid_union() {
        let aid: LearningAid = serde_json::from_str(
            r#"{"chapter":"Trees","aid_type":"key_points","key_points":["AVL","Red-black"]}"#,
        )
        .unwrap();
        assert_eq!(
            aid,
            LearningAid::KeyPoints {
                chapter: "Trees".into(),
                key_points: vec!["AVL".into(), "Red-black".into()],
            }
        );
    }
}
