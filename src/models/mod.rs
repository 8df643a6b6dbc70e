pub mod bookmark;
pub mod chat;
pub mod cs;
pub mod puzzle;
pub mod solution;
pub mod tutor;
pub mod upload;
pub mod user;

pub use bookmark::{Bookmark, BookmarkCreate};
pub use chat::{ChatMessage, ChatReply, Sender};
pub use cs::{CsFeedback, CsQuestion, CsQuestionType, CsSubmission, LearningAid, LearningAidType};
pub use puzzle::{DailyPuzzle, PuzzleVerdict};
pub use solution::{ExplainKind, ExplanationRecord, ExplanationRequest, SolutionResult, Step};
pub use tutor::{Diagnosis, GraphImage, PracticeProblem};
pub use upload::{FilePreview, UploadFile, UploadPolicy};
pub use user::{Credentials, User, UserProfile};
