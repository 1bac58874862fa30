use serde::{Deserialize, Serialize};

use crate::model::identity::Identity;
use crate::model::ids::{QuestionId, UserId};
use crate::model::question::QuestionRecord;

/// Outcome of one completed round, handed to the reporting sink.
///
/// Written once per round, including timeouts. The session does not keep it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultRecord {
    pub user_id: UserId,
    pub student_display_name: Option<String>,
    pub question_id: QuestionId,
    pub error_type: String,
    pub is_correct: bool,
    pub score: u32,
    pub time_taken_ms: u64,
}

impl ResultRecord {
    #[must_use]
    pub fn new(
        identity: &Identity,
        question: &QuestionRecord,
        is_correct: bool,
        score: u32,
        time_taken_ms: u64,
    ) -> Self {
        Self {
            user_id: identity.id.clone(),
            student_display_name: identity.display_name.clone(),
            question_id: question.id().clone(),
            error_type: question.error_type().to_owned(),
            is_correct,
            score,
            time_taken_ms,
        }
    }
}
