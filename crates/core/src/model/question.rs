use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::QuestionId;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question id cannot be empty")]
    EmptyId,

    #[error("question {id} has no code lines")]
    EmptyCode { id: String },

    #[error("question {id}: error line {line} is outside 1..={len}")]
    ErrorLineOutOfRange { id: String, line: u32, len: usize },

    #[error("question {id}: invalid validation pattern: {message}")]
    InvalidPattern { id: String, message: String },
}

//
// ─── DRAFT ─────────────────────────────────────────────────────────────────────
//

/// Unvalidated question as it appears in catalogue files.
///
/// `code` is the snippet body with lines joined by `\n`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionDraft {
    pub id: String,
    pub code: String,
    pub error_line: u32,
    pub correct_line_text: String,
    pub explanation: String,
    pub error_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_regex: Option<String>,
}

impl QuestionDraft {
    /// Validate the draft into an immutable `QuestionRecord`.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` if the id or code is empty, the error line does not
    /// point into the snippet, or the validation pattern does not compile.
    pub fn validate(self) -> Result<QuestionRecord, QuestionError> {
        let id = self.id.trim().to_owned();
        if id.is_empty() {
            return Err(QuestionError::EmptyId);
        }

        let code: Vec<String> = self.code.lines().map(str::to_owned).collect();
        if code.is_empty() {
            return Err(QuestionError::EmptyCode { id });
        }

        let line_index = usize::try_from(self.error_line).unwrap_or(usize::MAX);
        if line_index == 0 || line_index > code.len() {
            return Err(QuestionError::ErrorLineOutOfRange {
                id,
                line: self.error_line,
                len: code.len(),
            });
        }

        let validation = match self.validation_regex {
            Some(pattern) if !pattern.trim().is_empty() => {
                Some(ValidationPattern::compile(&id, pattern)?)
            }
            _ => None,
        };

        Ok(QuestionRecord {
            id: QuestionId::new(id),
            code,
            error_line: self.error_line,
            correct_line_text: self.correct_line_text,
            explanation: self.explanation,
            error_type: self.error_type,
            validation,
        })
    }
}

//
// ─── VALIDATION PATTERN ────────────────────────────────────────────────────────
//

/// Alternate acceptance pattern for a corrected line.
///
/// The pattern must match the whole (normalized) submission.
#[derive(Debug, Clone)]
pub struct ValidationPattern {
    source: String,
    regex: Regex,
}

impl ValidationPattern {
    fn compile(id: &str, source: String) -> Result<Self, QuestionError> {
        let regex = Regex::new(&format!("^(?:{source})$")).map_err(|e| {
            QuestionError::InvalidPattern {
                id: id.to_owned(),
                message: e.to_string(),
            }
        })?;
        Ok(Self { source, regex })
    }

    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    #[must_use]
    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

impl PartialEq for ValidationPattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Eq for ValidationPattern {}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// A buggy snippet with exactly one faulty line and its known correction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionRecord {
    id: QuestionId,
    code: Vec<String>,
    error_line: u32,
    correct_line_text: String,
    explanation: String,
    error_type: String,
    validation: Option<ValidationPattern>,
}

impl QuestionRecord {
    /// The question served when the catalogue cannot provide one.
    #[must_use]
    pub fn fallback() -> Self {
        Self {
            id: QuestionId::new("fallback-01"),
            code: vec![
                "def greet(name)".to_owned(),
                "    print(\"Hello, \" + name)".to_owned(),
            ],
            error_line: 1,
            correct_line_text: "def greet(name):".to_owned(),
            explanation: "Syntax Error: A function definition must end with a colon (:)."
                .to_owned(),
            error_type: "SyntaxError".to_owned(),
            validation: None,
        }
    }

    #[must_use]
    pub fn id(&self) -> &QuestionId {
        &self.id
    }

    #[must_use]
    pub fn code(&self) -> &[String] {
        &self.code
    }

    /// Number of lines in the snippet.
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.code.len()
    }

    /// Text of the given 1-based line, if it exists.
    #[must_use]
    pub fn line(&self, line: u32) -> Option<&str> {
        let index = usize::try_from(line).ok()?.checked_sub(1)?;
        self.code.get(index).map(String::as_str)
    }

    /// 1-based index of the faulty line.
    #[must_use]
    pub fn error_line(&self) -> u32 {
        self.error_line
    }

    #[must_use]
    pub fn correct_line_text(&self) -> &str {
        &self.correct_line_text
    }

    #[must_use]
    pub fn explanation(&self) -> &str {
        &self.explanation
    }

    #[must_use]
    pub fn error_type(&self) -> &str {
        &self.error_type
    }

    #[must_use]
    pub fn validation(&self) -> Option<&ValidationPattern> {
        self.validation.as_ref()
    }

    /// Convert back into the file representation.
    #[must_use]
    pub fn to_draft(&self) -> QuestionDraft {
        QuestionDraft {
            id: self.id.as_str().to_owned(),
            code: self.code.join("\n"),
            error_line: self.error_line,
            correct_line_text: self.correct_line_text.clone(),
            explanation: self.explanation.clone(),
            error_type: self.error_type.clone(),
            validation_regex: self.validation.as_ref().map(|v| v.source.clone()),
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> QuestionDraft {
        QuestionDraft {
            id: "nam-01".into(),
            code: "message = \"Hello World\"\nprint(mesage)".into(),
            error_line: 2,
            correct_line_text: "print(message)".into(),
            explanation: "NameError".into(),
            error_type: "NameError".into(),
            validation_regex: None,
        }
    }

    #[test]
    fn validates_and_splits_lines() {
        let q = draft().validate().unwrap();
        assert_eq!(q.line_count(), 2);
        assert_eq!(q.line(2), Some("print(mesage)"));
        assert_eq!(q.line(0), None);
        assert_eq!(q.line(3), None);
    }

    #[test]
    fn rejects_out_of_range_error_line() {
        let mut d = draft();
        d.error_line = 3;
        let err = d.validate().unwrap_err();
        assert!(matches!(
            err,
            QuestionError::ErrorLineOutOfRange { line: 3, len: 2, .. }
        ));

        let mut d = draft();
        d.error_line = 0;
        assert!(d.validate().is_err());
    }

    #[test]
    fn rejects_empty_id_and_code() {
        let mut d = draft();
        d.id = "  ".into();
        assert_eq!(d.validate().unwrap_err(), QuestionError::EmptyId);

        let mut d = draft();
        d.code = String::new();
        assert!(matches!(d.validate(), Err(QuestionError::EmptyCode { .. })));
    }

    #[test]
    fn compiles_anchored_pattern() {
        let mut d = draft();
        d.validation_regex = Some(r"print\((message|'Hello World')\)".into());
        let q = d.validate().unwrap();
        let pattern = q.validation().unwrap();
        assert!(pattern.is_match("print(message)"));
        assert!(!pattern.is_match("x = print(message)"));
    }

    #[test]
    fn rejects_invalid_pattern() {
        let mut d = draft();
        d.validation_regex = Some("print((".into());
        assert!(matches!(
            d.validate(),
            Err(QuestionError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn draft_uses_camel_case_keys() {
        let json = r#"{
            "id": "syn-01",
            "code": "def f()\n  pass",
            "errorLine": 1,
            "correctLineText": "def f():",
            "explanation": "colon",
            "errorType": "SyntaxError"
        }"#;
        let d: QuestionDraft = serde_json::from_str(json).unwrap();
        let q = d.validate().unwrap();
        assert_eq!(q.error_line(), 1);
        assert!(q.validation().is_none());
        assert_eq!(q.to_draft().code, "def f()\n  pass");
    }

    #[test]
    fn fallback_points_at_real_line() {
        let q = QuestionRecord::fallback();
        assert_eq!(q.line(q.error_line()), Some("def greet(name)"));
    }
}
