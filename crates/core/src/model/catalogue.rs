use std::collections::HashSet;

use thiserror::Error;

use crate::model::ids::QuestionId;
use crate::model::question::{QuestionDraft, QuestionError, QuestionRecord};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CatalogueError {
    #[error("duplicate question id: {0}")]
    DuplicateId(QuestionId),

    #[error(transparent)]
    Question(#[from] QuestionError),
}

/// Immutable, ordered collection of questions.
///
/// An empty catalogue is valid; samplers report it instead of panicking.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalogue {
    questions: Vec<QuestionRecord>,
}

impl Catalogue {
    /// Build a catalogue, preserving order.
    ///
    /// # Errors
    ///
    /// Returns `CatalogueError::DuplicateId` if two questions share an id.
    pub fn new(questions: Vec<QuestionRecord>) -> Result<Self, CatalogueError> {
        let mut seen = HashSet::with_capacity(questions.len());
        for q in &questions {
            if !seen.insert(q.id().clone()) {
                return Err(CatalogueError::DuplicateId(q.id().clone()));
            }
        }
        Ok(Self { questions })
    }

    /// Validate every draft and build a catalogue from the result.
    ///
    /// # Errors
    ///
    /// Returns the first validation or duplicate-id failure.
    pub fn from_drafts(
        drafts: impl IntoIterator<Item = QuestionDraft>,
    ) -> Result<Self, CatalogueError> {
        let questions = drafts
            .into_iter()
            .map(QuestionDraft::validate)
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(questions)
    }

    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    #[must_use]
    pub fn questions(&self) -> &[QuestionRecord] {
        &self.questions
    }

    pub fn iter(&self) -> impl Iterator<Item = &QuestionRecord> {
        self.questions.iter()
    }

    #[must_use]
    pub fn get(&self, id: &QuestionId) -> Option<&QuestionRecord> {
        self.questions.iter().find(|q| q.id() == id)
    }
}
