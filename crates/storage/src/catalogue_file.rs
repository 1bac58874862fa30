use std::path::{Path, PathBuf};

use async_trait::async_trait;
use quiz_core::model::{Catalogue, QuestionDraft};

use crate::repository::{QuestionSource, StorageError};

/// Parse a JSON array of question records into a validated catalogue.
///
/// # Errors
///
/// Returns `StorageError::Serialization` for malformed JSON and
/// `StorageError::Catalogue` for records that fail validation.
pub fn parse_catalogue(json: &str) -> Result<Catalogue, StorageError> {
    let drafts: Vec<QuestionDraft> =
        serde_json::from_str(json).map_err(|e| StorageError::Serialization(e.to_string()))?;
    Ok(Catalogue::from_drafts(drafts)?)
}

/// Catalogue read from a JSON file each time it is loaded.
#[derive(Debug, Clone)]
pub struct JsonCatalogueFile {
    path: PathBuf,
}

impl JsonCatalogueFile {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl QuestionSource for JsonCatalogueFile {
    async fn load_catalogue(&self) -> Result<Catalogue, StorageError> {
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| StorageError::Io(format!("{}: {e}", self.path.display())))?;
        let catalogue = parse_catalogue(&raw)?;
        tracing::debug!(
            path = %self.path.display(),
            questions = catalogue.len(),
            "loaded question catalogue"
        );
        Ok(catalogue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_json_is_a_serialization_error() {
        let err = parse_catalogue("[{\"id\": 1}").unwrap_err();
        assert!(matches!(err, StorageError::Serialization(_)));
    }

    #[test]
    fn invalid_record_is_a_catalogue_error() {
        let json = r#"[{
            "id": "bad",
            "code": "x = 1",
            "errorLine": 4,
            "correctLineText": "x = 2",
            "explanation": "",
            "errorType": "Logical Error"
        }]"#;
        let err = parse_catalogue(json).unwrap_err();
        assert!(matches!(err, StorageError::Catalogue(_)));
    }

    #[test]
    fn empty_array_is_an_empty_catalogue() {
        assert!(parse_catalogue("[]").unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_file_is_an_io_error() {
        let source = JsonCatalogueFile::new("/definitely/not/here.json");
        let err = source.load_catalogue().await.unwrap_err();
        assert!(matches!(err, StorageError::Io(_)));
    }
}
