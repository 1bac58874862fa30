use quiz_core::model::Catalogue;

use crate::catalogue_file::parse_catalogue;
use crate::repository::StorageError;

const BUILTIN_QUESTIONS: &str = include_str!("../questions/builtin.json");

/// The Python debugging bank shipped with the trainer.
///
/// # Errors
///
/// Returns `StorageError` if the embedded JSON is malformed or a record fails validation.
pub fn builtin_catalogue() -> Result<Catalogue, StorageError> {
    parse_catalogue(BUILTIN_QUESTIONS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::QuestionId;

    #[test]
    fn builtin_bank_is_valid() {
        let catalogue = builtin_catalogue().unwrap();
        assert_eq!(catalogue.len(), 14);
    }

    #[test]
    fn builtin_error_lines_point_at_buggy_code() {
        let catalogue = builtin_catalogue().unwrap();
        let q = catalogue.get(&QuestionId::new("nam-01")).unwrap();
        assert_eq!(q.line(q.error_line()), Some("print(mesage)"));
        for q in catalogue.iter() {
            assert!(q.line(q.error_line()).is_some(), "{}", q.id());
        }
    }
}
