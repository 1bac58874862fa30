use serde::{Deserialize, Serialize};

use crate::model::ids::UserId;

/// The signed-in player as seen by the quiz.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub id: UserId,
    pub display_name: Option<String>,
}

impl Identity {
    #[must_use]
    pub fn new(id: UserId, display_name: Option<String>) -> Self {
        Self { id, display_name }
    }

    /// Display name for headers and reports; `Anonymous` when the provider had none.
    #[must_use]
    pub fn display_name_or_anonymous(&self) -> &str {
        self.display_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or("Anonymous")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_names_fall_back_to_anonymous() {
        let named = Identity::new(UserId::new("1"), Some("Ada".into()));
        let blank = Identity::new(UserId::new("2"), Some("  ".into()));
        let missing = Identity::new(UserId::new("3"), None);
        assert_eq!(named.display_name_or_anonymous(), "Ada");
        assert_eq!(blank.display_name_or_anonymous(), "Anonymous");
        assert_eq!(missing.display_name_or_anonymous(), "Anonymous");
    }
}
