//! Shared domain types. No I/O, no storage knowledge.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// --- Principal ---

/// The acting identity a mutation is submitted on behalf of.
///
/// Records hold only a weak reference (the id); the full principal is carried
/// alongside the request on the synchronous path and rehydrated by the worker
/// on the deferred path. System-initiated mutations have no principal at all.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Principal {
    pub id: Uuid,
    pub name: Option<String>,
    /// Language code used to activate the principal's locale context before
    /// handlers run, so downstream error messages localize correctly.
    pub language: Option<String>,
}

impl Principal {
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            name: None,
            language: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }
}

// --- ErrorDetail ---

/// A single validation or execution error attached to a failed mutation.
///
/// Subscribers and handlers return these for expected business rejections.
/// Unexpected faults are serialized into the same shape so `error_detail`
/// always holds a JSON array of `{message, code?}` objects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ErrorDetail {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl ErrorDetail {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
        }
    }

    pub fn coded(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: Some(code.into()),
        }
    }
}

impl std::fmt::Display for ErrorDetail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.code {
            Some(code) => write!(f, "[{code}] {}", self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

impl From<&str> for ErrorDetail {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<String> for ErrorDetail {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn principal_builders_set_optional_fields() {
        let id = Uuid::new_v4();
        let principal = Principal::new(id)
            .with_name("Amina Diallo")
            .with_language("fr");
        assert_eq!(principal.id, id);
        assert_eq!(principal.name.as_deref(), Some("Amina Diallo"));
        assert_eq!(principal.language.as_deref(), Some("fr"));
    }

    #[test]
    fn error_detail_displays_code_when_present() {
        let coded = ErrorDetail::coded("funds", "insufficient funds");
        assert_eq!(coded.to_string(), "[funds] insufficient funds");

        let plain = ErrorDetail::new("insufficient funds");
        assert_eq!(plain.to_string(), "insufficient funds");
    }

    #[test]
    fn uncoded_detail_serializes_without_a_code_key() {
        let value = serde_json::to_value(ErrorDetail::new("declined")).unwrap();
        assert_eq!(value, serde_json::json!({ "message": "declined" }));
    }
}
