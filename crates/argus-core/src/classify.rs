//! Failure classification.
//!
//! [`ErrorClassifier`] turns a [`Failure`] into the status, category and
//! client-facing message the error envelope is built from. It is a pure
//! function of the failure and the [`RuntimeMode`].

use std::sync::OnceLock;

use http::StatusCode;
use regex::Regex;
use serde::Serialize;

use crate::failure::{ConstraintKind, ConstraintViolation, ErrorMessage, Failure, HttpPayload};
use crate::mode::RuntimeMode;

const VALIDATION_CATEGORY: &str = "Validation Error";
const VALIDATION_MESSAGE: &str = "Request validation failed";
const VALIDATION_FALLBACK: &str = "Validation failed";

const INTERNAL_CATEGORY: &str = "Internal Server Error";
const INTERNAL_MESSAGE: &str = "Internal server error";

const DUPLICATE_CATEGORY: &str = "Duplicate Entry";
const DUPLICATE_MESSAGE: &str = "A record with this value already exists";
const FOREIGN_KEY_CATEGORY: &str = "Foreign Key Violation";
const FOREIGN_KEY_MESSAGE: &str = "Referenced record does not exist";
const NOT_NULL_CATEGORY: &str = "Missing Required Field";
const NOT_NULL_MESSAGE: &str = "A required field is missing";
const DATABASE_CATEGORY: &str = "Database Error";
const DATABASE_MESSAGE: &str = "A database error occurred";

const CLIENT_CLOSED_STATUS: u16 = 499;
const CLIENT_CLOSED_CATEGORY: &str = "Client Closed Request";
const CLIENT_CLOSED_MESSAGE: &str = "Client closed request";

/// The outcome of classifying a failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifiedError {
    /// HTTP status to respond with.
    #[serde(serialize_with = "serialize_status")]
    pub status: StatusCode,
    /// Short category label, rendered as the envelope's `error` field.
    pub category: String,
    /// Client-facing message(s).
    pub message: ErrorMessage,
    /// Internal detail for logs. Never rendered to clients.
    #[serde(skip)]
    pub detail: Option<String>,
    /// Field-level violations, present only for validation failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation_errors: Option<Vec<String>>,
    /// `true` for 4xx statuses.
    pub is_recoverable_client_error: bool,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn serialize_status<S: serde::Serializer>(status: &StatusCode, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u16(status.as_u16())
}

impl ClassifiedError {
    fn new(status: StatusCode, category: impl Into<String>, message: impl Into<ErrorMessage>) -> Self {
        Self {
            status,
            category: category.into(),
            message: message.into(),
            detail: None,
            validation_errors: None,
            is_recoverable_client_error: status.is_client_error(),
        }
    }

    fn with_detail(mut self, detail: Option<String>) -> Self {
        self.detail = detail;
        self
    }

    /// Returns the status as a bare integer.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        self.status.as_u16()
    }
}

/// Maps failures to [`ClassifiedError`]s for a fixed runtime mode.
///
/// # Example
///
/// ```
/// use argus_core::{ConstraintViolation, ErrorClassifier, Failure, RuntimeMode};
///
/// let failure = Failure::from(ConstraintViolation::not_null("email"));
///
/// let dev = ErrorClassifier::new(RuntimeMode::Development).classify(&failure);
/// assert_eq!(dev.status.as_u16(), 400);
/// assert_eq!(dev.message.to_string(), "Missing required field: email");
///
/// let prod = ErrorClassifier::new(RuntimeMode::Production).classify(&failure);
/// assert_eq!(prod.message.to_string(), "A required field is missing");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ErrorClassifier {
    mode: RuntimeMode,
}

impl ErrorClassifier {
    /// Creates a classifier for the given mode.
    #[must_use]
    pub const fn new(mode: RuntimeMode) -> Self {
        Self { mode }
    }

    /// Returns the mode this classifier was built for.
    #[must_use]
    pub const fn mode(&self) -> RuntimeMode {
        self.mode
    }

    /// Classifies a failure. Never panics.
    #[must_use]
    pub fn classify(&self, failure: &Failure) -> ClassifiedError {
        match failure {
            Failure::Validation { messages } => classify_validation(messages),
            Failure::Http {
                status,
                name,
                message,
                payload,
            } => classify_http(*status, name, message, payload),
            Failure::Persistence(violation) => classify_persistence(violation, self.mode),
            Failure::Runtime {
                name,
                message,
                stack,
            } => ClassifiedError::new(StatusCode::INTERNAL_SERVER_ERROR, name.as_str(), message.as_str())
                .with_detail(stack.clone()),
            Failure::ClientClosed => ClassifiedError::new(
                client_closed_status(),
                CLIENT_CLOSED_CATEGORY,
                CLIENT_CLOSED_MESSAGE,
            ),
            Failure::Opaque(raw) => {
                ClassifiedError::new(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_CATEGORY, INTERNAL_MESSAGE)
                    .with_detail(Some(raw.clone()))
            }
        }
    }
}

/// Classifies `failure` under `mode`.
#[must_use]
pub fn classify(failure: &Failure, mode: RuntimeMode) -> ClassifiedError {
    ErrorClassifier::new(mode).classify(failure)
}

fn client_closed_status() -> StatusCode {
    StatusCode::from_u16(CLIENT_CLOSED_STATUS).unwrap_or(StatusCode::BAD_REQUEST)
}

fn classify_validation(messages: &[String]) -> ClassifiedError {
    let violations = if messages.is_empty() {
        vec![VALIDATION_FALLBACK.to_string()]
    } else {
        messages.to_vec()
    };
    let mut classified =
        ClassifiedError::new(StatusCode::BAD_REQUEST, VALIDATION_CATEGORY, VALIDATION_MESSAGE);
    classified.validation_errors = Some(violations);
    classified
}

fn classify_http(status: u16, name: &str, message: &str, payload: &HttpPayload) -> ClassifiedError {
    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    match payload {
        HttpPayload::Text(text) => ClassifiedError::new(status, name, text.as_str()),
        HttpPayload::Structured {
            message: payload_message,
            error,
        } => {
            let message = payload_message
                .clone()
                .unwrap_or_else(|| ErrorMessage::Single(message.to_string()));
            let category = error.as_deref().unwrap_or(name);
            ClassifiedError::new(status, category, message)
        }
    }
}

fn classify_persistence(violation: &ConstraintViolation, mode: RuntimeMode) -> ClassifiedError {
    let verbose = !mode.is_production();
    let (category, message) = match violation.kind() {
        ConstraintKind::Unique => {
            let message = violation
                .detail
                .as_deref()
                .filter(|_| verbose)
                .and_then(unique_column)
                .map_or_else(
                    || DUPLICATE_MESSAGE.to_string(),
                    |column| format!("A record with this {column} already exists"),
                );
            (DUPLICATE_CATEGORY, message)
        }
        ConstraintKind::ForeignKey => {
            let message = violation
                .detail
                .clone()
                .filter(|_| verbose)
                .unwrap_or_else(|| FOREIGN_KEY_MESSAGE.to_string());
            (FOREIGN_KEY_CATEGORY, message)
        }
        ConstraintKind::NotNull => {
            let column = violation
                .column
                .clone()
                .or_else(|| not_null_column(&violation.message))
                .filter(|_| verbose);
            let message = column.map_or_else(
                || NOT_NULL_MESSAGE.to_string(),
                |column| format!("Missing required field: {column}"),
            );
            (NOT_NULL_CATEGORY, message)
        }
        ConstraintKind::Other => (DATABASE_CATEGORY, DATABASE_MESSAGE.to_string()),
    };

    let mut detail = format!("{} {}", violation.code, violation.message);
    if let Some(extra) = &violation.detail {
        detail.push_str(" | ");
        detail.push_str(extra);
    }
    ClassifiedError::new(StatusCode::BAD_REQUEST, category, message).with_detail(Some(detail))
}

fn unique_column(detail: &str) -> Option<String> {
    static KEY: OnceLock<Option<Regex>> = OnceLock::new();
    KEY.get_or_init(|| Regex::new(r"Key \((?P<column>[^)]+)\)=").ok())
        .as_ref()?
        .captures(detail)
        .map(|caps| caps["column"].to_string())
}

fn not_null_column(message: &str) -> Option<String> {
    static COLUMN: OnceLock<Option<Regex>> = OnceLock::new();
    COLUMN
        .get_or_init(|| Regex::new(r#"null value in column "(?P<column>[^"]+)""#).ok())
        .as_ref()?
        .captures(message)
        .map(|caps| caps["column"].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dev() -> ErrorClassifier {
        ErrorClassifier::new(RuntimeMode::Development)
    }

    fn prod() -> ErrorClassifier {
        ErrorClassifier::new(RuntimeMode::Production)
    }

    #[test]
    fn test_validation_keeps_field_messages_separate() {
        let failure = Failure::validation(["name must not be empty", "age must be positive"]);
        let classified = prod().classify(&failure);
        assert_eq!(classified.status, StatusCode::BAD_REQUEST);
        assert_eq!(classified.category, "Validation Error");
        assert_eq!(classified.message.to_string(), "Request validation failed");
        assert_eq!(
            classified.validation_errors,
            Some(vec![
                "name must not be empty".to_string(),
                "age must be positive".to_string()
            ])
        );
    }

    #[test]
    fn test_empty_validation_uses_fallback_message() {
        let classified = dev().classify(&Failure::validation(Vec::<String>::new()));
        assert_eq!(
            classified.validation_errors,
            Some(vec!["Validation failed".to_string()])
        );
    }

    #[test]
    fn test_http_structured_payload() {
        let classified = dev().classify(&Failure::not_found("User 7 not found"));
        assert_eq!(classified.status, StatusCode::NOT_FOUND);
        assert_eq!(classified.category, "Not Found");
        assert_eq!(classified.message.to_string(), "User 7 not found");
        assert!(classified.is_recoverable_client_error);
        assert!(classified.validation_errors.is_none());
    }

    #[test]
    fn test_http_payload_without_fields_falls_back_to_failure() {
        let failure = Failure::Http {
            status: 409,
            name: "ConflictException".to_string(),
            message: "Already archived".to_string(),
            payload: HttpPayload::Structured {
                message: None,
                error: None,
            },
        };
        let classified = dev().classify(&failure);
        assert_eq!(classified.status, StatusCode::CONFLICT);
        assert_eq!(classified.category, "ConflictException");
        assert_eq!(classified.message.to_string(), "Already archived");
    }

    #[test]
    fn test_http_list_message_is_preserved() {
        let failure = Failure::Http {
            status: 400,
            name: "BadRequestException".to_string(),
            message: "Bad Request".to_string(),
            payload: HttpPayload::Structured {
                message: Some(ErrorMessage::Many(vec!["a".to_string(), "b".to_string()])),
                error: Some("Bad Request".to_string()),
            },
        };
        let classified = dev().classify(&failure);
        assert_eq!(classified.message.to_lines(), vec!["a", "b"]);
    }

    #[test]
    fn test_http_text_payload() {
        let failure = Failure::http_text(StatusCode::FORBIDDEN, "nope");
        let classified = dev().classify(&failure);
        assert_eq!(classified.status, StatusCode::FORBIDDEN);
        assert_eq!(classified.category, Failure::HTTP_EXCEPTION);
        assert_eq!(classified.message.to_string(), "nope");
    }

    #[test]
    fn test_unique_violation_names_column_outside_production() {
        let failure = Failure::from(ConstraintViolation::unique(
            "Key (email)=(ann@example.com) already exists.",
        ));
        let classified = dev().classify(&failure);
        assert_eq!(classified.status, StatusCode::BAD_REQUEST);
        assert_eq!(classified.category, "Duplicate Entry");
        assert_eq!(
            classified.message.to_string(),
            "A record with this email already exists"
        );
    }

    #[test]
    fn test_unique_violation_is_generic_in_production() {
        let failure = Failure::from(ConstraintViolation::unique(
            "Key (email)=(ann@example.com) already exists.",
        ));
        let classified = prod().classify(&failure);
        assert_eq!(
            classified.message.to_string(),
            "A record with this value already exists"
        );
        assert!(!classified.message.contains("email"));
        assert!(classified.detail.unwrap().contains("email"));
    }

    #[test]
    fn test_unique_violation_without_parsable_detail() {
        let failure = Failure::from(ConstraintViolation::unique("something odd"));
        let classified = dev().classify(&failure);
        assert_eq!(
            classified.message.to_string(),
            "A record with this value already exists"
        );
    }

    #[test]
    fn test_foreign_key_violation() {
        let detail = "Key (team_id)=(9) is not present in table \"teams\".";
        let failure = Failure::from(ConstraintViolation::foreign_key(detail));
        assert_eq!(dev().classify(&failure).message.to_string(), detail);
        let classified = prod().classify(&failure);
        assert_eq!(classified.category, "Foreign Key Violation");
        assert_eq!(
            classified.message.to_string(),
            "Referenced record does not exist"
        );
    }

    #[test]
    fn test_not_null_column_from_driver_message() {
        let violation = ConstraintViolation::new(
            "23502",
            "null value in column \"email\" of relation \"users\" violates not-null constraint",
        );
        let classified = dev().classify(&Failure::from(violation));
        assert_eq!(classified.category, "Missing Required Field");
        assert_eq!(classified.message.to_string(), "Missing required field: email");
    }

    #[test]
    fn test_not_null_in_test_mode_is_verbose() {
        let failure = Failure::from(ConstraintViolation::not_null("email"));
        let classified = classify(&failure, RuntimeMode::Test);
        assert!(classified.message.contains("email"));
    }

    #[test]
    fn test_other_database_code_is_always_generic() {
        let violation = ConstraintViolation::new("42P01", "relation \"users\" does not exist");
        for classifier in [dev(), prod()] {
            let classified = classifier.classify(&Failure::from(violation.clone()));
            assert_eq!(classified.status, StatusCode::BAD_REQUEST);
            assert_eq!(classified.category, "Database Error");
            assert_eq!(classified.message.to_string(), "A database error occurred");
        }
    }

    #[test]
    fn test_runtime_failure() {
        let failure = Failure::runtime("TypeError", "x is undefined");
        let classified = prod().classify(&failure);
        assert_eq!(classified.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(classified.category, "TypeError");
        assert_eq!(classified.message.to_string(), "x is undefined");
        assert!(!classified.is_recoverable_client_error);
    }

    #[test]
    fn test_opaque_failure() {
        let classified = dev().classify(&Failure::Opaque("42".to_string()));
        assert_eq!(classified.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(classified.category, "Internal Server Error");
        assert_eq!(classified.message.to_string(), "Internal server error");
    }

    #[test]
    fn test_client_closed() {
        let classified = dev().classify(&Failure::ClientClosed);
        assert_eq!(classified.status_code(), 499);
        assert_eq!(classified.category, "Client Closed Request");
    }

    #[test]
    fn test_classification_is_pure() {
        let failures = vec![
            Failure::validation(["a"]),
            Failure::not_found("x"),
            Failure::from(ConstraintViolation::not_null("email")),
            Failure::runtime("Error", "boom"),
            Failure::Opaque("?".to_string()),
        ];
        let first: Vec<_> = failures.iter().map(|f| dev().classify(f)).collect();
        let second: Vec<_> = failures.iter().rev().map(|f| dev().classify(f)).collect();
        let second: Vec<_> = second.into_iter().rev().collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_serializes_wire_fields() {
        let classified = dev().classify(&Failure::validation(["a"]));
        let json = serde_json::to_value(&classified).unwrap();
        assert_eq!(json["status"], 400);
        assert_eq!(json["validationErrors"][0], "a");
        assert!(json.get("detail").is_none());
    }

    proptest::proptest! {
        #[test]
        fn prop_unique_column_shown_only_outside_production(column in "[a-z_]{1,24}") {
            let failure = Failure::from(ConstraintViolation::unique(
                format!("Key ({column})=(x) already exists."),
            ));
            let verbose = dev().classify(&failure);
            proptest::prop_assert_eq!(
                verbose.message.to_string(),
                format!("A record with this {column} already exists")
            );
            let generic = prod().classify(&failure);
            proptest::prop_assert_eq!(generic.message.to_string(), DUPLICATE_MESSAGE);
        }
    }
}
