//! Failure taxonomy.
//!
//! A [`Failure`] is decided where it originates: input validation produces
//! [`Failure::Validation`], the persistence layer produces
//! [`Failure::Persistence`], handlers produce [`Failure::Http`] or
//! [`Failure::Runtime`]. The classifier matches on the tag and never inspects
//! runtime types.

use http::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A client-facing message: a single string or an ordered list of strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ErrorMessage {
    /// One message.
    Single(String),
    /// Several messages, order preserved.
    Many(Vec<String>),
}

impl ErrorMessage {
    /// Returns the messages as an ordered list.
    #[must_use]
    pub fn to_lines(&self) -> Vec<String> {
        match self {
            Self::Single(message) => vec![message.clone()],
            Self::Many(messages) => messages.clone(),
        }
    }

    /// Returns `true` if any contained message includes `needle`.
    #[must_use]
    pub fn contains(&self, needle: &str) -> bool {
        match self {
            Self::Single(message) => message.contains(needle),
            Self::Many(messages) => messages.iter().any(|m| m.contains(needle)),
        }
    }
}

impl std::fmt::Display for ErrorMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Single(message) => f.write_str(message),
            Self::Many(messages) => f.write_str(&messages.join("; ")),
        }
    }
}

impl From<&str> for ErrorMessage {
    fn from(value: &str) -> Self {
        Self::Single(value.to_string())
    }
}

impl From<String> for ErrorMessage {
    fn from(value: String) -> Self {
        Self::Single(value)
    }
}

impl From<Vec<String>> for ErrorMessage {
    fn from(value: Vec<String>) -> Self {
        Self::Many(value)
    }
}

/// Body attached to an HTTP-level failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HttpPayload {
    /// A structured payload with optional message and error label.
    Structured {
        /// Client-facing message(s).
        message: Option<ErrorMessage>,
        /// Short error label (e.g. "Not Found").
        error: Option<String>,
    },
    /// A bare string payload.
    Text(String),
}

/// Constraint families recognized by their SQLSTATE code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstraintKind {
    /// `23505` unique_violation.
    Unique,
    /// `23503` foreign_key_violation.
    ForeignKey,
    /// `23502` not_null_violation.
    NotNull,
    /// Any other driver code.
    Other,
}

impl ConstraintKind {
    /// SQLSTATE for a unique constraint violation.
    pub const UNIQUE_VIOLATION: &'static str = "23505";
    /// SQLSTATE for a foreign key violation.
    pub const FOREIGN_KEY_VIOLATION: &'static str = "23503";
    /// SQLSTATE for a not-null violation.
    pub const NOT_NULL_VIOLATION: &'static str = "23502";

    /// Maps a vendor code to a constraint kind.
    #[must_use]
    pub fn from_code(code: &str) -> Self {
        match code {
            Self::UNIQUE_VIOLATION => Self::Unique,
            Self::FOREIGN_KEY_VIOLATION => Self::ForeignKey,
            Self::NOT_NULL_VIOLATION => Self::NotNull,
            _ => Self::Other,
        }
    }
}

/// A persistence-layer rejection carrying a vendor code.
///
/// Field names follow what PostgreSQL drivers expose on a database error.
///
/// # Example
///
/// ```
/// use argus_core::{ConstraintKind, ConstraintViolation};
///
/// let violation = ConstraintViolation::unique("Key (email)=(a@b.c) already exists.");
/// assert_eq!(violation.kind(), ConstraintKind::Unique);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ConstraintViolation {
    /// Vendor error code (SQLSTATE).
    pub code: String,
    /// Primary driver message.
    pub message: String,
    /// Driver detail line, e.g. `Key (email)=(a@b.c) already exists.`
    pub detail: Option<String>,
    /// Offending column, when the driver reports it.
    pub column: Option<String>,
    /// Offending table, when the driver reports it.
    pub table: Option<String>,
}

impl ConstraintViolation {
    /// Creates a violation from a code and driver message.
    #[must_use]
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            detail: None,
            column: None,
            table: None,
        }
    }

    /// Creates a unique-constraint violation with the given detail.
    #[must_use]
    pub fn unique(detail: impl Into<String>) -> Self {
        Self::new(
            ConstraintKind::UNIQUE_VIOLATION,
            "duplicate key value violates unique constraint",
        )
        .with_detail(detail)
    }

    /// Creates a foreign-key violation with the given detail.
    #[must_use]
    pub fn foreign_key(detail: impl Into<String>) -> Self {
        Self::new(
            ConstraintKind::FOREIGN_KEY_VIOLATION,
            "insert or update violates foreign key constraint",
        )
        .with_detail(detail)
    }

    /// Creates a not-null violation for the given column.
    #[must_use]
    pub fn not_null(column: impl Into<String>) -> Self {
        let column = column.into();
        Self::new(
            ConstraintKind::NOT_NULL_VIOLATION,
            format!("null value in column \"{column}\" violates not-null constraint"),
        )
        .with_column(column)
    }

    /// Sets the detail line.
    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Sets the offending column.
    #[must_use]
    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }

    /// Sets the offending table.
    #[must_use]
    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    /// Returns the constraint family.
    #[must_use]
    pub fn kind(&self) -> ConstraintKind {
        ConstraintKind::from_code(&self.code)
    }

    /// Renders the driver fields as a multi-line trace.
    #[must_use]
    pub fn trace(&self) -> String {
        let mut trace = format!("ConstraintViolation: {}\n    code: {}", self.message, self.code);
        for (label, value) in [
            ("detail", &self.detail),
            ("table", &self.table),
            ("column", &self.column),
        ] {
            if let Some(value) = value {
                trace.push_str(&format!("\n    {label}: {value}"));
            }
        }
        trace
    }
}

/// Everything a request can fail with.
///
/// # Example
///
/// ```
/// use argus_core::Failure;
/// use http::StatusCode;
///
/// let failure = Failure::http(StatusCode::NOT_FOUND, "User 42 not found");
/// assert!(failure.to_string().contains("User 42"));
/// ```
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Failure {
    /// Input validation rejected the request.
    #[error("Validation failed: {}", .messages.join("; "))]
    Validation {
        /// Field-level violation messages, order preserved.
        messages: Vec<String>,
    },

    /// A failure carrying an explicit HTTP status.
    #[error("{name}: {message}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Failure type name.
        name: String,
        /// The failure's own message.
        message: String,
        /// Structured or text payload.
        payload: HttpPayload,
    },

    /// A persistence constraint violation.
    #[error(transparent)]
    Persistence(#[from] ConstraintViolation),

    /// A generic error-shaped failure.
    #[error("{name}: {message}")]
    Runtime {
        /// Error type name.
        name: String,
        /// Error message.
        message: String,
        /// Stack or cause chain, for logs.
        stack: Option<String>,
    },

    /// The transport aborted before the handler completed.
    #[error("Client closed request")]
    ClientClosed,

    /// A failure of no recognized shape.
    #[error("Unrecognized failure: {0}")]
    Opaque(String),
}

impl Failure {
    /// Name given to HTTP-level failures built by the constructors below.
    pub const HTTP_EXCEPTION: &'static str = "HttpException";

    /// Creates a validation failure from field-level messages.
    #[must_use]
    pub fn validation<I, S>(messages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Validation {
            messages: messages.into_iter().map(Into::into).collect(),
        }
    }

    /// Creates an HTTP-level failure with a structured payload.
    ///
    /// The payload error label is the status' canonical reason.
    #[must_use]
    pub fn http(status: StatusCode, message: impl Into<String>) -> Self {
        let message = message.into();
        Self::Http {
            status: status.as_u16(),
            name: Self::HTTP_EXCEPTION.to_string(),
            message: message.clone(),
            payload: HttpPayload::Structured {
                message: Some(ErrorMessage::Single(message)),
                error: status.canonical_reason().map(ToString::to_string),
            },
        }
    }

    /// Creates an HTTP-level failure whose payload is a bare string.
    #[must_use]
    pub fn http_text(status: StatusCode, text: impl Into<String>) -> Self {
        let text = text.into();
        Self::Http {
            status: status.as_u16(),
            name: Self::HTTP_EXCEPTION.to_string(),
            message: text.clone(),
            payload: HttpPayload::Text(text),
        }
    }

    /// Creates a 400 failure.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::http(StatusCode::BAD_REQUEST, message)
    }

    /// Creates a 401 failure.
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::http(StatusCode::UNAUTHORIZED, message)
    }

    /// Creates a 404 failure.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::http(StatusCode::NOT_FOUND, message)
    }

    /// Creates a generic runtime failure.
    #[must_use]
    pub fn runtime(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Runtime {
            name: name.into(),
            message: message.into(),
            stack: None,
        }
    }

    /// Creates a runtime failure from any error, recording its cause chain.
    ///
    /// The name is the unqualified type name of `E`.
    #[must_use]
    pub fn from_error<E: std::error::Error>(error: &E) -> Self {
        let full_name = std::any::type_name::<E>();
        let name = full_name
            .split('<')
            .next()
            .and_then(|path| path.rsplit("::").next())
            .unwrap_or(full_name);

        let mut stack = format!("{name}: {error}");
        let mut source = error.source();
        while let Some(cause) = source {
            stack.push_str("\n    caused by: ");
            stack.push_str(&cause.to_string());
            source = cause.source();
        }

        Self::Runtime {
            name: name.to_string(),
            message: error.to_string(),
            stack: Some(stack),
        }
    }

    /// Returns the stack or cause chain of an error-shaped failure.
    ///
    /// Runtime failures report the chain they captured. Other shapes get a
    /// trace built from what they carry, such as the driver fields of a
    /// persistence violation. Opaque failures have none.
    #[must_use]
    pub fn stack(&self) -> Option<String> {
        if !self.is_error_shaped() {
            return None;
        }
        Some(match self {
            Self::Runtime {
                name,
                message,
                stack,
            } => stack.clone().unwrap_or_else(|| format!("{name}: {message}")),
            Self::Http {
                status,
                name,
                message,
                ..
            } => format!("{name}: {message}\n    status: {status}"),
            Self::Persistence(violation) => violation.trace(),
            other => format!("{}: {other}", other.type_name()),
        })
    }

    /// Returns the name logs and stacks use for this failure's type.
    #[must_use]
    pub fn type_name(&self) -> &str {
        match self {
            Self::Validation { .. } => "ValidationError",
            Self::Http { name, .. } | Self::Runtime { name, .. } => name,
            Self::Persistence(_) => "ConstraintViolation",
            Self::ClientClosed => "ClientClosed",
            Self::Opaque(_) => "Opaque",
        }
    }

    /// Returns `true` for every failure except [`Failure::Opaque`].
    #[must_use]
    pub const fn is_error_shaped(&self) -> bool {
        !matches!(self, Self::Opaque(_))
    }
}

impl From<anyhow::Error> for Failure {
    fn from(error: anyhow::Error) -> Self {
        Self::Runtime {
            name: "Error".to_string(),
            message: error.to_string(),
            stack: Some(format!("{error:?}")),
        }
    }
}
