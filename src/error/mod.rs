//!
//! # Error Handling
//!
//! Every failure raised while handling a request is an [`AppError`], a closed
//! set of three kinds:
//!
//! - [`AppError::Validation`]: the request did not match its schemas. Always 400.
//! - [`AppError::Domain`]: a business rule was violated (not found, duplicate,
//!   bad credentials). Carries its own status (400 when unset) and optional
//!   metadata.
//! - [`AppError::Unclassified`]: anything else, from the database driver to a
//!   failed token encoding. Defaults to 500.
//!
//! Handlers and collaborators only ever raise errors; turning them into HTTP
//! responses happens in one place, the [`classifier::ErrorClassifier`]
//! middleware, whose verbosity depends on the configured [`Mode`].
//!
//! `From` implementations for `sqlx::Error`, `jsonwebtoken::errors::Error` and
//! `bcrypt::BcryptError` allow plain `?` propagation from handlers.

pub mod classifier;

pub use classifier::ErrorClassifier;

use actix_web::{
    http::{header::ContentType, StatusCode},
    HttpResponse, ResponseError,
};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::config::Mode;
use crate::validation::{RequestPart, ValidationFailure};

/// Body sent when an error envelope cannot be serialised.
pub const FALLBACK_BODY: &str = r#"{"success":false,"message":"An error occurred"}"#;

/// Message shown in production for errors whose details stay on the server.
pub const GENERIC_MESSAGE: &str = "An error occurred";

/// All errors that can reach the error classifier.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Validation(#[from] ValidationFailure),
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Unclassified(#[from] UnclassifiedError),
}

/// A violated business rule.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{name}: {message}")]
pub struct DomainError {
    /// Short machine-readable kind, e.g. `UserNotFound`.
    pub name: &'static str,
    /// Description shown outside production.
    pub message: String,
    pub status: Option<StatusCode>,
    /// Free-form diagnostic fields; never shown in production.
    pub metadata: Map<String, Value>,
}

impl DomainError {
    pub fn new(name: &'static str, message: impl Into<String>) -> Self {
        Self {
            name,
            message: message.into(),
            status: None,
            metadata: Map::new(),
        }
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("NotFound", message).with_status(StatusCode::NOT_FOUND)
    }

    pub fn duplicate(message: impl Into<String>) -> Self {
        Self::new("Duplicate", message).with_status(StatusCode::CONFLICT)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("Unauthorized", message).with_status(StatusCode::UNAUTHORIZED)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new("Forbidden", message).with_status(StatusCode::FORBIDDEN)
    }

    pub fn user_not_found() -> Self {
        Self::new("UserNotFound", "User not found in database").with_status(StatusCode::NOT_FOUND)
    }

    pub fn bad_password() -> Self {
        Self::new("BadPassword", "Passwords don't match").with_status(StatusCode::UNAUTHORIZED)
    }
}

/// Any failure that is neither a validation failure nor a business rule.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{name}: {message}")]
pub struct UnclassifiedError {
    pub name: String,
    pub message: String,
    pub status: Option<StatusCode>,
    /// The `source()` chain of the original error, outermost first.
    pub causes: Vec<String>,
}

impl UnclassifiedError {
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
            status: None,
            causes: Vec::new(),
        }
    }

    /// Captures `error` and its chain of sources.
    pub fn from_error(name: impl Into<String>, error: &(dyn std::error::Error + 'static)) -> Self {
        let mut causes = Vec::new();
        let mut current = error.source();
        while let Some(cause) = current {
            causes.push(cause.to_string());
            current = cause.source();
        }
        Self {
            causes,
            ..Self::new(name, error.to_string())
        }
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = Some(status);
        self
    }
}

/// Error envelope: `{success: false, message?, statusText?, error?}`.
#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(rename = "statusText", skip_serializing_if = "Option::is_none")]
    pub status_text: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
}

/// Full error description used outside production.
#[derive(Debug, Serialize)]
struct Diagnostic<'a> {
    name: &'a str,
    message: &'a str,
    status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    metadata: Option<&'a Map<String, Value>>,
    stack: &'a [String],
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Domain(err) => err.status.unwrap_or(StatusCode::BAD_REQUEST),
            AppError::Unclassified(err) => err.status.unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        }
    }

    /// Short kind name used in logs and diagnostic bodies.
    pub fn name(&self) -> &str {
        match self {
            AppError::Validation(_) => "ValidationFailure",
            AppError::Domain(err) => err.name,
            AppError::Unclassified(err) => &err.name,
        }
    }

    /// Builds the envelope for `mode`. Outside validation failures, production
    /// only reports the status and [`GENERIC_MESSAGE`].
    pub fn envelope(&self, mode: Mode) -> ErrorEnvelope {
        let status = self.status();
        let status_text = status.canonical_reason();

        match (self, mode.is_production()) {
            (AppError::Validation(failure), true) => ErrorEnvelope {
                success: false,
                message: None,
                status_text,
                error: Some(part_map(failure.summary().into_iter())),
            },
            (AppError::Validation(failure), false) => ErrorEnvelope {
                success: false,
                message: status_text.map(str::to_owned),
                status_text,
                error: Some(part_map(failure.details().into_iter())),
            },
            (AppError::Domain(_) | AppError::Unclassified(_), true) => ErrorEnvelope {
                success: false,
                message: Some(GENERIC_MESSAGE.to_owned()),
                status_text,
                error: None,
            },
            (AppError::Domain(err), false) => ErrorEnvelope {
                success: false,
                message: Some(err.message.clone()),
                status_text,
                error: serde_json::to_value(Diagnostic {
                    name: err.name,
                    message: &err.message,
                    status: status.as_u16(),
                    metadata: (!err.metadata.is_empty()).then_some(&err.metadata),
                    stack: &[],
                })
                .ok(),
            },
            (AppError::Unclassified(err), false) => ErrorEnvelope {
                success: false,
                message: Some(err.message.clone()),
                status_text,
                error: serde_json::to_value(Diagnostic {
                    name: &err.name,
                    message: &err.message,
                    status: status.as_u16(),
                    metadata: None,
                    stack: &err.causes,
                })
                .ok(),
            },
        }
    }

    /// Renders the response for `mode`, falling back to a fixed 500 body if
    /// the envelope cannot be serialised.
    pub fn render(&self, mode: Mode) -> HttpResponse {
        match serde_json::to_vec(&self.envelope(mode)) {
            Ok(body) => HttpResponse::build(self.status())
                .content_type(ContentType::json())
                .body(body),
            Err(err) => {
                log::error!("failed to serialise error envelope: {}", err);
                fallback_response()
            }
        }
    }
}

fn part_map<V: Into<Value>>(parts: impl Iterator<Item = (RequestPart, V)>) -> Value {
    Value::Object(
        parts
            .map(|(part, value)| (part.as_str().to_owned(), value.into()))
            .collect(),
    )
}

/// The fixed response used when nothing better can be produced.
pub fn fallback_response() -> HttpResponse {
    HttpResponse::InternalServerError()
        .content_type(ContentType::json())
        .body(FALLBACK_BODY)
}

/// Renders errors that escape without passing the classifier, using the
/// production envelope so no detail leaks.
impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        self.status()
    }

    fn error_response(&self) -> HttpResponse {
        self.render(Mode::Production)
    }
}

/// `RowNotFound` becomes a not-found domain error and unique violations a
/// duplicate; everything else is an unclassified database error.
impl From<sqlx::Error> for AppError {
    fn from(error: sqlx::Error) -> AppError {
        match &error {
            sqlx::Error::RowNotFound => DomainError::not_found("Record not found").into(),
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                DomainError::duplicate("Record already exists").into()
            }
            _ => UnclassifiedError::from_error("DatabaseError", &error).into(),
        }
    }
}

/// Token verification failures are authentication failures.
impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(error: jsonwebtoken::errors::Error) -> AppError {
        DomainError::unauthorized("Invalid token")
            .with_metadata("reason", error.to_string())
            .into()
    }
}

impl From<bcrypt::BcryptError> for AppError {
    fn from(error: bcrypt::BcryptError) -> AppError {
        UnclassifiedError::from_error("PasswordHashError", &error).into()
    }
}
