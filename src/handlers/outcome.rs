//! The tagged answer every mutating action returns: `success`, `info` (nothing to do) or `error`.

use crate::errors::ServiceError;
use axum::{
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;
use utoipa::ToSchema;
use validator::ValidationErrors;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeKind {
    Success,
    Info,
    Error,
}

/// JSON body of a mutating action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ActionOutcome {
    #[serde(rename = "type")]
    pub kind: OutcomeKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

/// An [`ActionOutcome`] with the HTTP status it is sent under.
#[derive(Debug)]
pub struct Outcome {
    pub status: StatusCode,
    pub body: ActionOutcome,
}

pub type ActionResult = Result<Outcome, Outcome>;

impl Outcome {
    fn new(status: StatusCode, kind: OutcomeKind, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ActionOutcome {
                kind,
                message: message.into(),
                errors: None,
                data: None,
                request_id: crate::tracing::current_request_id()
                    .map(|rid| rid.as_str().to_string()),
            },
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(StatusCode::OK, OutcomeKind::Success, message)
    }

    pub fn created(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CREATED, OutcomeKind::Success, message)
    }

    /// The action had nothing to do.
    pub fn info(message: impl Into<String>) -> Self {
        Self::new(StatusCode::OK, OutcomeKind::Info, message)
    }

    pub fn error(status: StatusCode, message: impl Into<String>) -> Self {
        Self::new(status, OutcomeKind::Error, message)
    }

    /// Field-level messages for a body that failed validation.
    pub fn invalid(errors: &ValidationErrors) -> Self {
        let mut messages: Vec<String> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |error| {
                    format!(
                        "{}: {}",
                        field,
                        error
                            .message
                            .as_ref()
                            .map(|m| m.to_string())
                            .unwrap_or_else(|| "Invalid value".to_string())
                    )
                })
            })
            .collect();
        messages.sort();
        Self::error(StatusCode::BAD_REQUEST, "Validation failed").with_errors(messages)
    }

    pub fn with_errors(mut self, errors: Vec<String>) -> Self {
        self.body.errors = Some(errors);
        self
    }

    /// Attaches a serialized payload; a payload that fails to serialize is dropped.
    pub fn with_data<T: Serialize>(mut self, data: &T) -> Self {
        match serde_json::to_value(data) {
            Ok(value) => self.body.data = Some(value),
            Err(e) => warn!(error = %e, "Outcome payload is not serializable"),
        }
        self
    }
}

impl From<ServiceError> for Outcome {
    fn from(err: ServiceError) -> Self {
        let status = err.status_code();
        if status.is_server_error() {
            tracing::error!(error = %err, "Action failed");
        }
        let message = err.response_message();
        let outcome = Self::error(status, message.clone());
        match err {
            ServiceError::ValidationError(_) => outcome.with_errors(vec![message]),
            _ => outcome,
        }
    }
}

impl From<ValidationErrors> for Outcome {
    fn from(errors: ValidationErrors) -> Self {
        Self::invalid(&errors)
    }
}

impl From<JsonRejection> for Outcome {
    fn from(rejection: JsonRejection) -> Self {
        Self::error(StatusCode::BAD_REQUEST, "Validation failed")
            .with_errors(vec![rejection.body_text()])
    }
}

impl From<PathRejection> for Outcome {
    fn from(rejection: PathRejection) -> Self {
        Self::error(StatusCode::BAD_REQUEST, "Validation failed")
            .with_errors(vec![rejection.body_text()])
    }
}

impl IntoResponse for Outcome {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}
