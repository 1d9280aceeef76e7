use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::application::error::ErrorReport;
use crate::application::posts::PostError;
use crate::application::repos::RepoError;

#[derive(Debug, Serialize)]
pub struct ApiErrorBody {
    pub error: ApiErrorMessage,
}

pub mod codes {
    pub const BAD_REQUEST: &str = "bad_request";
    pub const INVALID_INPUT: &str = "invalid_input";
    pub const NOT_FOUND: &str = "not_found";
    pub const DUPLICATE: &str = "duplicate";
    pub const STORE: &str = "store_error";
    pub const CACHE: &str = "cache_error";
    pub const DEADLINE: &str = "deadline_exceeded";
}

#[derive(Debug, Serialize)]
pub struct ApiErrorMessage {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: &'static str,
    hint: Option<String>,
    diagnostic: Option<ErrorReport>,
}

impl ApiError {
    pub fn new(
        status: StatusCode,
        code: &'static str,
        message: &'static str,
        hint: Option<String>,
    ) -> Self {
        Self {
            status,
            code,
            message,
            hint,
            diagnostic: None,
        }
    }

    pub fn bad_request(message: &'static str, hint: Option<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, codes::BAD_REQUEST, message, hint)
    }

    pub fn invalid_input(hint: impl Into<String>) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            codes::INVALID_INPUT,
            "Invalid input",
            Some(hint.into()),
        )
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> &'static str {
        self.code
    }

    fn with_diagnostic(mut self, err: &PostError) -> Self {
        self.diagnostic = Some(ErrorReport::from_error(
            "infra::http::api::posts",
            self.status,
            err,
        ));
        self
    }
}

impl From<PostError> for ApiError {
    fn from(err: PostError) -> Self {
        let api = match &err {
            PostError::Validation { cause, .. } => ApiError::invalid_input(cause.to_string()),
            PostError::NotFound { .. } => {
                ApiError::new(StatusCode::NOT_FOUND, codes::NOT_FOUND, "Post not found", None)
            }
            PostError::Store {
                cause: RepoError::Duplicate { constraint },
                ..
            } => ApiError::new(
                StatusCode::CONFLICT,
                codes::DUPLICATE,
                "Duplicate record",
                Some(constraint.clone()),
            ),
            PostError::Store {
                cause: RepoError::InvalidInput { message },
                ..
            } => ApiError::invalid_input(message.clone()),
            PostError::Store { .. } => ApiError::new(
                StatusCode::SERVICE_UNAVAILABLE,
                codes::STORE,
                "Store unavailable",
                None,
            ),
            PostError::Cache { .. } => ApiError::new(
                StatusCode::SERVICE_UNAVAILABLE,
                codes::CACHE,
                "Cache unavailable",
                None,
            ),
            PostError::Timeout { after, .. } => ApiError::new(
                StatusCode::GATEWAY_TIMEOUT,
                codes::DEADLINE,
                "Deadline exceeded",
                Some(format!("operation exceeded {}ms", after.as_millis())),
            ),
        };

        api.with_diagnostic(&err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let report = self.diagnostic.unwrap_or_else(|| {
            ErrorReport::from_message(
                "infra::http::api",
                self.status,
                format!(
                    "{}: {}",
                    self.code,
                    self.hint.as_deref().unwrap_or(self.message)
                ),
            )
        });
        let body = ApiErrorBody {
            error: ApiErrorMessage {
                code: self.code.to_string(),
                message: self.message.to_string(),
                hint: self.hint,
            },
        };
        let mut response = (self.status, Json(body)).into_response();
        report.attach(&mut response);
        response
    }
}
