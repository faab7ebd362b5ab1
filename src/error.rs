use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use derive_more::Display;
use serde_json::json;

use crate::domain::adjustment::AdjustmentError;
use crate::domain::approval::{ApprovalError, TransitionError};
use crate::domain::hierarchy::AssignmentError;
use crate::domain::holidays::OptInError;

/// Errors returned by the HTTP handlers, rendered as `{"message": ...}`.
#[derive(Debug, Display)]
pub enum ApiError {
    #[display(fmt = "{}", _0)]
    BadRequest(String),
    #[display(fmt = "{}", _0)]
    Unauthorized(String),
    #[display(fmt = "{}", _0)]
    Forbidden(String),
    #[display(fmt = "{}", _0)]
    NotFound(String),
    #[display(fmt = "{}", _0)]
    Conflict(String),
    #[display(fmt = "Internal Server Error")]
    Internal,
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        ApiError::BadRequest(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        ApiError::Forbidden(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        ApiError::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        ApiError::Conflict(msg.into())
    }

    /// `map_err` adapter that logs a database failure under `context`.
    pub fn db(context: &'static str) -> impl FnOnce(sqlx::Error) -> ApiError {
        move |e| {
            tracing::error!(error = %e, "{}", context);
            ApiError::Internal
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({ "message": self.to_string() }))
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(e: sqlx::Error) -> Self {
        tracing::error!(error = %e, "Database error");
        ApiError::Internal
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        tracing::error!(error = %e, "Unexpected error");
        ApiError::Internal
    }
}

impl From<AdjustmentError> for ApiError {
    fn from(e: AdjustmentError) -> Self {
        match e {
            AdjustmentError::NotFound => ApiError::NotFound(e.to_string()),
            AdjustmentError::InvalidReason(_) | AdjustmentError::InvalidDays(_) => {
                ApiError::BadRequest(e.to_string())
            }
            AdjustmentError::Store(inner) => inner.into(),
        }
    }
}

impl From<TransitionError> for ApiError {
    fn from(e: TransitionError) -> Self {
        ApiError::Conflict(e.to_string())
    }
}

impl From<ApprovalError> for ApiError {
    fn from(e: ApprovalError) -> Self {
        match e {
            ApprovalError::NotFound => ApiError::NotFound(e.to_string()),
            ApprovalError::Forbidden => ApiError::Forbidden(e.to_string()),
            ApprovalError::Transition(t) => t.into(),
            ApprovalError::AlreadyProcessed
            | ApprovalError::InsufficientBalance { .. }
            | ApprovalError::BalanceChanged => ApiError::Conflict(e.to_string()),
            ApprovalError::Store(inner) => inner.into(),
        }
    }
}

impl From<AssignmentError> for ApiError {
    fn from(e: AssignmentError) -> Self {
        match e {
            AssignmentError::UnknownEmployee => ApiError::NotFound(e.to_string()),
            AssignmentError::UnknownManager | AssignmentError::SelfAssignment => {
                ApiError::BadRequest(e.to_string())
            }
            AssignmentError::Cycle => ApiError::Conflict(e.to_string()),
        }
    }
}

impl From<OptInError> for ApiError {
    fn from(e: OptInError) -> Self {
        match e {
            OptInError::NotRegional | OptInError::OutsideState => {
                ApiError::BadRequest(e.to_string())
            }
            OptInError::LimitReached => ApiError::Conflict(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::approval::LeaveStatus;
    use actix_web::body::to_bytes;

    #[actix_web::test]
    async fn renders_message_body() {
        let resp = ApiError::not_found("Holiday not found").error_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let body = to_bytes(resp.into_body()).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value, json!({ "message": "Holiday not found" }));
    }

    #[test]
    fn domain_errors_map_to_statuses() {
        let cases: Vec<(ApiError, StatusCode)> = vec![
            (ApprovalError::Forbidden.into(), StatusCode::FORBIDDEN),
            (ApprovalError::AlreadyProcessed.into(), StatusCode::CONFLICT),
            (
                ApprovalError::Transition(TransitionError(LeaveStatus::Approved)).into(),
                StatusCode::CONFLICT,
            ),
            (
                ApprovalError::InsufficientBalance {
                    requested: 3.0,
                    available: 1.0,
                }
                .into(),
                StatusCode::CONFLICT,
            ),
            (ApprovalError::BalanceChanged.into(), StatusCode::CONFLICT),
            (AdjustmentError::NotFound.into(), StatusCode::NOT_FOUND),
            (AdjustmentError::InvalidDays(0.3).into(), StatusCode::BAD_REQUEST),
            (AssignmentError::Cycle.into(), StatusCode::CONFLICT),
            (OptInError::LimitReached.into(), StatusCode::CONFLICT),
            (
                AdjustmentError::Store(anyhow::anyhow!("boom")).into(),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(err.status_code(), status, "{err}");
        }
    }

    #[test]
    fn internal_errors_hide_details() {
        let err: ApiError = sqlx::Error::RowNotFound.into();
        assert_eq!(err.to_string(), "Internal Server Error");
    }
}
