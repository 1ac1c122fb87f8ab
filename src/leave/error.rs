use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use chrono::NaiveDate;
use serde_json::json;

use super::store::StoreError;
use crate::model::leave_request::LeaveStatus;

#[derive(Debug, thiserror::Error)]
pub enum LeaveError {
    #[error("Employee {0} not found")]
    EmployeeNotFound(u64),
    #[error("Employee {0} is not active")]
    EmployeeInactive(u64),
    #[error("from_date {from} is after to_date {to}")]
    InvalidDateRange { from: NaiveDate, to: NaiveDate },
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("{field} must be at most {max} characters")]
    FieldTooLong { field: &'static str, max: usize },
    #[error("Insufficient leave balance: requested {requested} day(s), {available} available")]
    InsufficientBalance { requested: u32, available: u32 },
    #[error("Leave request {0} not found")]
    NotFound(u64),
    #[error("Leave request {id} already {status}")]
    AlreadyDecided { id: u64, status: LeaveStatus },
    #[error("Invalid or expired token")]
    InvalidToken,
    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl ResponseError for LeaveError {
    fn status_code(&self) -> StatusCode {
        match self {
            LeaveError::EmployeeNotFound(_) | LeaveError::NotFound(_) | LeaveError::InvalidToken => {
                StatusCode::NOT_FOUND
            }
            LeaveError::EmployeeInactive(_) => StatusCode::FORBIDDEN,
            LeaveError::InvalidDateRange { .. }
            | LeaveError::MissingField(_)
            | LeaveError::FieldTooLong { .. }
            | LeaveError::InsufficientBalance { .. } => StatusCode::BAD_REQUEST,
            LeaveError::AlreadyDecided { .. } => StatusCode::CONFLICT,
            LeaveError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            // storage details stay in the log
            LeaveError::Storage(_) => "Internal Server Error".to_string(),
            other => other.to_string(),
        };
        HttpResponse::build(self.status_code()).json(json!({ "message": message }))
    }
}
