use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use thiserror::Error;

use crate::models::status::Status;
use crate::models::verify::VerifyResponse;

/// Failures of the HTTP exchange itself.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("request cancelled")]
    Cancelled,

    #[error("request deadline exceeded")]
    DeadlineExceeded,

    /// The service answered with something other than 200. The body is not read.
    #[error("verification service returned non-200 response: {status}")]
    Status { status: StatusCode, headers: HeaderMap },
}

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("failed to generate nonce: {0}")]
    RandomSource(#[from] rand::Error),

    #[error("failed to build verification url: {0}")]
    UrlBuild(String),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("failed to read verification response: {0}")]
    ResponseRead(#[from] std::io::Error),

    #[error("verification service rejected the token: {status} ({desc})", desc = status.description())]
    Failure {
        status: Status,
        response: VerifyResponse,
    },
}

impl ValidationError {
    /// Whether a fresh attempt could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            ValidationError::RandomSource(_) | ValidationError::UrlBuild(_) => false,
            ValidationError::Transport(_) | ValidationError::ResponseRead(_) => true,
            ValidationError::Failure { status, .. } => status.is_transient(),
        }
    }

    /// The protocol status for service-side rejections.
    pub fn status(&self) -> Option<Status> {
        match self {
            ValidationError::Failure { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// The raw response mapping, when the service produced one.
    pub fn response(&self) -> Option<&VerifyResponse> {
        match self {
            ValidationError::Failure { response, .. } => Some(response),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ValidationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_statuses_are_retryable() {
        let err = ValidationError::Failure {
            status: Status::BackendError,
            response: VerifyResponse::default(),
        };
        assert!(err.is_retryable());
        assert_eq!(err.status(), Some(Status::BackendError));

        let err = ValidationError::Failure {
            status: Status::ReplayedOtp,
            response: VerifyResponse::default(),
        };
        assert!(!err.is_retryable());
    }

    #[test]
    fn setup_errors_are_final() {
        assert!(!ValidationError::UrlBuild("relative URL without a base".into()).is_retryable());
        assert!(ValidationError::Transport(TransportError::Cancelled).is_retryable());
        assert!(ValidationError::Transport(TransportError::Cancelled)
            .response()
            .is_none());
    }

    #[test]
    fn failure_message_names_status() {
        let err = ValidationError::Failure {
            status: Status::BadOtp,
            response: VerifyResponse::default(),
        };
        assert_eq!(
            err.to_string(),
            "verification service rejected the token: BAD_OTP (the OTP has an invalid format)"
        );
    }
}
