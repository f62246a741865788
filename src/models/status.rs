use std::fmt;

use serde::Serialize;

/// Status codes returned by the validation protocol.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Ok,
    BadOtp,
    ReplayedOtp,
    BadSignature,
    MissingParameter,
    NoSuchClient,
    OperationNotAllowed,
    BackendError,
    NotEnoughAnswers,
    ReplayedRequest,
    /// Any code outside the protocol's list, or no `status` field at all.
    Unknown,
}

impl Status {
    pub fn from_code(code: &str) -> Self {
        match code {
            "OK" => Status::Ok,
            "BAD_OTP" => Status::BadOtp,
            "REPLAYED_OTP" => Status::ReplayedOtp,
            "BAD_SIGNATURE" => Status::BadSignature,
            "MISSING_PARAMETER" => Status::MissingParameter,
            "NO_SUCH_CLIENT" => Status::NoSuchClient,
            "OPERATION_NOT_ALLOWED" => Status::OperationNotAllowed,
            "BACKEND_ERROR" => Status::BackendError,
            "NOT_ENOUGH_ANSWERS" => Status::NotEnoughAnswers,
            "REPLAYED_REQUEST" => Status::ReplayedRequest,
            _ => Status::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Ok => "OK",
            Status::BadOtp => "BAD_OTP",
            Status::ReplayedOtp => "REPLAYED_OTP",
            Status::BadSignature => "BAD_SIGNATURE",
            Status::MissingParameter => "MISSING_PARAMETER",
            Status::NoSuchClient => "NO_SUCH_CLIENT",
            Status::OperationNotAllowed => "OPERATION_NOT_ALLOWED",
            Status::BackendError => "BACKEND_ERROR",
            Status::NotEnoughAnswers => "NOT_ENOUGH_ANSWERS",
            Status::ReplayedRequest => "REPLAYED_REQUEST",
            Status::Unknown => "UNKNOWN",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Status::Ok => "the OTP is valid",
            Status::BadOtp => "the OTP has an invalid format",
            Status::ReplayedOtp => "the OTP has already been seen by the service",
            Status::BadSignature => "the HMAC signature verification failed",
            Status::MissingParameter => "the request lacks a parameter",
            Status::NoSuchClient => "the request id does not exist",
            Status::OperationNotAllowed => "the request id is not allowed to verify OTPs",
            Status::BackendError => "unexpected error in the verification server",
            Status::NotEnoughAnswers => {
                "server could not get requested number of syncs before timeout"
            }
            Status::ReplayedRequest => "server has seen the OTP/nonce combination before",
            Status::Unknown => "unknown error",
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Status::Ok)
    }

    /// Server-side conditions that may clear up on a later attempt.
    pub fn is_transient(&self) -> bool {
        matches!(self, Status::BackendError | Status::NotEnoughAnswers)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
