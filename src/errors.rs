//! # Error Types Module
//!
//! Structured errors for the backend gateway, the per-user stores and the
//! user-facing clinic operations.

use thiserror::Error;

/// Failures of a call to the clinic REST API.
///
/// The detail is kept for logging; users only ever see the generic message
/// mapped from [`ClinicError`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GatewayError {
    #[error("authentication rejected")]
    AuthFailed,

    #[error("resource not found")]
    NotFound,

    #[error("no user with email {0}")]
    UserNotFound(String),

    #[error("no rooms available")]
    NoRoomsAvailable,

    #[error("backend unavailable, circuit breaker open")]
    Unavailable,

    #[error("unexpected HTTP status {0}")]
    Status(u16),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("invalid response body: {0}")]
    Decode(String),
}

impl GatewayError {
    /// Whether the failure says something about backend health
    /// (as opposed to a well-formed negative answer).
    pub fn is_backend_fault(&self) -> bool {
        match self {
            GatewayError::Transport(_) | GatewayError::Decode(_) => true,
            GatewayError::Status(code) => *code >= 500,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            GatewayError::Decode(err.to_string())
        } else {
            GatewayError::Transport(err.to_string())
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
#[error("state store error: {0}")]
pub struct StoreError(pub String);

/// Outcome errors of the booking flow and the other clinic operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClinicError {
    #[error("user is not logged in")]
    Unauthenticated,

    #[error("no doctors available")]
    NoDoctorsAvailable,

    #[error("doctor lookup failed")]
    DoctorLookupFailed,

    #[error("no rooms available for the appointment")]
    NoRoomsAvailable,

    #[error("appointment creation failed")]
    AppointmentCreationFailed,

    #[error("no booking in progress")]
    NoActiveBooking,

    #[error("action not valid at the current booking stage")]
    UnexpectedStep,

    #[error("selection is not one of the offered options: {0}")]
    InvalidSelection(String),

    #[error("login rejected")]
    AuthFailed,

    #[error("credentials must be sent as email:password")]
    InvalidCredentialsFormat,

    #[error("operation failed: {0}")]
    OperationFailed(#[from] GatewayError),

    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl ClinicError {
    /// Localization key of the message shown to the user.
    pub fn message_key(&self) -> &'static str {
        match self {
            ClinicError::Unauthenticated => "error-unauthenticated",
            ClinicError::NoDoctorsAvailable => "error-no-doctors",
            ClinicError::DoctorLookupFailed => "error-doctor-lookup",
            ClinicError::NoRoomsAvailable => "error-no-rooms",
            ClinicError::AppointmentCreationFailed => "error-appointment-creation",
            ClinicError::NoActiveBooking => "error-no-active-booking",
            ClinicError::UnexpectedStep => "error-unexpected-step",
            ClinicError::InvalidSelection(_) => "error-invalid-selection",
            ClinicError::AuthFailed => "error-login-failed",
            ClinicError::InvalidCredentialsFormat => "error-credentials-format",
            ClinicError::OperationFailed(_) | ClinicError::Storage(_) => "error-operation-failed",
        }
    }
}
