use thiserror::Error;

/// Domain failures the controller reports to the user without
/// propagating further.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("event not found")]
    EventNotFound,
    #[error("user not found")]
    UserNotFound,
    #[error("registration not found")]
    RegistrationNotFound,
    #[error("only privileged users can perform this action")]
    PrivilegeDenied,
    #[error("title must be between 1 and 100 characters")]
    InvalidTitle,
    #[error("description must be at most 500 characters")]
    InvalidDescription,
    #[error("event draft is missing required fields")]
    IncompleteDraft,
}

#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("malformed callback payload: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("unsupported callback payload version {0}")]
    UnsupportedVersion(u8),
}
