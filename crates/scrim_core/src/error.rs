use thiserror::Error;

use crate::store::StoreError;

/// Machine-checkable rejection codes surfaced to API clients.
///
/// Every `ScrimError` maps to exactly one kind; the human-readable message is
/// carried by the `Display` impl and shown to the user verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    CapacityExceeded,
    DuplicateRegistration,
    PermissionDenied,
    InvalidStateForAction,
    InvalidChampionSelection,
    NotFound,
    MalformedPayload,
    TransientFailure,
}

impl ErrorKind {
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::CapacityExceeded => "capacity_exceeded",
            ErrorKind::DuplicateRegistration => "duplicate_registration",
            ErrorKind::PermissionDenied => "permission_denied",
            ErrorKind::InvalidStateForAction => "invalid_state_for_action",
            ErrorKind::InvalidChampionSelection => "invalid_champion_selection",
            ErrorKind::NotFound => "not_found",
            ErrorKind::MalformedPayload => "malformed_payload",
            ErrorKind::TransientFailure => "transient_failure",
        }
    }
}

#[derive(Error, Debug)]
pub enum ScrimError {
    #[error("{bucket} is full ({limit} players)")]
    CapacityExceeded { bucket: &'static str, limit: usize },

    #[error("{email} is already registered for this scrim")]
    DuplicateRegistration { email: String },

    #[error("{actor} is not allowed to {action}")]
    PermissionDenied { actor: String, action: &'static str },

    #[error("{action} is not allowed: {reason}")]
    InvalidStateForAction { action: &'static str, reason: String },

    #[error("invalid champion selection: {reason}")]
    InvalidChampionSelection { reason: String },

    #[error("not found: {what}")]
    NotFound { what: String },

    #[error("malformed payload: {reason}")]
    MalformedPayload { reason: String },

    #[error("could not commit after {attempts} attempts, try again")]
    TransientFailure { attempts: u32 },

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl ScrimError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ScrimError::CapacityExceeded { .. } => ErrorKind::CapacityExceeded,
            ScrimError::DuplicateRegistration { .. } => ErrorKind::DuplicateRegistration,
            ScrimError::PermissionDenied { .. } => ErrorKind::PermissionDenied,
            ScrimError::InvalidStateForAction { .. } => ErrorKind::InvalidStateForAction,
            ScrimError::InvalidChampionSelection { .. } => ErrorKind::InvalidChampionSelection,
            ScrimError::NotFound { .. } => ErrorKind::NotFound,
            ScrimError::MalformedPayload { .. } => ErrorKind::MalformedPayload,
            ScrimError::TransientFailure { .. } => ErrorKind::TransientFailure,
            ScrimError::Store(StoreError::NotFound { .. }) => ErrorKind::NotFound,
            ScrimError::Store(_) => ErrorKind::TransientFailure,
        }
    }

    /// Whether the caller may retry the same request unchanged.
    pub fn is_transient(&self) -> bool {
        matches!(self.kind(), ErrorKind::TransientFailure)
    }
}

pub type Result<T> = std::result::Result<T, ScrimError>;
