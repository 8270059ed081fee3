use thiserror::Error;

use crate::models::ActivityRef;

pub type StoreResult<T> = Result<T, StoreError>;

/// Data-access failures. The engine treats every variant except
/// `DuplicatePair` as opaque backend trouble.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record not found: {0}")]
    NotFound(String),

    /// The store refused an insert that would create a second active
    /// registration or assignment for the same (activity, person) pair.
    #[error("active commitment already exists for activity {activity_id} and person {person_id}")]
    DuplicatePair {
        activity_id: String,
        person_id: String,
    },

    #[error("backend error: {0}")]
    Backend(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Backend(err.to_string())
    }
}

/// Why a registration or assignment submission was rejected. Every variant
/// is terminal for the submission; the coordinator never retries.
#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("activity not found")]
    NotFound,

    /// Caller identity does not match the person being registered.
    #[error("forbidden")]
    Forbidden,

    #[error("activity is full")]
    CapacityExceeded,

    /// The person already holds an active overlapping commitment; the
    /// conflicting activity is carried for display to the caller.
    #[error("time conflict with activity \"{}\"", .0.title)]
    ScheduleConflict(ActivityRef),

    /// The person already holds an active commitment for this activity.
    #[error("already registered for this activity")]
    AlreadyRegistered,

    #[error("invalid request: {0}")]
    Validation(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Mail delivery failure. Post-commit effects log these and move on; a lost
/// email never rolls back a stored registration.
#[derive(Debug, Error)]
#[error("mail delivery failed: {0}")]
pub struct MailError(pub String);

/// Rejections of staff activity writes. Field-definition problems carry the
/// offending key so the form editor can point at it.
#[derive(Debug, Error)]
pub enum ActivityValidationError {
    #[error("activity not found")]
    NotFound,

    #[error("only staff may manage activities")]
    Forbidden,

    #[error("title must not be empty")]
    EmptyTitle,

    #[error("location must not be empty")]
    EmptyLocation,

    #[error("starts_at must precede ends_at")]
    InvalidTimeRange,

    #[error("capacity must be at least 1")]
    InvalidCapacity,

    #[error("volunteer_required must not be negative")]
    InvalidVolunteerFloor,

    #[error("volunteer_ratio must be greater than zero")]
    InvalidVolunteerRatio,

    #[error("form field key must not be empty")]
    EmptyFieldKey,

    #[error("duplicate form field key: {0}")]
    DuplicateFieldKey(String),

    #[error("select field {0} needs at least one option")]
    EmptySelectOptions(String),

    #[error("field {field} is conditioned on unknown field {referenced}")]
    UnknownConditionField { field: String, referenced: String },

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}
