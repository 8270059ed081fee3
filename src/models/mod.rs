pub mod activity;
pub mod form;
pub mod person;
pub mod registration;
pub mod time_range;

pub use activity::{Activity, ActivityRef, NewActivity};
pub use form::{FieldKind, FormField, NewFormField, VisibilityCondition};
pub use person::{Person, PersonRole};
pub use registration::{
    CommitmentKind, CommitmentStatus, FormAnswer, PersonCommitment, Registration,
    VolunteerAssignment,
};
pub use time_range::TimeRange;
