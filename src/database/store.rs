use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::StoreResult;
use crate::models::{
    Activity, FormAnswer, FormField, Person, PersonCommitment, Registration, VolunteerAssignment,
};

/// Data access for activities, commitments, and registration forms.
///
/// The engine owns no state of its own; every check re-reads through this
/// trait. Implementations must make each write atomic (a failed insert
/// leaves no partial rows) and must enforce the active-pair invariant: at
/// most one PENDING/CONFIRMED registration, and at most one such
/// assignment, per (activity, person) pair. Violations surface as
/// [`StoreError::DuplicatePair`](crate::error::StoreError::DuplicatePair).
///
/// Serialization of validate-then-commit sequences is *not* the store's
/// job; the coordinator holds a per-activity lock around them.
#[async_trait]
pub trait ActivityStore: Send + Sync {
    async fn find_activity(&self, activity_id: &str) -> StoreResult<Option<Activity>>;

    async fn insert_activity(&self, activity: Activity) -> StoreResult<()>;

    /// Full-row update keyed on `activity.id`; `NotFound` when absent.
    async fn update_activity(&self, activity: Activity) -> StoreResult<()>;

    /// Activities starting at or after `now`, soonest first.
    async fn list_upcoming_activities(
        &self,
        now: DateTime<Utc>,
        limit: i64,
    ) -> StoreResult<Vec<Activity>>;

    async fn count_activities(&self) -> StoreResult<i64>;

    /// Active (PENDING/CONFIRMED) registrations for one activity.
    async fn active_registration_count(&self, activity_id: &str) -> StoreResult<i64>;

    /// Active volunteer assignments for one activity.
    async fn active_assignment_count(&self, activity_id: &str) -> StoreResult<i64>;

    /// Active registrations across all activities.
    async fn count_active_registrations(&self) -> StoreResult<i64>;

    /// Active assignments across all activities.
    async fn count_active_assignments(&self) -> StoreResult<i64>;

    /// All of a person's active commitments with the activities they book:
    /// registrations first, then assignments, each oldest-first.
    async fn active_commitments_for_person(
        &self,
        person_id: &str,
    ) -> StoreResult<Vec<PersonCommitment>>;

    /// Persist a registration plus its form answers in one atomic write.
    async fn insert_registration(
        &self,
        registration: Registration,
        answers: Vec<FormAnswer>,
    ) -> StoreResult<()>;

    async fn insert_assignment(&self, assignment: VolunteerAssignment) -> StoreResult<()>;

    /// Answers stored with a registration, for roster/export collaborators.
    async fn answers_for_registration(&self, registration_id: &str) -> StoreResult<Vec<FormAnswer>>;

    /// The activity's form fields ordered by position.
    async fn form_fields(&self, activity_id: &str) -> StoreResult<Vec<FormField>>;

    /// Replace the activity's form wholesale; an empty list removes it.
    async fn replace_form_fields(
        &self,
        activity_id: &str,
        fields: Vec<FormField>,
    ) -> StoreResult<()>;
}

/// Read access to people. Account management lives outside the engine; this
/// is only what registration and alerting need.
#[async_trait]
pub trait PersonDirectory: Send + Sync {
    async fn find_person(&self, person_id: &str) -> StoreResult<Option<Person>>;

    async fn insert_person(&self, person: Person) -> StoreResult<()>;

    /// Addresses of every staff member, for threshold alerts.
    async fn staff_emails(&self) -> StoreResult<Vec<String>>;
}

/// The full store bundle the platform wires together.
pub trait PlatformStore: ActivityStore + PersonDirectory + Send + Sync {}

impl<T> PlatformStore for T where T: ActivityStore + PersonDirectory + Send + Sync {}
