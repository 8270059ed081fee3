//! Conflict detection, capacity and volunteer-coverage checks.
//!
//! Pure reads: nothing here mutates the store. The registration coordinator
//! calls these while holding the per-activity lock; the HTTP read endpoints
//! call them unlocked for advisory reports.

use serde::Serialize;

use crate::database::ActivityStore;
use crate::error::{RegistrationError, StoreError};
use crate::models::{ActivityRef, TimeRange};

/// Participant seat usage for one activity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CapacityReport {
    pub current_count: i64,
    pub capacity: i64,
    pub is_full: bool,
    pub percentage: f64,
}

/// Volunteer staffing level for one activity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoverageReport {
    pub current_volunteers: i64,
    pub required_volunteers: i64,
    pub participant_count: i64,
    pub ratio: f64,
    pub is_sufficient: bool,
}

/// First active commitment of `person_id` overlapping `range`, if any.
///
/// Scans registrations before assignments, oldest first, and skips the
/// activity being signed up for (`exclude_activity_id`) so that re-checks
/// against an existing commitment to the same activity never self-conflict.
pub async fn find_conflict(
    store: &dyn ActivityStore,
    person_id: &str,
    exclude_activity_id: &str,
    range: TimeRange,
) -> Result<Option<ActivityRef>, StoreError> {
    let commitments = store.active_commitments_for_person(person_id).await?;
    for commitment in commitments {
        if commitment.activity.id == exclude_activity_id {
            continue;
        }
        if commitment.activity.time_range().overlaps(&range) {
            return Ok(Some(commitment.activity));
        }
    }
    Ok(None)
}

/// Seat usage for `activity_id`. Counts active participant registrations
/// only; volunteer assignments never consume seats.
pub async fn check_capacity(
    store: &dyn ActivityStore,
    activity_id: &str,
) -> Result<CapacityReport, RegistrationError> {
    let activity = store
        .find_activity(activity_id)
        .await?
        .ok_or(RegistrationError::NotFound)?;
    let current_count = store.active_registration_count(activity_id).await?;
    Ok(CapacityReport {
        current_count,
        capacity: activity.capacity,
        is_full: current_count >= activity.capacity,
        percentage: current_count as f64 / activity.capacity as f64 * 100.0,
    })
}

/// Volunteer staffing for `activity_id`. The requirement grows with
/// attendance: `max(volunteer_required, ceil(participants / ratio))`.
pub async fn check_coverage(
    store: &dyn ActivityStore,
    activity_id: &str,
) -> Result<CoverageReport, RegistrationError> {
    let activity = store
        .find_activity(activity_id)
        .await?
        .ok_or(RegistrationError::NotFound)?;
    let participant_count = store.active_registration_count(activity_id).await?;
    let current_volunteers = store.active_assignment_count(activity_id).await?;
    let required_volunteers = required_volunteers(
        activity.volunteer_required,
        participant_count,
        activity.volunteer_ratio,
    );
    Ok(CoverageReport {
        current_volunteers,
        required_volunteers,
        participant_count,
        ratio: activity.volunteer_ratio,
        is_sufficient: current_volunteers >= required_volunteers,
    })
}

/// `max(floor, ceil(participants / ratio))`. Ratio is validated `> 0` when
/// the activity is written.
pub fn required_volunteers(floor: i64, participant_count: i64, ratio: f64) -> i64 {
    let from_attendance = (participant_count as f64 / ratio).ceil() as i64;
    floor.max(from_attendance)
}
