//! Registration coordinator: the one write path for participant
//! registrations and volunteer assignments.
//!
//! Every submission runs its checks and its commit while holding a lock
//! scoped to the target activity, so capacity can never be oversold by two
//! requests validating against the same stale count. Post-commit effects
//! (confirmation mail, threshold alerts) run after the lock is released and
//! never undo a stored commitment.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use tokio::sync::OwnedMutexGuard;
use tracing::{info, warn};
use uuid::Uuid;

use crate::database::PlatformStore;
use crate::error::{RegistrationError, StoreError};
use crate::models::{
    Activity, CommitmentKind, CommitmentStatus, FormAnswer, FormField, PersonRole, Registration,
    VolunteerAssignment,
};
use crate::services::alert_service::{check_and_alert_capacity, check_and_alert_coverage};
use crate::services::mailer::Mailer;
use crate::services::scheduling_service::{check_capacity, find_conflict};

/// One async mutex per activity id, created on first use. Submissions for
/// unrelated activities never wait on each other. This closes the
/// check-then-act race within a single process; a multi-instance deployment
/// would need store-side advisory locks instead.
#[derive(Default)]
pub struct ActivityLocks {
    inner: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl ActivityLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, activity_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            // The map only hands out Arcs, so a poisoned map is still intact.
            let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            map.entry(activity_id.to_string())
                .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}

/// A submission: `actor_person_id` is the authenticated caller,
/// `person_id` the person being committed. `role` picks the target
/// collection; answers only apply to participant registrations.
#[derive(Debug, Clone)]
pub struct SubmitRequest {
    pub actor_person_id: String,
    pub person_id: String,
    pub activity_id: String,
    pub role: PersonRole,
    pub answers: serde_json::Map<String, serde_json::Value>,
}

/// What was committed.
#[derive(Debug, Clone, Serialize)]
pub struct SubmittedRecord {
    pub id: String,
    pub kind: CommitmentKind,
    pub status: CommitmentStatus,
}

/// Validate and commit one submission. One shot: every rejection is
/// terminal and nothing is retried.
pub async fn submit(
    store: &dyn PlatformStore,
    mailer: &dyn Mailer,
    locks: &ActivityLocks,
    req: SubmitRequest,
) -> Result<SubmittedRecord, RegistrationError> {
    if req.actor_person_id != req.person_id {
        return Err(RegistrationError::Forbidden);
    }
    if req.role == PersonRole::Staff {
        return Err(RegistrationError::Validation("Invalid role".to_string()));
    }

    let (record, activity) = {
        let _guard = locks.acquire(&req.activity_id).await;
        commit_one(store, &req).await?
    };

    info!(
        id = %record.id,
        activity_id = %req.activity_id,
        person_id = %req.person_id,
        role = req.role.as_str(),
        "commitment stored"
    );

    post_commit(store, mailer, &req, &activity).await;
    Ok(record)
}

/// The gate sequence and the write, all under the activity lock.
async fn commit_one(
    store: &dyn PlatformStore,
    req: &SubmitRequest,
) -> Result<(SubmittedRecord, Activity), RegistrationError> {
    let activity = store
        .find_activity(&req.activity_id)
        .await?
        .ok_or(RegistrationError::NotFound)?;

    // Seats are a participant concern; volunteers join full activities.
    if req.role == PersonRole::Participant {
        let capacity = check_capacity(store, &req.activity_id).await?;
        if capacity.is_full {
            return Err(RegistrationError::CapacityExceeded);
        }
    }

    if let Some(conflict) =
        find_conflict(store, &req.person_id, &req.activity_id, activity.time_range()).await?
    {
        return Err(RegistrationError::ScheduleConflict(conflict));
    }

    let record = match req.role {
        PersonRole::Participant => {
            let fields = store.form_fields(&req.activity_id).await?;
            let answers = match_answers(&fields, &req.answers);
            let registration = Registration {
                id: Uuid::new_v4().to_string(),
                activity_id: req.activity_id.clone(),
                person_id: req.person_id.clone(),
                status: CommitmentStatus::Confirmed,
                created_at: chrono::Utc::now(),
            };
            let record = SubmittedRecord {
                id: registration.id.clone(),
                kind: CommitmentKind::Registration,
                status: registration.status,
            };
            store
                .insert_registration(registration, answers)
                .await
                .map_err(reject_duplicate)?;
            record
        }
        PersonRole::Volunteer => {
            let assignment = VolunteerAssignment {
                id: Uuid::new_v4().to_string(),
                activity_id: req.activity_id.clone(),
                person_id: req.person_id.clone(),
                status: CommitmentStatus::Confirmed,
                created_at: chrono::Utc::now(),
            };
            let record = SubmittedRecord {
                id: assignment.id.clone(),
                kind: CommitmentKind::Assignment,
                status: assignment.status,
            };
            store
                .insert_assignment(assignment)
                .await
                .map_err(reject_duplicate)?;
            record
        }
        PersonRole::Staff => {
            return Err(RegistrationError::Validation("Invalid role".to_string()))
        }
    };

    Ok((record, activity))
}

/// Keep request answers whose key matches a form field; stray keys are
/// dropped silently rather than rejected.
fn match_answers(
    fields: &[FormField],
    answers: &serde_json::Map<String, serde_json::Value>,
) -> Vec<FormAnswer> {
    fields
        .iter()
        .filter_map(|field| {
            answers.get(&field.key).map(|value| FormAnswer {
                field_id: field.id.clone(),
                value: value.clone(),
            })
        })
        .collect()
}

fn reject_duplicate(err: StoreError) -> RegistrationError {
    match err {
        StoreError::DuplicatePair { .. } => RegistrationError::AlreadyRegistered,
        other => RegistrationError::Store(other),
    }
}

/// Best-effort side effects after a successful commit. Failures are logged;
/// the commitment already stands.
async fn post_commit(
    store: &dyn PlatformStore,
    mailer: &dyn Mailer,
    req: &SubmitRequest,
    activity: &Activity,
) {
    if req.role == PersonRole::Participant {
        match store.find_person(&req.person_id).await {
            Ok(Some(person)) => {
                if let Some(email) = &person.email {
                    if let Err(e) = mailer
                        .send_registration_confirmation(
                            email,
                            &activity.title,
                            activity.starts_at,
                            &activity.location,
                        )
                        .await
                    {
                        warn!(person_id = %req.person_id, error = %e, "confirmation mail not delivered");
                    }
                }
            }
            Ok(None) => {}
            Err(e) => {
                warn!(person_id = %req.person_id, error = %e, "person lookup for confirmation mail failed")
            }
        }

        if let Err(e) = check_and_alert_capacity(store, mailer, &activity.id).await {
            warn!(activity_id = %activity.id, error = %e, "capacity alert evaluation failed");
        }
    }

    // Participant commits move the requirement, volunteer commits move the
    // headcount; coverage is re-evaluated for both.
    if let Err(e) = check_and_alert_coverage(store, mailer, &activity.id).await {
        warn!(activity_id = %activity.id, error = %e, "coverage alert evaluation failed");
    }
}
