//! In-memory implementation of the store traits.
//!
//! Deterministic and test-friendly; also serves as the zero-setup dev
//! backend. Durable deployments use [`SqliteStore`](super::SqliteStore).

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::database::{ActivityStore, PersonDirectory};
use crate::error::{StoreError, StoreResult};
use crate::models::{
    Activity, ActivityRef, CommitmentKind, FormAnswer, FormField, Person, PersonCommitment,
    PersonRole, Registration, VolunteerAssignment,
};

#[derive(Default)]
struct State {
    activities: HashMap<String, Activity>,
    // Vecs keep insertion order, which makes "first encountered" in the
    // conflict scan stable.
    registrations: Vec<Registration>,
    assignments: Vec<VolunteerAssignment>,
    answers: HashMap<String, Vec<FormAnswer>>,
    form_fields: HashMap<String, Vec<FormField>>,
    people: HashMap<String, Person>,
}

/// In-memory store with one lock over the whole state, so every call reads
/// a single consistent snapshot.
#[derive(Default)]
pub struct InMemoryStore {
    state: RwLock<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<std::sync::RwLockReadGuard<'_, State>> {
        self.state
            .read()
            .map_err(|_| StoreError::Backend("state lock poisoned".to_string()))
    }

    fn write(&self) -> StoreResult<std::sync::RwLockWriteGuard<'_, State>> {
        self.state
            .write()
            .map_err(|_| StoreError::Backend("state lock poisoned".to_string()))
    }
}

#[async_trait]
impl ActivityStore for InMemoryStore {
    async fn find_activity(&self, activity_id: &str) -> StoreResult<Option<Activity>> {
        Ok(self.read()?.activities.get(activity_id).cloned())
    }

    async fn insert_activity(&self, activity: Activity) -> StoreResult<()> {
        let mut state = self.write()?;
        if state.activities.contains_key(&activity.id) {
            return Err(StoreError::Backend(format!(
                "activity {} already exists",
                activity.id
            )));
        }
        state.activities.insert(activity.id.clone(), activity);
        Ok(())
    }

    async fn update_activity(&self, activity: Activity) -> StoreResult<()> {
        let mut state = self.write()?;
        match state.activities.get_mut(&activity.id) {
            Some(existing) => {
                *existing = activity;
                Ok(())
            }
            None => Err(StoreError::NotFound(format!("activity {}", activity.id))),
        }
    }

    async fn list_upcoming_activities(
        &self,
        now: DateTime<Utc>,
        limit: i64,
    ) -> StoreResult<Vec<Activity>> {
        let state = self.read()?;
        let mut upcoming: Vec<Activity> = state
            .activities
            .values()
            .filter(|a| a.starts_at >= now)
            .cloned()
            .collect();
        upcoming.sort_by_key(|a| a.starts_at);
        upcoming.truncate(limit.max(0) as usize);
        Ok(upcoming)
    }

    async fn count_activities(&self) -> StoreResult<i64> {
        Ok(self.read()?.activities.len() as i64)
    }

    async fn active_registration_count(&self, activity_id: &str) -> StoreResult<i64> {
        let state = self.read()?;
        Ok(state
            .registrations
            .iter()
            .filter(|r| r.activity_id == activity_id && r.status.is_active())
            .count() as i64)
    }

    async fn active_assignment_count(&self, activity_id: &str) -> StoreResult<i64> {
        let state = self.read()?;
        Ok(state
            .assignments
            .iter()
            .filter(|a| a.activity_id == activity_id && a.status.is_active())
            .count() as i64)
    }

    async fn count_active_registrations(&self) -> StoreResult<i64> {
        let state = self.read()?;
        Ok(state
            .registrations
            .iter()
            .filter(|r| r.status.is_active())
            .count() as i64)
    }

    async fn count_active_assignments(&self) -> StoreResult<i64> {
        let state = self.read()?;
        Ok(state
            .assignments
            .iter()
            .filter(|a| a.status.is_active())
            .count() as i64)
    }

    async fn active_commitments_for_person(
        &self,
        person_id: &str,
    ) -> StoreResult<Vec<PersonCommitment>> {
        let state = self.read()?;
        let mut commitments = Vec::new();
        for registration in state
            .registrations
            .iter()
            .filter(|r| r.person_id == person_id && r.status.is_active())
        {
            if let Some(activity) = state.activities.get(&registration.activity_id) {
                commitments.push(PersonCommitment {
                    kind: CommitmentKind::Registration,
                    activity: ActivityRef::from(activity),
                });
            }
        }
        for assignment in state
            .assignments
            .iter()
            .filter(|a| a.person_id == person_id && a.status.is_active())
        {
            if let Some(activity) = state.activities.get(&assignment.activity_id) {
                commitments.push(PersonCommitment {
                    kind: CommitmentKind::Assignment,
                    activity: ActivityRef::from(activity),
                });
            }
        }
        Ok(commitments)
    }

    async fn insert_registration(
        &self,
        registration: Registration,
        answers: Vec<FormAnswer>,
    ) -> StoreResult<()> {
        let mut state = self.write()?;
        if !state.activities.contains_key(&registration.activity_id) {
            return Err(StoreError::NotFound(format!(
                "activity {}",
                registration.activity_id
            )));
        }
        let duplicate = state.registrations.iter().any(|r| {
            r.activity_id == registration.activity_id
                && r.person_id == registration.person_id
                && r.status.is_active()
        });
        if duplicate {
            return Err(StoreError::DuplicatePair {
                activity_id: registration.activity_id.clone(),
                person_id: registration.person_id.clone(),
            });
        }
        if !answers.is_empty() {
            state.answers.insert(registration.id.clone(), answers);
        }
        state.registrations.push(registration);
        Ok(())
    }

    async fn insert_assignment(&self, assignment: VolunteerAssignment) -> StoreResult<()> {
        let mut state = self.write()?;
        if !state.activities.contains_key(&assignment.activity_id) {
            return Err(StoreError::NotFound(format!(
                "activity {}",
                assignment.activity_id
            )));
        }
        let duplicate = state.assignments.iter().any(|a| {
            a.activity_id == assignment.activity_id
                && a.person_id == assignment.person_id
                && a.status.is_active()
        });
        if duplicate {
            return Err(StoreError::DuplicatePair {
                activity_id: assignment.activity_id.clone(),
                person_id: assignment.person_id.clone(),
            });
        }
        state.assignments.push(assignment);
        Ok(())
    }

    async fn answers_for_registration(&self, registration_id: &str) -> StoreResult<Vec<FormAnswer>> {
        let state = self.read()?;
        Ok(state
            .answers
            .get(registration_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn form_fields(&self, activity_id: &str) -> StoreResult<Vec<FormField>> {
        let state = self.read()?;
        Ok(state
            .form_fields
            .get(activity_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn replace_form_fields(
        &self,
        activity_id: &str,
        fields: Vec<FormField>,
    ) -> StoreResult<()> {
        let mut state = self.write()?;
        if fields.is_empty() {
            state.form_fields.remove(activity_id);
        } else {
            state.form_fields.insert(activity_id.to_string(), fields);
        }
        Ok(())
    }
}

#[async_trait]
impl PersonDirectory for InMemoryStore {
    async fn find_person(&self, person_id: &str) -> StoreResult<Option<Person>> {
        Ok(self.read()?.people.get(person_id).cloned())
    }

    async fn insert_person(&self, person: Person) -> StoreResult<()> {
        let mut state = self.write()?;
        state.people.insert(person.id.clone(), person);
        Ok(())
    }

    async fn staff_emails(&self) -> StoreResult<Vec<String>> {
        let state = self.read()?;
        let mut emails: Vec<String> = state
            .people
            .values()
            .filter(|p| p.role == PersonRole::Staff)
            .filter_map(|p| p.email.clone())
            .collect();
        emails.sort();
        Ok(emails)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CommitmentStatus;
    use chrono::TimeZone;

    fn activity(id: &str, start_hour: u32, end_hour: u32) -> Activity {
        Activity {
            id: id.to_string(),
            title: format!("Activity {id}"),
            description: None,
            location: "Community Center".to_string(),
            starts_at: Utc.with_ymd_and_hms(2025, 6, 14, start_hour, 0, 0).unwrap(),
            ends_at: Utc.with_ymd_and_hms(2025, 6, 14, end_hour, 0, 0).unwrap(),
            capacity: 10,
            volunteer_required: 1,
            volunteer_ratio: 5.0,
            created_at: Utc::now(),
        }
    }

    fn registration(id: &str, activity_id: &str, person_id: &str) -> Registration {
        Registration {
            id: id.to_string(),
            activity_id: activity_id.to_string(),
            person_id: person_id.to_string(),
            status: CommitmentStatus::Confirmed,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn duplicate_active_registration_is_rejected() {
        let store = InMemoryStore::new();
        store.insert_activity(activity("a1", 10, 12)).await.unwrap();
        store
            .insert_registration(registration("r1", "a1", "p1"), Vec::new())
            .await
            .unwrap();

        let err = store
            .insert_registration(registration("r2", "a1", "p1"), Vec::new())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicatePair { .. }));
        assert_eq!(store.active_registration_count("a1").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn cancelled_registrations_do_not_block_or_count() {
        let store = InMemoryStore::new();
        store.insert_activity(activity("a1", 10, 12)).await.unwrap();
        let mut cancelled = registration("r1", "a1", "p1");
        cancelled.status = CommitmentStatus::Cancelled;
        store
            .insert_registration(cancelled, Vec::new())
            .await
            .unwrap();

        assert_eq!(store.active_registration_count("a1").await.unwrap(), 0);
        // A fresh active registration for the same pair is allowed.
        store
            .insert_registration(registration("r2", "a1", "p1"), Vec::new())
            .await
            .unwrap();
        assert_eq!(store.active_registration_count("a1").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn commitments_list_registrations_before_assignments() {
        let store = InMemoryStore::new();
        store.insert_activity(activity("a1", 10, 12)).await.unwrap();
        store.insert_activity(activity("a2", 14, 16)).await.unwrap();
        store
            .insert_assignment(VolunteerAssignment {
                id: "v1".to_string(),
                activity_id: "a2".to_string(),
                person_id: "p1".to_string(),
                status: CommitmentStatus::Confirmed,
                created_at: Utc::now(),
            })
            .await
            .unwrap();
        store
            .insert_registration(registration("r1", "a1", "p1"), Vec::new())
            .await
            .unwrap();

        let commitments = store.active_commitments_for_person("p1").await.unwrap();
        assert_eq!(commitments.len(), 2);
        assert_eq!(commitments[0].kind, CommitmentKind::Registration);
        assert_eq!(commitments[1].kind, CommitmentKind::Assignment);
    }

    #[tokio::test]
    async fn upcoming_activities_sort_soonest_first() {
        let store = InMemoryStore::new();
        store.insert_activity(activity("late", 15, 16)).await.unwrap();
        store.insert_activity(activity("early", 9, 10)).await.unwrap();

        let now = Utc.with_ymd_and_hms(2025, 6, 14, 0, 0, 0).unwrap();
        let upcoming = store.list_upcoming_activities(now, 10).await.unwrap();
        assert_eq!(upcoming[0].id, "early");
        assert_eq!(upcoming[1].id, "late");
    }

    #[tokio::test]
    async fn staff_emails_skip_other_roles_and_missing_addresses() {
        let store = InMemoryStore::new();
        store
            .insert_person(Person {
                id: "s1".to_string(),
                role: PersonRole::Staff,
                email: Some("staff@example.com".to_string()),
                name: Some("Diana Lim".to_string()),
            })
            .await
            .unwrap();
        store
            .insert_person(Person {
                id: "s2".to_string(),
                role: PersonRole::Staff,
                email: None,
                name: None,
            })
            .await
            .unwrap();
        store
            .insert_person(Person {
                id: "p1".to_string(),
                role: PersonRole::Participant,
                email: Some("participant1@example.com".to_string()),
                name: None,
            })
            .await
            .unwrap();

        assert_eq!(
            store.staff_emails().await.unwrap(),
            vec!["staff@example.com".to_string()]
        );
    }
}
