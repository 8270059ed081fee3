//! Threshold alerts to staff.
//!
//! Evaluated after every commit that touches the relevant aggregate. There
//! is intentionally no de-duplication: while a condition holds, every
//! further mutation fires the alert again. Mail trouble is logged and never
//! surfaced to the caller.

use tracing::warn;

use crate::database::PlatformStore;
use crate::error::RegistrationError;
use crate::services::mailer::Mailer;
use crate::services::scheduling_service::{check_capacity, check_coverage};

/// Capacity bands: warning from 80% up to (not including) full, urgent at
/// full. Both re-check the live counts rather than trusting the caller.
pub async fn check_and_alert_capacity(
    store: &dyn PlatformStore,
    mailer: &dyn Mailer,
    activity_id: &str,
) -> Result<(), RegistrationError> {
    let capacity = check_capacity(store, activity_id).await?;
    let Some(activity) = store.find_activity(activity_id).await? else {
        return Ok(());
    };

    if capacity.percentage >= 80.0 && capacity.percentage < 100.0 {
        let staff = store.staff_emails().await?;
        if !staff.is_empty() {
            let subject = format!(
                "Activity {} at {:.0}% capacity",
                activity.title, capacity.percentage
            );
            let message = format!(
                "Activity \"{}\" has reached {}/{} registrations ({:.0}%).",
                activity.title, capacity.current_count, capacity.capacity, capacity.percentage
            );
            if let Err(e) = mailer.send_staff_alert(&staff, &subject, &message).await {
                warn!(activity_id, error = %e, "capacity warning alert not delivered");
            }
        }
    }

    if capacity.is_full {
        let staff = store.staff_emails().await?;
        if !staff.is_empty() {
            let subject = format!("Activity {} is FULL", activity.title);
            let message = format!(
                "Activity \"{}\" has reached full capacity ({} registrations).",
                activity.title, capacity.capacity
            );
            if let Err(e) = mailer.send_staff_alert(&staff, &subject, &message).await {
                warn!(activity_id, error = %e, "capacity full alert not delivered");
            }
        }
    }

    Ok(())
}

/// Fires whenever volunteer coverage is short of the requirement. Both
/// participant and volunteer commits can change the requirement, so the
/// coordinator runs this after every commit.
pub async fn check_and_alert_coverage(
    store: &dyn PlatformStore,
    mailer: &dyn Mailer,
    activity_id: &str,
) -> Result<(), RegistrationError> {
    let coverage = check_coverage(store, activity_id).await?;
    let Some(activity) = store.find_activity(activity_id).await? else {
        return Ok(());
    };

    if !coverage.is_sufficient {
        let staff = store.staff_emails().await?;
        if !staff.is_empty() {
            let subject = format!("Low volunteer coverage for {}", activity.title);
            let message = format!(
                "Activity \"{}\" has {}/{} volunteers ({} participants, ratio: {}:1).",
                activity.title,
                coverage.current_volunteers,
                coverage.required_volunteers,
                coverage.participant_count,
                coverage.ratio
            );
            if let Err(e) = mailer.send_staff_alert(&staff, &subject, &message).await {
                warn!(activity_id, error = %e, "coverage alert not delivered");
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{ActivityStore, InMemoryStore, PersonDirectory};
    use crate::models::{Activity, CommitmentStatus, Person, PersonRole, Registration};
    use crate::services::mailer::testing::RecordingMailer;
    use chrono::{TimeZone, Utc};

    fn hour(h: u32) -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 14, h, 0, 0).unwrap()
    }

    fn workshop(capacity: i64) -> Activity {
        Activity {
            id: "a1".to_string(),
            title: "Watercolor Workshop".to_string(),
            description: None,
            location: "Studio 1".to_string(),
            starts_at: hour(10),
            ends_at: hour(12),
            capacity,
            volunteer_required: 2,
            volunteer_ratio: 5.0,
            created_at: hour(0),
        }
    }

    async fn store_with_staff() -> InMemoryStore {
        let store = InMemoryStore::new();
        store
            .insert_person(Person {
                id: "staff-1".to_string(),
                role: PersonRole::Staff,
                email: Some("staff@mindshub.org".to_string()),
                name: Some("Sam".to_string()),
            })
            .await
            .unwrap();
        store
    }

    async fn register_n(store: &InMemoryStore, activity_id: &str, n: usize) {
        for i in 0..n {
            store
                .insert_registration(
                    Registration {
                        id: format!("r{i}"),
                        activity_id: activity_id.to_string(),
                        person_id: format!("person-{i}"),
                        status: CommitmentStatus::Confirmed,
                        created_at: hour(0),
                    },
                    Vec::new(),
                )
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn warning_fires_at_eighty_percent() {
        let store = store_with_staff().await;
        store.insert_activity(workshop(5)).await.unwrap();
        register_n(&store, "a1", 4).await;

        let mailer = RecordingMailer::new();
        check_and_alert_capacity(&store, &mailer, "a1").await.unwrap();

        let subjects = mailer.alert_subjects();
        assert_eq!(
            subjects,
            vec!["Activity Watercolor Workshop at 80% capacity".to_string()]
        );
        let alerts = mailer.alerts.lock().unwrap();
        assert_eq!(
            alerts[0].2,
            "Activity \"Watercolor Workshop\" has reached 4/5 registrations (80%)."
        );
        assert_eq!(alerts[0].0, vec!["staff@mindshub.org".to_string()]);
    }

    #[tokio::test]
    async fn no_alert_below_eighty_percent() {
        let store = store_with_staff().await;
        store.insert_activity(workshop(5)).await.unwrap();
        register_n(&store, "a1", 3).await;

        let mailer = RecordingMailer::new();
        check_and_alert_capacity(&store, &mailer, "a1").await.unwrap();
        assert!(mailer.alert_subjects().is_empty());
    }

    #[tokio::test]
    async fn full_fires_urgent_without_warning() {
        let store = store_with_staff().await;
        store.insert_activity(workshop(2)).await.unwrap();
        register_n(&store, "a1", 2).await;

        let mailer = RecordingMailer::new();
        check_and_alert_capacity(&store, &mailer, "a1").await.unwrap();

        let subjects = mailer.alert_subjects();
        assert_eq!(subjects, vec!["Activity Watercolor Workshop is FULL".to_string()]);
        let alerts = mailer.alerts.lock().unwrap();
        assert_eq!(
            alerts[0].2,
            "Activity \"Watercolor Workshop\" has reached full capacity (2 registrations)."
        );
    }

    #[tokio::test]
    async fn alert_repeats_on_every_evaluation() {
        let store = store_with_staff().await;
        store.insert_activity(workshop(2)).await.unwrap();
        register_n(&store, "a1", 2).await;

        let mailer = RecordingMailer::new();
        check_and_alert_capacity(&store, &mailer, "a1").await.unwrap();
        check_and_alert_capacity(&store, &mailer, "a1").await.unwrap();
        assert_eq!(mailer.alert_subjects().len(), 2);
    }

    #[tokio::test]
    async fn no_staff_on_file_means_no_send() {
        let store = InMemoryStore::new();
        store.insert_activity(workshop(2)).await.unwrap();
        register_n(&store, "a1", 2).await;

        let mailer = RecordingMailer::new();
        check_and_alert_capacity(&store, &mailer, "a1").await.unwrap();
        assert!(mailer.alert_subjects().is_empty());
    }

    #[tokio::test]
    async fn coverage_shortfall_message_matches_template() {
        let store = store_with_staff().await;
        store.insert_activity(workshop(20)).await.unwrap();
        register_n(&store, "a1", 11).await;

        let mailer = RecordingMailer::new();
        check_and_alert_coverage(&store, &mailer, "a1").await.unwrap();

        let alerts = mailer.alerts.lock().unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].1, "Low volunteer coverage for Watercolor Workshop");
        assert_eq!(
            alerts[0].2,
            "Activity \"Watercolor Workshop\" has 0/3 volunteers (11 participants, ratio: 5:1)."
        );
    }

    #[tokio::test]
    async fn mailer_failure_does_not_propagate() {
        let store = store_with_staff().await;
        store.insert_activity(workshop(2)).await.unwrap();
        register_n(&store, "a1", 2).await;

        let mailer = RecordingMailer::failing();
        let res = check_and_alert_capacity(&store, &mailer, "a1").await;
        assert!(res.is_ok());
    }
}
