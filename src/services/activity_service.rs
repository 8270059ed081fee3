//! Staff-side activity management: create, update, and the registration
//! form attached to an activity.
//!
//! This is where every precondition the engine later relies on is enforced:
//! once an activity is stored, its time range is ordered, its capacity is
//! at least one, and its volunteer ratio is positive.

use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::database::PlatformStore;
use crate::error::{ActivityValidationError, StoreError};
use crate::models::{
    Activity, FieldKind, FormField, NewActivity, NewFormField, PersonRole, TimeRange,
};

/// Create an activity with its (possibly empty) registration form. Staff
/// only.
pub async fn create_activity(
    store: &dyn PlatformStore,
    actor_person_id: &str,
    input: NewActivity,
    fields: Vec<NewFormField>,
) -> Result<Activity, ActivityValidationError> {
    require_staff(store, actor_person_id).await?;
    validate_input(&input)?;

    let activity = Activity {
        id: Uuid::new_v4().to_string(),
        title: input.title,
        description: input.description,
        location: input.location,
        starts_at: input.starts_at,
        ends_at: input.ends_at,
        capacity: input.capacity,
        volunteer_required: input.volunteer_required,
        volunteer_ratio: input.volunteer_ratio,
        created_at: chrono::Utc::now(),
    };
    let fields = build_fields(&activity.id, fields)?;

    store.insert_activity(activity.clone()).await?;
    if !fields.is_empty() {
        store.replace_form_fields(&activity.id, fields).await?;
    }

    info!(activity_id = %activity.id, title = %activity.title, "activity created");
    Ok(activity)
}

/// Update an activity in full, replacing its form wholesale. An empty field
/// list removes the form. Staff only.
pub async fn update_activity(
    store: &dyn PlatformStore,
    actor_person_id: &str,
    activity_id: &str,
    input: NewActivity,
    fields: Vec<NewFormField>,
) -> Result<Activity, ActivityValidationError> {
    require_staff(store, actor_person_id).await?;
    validate_input(&input)?;
    let fields = build_fields(activity_id, fields)?;

    let existing = store
        .find_activity(activity_id)
        .await?
        .ok_or(ActivityValidationError::NotFound)?;

    let activity = Activity {
        id: existing.id,
        title: input.title,
        description: input.description,
        location: input.location,
        starts_at: input.starts_at,
        ends_at: input.ends_at,
        capacity: input.capacity,
        volunteer_required: input.volunteer_required,
        volunteer_ratio: input.volunteer_ratio,
        created_at: existing.created_at,
    };

    store.update_activity(activity.clone()).await?;
    store.replace_form_fields(activity_id, fields).await?;

    info!(activity_id = %activity.id, title = %activity.title, "activity updated");
    Ok(activity)
}

/// Activity plus its registration form, as the signup page loads it.
#[derive(Debug, Serialize)]
pub struct ActivityDetail {
    #[serde(flatten)]
    pub activity: Activity,
    pub form_fields: Vec<FormField>,
}

pub async fn load_activity_detail(
    store: &dyn PlatformStore,
    activity_id: &str,
) -> Result<Option<ActivityDetail>, StoreError> {
    let Some(activity) = store.find_activity(activity_id).await? else {
        return Ok(None);
    };
    let form_fields = store.form_fields(activity_id).await?;
    Ok(Some(ActivityDetail {
        activity,
        form_fields,
    }))
}

async fn require_staff(
    store: &dyn PlatformStore,
    actor_person_id: &str,
) -> Result<(), ActivityValidationError> {
    let actor = store
        .find_person(actor_person_id)
        .await?
        .ok_or(ActivityValidationError::Forbidden)?;
    if actor.role != PersonRole::Staff {
        return Err(ActivityValidationError::Forbidden);
    }
    Ok(())
}

fn validate_input(input: &NewActivity) -> Result<(), ActivityValidationError> {
    if input.title.trim().is_empty() {
        return Err(ActivityValidationError::EmptyTitle);
    }
    if input.location.trim().is_empty() {
        return Err(ActivityValidationError::EmptyLocation);
    }
    if TimeRange::new(input.starts_at, input.ends_at).is_none() {
        return Err(ActivityValidationError::InvalidTimeRange);
    }
    if input.capacity < 1 {
        return Err(ActivityValidationError::InvalidCapacity);
    }
    if input.volunteer_required < 0 {
        return Err(ActivityValidationError::InvalidVolunteerFloor);
    }
    if !(input.volunteer_ratio > 0.0) {
        return Err(ActivityValidationError::InvalidVolunteerRatio);
    }
    Ok(())
}

/// Check the submitted field list and assign ids and positions. A
/// visibility condition may only point at a field defined earlier in the
/// list, so rendering order always has the controlling answer first.
fn build_fields(
    activity_id: &str,
    fields: Vec<NewFormField>,
) -> Result<Vec<FormField>, ActivityValidationError> {
    let mut seen_keys: Vec<String> = Vec::with_capacity(fields.len());
    let mut built = Vec::with_capacity(fields.len());

    for (position, field) in fields.into_iter().enumerate() {
        let key = field.key.trim().to_string();
        if key.is_empty() {
            return Err(ActivityValidationError::EmptyFieldKey);
        }
        if seen_keys.iter().any(|k| k == &key) {
            return Err(ActivityValidationError::DuplicateFieldKey(key));
        }
        if let FieldKind::Select { options } = &field.kind {
            if options.is_empty() {
                return Err(ActivityValidationError::EmptySelectOptions(key));
            }
        }
        if let Some(cond) = &field.visible_if {
            if !seen_keys.iter().any(|k| k == &cond.field_key) {
                return Err(ActivityValidationError::UnknownConditionField {
                    field: key,
                    referenced: cond.field_key.clone(),
                });
            }
        }

        built.push(FormField {
            id: Uuid::new_v4().to_string(),
            activity_id: activity_id.to_string(),
            key: key.clone(),
            label: field.label,
            kind: field.kind,
            required: field.required,
            position: position as i64,
            visible_if: field.visible_if,
        });
        seen_keys.push(key);
    }

    Ok(built)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{ActivityStore, InMemoryStore, PersonDirectory};
    use crate::models::{Person, VisibilityCondition};
    use chrono::{TimeZone, Utc};

    fn hour(h: u32) -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 14, h, 0, 0).unwrap()
    }

    fn input() -> NewActivity {
        NewActivity {
            title: "Watercolor Workshop".to_string(),
            description: Some("Bring your own brushes".to_string()),
            location: "Studio 1".to_string(),
            starts_at: hour(10),
            ends_at: hour(12),
            capacity: 15,
            volunteer_required: 2,
            volunteer_ratio: 5.0,
        }
    }

    fn boolean_field(key: &str) -> NewFormField {
        NewFormField {
            key: key.to_string(),
            label: format!("{key}?"),
            kind: FieldKind::Boolean,
            required: false,
            visible_if: None,
        }
    }

    async fn store_with_people() -> InMemoryStore {
        let store = InMemoryStore::new();
        store
            .insert_person(Person {
                id: "staff-1".to_string(),
                role: PersonRole::Staff,
                email: Some("staff@mindshub.org".to_string()),
                name: None,
            })
            .await
            .unwrap();
        store
            .insert_person(Person {
                id: "anna".to_string(),
                role: PersonRole::Participant,
                email: None,
                name: None,
            })
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn staff_can_create_with_form_fields() {
        let store = store_with_people().await;
        let fields = vec![boolean_field("wheelchair_access"), boolean_field("dietary")];

        let activity = create_activity(&store, "staff-1", input(), fields)
            .await
            .unwrap();

        let stored = store.find_activity(&activity.id).await.unwrap().unwrap();
        assert_eq!(stored.title, "Watercolor Workshop");
        let fields = store.form_fields(&activity.id).await.unwrap();
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0].key, "wheelchair_access");
        assert_eq!(fields[0].position, 0);
        assert_eq!(fields[1].position, 1);
    }

    #[tokio::test]
    async fn non_staff_actors_are_rejected() {
        let store = store_with_people().await;
        let err = create_activity(&store, "anna", input(), Vec::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ActivityValidationError::Forbidden));

        let err = create_activity(&store, "ghost", input(), Vec::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ActivityValidationError::Forbidden));
    }

    #[tokio::test]
    async fn bad_inputs_are_rejected_with_the_specific_error() {
        let store = store_with_people().await;

        let mut bad = input();
        bad.title = "   ".to_string();
        assert!(matches!(
            create_activity(&store, "staff-1", bad, Vec::new()).await,
            Err(ActivityValidationError::EmptyTitle)
        ));

        let mut bad = input();
        bad.starts_at = hour(12);
        bad.ends_at = hour(10);
        assert!(matches!(
            create_activity(&store, "staff-1", bad, Vec::new()).await,
            Err(ActivityValidationError::InvalidTimeRange)
        ));

        let mut bad = input();
        bad.ends_at = bad.starts_at;
        assert!(matches!(
            create_activity(&store, "staff-1", bad, Vec::new()).await,
            Err(ActivityValidationError::InvalidTimeRange)
        ));

        let mut bad = input();
        bad.capacity = 0;
        assert!(matches!(
            create_activity(&store, "staff-1", bad, Vec::new()).await,
            Err(ActivityValidationError::InvalidCapacity)
        ));

        let mut bad = input();
        bad.volunteer_required = -1;
        assert!(matches!(
            create_activity(&store, "staff-1", bad, Vec::new()).await,
            Err(ActivityValidationError::InvalidVolunteerFloor)
        ));

        let mut bad = input();
        bad.volunteer_ratio = 0.0;
        assert!(matches!(
            create_activity(&store, "staff-1", bad, Vec::new()).await,
            Err(ActivityValidationError::InvalidVolunteerRatio)
        ));
    }

    #[tokio::test]
    async fn field_lists_are_validated() {
        let store = store_with_people().await;

        let err = create_activity(
            &store,
            "staff-1",
            input(),
            vec![boolean_field("diet"), boolean_field("diet")],
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ActivityValidationError::DuplicateFieldKey(k) if k == "diet"));

        let err = create_activity(
            &store,
            "staff-1",
            input(),
            vec![NewFormField {
                key: "level".to_string(),
                label: "Level".to_string(),
                kind: FieldKind::Select { options: Vec::new() },
                required: true,
                visible_if: None,
            }],
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ActivityValidationError::EmptySelectOptions(k) if k == "level"));
    }

    #[tokio::test]
    async fn visibility_may_only_reference_earlier_fields() {
        let store = store_with_people().await;

        let mut conditioned = boolean_field("details");
        conditioned.visible_if = Some(VisibilityCondition {
            field_key: "dietary".to_string(),
            equals: serde_json::json!(true),
        });

        // Forward reference: condition comes before its controlling field.
        let err = create_activity(
            &store,
            "staff-1",
            input(),
            vec![conditioned.clone(), boolean_field("dietary")],
        )
        .await
        .unwrap_err();
        assert!(matches!(
            err,
            ActivityValidationError::UnknownConditionField { referenced, .. } if referenced == "dietary"
        ));

        // Controlling field first: accepted.
        create_activity(
            &store,
            "staff-1",
            input(),
            vec![boolean_field("dietary"), conditioned],
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn update_replaces_the_form_wholesale() {
        let store = store_with_people().await;
        let activity = create_activity(
            &store,
            "staff-1",
            input(),
            vec![boolean_field("wheelchair_access"), boolean_field("dietary")],
        )
        .await
        .unwrap();

        let mut changed = input();
        changed.capacity = 20;
        update_activity(
            &store,
            "staff-1",
            &activity.id,
            changed,
            vec![boolean_field("photo_consent")],
        )
        .await
        .unwrap();

        let stored = store.find_activity(&activity.id).await.unwrap().unwrap();
        assert_eq!(stored.capacity, 20);
        assert_eq!(stored.created_at, activity.created_at);
        let fields = store.form_fields(&activity.id).await.unwrap();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].key, "photo_consent");

        // An empty list removes the form entirely.
        update_activity(&store, "staff-1", &activity.id, input(), Vec::new())
            .await
            .unwrap();
        assert!(store.form_fields(&activity.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn updating_a_missing_activity_is_not_found() {
        let store = store_with_people().await;
        let err = update_activity(&store, "staff-1", "nope", input(), Vec::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ActivityValidationError::NotFound));
    }
}
