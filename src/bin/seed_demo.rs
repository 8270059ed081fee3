use chrono::{Duration, Utc};
use dotenvy::dotenv;
use sqlx::sqlite::SqlitePoolOptions;
use std::env;
use uuid::Uuid;

use mindshub::database::{ActivityStore, PersonDirectory, SqliteStore};
use mindshub::error::StoreResult;
use mindshub::models::{
    Activity, CommitmentStatus, FieldKind, FormAnswer, FormField, Person, PersonRole,
    Registration, VolunteerAssignment,
};

#[tokio::main]
async fn main() {
    dotenv().ok();
    tracing_subscriber::fmt::init();

    let db_url = env::var("DATABASE_URL").expect("DATABASE_URL moet in .env staan");
    let pool = SqlitePoolOptions::new()
        .connect(&db_url)
        .await
        .expect("Kan niet verbinden met DB");

    let store = SqliteStore::new(pool);
    store
        .ensure_schema()
        .await
        .expect("Kan schema niet aanmaken");

    if let Err(e) = seed(&store).await {
        eprintln!("seed failed: {}", e);
        std::process::exit(1);
    }
}

async fn seed(store: &SqliteStore) -> StoreResult<()> {
    println!("Seeding database...");

    let people = [
        ("participant-1", PersonRole::Participant, "participant1@example.com", "Alice Tan"),
        ("participant-2", PersonRole::Participant, "participant2@example.com", "Bob Lee"),
        ("volunteer-1", PersonRole::Volunteer, "volunteer1@example.com", "Charlie Wong"),
        ("staff-1", PersonRole::Staff, "staff@example.com", "Diana Lim"),
    ];
    for (id, role, email, name) in people {
        store
            .insert_person(Person {
                id: id.to_string(),
                role,
                email: Some(email.to_string()),
                name: Some(name.to_string()),
            })
            .await?;
    }
    println!("Created people");

    let now = Utc::now();
    let next_week = now + Duration::days(7);
    let two_weeks = now + Duration::days(14);

    let watercolor = Activity {
        id: Uuid::new_v4().to_string(),
        title: "Art Workshop: Watercolor Painting".to_string(),
        description: Some(
            "Learn basic watercolor techniques in a relaxed, supportive environment.".to_string(),
        ),
        location: "Community Center, Room 101".to_string(),
        starts_at: next_week + Duration::hours(10),
        ends_at: next_week + Duration::hours(12),
        capacity: 15,
        volunteer_required: 2,
        volunteer_ratio: 5.0,
        created_at: now,
    };
    let basketball = Activity {
        id: Uuid::new_v4().to_string(),
        title: "Sports Day: Basketball".to_string(),
        description: Some("Friendly basketball game for all skill levels.".to_string()),
        location: "Sports Complex, Court 2".to_string(),
        starts_at: next_week + Duration::hours(14),
        ends_at: next_week + Duration::hours(16),
        capacity: 20,
        volunteer_required: 3,
        volunteer_ratio: 6.0,
        created_at: now,
    };
    let cooking = Activity {
        id: Uuid::new_v4().to_string(),
        title: "Cooking Class: Healthy Meals".to_string(),
        description: Some("Learn to prepare nutritious and delicious meals.".to_string()),
        location: "Kitchen Lab, Building A".to_string(),
        starts_at: two_weeks + Duration::hours(10),
        ends_at: two_weeks + Duration::hours(13),
        capacity: 12,
        volunteer_required: 2,
        volunteer_ratio: 4.0,
        created_at: now,
    };
    for activity in [&watercolor, &basketball, &cooking] {
        store.insert_activity(activity.clone()).await?;
    }
    println!("Created activities");

    let wheelchair_field_id = Uuid::new_v4().to_string();
    let fields = vec![
        FormField {
            id: wheelchair_field_id.clone(),
            activity_id: watercolor.id.clone(),
            key: "wheelchair_access".to_string(),
            label: "Do you need wheelchair access?".to_string(),
            kind: FieldKind::Boolean,
            required: false,
            position: 0,
            visible_if: None,
        },
        FormField {
            id: Uuid::new_v4().to_string(),
            activity_id: watercolor.id.clone(),
            key: "caregiver_attending".to_string(),
            label: "Will a caregiver be attending with you?".to_string(),
            kind: FieldKind::Boolean,
            required: false,
            position: 1,
            visible_if: None,
        },
        FormField {
            id: Uuid::new_v4().to_string(),
            activity_id: watercolor.id.clone(),
            key: "experience_level".to_string(),
            label: "What is your experience level?".to_string(),
            kind: FieldKind::Select {
                options: vec![
                    "Beginner".to_string(),
                    "Intermediate".to_string(),
                    "Advanced".to_string(),
                ],
            },
            required: false,
            position: 2,
            visible_if: None,
        },
    ];
    store.replace_form_fields(&watercolor.id, fields).await?;
    println!("Created form fields");

    store
        .insert_registration(
            Registration {
                id: Uuid::new_v4().to_string(),
                activity_id: watercolor.id.clone(),
                person_id: "participant-1".to_string(),
                status: CommitmentStatus::Confirmed,
                created_at: now,
            },
            vec![FormAnswer {
                field_id: wheelchair_field_id,
                value: serde_json::json!(true),
            }],
        )
        .await?;
    store
        .insert_registration(
            Registration {
                id: Uuid::new_v4().to_string(),
                activity_id: basketball.id.clone(),
                person_id: "participant-2".to_string(),
                status: CommitmentStatus::Confirmed,
                created_at: now,
            },
            Vec::new(),
        )
        .await?;
    println!("Created registrations");

    store
        .insert_assignment(VolunteerAssignment {
            id: Uuid::new_v4().to_string(),
            activity_id: watercolor.id.clone(),
            person_id: "volunteer-1".to_string(),
            status: CommitmentStatus::Confirmed,
            created_at: now,
        })
        .await?;
    println!("Created volunteer assignments");

    println!("Seeding completed!");
    println!();
    println!("Test people (pass the id in the x-person-id header):");
    println!("Participant 1: participant-1 (Alice Tan)");
    println!("Participant 2: participant-2 (Bob Lee)");
    println!("Volunteer:     volunteer-1 (Charlie Wong)");
    println!("Staff:         staff-1 (Diana Lim)");
    Ok(())
}
