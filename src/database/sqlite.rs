//! SQLite implementation of the store traits.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::database::{ActivityStore, PersonDirectory};
use crate::error::{StoreError, StoreResult};
use crate::models::{
    Activity, ActivityRef, CommitmentKind, FieldKind, FormAnswer, FormField, Person,
    PersonCommitment, PersonRole, Registration, VisibilityCondition, VolunteerAssignment,
};

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS activities (
  id TEXT PRIMARY KEY,
  title TEXT NOT NULL,
  description TEXT,
  location TEXT NOT NULL,
  starts_at TEXT NOT NULL,
  ends_at TEXT NOT NULL,
  capacity INTEGER NOT NULL,
  volunteer_required INTEGER NOT NULL,
  volunteer_ratio REAL NOT NULL,
  created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS people (
  id TEXT PRIMARY KEY,
  role TEXT NOT NULL,
  email TEXT,
  name TEXT
);

CREATE TABLE IF NOT EXISTS registrations (
  id TEXT PRIMARY KEY,
  activity_id TEXT NOT NULL,
  person_id TEXT NOT NULL,
  status TEXT NOT NULL,
  created_at TEXT NOT NULL
);

-- At most one active registration per (activity, person) pair.
CREATE UNIQUE INDEX IF NOT EXISTS idx_registrations_active_pair
  ON registrations(activity_id, person_id)
  WHERE status IN ('PENDING', 'CONFIRMED');

CREATE TABLE IF NOT EXISTS volunteer_assignments (
  id TEXT PRIMARY KEY,
  activity_id TEXT NOT NULL,
  person_id TEXT NOT NULL,
  status TEXT NOT NULL,
  created_at TEXT NOT NULL
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_assignments_active_pair
  ON volunteer_assignments(activity_id, person_id)
  WHERE status IN ('PENDING', 'CONFIRMED');

CREATE TABLE IF NOT EXISTS form_fields (
  id TEXT PRIMARY KEY,
  activity_id TEXT NOT NULL,
  key TEXT NOT NULL,
  label TEXT NOT NULL,
  kind TEXT NOT NULL,
  options TEXT,
  required INTEGER NOT NULL,
  position INTEGER NOT NULL,
  visible_if TEXT
);

CREATE INDEX IF NOT EXISTS idx_form_fields_activity
  ON form_fields(activity_id, position);

CREATE TABLE IF NOT EXISTS registration_answers (
  id TEXT PRIMARY KEY,
  registration_id TEXT NOT NULL,
  field_id TEXT NOT NULL,
  value_json TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_registration_answers_registration
  ON registration_answers(registration_id);
"#;

/// SQLite-backed store. Writes that span rows run in one transaction; the
/// partial unique indexes enforce the active-pair invariant even across
/// processes.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create tables and indexes when missing. Idempotent; run at startup.
    pub async fn ensure_schema(&self) -> StoreResult<()> {
        sqlx::raw_sql(SCHEMA_SQL).execute(&self.pool).await?;
        Ok(())
    }
}

#[derive(sqlx::FromRow)]
struct ActivityRow {
    id: String,
    title: String,
    description: Option<String>,
    location: String,
    starts_at: DateTime<Utc>,
    ends_at: DateTime<Utc>,
    capacity: i64,
    volunteer_required: i64,
    volunteer_ratio: f64,
    created_at: DateTime<Utc>,
}

impl From<ActivityRow> for Activity {
    fn from(row: ActivityRow) -> Self {
        Activity {
            id: row.id,
            title: row.title,
            description: row.description,
            location: row.location,
            starts_at: row.starts_at,
            ends_at: row.ends_at,
            capacity: row.capacity,
            volunteer_required: row.volunteer_required,
            volunteer_ratio: row.volunteer_ratio,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct PersonRow {
    id: String,
    role: String,
    email: Option<String>,
    name: Option<String>,
}

impl TryFrom<PersonRow> for Person {
    type Error = StoreError;

    fn try_from(row: PersonRow) -> Result<Self, Self::Error> {
        let role = PersonRole::parse(&row.role)
            .ok_or_else(|| StoreError::Backend(format!("unknown person role: {}", row.role)))?;
        Ok(Person {
            id: row.id,
            role,
            email: row.email,
            name: row.name,
        })
    }
}

#[derive(sqlx::FromRow)]
struct CommitmentActivityRow {
    activity_id: String,
    title: String,
    starts_at: DateTime<Utc>,
    ends_at: DateTime<Utc>,
}

impl From<CommitmentActivityRow> for ActivityRef {
    fn from(row: CommitmentActivityRow) -> Self {
        ActivityRef {
            id: row.activity_id,
            title: row.title,
            starts_at: row.starts_at,
            ends_at: row.ends_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct FormFieldRow {
    id: String,
    activity_id: String,
    key: String,
    label: String,
    kind: String,
    options: Option<String>,
    required: i64,
    position: i64,
    visible_if: Option<String>,
}

impl TryFrom<FormFieldRow> for FormField {
    type Error = StoreError;

    fn try_from(row: FormFieldRow) -> Result<Self, Self::Error> {
        let kind = match row.kind.as_str() {
            "text" => FieldKind::Text,
            "boolean" => FieldKind::Boolean,
            "select" => {
                let raw = row.options.as_deref().unwrap_or("[]");
                let options: Vec<String> = serde_json::from_str(raw).map_err(|e| {
                    StoreError::Backend(format!("bad options for field {}: {e}", row.id))
                })?;
                FieldKind::Select { options }
            }
            other => {
                return Err(StoreError::Backend(format!(
                    "unknown field kind {other} for field {}",
                    row.id
                )))
            }
        };
        let visible_if = match row.visible_if.as_deref() {
            Some(raw) => Some(serde_json::from_str::<VisibilityCondition>(raw).map_err(|e| {
                StoreError::Backend(format!("bad visibility condition for field {}: {e}", row.id))
            })?),
            None => None,
        };
        Ok(FormField {
            id: row.id,
            activity_id: row.activity_id,
            key: row.key,
            label: row.label,
            kind,
            required: row.required != 0,
            position: row.position,
            visible_if,
        })
    }
}

fn encode_field_kind(kind: &FieldKind) -> StoreResult<(&'static str, Option<String>)> {
    Ok(match kind {
        FieldKind::Text => ("text", None),
        FieldKind::Boolean => ("boolean", None),
        FieldKind::Select { options } => (
            "select",
            Some(
                serde_json::to_string(options)
                    .map_err(|e| StoreError::Backend(e.to_string()))?,
            ),
        ),
    })
}

fn map_pair_insert_err(err: sqlx::Error, activity_id: &str, person_id: &str) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return StoreError::DuplicatePair {
                activity_id: activity_id.to_string(),
                person_id: person_id.to_string(),
            };
        }
    }
    StoreError::from(err)
}

const SQL_FIND_ACTIVITY: &str = r#"
SELECT
  id,
  title,
  description,
  location,
  starts_at,
  ends_at,
  capacity,
  volunteer_required,
  volunteer_ratio,
  created_at
FROM activities
WHERE id = ?
LIMIT 1
"#;

const SQL_INSERT_ACTIVITY: &str = r#"
INSERT INTO activities (
  id,
  title,
  description,
  location,
  starts_at,
  ends_at,
  capacity,
  volunteer_required,
  volunteer_ratio,
  created_at
) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
"#;

const SQL_UPDATE_ACTIVITY: &str = r#"
UPDATE activities SET
  title = ?,
  description = ?,
  location = ?,
  starts_at = ?,
  ends_at = ?,
  capacity = ?,
  volunteer_required = ?,
  volunteer_ratio = ?
WHERE id = ?
"#;

const SQL_LIST_UPCOMING_ACTIVITIES: &str = r#"
SELECT
  id,
  title,
  description,
  location,
  starts_at,
  ends_at,
  capacity,
  volunteer_required,
  volunteer_ratio,
  created_at
FROM activities
WHERE datetime(starts_at) >= datetime(?)
ORDER BY datetime(starts_at) ASC
LIMIT ?
"#;

const SQL_COUNT_ACTIVITIES: &str = "SELECT COUNT(*) FROM activities";

const SQL_COUNT_ACTIVE_REGISTRATIONS_FOR_ACTIVITY: &str = r#"
SELECT COUNT(*)
FROM registrations
WHERE activity_id = ?
  AND status IN ('PENDING', 'CONFIRMED')
"#;

const SQL_COUNT_ACTIVE_ASSIGNMENTS_FOR_ACTIVITY: &str = r#"
SELECT COUNT(*)
FROM volunteer_assignments
WHERE activity_id = ?
  AND status IN ('PENDING', 'CONFIRMED')
"#;

const SQL_COUNT_ACTIVE_REGISTRATIONS: &str = r#"
SELECT COUNT(*)
FROM registrations
WHERE status IN ('PENDING', 'CONFIRMED')
"#;

const SQL_COUNT_ACTIVE_ASSIGNMENTS: &str = r#"
SELECT COUNT(*)
FROM volunteer_assignments
WHERE status IN ('PENDING', 'CONFIRMED')
"#;

const SQL_ACTIVE_REGISTRATION_ACTIVITIES_FOR_PERSON: &str = r#"
SELECT
  a.id AS activity_id,
  a.title,
  a.starts_at,
  a.ends_at
FROM registrations r
JOIN activities a ON a.id = r.activity_id
WHERE r.person_id = ?
  AND r.status IN ('PENDING', 'CONFIRMED')
ORDER BY datetime(r.created_at) ASC
"#;

const SQL_ACTIVE_ASSIGNMENT_ACTIVITIES_FOR_PERSON: &str = r#"
SELECT
  a.id AS activity_id,
  a.title,
  a.starts_at,
  a.ends_at
FROM volunteer_assignments v
JOIN activities a ON a.id = v.activity_id
WHERE v.person_id = ?
  AND v.status IN ('PENDING', 'CONFIRMED')
ORDER BY datetime(v.created_at) ASC
"#;

const SQL_INSERT_REGISTRATION: &str = r#"
INSERT INTO registrations (
  id,
  activity_id,
  person_id,
  status,
  created_at
) VALUES (?, ?, ?, ?, ?)
"#;

const SQL_INSERT_ASSIGNMENT: &str = r#"
INSERT INTO volunteer_assignments (
  id,
  activity_id,
  person_id,
  status,
  created_at
) VALUES (?, ?, ?, ?, ?)
"#;

const SQL_INSERT_ANSWER: &str = r#"
INSERT INTO registration_answers (
  id,
  registration_id,
  field_id,
  value_json
) VALUES (?, ?, ?, ?)
"#;

const SQL_ANSWERS_FOR_REGISTRATION: &str = r#"
SELECT field_id, value_json
FROM registration_answers
WHERE registration_id = ?
"#;

const SQL_FORM_FIELDS_FOR_ACTIVITY: &str = r#"
SELECT
  id,
  activity_id,
  key,
  label,
  kind,
  options,
  required,
  position,
  visible_if
FROM form_fields
WHERE activity_id = ?
ORDER BY position ASC
"#;

const SQL_DELETE_FORM_FIELDS: &str = "DELETE FROM form_fields WHERE activity_id = ?";

const SQL_INSERT_FORM_FIELD: &str = r#"
INSERT INTO form_fields (
  id,
  activity_id,
  key,
  label,
  kind,
  options,
  required,
  position,
  visible_if
) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
"#;

#[async_trait]
impl ActivityStore for SqliteStore {
    async fn find_activity(&self, activity_id: &str) -> StoreResult<Option<Activity>> {
        let row = sqlx::query_as::<_, ActivityRow>(SQL_FIND_ACTIVITY)
            .bind(activity_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Activity::from))
    }

    async fn insert_activity(&self, activity: Activity) -> StoreResult<()> {
        sqlx::query(SQL_INSERT_ACTIVITY)
            .bind(&activity.id)
            .bind(&activity.title)
            .bind(&activity.description)
            .bind(&activity.location)
            .bind(activity.starts_at)
            .bind(activity.ends_at)
            .bind(activity.capacity)
            .bind(activity.volunteer_required)
            .bind(activity.volunteer_ratio)
            .bind(activity.created_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn update_activity(&self, activity: Activity) -> StoreResult<()> {
        let res = sqlx::query(SQL_UPDATE_ACTIVITY)
            .bind(&activity.title)
            .bind(&activity.description)
            .bind(&activity.location)
            .bind(activity.starts_at)
            .bind(activity.ends_at)
            .bind(activity.capacity)
            .bind(activity.volunteer_required)
            .bind(activity.volunteer_ratio)
            .bind(&activity.id)
            .execute(&self.pool)
            .await?;
        if res.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("activity {}", activity.id)));
        }
        Ok(())
    }

    async fn list_upcoming_activities(
        &self,
        now: DateTime<Utc>,
        limit: i64,
    ) -> StoreResult<Vec<Activity>> {
        let rows = sqlx::query_as::<_, ActivityRow>(SQL_LIST_UPCOMING_ACTIVITIES)
            .bind(now)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Activity::from).collect())
    }

    async fn count_activities(&self) -> StoreResult<i64> {
        Ok(sqlx::query_scalar::<_, i64>(SQL_COUNT_ACTIVITIES)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn active_registration_count(&self, activity_id: &str) -> StoreResult<i64> {
        Ok(
            sqlx::query_scalar::<_, i64>(SQL_COUNT_ACTIVE_REGISTRATIONS_FOR_ACTIVITY)
                .bind(activity_id)
                .fetch_one(&self.pool)
                .await?,
        )
    }

    async fn active_assignment_count(&self, activity_id: &str) -> StoreResult<i64> {
        Ok(
            sqlx::query_scalar::<_, i64>(SQL_COUNT_ACTIVE_ASSIGNMENTS_FOR_ACTIVITY)
                .bind(activity_id)
                .fetch_one(&self.pool)
                .await?,
        )
    }

    async fn count_active_registrations(&self) -> StoreResult<i64> {
        Ok(sqlx::query_scalar::<_, i64>(SQL_COUNT_ACTIVE_REGISTRATIONS)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn count_active_assignments(&self) -> StoreResult<i64> {
        Ok(sqlx::query_scalar::<_, i64>(SQL_COUNT_ACTIVE_ASSIGNMENTS)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn active_commitments_for_person(
        &self,
        person_id: &str,
    ) -> StoreResult<Vec<PersonCommitment>> {
        let registration_rows =
            sqlx::query_as::<_, CommitmentActivityRow>(SQL_ACTIVE_REGISTRATION_ACTIVITIES_FOR_PERSON)
                .bind(person_id)
                .fetch_all(&self.pool)
                .await?;
        let assignment_rows =
            sqlx::query_as::<_, CommitmentActivityRow>(SQL_ACTIVE_ASSIGNMENT_ACTIVITIES_FOR_PERSON)
                .bind(person_id)
                .fetch_all(&self.pool)
                .await?;

        let mut commitments = Vec::with_capacity(registration_rows.len() + assignment_rows.len());
        commitments.extend(registration_rows.into_iter().map(|row| PersonCommitment {
            kind: CommitmentKind::Registration,
            activity: ActivityRef::from(row),
        }));
        commitments.extend(assignment_rows.into_iter().map(|row| PersonCommitment {
            kind: CommitmentKind::Assignment,
            activity: ActivityRef::from(row),
        }));
        Ok(commitments)
    }

    async fn insert_registration(
        &self,
        registration: Registration,
        answers: Vec<FormAnswer>,
    ) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(SQL_INSERT_REGISTRATION)
            .bind(&registration.id)
            .bind(&registration.activity_id)
            .bind(&registration.person_id)
            .bind(registration.status.as_str())
            .bind(registration.created_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                map_pair_insert_err(e, &registration.activity_id, &registration.person_id)
            })?;

        for answer in &answers {
            let value_json = serde_json::to_string(&answer.value)
                .map_err(|e| StoreError::Backend(e.to_string()))?;
            sqlx::query(SQL_INSERT_ANSWER)
                .bind(uuid::Uuid::new_v4().to_string())
                .bind(&registration.id)
                .bind(&answer.field_id)
                .bind(value_json)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn insert_assignment(&self, assignment: VolunteerAssignment) -> StoreResult<()> {
        sqlx::query(SQL_INSERT_ASSIGNMENT)
            .bind(&assignment.id)
            .bind(&assignment.activity_id)
            .bind(&assignment.person_id)
            .bind(assignment.status.as_str())
            .bind(assignment.created_at)
            .execute(&self.pool)
            .await
            .map_err(|e| map_pair_insert_err(e, &assignment.activity_id, &assignment.person_id))?;
        Ok(())
    }

    async fn answers_for_registration(&self, registration_id: &str) -> StoreResult<Vec<FormAnswer>> {
        let rows: Vec<(String, String)> = sqlx::query_as(SQL_ANSWERS_FOR_REGISTRATION)
            .bind(registration_id)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter()
            .map(|(field_id, value_json)| {
                let value = serde_json::from_str(&value_json).map_err(|e| {
                    StoreError::Backend(format!("bad stored answer for field {field_id}: {e}"))
                })?;
                Ok(FormAnswer { field_id, value })
            })
            .collect()
    }

    async fn form_fields(&self, activity_id: &str) -> StoreResult<Vec<FormField>> {
        let rows = sqlx::query_as::<_, FormFieldRow>(SQL_FORM_FIELDS_FOR_ACTIVITY)
            .bind(activity_id)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(FormField::try_from).collect()
    }

    async fn replace_form_fields(
        &self,
        activity_id: &str,
        fields: Vec<FormField>,
    ) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(SQL_DELETE_FORM_FIELDS)
            .bind(activity_id)
            .execute(&mut *tx)
            .await?;

        for field in &fields {
            let (kind, options) = encode_field_kind(&field.kind)?;
            let visible_if = match &field.visible_if {
                Some(cond) => Some(
                    serde_json::to_string(cond).map_err(|e| StoreError::Backend(e.to_string()))?,
                ),
                None => None,
            };
            sqlx::query(SQL_INSERT_FORM_FIELD)
                .bind(&field.id)
                .bind(activity_id)
                .bind(&field.key)
                .bind(&field.label)
                .bind(kind)
                .bind(options)
                .bind(field.required as i64)
                .bind(field.position)
                .bind(visible_if)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

const SQL_FIND_PERSON: &str = r#"
SELECT id, role, email, name
FROM people
WHERE id = ?
LIMIT 1
"#;

const SQL_INSERT_PERSON: &str = r#"
INSERT INTO people (id, role, email, name)
VALUES (?, ?, ?, ?)
ON CONFLICT(id) DO UPDATE SET
  role = excluded.role,
  email = excluded.email,
  name = excluded.name
"#;

const SQL_STAFF_EMAILS: &str = r#"
SELECT email
FROM people
WHERE role = 'STAFF'
  AND email IS NOT NULL
ORDER BY email ASC
"#;

#[async_trait]
impl PersonDirectory for SqliteStore {
    async fn find_person(&self, person_id: &str) -> StoreResult<Option<Person>> {
        let row = sqlx::query_as::<_, PersonRow>(SQL_FIND_PERSON)
            .bind(person_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Person::try_from).transpose()
    }

    async fn insert_person(&self, person: Person) -> StoreResult<()> {
        sqlx::query(SQL_INSERT_PERSON)
            .bind(&person.id)
            .bind(person.role.as_str())
            .bind(&person.email)
            .bind(&person.name)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn staff_emails(&self) -> StoreResult<Vec<String>> {
        let emails: Vec<String> = sqlx::query_scalar(SQL_STAFF_EMAILS)
            .fetch_all(&self.pool)
            .await?;
        Ok(emails)
    }
}
