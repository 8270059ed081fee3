use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::TimeRange;

/// A scheduled, time-bounded activity with participant capacity and a
/// volunteer coverage policy.
#[derive(Debug, Clone, Serialize)]
pub struct Activity {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub location: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    /// Participant seats. Volunteer assignments never count against this.
    pub capacity: i64,
    /// Hard floor on volunteer headcount, independent of attendance.
    pub volunteer_required: i64,
    /// Participants per volunteer; `required = max(floor, ceil(participants / ratio))`.
    pub volunteer_ratio: f64,
    pub created_at: DateTime<Utc>,
}

impl Activity {
    /// The activity's `[starts_at, ends_at)` window.
    ///
    /// Stored activities always satisfy `starts_at < ends_at` (enforced on
    /// create/update), so this does not fail.
    pub fn time_range(&self) -> TimeRange {
        TimeRange {
            start: self.starts_at,
            end: self.ends_at,
        }
    }
}

/// Payload for staff activity creation and update.
#[derive(Debug, Clone, Deserialize)]
pub struct NewActivity {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub location: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub capacity: i64,
    #[serde(default)]
    pub volunteer_required: i64,
    #[serde(default = "default_volunteer_ratio")]
    pub volunteer_ratio: f64,
}

// Five participants per volunteer when the form leaves the ratio blank.
fn default_volunteer_ratio() -> f64 {
    5.0
}

/// Slim activity reference used when reporting a schedule conflict back to
/// the caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityRef {
    pub id: String,
    pub title: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
}

impl ActivityRef {
    pub fn time_range(&self) -> TimeRange {
        TimeRange {
            start: self.starts_at,
            end: self.ends_at,
        }
    }
}

impl From<&Activity> for ActivityRef {
    fn from(activity: &Activity) -> Self {
        Self {
            id: activity.id.clone(),
            title: activity.title.clone(),
            starts_at: activity.starts_at,
            ends_at: activity.ends_at,
        }
    }
}
