use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::ActivityRef;

/// Lifecycle status shared by registrations and volunteer assignments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommitmentStatus {
    Pending,
    Confirmed,
    Cancelled,
    /// Reserved in the stored vocabulary; no workflow currently produces or
    /// promotes it. Never counts as active.
    Waitlisted,
}

impl CommitmentStatus {
    /// Active commitments hold a seat, count toward coverage, and block
    /// overlapping bookings.
    pub fn is_active(self) -> bool {
        matches!(self, CommitmentStatus::Pending | CommitmentStatus::Confirmed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CommitmentStatus::Pending => "PENDING",
            CommitmentStatus::Confirmed => "CONFIRMED",
            CommitmentStatus::Cancelled => "CANCELLED",
            CommitmentStatus::Waitlisted => "WAITLISTED",
        }
    }

    pub fn parse(input: &str) -> Option<Self> {
        match input {
            "PENDING" => Some(CommitmentStatus::Pending),
            "CONFIRMED" => Some(CommitmentStatus::Confirmed),
            "CANCELLED" => Some(CommitmentStatus::Cancelled),
            "WAITLISTED" => Some(CommitmentStatus::Waitlisted),
            _ => None,
        }
    }
}

/// A participant's seat in an activity.
#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    pub id: String,
    pub activity_id: String,
    pub person_id: String,
    pub status: CommitmentStatus,
    pub created_at: DateTime<Utc>,
}

/// A volunteer's commitment to staff an activity. Structurally a
/// registration, but it never consumes a participant seat and counts toward
/// coverage instead.
#[derive(Debug, Clone, Serialize)]
pub struct VolunteerAssignment {
    pub id: String,
    pub activity_id: String,
    pub person_id: String,
    pub status: CommitmentStatus,
    pub created_at: DateTime<Utc>,
}

/// Which collection a commitment lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommitmentKind {
    Registration,
    Assignment,
}

/// One of a person's active commitments together with the activity it books,
/// as enumerated for the conflict scan.
#[derive(Debug, Clone)]
pub struct PersonCommitment {
    pub kind: CommitmentKind,
    pub activity: ActivityRef,
}

/// An answer persisted against one of the activity's form fields. The value
/// is stored as JSON verbatim; type correctness is not checked at this
/// layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormAnswer {
    pub field_id: String,
    pub value: serde_json::Value,
}
