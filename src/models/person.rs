use serde::{Deserialize, Serialize};

/// Role tag deciding which checks and which target collection a submission
/// uses. Participants and volunteers share one identity space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PersonRole {
    Participant,
    Volunteer,
    Staff,
}

impl PersonRole {
    pub fn as_str(self) -> &'static str {
        match self {
            PersonRole::Participant => "PARTICIPANT",
            PersonRole::Volunteer => "VOLUNTEER",
            PersonRole::Staff => "STAFF",
        }
    }

    pub fn parse(input: &str) -> Option<Self> {
        match input {
            "PARTICIPANT" => Some(PersonRole::Participant),
            "VOLUNTEER" => Some(PersonRole::Volunteer),
            "STAFF" => Some(PersonRole::Staff),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Person {
    pub id: String,
    pub role: PersonRole,
    /// Missing address means the person gets no confirmation mail; it never
    /// blocks a registration.
    pub email: Option<String>,
    pub name: Option<String>,
}
