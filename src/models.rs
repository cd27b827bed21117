//! Data model for the clinic REST API entities the bot reads and creates.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Identifier of a backend entity.
///
/// The clinic API uses integer keys for some resources and UUID strings for
/// others; the id is kept in whatever form the backend sent and is sent back
/// unchanged. A numeric string and the same number compare equal, since ids
/// coming back from callback data are re-parsed without type information.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityId {
    Int(i64),
    Text(String),
}

impl PartialEq for EntityId {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (EntityId::Int(a), EntityId::Int(b)) => a == b,
            (EntityId::Text(a), EntityId::Text(b)) => a == b,
            (EntityId::Int(n), EntityId::Text(s)) | (EntityId::Text(s), EntityId::Int(n)) => *s == n.to_string(),
        }
    }
}

impl Eq for EntityId {}

impl Hash for EntityId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            EntityId::Int(n) => n.to_string().hash(state),
            EntityId::Text(s) => s.hash(state),
        }
    }
}

impl EntityId {
    /// Parse an id received from callback data or user input.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        // Only canonical integers; "007" or "+5" must come back as sent
        Some(match raw.parse::<i64>() {
            Ok(n) if n.to_string() == raw => EntityId::Int(n),
            _ => EntityId::Text(raw.to_string()),
        })
    }

    /// Short form for display, e.g. the first 8 characters of a UUID.
    pub fn short(&self) -> String {
        match self {
            EntityId::Int(n) => n.to_string(),
            EntityId::Text(s) => s.chars().take(8).collect(),
        }
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityId::Int(n) => write!(f, "{n}"),
            EntityId::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for EntityId {
    fn from(n: i64) -> Self {
        EntityId::Int(n)
    }
}

impl From<i32> for EntityId {
    fn from(n: i32) -> Self {
        EntityId::Int(i64::from(n))
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        EntityId::Text(s.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Doctor {
    pub id: EntityId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub surname: String,
    #[serde(default)]
    pub specialization: String,
    #[serde(default)]
    pub experience_years: Option<u32>,
}

impl Doctor {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.name, self.surname).trim().to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: EntityId,
    pub user_id: Option<EntityId>,
    #[serde(default)]
    pub doctor_id: Option<EntityId>,
    #[serde(default)]
    pub room_id: Option<EntityId>,
    /// ISO-like datetime string as returned by the backend
    #[serde(default)]
    pub datetime: Option<String>,
}

impl Appointment {
    /// Date part (`YYYY-MM-DD`) of the scheduled datetime, if present.
    pub fn date_part(&self) -> Option<&str> {
        self.datetime.as_deref().and_then(|dt| dt.get(..10))
    }

    /// Time part (`HH:MM`) of the scheduled datetime, if present.
    pub fn time_part(&self) -> Option<&str> {
        self.datetime.as_deref().and_then(|dt| dt.get(11..16))
    }
}

/// Backend user record, only needed to resolve an email to an id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: EntityId,
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    pub id: EntityId,
}

/// Body of `POST /appointments`.
#[derive(Debug, Clone, Serialize)]
pub struct NewAppointment {
    pub user_id: EntityId,
    pub doctor_id: EntityId,
    pub room_id: EntityId,
    pub datetime: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: Option<String>,
}
