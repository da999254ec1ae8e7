use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A project owned by the active organization. Statements are uploaded into projects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    /// Perceptual color string (e.g. `oklch(0.72 0.11 178)`), stored verbatim.
    pub color: String,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub updated_at: DateTime<Utc>,
}

impl Project {
    pub fn find_by_id<'a>(projects: &'a [Project], id: &str) -> Option<&'a Project> {
        projects.iter().find(|p| p.id == id)
    }

    pub fn find_by_name<'a>(projects: &'a [Project], name: &str) -> Option<&'a Project> {
        projects.iter().find(|p| p.name == name)
    }
}

/// The ingestion API emits naive ISO 8601 timestamps (no offset) as UTC; accept both forms.
mod timestamp {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &DateTime<Utc>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_rfc3339())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        if let Ok(dt) = DateTime::parse_from_rfc3339(&raw) {
            return Ok(dt.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
            .map(|naive| naive.and_utc())
            .map_err(serde::de::Error::custom)
    }
}
