use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Primary key of a stored record. Supabase hands out bigint identities, so both JSON numbers
/// and strings are accepted on the way in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordId(pub String);

impl RecordId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl Serialize for RecordId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for RecordId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Integer(i64),
            Text(String),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Integer(value) => RecordId(value.to_string()),
            RawId::Text(value) => RecordId(value),
        })
    }
}

/// Public profile form payload (`data` of `POST /api/submitForm`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TalentProfileSubmission {
    pub name: String,
    pub expertise: Vec<String>,
    pub other_expertise: String,
    pub experience: String,
    pub interests: Vec<String>,
    pub other_interests: String,
    pub talents: String,
    pub languages: Vec<String>,
    pub timezone: String,
    pub description: String,
    pub email: String,
    pub discord: String,
    pub twitter: String,
    pub linkedin: String,
    pub discord_username: String,
    pub previous_work_links: Vec<String>,
}

impl TalentProfileSubmission {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut missing = Vec::new();
        if is_blank(&self.name) {
            missing.push("name");
        }
        ValidationError::from_missing(missing)
    }

    /// Expertise with the `Other` placeholder replaced by the free-text answer.
    pub fn resolved_expertise(&self) -> Vec<String> {
        expand_other(&self.expertise, &self.other_expertise)
    }

    pub fn resolved_interests(&self) -> Vec<String> {
        expand_other(&self.interests, &self.other_interests)
    }

    pub fn work_links(&self) -> Vec<String> {
        self.previous_work_links
            .iter()
            .map(|link| link.trim())
            .filter(|link| !link.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Job board application payload (`data` of `POST /api/submitFormJobs`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobApplicationSubmission {
    pub name: String,
    pub contact: String,
    pub message: String,
    pub workgroup: String,
    pub position: String,
}

impl JobApplicationSubmission {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let missing = [
            ("name", &self.name),
            ("contact", &self.contact),
            ("message", &self.message),
            ("workgroup", &self.workgroup),
            ("position", &self.position),
        ]
        .into_iter()
        .filter(|(_, value)| is_blank(value))
        .map(|(field, _)| field)
        .collect();
        ValidationError::from_missing(missing)
    }
}

/// Envelope the web forms post: `{ "data": { ... } }`. A client-supplied `session` field is
/// tolerated but never trusted.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmissionEnvelope<T> {
    #[serde(default)]
    pub data: Option<T>,
}

/// Row of the `talent_recruits` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TalentRecruit {
    pub id: RecordId,
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub expertise: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub experience: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub interests: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub talents: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub languages: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub timezone: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub email: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub discord: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub twitter: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub linkedin: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub logged_username: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub previous_work_links: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for `talent_recruits`; the table assigns `id` and `created_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTalentRecruit {
    pub name: String,
    pub expertise: Vec<String>,
    pub experience: String,
    pub interests: Vec<String>,
    pub talents: String,
    pub languages: Vec<String>,
    pub timezone: String,
    pub description: String,
    pub email: String,
    pub discord: String,
    pub twitter: String,
    pub linkedin: String,
    pub logged_username: String,
    pub previous_work_links: Vec<String>,
}

impl NewTalentRecruit {
    pub fn into_record(self, id: RecordId, created_at: DateTime<Utc>) -> TalentRecruit {
        TalentRecruit {
            id,
            name: self.name,
            expertise: self.expertise,
            experience: self.experience,
            interests: self.interests,
            talents: self.talents,
            languages: self.languages,
            timezone: self.timezone,
            description: self.description,
            email: self.email,
            discord: self.discord,
            twitter: self.twitter,
            linkedin: self.linkedin,
            logged_username: self.logged_username,
            previous_work_links: self.previous_work_links,
            created_at,
        }
    }
}

/// Row of the `job_applications` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobApplication {
    pub id: RecordId,
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub contact: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub message: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub workgroup: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub position: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub username: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewJobApplication {
    pub name: String,
    pub contact: String,
    pub message: String,
    pub workgroup: String,
    pub position: String,
    pub username: String,
}

impl NewJobApplication {
    pub fn into_record(self, id: RecordId, created_at: DateTime<Utc>) -> JobApplication {
        JobApplication {
            id,
            name: self.name,
            contact: self.contact,
            message: self.message,
            workgroup: self.workgroup,
            position: self.position,
            username: self.username,
            created_at,
        }
    }
}

/// Which table an activity entry or export came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    TalentRecruit,
    JobApplication,
}

impl RecordKind {
    pub const fn table(self) -> &'static str {
        match self {
            RecordKind::TalentRecruit => "talent_recruits",
            RecordKind::JobApplication => "job_applications",
        }
    }
}

/// Minimal projection used by the dashboard's recent activity feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub kind: RecordKind,
    pub name: String,
    pub username: String,
    pub created_at: DateTime<Utc>,
}

/// Required-field validation failure raised once at submission time.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("submission payload is missing")]
    MissingPayload,
    #[error("missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),
}

impl ValidationError {
    fn from_missing(missing: Vec<&'static str>) -> Result<(), Self> {
        if missing.is_empty() {
            Ok(())
        } else {
            Err(Self::MissingFields(missing))
        }
    }

    pub fn fields(&self) -> &[&'static str] {
        match self {
            ValidationError::MissingPayload => &[],
            ValidationError::MissingFields(fields) => fields,
        }
    }
}

/// Optional text and array columns come back as `null` for rows written by older clients.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

fn expand_other(selected: &[String], other: &str) -> Vec<String> {
    if !selected.iter().any(|entry| entry == "Other") {
        return selected.to_vec();
    }

    let mut expanded: Vec<String> = selected
        .iter()
        .filter(|entry| entry.as_str() != "Other")
        .cloned()
        .collect();
    let other = other.trim();
    if !other.is_empty() {
        expanded.push(other.to_string());
    }
    expanded
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn record_id_accepts_numbers_and_strings() {
        let numeric: RecordId = serde_json::from_value(json!(42)).expect("numeric id");
        let text: RecordId = serde_json::from_value(json!("a1b2")).expect("text id");
        assert_eq!(numeric.as_str(), "42");
        assert_eq!(text.as_str(), "a1b2");
        assert_eq!(serde_json::to_value(&numeric).expect("serializes"), json!("42"));
    }

    #[test]
    fn talent_submission_reads_camel_case_payload() {
        let submission: TalentProfileSubmission = serde_json::from_value(json!({
            "name": "Ada",
            "otherExpertise": "Compilers",
            "discordUsername": "ada#1",
            "previousWorkLinks": ["https://example.com", ""],
        }))
        .expect("payload parses");

        assert_eq!(submission.other_expertise, "Compilers");
        assert_eq!(submission.discord_username, "ada#1");
        assert_eq!(submission.work_links(), vec!["https://example.com"]);
        assert!(submission.expertise.is_empty());
    }

    #[test]
    fn blank_name_is_rejected() {
        let submission = TalentProfileSubmission {
            name: "   ".to_string(),
            ..TalentProfileSubmission::default()
        };
        assert_eq!(
            submission.validate(),
            Err(ValidationError::MissingFields(vec!["name"]))
        );
    }

    #[test]
    fn job_submission_lists_every_missing_field() {
        let submission = JobApplicationSubmission {
            name: "Grace".to_string(),
            position: "Rust Engineer".to_string(),
            ..JobApplicationSubmission::default()
        };
        let err = submission.validate().expect_err("fields missing");
        assert_eq!(err.fields(), &["contact", "message", "workgroup"]);
    }

    #[test]
    fn other_is_replaced_by_free_text() {
        let submission = TalentProfileSubmission {
            name: "Ada".to_string(),
            expertise: vec!["Blockchain".to_string(), "Other".to_string()],
            other_expertise: "Compilers".to_string(),
            interests: vec!["Other".to_string()],
            other_interests: "  ".to_string(),
            ..TalentProfileSubmission::default()
        };

        assert_eq!(submission.resolved_expertise(), vec!["Blockchain", "Compilers"]);
        assert!(submission.resolved_interests().is_empty());
    }

    #[test]
    fn stored_rows_tolerate_null_columns() {
        let recruit: TalentRecruit = serde_json::from_value(json!({
            "id": 7,
            "name": "Ada",
            "discord": null,
            "languages": null,
            "created_at": "2024-05-01T12:00:00.123456+00:00",
        }))
        .expect("row parses");
        assert_eq!(recruit.id, RecordId::from("7"));
        assert!(recruit.discord.is_empty());
        assert!(recruit.languages.is_empty());
    }
}
