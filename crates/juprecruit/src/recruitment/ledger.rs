//! Spreadsheet mirror of every submission.
//!
//! Row layout is fixed by the header lists below; HR staff sort and filter the sheet by these
//! columns, so reordering them is a breaking change for the people reading it.

use async_trait::async_trait;
use serde::Serialize;

use super::domain::{JobApplicationSubmission, TalentProfileSubmission};
use super::session::SessionUser;

pub const TALENT_HEADERS: [&str; 13] = [
    "Name",
    "Expertise",
    "Experience",
    "Interests",
    "Talents",
    "Languages",
    "Timezone",
    "Description",
    "Email",
    "Twitter",
    "LinkedIn",
    "Discord Username",
    "Previous Work Links",
];

pub const JOB_HEADERS: [&str; 8] = [
    "Name",
    "Contact",
    "Message",
    "Workgroup",
    "Position",
    "Username",
    "Twitter",
    "Discord",
];

/// One ledger row, already flattened to cell strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerRow(pub Vec<String>);

impl LedgerRow {
    pub fn cells(&self) -> &[String] {
        &self.0
    }

    pub fn talent(submission: &TalentProfileSubmission, session: Option<&SessionUser>) -> Self {
        let twitter = match session {
            Some(user) if user.signed_in_with_twitter() => user.name.clone(),
            _ => submission.twitter.clone(),
        };
        let discord_username = if submission.discord_username.trim().is_empty() {
            session.map(|user| user.name.clone()).unwrap_or_default()
        } else {
            submission.discord_username.clone()
        };

        Self(vec![
            submission.name.trim().to_string(),
            submission.resolved_expertise().join(", "),
            submission.experience.clone(),
            submission.resolved_interests().join(", "),
            submission.talents.clone(),
            submission.languages.join(", "),
            submission.timezone.clone(),
            submission.description.clone(),
            submission.email.clone(),
            twitter,
            submission.linkedin.clone(),
            discord_username,
            submission.work_links().join(", "),
        ])
    }

    pub fn job_application(
        submission: &JobApplicationSubmission,
        session: Option<&SessionUser>,
    ) -> Self {
        let flag = |value: bool| if value { "true" } else { "false" }.to_string();

        Self(vec![
            submission.name.trim().to_string(),
            submission.contact.clone(),
            submission.message.clone(),
            submission.workgroup.clone(),
            submission.position.clone(),
            session.map(|user| user.name.clone()).unwrap_or_default(),
            flag(session.is_some_and(SessionUser::signed_in_with_twitter)),
            flag(session.is_some_and(SessionUser::signed_in_with_discord)),
        ])
    }
}

/// Result of appending a row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppendOutcome {
    pub updated_range: String,
}

#[async_trait]
pub trait SubmissionLedger: Send + Sync {
    async fn append_talent(&self, row: LedgerRow) -> Result<AppendOutcome, LedgerError>;
    async fn append_job_application(&self, row: LedgerRow)
        -> Result<AppendOutcome, LedgerError>;
}

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("spreadsheet rate limit exceeded")]
    RateLimited,
    #[error("spreadsheet authorization failed: {0}")]
    Auth(String),
    #[error("spreadsheet request failed: {0}")]
    Backend(String),
}

/// Spreadsheet column name for a 1-based column index (`1 -> A`, `27 -> AA`).
pub fn column_letter(mut column: usize) -> String {
    let mut letters = Vec::new();
    while column > 0 {
        let remainder = (column - 1) % 26;
        letters.push(char::from(b'A' + remainder as u8));
        column = (column - 1) / 26;
    }
    letters.iter().rev().collect()
}

/// A1 range covering the header row, e.g. `Sheet1!A1:M1`.
pub fn header_range(sheet_title: &str, header_count: usize) -> String {
    format!("{sheet_title}!A1:{}1", column_letter(header_count))
}

/// Whether the first row returned by the spreadsheet needs to be (re)written.
pub fn headers_need_update(existing: Option<&[String]>, headers: &[&str]) -> bool {
    match existing {
        None => true,
        Some(row) => row.len() < headers.len(),
    }
}
