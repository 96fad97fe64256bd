//! HR dashboard aggregation and list filtering.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use super::domain::{ActivityEntry, JobApplication, TalentRecruit};

/// Number of entries taken from each table for the activity feed.
pub const RECENT_ACTIVITY_PER_TABLE: usize = 5;

pub const LANGUAGE_OPTIONS: [&str; 16] = [
    "English",
    "Chinese",
    "Russian",
    "Japanese",
    "Indonesian",
    "Turkish",
    "Persian",
    "Vietnamese",
    "French",
    "Spanish",
    "Italian",
    "Portuguese",
    "Indian",
    "German",
    "Filipino",
    "Arabic",
];

pub const EXPERIENCE_OPTIONS: [&str; 4] = ["0-2 years", "2-5 years", "5-10 years", "10+ years"];

pub const EXPERTISE_OPTIONS: [&str; 16] = [
    "Business Development",
    "Business Intelligence & Data Science",
    "AI & Machine Learning",
    "IT & Cybersecurity",
    "Accounting & Finance",
    "Web2/Web3 Development",
    "Administration & Human Resources",
    "Graphic Design & Media Productions",
    "Sales & Marketing",
    "Communications & PR",
    "Customer Service",
    "Logitics & Operations",
    "Legal & Compliance",
    "Medical, Health & Safety",
    "Project & Product Management",
    "Other",
];

pub const TIMEZONE_OPTIONS: [&str; 25] = [
    "UTC-12", "UTC-11", "UTC-10", "UTC-9", "UTC-8", "UTC-7", "UTC-6", "UTC-5", "UTC-4", "UTC-3",
    "UTC-2", "UTC-1", "UTC", "UTC+1", "UTC+2", "UTC+3", "UTC+4", "UTC+5", "UTC+6", "UTC+7",
    "UTC+8", "UTC+9", "UTC+10", "UTC+11", "UTC+12",
];

/// One bar/slice of a dashboard chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DistributionEntry {
    pub name: &'static str,
    pub value: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TalentDistributions {
    pub languages: Vec<DistributionEntry>,
    pub experience: Vec<DistributionEntry>,
    pub expertise: Vec<DistributionEntry>,
    pub timezone: Vec<DistributionEntry>,
}

impl TalentDistributions {
    pub fn from_recruits(recruits: &[TalentRecruit]) -> Self {
        Self {
            languages: distribution(&LANGUAGE_OPTIONS, |option| {
                count_where(recruits, |recruit| contains(&recruit.languages, option))
            }),
            experience: distribution(&EXPERIENCE_OPTIONS, |option| {
                count_where(recruits, |recruit| recruit.experience == option)
            }),
            expertise: distribution(&EXPERTISE_OPTIONS, |option| {
                count_where(recruits, |recruit| contains(&recruit.expertise, option))
            }),
            timezone: distribution(&TIMEZONE_OPTIONS, |option| {
                count_where(recruits, |recruit| recruit.timezone == option)
            }),
        }
    }
}

fn distribution<F>(options: &[&'static str], count: F) -> Vec<DistributionEntry>
where
    F: Fn(&str) -> usize,
{
    options
        .iter()
        .map(|&option| DistributionEntry {
            name: option,
            value: count(option),
        })
        .filter(|entry| entry.value > 0)
        .collect()
}

fn count_where<F>(recruits: &[TalentRecruit], predicate: F) -> usize
where
    F: Fn(&TalentRecruit) -> bool,
{
    recruits.iter().filter(|recruit| predicate(recruit)).count()
}

fn contains(values: &[String], option: &str) -> bool {
    values.iter().any(|value| value == option)
}

/// Everything the HR dashboard renders in one payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardSnapshot {
    pub total_recruits: u64,
    pub total_applications: u64,
    pub recent_activity: Vec<ActivityEntry>,
    pub distributions: TalentDistributions,
}

/// Merge the per-table activity feeds, newest first.
pub fn merge_recent_activity(
    talent: Vec<ActivityEntry>,
    applications: Vec<ActivityEntry>,
) -> Vec<ActivityEntry> {
    let mut combined: Vec<ActivityEntry> = talent.into_iter().chain(applications).collect();
    combined.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    combined
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    }
}

/// Search and ordering applied to the HR list views.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default)]
    pub sort: Option<SortOrder>,
}

impl ListQuery {
    fn needle(&self) -> Option<String> {
        self.q
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(str::to_lowercase)
    }
}

/// Keep recruits whose name, expertise, interests, talents, languages, or description match
/// the query, then order by name when a sort order is requested.
pub fn filter_recruits(mut recruits: Vec<TalentRecruit>, query: &ListQuery) -> Vec<TalentRecruit> {
    if let Some(needle) = query.needle() {
        let matches = |value: &str| value.to_lowercase().contains(&needle);
        recruits.retain(|recruit| {
            matches(&recruit.name)
                || recruit.expertise.iter().any(|value| matches(value))
                || recruit.interests.iter().any(|value| matches(value))
                || matches(&recruit.talents)
                || recruit.languages.iter().any(|value| matches(value))
                || matches(&recruit.description)
        });
    }

    if let Some(order) = query.sort {
        recruits.sort_by(|a, b| order.apply(compare_text(&a.name, &b.name)));
    }
    recruits
}

/// Job applications are searched and ordered by position.
pub fn filter_applications(
    mut applications: Vec<JobApplication>,
    query: &ListQuery,
) -> Vec<JobApplication> {
    if let Some(needle) = query.needle() {
        applications.retain(|application| application.position.to_lowercase().contains(&needle));
    }

    if let Some(order) = query.sort {
        applications.sort_by(|a, b| order.apply(compare_text(&a.position, &b.position)));
    }
    applications
}

fn compare_text(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase()).then_with(|| a.cmp(b))
}
