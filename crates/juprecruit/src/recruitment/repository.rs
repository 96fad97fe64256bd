use async_trait::async_trait;

use super::domain::{
    ActivityEntry, JobApplication, NewJobApplication, NewTalentRecruit, RecordId, TalentRecruit,
};

/// Table store holding talent recruits and job applications.
///
/// Records are only ever created, listed, counted, and deleted by primary key. Deleting an id
/// that does not exist is not an error, matching the behavior of the hosted table store.
#[async_trait]
pub trait RecruitRepository: Send + Sync {
    async fn insert_talent(&self, recruit: NewTalentRecruit)
        -> Result<TalentRecruit, RepositoryError>;
    async fn list_talent(&self) -> Result<Vec<TalentRecruit>, RepositoryError>;
    async fn count_talent(&self) -> Result<u64, RepositoryError>;
    async fn delete_talent(&self, id: &RecordId) -> Result<(), RepositoryError>;
    async fn recent_talent(&self, limit: usize) -> Result<Vec<ActivityEntry>, RepositoryError>;

    async fn insert_application(
        &self,
        application: NewJobApplication,
    ) -> Result<JobApplication, RepositoryError>;
    async fn list_applications(&self) -> Result<Vec<JobApplication>, RepositoryError>;
    async fn count_applications(&self) -> Result<u64, RepositoryError>;
    async fn delete_application(&self, id: &RecordId) -> Result<(), RepositoryError>;
    async fn recent_applications(&self, limit: usize)
        -> Result<Vec<ActivityEntry>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("repository unavailable: {0}")]
    Unavailable(String),
    #[error("repository rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("unexpected repository payload: {0}")]
    Decode(String),
}
