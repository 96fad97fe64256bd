use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};

use super::domain::{
    JobApplication, JobApplicationSubmission, NewJobApplication, NewTalentRecruit, RecordId,
    RecordKind, TalentProfileSubmission, TalentRecruit, ValidationError,
};
use super::ledger::{LedgerError, LedgerRow, SubmissionLedger};
use super::repository::{RecruitRepository, RepositoryError};
use super::session::SessionUser;
use super::stats::{
    filter_applications, filter_recruits, merge_recent_activity, DashboardSnapshot, ListQuery,
    TalentDistributions, RECENT_ACTIVITY_PER_TABLE,
};
use super::storage::{
    file_name_of, job_resume_drive_name, resolve_resume_folder, resolve_resume_path,
    talent_resume_path, workgroup_resume_path, DownloadedObject, DriveFile, DriveGateway,
    DriveOperationError, DriveUpload, ObjectStore, StorageError, StoredObject, StoredObjectEntry,
    UploadedFile,
};
use crate::config::{UploadConfig, DEFAULT_UPLOAD_MAX_BYTES};

/// Limits and destinations applied to resume uploads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPolicy {
    pub max_bytes: usize,
    pub talent_drive_folder: Option<String>,
    pub jobs_drive_folder: Option<String>,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_UPLOAD_MAX_BYTES,
            talent_drive_folder: None,
            jobs_drive_folder: None,
        }
    }
}

impl From<&UploadConfig> for UploadPolicy {
    fn from(config: &UploadConfig) -> Self {
        Self {
            max_bytes: config.max_bytes,
            talent_drive_folder: config.talent_drive_folder.clone(),
            jobs_drive_folder: config.jobs_drive_folder.clone(),
        }
    }
}

/// What a successful submission reports back to the form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionReceipt {
    pub id: RecordId,
    pub updated_range: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobApplicationListing {
    pub total_applications: u64,
    pub applications: Vec<JobApplication>,
}

/// Resume fetched for the HR file browser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResumeDownload {
    pub file_name: String,
    pub object: DownloadedObject,
}

/// Service composing the table store, the spreadsheet ledger, and the two file backends.
pub struct RecruitmentService {
    repository: Arc<dyn RecruitRepository>,
    ledger: Arc<dyn SubmissionLedger>,
    bucket: Arc<dyn ObjectStore>,
    drive: Arc<dyn DriveGateway>,
    uploads: UploadPolicy,
}

impl RecruitmentService {
    pub fn new(
        repository: Arc<dyn RecruitRepository>,
        ledger: Arc<dyn SubmissionLedger>,
        bucket: Arc<dyn ObjectStore>,
        drive: Arc<dyn DriveGateway>,
        uploads: UploadPolicy,
    ) -> Self {
        Self {
            repository,
            ledger,
            bucket,
            drive,
            uploads,
        }
    }

    pub fn upload_policy(&self) -> &UploadPolicy {
        &self.uploads
    }

    /// Ledger the profile, then persist exactly one `talent_recruits` row.
    pub async fn submit_talent(
        &self,
        submission: TalentProfileSubmission,
        session: Option<&SessionUser>,
    ) -> Result<SubmissionReceipt, ServiceError> {
        submission.validate()?;

        let row = LedgerRow::talent(&submission, session);
        let appended = self.ledger.append_talent(row).await?;

        let record = NewTalentRecruit {
            name: submission.name.trim().to_string(),
            expertise: submission.resolved_expertise(),
            experience: submission.experience.clone(),
            interests: submission.resolved_interests(),
            talents: submission.talents.clone(),
            languages: submission.languages.clone(),
            timezone: submission.timezone.clone(),
            description: submission.description.clone(),
            email: submission.email.clone(),
            discord: submission.discord.clone(),
            twitter: submission.twitter.clone(),
            linkedin: submission.linkedin.clone(),
            logged_username: session.map(|user| user.name.clone()).unwrap_or_default(),
            previous_work_links: submission.work_links(),
        };
        let stored = self.repository.insert_talent(record).await?;

        info!(
            id = %stored.id,
            updated_range = %appended.updated_range,
            "talent profile recorded"
        );
        Ok(SubmissionReceipt {
            id: stored.id,
            updated_range: appended.updated_range,
        })
    }

    /// Ledger the application, then persist exactly one `job_applications` row.
    pub async fn submit_job_application(
        &self,
        submission: JobApplicationSubmission,
        session: Option<&SessionUser>,
    ) -> Result<SubmissionReceipt, ServiceError> {
        submission.validate()?;

        let row = LedgerRow::job_application(&submission, session);
        let appended = self.ledger.append_job_application(row).await?;

        let record = NewJobApplication {
            name: submission.name.trim().to_string(),
            contact: submission.contact,
            message: submission.message,
            workgroup: submission.workgroup,
            position: submission.position,
            username: session.map(|user| user.name.clone()).unwrap_or_default(),
        };
        let stored = self.repository.insert_application(record).await?;

        info!(
            id = %stored.id,
            position = %stored.position,
            updated_range = %appended.updated_range,
            "job application recorded"
        );
        Ok(SubmissionReceipt {
            id: stored.id,
            updated_range: appended.updated_range,
        })
    }

    pub async fn talent_recruits(
        &self,
        query: &ListQuery,
    ) -> Result<Vec<TalentRecruit>, ServiceError> {
        let recruits = self.repository.list_talent().await?;
        Ok(filter_recruits(recruits, query))
    }

    pub async fn talent_recruit_count(&self) -> Result<u64, ServiceError> {
        Ok(self.repository.count_talent().await?)
    }

    pub async fn job_applications(
        &self,
        query: &ListQuery,
    ) -> Result<JobApplicationListing, ServiceError> {
        let total_applications = self.repository.count_applications().await?;
        let applications = self.repository.list_applications().await?;
        Ok(JobApplicationListing {
            total_applications,
            applications: filter_applications(applications, query),
        })
    }

    pub async fn delete_talent_recruit(&self, id: &RecordId) -> Result<(), ServiceError> {
        self.repository.delete_talent(id).await?;
        info!(%id, table = RecordKind::TalentRecruit.table(), "record deleted");
        Ok(())
    }

    pub async fn delete_job_application(&self, id: &RecordId) -> Result<(), ServiceError> {
        self.repository.delete_application(id).await?;
        info!(%id, table = RecordKind::JobApplication.table(), "record deleted");
        Ok(())
    }

    pub async fn dashboard(&self) -> Result<DashboardSnapshot, ServiceError> {
        let total_recruits = self.repository.count_talent().await?;
        let total_applications = self.repository.count_applications().await?;
        let recent_talent = self
            .repository
            .recent_talent(RECENT_ACTIVITY_PER_TABLE)
            .await?;
        let recent_applications = self
            .repository
            .recent_applications(RECENT_ACTIVITY_PER_TABLE)
            .await?;
        let recruits = self.repository.list_talent().await?;

        Ok(DashboardSnapshot {
            total_recruits,
            total_applications,
            recent_activity: merge_recent_activity(recent_talent, recent_applications),
            distributions: TalentDistributions::from_recruits(&recruits),
        })
    }

    /// Talent profile resumes go to the talent Drive folder under their original name.
    pub async fn upload_talent_resume_to_drive(
        &self,
        file: Option<UploadedFile>,
    ) -> Result<DriveFile, ServiceError> {
        let file = self.accept_file(file)?;
        let upload = DriveUpload {
            name: file.file_name,
            mime_type: file.content_type,
            parent_folder_id: self.uploads.talent_drive_folder.clone(),
            bytes: file.bytes,
        };
        let uploaded = self.drive.upload_file(upload).await?;
        info!(file_id = %uploaded.file_id, name = %uploaded.name, "resume uploaded to drive");
        Ok(uploaded)
    }

    pub async fn upload_job_resume_to_drive(
        &self,
        file: Option<UploadedFile>,
        position: &str,
        session: Option<&SessionUser>,
    ) -> Result<DriveFile, ServiceError> {
        let file = self.accept_file(file)?;
        let user = session.ok_or(ServiceError::Unauthorized("Unauthorized access"))?;

        let upload = DriveUpload {
            name: job_resume_drive_name(position, &user.name),
            mime_type: file.content_type,
            parent_folder_id: self.uploads.jobs_drive_folder.clone(),
            bytes: file.bytes,
        };
        let uploaded = self.drive.upload_file(upload).await?;
        info!(file_id = %uploaded.file_id, name = %uploaded.name, "job resume uploaded to drive");
        Ok(uploaded)
    }

    pub async fn upload_talent_resume(
        &self,
        file: Option<UploadedFile>,
        session: Option<&SessionUser>,
    ) -> Result<StoredObject, ServiceError> {
        let file = self.accept_file(file)?;
        let user = session
            .filter(|user| !user.name.trim().is_empty())
            .ok_or(ServiceError::Unauthorized(
                "Unauthorized access or missing username",
            ))?;

        let path = talent_resume_path(&user.name, &file.file_name, Utc::now().timestamp_millis());
        let stored = self
            .bucket
            .upload(&path, file.bytes, &file.content_type)
            .await?;
        info!(key = %stored.key, "talent resume stored");
        Ok(stored)
    }

    pub async fn upload_workgroup_resume(
        &self,
        file: Option<UploadedFile>,
        position: &str,
        session: Option<&SessionUser>,
    ) -> Result<StoredObject, ServiceError> {
        let file = self.accept_file(file)?;
        let user = session.ok_or(ServiceError::Unauthorized("Unauthorized access"))?;

        let path = workgroup_resume_path(
            position,
            &user.name,
            &file.content_type,
            Utc::now().timestamp_millis(),
        );
        let stored = self
            .bucket
            .upload(&path, file.bytes, &file.content_type)
            .await?;
        info!(key = %stored.key, "workgroup resume stored");
        Ok(stored)
    }

    pub async fn resume_files(&self, folder: &str) -> Result<Vec<StoredObjectEntry>, ServiceError> {
        let folder = resolve_resume_folder(folder)
            .ok_or_else(|| ServiceError::InvalidPath(folder.to_string()))?;
        Ok(self.bucket.list(folder).await?)
    }

    pub async fn download_resume(&self, path: &str) -> Result<ResumeDownload, ServiceError> {
        let path =
            resolve_resume_path(path).ok_or_else(|| ServiceError::InvalidPath(path.to_string()))?;
        let object = self.bucket.download(&path).await?;
        Ok(ResumeDownload {
            file_name: file_name_of(&path).to_string(),
            object,
        })
    }

    pub async fn remove_resume(&self, path: &str) -> Result<(), ServiceError> {
        let path =
            resolve_resume_path(path).ok_or_else(|| ServiceError::InvalidPath(path.to_string()))?;
        self.bucket.remove(&path).await?;
        info!(%path, "resume removed");
        Ok(())
    }

    fn accept_file(&self, file: Option<UploadedFile>) -> Result<UploadedFile, ServiceError> {
        let file = file.ok_or(ServiceError::MissingFile)?;
        if file.len() > self.uploads.max_bytes {
            warn!(
                size = file.len(),
                limit = self.uploads.max_bytes,
                "rejecting oversized upload"
            );
            return Err(ServiceError::FileTooLarge {
                limit: self.uploads.max_bytes,
            });
        }
        Ok(file)
    }
}

/// Error raised by the recruitment service.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Drive(#[from] DriveOperationError),
    #[error("No file uploaded")]
    MissingFile,
    #[error("file exceeds the {limit} byte upload limit")]
    FileTooLarge { limit: usize },
    #[error("{0}")]
    Unauthorized(&'static str),
    #[error("path '{0}' is outside the resume folders")]
    InvalidPath(String),
}
