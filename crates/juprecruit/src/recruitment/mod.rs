//! Talent recruitment intake, job applications, and the HR review surface.
//!
//! Public forms submit through [`RecruitmentService`], which mirrors every submission into the
//! spreadsheet ledger before persisting it. HR staff reach the list, delete, dashboard, and file
//! browser routes only with an admin session.

pub mod domain;
pub mod ledger;
pub mod repository;
pub mod router;
pub mod service;
pub mod session;
pub mod stats;
pub mod storage;

#[cfg(test)]
mod tests;

pub use domain::{
    ActivityEntry, JobApplication, JobApplicationSubmission, NewJobApplication, NewTalentRecruit,
    RecordId, RecordKind, SubmissionEnvelope, TalentProfileSubmission, TalentRecruit,
    ValidationError,
};
pub use ledger::{AppendOutcome, LedgerError, LedgerRow, SubmissionLedger, JOB_HEADERS, TALENT_HEADERS};
pub use repository::{RecruitRepository, RepositoryError};
pub use router::{recruitment_router, CurrentSession, RecruitmentState};
pub use service::{
    JobApplicationListing, RecruitmentService, ResumeDownload, ServiceError, SubmissionReceipt,
    UploadPolicy,
};
pub use session::{IssuedSession, SessionError, SessionStore, SessionUser, SignInProfile};
pub use stats::{DashboardSnapshot, ListQuery, SortOrder, TalentDistributions};
pub use storage::{
    DownloadedObject, DriveFile, DriveGateway, DriveOperationError, DriveUpload, ObjectStore,
    StorageError, StoredObject, StoredObjectEntry, UploadedFile,
};
