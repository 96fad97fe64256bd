use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request};
use axum::response::Response;
use chrono::{Duration, TimeZone, Utc};
use serde_json::Value;

use crate::recruitment::domain::{
    ActivityEntry, JobApplication, JobApplicationSubmission, NewJobApplication, NewTalentRecruit,
    RecordId, RecordKind, TalentProfileSubmission, TalentRecruit,
};
use crate::recruitment::ledger::{AppendOutcome, LedgerError, LedgerRow, SubmissionLedger};
use crate::recruitment::repository::{RecruitRepository, RepositoryError};
use crate::recruitment::session::{SessionStore, SignInProfile};
use crate::recruitment::storage::{
    DownloadedObject, DriveFile, DriveGateway, DriveOperationError, DriveUpload, ObjectStore,
    StorageError, StoredObject, StoredObjectEntry,
};
use crate::recruitment::{recruitment_router, RecruitmentService, RecruitmentState, UploadPolicy};

pub(super) const ADMIN_NAME: &str = "hr-lead";
pub(super) const BRIDGE_SECRET: &str = "bridge-secret";
pub(super) const BOUNDARY: &str = "juprecruit-test-boundary";

pub(super) fn talent_submission() -> TalentProfileSubmission {
    TalentProfileSubmission {
        name: "Ada Lovelace".to_string(),
        expertise: vec!["AI & Machine Learning".to_string(), "Other".to_string()],
        other_expertise: "Compilers".to_string(),
        experience: "5-10 years".to_string(),
        interests: vec!["Research".to_string()],
        talents: "Analytical engines".to_string(),
        languages: vec!["English".to_string(), "French".to_string()],
        timezone: "UTC".to_string(),
        description: "Writes the first programs".to_string(),
        email: "ada@example.com".to_string(),
        discord: "ada".to_string(),
        twitter: "@ada".to_string(),
        linkedin: "https://linkedin.com/in/ada".to_string(),
        previous_work_links: vec!["https://ada.dev".to_string()],
        ..TalentProfileSubmission::default()
    }
}

pub(super) fn job_submission() -> JobApplicationSubmission {
    JobApplicationSubmission {
        name: "Grace Hopper".to_string(),
        contact: "grace@example.com".to_string(),
        message: "I would like to help".to_string(),
        workgroup: "Core".to_string(),
        position: "Rust Engineer".to_string(),
    }
}

pub(super) fn stored_recruit(id: &str, name: &str, hour: u32) -> TalentRecruit {
    NewTalentRecruit {
        name: name.to_string(),
        expertise: Vec::new(),
        experience: "2-5 years".to_string(),
        interests: Vec::new(),
        talents: String::new(),
        languages: vec!["English".to_string()],
        timezone: "UTC+1".to_string(),
        description: String::new(),
        email: String::new(),
        discord: String::new(),
        twitter: String::new(),
        linkedin: String::new(),
        logged_username: name.to_lowercase(),
        previous_work_links: Vec::new(),
    }
    .into_record(
        RecordId::from(id),
        Utc.with_ymd_and_hms(2024, 5, 1, hour, 0, 0).unwrap(),
    )
}

pub(super) fn stored_application(id: &str, position: &str, hour: u32) -> JobApplication {
    NewJobApplication {
        name: "Applicant".to_string(),
        contact: "applicant@example.com".to_string(),
        message: "Hello".to_string(),
        workgroup: "Core".to_string(),
        position: position.to_string(),
        username: "applicant".to_string(),
    }
    .into_record(
        RecordId::from(id),
        Utc.with_ymd_and_hms(2024, 5, 1, hour, 0, 0).unwrap(),
    )
}

#[derive(Default)]
pub(super) struct MemoryRepository {
    next_id: AtomicU64,
    pub(super) talent: Mutex<Vec<TalentRecruit>>,
    pub(super) applications: Mutex<Vec<JobApplication>>,
}

impl MemoryRepository {
    pub(super) fn seed_talent(&self, recruit: TalentRecruit) {
        self.talent
            .lock()
            .expect("repository mutex poisoned")
            .push(recruit);
    }

    pub(super) fn seed_application(&self, application: JobApplication) {
        self.applications
            .lock()
            .expect("repository mutex poisoned")
            .push(application);
    }

    pub(super) fn talent(&self) -> Vec<TalentRecruit> {
        self.talent.lock().expect("repository mutex poisoned").clone()
    }

    pub(super) fn applications(&self) -> Vec<JobApplication> {
        self.applications
            .lock()
            .expect("repository mutex poisoned")
            .clone()
    }

    fn next_id(&self) -> RecordId {
        RecordId((self.next_id.fetch_add(1, Ordering::SeqCst) + 1).to_string())
    }
}

#[async_trait]
impl RecruitRepository for MemoryRepository {
    async fn insert_talent(
        &self,
        recruit: NewTalentRecruit,
    ) -> Result<TalentRecruit, RepositoryError> {
        let record = recruit.into_record(self.next_id(), Utc::now());
        self.seed_talent(record.clone());
        Ok(record)
    }

    async fn list_talent(&self) -> Result<Vec<TalentRecruit>, RepositoryError> {
        Ok(self.talent())
    }

    async fn count_talent(&self) -> Result<u64, RepositoryError> {
        Ok(self.talent().len() as u64)
    }

    async fn delete_talent(&self, id: &RecordId) -> Result<(), RepositoryError> {
        self.talent
            .lock()
            .expect("repository mutex poisoned")
            .retain(|recruit| &recruit.id != id);
        Ok(())
    }

    async fn recent_talent(&self, limit: usize) -> Result<Vec<ActivityEntry>, RepositoryError> {
        let mut recruits = self.talent();
        recruits.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(recruits
            .into_iter()
            .take(limit)
            .map(|recruit| ActivityEntry {
                kind: RecordKind::TalentRecruit,
                name: recruit.name,
                username: recruit.logged_username,
                created_at: recruit.created_at,
            })
            .collect())
    }

    async fn insert_application(
        &self,
        application: NewJobApplication,
    ) -> Result<JobApplication, RepositoryError> {
        let record = application.into_record(self.next_id(), Utc::now());
        self.seed_application(record.clone());
        Ok(record)
    }

    async fn list_applications(&self) -> Result<Vec<JobApplication>, RepositoryError> {
        Ok(self.applications())
    }

    async fn count_applications(&self) -> Result<u64, RepositoryError> {
        Ok(self.applications().len() as u64)
    }

    async fn delete_application(&self, id: &RecordId) -> Result<(), RepositoryError> {
        self.applications
            .lock()
            .expect("repository mutex poisoned")
            .retain(|application| &application.id != id);
        Ok(())
    }

    async fn recent_applications(
        &self,
        limit: usize,
    ) -> Result<Vec<ActivityEntry>, RepositoryError> {
        let mut applications = self.applications();
        applications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(applications
            .into_iter()
            .take(limit)
            .map(|application| ActivityEntry {
                kind: RecordKind::JobApplication,
                name: application.name,
                username: application.username,
                created_at: application.created_at,
            })
            .collect())
    }
}

pub(super) struct UnavailableRepository;

#[async_trait]
impl RecruitRepository for UnavailableRepository {
    async fn insert_talent(
        &self,
        _recruit: NewTalentRecruit,
    ) -> Result<TalentRecruit, RepositoryError> {
        Err(offline())
    }

    async fn list_talent(&self) -> Result<Vec<TalentRecruit>, RepositoryError> {
        Err(offline())
    }

    async fn count_talent(&self) -> Result<u64, RepositoryError> {
        Err(offline())
    }

    async fn delete_talent(&self, _id: &RecordId) -> Result<(), RepositoryError> {
        Err(offline())
    }

    async fn recent_talent(&self, _limit: usize) -> Result<Vec<ActivityEntry>, RepositoryError> {
        Err(offline())
    }

    async fn insert_application(
        &self,
        _application: NewJobApplication,
    ) -> Result<JobApplication, RepositoryError> {
        Err(offline())
    }

    async fn list_applications(&self) -> Result<Vec<JobApplication>, RepositoryError> {
        Err(offline())
    }

    async fn count_applications(&self) -> Result<u64, RepositoryError> {
        Err(offline())
    }

    async fn delete_application(&self, _id: &RecordId) -> Result<(), RepositoryError> {
        Err(offline())
    }

    async fn recent_applications(
        &self,
        _limit: usize,
    ) -> Result<Vec<ActivityEntry>, RepositoryError> {
        Err(offline())
    }
}

fn offline() -> RepositoryError {
    RepositoryError::Unavailable("database offline".to_string())
}

#[derive(Default)]
pub(super) struct RecordingLedger {
    talent: Mutex<Vec<LedgerRow>>,
    applications: Mutex<Vec<LedgerRow>>,
}

impl RecordingLedger {
    pub(super) fn talent_rows(&self) -> Vec<LedgerRow> {
        self.talent.lock().expect("ledger mutex poisoned").clone()
    }

    pub(super) fn application_rows(&self) -> Vec<LedgerRow> {
        self.applications
            .lock()
            .expect("ledger mutex poisoned")
            .clone()
    }
}

#[async_trait]
impl SubmissionLedger for RecordingLedger {
    async fn append_talent(&self, row: LedgerRow) -> Result<AppendOutcome, LedgerError> {
        let mut guard = self.talent.lock().expect("ledger mutex poisoned");
        guard.push(row);
        Ok(AppendOutcome {
            updated_range: format!("Sheet1!A{0}:M{0}", guard.len() + 1),
        })
    }

    async fn append_job_application(&self, row: LedgerRow) -> Result<AppendOutcome, LedgerError> {
        let mut guard = self.applications.lock().expect("ledger mutex poisoned");
        guard.push(row);
        Ok(AppendOutcome {
            updated_range: format!("JobSheet!A{0}:H{0}", guard.len() + 1),
        })
    }
}

pub(super) struct RateLimitedLedger;

#[async_trait]
impl SubmissionLedger for RateLimitedLedger {
    async fn append_talent(&self, _row: LedgerRow) -> Result<AppendOutcome, LedgerError> {
        Err(LedgerError::RateLimited)
    }

    async fn append_job_application(&self, _row: LedgerRow) -> Result<AppendOutcome, LedgerError> {
        Err(LedgerError::RateLimited)
    }
}

#[derive(Default)]
pub(super) struct MemoryBucket {
    objects: Mutex<BTreeMap<String, (Vec<u8>, String)>>,
}

impl MemoryBucket {
    pub(super) fn paths(&self) -> Vec<String> {
        self.objects
            .lock()
            .expect("bucket mutex poisoned")
            .keys()
            .cloned()
            .collect()
    }

    pub(super) fn put(&self, path: &str, bytes: &[u8], content_type: &str) {
        self.objects
            .lock()
            .expect("bucket mutex poisoned")
            .insert(path.to_string(), (bytes.to_vec(), content_type.to_string()));
    }
}

#[async_trait]
impl ObjectStore for MemoryBucket {
    async fn upload(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<StoredObject, StorageError> {
        self.put(path, &bytes, content_type);
        Ok(StoredObject {
            key: format!("juprecruit/{path}"),
            path: path.to_string(),
        })
    }

    async fn list(&self, folder: &str) -> Result<Vec<StoredObjectEntry>, StorageError> {
        let prefix = format!("{folder}/");
        let guard = self.objects.lock().expect("bucket mutex poisoned");
        Ok(guard
            .iter()
            .filter_map(|(path, (bytes, content_type))| {
                path.strip_prefix(&prefix).map(|name| StoredObjectEntry {
                    name: name.to_string(),
                    mime_type: Some(content_type.clone()),
                    size: Some(bytes.len() as u64),
                    updated_at: None,
                })
            })
            .collect())
    }

    async fn download(&self, path: &str) -> Result<DownloadedObject, StorageError> {
        let guard = self.objects.lock().expect("bucket mutex poisoned");
        let (bytes, content_type) = guard.get(path).ok_or(StorageError::NotFound)?;
        Ok(DownloadedObject {
            bytes: bytes.clone(),
            content_type: Some(content_type.clone()),
        })
    }

    async fn remove(&self, path: &str) -> Result<(), StorageError> {
        self.objects
            .lock()
            .expect("bucket mutex poisoned")
            .remove(path)
            .map(|_| ())
            .ok_or(StorageError::NotFound)
    }
}

#[derive(Debug, Default)]
pub(super) struct MemoryDrive {
    uploads: Mutex<Vec<DriveUpload>>,
}

impl MemoryDrive {
    pub(super) fn uploads(&self) -> Vec<DriveUpload> {
        self.uploads.lock().expect("drive mutex poisoned").clone()
    }
}

#[async_trait]
impl DriveGateway for MemoryDrive {
    async fn upload_file(&self, upload: DriveUpload) -> Result<DriveFile, DriveOperationError> {
        let mut guard = self.uploads.lock().expect("drive mutex poisoned");
        let file = DriveFile {
            file_id: format!("drive-{}", guard.len() + 1),
            name: upload.name.clone(),
            mime_type: Some(upload.mime_type.clone()),
        };
        guard.push(upload);
        Ok(file)
    }
}

pub(super) struct Harness {
    pub(super) service: Arc<RecruitmentService>,
    pub(super) repository: Arc<MemoryRepository>,
    pub(super) ledger: Arc<RecordingLedger>,
    pub(super) bucket: Arc<MemoryBucket>,
    pub(super) drive: Arc<MemoryDrive>,
    pub(super) sessions: Arc<SessionStore>,
}

impl Harness {
    pub(super) fn new() -> Self {
        Self::with_policy(upload_policy())
    }

    pub(super) fn with_policy(policy: UploadPolicy) -> Self {
        let repository = Arc::new(MemoryRepository::default());
        let ledger = Arc::new(RecordingLedger::default());
        let bucket = Arc::new(MemoryBucket::default());
        let drive = Arc::new(MemoryDrive::default());
        let service = Arc::new(RecruitmentService::new(
            repository.clone(),
            ledger.clone(),
            bucket.clone(),
            drive.clone(),
            policy,
        ));

        Self {
            service,
            repository,
            ledger,
            bucket,
            drive,
            sessions: Arc::new(session_store()),
        }
    }

    pub(super) fn router(&self) -> axum::Router {
        recruitment_router(
            RecruitmentState::new(self.service.clone(), self.sessions.clone())
                .with_bridge_secret(BRIDGE_SECRET),
        )
    }

    pub(super) fn admin_token(&self) -> String {
        self.token_for(ADMIN_NAME, None)
    }

    pub(super) fn visitor_token(&self) -> String {
        self.token_for("visitor", Some("https://cdn.discordapp.com/avatars/1/a.png"))
    }

    pub(super) fn token_for(&self, name: &str, image: Option<&str>) -> String {
        self.sessions
            .issue(SignInProfile {
                name: name.to_string(),
                image: image.map(str::to_string),
                provider: None,
            })
            .expect("session issued")
            .token
    }
}

pub(super) fn upload_policy() -> UploadPolicy {
    UploadPolicy {
        max_bytes: 1024,
        talent_drive_folder: Some("talent-folder".to_string()),
        jobs_drive_folder: Some("jobs-folder".to_string()),
    }
}

pub(super) fn session_store() -> SessionStore {
    SessionStore::new(vec![ADMIN_NAME.to_string()], Duration::hours(1))
}

pub(super) fn service_with(
    repository: Arc<dyn RecruitRepository>,
    ledger: Arc<dyn SubmissionLedger>,
) -> Arc<RecruitmentService> {
    Arc::new(RecruitmentService::new(
        repository,
        ledger,
        Arc::new(MemoryBucket::default()),
        Arc::new(MemoryDrive::default()),
        upload_policy(),
    ))
}

pub(super) fn json_request(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder
        .body(Body::from(serde_json::to_vec(&body).expect("json body")))
        .expect("request builds")
}

pub(super) fn empty_request(method: &str, uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::COOKIE, format!("juprecruit_session={token}"));
    }
    builder.body(Body::empty()).expect("request builds")
}

/// Hand-built multipart body with an optional `positionName` field and an optional file part.
pub(super) fn multipart_request(
    uri: &str,
    token: Option<&str>,
    position: Option<&str>,
    file: Option<(&str, &str, &[u8])>,
) -> Request<Body> {
    let mut body = Vec::new();
    if let Some(position) = position {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"positionName\"\r\n\r\n{position}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some((file_name, content_type, bytes)) = file {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        );
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body)).expect("request builds")
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

pub(super) async fn read_body(response: Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body")
        .to_vec()
}
