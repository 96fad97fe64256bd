//! Process-local backends used when Supabase or Google credentials are not configured.

use async_trait::async_trait;
use chrono::Utc;
use juprecruit::recruitment::{
    ActivityEntry, AppendOutcome, DownloadedObject, DriveFile, DriveGateway, DriveOperationError,
    DriveUpload, JobApplication, LedgerError, LedgerRow, NewJobApplication, NewTalentRecruit,
    ObjectStore, RecordId, RecordKind, RecruitRepository, RepositoryError, StorageError,
    StoredObject, StoredObjectEntry, SubmissionLedger, TalentRecruit, JOB_HEADERS, TALENT_HEADERS,
};
use juprecruit::recruitment::ledger::column_letter;
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::debug;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default)]
pub(crate) struct InMemoryRecruitRepository {
    next_id: AtomicU64,
    talent: Mutex<Vec<TalentRecruit>>,
    applications: Mutex<Vec<JobApplication>>,
}

impl InMemoryRecruitRepository {
    fn allocate_id(&self) -> RecordId {
        RecordId((self.next_id.fetch_add(1, Ordering::Relaxed) + 1).to_string())
    }
}

fn newest_first<T, F>(records: &[T], created: F, limit: usize) -> Vec<&T>
where
    F: Fn(&T) -> chrono::DateTime<Utc>,
{
    let mut sorted: Vec<&T> = records.iter().collect();
    sorted.sort_by_key(|record| std::cmp::Reverse(created(record)));
    sorted.truncate(limit);
    sorted
}

#[async_trait]
impl RecruitRepository for InMemoryRecruitRepository {
    async fn insert_talent(
        &self,
        recruit: NewTalentRecruit,
    ) -> Result<TalentRecruit, RepositoryError> {
        let record = recruit.into_record(self.allocate_id(), Utc::now());
        let mut guard = self.talent.lock().expect("repository mutex poisoned");
        guard.push(record.clone());
        Ok(record)
    }

    async fn list_talent(&self) -> Result<Vec<TalentRecruit>, RepositoryError> {
        Ok(self.talent.lock().expect("repository mutex poisoned").clone())
    }

    async fn count_talent(&self) -> Result<u64, RepositoryError> {
        Ok(self.talent.lock().expect("repository mutex poisoned").len() as u64)
    }

    async fn delete_talent(&self, id: &RecordId) -> Result<(), RepositoryError> {
        let mut guard = self.talent.lock().expect("repository mutex poisoned");
        guard.retain(|record| &record.id != id);
        Ok(())
    }

    async fn recent_talent(&self, limit: usize) -> Result<Vec<ActivityEntry>, RepositoryError> {
        let guard = self.talent.lock().expect("repository mutex poisoned");
        Ok(newest_first(guard.as_slice(), |record| record.created_at, limit)
            .into_iter()
            .map(|record| ActivityEntry {
                kind: RecordKind::TalentRecruit,
                name: record.name.clone(),
                username: record.logged_username.clone(),
                created_at: record.created_at,
            })
            .collect())
    }

    async fn insert_application(
        &self,
        application: NewJobApplication,
    ) -> Result<JobApplication, RepositoryError> {
        let record = application.into_record(self.allocate_id(), Utc::now());
        let mut guard = self.applications.lock().expect("repository mutex poisoned");
        guard.push(record.clone());
        Ok(record)
    }

    async fn list_applications(&self) -> Result<Vec<JobApplication>, RepositoryError> {
        Ok(self
            .applications
            .lock()
            .expect("repository mutex poisoned")
            .clone())
    }

    async fn count_applications(&self) -> Result<u64, RepositoryError> {
        Ok(self
            .applications
            .lock()
            .expect("repository mutex poisoned")
            .len() as u64)
    }

    async fn delete_application(&self, id: &RecordId) -> Result<(), RepositoryError> {
        let mut guard = self.applications.lock().expect("repository mutex poisoned");
        guard.retain(|record| &record.id != id);
        Ok(())
    }

    async fn recent_applications(
        &self,
        limit: usize,
    ) -> Result<Vec<ActivityEntry>, RepositoryError> {
        let guard = self.applications.lock().expect("repository mutex poisoned");
        Ok(newest_first(guard.as_slice(), |record| record.created_at, limit)
            .into_iter()
            .map(|record| ActivityEntry {
                kind: RecordKind::JobApplication,
                name: record.name.clone(),
                username: record.username.clone(),
                created_at: record.created_at,
            })
            .collect())
    }
}

/// Keeps ledger rows in memory, numbering them the way a sheet with a header row would.
#[derive(Default)]
pub(crate) struct InMemoryLedger {
    talent: Mutex<Vec<LedgerRow>>,
    jobs: Mutex<Vec<LedgerRow>>,
}

impl InMemoryLedger {
    fn push(rows: &Mutex<Vec<LedgerRow>>, title: &str, width: usize, row: LedgerRow) -> String {
        let mut guard = rows.lock().expect("ledger mutex poisoned");
        guard.push(row);
        let line = guard.len() + 1;
        format!("{title}!A{line}:{}{line}", column_letter(width))
    }

    #[cfg(test)]
    pub(crate) fn talent_rows(&self) -> Vec<LedgerRow> {
        self.talent.lock().expect("ledger mutex poisoned").clone()
    }
}

#[async_trait]
impl SubmissionLedger for InMemoryLedger {
    async fn append_talent(&self, row: LedgerRow) -> Result<AppendOutcome, LedgerError> {
        let updated_range = Self::push(&self.talent, "Sheet1", TALENT_HEADERS.len(), row);
        debug!(%updated_range, "talent row kept in memory");
        Ok(AppendOutcome { updated_range })
    }

    async fn append_job_application(&self, row: LedgerRow) -> Result<AppendOutcome, LedgerError> {
        let updated_range = Self::push(&self.jobs, "JobSheet", JOB_HEADERS.len(), row);
        debug!(%updated_range, "job application row kept in memory");
        Ok(AppendOutcome { updated_range })
    }
}

#[derive(Debug, Clone)]
struct MemoryObject {
    bytes: Vec<u8>,
    content_type: String,
    updated_at: String,
}

pub(crate) struct InMemoryObjectStore {
    bucket: String,
    objects: Mutex<BTreeMap<String, MemoryObject>>,
}

impl InMemoryObjectStore {
    pub(crate) fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            objects: Mutex::new(BTreeMap::new()),
        }
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn upload(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<StoredObject, StorageError> {
        let mut guard = self.objects.lock().expect("object store mutex poisoned");
        guard.insert(
            path.to_string(),
            MemoryObject {
                bytes,
                content_type: content_type.to_string(),
                updated_at: Utc::now().to_rfc3339(),
            },
        );
        Ok(StoredObject {
            key: format!("{}/{path}", self.bucket),
            path: path.to_string(),
        })
    }

    async fn list(&self, folder: &str) -> Result<Vec<StoredObjectEntry>, StorageError> {
        let prefix = format!("{}/", folder.trim_end_matches('/'));
        let guard = self.objects.lock().expect("object store mutex poisoned");
        Ok(guard
            .iter()
            .filter_map(|(path, object)| {
                let name = path.strip_prefix(&prefix)?;
                (!name.contains('/')).then(|| StoredObjectEntry {
                    name: name.to_string(),
                    mime_type: Some(object.content_type.clone()),
                    size: Some(object.bytes.len() as u64),
                    updated_at: Some(object.updated_at.clone()),
                })
            })
            .collect())
    }

    async fn download(&self, path: &str) -> Result<DownloadedObject, StorageError> {
        let guard = self.objects.lock().expect("object store mutex poisoned");
        let object = guard.get(path).ok_or(StorageError::NotFound)?;
        Ok(DownloadedObject {
            bytes: object.bytes.clone(),
            content_type: Some(object.content_type.clone()),
        })
    }

    async fn remove(&self, path: &str) -> Result<(), StorageError> {
        let mut guard = self.objects.lock().expect("object store mutex poisoned");
        guard.remove(path).map(|_| ()).ok_or(StorageError::NotFound)
    }
}

/// Accepts Drive uploads without sending them anywhere.
#[derive(Debug, Default)]
pub(crate) struct DiscardingDrive {
    uploads: AtomicU64,
}

#[async_trait]
impl DriveGateway for DiscardingDrive {
    async fn upload_file(&self, upload: DriveUpload) -> Result<DriveFile, DriveOperationError> {
        let sequence = self.uploads.fetch_add(1, Ordering::Relaxed) + 1;
        debug!(name = %upload.name, bytes = upload.bytes.len(), "drive upload discarded");
        Ok(DriveFile {
            file_id: format!("local-{sequence}"),
            name: upload.name,
            mime_type: Some(upload.mime_type),
        })
    }
}
