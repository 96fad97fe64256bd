use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Bucket folder holding resumes attached to talent profiles.
pub const TALENT_RESUME_FOLDER: &str = "talentresume";
/// Bucket folder holding resumes attached to job applications.
pub const WORKGROUP_RESUME_FOLDER: &str = "workgroupresume";
pub const RESUME_FOLDERS: [&str; 2] = [TALENT_RESUME_FOLDER, WORKGROUP_RESUME_FOLDER];

/// File received in the `file` field of a multipart upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    /// Browsers occasionally omit the part content type; guess from the file name instead.
    pub fn new(file_name: String, content_type: Option<String>, bytes: Vec<u8>) -> Self {
        let content_type = content_type
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| {
                mime_guess::from_path(&file_name)
                    .first_or_octet_stream()
                    .essence_str()
                    .to_string()
            });
        Self {
            file_name,
            content_type,
            bytes,
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredObject {
    /// Bucket-qualified key reported by the store (`bucket/folder/name`).
    pub key: String,
    /// Path inside the bucket (`folder/name`).
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredObjectEntry {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedObject {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

/// Object storage bucket used for resumes.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn upload(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<StoredObject, StorageError>;
    async fn list(&self, folder: &str) -> Result<Vec<StoredObjectEntry>, StorageError>;
    async fn download(&self, path: &str) -> Result<DownloadedObject, StorageError>;
    async fn remove(&self, path: &str) -> Result<(), StorageError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("object not found")]
    NotFound,
    #[error("storage rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Request to place a file inside a Drive folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriveUpload {
    pub name: String,
    pub mime_type: String,
    pub parent_folder_id: Option<String>,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriveFile {
    pub file_id: String,
    pub name: String,
    pub mime_type: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum DriveOperationError {
    #[error("drive operation failed: {0}")]
    Backend(String),
    #[error("drive is not configured")]
    Unconfigured,
}

#[async_trait]
pub trait DriveGateway: Send + Sync + std::fmt::Debug {
    async fn upload_file(&self, upload: DriveUpload) -> Result<DriveFile, DriveOperationError>;
}

/// `talentresume/{username}.{millis}.{ext}`; `ext` is everything after the last dot of the
/// original name, or the whole name when there is none.
pub fn talent_resume_path(username: &str, original_name: &str, timestamp_millis: i64) -> String {
    let extension = original_name.rsplit('.').next().unwrap_or(original_name);
    let username = name_segment(username);
    let extension = name_segment(extension);
    format!("{TALENT_RESUME_FOLDER}/{username}.{timestamp_millis}.{extension}")
}

/// `workgroupresume/{position}_{username}_{millis}.{subtype}` with the MIME subtype as extension.
pub fn workgroup_resume_path(
    position: &str,
    username: &str,
    content_type: &str,
    timestamp_millis: i64,
) -> String {
    let subtype = content_type
        .split_once('/')
        .map(|(_, subtype)| subtype)
        .unwrap_or(content_type);
    let subtype = name_segment(subtype.split(';').next().unwrap_or(subtype).trim());
    let position = name_segment(position);
    let username = name_segment(username);
    format!("{WORKGROUP_RESUME_FOLDER}/{position}_{username}_{timestamp_millis}.{subtype}")
}

/// Caller-supplied object name part with separators and dot-only components flattened to `_`,
/// so the object always lands directly inside its resume folder.
fn name_segment(value: &str) -> String {
    value
        .split(['/', '\\'])
        .map(|part| {
            if !part.is_empty() && part.chars().all(|c| c == '.') {
                "_"
            } else {
                part
            }
        })
        .collect::<Vec<_>>()
        .join("_")
}

/// Drive file name for a job resume.
pub fn job_resume_drive_name(position: &str, username: &str) -> String {
    format!("{position}_{username}")
}

/// Validate a folder name requested by the HR file browser.
pub fn resolve_resume_folder(folder: &str) -> Option<&'static str> {
    let folder = folder.trim().trim_matches('/');
    RESUME_FOLDERS.into_iter().find(|known| *known == folder)
}

/// Validate an object path requested by the HR file browser: `<known folder>/<file name>`.
pub fn resolve_resume_path(path: &str) -> Option<String> {
    let (folder, name) = path.trim().split_once('/')?;
    let folder = resolve_resume_folder(folder)?;
    let name = name.trim();
    if name.is_empty() || name.contains('/') || name.contains('\\') || name == ".." || name == "." {
        return None;
    }
    Some(format!("{folder}/{name}"))
}

/// Final path segment, used for download file names.
pub fn file_name_of(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}
