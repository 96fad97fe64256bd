//! Supabase PostgREST tables and Storage bucket over plain HTTPS.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{header, Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use super::IntegrationError;
use crate::config::SupabaseConfig;
use crate::recruitment::domain::{
    ActivityEntry, JobApplication, NewJobApplication, NewTalentRecruit, RecordId, RecordKind,
    TalentRecruit,
};
use crate::recruitment::repository::{RecruitRepository, RepositoryError};
use crate::recruitment::storage::{
    DownloadedObject, ObjectStore, StorageError, StoredObject, StoredObjectEntry,
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const LIST_PAGE_SIZE: u32 = 100;
/// Storage creates this marker object inside otherwise empty folders.
const FOLDER_PLACEHOLDER: &str = ".emptyFolderPlaceholder";

/// Service-role client for one Supabase project and bucket.
#[derive(Clone)]
pub struct SupabaseClient {
    http: Client,
    base_url: String,
    service_key: String,
    bucket: String,
}

impl fmt::Debug for SupabaseClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SupabaseClient")
            .field("base_url", &self.base_url)
            .field("bucket", &self.bucket)
            .finish_non_exhaustive()
    }
}

impl SupabaseClient {
    pub fn new(config: &SupabaseConfig) -> Result<Self, IntegrationError> {
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self::with_client(http, config))
    }

    pub fn with_client(http: Client, config: &SupabaseConfig) -> Self {
        Self {
            http,
            base_url: config.url.trim_end_matches('/').to_string(),
            service_key: config.service_key.clone(),
            bucket: config.bucket.clone(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
    }

    fn table(&self, method: Method, table: &str) -> RequestBuilder {
        self.authorized(
            self.http
                .request(method, format!("{}/rest/v1/{table}", self.base_url)),
        )
    }

    fn object_url(&self, path: &str) -> String {
        format!(
            "{}/storage/v1/object/{}/{}",
            self.base_url,
            urlencoding::encode(&self.bucket),
            encode_path(path)
        )
    }

    async fn insert_row<T, R>(&self, kind: RecordKind, row: &T) -> Result<R, RepositoryError>
    where
        T: Serialize + Sync,
        R: DeserializeOwned,
    {
        let response = self
            .table(Method::POST, kind.table())
            .header("Prefer", "return=representation")
            .json(row)
            .send()
            .await
            .map_err(repository_unavailable)?;
        let mut rows: Vec<R> = decode_rows(check_table(response).await?).await?;
        rows.pop().ok_or_else(|| {
            RepositoryError::Decode(format!("insert into {} returned no rows", kind.table()))
        })
    }

    async fn select_all<R: DeserializeOwned>(
        &self,
        kind: RecordKind,
    ) -> Result<Vec<R>, RepositoryError> {
        let response = self
            .table(Method::GET, kind.table())
            .query(&[("select", "*")])
            .send()
            .await
            .map_err(repository_unavailable)?;
        decode_rows(check_table(response).await?).await
    }

    async fn count_rows(&self, kind: RecordKind) -> Result<u64, RepositoryError> {
        let response = self
            .table(Method::GET, kind.table())
            .query(&[("select", "id")])
            .header("Prefer", "count=exact")
            .header(header::RANGE, "0-0")
            .send()
            .await
            .map_err(repository_unavailable)?;
        let response = check_table(response).await?;

        let content_range = response
            .headers()
            .get(header::CONTENT_RANGE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();
        parse_content_range(content_range).ok_or_else(|| {
            RepositoryError::Decode(format!(
                "count for {} came back without a total (Content-Range '{content_range}')",
                kind.table()
            ))
        })
    }

    async fn delete_row(&self, kind: RecordKind, id: &RecordId) -> Result<(), RepositoryError> {
        let response = self
            .table(Method::DELETE, kind.table())
            .query(&[("id", format!("eq.{id}"))])
            .send()
            .await
            .map_err(repository_unavailable)?;
        check_table(response).await?;
        debug!(table = kind.table(), %id, "delete acknowledged");
        Ok(())
    }

    async fn recent_rows(
        &self,
        kind: RecordKind,
        limit: usize,
    ) -> Result<Vec<ActivityEntry>, RepositoryError> {
        let columns = match kind {
            RecordKind::TalentRecruit => "name,logged_username,created_at",
            RecordKind::JobApplication => "name,username,created_at",
        };
        let response = self
            .table(Method::GET, kind.table())
            .query(&[
                ("select", columns.to_string()),
                ("order", "created_at.desc".to_string()),
                ("limit", limit.to_string()),
            ])
            .send()
            .await
            .map_err(repository_unavailable)?;
        let rows: Vec<ActivityRow> = decode_rows(check_table(response).await?).await?;
        Ok(rows
            .into_iter()
            .map(|row| ActivityEntry {
                kind,
                name: row.name.unwrap_or_default(),
                username: row.username.unwrap_or_default(),
                created_at: row.created_at,
            })
            .collect())
    }
}

#[derive(Debug, Deserialize)]
struct ActivityRow {
    #[serde(default)]
    name: Option<String>,
    #[serde(default, alias = "logged_username")]
    username: Option<String>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    #[serde(rename = "Key")]
    key: String,
}

#[derive(Debug, Deserialize)]
struct ListedObject {
    name: String,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    updated_at: Option<String>,
    #[serde(default)]
    metadata: Option<ObjectMetadata>,
}

#[derive(Debug, Default, Deserialize)]
struct ObjectMetadata {
    #[serde(default)]
    mimetype: Option<String>,
    #[serde(default)]
    size: Option<u64>,
}

#[async_trait]
impl RecruitRepository for SupabaseClient {
    async fn insert_talent(
        &self,
        recruit: NewTalentRecruit,
    ) -> Result<TalentRecruit, RepositoryError> {
        self.insert_row(RecordKind::TalentRecruit, &recruit).await
    }

    async fn list_talent(&self) -> Result<Vec<TalentRecruit>, RepositoryError> {
        self.select_all(RecordKind::TalentRecruit).await
    }

    async fn count_talent(&self) -> Result<u64, RepositoryError> {
        self.count_rows(RecordKind::TalentRecruit).await
    }

    async fn delete_talent(&self, id: &RecordId) -> Result<(), RepositoryError> {
        self.delete_row(RecordKind::TalentRecruit, id).await
    }

    async fn recent_talent(&self, limit: usize) -> Result<Vec<ActivityEntry>, RepositoryError> {
        self.recent_rows(RecordKind::TalentRecruit, limit).await
    }

    async fn insert_application(
        &self,
        application: NewJobApplication,
    ) -> Result<JobApplication, RepositoryError> {
        self.insert_row(RecordKind::JobApplication, &application)
            .await
    }

    async fn list_applications(&self) -> Result<Vec<JobApplication>, RepositoryError> {
        self.select_all(RecordKind::JobApplication).await
    }

    async fn count_applications(&self) -> Result<u64, RepositoryError> {
        self.count_rows(RecordKind::JobApplication).await
    }

    async fn delete_application(&self, id: &RecordId) -> Result<(), RepositoryError> {
        self.delete_row(RecordKind::JobApplication, id).await
    }

    async fn recent_applications(
        &self,
        limit: usize,
    ) -> Result<Vec<ActivityEntry>, RepositoryError> {
        self.recent_rows(RecordKind::JobApplication, limit).await
    }
}

#[async_trait]
impl ObjectStore for SupabaseClient {
    async fn upload(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<StoredObject, StorageError> {
        let response = self
            .authorized(self.http.post(self.object_url(path)))
            .header(header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await
            .map_err(storage_unavailable)?;
        let uploaded: UploadResponse = check_storage(response)
            .await?
            .json()
            .await
            .map_err(storage_unavailable)?;

        Ok(StoredObject {
            key: uploaded.key,
            path: path.to_string(),
        })
    }

    async fn list(&self, folder: &str) -> Result<Vec<StoredObjectEntry>, StorageError> {
        let url = format!(
            "{}/storage/v1/object/list/{}",
            self.base_url,
            urlencoding::encode(&self.bucket)
        );
        let body = json!({
            "prefix": folder,
            "limit": LIST_PAGE_SIZE,
            "offset": 0,
            "sortBy": { "column": "name", "order": "asc" },
        });
        let response = self
            .authorized(self.http.post(url))
            .json(&body)
            .send()
            .await
            .map_err(storage_unavailable)?;
        let listed: Vec<ListedObject> = check_storage(response)
            .await?
            .json()
            .await
            .map_err(storage_unavailable)?;

        Ok(listed
            .into_iter()
            .filter(|object| object.id.is_some() && object.name != FOLDER_PLACEHOLDER)
            .map(|object| {
                let metadata = object.metadata.unwrap_or_default();
                StoredObjectEntry {
                    name: object.name,
                    mime_type: metadata.mimetype,
                    size: metadata.size,
                    updated_at: object.updated_at,
                }
            })
            .collect())
    }

    async fn download(&self, path: &str) -> Result<DownloadedObject, StorageError> {
        let response = self
            .authorized(self.http.get(self.object_url(path)))
            .send()
            .await
            .map_err(storage_unavailable)?;
        let response = check_storage(response).await?;
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let bytes = response.bytes().await.map_err(storage_unavailable)?;

        Ok(DownloadedObject {
            bytes: bytes.to_vec(),
            content_type,
        })
    }

    async fn remove(&self, path: &str) -> Result<(), StorageError> {
        let url = format!(
            "{}/storage/v1/object/{}",
            self.base_url,
            urlencoding::encode(&self.bucket)
        );
        let response = self
            .authorized(self.http.delete(url))
            .json(&json!({ "prefixes": [path] }))
            .send()
            .await
            .map_err(storage_unavailable)?;
        let removed: Vec<serde_json::Value> = check_storage(response)
            .await?
            .json()
            .await
            .map_err(storage_unavailable)?;

        if removed.is_empty() {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }
}

async fn check_table(response: Response) -> Result<Response, RepositoryError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    Err(RepositoryError::Rejected {
        status: status.as_u16(),
        message,
    })
}

async fn decode_rows<R: DeserializeOwned>(response: Response) -> Result<R, RepositoryError> {
    response
        .json::<R>()
        .await
        .map_err(|err| RepositoryError::Decode(err.to_string()))
}

/// Storage reports missing objects as 404, or as 400 with a `not_found` error body.
async fn check_storage(response: Response) -> Result<Response, StorageError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    let lowered = message.to_ascii_lowercase();
    if status == StatusCode::NOT_FOUND
        || (status == StatusCode::BAD_REQUEST
            && (lowered.contains("not_found") || lowered.contains("not found")))
    {
        return Err(StorageError::NotFound);
    }
    Err(StorageError::Rejected {
        status: status.as_u16(),
        message,
    })
}

fn repository_unavailable(err: reqwest::Error) -> RepositoryError {
    RepositoryError::Unavailable(err.to_string())
}

fn storage_unavailable(err: reqwest::Error) -> StorageError {
    StorageError::Unavailable(err.to_string())
}

/// Total row count from a PostgREST `Content-Range` header (`0-0/42`, `*/0`).
pub fn parse_content_range(value: &str) -> Option<u64> {
    let (_, total) = value.trim().rsplit_once('/')?;
    total.trim().parse().ok()
}

/// Percent-encode each segment of an object path, keeping the separators.
pub fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_range_total_is_read_after_slash() {
        assert_eq!(parse_content_range("0-0/42"), Some(42));
        assert_eq!(parse_content_range("*/0"), Some(0));
        assert_eq!(parse_content_range("0-0/*"), None);
        assert_eq!(parse_content_range(""), None);
    }

    #[test]
    fn object_paths_encode_segments_only() {
        assert_eq!(
            encode_path("workgroupresume/Rust Engineer_ada_1.pdf"),
            "workgroupresume/Rust%20Engineer_ada_1.pdf"
        );
    }
}
