use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    async_trait,
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::JsonRejection,
        DefaultBodyLimit, FromRequestParts, Multipart, Query, Request, State,
    },
    http::{header, request::Parts, HeaderMap, HeaderValue, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, warn};

use super::domain::{
    JobApplicationSubmission, RecordId, SubmissionEnvelope, TalentProfileSubmission,
    ValidationError,
};
use super::ledger::LedgerError;
use super::service::{RecruitmentService, ServiceError};
use super::session::{token_from_headers, SessionStore, SessionUser, SignInProfile, SESSION_COOKIE};
use super::stats::ListQuery;
use super::storage::{StorageError, UploadedFile};

/// Where non-admin callers of HR routes are sent.
pub const UNAUTHORIZED_PATH: &str = "/unauthorized";
/// Header the sign-in bridge uses to prove it may mint sessions.
pub const BRIDGE_SECRET_HEADER: &str = "x-auth-bridge-secret";
/// Room for multipart boundaries and the text fields sent next to the file.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Shared state handed to every recruitment handler.
#[derive(Clone)]
pub struct RecruitmentState {
    pub service: Arc<RecruitmentService>,
    pub sessions: Arc<SessionStore>,
    pub bridge_secret: Option<Arc<str>>,
    pub secure_cookies: bool,
}

impl RecruitmentState {
    pub fn new(service: Arc<RecruitmentService>, sessions: Arc<SessionStore>) -> Self {
        Self {
            service,
            sessions,
            bridge_secret: None,
            secure_cookies: false,
        }
    }

    pub fn with_bridge_secret(mut self, secret: impl Into<Arc<str>>) -> Self {
        self.bridge_secret = Some(secret.into());
        self
    }

    pub fn with_secure_cookies(mut self, secure: bool) -> Self {
        self.secure_cookies = secure;
        self
    }

    fn session_for(&self, headers: &HeaderMap) -> Option<SessionUser> {
        token_from_headers(headers).and_then(|token| self.sessions.resolve(&token))
    }
}

/// The caller's session, if any. Never rejects.
#[derive(Debug, Clone)]
pub struct CurrentSession(pub Option<SessionUser>);

#[async_trait]
impl FromRequestParts<RecruitmentState> for CurrentSession {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &RecruitmentState,
    ) -> Result<Self, Self::Rejection> {
        Ok(Self(state.session_for(&parts.headers)))
    }
}

/// Router builder exposing the public forms, uploads, sessions, and the guarded HR API.
pub fn recruitment_router(state: RecruitmentState) -> Router {
    let body_limit = state.service.upload_policy().max_bytes + MULTIPART_OVERHEAD;

    let uploads = Router::new()
        .route(
            "/api/uploadToDrive",
            post(upload_to_drive_handler).fallback(method_not_allowed),
        )
        .route(
            "/api/uploadToDriveJobs",
            post(upload_to_drive_jobs_handler).fallback(method_not_allowed),
        )
        .route(
            "/api/uploadToSupabase",
            post(upload_to_bucket_handler).fallback(method_not_allowed),
        )
        .route(
            "/api/uploadtoSupabaseJobs",
            post(upload_to_bucket_jobs_handler).fallback(method_not_allowed),
        )
        .layer(DefaultBodyLimit::max(body_limit));

    let admin = Router::new()
        .route(
            "/api/getTalentRecruits",
            get(list_talent_handler).fallback(method_not_allowed),
        )
        .route(
            "/api/getTalentRecruitsCount",
            get(count_talent_handler).fallback(method_not_allowed),
        )
        .route(
            "/api/getJobApplications",
            get(list_applications_handler).fallback(method_not_allowed),
        )
        .route(
            "/api/deleteTalentRecruit",
            axum::routing::delete(delete_talent_handler).fallback(method_not_allowed),
        )
        .route(
            "/api/deleteJobApplication",
            axum::routing::delete(delete_application_handler).fallback(method_not_allowed),
        )
        .route(
            "/api/hr/dashboard",
            get(dashboard_handler).fallback(method_not_allowed),
        )
        .route(
            "/api/hr/files",
            get(list_files_handler)
                .delete(remove_file_handler)
                .fallback(method_not_allowed),
        )
        .route(
            "/api/hr/files/download",
            get(download_file_handler).fallback(method_not_allowed),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), require_admin));

    Router::new()
        .route(
            "/api/submitForm",
            post(submit_talent_handler).fallback(method_not_allowed),
        )
        .route(
            "/api/submitFormJobs",
            post(submit_job_handler).fallback(method_not_allowed),
        )
        .route(
            "/api/auth/session",
            get(current_session_handler)
                .post(create_session_handler)
                .delete(end_session_handler)
                .fallback(method_not_allowed),
        )
        .route(
            UNAUTHORIZED_PATH,
            get(unauthorized_handler).fallback(method_not_allowed),
        )
        .merge(uploads)
        .merge(admin)
        .with_state(state)
}

/// Lets admins through; everyone else is redirected to the unauthorized page.
pub(crate) async fn require_admin(
    State(state): State<RecruitmentState>,
    request: Request,
    next: Next,
) -> Response {
    match state.session_for(request.headers()) {
        Some(user) if user.is_admin => next.run(request).await,
        user => {
            warn!(
                path = %request.uri().path(),
                user = user.as_ref().map(|u| u.name.as_str()).unwrap_or("anonymous"),
                "non-admin request redirected"
            );
            Redirect::temporary(UNAUTHORIZED_PATH).into_response()
        }
    }
}

pub(crate) async fn method_not_allowed() -> Response {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(json!({ "error": "Method not allowed" })),
    )
        .into_response()
}

pub(crate) async fn unauthorized_handler() -> Response {
    (StatusCode::FORBIDDEN, Json(json!({ "error": "Unauthorized" }))).into_response()
}

pub(crate) async fn submit_talent_handler(
    State(state): State<RecruitmentState>,
    CurrentSession(session): CurrentSession,
    payload: Result<Json<SubmissionEnvelope<TalentProfileSubmission>>, JsonRejection>,
) -> Response {
    let submission = match envelope_data(payload) {
        Ok(submission) => submission,
        Err(err) => return submission_error_response(err.into()),
    };

    match state
        .service
        .submit_talent(submission, session.as_ref())
        .await
    {
        Ok(receipt) => submission_success_response(receipt.id, receipt.updated_range),
        Err(err) => submission_error_response(err),
    }
}

pub(crate) async fn submit_job_handler(
    State(state): State<RecruitmentState>,
    CurrentSession(session): CurrentSession,
    payload: Result<Json<SubmissionEnvelope<JobApplicationSubmission>>, JsonRejection>,
) -> Response {
    let submission = match envelope_data(payload) {
        Ok(submission) => submission,
        Err(err) => return submission_error_response(err.into()),
    };

    match state
        .service
        .submit_job_application(submission, session.as_ref())
        .await
    {
        Ok(receipt) => submission_success_response(receipt.id, receipt.updated_range),
        Err(err) => submission_error_response(err),
    }
}

fn envelope_data<T>(
    payload: Result<Json<SubmissionEnvelope<T>>, JsonRejection>,
) -> Result<T, ValidationError> {
    match payload {
        Ok(Json(envelope)) => envelope.data.ok_or(ValidationError::MissingPayload),
        Err(rejection) => {
            warn!(error = %rejection, "submission body rejected");
            Err(ValidationError::MissingPayload)
        }
    }
}

fn submission_success_response(id: RecordId, updated_range: String) -> Response {
    let payload = json!({
        "status": "success",
        "message": "Data appended successfully!",
        "updatedRange": updated_range,
        "id": id,
    });
    (StatusCode::OK, Json(payload)).into_response()
}

fn submission_error_response(err: ServiceError) -> Response {
    match err {
        ServiceError::Validation(error) => {
            let payload = json!({
                "status": "error",
                "message": "Missing required data fields",
                "fields": error.fields(),
            });
            (StatusCode::BAD_REQUEST, Json(payload)).into_response()
        }
        ServiceError::Ledger(LedgerError::RateLimited) => {
            warn!("spreadsheet rate limit hit during submission");
            let payload = json!({
                "status": "error",
                "message": "Rate limit exceeded, please try again later",
            });
            (StatusCode::TOO_MANY_REQUESTS, Json(payload)).into_response()
        }
        other => {
            error!(error = %other, "error writing submission");
            let payload = json!({
                "status": "error",
                "error": other.to_string(),
            });
            (StatusCode::INTERNAL_SERVER_ERROR, Json(payload)).into_response()
        }
    }
}

/// Fields the upload forms send.
#[derive(Debug, Default)]
struct UploadForm {
    file: Option<UploadedFile>,
    position_name: String,
}

async fn read_upload_form(
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<UploadForm, Response> {
    let mut form = UploadForm::default();
    let Ok(mut multipart) = multipart else {
        return Ok(form);
    };

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(err) => return Err(multipart_error_response(err)),
        };

        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await.map_err(multipart_error_response)?;
                form.file = Some(UploadedFile::new(file_name, content_type, bytes.to_vec()));
            }
            Some("positionName") => {
                form.position_name = field.text().await.map_err(multipart_error_response)?;
            }
            _ => {}
        }
    }

    Ok(form)
}

fn multipart_error_response(err: MultipartError) -> Response {
    let status = err.status();
    warn!(error = %err, %status, "multipart body rejected");
    let message = if status == StatusCode::PAYLOAD_TOO_LARGE {
        "File exceeds the upload size limit".to_string()
    } else {
        err.body_text()
    };
    (status, Json(json!({ "error": message }))).into_response()
}

fn upload_error_response(err: ServiceError, failure_message: &'static str) -> Response {
    match err {
        ServiceError::MissingFile => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "No file uploaded" })),
        )
            .into_response(),
        ServiceError::FileTooLarge { .. } => (
            StatusCode::PAYLOAD_TOO_LARGE,
            Json(json!({ "error": err.to_string() })),
        )
            .into_response(),
        ServiceError::Unauthorized(message) => {
            (StatusCode::FORBIDDEN, Json(json!({ "error": message }))).into_response()
        }
        other => {
            error!(error = %other, "error uploading file");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": failure_message })),
            )
                .into_response()
        }
    }
}

pub(crate) async fn upload_to_drive_handler(
    State(state): State<RecruitmentState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let form = match read_upload_form(multipart).await {
        Ok(form) => form,
        Err(response) => return response,
    };

    match state.service.upload_talent_resume_to_drive(form.file).await {
        Ok(file) => (
            StatusCode::OK,
            Json(json!({ "message": "File uploaded successfully", "fileId": file.file_id })),
        )
            .into_response(),
        Err(err) => upload_error_response(err, "Failed to upload file"),
    }
}

pub(crate) async fn upload_to_drive_jobs_handler(
    State(state): State<RecruitmentState>,
    CurrentSession(session): CurrentSession,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let form = match read_upload_form(multipart).await {
        Ok(form) => form,
        Err(response) => return response,
    };

    match state
        .service
        .upload_job_resume_to_drive(form.file, &form.position_name, session.as_ref())
        .await
    {
        Ok(file) => (
            StatusCode::OK,
            Json(json!({ "message": "File uploaded successfully", "fileId": file.file_id })),
        )
            .into_response(),
        Err(err) => upload_error_response(err, "Failed to upload file"),
    }
}

pub(crate) async fn upload_to_bucket_handler(
    State(state): State<RecruitmentState>,
    CurrentSession(session): CurrentSession,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let form = match read_upload_form(multipart).await {
        Ok(form) => form,
        Err(response) => return response,
    };

    match state
        .service
        .upload_talent_resume(form.file, session.as_ref())
        .await
    {
        Ok(stored) => (
            StatusCode::OK,
            Json(json!({ "message": "File uploaded successfully", "fileUrl": stored.key })),
        )
            .into_response(),
        Err(err) => upload_error_response(err, "Failed to upload file"),
    }
}

pub(crate) async fn upload_to_bucket_jobs_handler(
    State(state): State<RecruitmentState>,
    CurrentSession(session): CurrentSession,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let form = match read_upload_form(multipart).await {
        Ok(form) => form,
        Err(response) => return response,
    };

    match state
        .service
        .upload_workgroup_resume(form.file, &form.position_name, session.as_ref())
        .await
    {
        Ok(stored) => (
            StatusCode::OK,
            Json(json!({
                "message": "File uploaded to Supabase Storage successfully",
                "fileKey": stored.path,
            })),
        )
            .into_response(),
        Err(err) => upload_error_response(err, "Failed to upload file to Supabase Storage."),
    }
}

fn session_cookie(token: &str, max_age_seconds: i64, secure: bool) -> Option<HeaderValue> {
    let secure = if secure { "; Secure" } else { "" };
    HeaderValue::from_str(&format!(
        "{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age_seconds}{secure}"
    ))
    .ok()
}

pub(crate) async fn create_session_handler(
    State(state): State<RecruitmentState>,
    headers: HeaderMap,
    payload: Result<Json<SignInProfile>, JsonRejection>,
) -> Response {
    let presented = headers
        .get(BRIDGE_SECRET_HEADER)
        .and_then(|value| value.to_str().ok());
    let authorized = match (&state.bridge_secret, presented) {
        (Some(expected), Some(presented)) => expected.as_ref() == presented,
        _ => false,
    };
    if !authorized {
        warn!("session creation refused: bad bridge secret");
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "Unauthorized access" })),
        )
            .into_response();
    }

    let Ok(Json(profile)) = payload else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Missing sign-in profile" })),
        )
            .into_response();
    };

    match state.sessions.issue(profile) {
        Ok(issued) => {
            let mut response = (StatusCode::CREATED, Json(&issued)).into_response();
            if let Some(cookie) = session_cookie(
                &issued.token,
                state.sessions.ttl().num_seconds(),
                state.secure_cookies,
            ) {
                response.headers_mut().insert(header::SET_COOKIE, cookie);
            }
            response
        }
        Err(err) => {
            (StatusCode::BAD_REQUEST, Json(json!({ "error": err.to_string() }))).into_response()
        }
    }
}

pub(crate) async fn current_session_handler(CurrentSession(session): CurrentSession) -> Response {
    match session {
        Some(user) => (StatusCode::OK, Json(json!({ "user": user }))).into_response(),
        None => (StatusCode::OK, Json(json!({}))).into_response(),
    }
}

pub(crate) async fn end_session_handler(
    State(state): State<RecruitmentState>,
    headers: HeaderMap,
) -> Response {
    if let Some(token) = token_from_headers(&headers) {
        state.sessions.revoke(&token);
    }

    let mut response = (StatusCode::OK, Json(json!({ "message": "Signed out" }))).into_response();
    if let Some(cookie) = session_cookie("", 0, state.secure_cookies) {
        response.headers_mut().insert(header::SET_COOKIE, cookie);
    }
    response
}

fn admin_error_response(err: ServiceError, message: &'static str) -> Response {
    match err {
        ServiceError::InvalidPath(path) => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": format!("Unknown resume path '{path}'") })),
        )
            .into_response(),
        ServiceError::Storage(StorageError::NotFound) => {
            (StatusCode::NOT_FOUND, Json(json!({ "error": "File not found" }))).into_response()
        }
        other => {
            error!(error = %other, "{message}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": message })),
            )
                .into_response()
        }
    }
}

pub(crate) async fn list_talent_handler(
    State(state): State<RecruitmentState>,
    Query(query): Query<ListQuery>,
) -> Response {
    match state.service.talent_recruits(&query).await {
        Ok(recruits) => (StatusCode::OK, Json(recruits)).into_response(),
        Err(err) => admin_error_response(
            err,
            "An error occurred while fetching talent recruits",
        ),
    }
}

pub(crate) async fn count_talent_handler(State(state): State<RecruitmentState>) -> Response {
    match state.service.talent_recruit_count().await {
        Ok(total) => (StatusCode::OK, Json(json!({ "total_recruits": total }))).into_response(),
        Err(err) => admin_error_response(
            err,
            "An error occurred while fetching talent recruits count",
        ),
    }
}

pub(crate) async fn list_applications_handler(
    State(state): State<RecruitmentState>,
    Query(query): Query<ListQuery>,
) -> Response {
    match state.service.job_applications(&query).await {
        Ok(listing) => (StatusCode::OK, Json(listing)).into_response(),
        Err(err) => admin_error_response(
            err,
            "An error occurred while fetching job applications",
        ),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct IdQuery {
    #[serde(default)]
    id: Option<String>,
}

impl IdQuery {
    fn record_id(&self) -> Option<RecordId> {
        self.id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(RecordId::from)
    }
}

pub(crate) async fn delete_talent_handler(
    State(state): State<RecruitmentState>,
    Query(query): Query<IdQuery>,
) -> Response {
    let Some(id) = query.record_id() else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Missing talent recruit ID" })),
        )
            .into_response();
    };

    match state.service.delete_talent_recruit(&id).await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({ "message": "Talent recruit deleted successfully" })),
        )
            .into_response(),
        Err(err) => admin_error_response(
            err,
            "An error occurred while deleting the talent recruit",
        ),
    }
}

pub(crate) async fn delete_application_handler(
    State(state): State<RecruitmentState>,
    Query(query): Query<IdQuery>,
) -> Response {
    let Some(id) = query.record_id() else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Missing job application ID" })),
        )
            .into_response();
    };

    match state.service.delete_job_application(&id).await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({ "message": "Job application deleted successfully" })),
        )
            .into_response(),
        Err(err) => admin_error_response(
            err,
            "An error occurred while deleting the job application",
        ),
    }
}

pub(crate) async fn dashboard_handler(State(state): State<RecruitmentState>) -> Response {
    match state.service.dashboard().await {
        Ok(snapshot) => (StatusCode::OK, Json(snapshot)).into_response(),
        Err(err) => admin_error_response(err, "An error occurred while building the dashboard"),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct FolderQuery {
    #[serde(default)]
    folder: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PathQuery {
    #[serde(default)]
    path: String,
}

pub(crate) async fn list_files_handler(
    State(state): State<RecruitmentState>,
    Query(query): Query<FolderQuery>,
) -> Response {
    match state.service.resume_files(&query.folder).await {
        Ok(entries) => (StatusCode::OK, Json(entries)).into_response(),
        Err(err) => admin_error_response(err, "An error occurred while listing files"),
    }
}

pub(crate) async fn download_file_handler(
    State(state): State<RecruitmentState>,
    Query(query): Query<PathQuery>,
) -> Response {
    match state.service.download_resume(&query.path).await {
        Ok(download) => {
            let content_type = download.object.content_type.unwrap_or_else(|| {
                mime_guess::from_path(&download.file_name)
                    .first_or_octet_stream()
                    .essence_str()
                    .to_string()
            });
            let disposition = format!(
                "attachment; filename=\"{}\"",
                download.file_name.replace('"', "")
            );
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, content_type),
                    (header::CONTENT_DISPOSITION, disposition),
                ],
                download.object.bytes,
            )
                .into_response()
        }
        Err(err) => admin_error_response(err, "An error occurred while downloading the file"),
    }
}

pub(crate) async fn remove_file_handler(
    State(state): State<RecruitmentState>,
    Query(query): Query<PathQuery>,
) -> Response {
    match state.service.remove_resume(&query.path).await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({ "message": "File deleted successfully" })),
        )
            .into_response(),
        Err(err) => admin_error_response(err, "An error occurred while deleting the file"),
    }
}
