use crate::cli::ServeArgs;
use crate::infra::{
    AppState, DiscardingDrive, InMemoryLedger, InMemoryObjectStore, InMemoryRecruitRepository,
};
use crate::routes::with_recruitment_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use juprecruit::config::{AppConfig, AuthConfig};
use juprecruit::error::AppError;
use juprecruit::integrations::{
    service_account_authenticator, GoogleDriveClient, GoogleSheetsLedger, GoogleTokenSource,
    SupabaseClient,
};
use juprecruit::recruitment::{
    DriveGateway, ObjectStore, RecruitRepository, RecruitmentService, RecruitmentState,
    SessionStore, SubmissionLedger, UploadPolicy,
};
use juprecruit::telemetry;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

const LOCAL_BUCKET: &str = "juprecruit";

struct Backends {
    repository: Arc<dyn RecruitRepository>,
    bucket: Arc<dyn ObjectStore>,
    ledger: Arc<dyn SubmissionLedger>,
    drive: Arc<dyn DriveGateway>,
}

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry, config.environment)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let backends = build_backends(&config).await?;
    let service = Arc::new(RecruitmentService::new(
        backends.repository,
        backends.ledger,
        backends.bucket,
        backends.drive,
        UploadPolicy::from(&config.uploads),
    ));
    let state = recruitment_state(service, &config.auth, config.environment.is_production());

    let app = with_recruitment_routes(state)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "recruitment service ready");

    axum::serve(listener, app).await?;
    Ok(())
}

async fn build_backends(config: &AppConfig) -> Result<Backends, AppError> {
    let (repository, bucket): (Arc<dyn RecruitRepository>, Arc<dyn ObjectStore>) =
        match &config.supabase {
            Some(supabase) => {
                let client = Arc::new(SupabaseClient::new(supabase)?);
                info!(bucket = client.bucket(), "using Supabase tables and storage");
                let repository: Arc<dyn RecruitRepository> = client.clone();
                let bucket: Arc<dyn ObjectStore> = client;
                (repository, bucket)
            }
            None => {
                warn!("Supabase is not configured; submissions and resumes are kept in memory");
                let repository: Arc<dyn RecruitRepository> =
                    Arc::new(InMemoryRecruitRepository::default());
                let bucket: Arc<dyn ObjectStore> = Arc::new(InMemoryObjectStore::new(LOCAL_BUCKET));
                (repository, bucket)
            }
        };

    let (ledger, drive): (Arc<dyn SubmissionLedger>, Arc<dyn DriveGateway>) = match &config.google
    {
        Some(google) => {
            let auth = service_account_authenticator(google).await?;
            let ledger = GoogleSheetsLedger::new(
                Arc::new(GoogleTokenSource::new(auth.clone())),
                google.talent_sheet.clone(),
                google.jobs_sheet.clone(),
            )?;
            let drive = GoogleDriveClient::with_native_roots(auth)?;
            info!(
                talent_sheet = %google.talent_sheet.title,
                jobs_sheet = %google.jobs_sheet.title,
                "using Google Sheets ledger and Drive uploads"
            );
            let ledger: Arc<dyn SubmissionLedger> = Arc::new(ledger);
            let drive: Arc<dyn DriveGateway> = Arc::new(drive);
            (ledger, drive)
        }
        None => {
            warn!("Google credentials are not configured; ledger rows and Drive uploads stay local");
            let ledger: Arc<dyn SubmissionLedger> = Arc::new(InMemoryLedger::default());
            let drive: Arc<dyn DriveGateway> = Arc::new(DiscardingDrive::default());
            (ledger, drive)
        }
    };

    Ok(Backends {
        repository,
        bucket,
        ledger,
        drive,
    })
}

pub(crate) fn recruitment_state(
    service: Arc<RecruitmentService>,
    auth: &AuthConfig,
    secure_cookies: bool,
) -> RecruitmentState {
    let sessions = Arc::new(SessionStore::new(
        auth.admin_usernames.clone(),
        chrono::Duration::hours(i64::from(auth.session_ttl_hours)),
    ));
    let state = RecruitmentState::new(service, sessions).with_secure_cookies(secure_cookies);

    match &auth.bridge_secret {
        Some(secret) => state.with_bridge_secret(secret.as_str()),
        None => {
            warn!("AUTH_BRIDGE_SECRET is not set; session creation is disabled");
            state
        }
    }
}
