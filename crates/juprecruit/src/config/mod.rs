use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

/// Default upload ceiling shared by every resume endpoint (5 MiB).
pub const DEFAULT_UPLOAD_MAX_BYTES: usize = 5 * 1024 * 1024;
const DEFAULT_SESSION_TTL_HOURS: u32 = 720;
/// Upper bound for `SESSION_TTL_HOURS` (ten years).
pub const MAX_SESSION_TTL_HOURS: u32 = 87_600;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }

    pub fn is_production(self) -> bool {
        matches!(self, Self::Production)
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub supabase: Option<SupabaseConfig>,
    pub google: Option<GoogleConfig>,
    pub auth: AuthConfig,
    pub uploads: UploadConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let supabase = SupabaseConfig::from_env();
        let google = GoogleConfig::from_env();

        if environment.is_production() {
            if supabase.is_none() {
                return Err(ConfigError::Missing("SUPABASE_URL/SUPABASE_SERVICE_KEY"));
            }
            if google.is_none() {
                return Err(ConfigError::Missing(
                    "GOOGLE_SHEETS_CLIENT_EMAIL/GOOGLE_SHEETS_PRIVATE_KEY/SPREADSHEET_ID",
                ));
            }
        }

        let session_ttl_hours = parse_number("SESSION_TTL_HOURS", DEFAULT_SESSION_TTL_HOURS)?;
        if session_ttl_hours == 0 {
            return Err(ConfigError::InvalidNumber("SESSION_TTL_HOURS"));
        }
        if session_ttl_hours > MAX_SESSION_TTL_HOURS {
            return Err(ConfigError::OutOfRange {
                key: "SESSION_TTL_HOURS",
                max: u64::from(MAX_SESSION_TTL_HOURS),
            });
        }
        let max_bytes = parse_number("UPLOAD_MAX_BYTES", DEFAULT_UPLOAD_MAX_BYTES)?;

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            supabase,
            google,
            auth: AuthConfig {
                admin_usernames: split_list(&env::var("ADMIN_USERNAMES").unwrap_or_default()),
                bridge_secret: non_empty_var("AUTH_BRIDGE_SECRET"),
                session_ttl_hours,
            },
            uploads: UploadConfig {
                max_bytes,
                talent_drive_folder: non_empty_var("DRIVE_TALENT_FOLDER_ID"),
                jobs_drive_folder: non_empty_var("DRIVE_JOBS_FOLDER_ID"),
            },
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Connection settings for the Supabase table store and storage bucket.
#[derive(Clone)]
pub struct SupabaseConfig {
    pub url: String,
    pub service_key: String,
    pub bucket: String,
}

impl SupabaseConfig {
    fn from_env() -> Option<Self> {
        let url = non_empty_var("SUPABASE_URL")?;
        let service_key = non_empty_var("SUPABASE_SERVICE_KEY")?;
        let bucket = non_empty_var("SUPABASE_BUCKET").unwrap_or_else(|| "juprecruit".to_string());
        Some(Self {
            url: url.trim_end_matches('/').to_string(),
            service_key,
            bucket,
        })
    }
}

impl fmt::Debug for SupabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SupabaseConfig")
            .field("url", &self.url)
            .field("bucket", &self.bucket)
            .finish_non_exhaustive()
    }
}

/// Google service account plus the spreadsheet targets of the submission ledger.
#[derive(Clone)]
pub struct GoogleConfig {
    pub client_email: String,
    pub private_key: String,
    pub talent_sheet: SheetTarget,
    pub jobs_sheet: SheetTarget,
}

impl GoogleConfig {
    fn from_env() -> Option<Self> {
        let client_email = non_empty_var("GOOGLE_SHEETS_CLIENT_EMAIL")?;
        let private_key = normalize_private_key(&non_empty_var("GOOGLE_SHEETS_PRIVATE_KEY")?);
        let spreadsheet_id = non_empty_var("SPREADSHEET_ID")?;
        let jobs_spreadsheet_id =
            non_empty_var("JOBS_SPREADSHEET_ID").unwrap_or_else(|| spreadsheet_id.clone());

        Some(Self {
            client_email,
            private_key,
            talent_sheet: SheetTarget {
                spreadsheet_id,
                title: non_empty_var("TALENT_SHEET_TITLE").unwrap_or_else(|| "Sheet1".to_string()),
            },
            jobs_sheet: SheetTarget {
                spreadsheet_id: jobs_spreadsheet_id,
                title: non_empty_var("JOBS_SHEET_TITLE").unwrap_or_else(|| "JobSheet".to_string()),
            },
        })
    }
}

impl fmt::Debug for GoogleConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GoogleConfig")
            .field("client_email", &self.client_email)
            .field("talent_sheet", &self.talent_sheet)
            .field("jobs_sheet", &self.jobs_sheet)
            .finish_non_exhaustive()
    }
}

/// A spreadsheet tab rows are appended to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetTarget {
    pub spreadsheet_id: String,
    pub title: String,
}

/// Session and admin settings.
#[derive(Clone)]
pub struct AuthConfig {
    pub admin_usernames: Vec<String>,
    pub bridge_secret: Option<String>,
    pub session_ttl_hours: u32,
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("admin_usernames", &self.admin_usernames)
            .field("bridge_secret", &self.bridge_secret.as_ref().map(|_| "<redacted>"))
            .field("session_ttl_hours", &self.session_ttl_hours)
            .finish()
    }
}

/// Resume upload limits and Drive destinations.
#[derive(Debug, Clone)]
pub struct UploadConfig {
    pub max_bytes: usize,
    pub talent_drive_folder: Option<String>,
    pub jobs_drive_folder: Option<String>,
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_number<T: std::str::FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match non_empty_var(key) {
        Some(raw) => raw.parse::<T>().map_err(|_| ConfigError::InvalidNumber(key)),
        None => Ok(default),
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect()
}

/// Private keys pasted into env files usually carry literal `\n` sequences.
pub fn normalize_private_key(raw: &str) -> String {
    raw.replace("\\n", "\n")
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidNumber(&'static str),
    OutOfRange { key: &'static str, max: u64 },
    Missing(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidNumber(key) => write!(f, "{key} must be a positive number"),
            ConfigError::OutOfRange { key, max } => write!(f, "{key} must not exceed {max}"),
            ConfigError::Missing(keys) => write!(f, "{keys} must be set in production"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidNumber(_)
            | ConfigError::OutOfRange { .. }
            | ConfigError::Missing(_) => None,
        }
    }
}
