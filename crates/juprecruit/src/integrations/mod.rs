//! Clients for the hosted backends: Supabase tables and storage, Google Sheets, Google Drive.

pub mod drive;
pub mod google_auth;
pub mod sheets;
pub mod supabase;

pub use drive::GoogleDriveClient;
pub use google_auth::{service_account_authenticator, GoogleTokenSource};
pub use sheets::{AccessTokenSource, GoogleSheetsLedger};
pub use supabase::SupabaseClient;

/// Failure while constructing an integration client.
#[derive(Debug, thiserror::Error)]
pub enum IntegrationError {
    #[error("http client error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("google credentials rejected: {0}")]
    Credentials(String),
    #[error("tls setup failed: {0}")]
    Tls(String),
}
