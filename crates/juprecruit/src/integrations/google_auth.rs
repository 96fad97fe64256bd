use async_trait::async_trait;
use google_drive3::common::GetToken;
use google_drive3::yup_oauth2::{ServiceAccountAuthenticator, ServiceAccountKey};
use serde_json::json;

use super::sheets::AccessTokenSource;
use super::IntegrationError;
use crate::config::GoogleConfig;
use crate::recruitment::ledger::LedgerError;

pub const GOOGLE_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
pub const SPREADSHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";

/// Build the service account authenticator shared by the Drive hub and the Sheets ledger.
///
/// The returned authenticator caches tokens per scope set, so clones are cheap to hand out.
pub async fn service_account_authenticator(
    config: &GoogleConfig,
) -> Result<impl GetToken + Clone + 'static, IntegrationError> {
    let key: ServiceAccountKey = serde_json::from_value(json!({
        "type": "service_account",
        "client_email": config.client_email,
        "private_key": config.private_key,
        "token_uri": GOOGLE_TOKEN_URI,
    }))
    .map_err(|err| IntegrationError::Credentials(err.to_string()))?;

    ServiceAccountAuthenticator::builder(key)
        .build()
        .await
        .map_err(|err| IntegrationError::Credentials(err.to_string()))
}

/// Sheets bearer tokens drawn from a Google authenticator.
pub struct GoogleTokenSource {
    auth: Box<dyn GetToken>,
}

impl GoogleTokenSource {
    pub fn new<A: GetToken + 'static>(auth: A) -> Self {
        Self {
            auth: Box::new(auth),
        }
    }
}

impl std::fmt::Debug for GoogleTokenSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleTokenSource").finish_non_exhaustive()
    }
}

#[async_trait]
impl AccessTokenSource for GoogleTokenSource {
    async fn access_token(&self) -> Result<String, LedgerError> {
        match self.auth.get_token(&[SPREADSHEETS_SCOPE]).await {
            Ok(Some(token)) => Ok(token),
            Ok(None) => Err(LedgerError::Auth(
                "authenticator returned no token".to_string(),
            )),
            Err(err) => Err(LedgerError::Auth(err.to_string())),
        }
    }
}
