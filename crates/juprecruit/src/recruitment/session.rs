use std::collections::HashMap;
use std::sync::RwLock;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Name of the cookie carrying the session token.
pub const SESSION_COOKIE: &str = "juprecruit_session";

/// Signed-in user as exposed to handlers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(rename = "isAdmin")]
    pub is_admin: bool,
}

impl SessionUser {
    pub fn signed_in_with_twitter(&self) -> bool {
        self.image_contains("twimg.com")
    }

    pub fn signed_in_with_discord(&self) -> bool {
        self.image_contains("discord")
    }

    fn image_contains(&self, needle: &str) -> bool {
        self.image
            .as_deref()
            .map(|image| image.contains(needle))
            .unwrap_or(false)
    }
}

/// Profile handed over by the OAuth sign-in bridge.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SignInProfile {
    pub name: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub provider: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssuedSession {
    pub token: String,
    pub user: SessionUser,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("sign-in profile is missing a user name")]
    MissingName,
    #[error("unable to generate session token: {0}")]
    Entropy(String),
}

#[derive(Debug, Clone)]
struct SessionEntry {
    user: SessionUser,
    expires_at: DateTime<Utc>,
}

/// In-process session table keyed by opaque random tokens.
#[derive(Debug)]
pub struct SessionStore {
    admins: Vec<String>,
    ttl: Duration,
    sessions: RwLock<HashMap<String, SessionEntry>>,
}

impl SessionStore {
    pub fn new(admin_usernames: Vec<String>, ttl: Duration) -> Self {
        Self {
            admins: admin_usernames
                .into_iter()
                .map(|name| name.to_lowercase())
                .collect(),
            ttl,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn is_admin_name(&self, name: &str) -> bool {
        let name = name.trim().to_lowercase();
        self.admins.iter().any(|admin| *admin == name)
    }

    pub fn issue(&self, profile: SignInProfile) -> Result<IssuedSession, SessionError> {
        self.issue_at(profile, Utc::now())
    }

    pub fn issue_at(
        &self,
        profile: SignInProfile,
        now: DateTime<Utc>,
    ) -> Result<IssuedSession, SessionError> {
        let name = profile.name.trim().to_string();
        if name.is_empty() {
            return Err(SessionError::MissingName);
        }

        let user = SessionUser {
            is_admin: self.is_admin_name(&name),
            name,
            image: profile.image.filter(|image| !image.is_empty()),
            provider: profile.provider,
        };
        let token = generate_token()?;
        let expires_at = now + self.ttl;

        let mut guard = self.sessions.write().expect("session lock poisoned");
        // Drop expired entries whose tokens were never presented again.
        guard.retain(|_, entry| entry.expires_at > now);
        guard.insert(
            token.clone(),
            SessionEntry {
                user: user.clone(),
                expires_at,
            },
        );

        Ok(IssuedSession {
            token,
            user,
            expires_at,
        })
    }

    pub fn resolve(&self, token: &str) -> Option<SessionUser> {
        self.resolve_at(token, Utc::now())
    }

    pub fn resolve_at(&self, token: &str, now: DateTime<Utc>) -> Option<SessionUser> {
        {
            let guard = self.sessions.read().expect("session lock poisoned");
            match guard.get(token) {
                Some(entry) if entry.expires_at > now => return Some(entry.user.clone()),
                Some(_) => {}
                None => return None,
            }
        }

        self.sessions
            .write()
            .expect("session lock poisoned")
            .remove(token);
        None
    }

    pub fn revoke(&self, token: &str) -> bool {
        self.sessions
            .write()
            .expect("session lock poisoned")
            .remove(token)
            .is_some()
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Number of sessions currently held, expired ones included until the next sign-in.
    pub fn len(&self) -> usize {
        self.sessions.read().expect("session lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn generate_token() -> Result<String, SessionError> {
    let mut bytes = [0u8; 32];
    getrandom::fill(&mut bytes).map_err(|err| SessionError::Entropy(err.to_string()))?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

/// Pull the session token from the cookie header or a bearer authorization header.
pub fn token_from_headers(headers: &axum::http::HeaderMap) -> Option<String> {
    let from_cookie = headers
        .get_all(axum::http::header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty());

    from_cookie.or_else(|| {
        headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty())
    })
}
