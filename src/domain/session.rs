use std::sync::{Arc, RwLock};

use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{BookingError, Result};

const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn validate(&self) -> Result<()> {
        validate_email(&self.email)?;
        if self.password.is_empty() {
            return Err(BookingError::InvalidParams {
                reason: "password is required".into(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl Registration {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(BookingError::InvalidParams {
                reason: "name is required".into(),
            });
        }
        validate_email(&self.email)?;
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(BookingError::InvalidParams {
                reason: format!("password must be at least {MIN_PASSWORD_LEN} characters"),
            });
        }
        Ok(())
    }
}

/// Accepts anything shaped like `local@domain.tld` with no whitespace.
fn validate_email(email: &str) -> Result<()> {
    let email = email.trim();
    if email.is_empty() {
        return Err(BookingError::InvalidParams {
            reason: "email is required".into(),
        });
    }
    let valid = !email.contains(char::is_whitespace)
        && email.split_once('@').is_some_and(|(local, domain)| {
            !local.is_empty()
                && domain
                    .rsplit_once('.')
                    .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty())
        });
    if valid {
        Ok(())
    } else {
        Err(BookingError::InvalidParams {
            reason: format!("email '{email}' is invalid"),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id", alias = "id", default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
}

/// Response of `POST /users/login` and `POST /users/register`.
///
/// Some deployments nest the user under `user`, others flatten its fields next to
/// the token; both are accepted.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    #[serde(default)]
    pub user: Option<User>,
    #[serde(rename = "_id", alias = "id", default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl AuthResponse {
    /// `fallback_email` fills in the address the user typed when the server omits it.
    pub fn into_session(self, fallback_email: &str) -> Session {
        let user = self.user.unwrap_or_else(|| User {
            id: self.id.unwrap_or_default(),
            name: self.name.unwrap_or_default(),
            email: self.email.unwrap_or_else(|| fallback_email.to_string()),
        });
        Session::new(self.token, user)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub user: User,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn new(token: String, user: User) -> Self {
        let expires_at = token_expiry(&token);
        Self {
            token,
            user,
            expires_at,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|exp| exp <= now)
    }
}

/// Read the `exp` claim of a JWT. Opaque tokens yield `None`.
pub fn token_expiry(token: &str) -> Option<DateTime<Utc>> {
    let mut parts = token.split('.');
    let (_header, payload, _sig) = (parts.next()?, parts.next()?, parts.next()?);
    let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .ok()?;
    let claims: serde_json::Value = serde_json::from_slice(&bytes).ok()?;
    let exp = claims.get("exp")?.as_i64()?;
    DateTime::from_timestamp(exp, 0)
}

/// The signed-in user, shared by everything that acts on their behalf.
///
/// Started at login or registration and cleared at logout.
#[derive(Clone, Default)]
pub struct SessionContext {
    inner: Arc<RwLock<Option<Session>>>,
}

impl SessionContext {
    pub fn start(&self, session: Session) {
        tracing::info!(user = %session.user.email, "Session started");
        match self.inner.write() {
            Ok(mut guard) => *guard = Some(session),
            Err(_) => tracing::error!("Session lock poisoned, session not stored"),
        }
    }

    pub fn clear(&self) {
        if let Ok(mut guard) = self.inner.write()
            && guard.take().is_some()
        {
            tracing::info!("Session cleared");
        }
    }

    pub fn current(&self) -> Option<Session> {
        self.inner.read().ok().and_then(|guard| guard.clone())
    }

    /// The current session if it can still authenticate a request.
    pub fn active(&self, now: DateTime<Utc>) -> Result<Session> {
        match self.current() {
            None => Err(BookingError::Unauthorized {
                reason: "sign in to continue".into(),
            }),
            Some(session) if session.is_expired(now) => Err(BookingError::Unauthorized {
                reason: "your session has expired, sign in again".into(),
            }),
            Some(session) => Ok(session),
        }
    }
}

impl std::fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionContext")
            .field("signed_in", &self.current().is_some())
            .finish()
    }
}
