//! REST adapter for the hosted backend.
//!
//! Talks to the GoTrue-style auth endpoints and the PostgREST table endpoint
//! of the backend, implementing both [`AuthProvider`] and [`ProfileStore`].
//! Auth events are broadcast to every subscriber the way the backend's own
//! client library does it: `SIGNED_IN` after a password grant, `SIGNED_OUT`
//! after sign-out, `TOKEN_REFRESHED` after a refresh grant.

use std::fmt;

use async_trait::async_trait;
use futures::stream;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use tokio::sync::{broadcast, RwLock};

use super::session_file::SessionFile;
use crate::config::ClientConfig;
use crate::error::{ProviderError, StoreError};
use crate::profile::ProfileRecord;
use crate::session::{AuthEvent, AuthEventKind, AuthSubscription, Session};
use crate::traits::{AuthProvider, ProfileStore};

const AUTH_TOKEN_PATH: &str = "/auth/v1/token";
const AUTH_LOGOUT_PATH: &str = "/auth/v1/logout";
const USERS_TABLE_PATH: &str = "/rest/v1/usuarios";

/// User record joined with its tenant (`empresas`), inner join.
const PROFILE_SELECT: &str = "nome,papel,empresa_id,empresas!inner(nome,plano)";

const EVENT_CHANNEL_CAPACITY: usize = 16;

/// Response from the token endpoint (password and refresh grants).
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    expires_at: Option<i64>,
    user: TokenUser,
}

#[derive(Debug, Deserialize)]
struct TokenUser {
    id: String,
    #[serde(default)]
    email: Option<String>,
}

impl TokenResponse {
    fn into_session(self, fallback_email: &str) -> Session {
        let expires_at = self
            .expires_at
            .or_else(|| self.expires_in.map(|secs| chrono::Utc::now().timestamp() + secs));
        let email = self
            .user
            .email
            .unwrap_or_else(|| fallback_email.to_string());

        Session::new(self.user.id, email).with_tokens(
            self.access_token,
            self.refresh_token,
            expires_at,
        )
    }
}

/// Error body; different backend versions use different keys.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl ErrorBody {
    fn into_message(self) -> Option<String> {
        self.error_description
            .or(self.msg)
            .or(self.message)
            .or(self.error)
    }
}

/// Row of the users table with the embedded tenant.
#[derive(Debug, Deserialize)]
struct UserRow {
    #[serde(default)]
    nome: Option<String>,
    #[serde(default)]
    papel: Option<String>,
    #[serde(default)]
    empresa_id: Option<String>,
    #[serde(default)]
    empresas: Option<TenantRow>,
}

#[derive(Debug, Deserialize)]
struct TenantRow {
    #[serde(default)]
    nome: Option<String>,
    #[serde(default)]
    plano: Option<String>,
}

impl From<UserRow> for ProfileRecord {
    fn from(row: UserRow) -> Self {
        let (tenant_name, plan) = match row.empresas {
            Some(tenant) => (tenant.nome, tenant.plano),
            None => (None, None),
        };
        ProfileRecord {
            display_name: row.nome,
            role: row.papel,
            tenant_id: row.empresa_id,
            tenant_name,
            plan,
        }
    }
}

fn error_message(body: &str) -> Option<String> {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(ErrorBody::into_message)
}

fn grant_error(status: StatusCode, body: &str) -> ProviderError {
    let message = error_message(body).unwrap_or_else(|| {
        status
            .canonical_reason()
            .unwrap_or("Unknown error")
            .to_string()
    });

    match status.as_u16() {
        400 | 401 | 403 | 422 => ProviderError::InvalidCredentials(message),
        code => ProviderError::Server {
            status: code,
            message,
        },
    }
}

fn transport_error(err: reqwest::Error) -> ProviderError {
    ProviderError::Transport(err.to_string())
}

/// Client for the hosted backend.
pub struct RestClient {
    base_url: String,
    anon_key: String,
    client: Client,
    session: RwLock<Option<Session>>,
    events: broadcast::Sender<AuthEvent>,
    session_file: Option<SessionFile>,
}

impl RestClient {
    pub fn new(config: ClientConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(transport_error)?;
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Ok(Self {
            base_url: config.base_url,
            anon_key: config.anon_key,
            client,
            session: RwLock::new(None),
            events,
            session_file: config.session_file.map(SessionFile::new),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Live event subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.events.receiver_count()
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn with_api_key(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.header("apikey", &self.anon_key)
    }

    fn emit(&self, kind: AuthEventKind, session: Option<Session>) {
        // Nobody listening is fine.
        let _ = self.events.send(AuthEvent::new(kind, session));
    }

    async fn set_session(&self, session: Option<Session>) {
        *self.session.write().await = session.clone();

        if let Some(file) = &self.session_file {
            let result = match &session {
                Some(session) => file.save(session),
                None => file.clear(),
            };
            if let Err(err) = result {
                tracing::warn!(path = %file.path().display(), error = %err, "could not persist session");
            }
        }
    }

    async fn stored_session(&self) -> Option<Session> {
        let cached = self.session.read().await.clone();
        match cached {
            Some(session) => Some(session),
            None => self.session_file.as_ref().and_then(SessionFile::load),
        }
    }

    async fn token_grant(
        &self,
        grant_type: &str,
        body: serde_json::Value,
        fallback_email: &str,
    ) -> Result<Session, ProviderError> {
        let response = self
            .with_api_key(self.client.post(self.endpoint(AUTH_TOKEN_PATH)))
            .query(&[("grant_type", grant_type)])
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        let text = response.text().await.map_err(transport_error)?;
        if !status.is_success() {
            return Err(grant_error(status, &text));
        }

        let token: TokenResponse = serde_json::from_str(&text)
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;
        Ok(token.into_session(fallback_email))
    }

    async fn refresh(&self, session: &Session) -> Result<Session, ProviderError> {
        let refresh_token = session
            .refresh_token
            .as_deref()
            .ok_or(ProviderError::SessionExpired)?;

        self.token_grant(
            "refresh_token",
            serde_json::json!({ "refresh_token": refresh_token }),
            &session.email,
        )
        .await
    }

    async fn logout(&self, session: &Session) -> Result<(), ProviderError> {
        let response = self
            .with_api_key(self.client.post(self.endpoint(AUTH_LOGOUT_PATH)))
            .bearer_auth(&session.access_token)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        // An already-revoked token means we are signed out anyway.
        if status.is_success() || status == StatusCode::UNAUTHORIZED {
            return Ok(());
        }

        let text = response.text().await.unwrap_or_default();
        Err(ProviderError::Server {
            status: status.as_u16(),
            message: error_message(&text).unwrap_or(text),
        })
    }
}

impl fmt::Debug for RestClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestClient")
            .field("base_url", &self.base_url)
            .field("session_file", &self.session_file)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl AuthProvider for RestClient {
    fn subscribe(&self) -> AuthSubscription {
        let rx = self.events.subscribe();
        let events = stream::unfold(rx, |mut rx| async move {
            loop {
                match rx.recv().await {
                    Ok(event) => return Some((event, rx)),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "auth event subscriber lagged; events dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            }
        });
        AuthSubscription::new(events)
    }

    async fn current_session(&self) -> Result<Option<Session>, ProviderError> {
        let Some(session) = self.stored_session().await else {
            return Ok(None);
        };

        if !session.is_expired() {
            *self.session.write().await = Some(session.clone());
            return Ok(Some(session));
        }

        tracing::debug!(subject = %session.subject_id, "stored session expired; refreshing");
        match self.refresh(&session).await {
            Ok(refreshed) => {
                self.set_session(Some(refreshed.clone())).await;
                self.emit(AuthEventKind::TokenRefreshed, Some(refreshed.clone()));
                Ok(Some(refreshed))
            }
            Err(ProviderError::InvalidCredentials(_)) | Err(ProviderError::SessionExpired) => {
                tracing::info!(subject = %session.subject_id, "stored session could not be renewed");
                self.set_session(None).await;
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, ProviderError> {
        let session = self
            .token_grant(
                "password",
                serde_json::json!({ "email": email, "password": password }),
                email,
            )
            .await?;

        self.set_session(Some(session.clone())).await;
        self.emit(AuthEventKind::SignedIn, Some(session.clone()));
        Ok(session)
    }

    async fn sign_out(&self) -> Result<(), ProviderError> {
        let result = match self.stored_session().await {
            Some(session) if !session.access_token.is_empty() => self.logout(&session).await,
            _ => Ok(()),
        };

        self.set_session(None).await;
        self.emit(AuthEventKind::SignedOut, None);
        result
    }
}

#[async_trait]
impl ProfileStore for RestClient {
    async fn find_by_subject(&self, session: &Session) -> Result<Option<ProfileRecord>, StoreError> {
        let subject_filter = format!("eq.{}", session.subject_id);
        let mut request = self
            .with_api_key(self.client.get(self.endpoint(USERS_TABLE_PATH)))
            .query(&[
                ("select", PROFILE_SELECT),
                ("auth_user_id", subject_filter.as_str()),
                ("limit", "1"),
            ])
            .header(reqwest::header::ACCEPT, "application/json");
        if !session.access_token.is_empty() {
            request = request.bearer_auth(&session.access_token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(StoreError::Server {
                status: status.as_u16(),
                message: error_message(&text).unwrap_or(text),
            });
        }

        let rows: Vec<UserRow> =
            serde_json::from_str(&text).map_err(|e| StoreError::InvalidResponse(e.to_string()))?;
        Ok(rows.into_iter().next().map(ProfileRecord::from))
    }
}
