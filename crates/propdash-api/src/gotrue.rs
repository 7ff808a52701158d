//! Email/password identity provider backed by a GoTrue (Supabase auth) REST API.
//!
//! Sessions are persisted in a [`SessionStore`]; an expired session is
//! refreshed with its refresh token on the next `get_session` call.

use std::time::Duration;

use serde::Deserialize;

use crate::endpoints::{self, auth};
use crate::error::{ApiError, UNKNOWN_ERROR};
use crate::session::{Session, SessionProvider, SessionStore, SignUpOutcome};

#[derive(Debug, Clone)]
pub struct GoTrueConfig {
    /// Project URL, e.g. `https://xyz.supabase.co`.
    pub url: String,
    /// Publishable (anon) key sent as the `apikey` header.
    pub anon_key: String,
    pub timeout: Duration,
}

pub struct GoTrueAuth {
    http: reqwest::Client,
    config: GoTrueConfig,
    store: SessionStore,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    expires_at: Option<i64>,
    #[serde(default)]
    user: Option<UserRecord>,
}

#[derive(Debug, Deserialize)]
struct UserRecord {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    email: Option<String>,
}

impl TokenResponse {
    fn into_session(self, now_secs: i64) -> Session {
        let expires_at = self
            .expires_at
            .or_else(|| self.expires_in.map(|secs| now_secs.saturating_add(secs)));
        let (user_id, email) = match self.user {
            Some(u) => (u.id, u.email),
            None => (None, None),
        };
        Session {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at,
            user_id,
            email,
        }
    }
}

/// GoTrue reports errors under several keys depending on the endpoint.
fn auth_error_message(body: &str) -> String {
    if let Ok(serde_json::Value::Object(map)) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["error_description", "msg", "message", "error"] {
            if let Some(serde_json::Value::String(s)) = map.get(key) {
                if !s.is_empty() {
                    return s.clone();
                }
            }
        }
    }
    let body = body.trim();
    if body.is_empty() {
        UNKNOWN_ERROR.to_string()
    } else {
        body.to_string()
    }
}

fn now_secs() -> i64 {
    chrono::Utc::now().timestamp()
}

impl GoTrueAuth {
    pub fn new(config: GoTrueConfig, store: SessionStore) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ApiError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            config,
            store,
        })
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, endpoints::join(&self.config.url, path))
            .header("apikey", &self.config.anon_key)
    }

    async fn token_grant(
        &self,
        grant_type: &str,
        body: serde_json::Value,
    ) -> Result<Session, ApiError> {
        let resp = self
            .request(reqwest::Method::POST, auth::TOKEN)
            .query(&[("grant_type", grant_type)])
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        let text = resp.text().await?;
        if !status.is_success() {
            return Err(ApiError::Auth(auth_error_message(&text)));
        }
        let token: TokenResponse =
            serde_json::from_str(&text).map_err(|e| ApiError::Decode(e.to_string()))?;
        Ok(token.into_session(now_secs()))
    }

    async fn refresh(&self, refresh_token: &str) -> Result<Session, ApiError> {
        self.token_grant(
            "refresh_token",
            serde_json::json!({ "refresh_token": refresh_token }),
        )
        .await
    }
}

#[async_trait::async_trait]
impl SessionProvider for GoTrueAuth {
    async fn get_session(&self) -> Result<Option<Session>, ApiError> {
        let Some(session) = self.store.load()? else {
            return Ok(None);
        };
        if !session.is_expired(now_secs()) {
            return Ok(Some(session));
        }

        let Some(refresh_token) = session.refresh_token.as_deref() else {
            tracing::info!("stored session expired and has no refresh token");
            return Ok(None);
        };
        match self.refresh(refresh_token).await {
            Ok(mut fresh) => {
                if fresh.email.is_none() {
                    fresh.email = session.email.clone();
                }
                self.store.save(&fresh)?;
                tracing::debug!("refreshed expired session");
                Ok(Some(fresh))
            }
            Err(e) => {
                tracing::warn!("session refresh failed: {e}");
                Ok(None)
            }
        }
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, ApiError> {
        let session = self
            .token_grant(
                "password",
                serde_json::json!({ "email": email, "password": password }),
            )
            .await?;
        self.store.save(&session)?;
        tracing::info!("signed in as {email}");
        Ok(session)
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome, ApiError> {
        let resp = self
            .request(reqwest::Method::POST, auth::SIGNUP)
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await?;

        let status = resp.status();
        let text = resp.text().await?;
        if !status.is_success() {
            return Err(ApiError::Auth(auth_error_message(&text)));
        }

        // Auto-confirmed projects return a session; otherwise only the user.
        match serde_json::from_str::<TokenResponse>(&text) {
            Ok(token) => {
                let session = token.into_session(now_secs());
                self.store.save(&session)?;
                Ok(SignUpOutcome::SignedIn(session))
            }
            Err(_) => Ok(SignUpOutcome::ConfirmationRequired {
                email: email.to_string(),
            }),
        }
    }

    async fn sign_out(&self) -> Result<(), ApiError> {
        let Some(session) = self.store.load()? else {
            return Ok(());
        };

        let result = self
            .request(reqwest::Method::POST, auth::LOGOUT)
            .bearer_auth(&session.access_token)
            .send()
            .await;

        // The local session goes away even if the server call fails.
        self.store.clear()?;

        let resp = result?;
        let status = resp.status();
        // An already-revoked token is as good as signed out.
        if status.is_success() || status.as_u16() == 401 {
            Ok(())
        } else {
            let text = resp.text().await.unwrap_or_default();
            Err(ApiError::Auth(auth_error_message(&text)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn auth_for(server: &mockito::ServerGuard, dir: &tempfile::TempDir) -> GoTrueAuth {
        GoTrueAuth::new(
            GoTrueConfig {
                url: server.url(),
                anon_key: "anon".into(),
                timeout: Duration::from_secs(5),
            },
            SessionStore::new(dir.path().join("session.json")),
        )
        .expect("client")
    }

    #[test]
    fn auth_error_message_keys() {
        assert_eq!(
            auth_error_message(r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#),
            "Invalid login credentials"
        );
        assert_eq!(
            auth_error_message(r#"{"code":422,"msg":"Password should be at least 6 characters"}"#),
            "Password should be at least 6 characters"
        );
        assert_eq!(auth_error_message(""), UNKNOWN_ERROR);
    }

    #[test]
    fn token_response_computes_expiry() {
        let token = TokenResponse {
            access_token: "a".into(),
            refresh_token: None,
            expires_in: Some(3600),
            expires_at: None,
            user: None,
        };
        assert_eq!(token.into_session(100).expires_at, Some(3700));
    }

    #[tokio::test]
    async fn sign_in_persists_session() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/auth/v1/token")
            .match_query(mockito::Matcher::UrlEncoded(
                "grant_type".into(),
                "password".into(),
            ))
            .match_header("apikey", "anon")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"access_token":"at-1","refresh_token":"rt-1","expires_in":3600,
                    "user":{"id":"u-1","email":"a@example.com"}}"#,
            )
            .create_async()
            .await;

        let dir = tempfile::tempdir().expect("tempdir");
        let auth = auth_for(&server, &dir);
        let session = auth.sign_in("a@example.com", "pw").await.expect("sign in");
        mock.assert_async().await;

        assert_eq!(session.access_token, "at-1");
        assert_eq!(session.email.as_deref(), Some("a@example.com"));
        let stored = auth.get_session().await.expect("get").expect("stored");
        assert_eq!(stored.access_token, "at-1");
    }

    #[tokio::test]
    async fn sign_in_rejected_is_auth_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/auth/v1/token")
            .match_query(mockito::Matcher::Any)
            .with_status(400)
            .with_body(r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#)
            .create_async()
            .await;

        let dir = tempfile::tempdir().expect("tempdir");
        let auth = auth_for(&server, &dir);
        let err = auth.sign_in("a@example.com", "bad").await.expect_err("rejected");
        assert!(matches!(err, ApiError::Auth(ref m) if m == "Invalid login credentials"));
        assert_eq!(auth.get_session().await.expect("get"), None);
    }

    #[tokio::test]
    async fn expired_session_is_refreshed() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/auth/v1/token")
            .match_query(mockito::Matcher::UrlEncoded(
                "grant_type".into(),
                "refresh_token".into(),
            ))
            .match_body(mockito::Matcher::PartialJson(
                serde_json::json!({"refresh_token": "rt-old"}),
            ))
            .with_status(200)
            .with_body(r#"{"access_token":"at-new","refresh_token":"rt-new","expires_in":3600}"#)
            .create_async()
            .await;

        let dir = tempfile::tempdir().expect("tempdir");
        let auth = auth_for(&server, &dir);
        auth.store
            .save(&Session {
                access_token: "at-old".into(),
                refresh_token: Some("rt-old".into()),
                expires_at: Some(1),
                user_id: None,
                email: Some("a@example.com".into()),
            })
            .expect("seed");

        let session = auth.get_session().await.expect("get").expect("refreshed");
        mock.assert_async().await;
        assert_eq!(session.access_token, "at-new");
        assert_eq!(session.email.as_deref(), Some("a@example.com"));
    }

    #[tokio::test]
    async fn failed_refresh_means_no_session() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/auth/v1/token")
            .match_query(mockito::Matcher::Any)
            .with_status(400)
            .with_body(r#"{"error_description":"Refresh Token Not Found"}"#)
            .create_async()
            .await;

        let dir = tempfile::tempdir().expect("tempdir");
        let auth = auth_for(&server, &dir);
        auth.store
            .save(&Session {
                access_token: "at-old".into(),
                refresh_token: Some("rt-gone".into()),
                expires_at: Some(1),
                user_id: None,
                email: None,
            })
            .expect("seed");

        assert_eq!(auth.get_session().await.expect("get"), None);
    }

    #[tokio::test]
    async fn sign_up_without_session_requires_confirmation() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/auth/v1/signup")
            .with_status(200)
            .with_body(r#"{"id":"u-2","email":"b@example.com","confirmation_sent_at":"2025-01-01T00:00:00Z"}"#)
            .create_async()
            .await;

        let dir = tempfile::tempdir().expect("tempdir");
        let auth = auth_for(&server, &dir);
        let outcome = auth.sign_up("b@example.com", "secret1").await.expect("sign up");
        assert_eq!(
            outcome,
            SignUpOutcome::ConfirmationRequired {
                email: "b@example.com".into()
            }
        );
        assert_eq!(auth.get_session().await.expect("get"), None);
    }

    #[tokio::test]
    async fn sign_out_clears_store_and_revokes() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/auth/v1/logout")
            .match_header("authorization", "Bearer at-1")
            .with_status(204)
            .create_async()
            .await;

        let dir = tempfile::tempdir().expect("tempdir");
        let auth = auth_for(&server, &dir);
        auth.store.save(&Session::from_token("at-1")).expect("seed");

        auth.sign_out().await.expect("sign out");
        mock.assert_async().await;
        assert_eq!(auth.store.load().expect("load"), None);
    }
}
