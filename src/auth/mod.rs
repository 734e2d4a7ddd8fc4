//! Authentication against the backend's auth service, plus the campus-only
//! sign-up gate.

mod session;

use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::error::Error;
use crate::fetch::Fetch;

pub use session::Session;

/// Academic email suffixes accepted at sign-up.
///
/// Client-side gate only; the backend does not enforce this.
const CAMPUS_SUFFIXES: &[&str] = [".edu", ".ac.in", ".ac.uk"].as_slice();

/// Whether `email` looks like a campus address.
pub fn is_campus_email(email: &str) -> bool {
    let email = email.to_lowercase();
    CAMPUS_SUFFIXES.iter().any(|suffix| email.contains(suffix))
}

/// The account as reported by the auth service.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthUser {
    pub id: String,
    pub email: Option<String>,
    pub created_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
    user: Option<AuthUser>,
}

/// Auth client. Holds the current session; queries issued through
/// [`crate::Backend::from`] pick up its bearer token.
pub struct Auth {
    url: String,
    key: String,
    client: Client,
    session: Arc<Mutex<Option<Session>>>,
}

impl Auth {
    pub(crate) fn new(url: &str, key: &str, client: Client) -> Self {
        Self {
            url: url.to_string(),
            key: key.to_string(),
            client,
            session: Arc::new(Mutex::new(None)),
        }
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1{}", self.url, path)
    }

    fn store_session(&self, response: &TokenResponse) {
        if let (Some(access), Some(refresh), Some(user)) = (
            response.access_token.as_ref(),
            response.refresh_token.as_ref(),
            response.user.as_ref(),
        ) {
            let session = Session::new(
                access.clone(),
                refresh.clone(),
                user.id.clone(),
                response.expires_in.unwrap_or(3600),
            );
            let mut current = self.session.lock().expect("session lock poisoned");
            *current = Some(session);
        }
    }

    /// Register a new account. Rejects non-campus addresses before any
    /// request is made.
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<Option<AuthUser>, Error> {
        if !is_campus_email(email) {
            return Err(Error::auth(
                "Campus emails only. Use your .edu or .ac address",
            ));
        }

        let url = self.auth_url("/signup");

        let mut body = HashMap::new();
        body.insert("email".to_string(), email.to_string());
        body.insert("password".to_string(), password.to_string());

        let result = Fetch::post(&self.client, &url)
            .header("apikey", &self.key)
            .json(&body)?
            .execute::<TokenResponse>()
            .await?;

        self.store_session(&result);
        Ok(result.user)
    }

    /// Sign in with email and password.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, Error> {
        let url = self.auth_url("/token?grant_type=password");

        let mut body = HashMap::new();
        body.insert("email".to_string(), email.to_string());
        body.insert("password".to_string(), password.to_string());

        let result = Fetch::post(&self.client, &url)
            .header("apikey", &self.key)
            .json(&body)?
            .execute::<TokenResponse>()
            .await?;

        self.store_session(&result);
        self.session().ok_or(Error::AuthenticationRequired)
    }

    /// Sign out and drop the stored session.
    pub async fn sign_out(&self) -> Result<(), Error> {
        let url = self.auth_url("/logout");

        let token = self
            .session()
            .map(|s| s.access_token)
            .ok_or(Error::AuthenticationRequired)?;

        Fetch::post(&self.client, &url)
            .header("apikey", &self.key)
            .bearer_auth(&token)
            .execute_raw()
            .await?;

        let mut current = self.session.lock().expect("session lock poisoned");
        *current = None;

        Ok(())
    }

    /// Fetch the account behind the current session.
    pub async fn current_user(&self) -> Result<AuthUser, Error> {
        let url = self.auth_url("/user");

        let token = self
            .session()
            .map(|s| s.access_token)
            .ok_or(Error::AuthenticationRequired)?;

        let user = Fetch::get(&self.client, &url)
            .header("apikey", &self.key)
            .bearer_auth(&token)
            .execute::<AuthUser>()
            .await?;

        Ok(user)
    }

    /// The current session, if any.
    pub fn session(&self) -> Option<Session> {
        self.session.lock().expect("session lock poisoned").clone()
    }

    /// Replace the stored session (e.g. restored from disk).
    pub fn set_session(&self, session: Session) {
        let mut current = self.session.lock().expect("session lock poisoned");
        *current = Some(session);
    }

    /// The signed-in user's id, if a session exists.
    pub fn user_id(&self) -> Option<String> {
        self.session().map(|s| s.user_id)
    }

    /// The signed-in user's id, or [`Error::AuthenticationRequired`].
    pub fn require_user_id(&self) -> Result<String, Error> {
        self.user_id().ok_or(Error::AuthenticationRequired)
    }
}
