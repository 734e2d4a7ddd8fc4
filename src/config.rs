//! Client configuration.

use std::time::Duration;

use crate::error::Error;

/// Options controlling how the backend client behaves.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Request timeout applied to the shared HTTP client
    pub request_timeout: Option<Duration>,

    /// The database schema queried through the REST interface
    pub db_schema: String,

    /// Storage bucket holding listing photos
    pub item_image_bucket: String,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            request_timeout: Some(Duration::from_secs(30)),
            db_schema: "public".to_string(),
            item_image_bucket: "item-images".to_string(),
        }
    }
}

impl ClientOptions {
    /// Set the request timeout
    pub fn with_request_timeout(mut self, value: Option<Duration>) -> Self {
        self.request_timeout = value;
        self
    }

    /// Set the database schema
    pub fn with_db_schema(mut self, value: &str) -> Self {
        self.db_schema = value.to_string();
        self
    }

    /// Set the bucket used for listing photos
    pub fn with_item_image_bucket(mut self, value: &str) -> Self {
        self.item_image_bucket = value.to_string();
        self
    }
}

/// Connection settings for the backend project.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Base URL of the backend project
    pub url: String,

    /// Anonymous API key
    pub key: String,
}

impl BackendConfig {
    pub fn new(url: &str, key: &str) -> Self {
        Self {
            url: url.to_string(),
            key: key.to_string(),
        }
    }

    /// Read the connection settings from `MARKET_BACKEND_URL` and
    /// `MARKET_BACKEND_KEY`.
    pub fn from_env() -> Result<Self, Error> {
        let url = std::env::var("MARKET_BACKEND_URL")
            .map_err(|_| Error::auth("MARKET_BACKEND_URL is not set"))?;
        let key = std::env::var("MARKET_BACKEND_KEY")
            .map_err(|_| Error::auth("MARKET_BACKEND_KEY is not set"))?;
        Ok(Self { url, key })
    }
}
