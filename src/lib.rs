//! Campus marketplace data layer.
//!
//! Students list items for sale, swap, giveaway or rental, browse and search
//! listings, message sellers, save favorites and manage rental requests. All
//! durable state lives in a managed backend (Postgres + auth + object storage
//! + change feed); this crate is the typed client surface plus the services
//! that keep per-slice caches of that state fresh.

pub mod auth;
pub mod config;
pub mod currency;
pub mod error;
pub mod feed;
pub mod fetch;
pub mod listing;
pub mod models;
pub mod notify;
pub mod postgrest;
pub mod realtime;
pub mod services;
pub mod storage;

use reqwest::Client;

use crate::auth::Auth;
use crate::config::{BackendConfig, ClientOptions};
use crate::postgrest::TableClient;
use crate::realtime::{ChangeFeed, SocketTask};
use crate::storage::StorageClient;

/// Entry point to the backend platform: auth, table queries, object storage
/// and the change-feed socket all hang off one `Backend`.
pub struct Backend {
    /// Base URL of the backend project
    pub url: String,
    /// Anonymous API key
    pub key: String,
    /// Shared HTTP client
    pub http_client: Client,
    /// Auth client holding the current session
    pub auth: Auth,
    /// Client options
    pub options: ClientOptions,
}

impl Backend {
    /// Create a backend client with default options.
    pub fn new(url: &str, key: &str) -> Self {
        Self::new_with_options(url, key, ClientOptions::default())
    }

    /// Create a backend client from environment configuration.
    pub fn from_config(config: &BackendConfig) -> Self {
        Self::new(&config.url, &config.key)
    }

    /// Create a backend client with custom options.
    pub fn new_with_options(url: &str, key: &str, options: ClientOptions) -> Self {
        let http_client = build_http_client(&options);
        let auth = Auth::new(url, key, http_client.clone());

        Self {
            url: url.to_string(),
            key: key.to_string(),
            http_client,
            auth,
            options,
        }
    }

    /// The auth client.
    pub fn auth(&self) -> &Auth {
        &self.auth
    }

    /// A query handle on one table. The current session's bearer token is
    /// snapshotted here, so row-level policies see the signed-in user.
    pub fn from(&self, table: &str) -> TableClient {
        let bearer = self.auth.session().map(|s| s.access_token);
        TableClient::new(&self.url, &self.key, table, bearer, self.http_client.clone())
    }

    /// The object storage client.
    pub fn storage(&self) -> StorageClient {
        let bearer = self.auth.session().map(|s| s.access_token);
        StorageClient::new(&self.url, &self.key, bearer, self.http_client.clone())
    }

    /// A websocket task that feeds `feed` with live row changes. Spawn its
    /// `run()` future; tests skip this and publish into the feed directly.
    pub fn socket(&self, feed: &ChangeFeed) -> SocketTask {
        let token = self.auth.session().map(|s| s.access_token);
        SocketTask::new(&self.url, &self.key, token, feed)
    }
}

fn build_http_client(options: &ClientOptions) -> Client {
    let builder = match options.request_timeout {
        Some(timeout) => Client::builder().timeout(timeout),
        None => Client::builder(),
    };
    builder.build().unwrap_or_else(|_| Client::new())
}

/// Common imports.
pub mod prelude {
    pub use crate::config::{BackendConfig, ClientOptions};
    pub use crate::error::Error;
    pub use crate::models::{Chat, Item, ItemKind, Message, Rental, RentalStatus, Wishlist};
    pub use crate::notify::Notifier;
    pub use crate::realtime::ChangeFeed;
    pub use crate::services::{
        ChatsService, FavoritesService, ItemsService, RentalsService, WishlistsService,
    };
    pub use crate::Backend;
}
