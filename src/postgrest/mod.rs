//! Declarative reads and writes through the backend's REST interface.

mod filter;
mod query;

use reqwest::Client;
use serde::Serialize;

pub use filter::{Condition, FilterOperator};
pub use query::{DeleteBuilder, InsertBuilder, SelectBuilder, UpdateBuilder};

use query::QueryContext;

/// Handle on one table (or view) of the backend database.
pub struct TableClient {
    ctx: QueryContext,
}

impl TableClient {
    pub(crate) fn new(
        url: &str,
        key: &str,
        table: &str,
        bearer: Option<String>,
        client: Client,
    ) -> Self {
        Self {
            ctx: QueryContext {
                url: format!("{}/rest/v1/{}", url, table),
                key: key.to_string(),
                bearer,
                client,
            },
        }
    }

    /// Select columns, optionally with embedded joins
    /// (e.g. `"*, seller:profiles(id,email,avatar_url)"`).
    pub fn select(&self, columns: &str) -> SelectBuilder {
        SelectBuilder::new(self.ctx.clone(), columns)
    }

    /// Insert one row
    pub fn insert<T: Serialize>(&self, values: T) -> InsertBuilder<T> {
        InsertBuilder::new(self.ctx.clone(), values)
    }

    /// Update rows selected by the builder's filters
    pub fn update<T: Serialize>(&self, values: T) -> UpdateBuilder<T> {
        UpdateBuilder::new(self.ctx.clone(), values)
    }

    /// Delete rows selected by the builder's filters
    pub fn delete(&self) -> DeleteBuilder {
        DeleteBuilder::new(self.ctx.clone())
    }
}
