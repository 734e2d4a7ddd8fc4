//! Query builders for the REST interface.

use reqwest::Client;
use serde::{de::DeserializeOwned, Serialize};

use crate::error::Error;
use crate::fetch::{Fetch, FetchBuilder};
use crate::postgrest::filter::{render_or_group, Condition, FilterOperator};

/// Request context shared by the builders: endpoint, keys and the session
/// token when one exists.
#[derive(Debug, Clone)]
pub(crate) struct QueryContext {
    pub url: String,
    pub key: String,
    pub bearer: Option<String>,
    pub client: Client,
}

impl QueryContext {
    fn apply<'a>(&self, fetch: FetchBuilder<'a>) -> FetchBuilder<'a> {
        let fetch = fetch.header("apikey", &self.key);
        match &self.bearer {
            Some(token) => fetch.bearer_auth(token),
            None => fetch,
        }
    }
}

/// Builder for SELECT queries.
pub struct SelectBuilder {
    ctx: QueryContext,
    params: Vec<(String, String)>,
}

impl SelectBuilder {
    pub(crate) fn new(ctx: QueryContext, columns: &str) -> Self {
        Self {
            ctx,
            params: vec![("select".to_string(), columns.to_string())],
        }
    }

    fn condition(mut self, column: &str, operator: FilterOperator, value: &str) -> Self {
        self.params.push((
            column.to_string(),
            format!("{}.{}", operator.as_str(), value),
        ));
        self
    }

    /// Keep rows where `column` equals `value`
    pub fn eq<T: ToString>(self, column: &str, value: T) -> Self {
        let value = value.to_string();
        self.condition(column, FilterOperator::Eq, &value)
    }

    /// Keep rows where `column` matches `pattern`, case insensitively
    pub fn ilike(self, column: &str, pattern: &str) -> Self {
        self.condition(column, FilterOperator::ILike, pattern)
    }

    /// Keep rows matching any of the given conditions
    pub fn or_any(mut self, conditions: &[Condition]) -> Self {
        self.params
            .push(("or".to_string(), render_or_group(conditions)));
        self
    }

    /// Order the result by `column`
    pub fn order(mut self, column: &str, ascending: bool) -> Self {
        let direction = if ascending { "asc" } else { "desc" };
        self.params
            .push(("order".to_string(), format!("{}.{}", column, direction)));
        self
    }

    /// Cap the number of rows returned
    pub fn limit(mut self, count: i32) -> Self {
        self.params.push(("limit".to_string(), count.to_string()));
        self
    }

    fn fetch(&self) -> FetchBuilder<'_> {
        let mut fetch = Fetch::get(&self.ctx.client, &self.ctx.url);
        fetch = self.ctx.apply(fetch);
        for (key, value) in &self.params {
            fetch = fetch.query_param(key, value);
        }
        fetch
    }

    /// Execute and return all matching rows
    pub async fn execute<T: DeserializeOwned>(&self) -> Result<Vec<T>, Error> {
        self.fetch().execute::<Vec<T>>().await
    }

    /// Execute and return the first row, if any
    pub async fn execute_maybe_single<T: DeserializeOwned>(self) -> Result<Option<T>, Error> {
        let rows = self.limit(1).execute::<T>().await?;
        Ok(rows.into_iter().next())
    }

    /// Execute and require exactly one row
    pub async fn execute_single<T: DeserializeOwned>(self) -> Result<T, Error> {
        self.execute_maybe_single()
            .await?
            .ok_or_else(|| Error::database("expected a row, found none"))
    }
}

/// Builder for INSERT queries.
pub struct InsertBuilder<T: Serialize> {
    ctx: QueryContext,
    values: T,
}

impl<T: Serialize> InsertBuilder<T> {
    pub(crate) fn new(ctx: QueryContext, values: T) -> Self {
        Self { ctx, values }
    }

    fn fetch(&self, prefer: &str) -> Result<FetchBuilder<'_>, Error> {
        let fetch = Fetch::post(&self.ctx.client, &self.ctx.url);
        self.ctx
            .apply(fetch)
            .header("Prefer", prefer)
            .json(&self.values)
    }

    /// Insert and return the created row
    pub async fn execute_one<R: DeserializeOwned>(&self) -> Result<R, Error> {
        let rows = self
            .fetch("return=representation")?
            .execute::<Vec<R>>()
            .await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| Error::database("insert returned no rows"))
    }

    /// Insert without reading the created row back
    pub async fn execute_no_return(&self) -> Result<(), Error> {
        self.fetch("return=minimal")?.execute_no_content().await
    }
}

/// Builder for UPDATE queries.
pub struct UpdateBuilder<T: Serialize> {
    ctx: QueryContext,
    values: T,
    filters: Vec<(String, String)>,
}

impl<T: Serialize> UpdateBuilder<T> {
    pub(crate) fn new(ctx: QueryContext, values: T) -> Self {
        Self {
            ctx,
            values,
            filters: Vec::new(),
        }
    }

    /// Restrict the update to rows where `column` equals `value`
    pub fn eq<V: ToString>(mut self, column: &str, value: V) -> Self {
        self.filters
            .push((column.to_string(), format!("eq.{}", value.to_string())));
        self
    }

    /// Apply the update without reading rows back
    pub async fn execute_no_return(&self) -> Result<(), Error> {
        let fetch = Fetch::patch(&self.ctx.client, &self.ctx.url);
        let mut fetch = self
            .ctx
            .apply(fetch)
            .header("Prefer", "return=minimal")
            .json(&self.values)?;
        for (key, value) in &self.filters {
            fetch = fetch.query_param(key, value);
        }
        fetch.execute_no_content().await
    }
}

/// Builder for DELETE queries.
pub struct DeleteBuilder {
    ctx: QueryContext,
    filters: Vec<(String, String)>,
}

impl DeleteBuilder {
    pub(crate) fn new(ctx: QueryContext) -> Self {
        Self {
            ctx,
            filters: Vec::new(),
        }
    }

    /// Restrict the delete to rows where `column` equals `value`
    pub fn eq<V: ToString>(mut self, column: &str, value: V) -> Self {
        self.filters
            .push((column.to_string(), format!("eq.{}", value.to_string())));
        self
    }

    /// Apply the delete without reading rows back
    pub async fn execute_no_return(&self) -> Result<(), Error> {
        let fetch = Fetch::delete(&self.ctx.client, &self.ctx.url);
        let mut fetch = self.ctx.apply(fetch).header("Prefer", "return=minimal");
        for (key, value) in &self.filters {
            fetch = fetch.query_param(key, value);
        }
        fetch.execute_no_content().await
    }
}
