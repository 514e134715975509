use async_trait::async_trait;

use super::error::BackendError;
use super::query::Query;
use crate::policy::Row;
use crate::schema::Table;

/// What an insert sends back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Returning {
    /// Nothing; the caller does not need read access to the new row.
    Minimal,
    /// The inserted row, which must be readable by the caller.
    Representation,
}

/// Common trait for the hosted backend and its in-process stand-in.
/// Every call is a single request evaluated under the session's identity.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn select(&self, query: &Query) -> Result<Vec<Row>, BackendError>;

    async fn insert(
        &self,
        table: Table,
        row: Row,
        returning: Returning,
    ) -> Result<Vec<Row>, BackendError>;

    /// Applies `patch` to every row matched by `query`, returning the
    /// updated rows shaped by `query.select`.
    async fn update(&self, query: &Query, patch: Row) -> Result<Vec<Row>, BackendError>;

    /// Deletes every row matched by `query`, returning the deleted rows.
    async fn delete(&self, query: &Query) -> Result<Vec<Row>, BackendError>;

    fn backend_name(&self) -> &'static str;
}
