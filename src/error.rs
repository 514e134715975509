use crate::backend::BackendError;
use crate::schema::Table;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error("could not decode {table} row: {source}")]
    Decode {
        table: Table,
        #[source]
        source: serde_json::Error,
    },
    #[error("backend returned no {0} row")]
    MissingRow(Table),
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl ServiceError {
    pub fn decode(table: Table) -> impl FnOnce(serde_json::Error) -> Self {
        move |source| Self::Decode { table, source }
    }
}
