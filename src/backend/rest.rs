use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use tracing::{debug, warn};

use super::error::BackendError;
use super::query::Query;
use super::traits::{Backend, Returning};
use crate::config::BackendConfig;
use crate::policy::Row;
use crate::schema::Table;

/// Hosted backend reached over its REST surface (`/rest/v1/<table>`)
#[derive(Debug, Clone)]
pub struct RestBackend {
    client: Client,
    base_url: String,
    api_key: String,
    access_token: Option<String>,
}

impl RestBackend {
    /// Create a client for the configured project, signed in when the
    /// configuration carries an access token.
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("estate-listings/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            api_key: config.anon_key.clone(),
            access_token: config.access_token.clone(),
        })
    }

    fn endpoint(&self, table: Table) -> String {
        format!("{}/rest/v1/{}", self.base_url, table.name())
    }

    fn request(&self, method: Method, table: Table) -> RequestBuilder {
        let bearer = self.access_token.as_deref().unwrap_or(&self.api_key);
        self.client
            .request(method, self.endpoint(table))
            .header("apikey", &self.api_key)
            .bearer_auth(bearer)
    }

    async fn rows(&self, response: Response) -> Result<Vec<Row>, BackendError> {
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            warn!("Backend returned status: {}", status);
            return Err(BackendError::from_response(status.as_u16(), &body));
        }

        debug!("Received {} bytes", body.len());
        if body.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl Backend for RestBackend {
    async fn select(&self, query: &Query) -> Result<Vec<Row>, BackendError> {
        debug!("GET {} {:?}", query.table, query.to_params());
        let response = self
            .request(Method::GET, query.table)
            .query(&query.to_params())
            .send()
            .await?;
        self.rows(response).await
    }

    async fn insert(
        &self,
        table: Table,
        row: Row,
        returning: Returning,
    ) -> Result<Vec<Row>, BackendError> {
        debug!("POST {}", table);
        let prefer = match returning {
            Returning::Minimal => "return=minimal",
            Returning::Representation => "return=representation",
        };
        let response = self
            .request(Method::POST, table)
            .header("Prefer", prefer)
            .json(&row)
            .send()
            .await?;
        self.rows(response).await
    }

    async fn update(&self, query: &Query, patch: Row) -> Result<Vec<Row>, BackendError> {
        debug!("PATCH {} {:?}", query.table, query.to_params());
        let response = self
            .request(Method::PATCH, query.table)
            .header("Prefer", "return=representation")
            .query(&query.to_params())
            .json(&patch)
            .send()
            .await?;
        self.rows(response).await
    }

    async fn delete(&self, query: &Query) -> Result<Vec<Row>, BackendError> {
        debug!("DELETE {} {:?}", query.table, query.to_params());
        let response = self
            .request(Method::DELETE, query.table)
            .header("Prefer", "return=representation")
            .query(&query.to_params())
            .send()
            .await?;
        self.rows(response).await
    }

    fn backend_name(&self) -> &'static str {
        "rest"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn config() -> BackendConfig {
        BackendConfig {
            url: "https://demo.supabase.co/".to_string(),
            anon_key: "anon-key".to_string(),
            access_token: None,
            timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn endpoint_strips_trailing_slash() {
        let backend = RestBackend::new(&config()).expect("client builds");
        assert_eq!(
            backend.endpoint(Table::SavedProperties),
            "https://demo.supabase.co/rest/v1/saved_properties"
        );
    }

    #[test]
    fn requests_carry_key_and_bearer() {
        let backend = RestBackend::new(&config()).expect("client builds");
        let request = backend
            .request(Method::GET, Table::Properties)
            .build()
            .expect("request builds");
        assert_eq!(request.headers()["apikey"], "anon-key");
        assert_eq!(request.headers()["authorization"], "Bearer anon-key");

        let session = RestBackend::new(&BackendConfig {
            access_token: Some("user-jwt".to_string()),
            ..config()
        })
        .expect("client builds");
        let request = session
            .request(Method::GET, Table::Properties)
            .build()
            .expect("request builds");
        assert_eq!(request.headers()["apikey"], "anon-key");
        assert_eq!(request.headers()["authorization"], "Bearer user-jwt");
    }
}
