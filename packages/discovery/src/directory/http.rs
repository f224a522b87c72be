use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, instrument};

use super::UserDirectory;
use crate::error::{DirectoryError, DirectoryResult};
use crate::types::query::{DiscoverQuery, DiscoverResult};

/// Callable-function request envelope
#[derive(Serialize)]
struct CallableRequest<'a> {
    data: &'a DiscoverQuery,
}

/// Callable-function response envelope
#[derive(Deserialize)]
struct CallableResponse {
    result: DiscoverResult,
}

#[derive(Deserialize)]
struct CallableErrorBody {
    error: CallableError,
}

#[derive(Deserialize)]
struct CallableError {
    message: String,
}

/// Directory backed by the app's `discoverUsers` callable HTTP endpoint.
///
/// Requests are `POST {"data": <query>}`, responses `{"result": <page>}`.
/// Error responses carry `{"error": {"message": ...}}`, which is surfaced as
/// [`DirectoryError::Rejected`].
pub struct HttpDirectory {
    endpoint: String,
    id_token: Option<String>,
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpDirectory {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            id_token: None,
            client: reqwest::Client::new(),
            timeout: Duration::from_secs(15),
        }
    }

    /// Authenticate calls as the searching user.
    pub fn with_id_token(mut self, token: impl Into<String>) -> Self {
        self.id_token = Some(token.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl UserDirectory for HttpDirectory {
    #[instrument(skip(self, query), fields(offset = query.offset, radius_km = ?query.radius_km()))]
    async fn discover(&self, query: &DiscoverQuery) -> DirectoryResult<DiscoverResult> {
        let mut request = self
            .client
            .post(&self.endpoint)
            .timeout(self.timeout)
            .json(&CallableRequest { data: query });
        if let Some(token) = &self.id_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| {
            error!(error = %e, endpoint = %self.endpoint, "Directory request failed");
            DirectoryError::Http(Box::new(e))
        })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| DirectoryError::Http(Box::new(e)))?;

        if !status.is_success() {
            let message = serde_json::from_str::<CallableErrorBody>(&body)
                .map(|b| b.error.message)
                .unwrap_or_else(|_| format!("Directory returned {}", status));
            error!(status = %status, message = %message, "Directory rejected query");
            return Err(DirectoryError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let page = serde_json::from_str::<CallableResponse>(&body)?.result;
        debug!(returned = page.users.len(), total = page.total, has_more = page.has_more, "Directory page received");

        Ok(page)
    }
}
