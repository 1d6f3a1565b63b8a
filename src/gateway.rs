//! Sale gateway
//!
//! The backend collaborator that persists a sale. The HTTP implementation
//! posts the flattened payload as JSON and surfaces backend errors verbatim.

use async_trait::async_trait;
use mockall::automock;
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;

use crate::checkout::SalePayload;

/// Backend acknowledgement of a recorded sale.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SaleConfirmation {
    /// Backend identifier of the sale
    pub id: String,
}

/// Errors that can occur when handing a sale to the backend.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// An HTTP transport or serialization error occurred.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend refused the sale.
    #[error("sale rejected ({status}): {message}")]
    Rejected {
        /// HTTP status code
        status: u16,

        /// Message from the response body
        message: String,
    },

    /// The backend answered with a body we could not read.
    #[error("unexpected response from backend: {0}")]
    UnexpectedResponse(String),
}

/// Persists sales.
#[automock]
#[async_trait]
pub trait SaleGateway: Send + Sync {
    /// Record a sale and return its confirmation.
    async fn submit_sale(&self, sale: &SalePayload) -> Result<SaleConfirmation, GatewayError>;
}

/// Configuration for connecting to the backend API.
#[derive(Debug, Clone)]
pub struct HttpGatewayConfig {
    /// Base URL of the API, e.g. `"http://localhost:3000/api"`.
    pub base_url: String,

    /// Bearer token, if the API requires one.
    pub token: Option<String>,
}

/// JSON over HTTP sale gateway.
#[derive(Debug, Clone)]
pub struct HttpSaleGateway {
    config: HttpGatewayConfig,
    http: Client,
}

impl HttpSaleGateway {
    /// Create a new gateway from the given configuration.
    #[must_use]
    pub fn new(config: HttpGatewayConfig) -> Self {
        Self {
            config,
            http: Client::new(),
        }
    }

    fn sales_url(&self) -> String {
        format!("{}/sales", self.config.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl SaleGateway for HttpSaleGateway {
    async fn submit_sale(&self, sale: &SalePayload) -> Result<SaleConfirmation, GatewayError> {
        let mut request = self.http.post(self.sales_url()).json(sale);

        if let Some(token) = &self.config.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(GatewayError::Rejected {
                status: status.as_u16(),
                message: error_message(&text),
            });
        }

        serde_json::from_str(&text)
            .map_err(|error| GatewayError::UnexpectedResponse(format!("{error}: {text}")))
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
    message: Option<String>,
}

/// Message carried by a backend error body: `error`, else `message`, else the raw text.
fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|parsed| parsed.error.or(parsed.message))
        .unwrap_or_else(|| body.trim().to_string())
}
