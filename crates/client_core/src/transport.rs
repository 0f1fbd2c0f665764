//! Network collaborators used by the controllers, and their reqwest-backed implementation.

use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use shared::{
    domain::{Product, ProductId, StoreStatus},
    error::ApiErrorBody,
    protocol::{
        ChatReply, ChatRequest, PopulationAck, PopulationRequest, PopulationStatusReply,
        ProductPageQuery, SearchReply,
    },
};
use tracing::debug;
use url::Url;

use crate::{config::ClientSettings, error::TransportError};

#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send_message(&self, message: &str) -> Result<ChatReply, TransportError>;
}

#[async_trait]
pub trait CatalogTransport: Send + Sync {
    async fn list_products(&self, query: ProductPageQuery) -> Result<Vec<Product>, TransportError>;
    async fn get_product(&self, id: ProductId) -> Result<Product, TransportError>;
    async fn products_by_category(&self, category: &str) -> Result<Vec<Product>, TransportError>;
    async fn search_products(&self, query: &str) -> Result<Vec<Product>, TransportError>;
}

#[async_trait]
pub trait PopulationTransport: Send + Sync {
    /// Starts the backend population job; the ack does not mean the job finished.
    async fn trigger_population(
        &self,
        request: PopulationRequest,
    ) -> Result<PopulationAck, TransportError>;
    async fn population_status(&self) -> Result<StoreStatus, TransportError>;
}

#[derive(Clone)]
pub struct HttpTransport {
    http: Client,
    base_url: Url,
}

impl HttpTransport {
    pub fn new(settings: &ClientSettings) -> anyhow::Result<Self> {
        let base_url = Url::parse(&settings.api_base_url)
            .with_context(|| format!("invalid api base url '{}'", settings.api_base_url))?;
        let http = Client::builder()
            .timeout(settings.request_timeout)
            .build()
            .context("failed to build http client")?;
        Ok(Self { http, base_url })
    }

    /// Appends percent-encoded path segments to the base url.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, TransportError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| TransportError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        label: &str,
        url: Url,
    ) -> Result<T, TransportError> {
        debug!(endpoint = label, %url, "GET");
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|err| TransportError::from_reqwest(label, err))?;
        decode_response(label, response).await
    }
}

async fn decode_response<T: DeserializeOwned>(
    label: &str,
    response: Response,
) -> Result<T, TransportError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let detail = ApiErrorBody::parse(&body)
            .map(|body| body.detail)
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string()
            });
        return Err(TransportError::Status {
            endpoint: label.to_string(),
            status,
            detail,
        });
    }

    response
        .json::<T>()
        .await
        .map_err(|err| TransportError::from_reqwest(label, err))
}

#[async_trait]
impl ChatTransport for HttpTransport {
    async fn send_message(&self, message: &str) -> Result<ChatReply, TransportError> {
        let url = self.endpoint(&["chat"])?;
        debug!(endpoint = "/chat", %url, "POST");
        let response = self
            .http
            .post(url)
            .json(&ChatRequest {
                message: message.to_string(),
            })
            .send()
            .await
            .map_err(|err| TransportError::from_reqwest("/chat", err))?;
        decode_response("/chat", response).await
    }
}

#[async_trait]
impl CatalogTransport for HttpTransport {
    async fn list_products(&self, query: ProductPageQuery) -> Result<Vec<Product>, TransportError> {
        let mut url = self.endpoint(&["products"])?;
        url.query_pairs_mut()
            .append_pair("skip", &query.skip.to_string())
            .append_pair("limit", &query.limit.to_string());
        self.get_json("/products", url).await
    }

    async fn get_product(&self, id: ProductId) -> Result<Product, TransportError> {
        let url = self.endpoint(&["products", id.to_string().as_str()])?;
        self.get_json("/products/{id}", url).await
    }

    async fn products_by_category(&self, category: &str) -> Result<Vec<Product>, TransportError> {
        let url = self.endpoint(&["products", "category", category])?;
        self.get_json("/products/category/{category}", url).await
    }

    async fn search_products(&self, query: &str) -> Result<Vec<Product>, TransportError> {
        let url = self.endpoint(&["chat", "search", query])?;
        let reply: SearchReply = self.get_json("/chat/search/{query}", url).await?;
        Ok(reply.into_products())
    }
}

#[async_trait]
impl PopulationTransport for HttpTransport {
    async fn trigger_population(
        &self,
        request: PopulationRequest,
    ) -> Result<PopulationAck, TransportError> {
        let url = self.endpoint(&["scraping"])?;
        debug!(endpoint = "/scraping", %url, ?request, "POST");
        let response = self
            .http
            .post(url)
            .json(&request)
            .send()
            .await
            .map_err(|err| TransportError::from_reqwest("/scraping", err))?;
        decode_response("/scraping", response).await
    }

    async fn population_status(&self) -> Result<StoreStatus, TransportError> {
        let url = self.endpoint(&["scraping", "status"])?;
        let reply: PopulationStatusReply = self.get_json("/scraping/status", url).await?;
        Ok(reply.into())
    }
}

#[cfg(test)]
#[path = "tests/transport_tests.rs"]
mod tests;
