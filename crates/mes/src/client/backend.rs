use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;

use super::error::{ClientError, ClientResult};
use crate::api::ErrorBody;
use crate::config::ClientConfig;
use crate::routing::{BatchUpdate, Operation, OperationPatch, OrderEntry};

/// The routing calls the Operation List editor needs. Write calls only
/// report success; the editor reloads afterwards.
#[async_trait]
pub trait RoutingBackend: Send + Sync {
    async fn fetch_operations(&self) -> ClientResult<Vec<Operation>>;
    async fn start_operation(&self, id: i64) -> ClientResult<()>;
    async fn update_operation(&self, id: i64, patch: &OperationPatch) -> ClientResult<()>;
    async fn update_order(&self, entries: &[OrderEntry]) -> ClientResult<()>;
    async fn apply_batch(&self, batch: &BatchUpdate) -> ClientResult<()>;
}

/// `RoutingBackend` over HTTP against a running `mesd`.
#[derive(Clone, Debug)]
pub struct HttpRoutingBackend {
    http: reqwest::Client,
    base_url: String,
}

impl HttpRoutingBackend {
    pub fn new(config: &ClientConfig) -> ClientResult<Self> {
        let base_url = config.base_url.trim_end_matches('/').to_string();
        reqwest::Url::parse(&base_url).map_err(|_| ClientError::InvalidUrl(base_url.clone()))?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;

        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http.request(method, format!("{}{}", self.base_url, path))
    }

    async fn send(&self, req: RequestBuilder) -> ClientResult<reqwest::Response> {
        let resp = req.send().await?;
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        let body = resp.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .map(|b| b.error)
            .unwrap_or(body);
        Err(ClientError::Api {
            status: status.as_u16(),
            message,
        })
    }

    async fn send_json<R: DeserializeOwned>(&self, req: RequestBuilder) -> ClientResult<R> {
        Ok(self.send(req).await?.json().await?)
    }
}

#[async_trait]
impl RoutingBackend for HttpRoutingBackend {
    async fn fetch_operations(&self) -> ClientResult<Vec<Operation>> {
        self.send_json(self.request(Method::GET, "/info/routing/status"))
            .await
    }

    async fn start_operation(&self, id: i64) -> ClientResult<()> {
        self.send(self.request(Method::PATCH, &format!("/info/routing/{id}/start")))
            .await?;
        Ok(())
    }

    async fn update_operation(&self, id: i64, patch: &OperationPatch) -> ClientResult<()> {
        self.send(
            self.request(Method::PUT, &format!("/info/routing/{id}"))
                .json(patch),
        )
        .await?;
        Ok(())
    }

    async fn update_order(&self, entries: &[OrderEntry]) -> ClientResult<()> {
        self.send(self.request(Method::PUT, "/info/routing/order").json(entries))
            .await?;
        Ok(())
    }

    async fn apply_batch(&self, batch: &BatchUpdate) -> ClientResult<()> {
        self.send(self.request(Method::PUT, "/info/routing/batch").json(batch))
            .await?;
        Ok(())
    }
}
