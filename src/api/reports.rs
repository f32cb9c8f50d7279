//! `/reports` endpoints.

use serde_json::Value;

use crate::http::{ApiRequest, Gateway, GatewayError};

#[derive(Debug, Clone)]
pub struct ReportsApi {
    gateway: Gateway,
}

impl ReportsApi {
    pub fn new(gateway: Gateway) -> Self {
        Self { gateway }
    }

    /// Totals for a period; `params` usually carries `startDate`/`endDate`.
    pub async fn summary(&self, params: &Value) -> Result<Value, GatewayError> {
        self.gateway
            .json(ApiRequest::get("/reports/summary").params(params))
            .await
    }

    /// Raw export file (the backend picks the format from `params`).
    pub async fn export(&self, params: &Value) -> Result<Vec<u8>, GatewayError> {
        let response = self
            .gateway
            .send(ApiRequest::get("/reports/export").params(params))
            .await?;
        Ok(response.into_bytes())
    }

    pub async fn top_clients(&self, params: &Value) -> Result<Value, GatewayError> {
        self.gateway
            .json(ApiRequest::get("/reports/top-clients").params(params))
            .await
    }

    pub async fn trends(&self) -> Result<Value, GatewayError> {
        self.gateway.get("/reports/trends").await
    }

    pub async fn by_industry(&self) -> Result<Value, GatewayError> {
        self.gateway.get("/reports/by-industry").await
    }
}
