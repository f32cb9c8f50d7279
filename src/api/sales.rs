//! `/sales` endpoints.

use serde::Serialize;
use serde_json::Value;

use crate::http::{ApiRequest, Gateway, GatewayError};

#[derive(Debug, Clone)]
pub struct SalesApi {
    gateway: Gateway,
}

impl SalesApi {
    pub fn new(gateway: Gateway) -> Self {
        Self { gateway }
    }

    pub async fn list(&self, params: &Value) -> Result<Value, GatewayError> {
        self.gateway.json(ApiRequest::get("/sales").params(params)).await
    }

    pub async fn get(&self, id: &str) -> Result<Value, GatewayError> {
        self.gateway.get(&format!("/sales/{id}")).await
    }

    pub async fn create<B: Serialize + ?Sized>(&self, sale: &B) -> Result<Value, GatewayError> {
        self.gateway.post("/sales", sale).await
    }

    pub async fn update<B: Serialize + ?Sized>(&self, id: &str, sale: &B) -> Result<Value, GatewayError> {
        self.gateway.put(&format!("/sales/{id}"), sale).await
    }

    pub async fn delete(&self, id: &str) -> Result<Value, GatewayError> {
        self.gateway.delete(&format!("/sales/{id}")).await
    }
}
