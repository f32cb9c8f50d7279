//! `/clients` endpoints.

use serde::Serialize;
use serde_json::Value;

use crate::http::{ApiRequest, Gateway, GatewayError};

#[derive(Debug, Clone)]
pub struct ClientsApi {
    gateway: Gateway,
}

impl ClientsApi {
    pub fn new(gateway: Gateway) -> Self {
        Self { gateway }
    }

    /// List clients; `params` is a JSON object of query filters (search, page, industry...).
    pub async fn list(&self, params: &Value) -> Result<Value, GatewayError> {
        self.gateway.json(ApiRequest::get("/clients").params(params)).await
    }

    pub async fn get(&self, id: &str) -> Result<Value, GatewayError> {
        self.gateway.get(&format!("/clients/{id}")).await
    }

    pub async fn create<B: Serialize + ?Sized>(&self, client: &B) -> Result<Value, GatewayError> {
        self.gateway.post("/clients", client).await
    }

    pub async fn update<B: Serialize + ?Sized>(&self, id: &str, client: &B) -> Result<Value, GatewayError> {
        self.gateway.put(&format!("/clients/{id}"), client).await
    }

    pub async fn delete(&self, id: &str) -> Result<Value, GatewayError> {
        self.gateway.delete(&format!("/clients/{id}")).await
    }
}
