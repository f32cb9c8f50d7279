//! `/auth` endpoints.

use serde_json::{json, Value};

use crate::api::Envelope;
use crate::auth::{AuthPayload, CurrentUser};
use crate::http::{Gateway, GatewayError};

#[derive(Debug, Clone)]
pub struct AuthApi {
    gateway: Gateway,
}

impl AuthApi {
    pub fn new(gateway: Gateway) -> Self {
        Self { gateway }
    }

    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<Envelope<AuthPayload>, GatewayError> {
        self.gateway
            .post("/auth/register", &json!({ "name": name, "email": email, "password": password }))
            .await
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<Envelope<AuthPayload>, GatewayError> {
        self.gateway
            .post("/auth/login", &json!({ "email": email, "password": password }))
            .await
    }

    pub async fn me(&self) -> Result<Envelope<CurrentUser>, GatewayError> {
        self.gateway.get("/auth/me").await
    }

    pub async fn logout(&self) -> Result<Value, GatewayError> {
        self.gateway.post("/auth/logout", &json!({})).await
    }
}
