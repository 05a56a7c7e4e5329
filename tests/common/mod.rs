#![allow(dead_code)]

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use catalog_api::auth::{generate_jwt, Claims, ADMIN_ROLE};
use catalog_api::catalog::memory::{MemoryCategoryStore, MemoryProduct, MemoryProductRegistry};
use catalog_api::catalog::CategoryHierarchy;
use catalog_api::config::{AppConfig, StoreBackend, DEV_JWT_SECRET};
use catalog_api::{app, AppState};

/// Router over fresh in-memory stores, driven in-process.
pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryCategoryStore>,
    pub products: Arc<MemoryProductRegistry>,
    pub admin_token: String,
    pub customer_token: String,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestResponse {
    pub fn data(&self) -> &Value {
        &self.body["data"]
    }

    pub fn code(&self) -> &str {
        self.body["code"].as_str().unwrap_or_default()
    }
}

impl TestApp {
    pub fn spawn() -> Self {
        let mut config = AppConfig::development();
        config.store = StoreBackend::Memory;
        config.api.enable_request_logging = false;
        config.security.enable_audit_logging = true;

        let store = Arc::new(MemoryCategoryStore::new());
        let products = Arc::new(MemoryProductRegistry::new());
        let hierarchy = CategoryHierarchy::new(store.clone(), products.clone())
            .with_limits(config.filter.default_limit, 100);

        let admin_token = mint("admin-1", ADMIN_ROLE);
        let customer_token = mint("customer-1", "customer");
        let router = app(AppState::new(hierarchy, config));

        Self {
            router,
            store,
            products,
            admin_token,
            customer_token,
        }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Result<TestResponse> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let body = match body {
            Some(value) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(serde_json::to_vec(&value)?)
            }
            None => Body::empty(),
        };

        let response = self.router.clone().oneshot(builder.body(body)?).await?;
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).with_context(|| {
                format!("non-JSON body for {}: {}", uri, String::from_utf8_lossy(&bytes))
            })?
        };
        Ok(TestResponse { status, body })
    }

    pub async fn get(&self, uri: &str) -> Result<TestResponse> {
        self.request(Method::GET, uri, None, None).await
    }

    pub async fn admin(&self, method: Method, uri: &str, body: Option<Value>) -> Result<TestResponse> {
        self.request(method, uri, Some(&self.admin_token), body).await
    }

    /// Create through the API and return the stored document.
    pub async fn create(&self, body: Value) -> Result<Value> {
        let res = self.admin(Method::POST, "/api/v1/categories", Some(body)).await?;
        anyhow::ensure!(
            res.status == StatusCode::CREATED,
            "create failed with {}: {}",
            res.status,
            res.body
        );
        Ok(res.data().clone())
    }

    pub async fn create_named(&self, name: &str, parent: Option<&Value>) -> Result<Value> {
        let mut body = json!({ "name": name });
        if let Some(parent) = parent {
            body["parent"] = parent["id"].clone();
        }
        self.create(body).await
    }

    pub async fn add_product(&self, name: &str, price: Decimal, category: &Value) -> Result<Uuid> {
        let product = MemoryProduct::new(name, price, id_of(category)?);
        Ok(self.products.add(product).await)
    }
}

pub fn mint(id: &str, role: &str) -> String {
    generate_jwt(&Claims::new(id, role, 1), DEV_JWT_SECRET).expect("mint test token")
}

pub fn id_of(category: &Value) -> Result<Uuid> {
    let raw = category["id"].as_str().context("category without id")?;
    Ok(Uuid::parse_str(raw)?)
}

pub fn names(list: &Value) -> Vec<String> {
    list.as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|c| c["name"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}
