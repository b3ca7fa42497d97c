#![allow(dead_code, clippy::expect_used)]
//! Test helpers for integration tests.
//!
//! Provides utilities for:
//! - Creating a test Salvo service wired to an in-memory host backend
//! - Making HTTP requests with or without service-account credentials
//! - Asserting on responses and backend state

use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use salvo::Router;
use salvo::Service;
use salvo::http::header::HeaderName;
use salvo::http::{Method, ReqBody, StatusCode};
use salvo::test::{RequestBuilder, ResponseExt, TestClient};

use roomdav_test::component::calendar::CalendarSharingService;
use roomdav_test::component::config::ConfigHandler;

pub use roomdav_test::component::host::memory::{HostCall, MemoryHost};
pub use roomdav_test::component::host::types::{Component, PropertyKind};

pub const SERVICE_ACCOUNT: &str = "watcha";
pub const SECRET: &str = "sesame";

fn test_config() -> roomdav_test::component::config::Settings {
    use roomdav_test::component::config::{
        BridgeConfig, HostConfig, HostMode, LoggingConfig, ServerConfig, Settings,
    };

    Settings {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 5800,
        },
        host: HostConfig {
            mode: HostMode::Memory,
            base_url: None,
            service_password: None,
        },
        bridge: BridgeConfig {
            service_account: SERVICE_ACCOUNT.to_string(),
            secret: SECRET.to_string(),
        },
        logging: LoggingConfig {
            level: "debug".to_string(),
        },
    }
}

/// Creates the HTTP service under test plus a handle onto its in-memory
/// host backend. The service account is pre-registered in the directory.
pub fn create_test_service() -> (Arc<MemoryHost>, Service) {
    let host = Arc::new(MemoryHost::new());
    host.seed_user(SERVICE_ACCOUNT);

    let sharing = CalendarSharingService::with_backend(host.clone(), SERVICE_ACCOUNT);

    let router = Router::new()
        .hoop(ConfigHandler {
            settings: test_config(),
        })
        .hoop(roomdav_app::service_handler::ServiceHandler {
            service: Arc::new(sharing),
        })
        .push(roomdav_test::app::api::routes().expect("API routes should be valid"));

    (host, Service::new(router))
}

/// Test request builder for constructing HTTP requests.
pub struct TestRequest {
    method: Method,
    path: String,
    headers: Vec<(String, String)>,
    body: Option<Vec<u8>>,
}

impl TestRequest {
    /// Creates a new test request with the given method and path.
    #[must_use]
    pub fn new(method: Method, path: &str) -> Self {
        Self {
            method,
            path: path.to_string(),
            headers: Vec::new(),
            body: None,
        }
    }

    #[must_use]
    pub fn get(path: &str) -> Self {
        Self::new(Method::GET, path)
    }

    #[must_use]
    pub fn post(path: &str) -> Self {
        Self::new(Method::POST, path)
    }

    #[must_use]
    pub fn put(path: &str) -> Self {
        Self::new(Method::PUT, path)
    }

    #[must_use]
    pub fn delete(path: &str) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Adds a header to the request.
    #[must_use]
    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    /// Adds the service account's Basic credentials.
    #[must_use]
    pub fn as_service_account(self) -> Self {
        let token = BASE64.encode(format!("{SERVICE_ACCOUNT}:{SECRET}"));
        self.header("authorization", &format!("Basic {token}"))
    }

    /// Adds Basic credentials for an arbitrary caller.
    #[must_use]
    pub fn as_user(self, user: &str, password: &str) -> Self {
        let token = BASE64.encode(format!("{user}:{password}"));
        self.header("authorization", &format!("Basic {token}"))
    }

    /// Sets a JSON request body.
    #[must_use]
    pub fn json_body(mut self, value: &serde_json::Value) -> Self {
        self.headers.push((
            "content-type".to_string(),
            "application/json; charset=utf-8".to_string(),
        ));
        self.body = Some(value.to_string().into_bytes());
        self
    }

    /// Sends the request to the test service and returns the response.
    ///
    /// ## Panics
    /// Panics if the request cannot be sent or the response cannot be read.
    pub async fn send(self, service: &Service) -> TestResponse {
        let url = format!("http://127.0.0.1:5800{}", self.path);

        let mut client = match self.method.as_str() {
            "GET" => TestClient::get(&url),
            "POST" => TestClient::post(&url),
            "PUT" => TestClient::put(&url),
            "DELETE" => TestClient::delete(&url),
            _ => RequestBuilder::new(&url, self.method.clone()),
        };

        for (name, value) in self.headers {
            if let Ok(header_name) = HeaderName::try_from(name.as_str()) {
                client = client.add_header(header_name, value, true);
            }
        }

        if let Some(body_bytes) = self.body {
            client = client.body(ReqBody::Once(body_bytes.into()));
        }

        let mut response = client.send(service).await;

        let status = response
            .status_code
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body: Vec<u8> = response.take_bytes(None).await.unwrap_or_default().to_vec();

        TestResponse { status, body }
    }
}

/// Represents an HTTP test response for assertions.
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Vec<u8>,
}

impl TestResponse {
    /// Asserts that the response status matches the expected code.
    #[must_use]
    pub fn assert_status(self, expected: StatusCode) -> Self {
        assert_eq!(
            self.status, expected,
            "Expected status {expected} but got {} (body: {})",
            self.status,
            String::from_utf8_lossy(&self.body)
        );
        self
    }

    /// Parses the response body as JSON.
    ///
    /// ## Panics
    /// Panics if the body is not valid JSON.
    #[must_use]
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).expect("response body should be JSON")
    }
}
