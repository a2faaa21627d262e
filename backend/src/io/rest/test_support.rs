//! Test harness for the REST handlers: a router over a temporary data
//! directory, driven with `tower::ServiceExt::oneshot`.

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

use super::auth::{USER_ID_HEADER, USER_ROLE_HEADER};
use crate::config::AppConfig;
use crate::domain::FixedClock;
use crate::storage::csv::test_utils::TestEnvironment;
use crate::{build_state, create_router};

pub const ADMIN: (&str, &str) = ("office", "admin");

pub struct TestApp {
    pub env: TestEnvironment,
    router: Router,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl TestResponse {
    pub fn json<T: DeserializeOwned>(&self) -> T {
        serde_json::from_slice(&self.body).expect("response body is not the expected JSON")
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

impl TestApp {
    /// App whose clock is pinned to `today`
    pub async fn on(today: NaiveDate) -> Self {
        let env = TestEnvironment::new().await.expect("test environment");
        let config = AppConfig {
            data_dir: env.base_path.clone(),
            bind_address: "127.0.0.1:0".parse().unwrap(),
            cors_origin: "http://localhost:8080".to_string(),
            currency: "₹".to_string(),
            society_name: "Green Meadows".to_string(),
        };
        let state = build_state(env.connection.clone(), &config, Arc::new(FixedClock::on(today)));
        let router = create_router(state, &config.cors_origin).expect("router");
        Self { env, router }
    }

    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        caller: Option<(&str, &str)>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some((id, role)) = caller {
            builder = builder.header(USER_ID_HEADER, id).header(USER_ROLE_HEADER, role);
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap().to_vec();
        TestResponse {
            status,
            content_type,
            body,
        }
    }
}

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}
