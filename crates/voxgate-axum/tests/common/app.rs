//! Router fixture backed by a temp directory and the tone engine.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, Method, Request, StatusCode, header};
use http_body_util::BodyExt;
use tempfile::TempDir;
use tower::ServiceExt;

use voxgate_axum::bootstrap::{AxumContext, CorsConfig};
use voxgate_axum::routes::create_router;
use voxgate_core::ServiceSettings;
use voxgate_driver::{GenerationDriver, ToneEngine};
use voxgate_store::FsReferenceStore;
use voxgate_tasks::TaskRegistry;

pub const SAMPLE_RATE: u32 = 8000;

pub struct TestApp {
    pub router: Router,
    pub driver: Arc<GenerationDriver>,
    pub registry: Arc<TaskRegistry>,
    pub dir: TempDir,
}

#[derive(Default)]
pub struct Options {
    pub api_key: Option<&'static str>,
    pub step_delay: Duration,
    pub max_text_length: usize,
}

pub async fn app() -> TestApp {
    app_with(Options::default()).await
}

pub async fn app_with(options: Options) -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let store = FsReferenceStore::open(dir.path().join("references"))
        .await
        .unwrap();
    let settings = ServiceSettings {
        max_text_length: options.max_text_length,
        ..ServiceSettings::with_defaults()
    };
    let engine = ToneEngine::new(SAMPLE_RATE).with_step_delay(options.step_delay);

    let ctx = AxumContext::assemble(
        Arc::new(engine),
        Arc::new(store),
        dir.path().join("results"),
        &settings,
    )
    .with_api_key(options.api_key);
    let driver = Arc::clone(&ctx.driver);
    let registry = Arc::clone(&ctx.registry);

    TestApp {
        router: create_router(ctx, &CorsConfig::AllowAll),
        driver,
        registry,
        dir,
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).unwrap_or_else(|e| {
            panic!(
                "expected JSON body, got {:?}: {e}",
                String::from_utf8_lossy(&self.body)
            )
        })
    }

    pub fn header(&self, name: header::HeaderName) -> &str {
        self.headers[name].to_str().unwrap()
    }
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&self, uri: &str) -> TestResponse {
        self.send(Request::get(uri).body(Body::empty()).unwrap()).await
    }

    pub async fn post_json(&self, uri: &str, body: serde_json::Value) -> TestResponse {
        self.send(json_request(Method::POST, uri, &body)).await
    }

    /// Poll task status until it is terminal.
    pub async fn wait_terminal(&self, step_id: &str) -> serde_json::Value {
        tokio::time::timeout(Duration::from_secs(10), async {
            loop {
                let response = self.get(&format!("/get_task_status?step_id={step_id}")).await;
                let body = response.json();
                let status = body["status"].as_str().unwrap_or_default().to_owned();
                if matches!(status.as_str(), "completed" | "failed" | "cancelled") {
                    return body;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("task did not finish in time")
    }
}

pub fn json_request(method: Method, uri: &str, body: &serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap()
}

pub fn msgpack_request<T: serde::Serialize>(uri: &str, body: &T) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/msgpack")
        .body(Body::from(rmp_serde::to_vec_named(body).unwrap()))
        .unwrap()
}

/// Opaque audio bytes for reference uploads; the tone engine only hashes them.
pub fn sample_wav() -> Vec<u8> {
    let mut bytes = b"RIFF".to_vec();
    bytes.extend_from_slice(&[0u8; 2000]);
    bytes
}
