//! Asynchronous task endpoint tests.

mod common;

use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use serde_json::json;
use tower::ServiceExt;

use common::app::{Options, TestApp, app, app_with, json_request};

fn slow() -> Options {
    Options {
        step_delay: Duration::from_millis(100),
        ..Options::default()
    }
}

async fn stop(app: &TestApp, step_id: &str) -> serde_json::Value {
    let response = app
        .send(
            Request::post(format!("/stop_async_task/{step_id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    response.json()
}

#[tokio::test]
async fn submit_poll_download() {
    let app = app().await;

    let response = app
        .post_json(
            "/generate_audio_enhanced_async",
            json!({ "text": "hello there", "step_id": "t1" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    let body = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["step_id"], "t1");
    assert_eq!(body["status"], "pending");
    assert_eq!(body["message"], "Task created and started");

    let status = app.wait_terminal("t1").await;
    assert_eq!(status["status"], "completed");
    assert_eq!(status["step_id"], "t1");
    assert_eq!(status["download_url"], "/download_result?step_id=t1");
    assert!(status["created_at"].as_f64().unwrap() > 0.0);
    assert!(status["completed_at"].as_f64().unwrap() >= status["created_at"].as_f64().unwrap());
    assert!(status["error"].is_null());

    let response = app.get("/download_result?step_id=t1").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.header(header::CONTENT_TYPE), "audio/wav");
    assert_eq!(
        response.header(header::CONTENT_DISPOSITION),
        "attachment; filename=\"audio_t1.wav\"; filename*=UTF-8''audio_t1.wav"
    );
    assert_eq!(&response.body[..4], b"RIFF");
}

#[tokio::test]
async fn streaming_flag_is_ignored_for_tasks() {
    let app = app().await;
    let response = app
        .post_json(
            "/generate_audio_enhanced_async",
            json!({ "text": "hi", "step_id": "s", "streaming": true }),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(app.wait_terminal("s").await["status"], "completed");
}

#[tokio::test]
async fn duplicate_step_id_conflicts() {
    let app = app_with(slow()).await;
    let body = json!({ "text": "hello", "step_id": "dup" });

    let first = app.post_json("/generate_audio_enhanced_async", body.clone()).await;
    assert_eq!(first.status, StatusCode::OK);

    let second = app.post_json("/generate_audio_enhanced_async", body).await;
    assert_eq!(second.status, StatusCode::CONFLICT);
    assert_eq!(second.json()["type"], "conflict");
}

#[tokio::test]
async fn step_id_is_required() {
    let app = app().await;

    let response = app
        .post_json("/generate_audio_enhanced_async", json!({ "text": "hello" }))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.json()["type"], "validation_error");

    let response = app
        .post_json(
            "/generate_audio_enhanced_async",
            json!({ "text": "hello", "step_id": "  " }),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = app.get("/get_task_status").await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.json()["error"], "step_id query parameter is required");

    let response = app.get("/download_result").await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn invalid_parameters_are_rejected_before_queueing() {
    let app = app().await;
    let response = app
        .post_json(
            "/generate_audio_enhanced_async",
            json!({ "text": "hello", "step_id": "bad", "temperature": 5.0 }),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = app.get("/get_task_status?step_id=bad").await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unknown_task_is_not_found() {
    let app = app().await;

    let response = app.get("/get_task_status?step_id=nope").await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    let body = response.json();
    assert_eq!(body["type"], "not_found");
    assert_eq!(body["status"], 404);

    let response = app.get("/download_result?step_id=nope").await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    let response = app
        .send(
            Request::post("/stop_async_task/nope")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn download_before_completion_is_not_ready() {
    let app = app_with(slow()).await;
    app.post_json(
        "/generate_audio_enhanced_async",
        json!({ "text": "word ".repeat(100), "chunk_length": 100, "step_id": "busy" }),
    )
    .await;

    let response = app.get("/download_result?step_id=busy").await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    let body = response.json();
    assert_eq!(body["type"], "not_ready");
    let current = body["metadata"]["current_status"].as_str().unwrap();
    assert!(matches!(current, "pending" | "processing"), "{current}");

    let status = app.get("/get_task_status?step_id=busy").await.json();
    assert!(status["download_url"].is_null());

    stop(&app, "busy").await;
}

#[tokio::test]
async fn cancelled_task_result_is_gone() {
    let app = app_with(slow()).await;
    app.post_json(
        "/generate_audio_enhanced_async",
        json!({ "text": "word ".repeat(100), "chunk_length": 100, "step_id": "c1" }),
    )
    .await;

    let body = stop(&app, "c1").await;
    assert_eq!(body["success"], true);
    assert_eq!(body["step_id"], "c1");
    assert_eq!(body["message"], "Task c1 stopped");

    let status = app.wait_terminal("c1").await;
    assert_eq!(status["status"], "cancelled");
    assert!(status["download_url"].is_null());

    let response = app.get("/download_result?step_id=c1").await;
    assert_eq!(response.status, StatusCode::GONE);
    assert_eq!(response.json()["type"], "cancelled");

    // Stopping again is a no-op that still succeeds.
    let body = stop(&app, "c1").await;
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Task c1 already finished with status cancelled");
}

#[tokio::test]
async fn failed_task_reports_error() {
    let app = app().await;
    app.post_json(
        "/generate_audio_enhanced_async",
        json!({ "text": "hello", "step_id": "f1", "reference_id": "ghost" }),
    )
    .await;

    let status = app.wait_terminal("f1").await;
    assert_eq!(status["status"], "failed");
    assert!(status["error"].as_str().unwrap().contains("ghost"));

    let response = app.get("/download_result?step_id=f1").await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.json()["metadata"]["current_status"], "failed");
}

#[tokio::test]
async fn stop_generation_cancels_everything_live() {
    let app = app_with(slow()).await;
    for id in ["a", "b", "c"] {
        let response = app
            .post_json(
                "/generate_audio_enhanced_async",
                json!({ "text": "word ".repeat(100), "chunk_length": 100, "step_id": id }),
            )
            .await;
        assert_eq!(response.status, StatusCode::OK);
    }

    let response = app
        .send(Request::post("/stop_generation").body(Body::empty()).unwrap())
        .await;
    assert_eq!(response.status, StatusCode::OK);
    let body = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Stopped 3 task(s)");
    assert!(body.get("step_id").is_none());

    for id in ["a", "b", "c"] {
        assert_eq!(app.wait_terminal(id).await["status"], "cancelled");
    }

    let response = app
        .send(Request::post("/stop_generation").body(Body::empty()).unwrap())
        .await;
    assert_eq!(response.json()["message"], "Stopped 0 task(s)");
}

#[tokio::test]
async fn step_ids_are_url_encoded_in_download_links() {
    let app = app().await;
    app.post_json(
        "/generate_audio_enhanced_async",
        json!({ "text": "hello", "step_id": "a b&c" }),
    )
    .await;

    let status = app.wait_terminal("a%20b%26c").await;
    assert_eq!(status["status"], "completed");
    assert_eq!(status["download_url"], "/download_result?step_id=a%20b%26c");

    let url = status["download_url"].as_str().unwrap();
    assert_eq!(app.get(url).await.status, StatusCode::OK);
}

#[tokio::test]
async fn download_filename_cannot_inject_parameters() {
    let app = app().await;
    for (step_id, encoded, fallback, starred) in [
        (
            "a; filename=evil.exe",
            "a%3B%20filename%3Devil.exe",
            "audio_a; filename=evil.exe.wav",
            "audio_a%3B%20filename%3Devil.exe.wav",
        ),
        (
            "q\"uote\\",
            "q%22uote%5C",
            "audio_q\\\"uote\\\\.wav",
            "audio_q%22uote%5C.wav",
        ),
        (
            "任务",
            "%E4%BB%BB%E5%8A%A1",
            "audio___.wav",
            "audio_%E4%BB%BB%E5%8A%A1.wav",
        ),
    ] {
        let response = app
            .post_json(
                "/generate_audio_enhanced_async",
                json!({ "text": "hello", "step_id": step_id }),
            )
            .await;
        assert_eq!(response.status, StatusCode::OK, "{step_id}");
        assert_eq!(app.wait_terminal(encoded).await["status"], "completed");

        let response = app.get(&format!("/download_result?step_id={encoded}")).await;
        assert_eq!(response.status, StatusCode::OK, "{step_id}");
        assert_eq!(
            response.header(header::CONTENT_DISPOSITION),
            format!("attachment; filename=\"{fallback}\"; filename*=UTF-8''{starred}")
        );
    }
}

#[tokio::test]
async fn running_task_holds_the_engine_gate() {
    let app = app_with(slow()).await;
    assert_eq!(app.driver.gate().available(), 1);

    app.post_json(
        "/generate_audio_enhanced_async",
        json!({ "text": "word ".repeat(100), "chunk_length": 100, "step_id": "hog" }),
    )
    .await;
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let status = app.get("/get_task_status?step_id=hog").await.json();
            if status["status"] == "processing" {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("task never started processing");
    // The claim precedes the permit by a moment.
    tokio::time::timeout(Duration::from_secs(5), async {
        while app.driver.gate().available() > 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("task never took the engine gate");
    assert_eq!(app.driver.gate().available(), 0);

    // A synchronous request queues behind the task.
    let router = app.router.clone();
    let mut sync = tokio::spawn(async move {
        router
            .oneshot(json_request(
                Method::POST,
                "/v1/tts",
                &json!({ "text": "waiting" }),
            ))
            .await
            .unwrap()
            .status()
    });
    assert!(
        tokio::time::timeout(Duration::from_millis(300), &mut sync)
            .await
            .is_err(),
        "/v1/tts finished while the task held the gate"
    );

    stop(&app, "hog").await;
    assert_eq!(app.wait_terminal("hog").await["status"], "cancelled");

    let status = tokio::time::timeout(Duration::from_secs(5), sync)
        .await
        .expect("/v1/tts still blocked after the task was cancelled")
        .unwrap();
    assert_eq!(status, StatusCode::OK);

    tokio::time::timeout(Duration::from_secs(5), async {
        while app.driver.gate().available() == 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("capacity was not released");
    assert_eq!(app.driver.gate().available(), 1);
}
