//! Web backend tests: a real listener on an ephemeral port driven by reqwest

mod common;

use common::{chunk_json, write_deck, MockGateway};
use serde_json::{json, Value};
use slidesum::config::AppConfig;
use slidesum::server::{AppBuilder, AppState};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;

struct TestServer {
    base: String,
    client: reqwest::Client,
    mock: Arc<MockGateway>,
    state: AppState,
    _dir: TempDir,
}

async fn spawn_server(mock: MockGateway) -> TestServer {
    let dir = TempDir::new().unwrap();
    let document = write_deck(dir.path());
    let static_dir = dir.path().join("static");
    std::fs::create_dir_all(static_dir.join("data")).unwrap();
    std::fs::write(static_dir.join("index.html"), "<html>viewer</html>").unwrap();

    let config = AppConfig {
        document: document.path().to_path_buf(),
        slide_table_path: static_dir.join("data/slide_texts.json"),
        static_dir,
        ..Default::default()
    };

    let mock = Arc::new(mock);
    let state = AppState::new(&config, mock.clone());
    let app = AppBuilder::new(state.clone()).build();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestServer {
        base: format!("http://{}", addr),
        client: reqwest::Client::new(),
        mock,
        state,
        _dir: dir,
    }
}

#[tokio::test]
async fn viewer_page_and_health() {
    let server = spawn_server(MockGateway::new(chunk_json(&[&[1]]))).await;

    let resp = server.client.get(format!("{}/", server.base)).send().await.unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "<html>viewer</html>");

    let resp = server.client.get(format!("{}/healthz", server.base)).send().await.unwrap();
    assert_eq!(resp.status(), 200);

    let resp = server
        .client
        .get(format!("{}/static/index.html", server.base))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
}

#[tokio::test]
async fn pdf_is_streamed_whatever_the_name() {
    let server = spawn_server(MockGateway::new(chunk_json(&[&[1]]))).await;

    let resp = server
        .client
        .get(format!("{}/pdf/anything.pdf", server.base))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(
        resp.headers().get("content-type").unwrap(),
        "application/pdf"
    );
    assert_eq!(resp.bytes().await.unwrap().as_ref(), b"%PDF-1.4 fake deck");
}

#[tokio::test]
async fn slide_texts_defaults_to_empty_object() {
    let server = spawn_server(MockGateway::new(chunk_json(&[&[1]]))).await;
    let url = format!("{}/slide_texts", server.base);

    let body: Value = server.client.get(&url).send().await.unwrap().json().await.unwrap();
    assert_eq!(body, json!({}));

    std::fs::write(
        server.state.store().slide_table_path(),
        r#"{"1": {"title": "Intro", "summary": "Welcome"}}"#,
    )
    .unwrap();
    let body: Value = server.client.get(&url).send().await.unwrap().json().await.unwrap();
    assert_eq!(body["1"]["title"], "Intro");
}

#[tokio::test]
async fn ask_gemini_answers_with_slide_context() {
    let server = spawn_server(MockGateway::new(chunk_json(&[&[1]]))).await;
    std::fs::write(
        server.state.store().slide_table_path(),
        r#"{"1": {"title": "Intro", "summary": "Welcome"}, "2": {"title": "Disks", "summary": "Platters"}}"#,
    )
    .unwrap();

    let resp = server
        .client
        .post(format!("{}/ask_gemini", server.base))
        .json(&json!({"question": "What is a platter?", "currentSlide": "2"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["response"], "Answer about the slide.");

    let prompt = server.mock.prompts().pop().unwrap();
    assert!(prompt.contains("Question: What is a platter?"));
    assert!(prompt.contains("Slide 1: Intro"));
    assert!(prompt.contains("Slide 2: Disks"));
}

#[tokio::test]
async fn ask_gemini_rejects_bad_requests() {
    let server = spawn_server(MockGateway::new(chunk_json(&[&[1]]))).await;
    let url = format!("{}/ask_gemini", server.base);

    let resp = server
        .client
        .post(&url)
        .json(&json!({"question": "   ", "currentSlide": 3}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "question must not be empty");

    let resp = server
        .client
        .post(&url)
        .json(&json!({"question": "Why?", "currentSlide": 0}))
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_client_error());
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);

    let resp = server
        .client
        .post(&url)
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert!(server.mock.prompts().is_empty());
}

#[tokio::test]
async fn ask_gemini_reports_gateway_failures() {
    let mut mock = MockGateway::new(chunk_json(&[&[1]]));
    mock.fail_questions = true;
    let server = spawn_server(mock).await;

    let resp = server
        .client
        .post(format!("{}/ask_gemini", server.base))
        .json(&json!({"question": "Why?", "currentSlide": 1}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 500);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("API key not valid"));
}

#[tokio::test]
async fn process_pdf_runs_as_pollable_job() {
    let server = spawn_server(MockGateway::new(chunk_json(&[&[1, 2], &[3]])).failing(&[3])).await;

    let resp = server
        .client
        .post(format!("{}/process_pdf", server.base))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], true);
    let job_id = body["job_id"].as_str().unwrap().to_string();

    let job_url = format!("{}/jobs/{}", server.base, job_id);
    let mut job = Value::Null;
    for _ in 0..100 {
        job = server.client.get(&job_url).send().await.unwrap().json().await.unwrap();
        if job["status"] == "succeeded" || job["status"] == "failed" {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(job["status"], "succeeded");
    assert_eq!(job["stage"], "done");
    assert_eq!(job["report"]["slides_total"], 3);
    assert_eq!(job["report"]["failed"][0]["slide_number"], 3);

    let table: Value = server
        .client
        .get(format!("{}/slide_texts", server.base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(table["1"]["title"], "Title 1");
    assert_eq!(table["3"]["title"], "");

    let jobs: Value = server
        .client
        .get(format!("{}/jobs", server.base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(jobs.as_array().unwrap().len(), 1);
    assert_eq!(jobs[0]["id"], job_id.as_str());
}

#[tokio::test]
async fn unknown_jobs_are_reported() {
    let server = spawn_server(MockGateway::new(chunk_json(&[&[1]]))).await;

    let resp = server
        .client
        .get(format!("{}/jobs/{}", server.base, uuid::Uuid::new_v4()))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    let resp = server
        .client
        .get(format!("{}/jobs/not-a-uuid", server.base))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "invalid job id");
}
