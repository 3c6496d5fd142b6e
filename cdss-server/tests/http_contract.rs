//! HTTP contract of the `/bot`, CDS Hooks, thread and health endpoints.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use cdss_graph::{GENERAL_RESPONSE, GuidelineContext, GuidelineGraph};
use cdss_model::{ChatModel, CompletionRequest, ResponseFormat};
use cdss_rag::testing::BagOfWordsEmbedder;
use cdss_rag::{NoOpCompressor, RagConfig};
use cdss_server::{AppState, app_router};
use serde_json::{Value, json};

const GUIDELINE: &str = "Stages of Heart Failure\n\n\
Stage A (At Risk for HF): patients at risk for HF but without current or previous symptoms.\n\n\
Stage C (Symptomatic HF): structural heart disease with current or previous symptoms.\x0c\
Pharmacological Treatment for HFrEF\n\n\
In patients with HFrEF and NYHA class II to III symptoms, the use of ARNi is recommended.";

struct StubModel;

#[async_trait]
impl ChatModel for StubModel {
    fn name(&self) -> &str {
        "stub"
    }

    async fn complete(&self, request: CompletionRequest) -> cdss_model::Result<String> {
        let prompt = request.messages.last().map(|m| m.content.to_lowercase()).unwrap_or_default();
        if request.response_format == ResponseFormat::JsonObject {
            let query = prompt.split("user query:").nth(1).unwrap_or_default();
            let medical = ["heart", "hf", "stage"].iter().any(|t| query.contains(t));
            let label = if medical { "medical" } else { "general" };
            return Ok(format!(r#"{{"intent":"{label}"}}"#));
        }
        Ok("Guideline-directed medical therapy is recommended.".to_string())
    }
}

fn graph(dir: &Path) -> Arc<GuidelineGraph> {
    let config = RagConfig::builder()
        .chunk_size(120)
        .chunk_overlap(20)
        .persist_dir(dir.join("index_db"))
        .build()
        .expect("valid config");
    let embedder = Arc::new(BagOfWordsEmbedder::new(32));
    let context = Arc::new(GuidelineContext::new(config, embedder, Arc::new(NoOpCompressor)));
    Arc::new(GuidelineGraph::new(Arc::new(StubModel), context))
}

fn guideline(dir: &Path) -> PathBuf {
    let path = dir.join("hf.txt");
    std::fs::write(&path, GUIDELINE).expect("write guideline");
    path
}

async fn spawn_server(state: AppState) -> (String, tokio::task::JoinHandle<()>) {
    let app = app_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("listener addr");

    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.expect("server run");
    });

    (format!("http://{}", addr), handle)
}

fn hook_request(hook_instance: &str) -> Value {
    json!({
        "hook": "patient-view",
        "hookInstance": hook_instance,
        "context": {"patientId": "smart-1288992", "userId": "Practitioner/1"},
        "prefetch": {
            "patient": {"resourceType": "Patient", "birthDate": "1948-01-08", "gender": "female"},
            "conditions": {"resourceType": "Bundle", "entry": [
                {"resource": {"resourceType": "Condition", "code": {"text": "Chronic systolic heart failure"}}}
            ]},
            "medications": {"resourceType": "Bundle", "entry": []}
        }
    })
}

#[tokio::test]
async fn health_and_discovery_are_always_available() {
    let (base, handle) = spawn_server(AppState::unavailable("no key", "missing.pdf")).await;
    let client = reqwest::Client::new();

    let health: Value =
        client.get(format!("{base}/health")).send().await.unwrap().json().await.unwrap();
    assert_eq!(health, json!({"status": "ok", "service": "cdss-server"}));

    let discovery = client.get(format!("{base}/cds-services")).send().await.unwrap();
    assert!(discovery.status().is_success());
    let body: Value = discovery.json().await.unwrap();
    let services = body["services"].as_array().unwrap();
    assert_eq!(services.len(), 1);
    assert_eq!(services[0]["id"], "heart-failure-guideline");
    assert_eq!(services[0]["prefetch"]["patient"], "Patient/{{context.patientId}}");

    handle.abort();
}

#[tokio::test]
async fn uninitialized_pipeline_answers_503() {
    let (base, handle) =
        spawn_server(AppState::unavailable("GROQ_API_KEY is not set", "missing.pdf")).await;
    let client = reqwest::Client::new();

    let bot = client
        .post(format!("{base}/bot"))
        .json(&json!({"message": "What is HFrEF?"}))
        .send()
        .await
        .unwrap();
    assert_eq!(bot.status().as_u16(), 503);
    let body: Value = bot.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("GROQ_API_KEY"));

    let hook = client
        .post(format!("{base}/cds-services/heart-failure-guideline"))
        .json(&hook_request("instance-503"))
        .send()
        .await
        .unwrap();
    assert_eq!(hook.status().as_u16(), 503);

    handle.abort();
}

#[tokio::test]
async fn bot_returns_output_and_threads_are_inspectable() {
    let dir = tempfile::tempdir().unwrap();
    let state = AppState::new(graph(dir.path()), guideline(dir.path()));
    let (base, handle) = spawn_server(state).await;
    let client = reqwest::Client::new();

    let general: Value = client
        .post(format!("{base}/bot"))
        .json(&json!({"message": "Tell me a joke"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(general["output"], GENERAL_RESPONSE);

    let medical = client
        .post(format!("{base}/bot"))
        .json(&json!({"message": "What are the stages of heart failure?", "thread_id": "ward-7"}))
        .send()
        .await
        .unwrap();
    assert!(medical.status().is_success());
    let body: Value = medical.json().await.unwrap();
    assert_eq!(body["output"], "Guideline-directed medical therapy is recommended.");

    let checkpoint: Value = client
        .get(format!("{base}/threads/ward-7"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(checkpoint["node"], "generation");
    assert_eq!(checkpoint["state"]["intent"], "medical");
    assert_eq!(checkpoint["step"], 6);

    let default_thread = client.get(format!("{base}/threads/streamlit-thread-1")).send().await.unwrap();
    assert!(default_thread.status().is_success());

    let unknown = client.get(format!("{base}/threads/nobody")).send().await.unwrap();
    assert_eq!(unknown.status().as_u16(), 404);

    let empty = client.post(format!("{base}/bot")).json(&json!({"message": "  "})).send().await.unwrap();
    assert_eq!(empty.status().as_u16(), 400);

    handle.abort();
}

#[tokio::test]
async fn cds_hook_returns_one_guideline_card() {
    let dir = tempfile::tempdir().unwrap();
    let state = AppState::new(graph(dir.path()), guideline(dir.path()))
        .with_frontend_url(Some("https://cdss.example/chat".to_string()));
    let (base, handle) = spawn_server(state).await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{base}/cds-services/heart-failure-guideline"))
        .json(&hook_request("b8c6e3a2-hook"))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
    let body: Value = response.json().await.unwrap();
    let cards = body["cards"].as_array().unwrap();
    assert_eq!(cards.len(), 1);
    assert_eq!(cards[0]["summary"], "Heart Failure Guideline Recommendation");
    assert_eq!(cards[0]["indicator"], "info");
    assert_eq!(cards[0]["detail"], "Guideline-directed medical therapy is recommended.");
    assert_eq!(cards[0]["source"]["label"], "2022 AHA/ACC/HFSA Guideline for HF Management");
    assert_eq!(cards[0]["links"][0]["url"], "https://cdss.example/chat");

    let checkpoint: Value = client
        .get(format!("{base}/threads/b8c6e3a2-hook"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let query = checkpoint["state"]["query"][0]["content"].as_str().unwrap();
    assert!(query.contains("female patient"));
    assert!(query.contains("Chronic systolic heart failure"));
    assert!(query.contains("no active medications"));

    let unknown = client
        .post(format!("{base}/cds-services/diabetes-guideline"))
        .json(&hook_request("other"))
        .send()
        .await
        .unwrap();
    assert_eq!(unknown.status().as_u16(), 404);

    handle.abort();
}

#[tokio::test]
async fn pipeline_failures_answer_500() {
    let dir = tempfile::tempdir().unwrap();
    let state = AppState::new(graph(dir.path()), dir.path().join("missing.pdf"));
    let (base, handle) = spawn_server(state).await;

    let response = reqwest::Client::new()
        .post(format!("{base}/bot"))
        .json(&json!({"message": "What are the stages of heart failure?"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 500);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("missing.pdf"));

    handle.abort();
}
