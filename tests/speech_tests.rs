// Integration tests for the HTTP speech synthesizer
//
// A local axum server stands in for the speech service and records what it
// was sent.

use anyhow::Result;
use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use interview_recorder::config::SpeechConfig;
use interview_recorder::{HttpSpeechSynthesizer, SpeechSynthesizer};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

#[derive(Debug, Clone, Default)]
struct SpeakCall {
    authorization: String,
    query: HashMap<String, String>,
    body: Value,
}

type Calls = Arc<Mutex<Vec<SpeakCall>>>;

async fn speak(
    State(calls): State<Calls>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
    Json(body): Json<Value>,
) -> (StatusCode, Vec<u8>) {
    let authorization = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let text = body["text"].as_str().unwrap_or_default().to_string();

    calls.lock().unwrap().push(SpeakCall {
        authorization: authorization.clone(),
        query,
        body,
    });

    if authorization != "Token good-key" {
        return (StatusCode::UNAUTHORIZED, b"bad key".to_vec());
    }
    (StatusCode::OK, format!("RIFF{}", text).into_bytes())
}

async fn start_speech_server() -> Result<(String, Calls)> {
    let calls: Calls = Arc::default();
    let app = Router::new()
        .route("/v1/speak", post(speak))
        .with_state(calls.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    Ok((format!("http://{}/", addr), calls))
}

fn speech_config(base_url: &str, api_key: &str) -> SpeechConfig {
    SpeechConfig {
        api_key: api_key.to_string(),
        base_url: base_url.to_string(),
        model: "aura-asteria-en".to_string(),
        encoding: "linear16".to_string(),
        container: "wav".to_string(),
        timeout_secs: 5,
    }
}

#[tokio::test]
async fn test_synthesize_posts_text_and_returns_audio() -> Result<()> {
    let (base_url, calls) = start_speech_server().await?;
    let synthesizer = HttpSpeechSynthesizer::new(&speech_config(&base_url, "good-key"))?;

    let audio = synthesizer.synthesize("Tell me about yourself").await?;
    assert_eq!(audio, b"RIFFTell me about yourself");

    let calls = calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].authorization, "Token good-key");
    assert_eq!(calls[0].query["model"], "aura-asteria-en");
    assert_eq!(calls[0].query["encoding"], "linear16");
    assert_eq!(calls[0].query["container"], "wav");
    assert_eq!(calls[0].body["text"], "Tell me about yourself");

    Ok(())
}

#[tokio::test]
async fn test_synthesize_reports_service_errors() -> Result<()> {
    let (base_url, _calls) = start_speech_server().await?;
    let synthesizer = HttpSpeechSynthesizer::new(&speech_config(&base_url, "wrong-key"))?;

    let err = synthesizer.synthesize("Hello").await.unwrap_err();
    assert!(err.to_string().contains("401"), "error: {}", err);

    Ok(())
}
