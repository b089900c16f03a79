use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::io::Write;
use std::net::SocketAddr;

const PASSAGE: &str = "The river town grew around a single wooden bridge built by early settlers. \
Merchants arrived within a decade and opened shops along the northern bank. \
A flood in the spring of one year destroyed the bridge and most of the market. \
The town rebuilt the crossing in stone and it still stands today.";

fn smartsum() -> std::process::Command {
    let mut cmd = std::process::Command::new(assert_cmd::cargo::cargo_bin!("smartsum"));
    cmd.env_remove("SMARTSUM_ENV_FILE")
        .env_remove("SMARTSUM_HF_API_KEY")
        .env_remove("HF_API_TOKEN");
    cmd
}

/// Inference stand-in: `/good` answers, `/garbled` sends an unusable body, anything else is down.
fn spawn_inference(rt: &tokio::runtime::Runtime) -> SocketAddr {
    rt.block_on(async {
        use axum::{extract::Path, http::StatusCode, routing::post, Json, Router};
        let app = Router::new().route(
            "/:model",
            post(
                |Path(model): Path<String>, Json(body): Json<serde_json::Value>| async move {
                    match model.as_str() {
                        "good" => {
                            let chars = body["inputs"].as_str().map(|s| s.chars().count());
                            (
                                StatusCode::OK,
                                Json(serde_json::json!([
                                    { "summary_text": format!("summary of {} chars", chars.unwrap_or(0)) }
                                ])),
                            )
                        }
                        "garbled" => (StatusCode::OK, Json(serde_json::json!({"unexpected": true}))),
                        _ => (
                            StatusCode::SERVICE_UNAVAILABLE,
                            Json(serde_json::json!({"error": "loading"})),
                        ),
                    }
                },
            ),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("axum serve");
        });
        addr
    })
}

fn summarize_json(addr: SocketAddr, light: &str, fallback: &str) -> serde_json::Value {
    let out = smartsum()
        .env("SMARTSUM_HF_BASE_URL", format!("http://{addr}"))
        .args([
            "summarize",
            "--output",
            "json",
            "--text",
            PASSAGE,
            "--light-model",
            light,
            "--fallback-model",
            fallback,
        ])
        .output()
        .expect("run smartsum summarize");
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    serde_json::from_slice(&out.stdout).expect("parse summarize json")
}

#[test]
fn primary_model_answers_first() {
    let rt = tokio::runtime::Runtime::new().expect("tokio runtime");
    let addr = spawn_inference(&rt);
    let v = summarize_json(addr, "good", "down");
    assert_eq!(v["kind"].as_str(), Some("summarize"));
    assert_eq!(v["report"]["strategies"], serde_json::json!(["primary_remote"]));
    let summary = v["report"]["chunks"][0]["summary_text"].as_str().unwrap_or("");
    assert!(summary.starts_with("summary of "), "{summary}");
    assert!(v["report"]["text"]
        .as_str()
        .unwrap_or("")
        .starts_with("🌟 Summary: Untitled\n\n📌 summary of "));
}

#[test]
fn alternative_model_used_when_primary_fails() {
    let rt = tokio::runtime::Runtime::new().expect("tokio runtime");
    let addr = spawn_inference(&rt);
    let v = summarize_json(addr, "down", "good");
    assert_eq!(v["report"]["strategies"], serde_json::json!(["alternative_remote"]));
    let summary = v["report"]["chunks"][0]["summary_text"].as_str().unwrap_or("");
    let sent: usize = summary
        .trim_start_matches("summary of ")
        .trim_end_matches(" chars")
        .parse()
        .expect("char count");
    assert!(sent <= 512, "alternative payload is truncated to 512 chars");
}

#[test]
fn extractive_summary_when_both_remotes_fail() {
    let rt = tokio::runtime::Runtime::new().expect("tokio runtime");
    let addr = spawn_inference(&rt);
    let v = summarize_json(addr, "garbled", "down");
    assert_eq!(v["report"]["strategies"], serde_json::json!(["extractive"]));
    // Four sentences keep the top two by score; the opening sentence ranks first.
    let summary = v["report"]["chunks"][0]["summary_text"].as_str().unwrap_or("");
    assert!(summary.starts_with("The river town grew"), "{summary}");
    assert!(summary.ends_with('.'));
}

#[test]
fn short_text_is_reported_not_summarized() {
    smartsum()
        .args(["summarize", "--offline", "--text", "Too short."])
        .assert()
        .success()
        .stdout(predicate::str::contains("Text is too short to summarize."));
}

#[test]
fn offline_file_summary_is_formatted_with_emoji() {
    let body = format!(
        "<html><head><title>Town History</title></head><body><article><p>{}</p><p>{}</p></article></body></html>",
        PASSAGE,
        "Tourists now visit the bridge every summer. The museum keeps the original plans. \
         Local schools teach the flood story each year. A festival marks the anniversary."
    );
    let mut f = tempfile::Builder::new()
        .suffix(".html")
        .tempfile()
        .expect("tempfile");
    f.write_all(body.as_bytes()).expect("write");

    smartsum()
        .args(["summarize", "--offline", "--file"])
        .arg(f.path())
        .assert()
        .success()
        .stdout(predicate::str::starts_with("🌟 Summary: Town History\n\n📌 "))
        .stdout(predicate::str::contains("📊 "));
}

#[test]
fn offline_summary_respects_chunk_limits() {
    let text = PASSAGE.repeat(6);
    let out = smartsum()
        .args([
            "summarize",
            "--offline",
            "--output",
            "json",
            "--max-chunk-chars",
            "300",
            "--max-chunks",
            "2",
            "--text",
            &text,
        ])
        .output()
        .expect("run smartsum summarize");
    assert!(out.status.success());
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).expect("parse json");
    let chunks = v["report"]["chunks"].as_array().expect("chunks");
    assert_eq!(chunks.len(), 2);
    for c in chunks {
        assert!(c["source_text"].as_str().unwrap_or("").chars().count() <= 300);
    }
}

#[test]
fn summarize_reads_text_from_stdin() {
    assert_cmd::Command::from_std(smartsum())
        .args(["summarize", "--offline", "--text", "-"])
        .write_stdin(PASSAGE)
        .assert()
        .success()
        .stdout(predicate::str::contains("🌟 Summary: Untitled"));
}
