use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::io::Write;

const ARTICLE: &str = r#"<!doctype html>
<html lang="de"><head><title>Garden Notes</title><script>var tracking = 1;</script></head>
<body>
  <nav>Home | Shop | Contact</nav>
  <main>
    <h1>Growing Tomatoes</h1>
    <p>Tomatoes need full sun and regular watering through the summer months.</p>
    <h2>Soil</h2>
    <p>Use loose soil rich in compost.</p>
    <div class="ad-banner">Buy seeds now</div>
  </main>
  <footer>Copyright 2024</footer>
</body></html>"#;

fn html_file(html: &str) -> tempfile::NamedTempFile {
    let mut f = tempfile::Builder::new()
        .suffix(".html")
        .tempfile()
        .expect("tempfile");
    f.write_all(html.as_bytes()).expect("write html");
    f
}

fn smartsum() -> std::process::Command {
    let mut cmd = std::process::Command::new(assert_cmd::cargo::cargo_bin!("smartsum"));
    cmd.env_remove("SMARTSUM_ENV_FILE");
    cmd
}

#[test]
fn extract_json_strips_boilerplate() {
    let f = html_file(ARTICLE);
    let out = smartsum()
        .args(["extract", "--file"])
        .arg(f.path())
        .output()
        .expect("run smartsum extract");
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let v: serde_json::Value = serde_json::from_slice(&out.stdout).expect("parse extract json");
    assert_eq!(v["kind"].as_str(), Some("extract"));
    assert_eq!(v["page"]["title"].as_str(), Some("Garden Notes"));
    assert_eq!(v["page"]["language"].as_str(), Some("de"));
    let text = v["page"]["raw_text"].as_str().unwrap_or("");
    assert!(text.contains("Tomatoes need full sun"));
    for junk in ["Home | Shop", "Buy seeds", "Copyright", "tracking"] {
        assert!(!text.contains(junk), "boilerplate leaked: {junk}");
    }
    assert!(v["stats"]["words"].as_u64().unwrap_or(0) > 10);
}

#[test]
fn extract_structured_lists_headings_in_order() {
    let f = html_file(ARTICLE);
    let out = smartsum()
        .args(["extract", "--structured", "--file"])
        .arg(f.path())
        .output()
        .expect("run smartsum extract --structured");
    assert!(out.status.success());

    let v: serde_json::Value = serde_json::from_slice(&out.stdout).expect("parse json");
    assert_eq!(v["kind"].as_str(), Some("extract_structured"));
    let titles: Vec<&str> = v["page"]["sections"]
        .as_array()
        .expect("sections")
        .iter()
        .filter_map(|s| s["title"].as_str())
        .collect();
    assert_eq!(titles, vec!["Growing Tomatoes", "Soil"]);
    assert_eq!(v["page"]["sections"][1]["content"].as_str(), Some("Use loose soil rich in compost."));
}

#[test]
fn extract_text_output_shows_title_and_stats() {
    let f = html_file(ARTICLE);
    smartsum()
        .args(["extract", "--output", "text", "--file"])
        .arg(f.path())
        .assert()
        .success()
        .stdout(predicate::str::starts_with("📄 Garden Notes"))
        .stdout(predicate::str::contains("📊 "))
        .stdout(predicate::str::contains("min read"));
}

#[test]
fn extract_plain_text_file_is_untitled() {
    let mut f = tempfile::NamedTempFile::new().expect("tempfile");
    f.write_all(b"Just a plain note about tomatoes.\n").expect("write");
    let out = smartsum()
        .args(["extract", "--file"])
        .arg(f.path())
        .output()
        .expect("run smartsum extract");
    assert!(out.status.success());
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).expect("parse json");
    assert_eq!(v["page"]["title"].as_str(), Some("Untitled"));
    assert!(v["page"]["raw_text"]
        .as_str()
        .unwrap_or("")
        .contains("plain note"));
}

#[test]
fn extract_from_url_uses_fixture_server() {
    let rt = tokio::runtime::Runtime::new().expect("tokio runtime");
    let addr = rt.block_on(async {
        use axum::{http::header, http::StatusCode, routing::get, Router};
        let app = Router::new()
            .route(
                "/article",
                get(|| async { ([(header::CONTENT_TYPE, "text/html; charset=utf-8")], ARTICLE) }),
            )
            .route("/gone", get(|| async { (StatusCode::NOT_FOUND, "nope") }));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("axum serve");
        });
        addr
    });

    let out = smartsum()
        .args(["extract", "--url", &format!("http://{addr}/article")])
        .output()
        .expect("run smartsum extract --url");
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).expect("parse json");
    assert_eq!(v["page"]["title"].as_str(), Some("Garden Notes"));
    assert_eq!(
        v["page"]["url"].as_str(),
        Some(format!("http://{addr}/article").as_str())
    );

    // A page that cannot be accessed is the one user-visible failure.
    smartsum()
        .args(["extract", "--url", &format!("http://{addr}/gone")])
        .assert()
        .failure()
        .stderr(predicate::str::contains("❌ Error:"))
        .stderr(predicate::str::contains("404"));
}

#[test]
fn extract_requires_a_source() {
    smartsum()
        .args(["extract"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--url or --file"));
}

#[test]
fn extract_rejects_non_http_urls() {
    smartsum()
        .args(["extract", "--url", "file:///etc/passwd"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("❌ Error:"));
}
