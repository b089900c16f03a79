use assert_cmd::prelude::*;
use predicates::prelude::*;

#[test]
fn smartsum_doctor_contract_json_and_bool_flags() {
    let bin = assert_cmd::cargo::cargo_bin!("smartsum");

    // `--check-stdio=false` must be accepted (clap ArgAction::Set) and still emit
    // well-formed JSON with stable keys.
    let out = std::process::Command::new(bin)
        .args(["doctor", "--check-stdio=false", "--timeout-ms", "1"])
        // Ensure we don't accidentally inherit keys from the environment.
        .env_remove("SMARTSUM_ENV_FILE")
        .env_remove("SMARTSUM_HF_API_KEY")
        .env_remove("HF_API_TOKEN")
        .env_remove("SMARTSUM_HF_BASE_URL")
        .env_remove("SMARTSUM_MODEL_HEAVY")
        .output()
        .expect("run smartsum doctor");

    assert!(out.status.success(), "smartsum doctor failed");
    let s = String::from_utf8_lossy(&out.stdout);
    let v: serde_json::Value = serde_json::from_str(&s).expect("parse doctor json");

    assert_eq!(v["schema_version"].as_u64(), Some(1));
    assert_eq!(v["kind"].as_str(), Some("doctor"));
    assert_eq!(v["ok"].as_bool(), Some(true));
    assert_eq!(v["name"].as_str(), Some("smartsum"));
    assert!(v.get("elapsed_ms").is_some());
    assert_eq!(
        v["features"]["stdio"].as_bool(),
        Some(cfg!(feature = "stdio"))
    );

    // Secrets are reported as booleans only.
    assert_eq!(v["configured"]["hf_api_key"].as_bool(), Some(false));
    assert_eq!(
        v["configured"]["models"]["heavy"].as_str(),
        Some("facebook/bart-large-cnn")
    );

    let checks = v["checks"].as_array().expect("checks array");
    let handshake = checks
        .iter()
        .find(|c| c["name"].as_str() == Some("mcp_stdio_handshake"))
        .expect("mcp_stdio_handshake check");
    assert_eq!(handshake["skipped"].as_bool(), Some(true));
    assert_eq!(handshake["ok"].as_bool(), Some(true));
    assert!(handshake.get("elapsed_ms").is_some());
    assert!(handshake.get("error").is_some());
}

#[test]
fn smartsum_doctor_flags_a_bad_base_url_without_leaking_the_key() {
    let mut cmd = std::process::Command::new(assert_cmd::cargo::cargo_bin!("smartsum"));
    cmd.args(["doctor", "--check-stdio=false"])
        .env_remove("SMARTSUM_ENV_FILE")
        .env("SMARTSUM_HF_BASE_URL", "not a url")
        .env("SMARTSUM_HF_API_KEY", "hf_secret_value_123");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("\"hf_base_url_valid\""))
        .stdout(predicate::str::contains("hf_secret_value_123").not())
        .stdout(predicate::str::contains("\"hf_api_key\":true"));

    let out = cmd.output().expect("run smartsum doctor");
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).expect("parse doctor json");
    assert_eq!(v["ok"].as_bool(), Some(false));
}

#[test]
fn smartsum_doctor_text_output_contract() {
    let bin = assert_cmd::cargo::cargo_bin!("smartsum");
    let out = std::process::Command::new(bin)
        .args([
            "doctor",
            "--output",
            "text",
            "--check-stdio=false",
            "--timeout-ms",
            "1",
        ])
        .env_remove("SMARTSUM_ENV_FILE")
        .env_remove("SMARTSUM_HF_API_KEY")
        .env_remove("HF_API_TOKEN")
        .output()
        .expect("run smartsum doctor --output text");

    assert!(out.status.success(), "smartsum doctor failed");
    let s = String::from_utf8_lossy(&out.stdout);
    assert!(s.contains("smartsum "), "expected doctor text output to mention smartsum");
    assert!(s.contains("missing (anonymous)"));
    assert!(s.contains("checks:"), "expected checks summary");
    assert!(s.contains("- mcp_stdio_handshake: skipped"));
}

#[cfg(feature = "stdio")]
#[test]
fn smartsum_doctor_stdio_handshake_lists_tools() {
    let bin = assert_cmd::cargo::cargo_bin!("smartsum");
    let out = std::process::Command::new(bin)
        .args(["doctor", "--timeout-ms", "10000"])
        .env_remove("SMARTSUM_ENV_FILE")
        .output()
        .expect("run smartsum doctor");

    let v: serde_json::Value = serde_json::from_slice(&out.stdout).expect("parse doctor json");
    let handshake = v["checks"]
        .as_array()
        .and_then(|a| a.iter().find(|c| c["name"] == "mcp_stdio_handshake"))
        .cloned()
        .expect("mcp_stdio_handshake check");
    assert_eq!(handshake["ok"].as_bool(), Some(true), "{handshake}");
    assert_eq!(handshake["tool_count"].as_u64(), Some(7));
}
