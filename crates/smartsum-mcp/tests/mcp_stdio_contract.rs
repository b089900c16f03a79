use std::collections::BTreeSet;

fn payload(r: &rmcp::model::CallToolResult) -> serde_json::Value {
    let s = r
        .content
        .first()
        .and_then(|c| c.as_text())
        .map(|t| t.text.clone())
        .unwrap_or_default();
    serde_json::from_str(&s).expect("tool payload json")
}

#[test]
fn smartsum_mcp_stdio_offline_contract() {
    // End-to-end (spawns child process) but strictly offline: pages are passed
    // inline and every section is short enough to skip remote summarization.
    let rt = tokio::runtime::Runtime::new().expect("tokio runtime");
    rt.block_on(async {
        use rmcp::{
            model::CallToolRequestParam,
            service::ServiceExt,
            transport::{ConfigureCommandExt, TokioChildProcess},
        };

        let bin = assert_cmd::cargo::cargo_bin!("smartsum");
        let service = ()
            .serve(TokioChildProcess::new(
                tokio::process::Command::new(bin).configure(|cmd| {
                    cmd.args(["mcp-stdio"]);
                    cmd.env_remove("SMARTSUM_ENV_FILE");
                    cmd.env_remove("SMARTSUM_HF_API_KEY");
                    cmd.env_remove("HF_API_TOKEN");
                    // Unroutable, so an accidental remote call fails fast.
                    cmd.env("SMARTSUM_HF_BASE_URL", "http://127.0.0.1:9");
                }),
            )?)
            .await?;

        let tools = service.list_tools(Default::default()).await?;
        let names: BTreeSet<String> = tools
            .tools
            .iter()
            .map(|t| t.name.clone().into_owned())
            .collect();
        for must_have in [
            "smartsum_meta",
            "page_extract",
            "page_extract_structured",
            "text_summarize",
            "page_summarize",
            "page_tree",
            "page_locate",
        ] {
            assert!(names.contains(must_have), "missing tool {must_have}");
        }

        let call = |name: &'static str, args: serde_json::Value| CallToolRequestParam {
            name: name.into(),
            arguments: args.as_object().cloned(),
        };

        let meta = payload(&service.call_tool(call("smartsum_meta", serde_json::json!({}))).await?);
        assert_eq!(meta["schema_version"].as_u64(), Some(1));
        assert_eq!(meta["kind"].as_str(), Some("smartsum_meta"));
        assert_eq!(meta["ok"].as_bool(), Some(true));
        assert_eq!(meta["configured"]["hf_api_key"].as_bool(), Some(false));
        assert_eq!(
            meta["strategies"],
            serde_json::json!(["primary_remote", "alternative_remote", "extractive"])
        );

        let html = "<html><head><title>Pets</title></head><body><main>\
            <h1>Dogs</h1><p>Dogs enjoy long walks.</p>\
            <h2>Training</h2><p>Reward good behaviour right away.</p>\
            </main></body></html>";

        let tree = payload(
            &service
                .call_tool(call("page_tree", serde_json::json!({"html": html, "expand": [0]})))
                .await?,
        );
        assert_eq!(tree["ok"].as_bool(), Some(true));
        assert_eq!(tree["tree"]["nodes"][0]["expanded"].as_bool(), Some(true));
        assert_eq!(tree["tree"]["nodes"][1]["section"]["title"].as_str(), Some("Training"));

        let located = payload(
            &service
                .call_tool(call(
                    "page_locate",
                    serde_json::json!({"html": html, "section": 1, "highlight": true}),
                ))
                .await?,
        );
        assert_eq!(located["located"].as_bool(), Some(true));
        assert_eq!(located["target"]["tag"].as_str(), Some("h2"));
        assert_eq!(located["highlighted"].as_bool(), Some(true));

        let short = payload(
            &service
                .call_tool(call("text_summarize", serde_json::json!({"text": "tiny"})))
                .await?,
        );
        assert_eq!(short["summary"].as_str(), Some("Text is too short to summarize."));
        assert!(short["warning_hints"]["text_too_short"].is_string());

        let bad = payload(
            &service
                .call_tool(call("page_extract", serde_json::json!({})))
                .await?,
        );
        assert_eq!(bad["ok"].as_bool(), Some(false));
        assert_eq!(bad["error"]["code"].as_str(), Some("invalid_params"));
        assert_eq!(bad["error"]["retryable"].as_bool(), Some(false));

        service.cancel().await?;
        Ok::<(), Box<dyn std::error::Error>>(())
    })
    .expect("mcp stdio contract");
}

#[test]
fn smartsum_mcp_stdio_summarize_falls_back_offline() {
    // Remote endpoint unreachable: both remote attempts fail and the extractive
    // summary is returned with a warning.
    let rt = tokio::runtime::Runtime::new().expect("tokio runtime");
    rt.block_on(async {
        use rmcp::{
            model::CallToolRequestParam,
            service::ServiceExt,
            transport::{ConfigureCommandExt, TokioChildProcess},
        };

        let bin = assert_cmd::cargo::cargo_bin!("smartsum");
        let service = ()
            .serve(TokioChildProcess::new(
                tokio::process::Command::new(bin).configure(|cmd| {
                    cmd.args(["mcp-stdio"]);
                    cmd.env_remove("SMARTSUM_ENV_FILE");
                    cmd.env_remove("SMARTSUM_HF_API_KEY");
                    cmd.env_remove("HF_API_TOKEN");
                    cmd.env("SMARTSUM_HF_BASE_URL", "http://127.0.0.1:9");
                    cmd.env("SMARTSUM_TIMEOUT_MS", "2000");
                }),
            )?)
            .await?;

        let text = "Bees visit thousands of flowers every day. \
            They carry pollen between plants as they feed. \
            Many crops depend on this work for a good harvest. \
            Colonies can hold tens of thousands of workers. \
            Winter is survived by clustering for warmth.";
        let v = payload(
            &service
                .call_tool(CallToolRequestParam {
                    name: "text_summarize".into(),
                    arguments: serde_json::json!({ "text": text }).as_object().cloned(),
                })
                .await?,
        );
        assert_eq!(v["ok"].as_bool(), Some(true));
        assert_eq!(v["strategy"].as_str(), Some("extractive"));
        let warnings: Vec<&str> = v["warnings"]
            .as_array()
            .map(|a| a.iter().filter_map(|w| w.as_str()).collect())
            .unwrap_or_default();
        assert!(warnings.contains(&"extractive_fallback_used"));
        assert!(warnings.contains(&"hf_api_key_missing"));
        assert!(v["summary"].as_str().unwrap_or("").starts_with("Bees visit"));

        service.cancel().await?;
        Ok::<(), Box<dyn std::error::Error>>(())
    })
    .expect("mcp stdio fallback contract");
}
