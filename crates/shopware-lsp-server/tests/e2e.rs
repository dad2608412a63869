//! End-to-end tests for the Shopware LSP server.
//!
//! These tests exercise the full LSP protocol stack using tower-lsp's
//! in-process service, sending JSON-RPC requests and verifying responses.

use futures::StreamExt;
use serde_json::json;
use tower::{Service, ServiceExt};
use tower_lsp::jsonrpc::{Request, Response};
use tower_lsp::LspService;

use shopware_lsp_server::Backend;

struct TestServer {
    service: LspService<Backend>,
    _workspace: tempfile::TempDir,
    _cache: tempfile::TempDir,
    workspace_uri: String,
}

impl TestServer {
    fn new() -> Self {
        let workspace = tempfile::TempDir::new().unwrap();
        let cache = tempfile::TempDir::new().unwrap();
        let (service, socket) =
            shopware_lsp_server::build_service(cache.path().to_path_buf(), "dev").unwrap();

        // Drain server→client messages so notifications don't block.
        tokio::spawn(async move {
            socket.collect::<Vec<_>>().await;
        });

        let workspace_uri = format!("file://{}", workspace.path().display());
        TestServer {
            service,
            _workspace: workspace,
            _cache: cache,
            workspace_uri,
        }
    }

    async fn call(&mut self, request: Request) -> Option<Response> {
        self.service
            .ready()
            .await
            .unwrap()
            .call(request)
            .await
            .unwrap()
    }

    async fn initialize(&mut self) -> serde_json::Value {
        let request = Request::build("initialize")
            .params(json!({
                "capabilities": {},
                "rootUri": self.workspace_uri,
            }))
            .id(1)
            .finish();
        let result = extract_result(self.call(request).await);

        let initialized = Request::build("initialized").params(json!({})).finish();
        assert!(self.call(initialized).await.is_none());

        result
    }

    async fn did_open(&mut self, uri: &str, language: &str, text: &str) {
        let request = Request::build("textDocument/didOpen")
            .params(json!({
                "textDocument": {
                    "uri": uri,
                    "languageId": language,
                    "version": 1,
                    "text": text
                }
            }))
            .finish();
        assert!(self.call(request).await.is_none());
    }

    async fn shutdown(&mut self) {
        let request = Request::build("shutdown").id(99).finish();
        assert!(self.call(request).await.is_some());
    }
}

fn extract_result(response: Option<Response>) -> serde_json::Value {
    let response = response.expect("expected a response");
    let serialized = serde_json::to_value(&response).unwrap();
    serialized.get("result").cloned().unwrap_or(json!(null))
}

#[tokio::test(flavor = "current_thread")]
async fn test_initialize_advertises_capabilities() {
    let mut server = TestServer::new();
    let result = server.initialize().await;

    let capabilities = result.get("capabilities").expect("capabilities");
    assert_eq!(capabilities["textDocumentSync"], 1);
    assert_eq!(capabilities["definitionProvider"], true);
    assert_eq!(capabilities["referencesProvider"], true);
    assert_eq!(capabilities["hoverProvider"], true);
    assert_eq!(capabilities["codeLensProvider"]["resolveProvider"], true);
    assert_eq!(
        capabilities["diagnosticProvider"]["interFileDependencies"],
        true
    );

    let triggers = capabilities["completionProvider"]["triggerCharacters"]
        .as_array()
        .expect("trigger characters");
    assert!(triggers.contains(&json!("\"")));
    assert!(triggers.contains(&json!("'")));
    // Deduplicated across providers.
    let quotes = triggers.iter().filter(|c| **c == json!("'")).count();
    assert_eq!(quotes, 1);

    assert_eq!(result["serverInfo"]["name"], "shopware-lsp");

    server.shutdown().await;
}

#[tokio::test(flavor = "current_thread")]
async fn test_missing_snippet_diagnostics_pull() {
    let mut server = TestServer::new();
    server.initialize().await;

    let uri = "file:///test/page.html.twig";
    server
        .did_open(uri, "twig", "{{ 'missing.key'|trans }}")
        .await;

    let request = Request::build("textDocument/diagnostic")
        .params(json!({"textDocument": {"uri": uri}}))
        .id(2)
        .finish();
    let result = extract_result(server.call(request).await);

    let items = result["items"].as_array().expect("diagnostic items");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["code"], "frontend.snippet.missing");
    assert_eq!(items[0]["data"]["snippetText"], "missing.key");

    server.shutdown().await;
}

#[tokio::test(flavor = "current_thread")]
async fn test_code_lens_on_twig_blocks() {
    let mut server = TestServer::new();
    server.initialize().await;

    let uri = "file:///test/base.html.twig";
    server
        .did_open(uri, "twig", "{% block base_main %}{% endblock %}")
        .await;

    let request = Request::build("textDocument/codeLens")
        .params(json!({"textDocument": {"uri": uri}}))
        .id(2)
        .finish();
    let result = extract_result(server.call(request).await);

    let lenses = result.as_array().expect("code lenses");
    assert_eq!(lenses.len(), 1);
    assert_eq!(lenses[0]["data"]["provider"], "twig.block");
    assert_eq!(lenses[0]["data"]["name"], "base_main");

    server.shutdown().await;
}

#[tokio::test(flavor = "current_thread")]
async fn test_document_update_is_reflected() {
    let mut server = TestServer::new();
    server.initialize().await;

    let uri = "file:///test/c.html.twig";
    server.did_open(uri, "twig", "{% block x %}").await;

    let change = Request::build("textDocument/didChange")
        .params(json!({
            "textDocument": {"uri": uri, "version": 2},
            "contentChanges": [{"text": "{% block y %}"}]
        }))
        .finish();
    assert!(server.call(change).await.is_none());

    // The code lens reflects the v2 text.
    let request = Request::build("textDocument/codeLens")
        .params(json!({"textDocument": {"uri": uri}}))
        .id(2)
        .finish();
    let result = extract_result(server.call(request).await);
    assert_eq!(result[0]["data"]["name"], "y");

    server.shutdown().await;
}

#[tokio::test(flavor = "current_thread")]
async fn test_force_reindex_returns_immediately() {
    let mut server = TestServer::new();
    server.initialize().await;

    let request = Request::build("shopware/forceReindex").id(7).finish();
    let result = extract_result(server.call(request).await);
    assert_eq!(result["message"], "Force reindexing started");

    server.shutdown().await;
}

#[tokio::test(flavor = "current_thread")]
async fn test_completion_on_unopened_document_is_empty() {
    let mut server = TestServer::new();
    server.initialize().await;

    let request = Request::build("textDocument/completion")
        .params(json!({
            "textDocument": {"uri": "file:///not/open.xml"},
            "position": {"line": 0, "character": 0}
        }))
        .id(3)
        .finish();
    let result = extract_result(server.call(request).await);

    // Well-formed requests on unknown documents return empty results,
    // not errors.
    assert_eq!(result["isIncomplete"], false);
    assert_eq!(result["items"].as_array().unwrap().len(), 0);

    server.shutdown().await;
}
