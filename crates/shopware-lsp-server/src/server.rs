//! LSP dispatcher.
//!
//! Routes JSON-RPC requests to the document manager, the scanner, and the
//! provider registries. Indexing runs off the dispatcher; diagnostics are
//! published per URI from spawned tasks.

use shopware_lsp_index::indexers::{
    PhpIndexer, RouteIndexer, ServiceIndexer, SnippetIndexer, TemplateIndexer, ThemeIndexer,
};
use shopware_lsp_index::{FileScanner, HashStore, Indexer};
use shopware_lsp_parser::{position, ParserPool};
use shopware_lsp_providers::completion::{
    RouteCompletionProvider, ServiceCompletionProvider, SnippetCompletionProvider,
};
use shopware_lsp_providers::code_action::SnippetCodeActionProvider;
use shopware_lsp_providers::code_lens::TwigBlockCodeLensProvider;
use shopware_lsp_providers::commands::SnippetCommandProvider;
use shopware_lsp_providers::definition::{
    RouteDefinitionProvider, ServiceDefinitionProvider, SnippetDefinitionProvider,
    TemplateDefinitionProvider,
};
use shopware_lsp_providers::diagnostics::{ServiceDiagnosticsProvider, SnippetDiagnosticsProvider};
use shopware_lsp_providers::hover::{ServiceHoverProvider, SnippetHoverProvider};
use shopware_lsp_providers::references::ServiceReferencesProvider;
use shopware_lsp_providers::DocumentContext;
use shopware_lsp_types::FilePosition;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::*;
use tower_lsp::{Client, ClientSocket, LanguageServer, LspService};

use crate::documents::DocumentManager;
use crate::notifications::{
    ForceReindexResponse, IndexingCompleted, IndexingCompletedParams, IndexingStarted,
    IndexingStartedParams,
};
use crate::registry::ProviderRegistry;
use crate::version;

/// Strip a single `file://` prefix; file identity is the filesystem path.
pub fn uri_to_path(uri: &str) -> &str {
    uri.strip_prefix("file://").unwrap_or(uri)
}

/// Lowercase extension with leading dot, empty when the path has none.
pub fn extension_of(path: &str) -> String {
    Path::new(path)
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()))
        .unwrap_or_default()
}

/// Shared server state, accessible from spawned tasks.
pub struct BackendState {
    pub cache_dir: PathBuf,
    pub version: String,
    pub documents: Arc<DocumentManager>,
    pub scanner: Arc<FileScanner>,
    pub indexers: Vec<Arc<dyn Indexer>>,
    pub php_index: Arc<PhpIndexer>,
    pub providers: Arc<ProviderRegistry>,
    indexing: AtomicBool,
}

impl BackendState {
    /// Build a provider context for a document and run `f` against it under
    /// the document read lock. Providers must not block.
    fn with_context<R>(
        &self,
        uri: &str,
        at: Option<(u32, u32)>,
        f: impl FnOnce(&DocumentContext<'_>) -> R,
    ) -> Option<R> {
        self.documents.with_document(uri, |doc| {
            let path = uri_to_path(uri);
            let extension = extension_of(path);
            let root = doc.root_node();
            let offset = at.and_then(|(line, character)| {
                position::position_to_byte(&doc.text, line, character)
            });
            let node = match (at, root) {
                (Some((line, character)), Some(root)) => {
                    position::node_at_position(root, &doc.text, line, character)
                }
                _ => None,
            };
            let php = (extension == ".php")
                .then(|| self.php_index.request_context(path, node, &doc.text));
            let ctx = DocumentContext {
                uri,
                path,
                extension,
                text: &doc.text,
                root,
                node,
                position: at
                    .map(|(line, character)| FilePosition::new(line, character))
                    .unwrap_or_default(),
                offset,
                php,
            };
            f(&ctx)
        })
    }

    /// Diagnostics from every provider for one open document.
    fn compute_diagnostics(&self, uri: &str) -> Option<(Vec<Diagnostic>, i32)> {
        let version = self.documents.version(uri)?;
        let diagnostics = self
            .with_context(uri, None, |ctx| {
                let mut all = Vec::new();
                for provider in &self.providers.diagnostics {
                    all.extend(provider.diagnostics(ctx));
                }
                all
            })
            .unwrap_or_default();
        Some((diagnostics, version))
    }
}

pub struct Backend {
    client: Client,
    state: Arc<BackendState>,
}

impl Backend {
    pub fn new(client: Client, state: Arc<BackendState>) -> Self {
        // Watcher-driven changes republish diagnostics for open documents.
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<()>();
        state.scanner.set_on_update(Box::new(move || {
            let _ = tx.send(());
        }));

        let update_client = client.clone();
        let update_state = state.clone();
        tokio::spawn(async move {
            while rx.recv().await.is_some() {
                for (uri, _) in update_state.documents.open_documents() {
                    publish_diagnostics(update_client.clone(), update_state.clone(), uri).await;
                }
            }
        });

        Backend { client, state }
    }

    /// `shopware/forceReindex`: answer immediately, rebuild asynchronously.
    pub async fn force_reindex(&self) -> Result<ForceReindexResponse> {
        let client = self.client.clone();
        let state = self.state.clone();
        tokio::spawn(async move {
            run_index_all(client, state, true).await;
        });
        Ok(ForceReindexResponse {
            message: "Force reindexing started".to_string(),
        })
    }

    fn spawn_publish_diagnostics(&self, uri: String) {
        let client = self.client.clone();
        let state = self.state.clone();
        tokio::spawn(async move {
            publish_diagnostics(client, state, uri).await;
        });
    }
}

/// One full diff scan wrapped in the progress notifications. A second call
/// while a scan runs is coalesced into a no-op.
async fn run_index_all(client: Client, state: Arc<BackendState>, force: bool) {
    if state.indexing.swap(true, Ordering::SeqCst) {
        tracing::debug!("reindex already in progress, request coalesced");
        return;
    }
    let started = Instant::now();

    client
        .send_notification::<IndexingStarted>(IndexingStartedParams {
            message: "Indexing started".to_string(),
        })
        .await;

    let scanner = state.scanner.clone();
    let result = tokio::task::spawn_blocking(move || {
        if force {
            scanner.clear_hashes()?;
        }
        scanner.index_all()
    })
    .await;

    match result {
        Ok(Ok(())) => {}
        Ok(Err(err)) => tracing::error!("indexing failed: {}", err),
        Err(err) => tracing::error!("indexing task panicked: {}", err),
    }

    client
        .send_notification::<IndexingCompleted>(IndexingCompletedParams {
            message: "Indexing completed".to_string(),
            time_in_seconds: started.elapsed().as_secs_f64(),
        })
        .await;

    state.indexing.store(false, Ordering::SeqCst);
}

async fn publish_diagnostics(client: Client, state: Arc<BackendState>, uri: String) {
    let Some((diagnostics, version)) = state.compute_diagnostics(&uri) else {
        return;
    };
    let Ok(url) = Url::parse(&uri) else {
        return;
    };
    client
        .publish_diagnostics(url, diagnostics, Some(version))
        .await;
}

#[allow(deprecated)]
fn extract_root_path(params: &InitializeParams) -> PathBuf {
    if let Some(path) = params.root_path.as_ref().filter(|path| !path.is_empty()) {
        return PathBuf::from(path);
    }
    if let Some(uri) = params.root_uri.as_ref() {
        return PathBuf::from(uri_to_path(uri.as_str()));
    }
    if let Some(folder) = params
        .workspace_folders
        .as_ref()
        .and_then(|folders| folders.first())
    {
        return PathBuf::from(uri_to_path(folder.uri.as_str()));
    }
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

fn file_operation_filters() -> FileOperationRegistrationOptions {
    let filters = ["**/*.xml", "**/*.php"]
        .iter()
        .map(|glob| FileOperationFilter {
            scheme: None,
            pattern: FileOperationPattern {
                glob: glob.to_string(),
                matches: None,
                options: None,
            },
        })
        .collect();
    FileOperationRegistrationOptions { filters }
}

fn paths_from_uris<'a>(uris: impl Iterator<Item = &'a str>) -> Vec<PathBuf> {
    uris.map(|uri| PathBuf::from(uri_to_path(uri))).collect()
}

#[tower_lsp::async_trait]
impl LanguageServer for Backend {
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        let root = extract_root_path(&params);
        tracing::info!("workspace root: {}", root.display());
        self.state.scanner.set_root(root);

        if let Err(err) = self.state.scanner.start_watcher() {
            tracing::warn!("failed to start file watcher: {}", err);
        }

        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                text_document_sync: Some(TextDocumentSyncCapability::Kind(
                    TextDocumentSyncKind::FULL,
                )),
                completion_provider: Some(CompletionOptions {
                    trigger_characters: Some(self.state.providers.trigger_characters()),
                    ..Default::default()
                }),
                definition_provider: Some(OneOf::Left(true)),
                references_provider: Some(OneOf::Left(true)),
                hover_provider: Some(HoverProviderCapability::Simple(true)),
                code_lens_provider: Some(CodeLensOptions {
                    resolve_provider: Some(true),
                }),
                code_action_provider: Some(CodeActionProviderCapability::Options(
                    CodeActionOptions {
                        code_action_kinds: Some(self.state.providers.code_action_kinds()),
                        work_done_progress_options: WorkDoneProgressOptions::default(),
                        resolve_provider: None,
                    },
                )),
                diagnostic_provider: Some(DiagnosticServerCapabilities::Options(
                    DiagnosticOptions {
                        identifier: None,
                        inter_file_dependencies: true,
                        workspace_diagnostics: false,
                        work_done_progress_options: WorkDoneProgressOptions::default(),
                    },
                )),
                execute_command_provider: Some(ExecuteCommandOptions {
                    commands: self.state.providers.command_names(),
                    work_done_progress_options: WorkDoneProgressOptions::default(),
                }),
                workspace: Some(WorkspaceServerCapabilities {
                    workspace_folders: None,
                    file_operations: Some(WorkspaceFileOperationsServerCapabilities {
                        did_create: Some(file_operation_filters()),
                        did_rename: Some(file_operation_filters()),
                        did_delete: Some(file_operation_filters()),
                        will_create: None,
                        will_rename: None,
                        will_delete: None,
                    }),
                }),
                ..Default::default()
            },
            server_info: Some(ServerInfo {
                name: "shopware-lsp".to_string(),
                version: Some(self.state.version.clone()),
            }),
        })
    }

    async fn initialized(&self, _params: InitializedParams) {
        let force = version::should_force_reindex(&self.state.cache_dir, &self.state.version);
        if force {
            tracing::info!("version changed to {}, forcing reindex", self.state.version);
        }

        let client = self.client.clone();
        let state = self.state.clone();
        tokio::spawn(async move {
            run_index_all(client, state, force).await;
        });
    }

    async fn shutdown(&self) -> Result<()> {
        self.state.documents.close_all();
        self.state.scanner.cancel();
        for indexer in &self.state.indexers {
            if let Err(err) = indexer.close() {
                tracing::warn!("closing indexer {} failed: {}", indexer.id(), err);
            }
        }
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let uri = params.text_document.uri.to_string();
        self.state
            .documents
            .open(&uri, params.text_document.text, params.text_document.version);
        self.spawn_publish_diagnostics(uri);
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let uri = params.text_document.uri.to_string();
        // Full document sync: the last change carries the complete text.
        let Some(change) = params.content_changes.into_iter().last() else {
            return;
        };
        self.state
            .documents
            .update(&uri, change.text, params.text_document.version);
        self.spawn_publish_diagnostics(uri);
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let uri = params.text_document.uri;
        self.state.documents.close(uri.as_str());
        self.client.publish_diagnostics(uri, Vec::new(), None).await;
    }

    async fn completion(&self, params: CompletionParams) -> Result<Option<CompletionResponse>> {
        let uri = params.text_document_position.text_document.uri.to_string();
        let pos = params.text_document_position.position;

        let items = self
            .state
            .with_context(&uri, Some((pos.line, pos.character)), |ctx| {
                let mut items = Vec::new();
                for provider in &self.state.providers.completion {
                    items.extend(provider.completions(ctx));
                }
                items
            })
            .unwrap_or_default();

        Ok(Some(CompletionResponse::List(CompletionList {
            is_incomplete: false,
            items,
        })))
    }

    async fn goto_definition(
        &self,
        params: GotoDefinitionParams,
    ) -> Result<Option<GotoDefinitionResponse>> {
        let uri = params
            .text_document_position_params
            .text_document
            .uri
            .to_string();
        let pos = params.text_document_position_params.position;

        let locations = self
            .state
            .with_context(&uri, Some((pos.line, pos.character)), |ctx| {
                let mut locations = Vec::new();
                for provider in &self.state.providers.definition {
                    locations.extend(provider.definitions(ctx));
                }
                locations
            })
            .unwrap_or_default();

        if locations.is_empty() {
            Ok(None)
        } else {
            Ok(Some(GotoDefinitionResponse::Array(locations)))
        }
    }

    async fn references(&self, params: ReferenceParams) -> Result<Option<Vec<Location>>> {
        let uri = params.text_document_position.text_document.uri.to_string();
        let pos = params.text_document_position.position;

        let locations = self
            .state
            .with_context(&uri, Some((pos.line, pos.character)), |ctx| {
                let mut locations = Vec::new();
                for provider in &self.state.providers.references {
                    locations.extend(provider.references(ctx));
                }
                locations
            })
            .unwrap_or_default();

        if locations.is_empty() {
            Ok(None)
        } else {
            Ok(Some(locations))
        }
    }

    async fn hover(&self, params: HoverParams) -> Result<Option<Hover>> {
        let uri = params
            .text_document_position_params
            .text_document
            .uri
            .to_string();
        let pos = params.text_document_position_params.position;

        let contents = self
            .state
            .with_context(&uri, Some((pos.line, pos.character)), |ctx| {
                let mut parts = Vec::new();
                for provider in &self.state.providers.hover {
                    if let Some(content) = provider.hover(ctx) {
                        parts.push(content);
                    }
                }
                parts
            })
            .unwrap_or_default();

        if contents.is_empty() {
            return Ok(None);
        }
        Ok(Some(Hover {
            contents: HoverContents::Markup(MarkupContent {
                kind: MarkupKind::Markdown,
                value: contents.join("\n\n---\n\n"),
            }),
            range: None,
        }))
    }

    async fn code_lens(&self, params: CodeLensParams) -> Result<Option<Vec<CodeLens>>> {
        let uri = params.text_document.uri.to_string();

        let lenses = self
            .state
            .with_context(&uri, None, |ctx| {
                let mut lenses = Vec::new();
                for provider in &self.state.providers.code_lens {
                    lenses.extend(provider.code_lenses(ctx));
                }
                lenses
            })
            .unwrap_or_default();

        Ok(Some(lenses))
    }

    async fn code_lens_resolve(&self, lens: CodeLens) -> Result<CodeLens> {
        Ok(self.state.providers.resolve_code_lens(lens))
    }

    async fn code_action(&self, params: CodeActionParams) -> Result<Option<CodeActionResponse>> {
        let uri = params.text_document.uri.to_string();
        let pos = params.range.start;

        let actions = self
            .state
            .with_context(&uri, Some((pos.line, pos.character)), |ctx| {
                let mut actions = Vec::new();
                for provider in &self.state.providers.code_action {
                    actions.extend(provider.code_actions(ctx, &params));
                }
                actions
            })
            .unwrap_or_default();

        Ok(Some(actions))
    }

    async fn diagnostic(
        &self,
        params: DocumentDiagnosticParams,
    ) -> Result<DocumentDiagnosticReportResult> {
        let uri = params.text_document.uri.to_string();
        let items = self
            .state
            .compute_diagnostics(&uri)
            .map(|(diagnostics, _)| diagnostics)
            .unwrap_or_default();

        Ok(DocumentDiagnosticReportResult::Report(
            DocumentDiagnosticReport::Full(RelatedFullDocumentDiagnosticReport {
                related_documents: None,
                full_document_diagnostic_report: FullDocumentDiagnosticReport {
                    result_id: None,
                    items,
                },
            }),
        ))
    }

    async fn execute_command(
        &self,
        params: ExecuteCommandParams,
    ) -> Result<Option<serde_json::Value>> {
        let providers = self.state.providers.clone();
        let command = params.command;
        let arguments = params.arguments;
        let result =
            tokio::task::spawn_blocking(move || providers.execute_command(&command, &arguments))
                .await
                .unwrap_or_default();
        Ok(result)
    }

    async fn did_create_files(&self, params: CreateFilesParams) {
        let paths = paths_from_uris(params.files.iter().map(|file| file.uri.as_str()));
        let scanner = self.state.scanner.clone();
        tokio::task::spawn_blocking(move || {
            if let Err(err) = scanner.index_files(&paths) {
                tracing::warn!("indexing created files failed: {}", err);
            }
        });
    }

    async fn did_rename_files(&self, params: RenameFilesParams) {
        let old_paths = paths_from_uris(params.files.iter().map(|file| file.old_uri.as_str()));
        let new_paths = paths_from_uris(params.files.iter().map(|file| file.new_uri.as_str()));
        let scanner = self.state.scanner.clone();
        tokio::task::spawn_blocking(move || {
            if let Err(err) = scanner.index_files(&new_paths) {
                tracing::warn!("indexing renamed files failed: {}", err);
            }
            if let Err(err) = scanner.remove_files(&old_paths) {
                tracing::warn!("removing renamed files failed: {}", err);
            }
        });
    }

    async fn did_delete_files(&self, params: DeleteFilesParams) {
        let paths = paths_from_uris(params.files.iter().map(|file| file.uri.as_str()));
        let scanner = self.state.scanner.clone();
        tokio::task::spawn_blocking(move || {
            if let Err(err) = scanner.remove_files(&paths) {
                tracing::warn!("removing deleted files failed: {}", err);
            }
        });
    }

    async fn did_change_watched_files(&self, params: DidChangeWatchedFilesParams) {
        let mut created = Vec::new();
        let mut deleted = Vec::new();
        for change in &params.changes {
            let path = PathBuf::from(uri_to_path(change.uri.as_str()));
            match change.typ {
                FileChangeType::CREATED | FileChangeType::CHANGED => created.push(path),
                FileChangeType::DELETED => deleted.push(path),
                _ => {}
            }
        }

        let scanner = self.state.scanner.clone();
        tokio::task::spawn_blocking(move || {
            if !created.is_empty() {
                if let Err(err) = scanner.index_files(&created) {
                    tracing::warn!("indexing watched files failed: {}", err);
                }
            }
            if !deleted.is_empty() {
                if let Err(err) = scanner.remove_files(&deleted) {
                    tracing::warn!("removing watched files failed: {}", err);
                }
            }
        });
    }
}

/// Wire up parsers, stores, indexers, and providers, and build the
/// tower-lsp service. Fails on cache-store errors; a grammar that fails to
/// load aborts startup.
pub fn build_service(
    cache_dir: PathBuf,
    version: &str,
) -> shopware_lsp_index::Result<(LspService<Backend>, ClientSocket)> {
    let parsers = Arc::new(ParserPool::new());
    let hashes = HashStore::open(&cache_dir)?;
    let scanner = Arc::new(FileScanner::new(parsers.clone(), hashes)?);

    let services = Arc::new(ServiceIndexer::new(&cache_dir)?);
    let routes = Arc::new(RouteIndexer::new(&cache_dir)?);
    let snippets = Arc::new(SnippetIndexer::new(&cache_dir)?);
    let templates = Arc::new(TemplateIndexer::new(&cache_dir)?);
    let php_index = Arc::new(PhpIndexer::new(&cache_dir)?);
    let theme = Arc::new(ThemeIndexer::new(&cache_dir)?);

    let indexers: Vec<Arc<dyn Indexer>> = vec![
        services.clone(),
        routes.clone(),
        snippets.clone(),
        templates.clone(),
        php_index.clone(),
        theme.clone(),
    ];
    for indexer in &indexers {
        scanner.add_indexer(indexer.clone());
    }

    let mut providers = ProviderRegistry::new();
    providers.register_completion(Arc::new(ServiceCompletionProvider::new(services.clone())));
    providers.register_completion(Arc::new(RouteCompletionProvider::new(routes.clone())));
    providers.register_completion(Arc::new(SnippetCompletionProvider::new(snippets.clone())));
    providers.register_definition(Arc::new(ServiceDefinitionProvider::new(
        services.clone(),
        php_index.clone(),
    )));
    providers.register_definition(Arc::new(RouteDefinitionProvider::new(routes.clone())));
    providers.register_definition(Arc::new(SnippetDefinitionProvider::new(snippets.clone())));
    providers.register_definition(Arc::new(TemplateDefinitionProvider::new(templates.clone())));
    providers.register_references(Arc::new(ServiceReferencesProvider::new(services.clone())));
    providers.register_hover(Arc::new(SnippetHoverProvider::new(snippets.clone())));
    providers.register_hover(Arc::new(ServiceHoverProvider::new(services.clone())));
    providers.register_code_lens(Arc::new(TwigBlockCodeLensProvider::new(templates.clone())));
    providers.register_code_action(Arc::new(SnippetCodeActionProvider::new()));
    providers.register_diagnostics(Arc::new(SnippetDiagnosticsProvider::new(snippets.clone())));
    providers.register_diagnostics(Arc::new(ServiceDiagnosticsProvider::new(services.clone())));
    providers.register_command(Arc::new(SnippetCommandProvider::new(
        snippets.clone(),
        scanner.clone(),
    )));

    let documents = Arc::new(DocumentManager::new(parsers));
    let state = Arc::new(BackendState {
        cache_dir,
        version: version.to_string(),
        documents,
        scanner,
        indexers,
        php_index,
        providers: Arc::new(providers),
        indexing: AtomicBool::new(false),
    });

    let (service, socket) = LspService::build(move |client| Backend::new(client, state))
        .custom_method("shopware/forceReindex", Backend::force_reindex)
        .finish();
    Ok((service, socket))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uri_to_path_strips_single_prefix() {
        assert_eq!(uri_to_path("file:///srv/app/a.xml"), "/srv/app/a.xml");
        assert_eq!(uri_to_path("/srv/app/a.xml"), "/srv/app/a.xml");
        // Only one prefix is stripped.
        assert_eq!(uri_to_path("file://file:///x"), "file:///x");
    }

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of("/a/b/services.XML"), ".xml");
        assert_eq!(extension_of("/a/b/page.html.twig"), ".twig");
        assert_eq!(extension_of("/a/b/Makefile"), "");
    }

    #[allow(deprecated)]
    #[test]
    fn test_extract_root_path_priority() {
        let mut params = InitializeParams {
            root_path: Some("/from/root/path".to_string()),
            root_uri: Some(Url::parse("file:///from/root/uri").unwrap()),
            ..Default::default()
        };
        assert_eq!(extract_root_path(&params), PathBuf::from("/from/root/path"));

        params.root_path = None;
        assert_eq!(extract_root_path(&params), PathBuf::from("/from/root/uri"));

        params.root_uri = None;
        params.workspace_folders = Some(vec![WorkspaceFolder {
            uri: Url::parse("file:///from/folder").unwrap(),
            name: "ws".to_string(),
        }]);
        assert_eq!(extract_root_path(&params), PathBuf::from("/from/folder"));
    }
}
