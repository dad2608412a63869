//! Custom server→client notifications and custom request payloads.

use serde::{Deserialize, Serialize};
use tower_lsp::lsp_types::notification::Notification;

/// `shopware/indexingStarted`, sent before every `index_all`.
#[derive(Debug)]
pub enum IndexingStarted {}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexingStartedParams {
    pub message: String,
}

impl Notification for IndexingStarted {
    type Params = IndexingStartedParams;
    const METHOD: &'static str = "shopware/indexingStarted";
}

/// `shopware/indexingCompleted`, sent after every `index_all` with the
/// elapsed wall-clock seconds.
#[derive(Debug)]
pub enum IndexingCompleted {}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexingCompletedParams {
    pub message: String,
    pub time_in_seconds: f64,
}

impl Notification for IndexingCompleted {
    type Params = IndexingCompletedParams;
    const METHOD: &'static str = "shopware/indexingCompleted";
}

/// Response of the `shopware/forceReindex` request; the rebuild itself runs
/// asynchronously.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForceReindexResponse {
    pub message: String,
}
