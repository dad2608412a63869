//! Shopware language server.
//!
//! Ties the indexing engine and the capability providers to a tower-lsp
//! JSON-RPC dispatcher over stdio.

pub mod documents;
pub mod notifications;
pub mod registry;
pub mod server;
pub mod version;

pub use server::{build_service, Backend};
