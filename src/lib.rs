//! Client core for the municipal court operations backend: credential
//! storage, the authenticated API and download clients, report exports,
//! and the analyst agent console.

pub mod agent;
pub mod api;
pub mod config;
pub mod credentials;
pub mod download;
pub mod error;
pub mod reports;

pub use api::ApiClient;
pub use credentials::CredentialStore;
pub use download::DownloadClient;
pub use error::ClientError;
