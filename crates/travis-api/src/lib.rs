//! Travis-API: Travis CI v2 client for buildlight
//!
//! This crate is the remote half of the status pipeline. It knows the
//! Travis wire format, where the public and pro installations live, how to
//! authenticate, and how to build a proxy-aware HTTP transport. It knows
//! nothing about workspaces or reconciliation.
//!
//! ## Queries
//!
//! - [`TravisClient::branch`]: latest build on a branch, with its commit
//! - [`TravisClient::repository`]: repository summary with its last build

pub mod client;
pub mod credentials;
pub mod endpoint;
pub mod error;
pub mod transport;
pub mod wire;

pub use client::{TravisClient, ACCEPT_V2};
pub use credentials::{CredentialSource, Credentials};
pub use endpoint::Endpoint;
pub use error::TravisError;
pub use transport::{build_http_client, proxy_from_env, TransportOptions, PROXY_ENV_VARS};
pub use wire::{BranchBuild, BranchResponse, Commit, Repo, RepoResponse};

/// Result type for Travis API operations
pub type Result<T> = std::result::Result<T, TravisError>;
