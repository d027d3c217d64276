//! JumpServer provider
//!
//! Manages JumpServer bastion-host records (users, hosts, system users,
//! assets and asset permissions) through the JumpServer REST API, on behalf
//! of an external declarative lifecycle driver.
//!
//! # Overview
//!
//! - **Session**: [`JumpServerClient`] binds a base URL to one credential
//!   mode, either a bearer token (pre-issued or obtained by logging in) or
//!   HMAC-SHA256 request signing with an access/secret key pair
//! - **Name resolution**: hosts name their domain and node; [`resolver`]
//!   turns those names into identifiers
//! - **Resource mappers**: [`resources`] maps each record kind onto its
//!   create/read/update/delete endpoints
//! - **Provider surface**: [`JumpServerProvider`] implements
//!   [`ProviderService`], the seam the driver calls with JSON state
//!
//! # Quick Start
//!
//! ```ignore
//! use jumpserver_provider::{init_logging, JumpServerProvider, ProviderService};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     init_logging();
//!
//!     let provider = JumpServerProvider::new();
//!     provider
//!         .configure(json!({
//!             "base_url": "https://jump.example.com",
//!             "access_key": "ak",
//!             "secret_key": "sk"
//!         }))
//!         .await?;
//!
//!     let host = provider
//!         .create("jumpserver_host", json!({
//!             "name": "web-01",
//!             "address": "10.0.0.5",
//!             "platform": 1,
//!             "domain_name": "Default",
//!             "node_name": "/"
//!         }))
//!         .await?;
//!     println!("created {}", host["id"]);
//!     Ok(())
//! }
//! ```
//!
//! # Configuration
//!
//! Every provider setting may come from a `JUMPSERVER_*` environment
//! variable instead: `JUMPSERVER_BASE_URL`, `JUMPSERVER_USERNAME`,
//! `JUMPSERVER_PASSWORD`, `JUMPSERVER_TOKEN`, `JUMPSERVER_ACCESS_KEY`,
//! `JUMPSERVER_SECRET_KEY` and `JUMPSERVER_SKIP_TLS_VERIFY`.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod auth;
pub mod client;
pub mod codec;
pub mod config;
pub mod error;
pub mod logging;
pub mod provider;
pub mod resolver;
pub mod resources;
pub mod schema;
pub mod service;
pub mod testing;
pub mod transport;
pub mod types;
pub mod validation;

// Re-export main types at crate root
pub use auth::{Auth, AuthMode, HttpSigner};
pub use client::JumpServerClient;
pub use config::{provider_config_schema, CredentialSource, ProviderConfig};
pub use error::{ProviderError, Result};
pub use logging::{init_logging, init_logging_with_default, try_init_logging};
pub use provider::JumpServerProvider;
pub use resources::{Record, Resource};
pub use schema::ProviderSchema;
pub use service::ProviderService;
pub use types::{AttributeChange, PlanResult, ProviderMetadata, ResourceKind};
pub use validation::{ensure_valid, is_valid, validate};

// Re-export async_trait for convenience
pub use async_trait::async_trait;

// Re-export commonly used external types
pub use serde_json;
pub use tracing;
