//! Name to identifier resolution for domains and nodes.
//!
//! Resolution fetches the whole collection in one request and scans it in
//! list order. Only the entries of that single response page are
//! considered, and results are never cached between calls.

use std::fmt;

use reqwest::StatusCode;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::client::JumpServerClient;
use crate::error::{ProviderError, Result};

/// A collection that can be searched by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupKind {
    /// Network domains (`/api/v1/assets/domains/`).
    Domain,
    /// Asset tree nodes (`/api/v1/assets/nodes/`).
    Node,
}

impl LookupKind {
    /// Collection endpoint path.
    pub fn collection_path(self) -> &'static str {
        match self {
            Self::Domain => "/api/v1/assets/domains/",
            Self::Node => "/api/v1/assets/nodes/",
        }
    }

    fn collection_name(self) -> &'static str {
        match self {
            Self::Domain => "domains",
            Self::Node => "nodes",
        }
    }
}

impl fmt::Display for LookupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Domain => "domain",
            Self::Node => "node",
        })
    }
}

/// Resolve `name` to the identifier of the first case-insensitive match.
#[instrument(skip(client), fields(kind = %kind))]
pub async fn resolve(client: &JumpServerClient, kind: LookupKind, name: &str) -> Result<String> {
    let response = client.get(kind.collection_path()).await?;
    if response.status != StatusCode::OK {
        return Err(ProviderError::Transport(format!(
            "failed to list {}, status={}",
            kind.collection_name(),
            response.status.as_u16()
        )));
    }

    // Entries stay untyped; only the matching one has to carry a string id.
    let entries: Vec<Value> = response.json(&format!("decode {} list", kind))?;
    let id = find_id(&entries, kind, name)?;
    debug!(name, id = %id, "resolved {} name", kind);
    Ok(id)
}

fn find_id(entries: &[Value], kind: LookupKind, name: &str) -> Result<String> {
    let wanted = name.to_lowercase();
    let found = entries.iter().find(|entry| {
        entry
            .get("name")
            .and_then(Value::as_str)
            .is_some_and(|candidate| candidate.to_lowercase() == wanted)
    });

    match found.map(|entry| entry.get("id").and_then(Value::as_str)) {
        Some(Some(id)) => Ok(id.to_string()),
        Some(None) => Err(ProviderError::Schema(format!(
            "{} '{}' found but has no string 'id'",
            kind, name
        ))),
        None => Err(ProviderError::NotFound(format!(
            "{} '{}' not found in JumpServer",
            kind, name
        ))),
    }
}
