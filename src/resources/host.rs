//! `jumpserver_host`: managed hosts placed in a domain and node.
//!
//! The caller names the domain and node; the request carries their
//! identifiers, resolved through [`crate::resolver`]. On update the stored
//! identifiers are reused unless the corresponding name changed. A domain or
//! node renamed on the server in the meantime is not noticed, so the stored
//! identifier can be stale.
//!
//! Accounts and protocols are replaced as a whole on every update. Account
//! secrets are write-only and never appear in read results.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use super::{Record, Resource};
use crate::client::JumpServerClient;
use crate::codec;
use crate::error::Result;
use crate::resolver::{self, LookupKind};
use crate::schema::{Attribute, AttributeType, Block, NestedBlock, Schema};
use crate::transport::ApiResponse;
use crate::types::ResourceKind;

/// A JumpServer host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Host {
    /// Host name.
    pub name: String,
    /// Address used to reach the host.
    pub address: String,
    /// Platform identifier.
    #[serde(deserialize_with = "codec::int_from_number")]
    pub platform: i64,
    /// Free-form comment.
    #[serde(default)]
    pub comment: Option<String>,
    /// Name of the network domain.
    pub domain_name: String,
    /// Name of the node the host is placed under.
    pub node_name: String,
    /// Resolved domain identifier.
    #[serde(default)]
    pub domain_id: Option<String>,
    /// Resolved node identifiers.
    #[serde(default, deserialize_with = "codec::null_as_default")]
    pub node_ids: Vec<String>,
    /// Accounts provisioned on the host.
    #[serde(default, deserialize_with = "codec::null_as_default")]
    pub accounts: Vec<Account>,
    /// Protocols the host speaks.
    #[serde(default, deserialize_with = "codec::null_as_default")]
    pub protocols: Vec<Protocol>,
}

/// An account on a host.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// What the server does when the account is invalid.
    #[serde(default = "default_on_invalid")]
    pub on_invalid: String,
    /// Whether the account is usable.
    #[serde(default = "default_true")]
    pub is_active: bool,
    /// Account display name.
    pub name: String,
    /// Login name on the host.
    pub username: String,
    /// `password`, `ssh_key`, ...
    #[serde(deserialize_with = "codec::choice_value")]
    pub secret_type: String,
    /// The secret itself. Sent on write, absent after read.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("on_invalid", &self.on_invalid)
            .field("is_active", &self.is_active)
            .field("name", &self.name)
            .field("username", &self.username)
            .field("secret_type", &self.secret_type)
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// A protocol and port a host listens on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Protocol {
    /// Protocol name, e.g. `ssh`.
    pub name: String,
    /// Port number.
    #[serde(deserialize_with = "codec::int_from_number")]
    pub port: i64,
}

fn default_on_invalid() -> String {
    "error".to_string()
}

fn default_true() -> bool {
    true
}

fn is_empty<T>(items: &&[T]) -> bool {
    items.is_empty()
}

#[derive(Serialize)]
struct HostPayload<'a> {
    name: &'a str,
    address: &'a str,
    platform: i64,
    domain: &'a str,
    nodes: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    comment: Option<&'a str>,
    #[serde(skip_serializing_if = "is_empty")]
    accounts: &'a [Account],
    #[serde(skip_serializing_if = "is_empty")]
    protocols: &'a [Protocol],
}

#[derive(Deserialize)]
struct HostWire {
    name: String,
    address: String,
    #[serde(deserialize_with = "codec::int_or_ref")]
    platform: i64,
    #[serde(default)]
    comment: Option<String>,
    #[serde(default, deserialize_with = "codec::opt_id_ref")]
    domain: Option<String>,
    #[serde(deserialize_with = "codec::id_refs")]
    nodes: Vec<String>,
    #[serde(default)]
    accounts: Option<Vec<Account>>,
    #[serde(default)]
    protocols: Option<Vec<Protocol>>,
}

impl Host {
    async fn domain_id(&self, client: &JumpServerClient, prior: Option<&Host>) -> Result<String> {
        let stored = prior
            .filter(|p| p.domain_name == self.domain_name)
            .and_then(|p| p.domain_id.clone());
        match stored {
            Some(id) => {
                debug!(domain = %self.domain_name, id = %id, "reusing stored domain id");
                Ok(id)
            },
            None => resolver::resolve(client, LookupKind::Domain, &self.domain_name).await,
        }
    }

    async fn node_ids(&self, client: &JumpServerClient, prior: Option<&Host>) -> Result<Vec<String>> {
        match prior.filter(|p| p.node_name == self.node_name && !p.node_ids.is_empty()) {
            Some(p) => {
                debug!(node = %self.node_name, "reusing stored node ids");
                Ok(p.node_ids.clone())
            },
            None => Ok(vec![
                resolver::resolve(client, LookupKind::Node, &self.node_name).await?,
            ]),
        }
    }
}

#[async_trait]
impl Resource for Host {
    const KIND: ResourceKind = ResourceKind::Host;
    const RESOLVED_FROM: &'static [(&'static str, &'static str)] =
        &[("domain_id", "domain_name"), ("node_ids", "node_name")];

    fn schema() -> Schema {
        let account = Block::new()
            .with_attribute(
                "on_invalid",
                Attribute::server_default(AttributeType::String, json!("error")),
            )
            .with_attribute(
                "is_active",
                Attribute::server_default(AttributeType::Bool, json!(true)),
            )
            .with_attribute("name", Attribute::required_string())
            .with_attribute("username", Attribute::required_string())
            .with_attribute("secret_type", Attribute::required_string())
            .with_attribute(
                "secret",
                Attribute::optional_string()
                    .sensitive()
                    .with_description("Write-only; never returned on read"),
            );

        let protocol = Block::new()
            .with_attribute("name", Attribute::required_string())
            .with_attribute("port", Attribute::required_int64());

        Schema::v0()
            .with_description("A managed host")
            .with_attribute("name", Attribute::required_string())
            .with_attribute("address", Attribute::required_string())
            .with_attribute("platform", Attribute::required_int64())
            .with_attribute("comment", Attribute::optional_string())
            .with_attribute(
                "domain_name",
                Attribute::required_string().with_description("Resolved to domain_id"),
            )
            .with_attribute(
                "node_name",
                Attribute::required_string().with_description("Resolved to node_ids"),
            )
            .with_attribute("domain_id", Attribute::computed_string())
            .with_attribute("node_ids", Attribute::computed_string_list())
            .with_block("accounts", NestedBlock::list(account))
            .with_block("protocols", NestedBlock::list(protocol))
    }

    async fn payload(&self, client: &JumpServerClient, prior: Option<&Record<Self>>) -> Result<Value> {
        let prior = prior.map(|record| &record.attrs);
        let domain = self.domain_id(client, prior).await?;
        let nodes = self.node_ids(client, prior).await?;

        let payload = HostPayload {
            name: &self.name,
            address: &self.address,
            platform: self.platform,
            domain: &domain,
            nodes: &nodes,
            comment: self.comment.as_deref(),
            accounts: &self.accounts,
            protocols: &self.protocols,
        };
        Ok(serde_json::to_value(payload)?)
    }

    fn from_response(response: &ApiResponse, prior: &Self) -> Result<Self> {
        let wire: HostWire = response.json("decode host")?;

        let comment = match wire.comment {
            Some(c) if c.is_empty() && prior.comment.is_none() => None,
            other => other,
        };
        let accounts = match wire.accounts {
            Some(accounts) => accounts
                .into_iter()
                .map(|account| Account {
                    secret: None,
                    ..account
                })
                .collect(),
            None => prior.accounts.clone(),
        };

        Ok(Self {
            name: wire.name,
            address: wire.address,
            platform: wire.platform,
            comment,
            domain_name: prior.domain_name.clone(),
            node_name: prior.node_name.clone(),
            domain_id: wire.domain,
            node_ids: wire.nodes,
            accounts,
            protocols: wire.protocols.unwrap_or_else(|| prior.protocols.clone()),
        })
    }
}
