//! Resource mappers.
//!
//! Every record kind follows the same contract:
//!
//! | Operation | Request | Success status | Follow-up |
//! |-----------|---------|----------------|-----------|
//! | create    | `POST` collection | 201 (hosts: 201 or 200) | read |
//! | read      | `GET` item | 200; 404 means absent | none |
//! | update    | `PUT` item | 200 | read |
//! | delete    | `DELETE` item | 204 | none |
//!
//! The per-kind modules only describe attributes, how to build the request
//! payload, and how to fold a read response back into attributes. The
//! request/response handling lives in [`create`], [`read`], [`update`] and
//! [`delete`].

pub mod asset;
pub mod asset_permission;
pub mod host;
pub mod system_user;
pub mod user;

pub use asset::Asset;
pub use asset_permission::AssetPermission;
pub use host::{Account, Host, Protocol};
pub use system_user::SystemUser;
pub use user::User;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, instrument, warn};

use crate::client::JumpServerClient;
use crate::codec;
use crate::error::{ProviderError, Result};
use crate::schema::Schema;
use crate::transport::ApiResponse;
use crate::types::ResourceKind;

/// A record the server knows about: its identifier plus attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record<R> {
    /// Server-assigned identifier.
    pub id: String,
    /// Attribute values.
    #[serde(flatten)]
    pub attrs: R,
}

/// Typed attributes of one record kind.
#[async_trait]
pub trait Resource: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// The kind this type maps.
    const KIND: ResourceKind;

    /// Attribute schema of this kind.
    fn schema() -> Schema;

    /// Computed attributes paired with the configured name they are looked
    /// up from. Changing the name invalidates the stored value.
    const RESOLVED_FROM: &'static [(&'static str, &'static str)] = &[];

    /// Request body for create (`prior` is `None`) or update.
    async fn payload(&self, client: &JumpServerClient, prior: Option<&Record<Self>>) -> Result<Value> {
        let _ = (client, prior);
        codec::encode_payload(self)
    }

    /// Fold a successful read response into attributes.
    ///
    /// `prior` supplies the attributes the server never echoes back.
    fn from_response(response: &ApiResponse, prior: &Self) -> Result<Self>;
}

#[derive(Deserialize)]
struct Created {
    id: Option<String>,
}

/// Create a record and read it back.
#[instrument(skip_all, fields(kind = %R::KIND))]
pub async fn create<R: Resource>(client: &JumpServerClient, attrs: &R) -> Result<Record<R>> {
    let payload = attrs.payload(client, None).await?;
    let response = client.post(R::KIND.collection_path(), &payload).await?;

    if !R::KIND.accepts_create_status(response.status) {
        return Err(ProviderError::api(R::KIND, "create", response.status));
    }

    let created: Created = response.json(&format!("decode {} create response", R::KIND))?;
    let id = created.id.ok_or_else(|| {
        ProviderError::Schema(format!("no 'id' field found in {} create response", R::KIND))
    })?;
    info!(%id, "created {}", R::KIND);

    read(client, &id, attrs)
        .await?
        .ok_or_else(|| ProviderError::api(R::KIND, "read", StatusCode::NOT_FOUND))
}

/// Read a record; `Ok(None)` means the server no longer has it.
#[instrument(skip(client, prior), fields(kind = %R::KIND))]
pub async fn read<R: Resource>(client: &JumpServerClient, id: &str, prior: &R) -> Result<Option<Record<R>>> {
    let response = client.get(&R::KIND.item_path(id)).await?;

    if response.status == StatusCode::NOT_FOUND {
        warn!("{} no longer exists on the server", R::KIND);
        return Ok(None);
    }
    if response.status != StatusCode::OK {
        return Err(ProviderError::api(R::KIND, "read", response.status));
    }

    Ok(Some(Record {
        id: id.to_string(),
        attrs: R::from_response(&response, prior)?,
    }))
}

/// Replace a record's attributes and read it back.
#[instrument(skip(client, prior, planned), fields(kind = %R::KIND, id = %prior.id))]
pub async fn update<R: Resource>(client: &JumpServerClient, prior: &Record<R>, planned: &R) -> Result<Record<R>> {
    let payload = planned.payload(client, Some(prior)).await?;
    let response = client.put(&R::KIND.item_path(&prior.id), &payload).await?;

    if response.status != StatusCode::OK {
        return Err(ProviderError::api(R::KIND, "update", response.status));
    }
    info!("updated {}", R::KIND);

    read(client, &prior.id, planned)
        .await?
        .ok_or_else(|| ProviderError::api(R::KIND, "read", StatusCode::NOT_FOUND))
}

/// Delete a record.
#[instrument(skip(client, kind), fields(kind = %kind))]
pub async fn delete(client: &JumpServerClient, kind: ResourceKind, id: &str) -> Result<()> {
    let response = client.delete(&kind.item_path(id)).await?;

    if response.status != StatusCode::NO_CONTENT {
        return Err(ProviderError::api(kind, "delete", response.status));
    }
    info!("deleted {}", kind);
    Ok(())
}

/// Schema of a kind, by kind.
pub fn schema_for(kind: ResourceKind) -> Schema {
    match kind {
        ResourceKind::User => User::schema(),
        ResourceKind::Host => Host::schema(),
        ResourceKind::SystemUser => SystemUser::schema(),
        ResourceKind::Asset => Asset::schema(),
        ResourceKind::AssetPermission => AssetPermission::schema(),
    }
}

/// Computed-from-name pairs of `kind`.
pub fn resolved_from(kind: ResourceKind) -> &'static [(&'static str, &'static str)] {
    match kind {
        ResourceKind::User => User::RESOLVED_FROM,
        ResourceKind::Host => Host::RESOLVED_FROM,
        ResourceKind::SystemUser => SystemUser::RESOLVED_FROM,
        ResourceKind::Asset => Asset::RESOLVED_FROM,
        ResourceKind::AssetPermission => AssetPermission::RESOLVED_FROM,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_flattens_attributes() {
        let record = Record {
            id: "u-1".to_string(),
            attrs: User {
                name: "Ops".to_string(),
                username: "ops".to_string(),
                email: "ops@example.com".to_string(),
                is_active: None,
                system_roles: vec!["User".to_string()],
            },
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["id"], "u-1");
        assert_eq!(value["username"], "ops");
        assert!(value["is_active"].is_null());

        let back: Record<User> = serde_json::from_value(value).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_every_kind_has_a_schema() {
        for kind in ResourceKind::ALL {
            let schema = schema_for(kind);
            assert!(!schema.block.attributes.is_empty(), "{kind} has no attributes");
        }
    }

    #[test]
    fn test_resolved_identifiers_are_computed() {
        for kind in ResourceKind::ALL {
            let attrs = schema_for(kind).block.attributes;
            for (computed, source) in resolved_from(kind) {
                assert!(attrs[*computed].flags.computed, "{kind}.{computed} is not computed");
                assert!(attrs[*source].flags.required, "{kind}.{source} is not configured");
            }
        }
        assert_eq!(resolved_from(ResourceKind::Host).len(), 2);
        assert!(resolved_from(ResourceKind::User).is_empty());
    }
}
