//! Shared types: record kinds and their endpoints, plan results, metadata.

use std::fmt;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

/// The record kinds managed by this provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// A platform login account.
    User,
    /// A managed host machine.
    Host,
    /// A reusable credential profile.
    SystemUser,
    /// A generic asset record.
    Asset,
    /// A user/asset/system-user access binding.
    AssetPermission,
}

impl ResourceKind {
    /// Every kind, in registration order.
    pub const ALL: [ResourceKind; 5] = [
        ResourceKind::User,
        ResourceKind::Host,
        ResourceKind::SystemUser,
        ResourceKind::Asset,
        ResourceKind::AssetPermission,
    ];

    /// The resource type name the driver addresses this kind by.
    pub fn type_name(self) -> &'static str {
        match self {
            Self::User => "jumpserver_user",
            Self::Host => "jumpserver_host",
            Self::SystemUser => "jumpserver_system_user",
            Self::Asset => "jumpserver_asset",
            Self::AssetPermission => "jumpserver_asset_permission",
        }
    }

    /// Look a kind up by its resource type name.
    pub fn from_type_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.type_name() == name)
    }

    /// Collection endpoint path (POST target).
    pub fn collection_path(self) -> &'static str {
        match self {
            Self::User => "/api/v1/users/users/",
            Self::Host => "/api/v1/assets/hosts/",
            Self::SystemUser => "/api/v1/assets/system-users/",
            Self::Asset => "/api/v1/assets/assets/",
            Self::AssetPermission => "/api/v1/perms/asset-permissions/",
        }
    }

    /// Item endpoint path for one record.
    pub fn item_path(self, id: &str) -> String {
        format!("{}{}/", self.collection_path(), id)
    }

    /// Whether a create response status counts as success.
    ///
    /// Hosts are also accepted with 200; every other kind needs 201.
    pub fn accepts_create_status(self, status: StatusCode) -> bool {
        match self {
            Self::Host => status == StatusCode::CREATED || status == StatusCode::OK,
            _ => status == StatusCode::CREATED,
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::User => "user",
            Self::Host => "host",
            Self::SystemUser => "system user",
            Self::Asset => "asset",
            Self::AssetPermission => "asset permission",
        };
        f.write_str(name)
    }
}

/// A change to a single attribute during a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeChange {
    /// The attribute that changed.
    pub path: String,
    /// The value before the change (None if creating).
    pub before: Option<serde_json::Value>,
    /// The value after the change (None if removing).
    pub after: Option<serde_json::Value>,
}

impl AttributeChange {
    /// Create a new attribute change.
    pub fn new(
        path: impl Into<String>,
        before: Option<serde_json::Value>,
        after: Option<serde_json::Value>,
    ) -> Self {
        Self {
            path: path.into(),
            before,
            after,
        }
    }
}

/// The result of a plan operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanResult {
    /// The planned state after the operation.
    pub planned_state: serde_json::Value,
    /// The list of attribute changes.
    pub changes: Vec<AttributeChange>,
    /// Whether the resource requires replacement.
    pub requires_replace: bool,
}

impl PlanResult {
    /// Create a plan result with no changes.
    pub fn no_change(state: serde_json::Value) -> Self {
        Self {
            planned_state: state,
            changes: Vec::new(),
            requires_replace: false,
        }
    }

    /// Create an in-place plan result with changes.
    pub fn with_changes(planned_state: serde_json::Value, changes: Vec<AttributeChange>) -> Self {
        Self {
            planned_state,
            changes,
            requires_replace: false,
        }
    }
}

/// Provider metadata: the resource type names it serves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ProviderMetadata {
    /// List of resource type names.
    pub resources: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_name_round_trip() {
        for kind in ResourceKind::ALL {
            assert_eq!(ResourceKind::from_type_name(kind.type_name()), Some(kind));
        }
        assert_eq!(ResourceKind::from_type_name("jumpserver_domain"), None);
    }

    #[test]
    fn test_endpoints() {
        assert_eq!(
            ResourceKind::Host.item_path("h-1"),
            "/api/v1/assets/hosts/h-1/"
        );
        assert_eq!(
            ResourceKind::AssetPermission.collection_path(),
            "/api/v1/perms/asset-permissions/"
        );
        assert_eq!(
            ResourceKind::SystemUser.item_path("s-9"),
            "/api/v1/assets/system-users/s-9/"
        );
    }

    #[test]
    fn test_create_status_acceptance() {
        assert!(ResourceKind::Host.accepts_create_status(StatusCode::OK));
        assert!(ResourceKind::Host.accepts_create_status(StatusCode::CREATED));
        assert!(!ResourceKind::User.accepts_create_status(StatusCode::OK));
        assert!(ResourceKind::User.accepts_create_status(StatusCode::CREATED));
        assert!(!ResourceKind::Asset.accepts_create_status(StatusCode::ACCEPTED));
    }

    #[test]
    fn test_plan_result() {
        let no_change = PlanResult::no_change(serde_json::json!({"id": "u-1"}));
        assert!(no_change.changes.is_empty());
        assert!(!no_change.requires_replace);

        let with_changes = PlanResult::with_changes(
            serde_json::json!({"id": "u-1", "email": "new@example.com"}),
            vec![AttributeChange::new(
                "email",
                Some(serde_json::json!("old@example.com")),
                Some(serde_json::json!("new@example.com")),
            )],
        );
        assert_eq!(with_changes.changes.len(), 1);
    }
}
