//! `jumpserver_asset_permission`: grants binding users, assets and system users.

use serde::{Deserialize, Serialize};

use super::Resource;
use crate::error::Result;
use crate::schema::{Attribute, Schema};
use crate::transport::ApiResponse;
use crate::types::ResourceKind;

/// Grants the listed users access to the listed assets through the listed
/// system users. Members are referenced by display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetPermission {
    /// Permission name.
    pub name: String,
    /// Whether the grant is in effect.
    pub is_active: bool,
    /// Granted users.
    pub users_display: Vec<String>,
    /// Reachable assets.
    pub assets_display: Vec<String>,
    /// System users the sessions log in as.
    pub system_users_display: Vec<String>,
}

impl Resource for AssetPermission {
    const KIND: ResourceKind = ResourceKind::AssetPermission;

    fn schema() -> Schema {
        Schema::v0()
            .with_description("Access grant binding users, assets and system users")
            .with_attribute("name", Attribute::required_string())
            .with_attribute("is_active", Attribute::required_bool())
            .with_attribute("users_display", Attribute::required_string_list())
            .with_attribute("assets_display", Attribute::required_string_list())
            .with_attribute("system_users_display", Attribute::required_string_list())
    }

    fn from_response(response: &ApiResponse, _prior: &Self) -> Result<Self> {
        response.json("decode asset permission")
    }
}
