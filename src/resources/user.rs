//! `jumpserver_user`: platform user accounts.

use serde::{Deserialize, Serialize};
use serde_json::json;

use super::Resource;
use crate::error::Result;
use crate::schema::{Attribute, AttributeType, Schema};
use crate::transport::ApiResponse;
use crate::types::ResourceKind;

/// A JumpServer user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Display name.
    pub name: String,
    /// Login name.
    pub username: String,
    /// Contact e-mail.
    pub email: String,
    /// Whether the account may log in. Server default when unset.
    #[serde(default)]
    pub is_active: Option<bool>,
    /// Platform-level roles, e.g. `User` or `Admin`.
    pub system_roles: Vec<String>,
}

#[derive(Deserialize)]
struct UserWire {
    name: String,
    username: String,
    email: String,
    is_active: bool,
    system_roles: Vec<String>,
}

impl Resource for User {
    const KIND: ResourceKind = ResourceKind::User;

    fn schema() -> Schema {
        Schema::v0()
            .with_description("A JumpServer user")
            .with_attribute("name", Attribute::required_string().with_description("Display name"))
            .with_attribute("username", Attribute::required_string().with_description("Login name"))
            .with_attribute("email", Attribute::required_string())
            .with_attribute(
                "is_active",
                Attribute::server_default(AttributeType::Bool, json!(true)),
            )
            .with_attribute(
                "system_roles",
                Attribute::required_string_list().with_description("Platform roles"),
            )
    }

    fn from_response(response: &ApiResponse, _prior: &Self) -> Result<Self> {
        let wire: UserWire = response.json("decode user")?;
        Ok(Self {
            name: wire.name,
            username: wire.username,
            email: wire.email,
            is_active: Some(wire.is_active),
            system_roles: wire.system_roles,
        })
    }
}
