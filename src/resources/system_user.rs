//! `jumpserver_system_user`: reusable login profiles attached to assets.
//!
//! Everything but `name` is optional. Unset attributes are left out of the
//! request and the server fills in its own defaults, which the schema
//! advertises. `password` is write-only: it is sent but never read back.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::json;

use super::Resource;
use crate::codec;
use crate::error::Result;
use crate::schema::{Attribute, AttributeType, Schema};
use crate::transport::ApiResponse;
use crate::types::ResourceKind;

/// A JumpServer system user.
#[derive(Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SystemUser {
    /// Profile name.
    pub name: String,
    /// Account used on the target host.
    #[serde(default)]
    pub username: Option<String>,
    /// Account password. Write-only.
    #[serde(default)]
    pub password: Option<String>,
    /// `common` or `admin`.
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    /// Connection protocol, e.g. `ssh`.
    #[serde(default)]
    pub protocol: Option<String>,
    /// `auto` or `manual`.
    #[serde(default)]
    pub login_mode: Option<String>,
    /// Selection priority among profiles on the same asset.
    #[serde(default, deserialize_with = "codec::opt_int_from_number")]
    pub priority: Option<i64>,
    /// Commands allowed through sudo.
    #[serde(default)]
    pub sudo: Option<String>,
    /// Login shell.
    #[serde(default)]
    pub shell: Option<String>,
    /// SFTP root directory.
    #[serde(default)]
    pub sftp_root: Option<String>,
    /// Home directory.
    #[serde(default)]
    pub home: Option<String>,
    /// Log in with the JumpServer user's own name.
    #[serde(default)]
    pub username_same_with_user: Option<bool>,
    /// Push the account to assets automatically.
    #[serde(default)]
    pub auto_push: Option<bool>,
    /// Allow switching to this user with `su`.
    #[serde(default)]
    pub su_enabled: Option<bool>,
}

impl fmt::Debug for SystemUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SystemUser")
            .field("name", &self.name)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("type", &self.kind)
            .field("protocol", &self.protocol)
            .field("login_mode", &self.login_mode)
            .field("priority", &self.priority)
            .finish_non_exhaustive()
    }
}

#[derive(Deserialize)]
struct SystemUserWire {
    name: String,
    username: String,
    #[serde(rename = "type", deserialize_with = "codec::choice_value")]
    kind: String,
    #[serde(deserialize_with = "codec::choice_value")]
    protocol: String,
    #[serde(deserialize_with = "codec::choice_value")]
    login_mode: String,
    #[serde(deserialize_with = "codec::int_from_number")]
    priority: i64,
    #[serde(default)]
    sudo: Option<String>,
    #[serde(default)]
    shell: Option<String>,
    #[serde(default)]
    sftp_root: Option<String>,
    #[serde(default)]
    home: Option<String>,
    #[serde(default)]
    username_same_with_user: Option<bool>,
    #[serde(default)]
    auto_push: Option<bool>,
    #[serde(default)]
    su_enabled: Option<bool>,
}

impl Resource for SystemUser {
    const KIND: ResourceKind = ResourceKind::SystemUser;

    fn schema() -> Schema {
        let string = |default: &str| Attribute::server_default(AttributeType::String, json!(default));
        let flag = || Attribute::server_default(AttributeType::Bool, json!(false));

        Schema::v0()
            .with_description("Login profile attached to assets")
            .with_attribute("name", Attribute::required_string())
            .with_attribute("username", Attribute::optional_string())
            .with_attribute("password", Attribute::optional_string().sensitive())
            .with_attribute("type", string("common"))
            .with_attribute("protocol", string("ssh"))
            .with_attribute("login_mode", string("auto"))
            .with_attribute("priority", Attribute::server_default(AttributeType::Int64, json!(81)))
            .with_attribute("sudo", string("/bin/whoami"))
            .with_attribute("shell", string("/bin/bash"))
            .with_attribute("sftp_root", string("tmp"))
            .with_attribute("home", string("/home/student"))
            .with_attribute("username_same_with_user", flag())
            .with_attribute("auto_push", flag())
            .with_attribute("su_enabled", flag())
    }

    fn from_response(response: &ApiResponse, prior: &Self) -> Result<Self> {
        let wire: SystemUserWire = response.json("decode system user")?;

        // An empty username on the wire is the server's way of saying unset.
        let username = match (wire.username.is_empty(), &prior.username) {
            (true, None) => None,
            _ => Some(wire.username),
        };

        Ok(Self {
            name: wire.name,
            username,
            password: prior.password.clone(),
            kind: Some(wire.kind),
            protocol: Some(wire.protocol),
            login_mode: Some(wire.login_mode),
            priority: Some(wire.priority),
            sudo: wire.sudo.or_else(|| prior.sudo.clone()),
            shell: wire.shell.or_else(|| prior.shell.clone()),
            sftp_root: wire.sftp_root.or_else(|| prior.sftp_root.clone()),
            home: wire.home.or_else(|| prior.home.clone()),
            username_same_with_user: wire
                .username_same_with_user
                .or(prior.username_same_with_user),
            auto_push: wire.auto_push.or(prior.auto_push),
            su_enabled: wire.su_enabled.or(prior.su_enabled),
        })
    }
}
