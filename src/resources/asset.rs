//! `jumpserver_asset`: generic assets addressed by hostname and IP.

use serde::{Deserialize, Serialize};

use super::Resource;
use crate::error::Result;
use crate::schema::{Attribute, Schema};
use crate::transport::ApiResponse;
use crate::types::ResourceKind;

/// A JumpServer asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    /// Asset hostname.
    pub hostname: String,
    /// Management IP address.
    pub ip: String,
    /// Platform name, e.g. `Linux`.
    pub platform: String,
    /// Protocol specs such as `ssh/22`.
    pub protocols: Vec<String>,
    /// Node paths the asset is placed under.
    pub nodes_display: Vec<String>,
}

impl Resource for Asset {
    const KIND: ResourceKind = ResourceKind::Asset;

    fn schema() -> Schema {
        Schema::v0()
            .with_attribute("hostname", Attribute::required_string())
            .with_attribute("ip", Attribute::required_string())
            .with_attribute("platform", Attribute::required_string())
            .with_attribute("protocols", Attribute::required_string_list())
            .with_attribute("nodes_display", Attribute::required_string_list())
    }

    fn from_response(response: &ApiResponse, _prior: &Self) -> Result<Self> {
        response.json("decode asset")
    }
}
