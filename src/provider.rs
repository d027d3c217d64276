//! `JumpServerProvider`: the [`ProviderService`] implementation.
//!
//! Every call names a resource type; the provider maps it to a
//! [`ResourceKind`] and runs the typed operation for that kind. The session
//! is built once by `configure` and shared read-only by every later call.

use std::fmt;
use std::sync::OnceLock;

use serde_json::{Map, Value};
use tracing::{debug, info, instrument};

use crate::client::JumpServerClient;
use crate::codec;
use crate::config::{provider_config_schema, ProviderConfig};
use crate::error::{ProviderError, Result};
use crate::resources::{
    self, Asset, AssetPermission, Host, Record, Resource, SystemUser, User,
};
use crate::schema::{Block, Diagnostic, ProviderSchema};
use crate::service::ProviderService;
use crate::types::{AttributeChange, PlanResult, ResourceKind};
use crate::validation;

type EnvLookup = Box<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// JumpServer provider.
pub struct JumpServerProvider {
    client: OnceLock<JumpServerClient>,
    env: EnvLookup,
}

impl JumpServerProvider {
    /// A provider that falls back to the process environment for unset settings.
    pub fn new() -> Self {
        Self::with_env_lookup(|key| std::env::var(key).ok())
    }

    /// A provider with a custom environment lookup.
    pub fn with_env_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        Self {
            client: OnceLock::new(),
            env: Box::new(lookup),
        }
    }

    /// The configured session, if `configure` has run.
    pub fn client(&self) -> Option<&JumpServerClient> {
        self.client.get()
    }

    fn parse_config(&self, config: Value) -> Result<ProviderConfig> {
        ProviderConfig::from_value_with_env(config, |key| (self.env)(key))
    }

    fn session(&self) -> Result<&JumpServerClient> {
        self.client.get().ok_or_else(|| {
            ProviderError::Configuration("provider is not configured; call configure first".to_string())
        })
    }
}

impl Default for JumpServerProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for JumpServerProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JumpServerProvider")
            .field("client", &self.client.get())
            .finish_non_exhaustive()
    }
}

fn kind_of(resource_type: &str) -> Result<ResourceKind> {
    ResourceKind::from_type_name(resource_type)
        .ok_or_else(|| ProviderError::UnknownResource(resource_type.to_string()))
}

fn state_id(state: &Value) -> Result<String> {
    state
        .get("id")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ProviderError::Validation("state has no 'id'".to_string()))
}

fn decode_attrs<R: Resource>(state: Value) -> Result<R> {
    codec::decode(state, &format!("decode {} state", R::KIND))
}

async fn create_typed<R: Resource>(client: &JumpServerClient, planned: Value) -> Result<Value> {
    validation::ensure_valid(&R::schema(), &planned)?;
    let attrs: R = decode_attrs(planned)?;
    let record = resources::create(client, &attrs).await?;
    Ok(serde_json::to_value(record)?)
}

async fn read_typed<R: Resource>(client: &JumpServerClient, current: Value) -> Result<Option<Value>> {
    let id = state_id(&current)?;
    let prior: R = decode_attrs(current)?;
    match resources::read(client, &id, &prior).await? {
        Some(record) => Ok(Some(serde_json::to_value(record)?)),
        None => Ok(None),
    }
}

async fn update_typed<R: Resource>(client: &JumpServerClient, prior: Value, planned: Value) -> Result<Value> {
    validation::ensure_valid(&R::schema(), &planned)?;
    let prior = Record {
        id: state_id(&prior)?,
        attrs: decode_attrs::<R>(prior)?,
    };
    let planned: R = decode_attrs(planned)?;
    let record = resources::update(client, &prior, &planned).await?;
    Ok(serde_json::to_value(record)?)
}

/// Diff proposed against prior state.
///
/// Computed attributes and `id` carry over from the prior state when the
/// proposal leaves them unset, except identifiers whose source name changed;
/// those are unknown until apply. Null and empty lists count as unset. Nested
/// block items are compared with advertised defaults filled in and sensitive
/// attributes removed, since the server never returns them.
fn plan_state(kind: ResourceKind, prior: Option<&Value>, proposed: Value) -> Result<PlanResult> {
    let schema = resources::schema_for(kind);
    let prior = prior.and_then(Value::as_object);

    let mut planned = match proposed {
        Value::Object(map) => map,
        Value::Null => {
            let changes = prior
                .and_then(|p| p.get("id"))
                .map(|id| vec![AttributeChange::new("id", Some(id.clone()), None)])
                .unwrap_or_default();
            return Ok(PlanResult::with_changes(Value::Null, changes));
        },
        other => {
            return Err(ProviderError::Validation(format!(
                "proposed state must be an object, got {}",
                other
            )))
        },
    };

    if let Some(prior) = prior {
        if let Some(id) = prior.get("id") {
            planned.insert("id".to_string(), id.clone());
        }
        let stale: Vec<&str> = resources::resolved_from(kind)
            .iter()
            .filter(|(_, source)| present(Some(prior), source) != present(Some(&planned), source))
            .map(|(computed, _)| *computed)
            .collect();
        for (name, attr) in &schema.block.attributes {
            let unset = planned.get(name).map_or(true, Value::is_null);
            if attr.flags.computed && unset && !stale.contains(&name.as_str()) {
                if let Some(value) = prior.get(name) {
                    planned.insert(name.clone(), value.clone());
                }
            }
        }
    }

    let mut changes = Vec::new();
    for name in schema.block.attributes.keys() {
        let before = present(prior, name);
        let after = present(Some(&planned), name);
        if before != after {
            changes.push(AttributeChange::new(name.as_str(), before, after));
        }
    }
    for (name, nested) in &schema.block.blocks {
        let before = present(prior, name).map(|v| comparable_items(&nested.block, v));
        let after = present(Some(&planned), name).map(|v| comparable_items(&nested.block, v));
        if before != after {
            changes.push(AttributeChange::new(
                name.as_str(),
                present(prior, name),
                present(Some(&planned), name),
            ));
        }
    }

    let planned = Value::Object(planned);
    if changes.is_empty() {
        Ok(PlanResult::no_change(planned))
    } else {
        Ok(PlanResult::with_changes(planned, changes))
    }
}

fn present(state: Option<&Map<String, Value>>, name: &str) -> Option<Value> {
    state
        .and_then(|s| s.get(name))
        .filter(|v| !v.is_null() && v.as_array().map_or(true, |items| !items.is_empty()))
        .cloned()
}

fn comparable_items(block: &Block, items: Value) -> Value {
    let Value::Array(items) = items else {
        return items;
    };

    let items = items
        .into_iter()
        .map(|item| match item {
            Value::Object(mut map) => {
                for (name, attr) in &block.attributes {
                    if attr.flags.sensitive {
                        map.remove(name);
                        continue;
                    }
                    if let Some(default) = &attr.default {
                        if map.get(name).map_or(true, Value::is_null) {
                            map.insert(name.clone(), default.clone());
                        }
                    }
                }
                Value::Object(map)
            },
            other => other,
        })
        .collect();
    Value::Array(items)
}

#[async_trait::async_trait]
impl ProviderService for JumpServerProvider {
    fn schema(&self) -> ProviderSchema {
        ResourceKind::ALL.into_iter().fold(
            ProviderSchema::new().with_provider_config(provider_config_schema()),
            |schema, kind| schema.with_resource(kind.type_name(), resources::schema_for(kind)),
        )
    }

    async fn validate_provider_config(&self, config: Value) -> Result<Vec<Diagnostic>> {
        let mut diagnostics = validation::validate(&provider_config_schema(), &config);
        if diagnostics.iter().any(Diagnostic::is_error) {
            return Ok(diagnostics);
        }
        diagnostics.extend(self.parse_config(config)?.diagnostics());
        Ok(diagnostics)
    }

    #[instrument(skip_all)]
    async fn configure(&self, config: Value) -> Result<Vec<Diagnostic>> {
        if self.client.get().is_some() {
            return Err(ProviderError::Configuration("provider is already configured".to_string()));
        }

        let config = self.parse_config(config)?;
        debug!(?config, "configuring provider");

        let diagnostics = config.diagnostics();
        if let Some(error) = diagnostics.iter().find(|d| d.is_error()) {
            return Err(ProviderError::Configuration(match &error.detail {
                Some(detail) => detail.clone(),
                None => error.summary.clone(),
            }));
        }

        let client = JumpServerClient::connect(&config).await?;
        self.client
            .set(client)
            .map_err(|_| ProviderError::Configuration("provider is already configured".to_string()))?;

        info!("provider configured");
        Ok(diagnostics)
    }

    async fn validate_resource_config(&self, resource_type: &str, config: Value) -> Result<Vec<Diagnostic>> {
        let kind = kind_of(resource_type)?;
        Ok(validation::validate(&resources::schema_for(kind), &config))
    }

    async fn plan(&self, resource_type: &str, prior_state: Option<Value>, proposed_state: Value) -> Result<PlanResult> {
        let kind = kind_of(resource_type)?;
        plan_state(kind, prior_state.as_ref(), proposed_state)
    }

    #[instrument(skip(self, planned_state))]
    async fn create(&self, resource_type: &str, planned_state: Value) -> Result<Value> {
        let kind = kind_of(resource_type)?;
        let client = self.session()?;
        match kind {
            ResourceKind::User => create_typed::<User>(client, planned_state).await,
            ResourceKind::Host => create_typed::<Host>(client, planned_state).await,
            ResourceKind::SystemUser => create_typed::<SystemUser>(client, planned_state).await,
            ResourceKind::Asset => create_typed::<Asset>(client, planned_state).await,
            ResourceKind::AssetPermission => create_typed::<AssetPermission>(client, planned_state).await,
        }
    }

    #[instrument(skip(self, current_state))]
    async fn read(&self, resource_type: &str, current_state: Value) -> Result<Option<Value>> {
        let kind = kind_of(resource_type)?;
        let client = self.session()?;
        match kind {
            ResourceKind::User => read_typed::<User>(client, current_state).await,
            ResourceKind::Host => read_typed::<Host>(client, current_state).await,
            ResourceKind::SystemUser => read_typed::<SystemUser>(client, current_state).await,
            ResourceKind::Asset => read_typed::<Asset>(client, current_state).await,
            ResourceKind::AssetPermission => read_typed::<AssetPermission>(client, current_state).await,
        }
    }

    #[instrument(skip(self, prior_state, planned_state))]
    async fn update(&self, resource_type: &str, prior_state: Value, planned_state: Value) -> Result<Value> {
        let kind = kind_of(resource_type)?;
        let client = self.session()?;
        match kind {
            ResourceKind::User => update_typed::<User>(client, prior_state, planned_state).await,
            ResourceKind::Host => update_typed::<Host>(client, prior_state, planned_state).await,
            ResourceKind::SystemUser => update_typed::<SystemUser>(client, prior_state, planned_state).await,
            ResourceKind::Asset => update_typed::<Asset>(client, prior_state, planned_state).await,
            ResourceKind::AssetPermission => {
                update_typed::<AssetPermission>(client, prior_state, planned_state).await
            },
        }
    }

    #[instrument(skip(self, current_state))]
    async fn delete(&self, resource_type: &str, current_state: Value) -> Result<()> {
        let kind = kind_of(resource_type)?;
        let client = self.session()?;
        resources::delete(client, kind, &state_id(&current_state)?).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn offline() -> JumpServerProvider {
        JumpServerProvider::with_env_lookup(|_| None)
    }

    #[test]
    fn test_schema_lists_every_kind() {
        let provider = offline();
        let schema = provider.schema();
        assert_eq!(schema.resources.len(), 5);
        assert!(schema.resources.contains_key("jumpserver_asset_permission"));
        assert!(schema.provider.block.attributes.contains_key("base_url"));

        let metadata = provider.metadata();
        assert!(metadata.resources.contains(&"jumpserver_host".to_string()));
    }

    #[tokio::test]
    async fn test_calls_before_configure_fail() {
        let err = offline()
            .read("jumpserver_user", json!({"id": "u-1"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_unknown_resource_type() {
        let err = offline()
            .create("jumpserver_vm", json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::UnknownResource(ref t) if t == "jumpserver_vm"));
    }

    #[tokio::test]
    async fn test_configure_without_credentials_fails() {
        let err = offline()
            .configure(json!({"base_url": "https://jump.example.com"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Configuration(ref m) if m.contains("credentials")));
    }

    #[tokio::test]
    async fn test_validate_provider_config_reports_type_errors() {
        let diagnostics = offline()
            .validate_provider_config(json!({"base_url": 42}))
            .await
            .unwrap();
        assert_eq!(diagnostics[0].attribute.as_deref(), Some("base_url"));
    }

    #[tokio::test]
    async fn test_validate_provider_config_warns_on_insecure_tls() {
        let diagnostics = offline()
            .validate_provider_config(json!({
                "base_url": "https://jump.example.com",
                "token": "t",
                "skip_tls_verify": true
            }))
            .await
            .unwrap();
        assert!(diagnostics.iter().all(|d| !d.is_error()));
        assert!(diagnostics.iter().any(|d| d.attribute.as_deref() == Some("skip_tls_verify")));
    }

    #[test]
    fn test_plan_create_lists_every_set_attribute() {
        let plan = plan_state(
            ResourceKind::User,
            None,
            json!({
                "name": "Ops",
                "username": "ops",
                "email": "ops@example.com",
                "system_roles": ["User"]
            }),
        )
        .unwrap();
        assert_eq!(plan.changes.len(), 4);
        assert!(!plan.requires_replace);
    }

    #[test]
    fn test_plan_carries_computed_attributes() {
        let prior = json!({
            "id": "h-1",
            "name": "web-01",
            "address": "10.0.0.5",
            "platform": 1,
            "domain_name": "Default",
            "node_name": "/",
            "domain_id": "d-1",
            "node_ids": ["n-1"],
            "accounts": [{"on_invalid": "error", "is_active": true, "name": "root",
                          "username": "root", "secret_type": "password"}]
        });
        let proposed = json!({
            "name": "web-01",
            "address": "10.0.0.6",
            "platform": 1,
            "domain_name": "Default",
            "node_name": "/",
            "accounts": [{"on_invalid": "error", "is_active": true, "name": "root",
                          "username": "root", "secret_type": "password", "secret": "x"}]
        });

        let plan = plan_state(ResourceKind::Host, Some(&prior), proposed).unwrap();
        assert_eq!(plan.planned_state["id"], "h-1");
        assert_eq!(plan.planned_state["domain_id"], "d-1");
        assert_eq!(plan.planned_state["node_ids"], json!(["n-1"]));
        assert_eq!(plan.changes.len(), 1);
        assert_eq!(plan.changes[0].path, "address");
    }

    #[test]
    fn test_plan_renamed_node_drops_stale_identifier() {
        let prior = json!({
            "id": "h-1", "name": "web-01", "address": "10.0.0.5", "platform": 1,
            "domain_name": "Default", "node_name": "/",
            "domain_id": "d-1", "node_ids": ["n-1"]
        });
        let proposed = json!({
            "name": "web-01", "address": "10.0.0.5", "platform": 1,
            "domain_name": "Default", "node_name": "/ops"
        });

        let plan = plan_state(ResourceKind::Host, Some(&prior), proposed).unwrap();
        assert_eq!(plan.planned_state["domain_id"], "d-1");
        assert!(plan.planned_state.get("node_ids").is_none());
        let paths: Vec<_> = plan.changes.iter().map(|c| c.path.as_str()).collect();
        assert_eq!(paths, vec!["node_ids", "node_name"]);
    }

    #[test]
    fn test_plan_without_changes() {
        let state = json!({
            "id": "a-1", "hostname": "h", "ip": "10.0.0.1", "platform": "Linux",
            "protocols": ["ssh/22"], "nodes_display": ["/Default"]
        });
        let plan = plan_state(ResourceKind::Asset, Some(&state), state.clone()).unwrap();
        assert!(plan.changes.is_empty());
        assert_eq!(plan.planned_state, state);
    }

    #[test]
    fn test_plan_destroy() {
        let prior = json!({"id": "u-1", "name": "Ops"});
        let plan = plan_state(ResourceKind::User, Some(&prior), Value::Null).unwrap();
        assert!(plan.planned_state.is_null());
        assert_eq!(plan.changes[0].path, "id");
    }
}
