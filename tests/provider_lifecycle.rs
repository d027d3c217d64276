//! End-to-end lifecycle tests through the provider surface.

use jumpserver_provider::testing::{
    assert_no_errors, assert_plan_changes_attribute, assert_plan_has_changes, assert_plan_no_changes,
    assert_warns_on, ProviderTester,
};
use jumpserver_provider::{JumpServerProvider, ProviderError, ProviderService};
use serde_json::{json, Value};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn configured(server: &MockServer) -> ProviderTester<JumpServerProvider> {
    let tester = ProviderTester::new(JumpServerProvider::with_env_lookup(|_| None));
    tester
        .configure(json!({"base_url": server.uri(), "token": "test-token"}))
        .await
        .expect("configure should succeed");
    tester
}

fn permission_body(is_active: bool) -> Value {
    json!({
        "id": "p-1",
        "name": "ops-ssh",
        "is_active": is_active,
        "users_display": ["ops"],
        "assets_display": ["web-01"],
        "system_users_display": ["root"],
        "date_expired": "2099-01-01 00:00:00 +0000"
    })
}

#[tokio::test]
async fn test_asset_permission_crud() {
    let server = MockServer::start().await;
    let tester = configured(&server).await;

    Mock::given(method("POST"))
        .and(path("/api/v1/perms/asset-permissions/"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "p-1"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/perms/asset-permissions/p-1/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(permission_body(true)))
        .mount(&server)
        .await;

    let config = json!({
        "name": "ops-ssh",
        "is_active": true,
        "users_display": ["ops"],
        "assets_display": ["web-01"],
        "system_users_display": ["root"]
    });
    let state = tester
        .lifecycle_create("jumpserver_asset_permission", config.clone())
        .await
        .unwrap()
        .expect("record exists after create");
    assert_eq!(state["id"], "p-1");
    assert_eq!(state["name"], "ops-ssh");
    assert!(state.get("date_expired").is_none());

    let plan = tester
        .plan_update("jumpserver_asset_permission", state.clone(), config.clone())
        .await
        .unwrap();
    assert_plan_no_changes(&plan);

    server.reset().await;
    Mock::given(method("PUT"))
        .and(path("/api/v1/perms/asset-permissions/p-1/"))
        .and(body_partial_json(json!({"is_active": false})))
        .respond_with(ResponseTemplate::new(200).set_body_json(permission_body(false)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/perms/asset-permissions/p-1/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(permission_body(false)))
        .mount(&server)
        .await;

    let mut disabled = config;
    disabled["is_active"] = json!(false);
    let plan = tester
        .plan_update("jumpserver_asset_permission", state.clone(), disabled.clone())
        .await
        .unwrap();
    assert_plan_has_changes(&plan);
    assert_plan_changes_attribute(&plan, "is_active");

    let state = tester
        .lifecycle_update("jumpserver_asset_permission", state, disabled)
        .await
        .unwrap()
        .expect("record exists after update");
    assert_eq!(state["is_active"], false);

    server.reset().await;
    Mock::given(method("DELETE"))
        .and(path("/api/v1/perms/asset-permissions/p-1/"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/perms/asset-permissions/p-1/"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    tester
        .lifecycle_delete("jumpserver_asset_permission", state.clone())
        .await
        .unwrap();
    assert!(tester
        .read("jumpserver_asset_permission", state)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_host_create_through_provider() {
    let server = MockServer::start().await;
    let tester = configured(&server).await;

    Mock::given(method("GET"))
        .and(path("/api/v1/assets/domains/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"name": "Default", "id": "d-1"}])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/assets/nodes/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"name": "/", "id": "n-1"}])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/assets/hosts/"))
        .and(body_partial_json(json!({
            "domain": "d-1",
            "nodes": ["n-1"],
            "accounts": [{"username": "root", "secret": "hunter2"}]
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "h-1"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/assets/hosts/h-1/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "h-1",
            "name": "web-01",
            "address": "10.0.0.5",
            "platform": 1,
            "domain": {"id": "d-1", "name": "Default"},
            "nodes": [{"id": "n-1", "value": "/"}],
            "accounts": [{
                "on_invalid": "error",
                "is_active": true,
                "name": "root",
                "username": "root",
                "secret_type": {"value": "password", "label": "Password"}
            }]
        })))
        .mount(&server)
        .await;

    let config = json!({
        "name": "web-01",
        "address": "10.0.0.5",
        "platform": 1,
        "domain_name": "Default",
        "node_name": "/",
        "accounts": [{
            "name": "root",
            "username": "root",
            "secret_type": "password",
            "secret": "hunter2"
        }]
    });
    tester
        .validate_resource_config("jumpserver_host", config.clone())
        .await
        .unwrap();

    let state = tester.create("jumpserver_host", config.clone()).await.unwrap();
    assert_eq!(state["domain_id"], "d-1");
    assert_eq!(state["node_ids"], json!(["n-1"]));
    assert!(state["accounts"][0].get("secret").is_none());

    // A write-only secret alone does not produce a diff.
    let plan = tester
        .plan_update("jumpserver_host", state, config)
        .await
        .unwrap();
    assert_plan_no_changes(&plan);
}

#[tokio::test]
async fn test_invalid_config_is_rejected_before_any_request() {
    let server = MockServer::start().await;
    let tester = configured(&server).await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let err = tester
        .create("jumpserver_user", json!({"name": "Ops", "username": "ops", "system_roles": "User"}))
        .await
        .unwrap_err();
    match err {
        ProviderError::Validation(message) => {
            assert!(message.contains("email"));
            assert!(message.contains("system_roles"));
        },
        other => panic!("expected validation error, got {other}"),
    }
}

#[tokio::test]
async fn test_configure_only_once() {
    let server = MockServer::start().await;
    let tester = configured(&server).await;

    let err = tester
        .provider()
        .configure(json!({"base_url": server.uri(), "token": "other"}))
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::Configuration(ref m) if m.contains("already configured")));
}

#[tokio::test]
async fn test_configure_reports_warnings() {
    let server = MockServer::start().await;
    let provider = JumpServerProvider::with_env_lookup(|_| None);

    let diagnostics = provider
        .configure(json!({
            "base_url": server.uri(),
            "token": "t",
            "access_key": "ak",
            "secret_key": "sk",
            "skip_tls_verify": true
        }))
        .await
        .unwrap();

    assert_no_errors(&diagnostics);
    assert_warns_on(&diagnostics, "skip_tls_verify");
    assert_warns_on(&diagnostics, "token");
}

#[tokio::test]
async fn test_configure_falls_back_to_environment() {
    let server = MockServer::start().await;
    let uri = server.uri();
    let provider = JumpServerProvider::with_env_lookup(move |key| match key {
        "JUMPSERVER_BASE_URL" => Some(uri.clone()),
        "JUMPSERVER_TOKEN" => Some("env-token".to_string()),
        _ => None,
    });

    Mock::given(method("DELETE"))
        .and(path("/api/v1/users/users/u-1/"))
        .and(wiremock::matchers::bearer_token("env-token"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    provider.configure(Value::Null).await.unwrap();
    provider
        .delete("jumpserver_user", json!({"id": "u-1"}))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_state_without_id() {
    let server = MockServer::start().await;
    let tester = configured(&server).await;

    let err = tester
        .delete("jumpserver_asset", json!({"hostname": "web-01"}))
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::Validation(_)));
}
