//! Configuration file driving a real HTTP client.

use std::sync::Arc;

use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use warden_client::HttpAdminApi;
use warden_engine::{AdminControl, ConfigError, WardenConfig};

use crate::common::{QueueVerifier, founder_token};

#[tokio::test]
async fn config_file_wires_base_url_device_and_token_file() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let token_path = dir.path().join("token");
    std::fs::write(&token_path, format!("{}\n", founder_token())).unwrap();

    let config_path = dir.path().join("config.toml");
    std::fs::write(
        &config_path,
        format!(
            "[admin]\nbase_url = \"{}/api/admin\"\ndevice_id = \"ops-laptop\"\nrequest_timeout_secs = 5\n\n[credentials]\ntoken_env = \"WARDEN_IT_UNSET_TOKEN\"\ntoken_file = {:?}\n",
            server.uri(),
            token_path.display().to_string()
        ),
    )
    .unwrap();

    Mock::given(method("POST"))
        .and(path("/api/admin/users/u1/unshadowban"))
        .and(header("x-device-id", "ops-laptop"))
        .and(header("authorization", format!("Bearer {}", founder_token()).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let config = WardenConfig::load_from(&config_path).unwrap().unwrap();
    let settings = config.http_settings().unwrap();
    assert!(!settings.https_only);

    let control = AdminControl::new(
        Arc::new(config.credential_provider()),
        Arc::new(QueueVerifier::new([true])),
        Arc::new(HttpAdminApi::new(&settings).unwrap()),
        config.device_id(),
    );

    assert!(control.identity().is_founder());
    assert!(control.gateway().unshadowban("u1").await);
}

#[test]
fn malformed_config_is_reported_with_path() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("config.toml");
    std::fs::write(&config_path, "[admin]\nrequest_timeout_secs = \"soon\"\n").unwrap();

    let err = WardenConfig::load_from(&config_path).unwrap_err();

    assert!(matches!(err, ConfigError::Parse { .. }));
    assert!(err.to_string().contains("config.toml"));
}
