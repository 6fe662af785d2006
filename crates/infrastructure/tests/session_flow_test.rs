//! End-to-end session flow against a mocked backend.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;
use std::time::Duration;

use amparo_application::Navigation;
use amparo_domain::{NoticeKind, Role};
use amparo_infrastructure::{AmparoRuntime, AppConfig, ChannelNotifier};
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const USER_ID: &str = "6f1c2a9e-3b4d-4c5e-8f70-112233445566";

async fn mock_backend() -> MockServer {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "password"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "user-token",
            "token_type": "bearer",
            "expires_in": 3600,
            "refresh_token": "user-refresh",
            "user": {"id": USER_ID, "email": "ana@example.org"}
        })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/get_user_role"))
        .and(header("authorization", "Bearer user-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!("social_assistance")))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/profiles"))
        .and(header("authorization", "Bearer user-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": USER_ID,
            "name": "Ana Souza",
            "organization": "CRAS Centro",
            "phone": "11999990000",
            "role": "social_assistance",
            "created_at": "2024-03-01T12:00:00+00:00",
            "updated_at": "2024-03-01T12:00:00+00:00"
        }])))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/auth/v1/logout"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    server
}

fn config(server: &MockServer) -> AppConfig {
    AppConfig::from_json(
        &json!({
            "backend": {"url": server.uri(), "anon_key": "anon-key", "request_timeout_secs": 5},
            "site_url": "https://amparo.example.org",
            "sync": {"guard_timeout_ms": 3000}
        })
        .to_string(),
    )
    .unwrap()
}

#[tokio::test]
async fn test_sign_in_authorize_and_sign_out() {
    let server = mock_backend().await;
    let (notifier, mut notices) = ChannelNotifier::channel();
    let runtime = AmparoRuntime::connect(&config(&server), Arc::new(notifier), None)
        .await
        .unwrap();
    let sync = runtime.synchronizer();
    let gate = runtime.route_gate();

    assert!(!sync.state().is_authenticated());
    assert_eq!(
        gate.navigate("/dashboard").await,
        Navigation::Redirect("/login".to_string())
    );

    sync.sign_in("ana@example.org", "secret1").await.unwrap();
    let mut rx = sync.subscribe();
    tokio::time::timeout(Duration::from_secs(5), rx.wait_for(|s| s.profile.is_some()))
        .await
        .expect("profile never loaded")
        .unwrap();

    let state = sync.state();
    assert_eq!(state.current_role(), Some(Role::SocialAssistance));
    assert_eq!(
        state.profile.as_ref().map(|p| p.display_name.as_str()),
        Some("Ana Souza")
    );
    assert!(runtime.session().await.is_some());

    assert_eq!(gate.navigate("/followups").await, Navigation::Render);
    assert_eq!(
        gate.navigate("/register").await,
        Navigation::Redirect("/dashboard".to_string())
    );

    sync.sign_out().await.unwrap();
    assert!(!sync.state().is_authenticated());
    assert_eq!(sync.state().profile, None);
    assert!(runtime.session().await.is_none());
    assert_eq!(
        gate.navigate("/case/42").await,
        Navigation::Redirect("/login".to_string())
    );

    let mut kinds = Vec::new();
    while let Ok(notice) = notices.try_recv() {
        kinds.push(notice.kind);
    }
    assert_eq!(
        kinds,
        vec![NoticeKind::Success, NoticeKind::AccessDenied, NoticeKind::Info]
    );

    runtime.shutdown();
}

#[tokio::test]
async fn test_password_reset_uses_absolute_redirect() {
    let server = mock_backend().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/recover"))
        .and(query_param(
            "redirect_to",
            "https://amparo.example.org/reset-password",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let (notifier, mut notices) = ChannelNotifier::channel();
    let runtime = AmparoRuntime::connect(&config(&server), Arc::new(notifier), None)
        .await
        .unwrap();

    runtime
        .request_password_reset()
        .execute("ana@example.org")
        .await
        .unwrap();
    assert_eq!(notices.try_recv().unwrap().kind, NoticeKind::Success);
}
