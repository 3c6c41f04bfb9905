//! OAuth refresh-token exchange against a mock token endpoint.

use std::sync::Arc;

use chrono::{Duration, Utc};
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use planx::auth::oauth::OAuthRefresher;
use planx::auth::{
    AuthError, Credential, CredentialRefresher, CredentialResolver, CredentialStore,
    InMemoryCredentialStore, Scope,
};
use planx::config::OAuthSettings;
use planx::types::UserIdentity;

fn ada() -> UserIdentity {
    UserIdentity::new("ada@example.com").unwrap()
}

fn expired() -> Credential {
    Credential::new(ada(), "stale-token")
        .with_refresh_token("1//refresh")
        .with_expiry(Utc::now() - Duration::minutes(1))
        .with_scopes([Scope::mail(), Scope::calendar()])
}

fn refresher(server: &MockServer) -> OAuthRefresher {
    OAuthRefresher::new("client-123", "secret-456").with_token_url(format!("{}/token", server.uri()))
}

#[tokio::test]
async fn refresh_posts_form_and_renews_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(header("accept", "application/json"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=1%2F%2Frefresh"))
        .and(body_string_contains("client_id=client-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "fresh-token",
            "expires_in": 3599,
            "token_type": "Bearer"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let renewed = refresher(&server).refresh(&expired()).await.expect("refresh");

    assert_eq!(renewed.access_token, "fresh-token");
    assert_eq!(renewed.refresh_token.as_deref(), Some("1//refresh"));
    assert!(renewed.expires_at.unwrap() > Utc::now() + Duration::minutes(55));
    assert!(renewed.last_refresh.is_some());
    assert_eq!(renewed.scopes, expired().scopes);
}

#[tokio::test]
async fn rotated_refresh_token_and_scopes_are_taken() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "fresh-token",
            "refresh_token": "1//rotated",
            "scope": "mail"
        })))
        .mount(&server)
        .await;

    let renewed = refresher(&server).refresh(&expired()).await.unwrap();

    assert_eq!(renewed.refresh_token.as_deref(), Some("1//rotated"));
    assert_eq!(renewed.scopes.into_iter().collect::<Vec<_>>(), vec![Scope::mail()]);
    assert!(renewed.expires_at.is_none());
}

#[tokio::test]
async fn invalid_grant_is_reported_as_expired_grant() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "Token has been expired or revoked."
        })))
        .mount(&server)
        .await;

    let err = refresher(&server).refresh(&expired()).await.unwrap_err();
    assert!(matches!(err, AuthError::ExpiredOrInvalidGrant));
}

#[tokio::test]
async fn other_rejections_are_invalid_responses() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({ "error": "invalid_client" })))
        .mount(&server)
        .await;

    let err = refresher(&server).refresh(&expired()).await.unwrap_err();
    assert!(matches!(err, AuthError::InvalidResponse(ref msg) if msg.contains("invalid_client")));
}

#[tokio::test]
async fn server_errors_and_empty_tokens_are_invalid_responses() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "access_token": "" })))
        .mount(&server)
        .await;

    let refresher = refresher(&server);
    let err = refresher.refresh(&expired()).await.unwrap_err();
    assert!(matches!(err, AuthError::InvalidResponse(ref msg) if msg.contains("503")));
    let err = refresher.refresh(&expired()).await.unwrap_err();
    assert!(matches!(err, AuthError::InvalidResponse(ref msg) if msg.contains("access_token")));
}

#[tokio::test]
async fn missing_refresh_token_skips_the_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let credential = Credential::new(ada(), "stale").with_expiry(Utc::now() - Duration::minutes(1));
    let err = refresher(&server).refresh(&credential).await.unwrap_err();
    assert!(matches!(err, AuthError::MissingRefreshToken));
}

#[test]
fn settings_without_client_id_are_not_configured() {
    let err = OAuthRefresher::from_settings(&OAuthSettings::default()).unwrap_err();
    assert!(matches!(err, AuthError::NotConfigured(_)));

    let settings = OAuthSettings {
        client_id: Some("client-123".into()),
        ..OAuthSettings::default()
    };
    assert!(OAuthRefresher::from_settings(&settings).is_ok());
}

#[tokio::test]
async fn resolver_persists_refreshed_credential() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "fresh-token",
            "expires_in": 3600
        })))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(InMemoryCredentialStore::new());
    store.upsert(&ada(), &expired()).await.unwrap();
    let resolver = CredentialResolver::new(store.clone(), Some(Arc::new(refresher(&server))));

    let first = resolver.resolve(&ada()).await.unwrap().unwrap();
    // A second resolve finds the renewed credential and does not refresh again.
    let second = resolver.resolve(&ada()).await.unwrap().unwrap();

    assert_eq!(first.access_token, "fresh-token");
    assert_eq!(second.access_token, "fresh-token");
    assert_eq!(
        store.get(&ada()).await.unwrap().unwrap().access_token,
        "fresh-token"
    );
}
