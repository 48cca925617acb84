//! Integration tests for line-client against a mock LINE API.
//!
//! Run with:
//!   cargo test -p line-client --test integration_tests

use line_client::{LineClient, LineConfig, LineError, LoginClient, LoginConfig, Message};
use serde_json::json;
use wiremock::matchers::{body_json, body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn line_client(server: &MockServer) -> LineClient {
    let config = LineConfig::new("test-token", "test-secret").with_api_base_url(server.uri());
    LineClient::new(config).unwrap()
}

fn login_client(server: &MockServer) -> LoginClient {
    let config = LoginConfig::new("1234567890", "login-secret", "http://localhost:3000/api/line-login-callback")
        .with_api_base_url(server.uri());
    LoginClient::new(config).unwrap()
}

mod messaging_tests {
    use super::*;

    #[tokio::test]
    async fn test_push_sends_bearer_and_body() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v2/bot/message/push"))
            .and(header("authorization", "Bearer test-token"))
            .and(body_json(json!({
                "to": "U0001",
                "messages": [{ "type": "text", "text": "こんにちは" }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        line_client(&server).push_text("U0001", "こんにちは").await.unwrap();
    }

    #[tokio::test]
    async fn test_reply_uses_reply_token() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v2/bot/message/reply"))
            .and(body_json(json!({
                "replyToken": "rt-1",
                "messages": [
                    { "type": "flex", "altText": "alt", "contents": { "type": "bubble" } }
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let messages = [Message::flex("alt", json!({ "type": "bubble" }))];
        line_client(&server).reply("rt-1", &messages).await.unwrap();
    }

    #[tokio::test]
    async fn test_api_error_is_mapped() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v2/bot/message/push"))
            .respond_with(
                ResponseTemplate::new(400).set_body_json(json!({ "message": "The request body has 1 error(s)" })),
            )
            .mount(&server)
            .await;

        let err = line_client(&server).push_text("U0001", "hi").await.unwrap_err();
        match err {
            LineError::Api { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "The request body has 1 error(s)");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_api_error_with_plain_body() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v2/bot/message/reply"))
            .respond_with(ResponseTemplate::new(500).set_body_string("upstream down"))
            .mount(&server)
            .await;

        let err = line_client(&server).reply_text("rt", "hi").await.unwrap_err();
        assert!(matches!(err, LineError::Api { status: 500, ref message } if message == "upstream down"));
    }
}

mod login_tests {
    use super::*;

    #[tokio::test]
    async fn test_complete_exchanges_code_and_fetches_profile() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/oauth2/v2.1/token"))
            .and(body_string_contains("grant_type=authorization_code"))
            .and(body_string_contains("code=auth-code"))
            .and(body_string_contains("client_id=1234567890"))
            .and(body_string_contains("client_secret=login-secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "access-1",
                "refresh_token": "refresh-1",
                "token_type": "Bearer",
                "expires_in": 2592000
            })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/v2/profile"))
            .and(header("authorization", "Bearer access-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "userId": "U0001",
                "displayName": "田中",
                "pictureUrl": "https://profile.line-scdn.net/abc"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let profile = login_client(&server).complete("auth-code").await.unwrap();
        assert_eq!(profile.user_id, "U0001");
        assert_eq!(profile.display_name, "田中");
        assert_eq!(profile.picture_url.as_deref(), Some("https://profile.line-scdn.net/abc"));
        assert_eq!(profile.access_token, "access-1");
        assert_eq!(profile.refresh_token.as_deref(), Some("refresh-1"));
    }

    #[tokio::test]
    async fn test_token_failure() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/oauth2/v2.1/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({ "error": "invalid_grant" })))
            .mount(&server)
            .await;

        let err = login_client(&server).complete("bad-code").await.unwrap_err();
        assert!(matches!(err, LineError::TokenExchange(_)));
    }

    #[tokio::test]
    async fn test_profile_failure() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/oauth2/v2.1/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "access_token": "access-1" })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/v2/profile"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let err = login_client(&server).complete("code").await.unwrap_err();
        assert!(matches!(err, LineError::Profile(_)));
    }
}
