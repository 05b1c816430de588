// Token endpoint calls

use reqwest::{header, Method};

use super::types::Credentials;
use crate::error::HttpFailure;
use crate::http_client::AdGuardHttpClient;
use crate::models::TokenResponse;

const TOKEN_ENDPOINT: &str = "oauth_token";

/// Exchange username/password (and MFA code, if any) for a token pair
pub async fn request_password_grant(
    http: &AdGuardHttpClient,
    creds: &Credentials,
) -> Result<TokenResponse, HttpFailure> {
    tracing::debug!(
        username = %creds.username,
        with_mfa = creds.mfa_token.is_some(),
        "Requesting token with password grant"
    );

    let mut form = vec![
        ("username", creds.username.as_str()),
        ("password", creds.password.as_str()),
    ];
    if let Some(ref mfa_token) = creds.mfa_token {
        form.push(("mfa_token", mfa_token.as_str()));
    }

    let request = http
        .request(Method::POST, &[TOKEN_ENDPOINT])
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .form(&form);

    let token: TokenResponse = http.execute_json(request).await?;
    check_access_token(http, token)
}

/// Exchange a refresh token for a new access token
pub async fn request_refresh_grant(
    http: &AdGuardHttpClient,
    refresh_token: &str,
) -> Result<TokenResponse, HttpFailure> {
    tracing::debug!("Requesting token with refresh grant");

    let request = http
        .request(Method::POST, &[TOKEN_ENDPOINT])
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .form(&[("refresh_token", refresh_token)]);

    let token: TokenResponse = http.execute_json(request).await?;
    check_access_token(http, token)
}

fn check_access_token(
    http: &AdGuardHttpClient,
    token: TokenResponse,
) -> Result<TokenResponse, HttpFailure> {
    if token.access_token.is_empty() {
        return Err(HttpFailure::InvalidBody {
            method: Method::POST,
            url: http.endpoint(&[TOKEN_ENDPOINT]).to_string(),
            reason: "response does not contain access_token".to_string(),
        });
    }
    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn client(server: &mockito::Server) -> AdGuardHttpClient {
        AdGuardHttpClient::new(&server.url(), None, None).unwrap()
    }

    #[tokio::test]
    async fn test_password_grant_sends_form() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/oauth_token")
            .match_header("content-type", "application/x-www-form-urlencoded")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("username".into(), "user@example.com".into()),
                Matcher::UrlEncoded("password".into(), "p@ss word".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"access_token":"A","refresh_token":"R","expires_in":3600}"#)
            .expect(1)
            .create_async()
            .await;

        let creds = Credentials::new(
            "user@example.com".to_string(),
            "p@ss word".to_string(),
            None,
        );
        let token = request_password_grant(&client(&server), &creds)
            .await
            .unwrap();

        assert_eq!(token.access_token, "A");
        assert_eq!(token.refresh_token.as_deref(), Some("R"));
        assert_eq!(token.expires_in, 3600);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_password_grant_omits_mfa_token_when_absent() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/oauth_token")
            .match_body(Matcher::Regex("^username=u&password=p$".to_string()))
            .with_body(r#"{"access_token":"A","refresh_token":"R","expires_in":3600}"#)
            .expect(1)
            .create_async()
            .await;

        let creds = Credentials::new("u".to_string(), "p".to_string(), None);
        request_password_grant(&client(&server), &creds)
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_password_grant_sends_mfa_token() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/oauth_token")
            .match_body(Matcher::UrlEncoded("mfa_token".into(), "654321".into()))
            .with_body(r#"{"access_token":"A","refresh_token":"R","expires_in":3600}"#)
            .expect(1)
            .create_async()
            .await;

        let creds = Credentials::new("u".to_string(), "p".to_string(), Some("654321".to_string()));
        request_password_grant(&client(&server), &creds)
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_password_grant_rejection() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/oauth_token")
            .with_status(401)
            .with_body(r#"{"error":"invalid_grant"}"#)
            .create_async()
            .await;

        let creds = Credentials::new("u".to_string(), "wrong".to_string(), None);
        let failure = request_password_grant(&client(&server), &creds)
            .await
            .unwrap_err();

        assert_eq!(failure.status(), Some(401));
        assert_eq!(failure.body(), Some(r#"{"error":"invalid_grant"}"#));
    }

    #[tokio::test]
    async fn test_refresh_grant_sends_only_refresh_token() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/oauth_token")
            .match_header("content-type", "application/x-www-form-urlencoded")
            .match_body(Matcher::Exact("refresh_token=R".to_string()))
            .with_body(r#"{"access_token":"B","expires_in":1800}"#)
            .expect(1)
            .create_async()
            .await;

        let token = request_refresh_grant(&client(&server), "R").await.unwrap();

        assert_eq!(token.access_token, "B");
        assert!(token.refresh_token.is_none());
        assert_eq!(token.expires_in, 1800);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_empty_access_token_is_invalid_body() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/oauth_token")
            .with_body(r#"{"access_token":"","expires_in":1800}"#)
            .create_async()
            .await;

        let failure = request_refresh_grant(&client(&server), "R")
            .await
            .unwrap_err();
        assert!(matches!(failure, HttpFailure::InvalidBody { .. }));
    }
}
