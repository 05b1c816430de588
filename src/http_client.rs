// HTTP client for the AdGuard DNS API

use reqwest::{Client, Method, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::error::{HttpFailure, SwitchError};

/// Production AdGuard DNS public API
pub const DEFAULT_API_BASE_URL: &str = "https://api.adguard-dns.io/oapi/v1";

/// Raw successful response
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub method: Method,
    pub url: String,
    pub status: StatusCode,
    pub body: String,
}

/// HTTP client for the AdGuard DNS API
/// Clone is cheap - reqwest::Client shares its connection pool.
/// Every call is sent exactly once; failures go straight back to the caller.
#[derive(Clone, Debug)]
pub struct AdGuardHttpClient {
    /// Shared HTTP client with connection pooling
    client: Client,

    /// Base URL all endpoint paths are appended to
    base_url: Url,
}

impl AdGuardHttpClient {
    /// Create a new HTTP client.
    /// Timeouts are only applied when configured; otherwise reqwest defaults hold.
    pub fn new(
        base_url: &str,
        connect_timeout: Option<u64>,
        request_timeout: Option<u64>,
    ) -> Result<Self, SwitchError> {
        let base_url = parse_base_url(base_url)?;

        let mut builder = Client::builder();
        if let Some(secs) = connect_timeout {
            builder = builder.connect_timeout(Duration::from_secs(secs));
        }
        if let Some(secs) = request_timeout {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder.build().map_err(|e| {
            SwitchError::ConfigError(format!("Failed to create HTTP client: {}", e))
        })?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build an endpoint URL from path segments. Segments are percent-encoded.
    pub fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // parse_base_url rejects cannot-be-a-base URLs, so this always succeeds
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Start a request against an endpoint
    pub fn request(&self, method: Method, segments: &[&str]) -> RequestBuilder {
        self.client.request(method, self.endpoint(segments))
    }

    /// Send a request once, mapping every failure to an `HttpFailure`
    pub async fn execute(&self, request: RequestBuilder) -> Result<ApiResponse, HttpFailure> {
        let request = request.build().map_err(|e| {
            let url = e
                .url()
                .map(Url::to_string)
                .unwrap_or_else(|| self.base_url.to_string());
            tracing::error!(url = %url, error = %e, "Failed to build HTTP request");
            HttpFailure::Build { url, source: e }
        })?;

        let method = request.method().clone();
        let url = request.url().to_string();
        tracing::debug!(method = %method, url = %url, "Sending HTTP request");

        let response = match self.client.execute(request).await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(
                    method = %method,
                    url = %url,
                    error_kind = error_kind(&e),
                    error = %e,
                    "HTTP request failed without a response"
                );
                return Err(HttpFailure::Transport {
                    method,
                    url,
                    source: e,
                });
            }
        };

        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                tracing::error!(
                    method = %method,
                    url = %url,
                    status = status.as_u16(),
                    error = %e,
                    "Failed to read response body"
                );
                return Err(HttpFailure::Transport {
                    method,
                    url,
                    source: e,
                });
            }
        };

        tracing::debug!(status = %status, "Received HTTP response");

        if !status.is_success() {
            tracing::error!(
                method = %method,
                url = %url,
                status = status.as_u16(),
                response_body = %body,
                "HTTP request failed with error response"
            );
            return Err(HttpFailure::Status {
                method,
                url,
                status: status.as_u16(),
                body,
            });
        }

        Ok(ApiResponse {
            method,
            url,
            status,
            body,
        })
    }

    /// Send a request once and decode its JSON body
    pub async fn execute_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, HttpFailure> {
        let response = self.execute(request).await?;

        serde_json::from_str(&response.body).map_err(|e| {
            tracing::error!(
                method = %response.method,
                url = %response.url,
                error = %e,
                response_body = %response.body,
                "Failed to parse JSON response"
            );
            HttpFailure::InvalidBody {
                method: response.method.clone(),
                url: response.url.clone(),
                reason: e.to_string(),
            }
        })
    }
}

/// Validate the configured base URL
fn parse_base_url(raw: &str) -> Result<Url, SwitchError> {
    let url = Url::parse(raw)
        .map_err(|e| SwitchError::ConfigError(format!("Invalid API base URL '{}': {}", raw, e)))?;

    if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
        return Err(SwitchError::ConfigError(format!(
            "API base URL must be an absolute http(s) URL: {}",
            raw
        )));
    }

    Ok(url)
}

/// Categorize a transport error for logging
fn error_kind(e: &reqwest::Error) -> &'static str {
    if e.is_timeout() {
        "timeout"
    } else if e.is_connect() {
        "connection_failed"
    } else if e.is_request() {
        "request_error"
    } else if e.is_body() {
        "body_error"
    } else if e.is_decode() {
        "decode_error"
    } else {
        "unknown"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[test]
    fn test_endpoint_appends_segments() {
        let client = AdGuardHttpClient::new(DEFAULT_API_BASE_URL, None, None).unwrap();
        let url = client.endpoint(&["dns_servers", "abc123", "settings"]);
        assert_eq!(
            url.as_str(),
            "https://api.adguard-dns.io/oapi/v1/dns_servers/abc123/settings"
        );
    }

    #[test]
    fn test_endpoint_handles_trailing_slash() {
        let client = AdGuardHttpClient::new("http://localhost:1234/", None, None).unwrap();
        assert_eq!(
            client.endpoint(&["oauth_token"]).as_str(),
            "http://localhost:1234/oauth_token"
        );
    }

    #[test]
    fn test_endpoint_encodes_segments() {
        let client = AdGuardHttpClient::new(DEFAULT_API_BASE_URL, None, None).unwrap();
        let url = client.endpoint(&["dns_servers", "a/b c"]);
        assert!(url.as_str().ends_with("/dns_servers/a%2Fb%20c"));
    }

    #[test]
    fn test_invalid_base_url_is_config_error() {
        for raw in ["not a url", "mailto:someone@example.com", "ftp://example.com/api"] {
            let err = AdGuardHttpClient::new(raw, None, None).unwrap_err();
            assert!(matches!(err, SwitchError::ConfigError(_)), "{raw}");
        }
    }

    #[derive(Debug, Deserialize)]
    struct Probe {
        ok: bool,
    }

    #[tokio::test]
    async fn test_execute_returns_body_on_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/probe")
            .with_status(200)
            .with_body(r#"{"ok":true}"#)
            .expect(1)
            .create_async()
            .await;

        let client = AdGuardHttpClient::new(&server.url(), None, None).unwrap();
        let probe: Probe = client
            .execute_json(client.request(Method::GET, &["probe"]))
            .await
            .unwrap();

        assert!(probe.ok);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_execute_maps_error_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("PUT", "/probe")
            .with_status(503)
            .with_body("maintenance")
            .create_async()
            .await;

        let client = AdGuardHttpClient::new(&server.url(), None, None).unwrap();
        let failure = client
            .execute(client.request(Method::PUT, &["probe"]))
            .await
            .unwrap_err();

        assert_eq!(failure.status(), Some(503));
        assert_eq!(failure.body(), Some("maintenance"));
        assert_eq!(failure.method(), Some(&Method::PUT));
        assert!(failure.url().ends_with("/probe"));
    }

    #[tokio::test]
    async fn test_execute_json_maps_malformed_body() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/probe")
            .with_status(200)
            .with_body("<html>oops</html>")
            .create_async()
            .await;

        let client = AdGuardHttpClient::new(&server.url(), None, None).unwrap();
        let failure = client
            .execute_json::<Probe>(client.request(Method::GET, &["probe"]))
            .await
            .unwrap_err();

        assert!(matches!(failure, HttpFailure::InvalidBody { .. }));
        assert!(failure.url().ends_with("/probe"));
    }

    #[tokio::test]
    async fn test_execute_maps_build_failure_without_method() {
        let mut server = mockito::Server::new_async().await;
        let untouched = server
            .mock("POST", mockito::Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let client = AdGuardHttpClient::new(&server.url(), None, None).unwrap();
        let request = client
            .request(Method::POST, &["oauth_token"])
            .header("x-broken", "line\nbreak");
        let failure = client.execute(request).await.unwrap_err();

        assert!(matches!(failure, HttpFailure::Build { .. }));
        assert_eq!(failure.method(), None);
        assert!(!failure.to_string().contains("GET"));
        assert!(!failure.is_rejection());
        untouched.assert_async().await;
    }

    #[tokio::test]
    async fn test_execute_maps_connection_failure() {
        // Port 9 (discard) on localhost is expected to refuse connections
        let client = AdGuardHttpClient::new("http://127.0.0.1:9", None, Some(5)).unwrap();
        let failure = client
            .execute(client.request(Method::GET, &["probe"]))
            .await
            .unwrap_err();

        assert!(matches!(failure, HttpFailure::Transport { .. }));
        assert!(!failure.is_rejection());
    }
}
