//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building HTTP clients with proper user agent strings
//! - GET requests with a per-attempt deadline
//! - Error classification into [`FailureKind`]
//!
//! Retries and politeness delays are the caller's concern; one call here is
//! exactly one request.

use crate::config::UserAgentConfig;
use crate::state::FailureKind;
use reqwest::{redirect::Policy, Client, StatusCode};
use std::time::Duration;

/// Result of a fetch operation
#[derive(Debug)]
pub enum FetchResult {
    /// Successfully fetched the page
    Success {
        /// Final URL after redirects
        final_url: String,
        /// HTTP status code
        status_code: u16,
        /// Page body content
        body: String,
    },

    /// The attempt failed; the kind decides whether it is retried
    Failed(FailureKind),
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The user agent configuration
/// * `timeout` - Deadline for a whole request, connect included
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use lineage_crawler::config::UserAgentConfig;
/// use lineage_crawler::crawler::build_http_client;
/// use std::time::Duration;
///
/// let config = UserAgentConfig {
///     crawler_name: "LineageCrawler".to_string(),
///     crawler_version: "1.0".to_string(),
///     contact_url: "https://example.com/about".to_string(),
///     contact_email: "admin@example.com".to_string(),
/// };
///
/// let client = build_http_client(&config, Duration::from_secs(30)).unwrap();
/// ```
pub fn build_http_client(config: &UserAgentConfig, timeout: Duration) -> Result<Client, reqwest::Error> {
    // Format: CrawlerName/Version (+ContactURL; ContactEmail)
    let user_agent = format!(
        "{}/{} (+{}; {})",
        config.crawler_name, config.crawler_version, config.contact_url, config.contact_email
    );

    Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .redirect(Policy::limited(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches a URL once and classifies the result
///
/// | Condition | Result |
/// |-----------|--------|
/// | 2xx with content | Success |
/// | 2xx, blank body | EmptyBody |
/// | HTTP 429 | RateLimited |
/// | Other non-2xx | HttpStatus |
/// | Deadline exceeded | TimeoutFailure |
/// | Connect/DNS/TLS error | ConnectionFailure |
/// | Request cannot be built | InvalidRequest |
///
/// # Arguments
///
/// * `client` - The HTTP client to use
/// * `url` - The URL to fetch
pub async fn fetch_url(client: &Client, url: &str) -> FetchResult {
    let response = match client.get(url).send().await {
        Ok(response) => response,
        Err(e) => return FetchResult::Failed(classify_error(&e)),
    };

    let status = response.status();
    let final_url = response.url().to_string();

    if status == StatusCode::TOO_MANY_REQUESTS {
        return FetchResult::Failed(FailureKind::RateLimited);
    }

    if !status.is_success() {
        return FetchResult::Failed(FailureKind::HttpStatus(status.as_u16()));
    }

    match response.text().await {
        Ok(body) if body.trim().is_empty() => FetchResult::Failed(FailureKind::EmptyBody),
        Ok(body) => FetchResult::Success {
            final_url,
            status_code: status.as_u16(),
            body,
        },
        Err(e) => FetchResult::Failed(classify_error(&e)),
    }
}

fn classify_error(e: &reqwest::Error) -> FailureKind {
    if e.is_timeout() {
        FailureKind::TimeoutFailure
    } else if e.is_builder() {
        FailureKind::InvalidRequest(e.to_string())
    } else {
        FailureKind::ConnectionFailure
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn create_test_config() -> UserAgentConfig {
        UserAgentConfig {
            crawler_name: "TestCrawler".to_string(),
            crawler_version: "1.0".to_string(),
            contact_url: "https://example.com/about".to_string(),
            contact_email: "admin@example.com".to_string(),
        }
    }

    fn client() -> Client {
        build_http_client(&create_test_config(), Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_build_http_client() {
        let config = create_test_config();
        let client = build_http_client(&config, Duration::from_secs(30));
        assert!(client.is_ok());
    }

    #[tokio::test]
    async fn test_fetch_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/tree"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>ok</html>"))
            .mount(&server)
            .await;

        let url = format!("{}/tree", server.uri());
        match fetch_url(&client(), &url).await {
            FetchResult::Success {
                status_code, body, ..
            } => {
                assert_eq!(status_code, 200);
                assert_eq!(body, "<html>ok</html>");
            }
            other => panic!("expected success, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fetch_rate_limited() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let result = fetch_url(&client(), &server.uri()).await;
        assert!(matches!(result, FetchResult::Failed(FailureKind::RateLimited)));
    }

    #[tokio::test]
    async fn test_fetch_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let result = fetch_url(&client(), &server.uri()).await;
        assert!(matches!(result, FetchResult::Failed(FailureKind::HttpStatus(503))));
    }

    #[tokio::test]
    async fn test_fetch_empty_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("  \n"))
            .mount(&server)
            .await;

        let result = fetch_url(&client(), &server.uri()).await;
        assert!(matches!(result, FetchResult::Failed(FailureKind::EmptyBody)));
    }

    #[tokio::test]
    async fn test_fetch_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("late")
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let client = build_http_client(&create_test_config(), Duration::from_millis(100)).unwrap();
        let result = fetch_url(&client, &server.uri()).await;
        assert!(matches!(result, FetchResult::Failed(FailureKind::TimeoutFailure)));
    }

    #[tokio::test]
    async fn test_fetch_connection_refused() {
        // Nothing listens on port 9 of localhost in the test environment
        let result = fetch_url(&client(), "http://127.0.0.1:9/").await;
        assert!(matches!(result, FetchResult::Failed(FailureKind::ConnectionFailure)));
    }
}
