use std::time;

use reqwest::StatusCode;
use tracing::debug;

use crate::config::Config;
use crate::encode::{build_list, build_single};
use crate::error::{CaptureError, StatusError, TransportError};

const REQUESTS_COUNTER: &str = "capture_transport_requests_total";

/// POST an already encoded `body` to `url`, failing if the exchange takes longer than `timeout`.
///
/// A client is built for this one request, so the timeout applies to it alone. Callers
/// sending repeatedly to the same endpoint should prefer a [`Transport`].
///
/// # Arguments
///
/// * `url`: The collection endpoint.
/// * `body`: The request body, typically from `build_single` or `build_list`. Ownership is required.
/// * `timeout`: Bounds connecting, sending and reading the response.
pub async fn post(url: &str, body: String, timeout: time::Duration) -> Result<(), TransportError> {
    let client = reqwest::Client::builder().timeout(timeout).build()?;

    send(&client, url, body).await
}

/// Send `body` and classify the response: anything other than a 200 becomes a `StatusError`.
async fn send(client: &reqwest::Client, url: &str, body: String) -> Result<(), TransportError> {
    let response = match client.post(url).body(body).send().await {
        Ok(response) => response,
        Err(error) => {
            debug!(url, "capture request failed: {}", error);
            metrics::counter!(REQUESTS_COUNTER, &[("outcome", "request_error")]).increment(1);
            return Err(TransportError::Request(error));
        }
    };

    let status = response.status();
    if status == StatusCode::OK {
        metrics::counter!(REQUESTS_COUNTER, &[("outcome", "success")]).increment(1);
        return Ok(());
    }

    // An unreadable body is reported as empty.
    let body = response.text().await.unwrap_or_default();
    debug!(url, status = status.as_u16(), "capture endpoint rejected request");
    metrics::counter!(REQUESTS_COUNTER, &[("outcome", "status_error")]).increment(1);

    Err(TransportError::Status(StatusError {
        status_code: status.as_u16(),
        body,
    }))
}

/// Posts encoded payloads to one configured endpoint, reusing a single HTTP client.
#[derive(Clone)]
pub struct Transport {
    client: reqwest::Client,
    url: String,
}

impl Transport {
    pub fn new(config: &Config) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.request_timeout.0)
            .build()?;

        Ok(Self {
            client,
            url: config.capture_url.clone(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// POST an already encoded body to the configured endpoint.
    pub async fn post(&self, body: String) -> Result<(), TransportError> {
        send(&self.client, &self.url, body).await
    }

    /// Encode a single record as a `data` body and send it.
    pub async fn send_single(&self, payload: &str) -> Result<(), CaptureError> {
        let body = build_single(payload)?;
        Ok(self.post(body).await?)
    }

    /// Encode a list of records as a `data_list` body and send it.
    pub async fn send_list(&self, payload: &str) -> Result<(), CaptureError> {
        let body = build_list(payload)?;
        Ok(self.post(body).await?)
    }
}

#[cfg(test)]
mod tests {
    use httpmock::prelude::*;

    use super::*;

    #[tokio::test]
    async fn test_post_ok() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/sa").body("data=abc&gzip=1");
                then.status(200).body("ignored");
            })
            .await;

        post(
            &server.url("/sa"),
            "data=abc&gzip=1".to_owned(),
            time::Duration::from_secs(5),
        )
        .await
        .expect("post failed");

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_post_non_200_is_status_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/sa");
                then.status(500).body("oops");
            })
            .await;

        let error = post(&server.url("/sa"), "body".to_owned(), time::Duration::from_secs(5))
            .await
            .expect_err("post should fail on 500");

        let decoded: StatusError =
            serde_json::from_str(&error.to_string()).expect("error text is not json");
        assert_eq!(
            decoded,
            StatusError {
                status_code: 500,
                body: "oops".to_owned(),
            }
        );
    }

    #[tokio::test]
    async fn test_post_other_success_codes_are_errors() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/sa");
                then.status(204);
            })
            .await;

        let error = post(&server.url("/sa"), "body".to_owned(), time::Duration::from_secs(5))
            .await
            .expect_err("post should only accept 200");

        assert_eq!(error.status_code(), Some(204));
        assert_eq!(error.to_string(), r#"{"StatusCode":204,"Body":""}"#);
    }

    #[tokio::test]
    async fn test_post_times_out() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/slow");
                then.status(200).delay(time::Duration::from_secs(2));
            })
            .await;

        let start = tokio::time::Instant::now();
        let error = post(
            &server.url("/slow"),
            "body".to_owned(),
            time::Duration::from_millis(100),
        )
        .await
        .expect_err("post should time out");

        assert!(error.is_timeout());
        assert!(matches!(error, TransportError::Request(_)));
        assert!(start.elapsed() < time::Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_post_connection_refused() {
        // Nothing listens on the tcpmux port on a test host.
        let error = post(
            "http://127.0.0.1:1/sa",
            "body".to_owned(),
            time::Duration::from_secs(1),
        )
        .await
        .expect_err("post should fail without a listener");

        assert!(matches!(error, TransportError::Request(_)));
        assert_eq!(error.status_code(), None);
    }
}
