//! Outbound fetching of fonts and images.

use futures::future::BoxFuture;
use anyhow::Result;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use reqwest::header::CONTENT_TYPE;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} responded with status {status}")]
    Status { url: String, status: u16 },

    #[error("{url} is not an image (content-type: {content_type})")]
    NotAnImage { url: String, content_type: String },
}

/// A buffered HTTP response.
#[derive(Debug, Clone, Default)]
pub struct FetchResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl FetchResponse {
    #[inline]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// HTTP GET.
pub trait Fetcher: Send + Sync {
    fn get<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<FetchResponse, FetchError>>;
}

/// `Fetcher` backed by a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()?;
        Ok(Self { client })
    }
}

impl Fetcher for HttpFetcher {
    fn get<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<FetchResponse, FetchError>> {
        Box::pin(async move {
            let request_error = |source| FetchError::Request {
                url: url.to_owned(),
                source,
            };
            let response = self.client.get(url).send().await.map_err(request_error)?;

            let status = response.status().as_u16();
            let content_type = response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(str::to_owned);
            let body = response.bytes().await.map_err(request_error)?.to_vec();

            Ok(FetchResponse {
                status,
                content_type,
                body,
            })
        })
    }
}

/// GET `url`, failing on a non-2xx status.
pub async fn fetch_ok(fetcher: &dyn Fetcher, url: &str) -> Result<FetchResponse, FetchError> {
    let response = fetcher.get(url).await?;
    if !response.is_success() {
        return Err(FetchError::Status {
            url: url.to_owned(),
            status: response.status,
        });
    }
    Ok(response)
}

/// GET an image and encode it as a `data:` URI.
///
/// Responses whose content type is not `image/*` are rejected.
pub async fn fetch_image_data_uri(fetcher: &dyn Fetcher, url: &str) -> Result<String, FetchError> {
    let response = fetch_ok(fetcher, url).await?;
    let content_type = response.content_type.unwrap_or_default();
    if !content_type.starts_with("image/") {
        return Err(FetchError::NotAnImage {
            url: url.to_owned(),
            content_type,
        });
    }
    Ok(data_uri(&content_type, &response.body))
}

/// Encode bytes as a base64 `data:` URI.
pub fn data_uri(mime: &str, bytes: &[u8]) -> String {
    format!("data:{mime};base64,{}", STANDARD.encode(bytes))
}

/// In-memory `Fetcher` for tests.
#[cfg(test)]
pub mod stub {
    use super::*;
    use parking_lot::Mutex;
    use rustc_hash::FxHashMap;

    #[derive(Debug, Default)]
    pub struct StubFetcher {
        responses: FxHashMap<String, FetchResponse>,
        calls: Mutex<Vec<String>>,
    }

    impl StubFetcher {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with(mut self, url: &str, content_type: &str, body: &[u8]) -> Self {
            self.responses.insert(
                url.to_owned(),
                FetchResponse {
                    status: 200,
                    content_type: Some(content_type.to_owned()),
                    body: body.to_vec(),
                },
            );
            self
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().clone()
        }
    }

    impl Fetcher for StubFetcher {
        fn get<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<FetchResponse, FetchError>> {
            self.calls.lock().push(url.to_owned());
            let response = self.responses.get(url).cloned().unwrap_or(FetchResponse {
                status: 404,
                ..FetchResponse::default()
            });
            Box::pin(async move { Ok(response) })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::stub::StubFetcher;
    use super::*;

    #[test]
    fn test_data_uri() {
        assert_eq!(data_uri("image/png", b"abc"), "data:image/png;base64,YWJj");
    }

    #[tokio::test]
    async fn test_fetch_image_data_uri() {
        let fetcher = StubFetcher::new().with("https://a/i.png", "image/png", b"abc");

        let uri = fetch_image_data_uri(&fetcher, "https://a/i.png").await.unwrap();
        assert_eq!(uri, "data:image/png;base64,YWJj");
    }

    #[tokio::test]
    async fn test_fetch_image_rejects_non_image() {
        let fetcher = StubFetcher::new().with("https://a/page", "text/html", b"<html>");

        let err = fetch_image_data_uri(&fetcher, "https://a/page").await.unwrap_err();
        assert!(matches!(err, FetchError::NotAnImage { .. }));
    }

    #[tokio::test]
    async fn test_fetch_ok_rejects_status() {
        let fetcher = StubFetcher::new();

        let err = fetch_ok(&fetcher, "https://a/missing").await.unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 404, .. }));
    }
}
