use std::time::Duration;

use async_trait::async_trait;
use avatar_lib::assets::AssetSource;
use avatar_lib::errors::{FetchError, FetchResult};
use http::Method;
use tracing::{instrument, trace};
use url::Url;

use crate::error::Result;
use crate::utils::http_client::AvatarHttpClient;

/// Fetches part documents with a GET relative to a base url.
pub struct HttpAssetSource {
    client: AvatarHttpClient,
    base_url: Url,
    request_timeout: Duration,
}

impl HttpAssetSource {
    pub fn new(base_url: &str, rate_limit_per_second: u64, request_timeout: Duration) -> Result<Self> {
        // Without the trailing slash, joining would replace the last path segment.
        let base_url = if base_url.ends_with('/') {
            Url::parse(base_url)
        } else {
            Url::parse(&format!("{base_url}/"))
        }
        .map_err(crate::error::HttpClientError::from)?;

        Ok(Self {
            client: AvatarHttpClient::new(rate_limit_per_second),
            base_url,
            request_timeout,
        })
    }

    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url_for(&self, file_ref: &str) -> FetchResult<Url> {
        if file_ref.is_empty() || file_ref.starts_with('/') || file_ref.contains("://") {
            return Err(FetchError::InvalidReference(file_ref.to_owned()));
        }

        self.base_url
            .join(file_ref)
            .map_err(|_| FetchError::InvalidReference(file_ref.to_owned()))
    }
}

#[async_trait]
impl AssetSource for HttpAssetSource {
    #[instrument(skip(self))]
    async fn fetch(&self, file_ref: &str) -> FetchResult<String> {
        let url = self.url_for(file_ref)?;

        let request = self.client.do_request(url.as_str(), Method::GET);

        let (status, body) = tokio::time::timeout(self.request_timeout, request)
            .await
            .map_err(|_| FetchError::TimedOut {
                file_ref: file_ref.to_owned(),
            })?
            .map_err(|e| FetchError::Transport {
                file_ref: file_ref.to_owned(),
                message: e.to_string(),
            })?;

        if !status.is_success() {
            return Err(FetchError::UnexpectedStatus {
                file_ref: file_ref.to_owned(),
                status: status.as_u16(),
            });
        }

        trace!(bytes = body.len(), "Fetched part");

        String::from_utf8(body.to_vec()).map_err(|e| FetchError::Transport {
            file_ref: file_ref.to_owned(),
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use avatar_lib::assets::AssetSource;
    use avatar_lib::errors::FetchError;
    use wiremock::matchers::{header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::HttpAssetSource;

    const HEAD: &str = r#"<svg viewBox="-50 -150 100 200"><circle r="10"/></svg>"#;

    fn source(server: &MockServer, timeout: Duration) -> HttpAssetSource {
        HttpAssetSource::new(&format!("{}/template", server.uri()), 10, timeout)
            .expect("valid base url")
    }

    #[tokio::test]
    async fn fetches_relative_to_the_base_url() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/template/front-body-flesh-Head.svg"))
            .and(header_exists("user-agent"))
            .respond_with(ResponseTemplate::new(200).set_body_string(HEAD))
            .expect(1)
            .mount(&server)
            .await;

        let source = source(&server, Duration::from_secs(5));

        assert!(source.base_url().as_str().ends_with("/template/"));
        assert_eq!(
            source.fetch("front-body-flesh-Head.svg").await.as_deref(),
            Ok(HEAD)
        );
    }

    #[tokio::test]
    async fn error_statuses_are_failures() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let source = source(&server, Duration::from_secs(5));

        assert_eq!(
            source.fetch("back-body-flesh-Head.svg").await,
            Err(FetchError::UnexpectedStatus {
                file_ref: "back-body-flesh-Head.svg".into(),
                status: 404,
            })
        );
        assert_eq!(
            source.fetch("/etc/passwd").await,
            Err(FetchError::InvalidReference("/etc/passwd".into()))
        );
    }

    #[tokio::test]
    async fn slow_responses_time_out() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(HEAD)
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let source = source(&server, Duration::from_millis(100));

        assert_eq!(
            source.fetch("front-body-flesh-Head.svg").await,
            Err(FetchError::TimedOut {
                file_ref: "front-body-flesh-Head.svg".into(),
            })
        );
    }
}
