use std::time::Duration;

use http::{HeaderName, HeaderValue, Method, Request, Response, StatusCode};
use http_body_util::{BodyExt, Empty};
use hyper::body::{Bytes, Incoming};
use hyper_tls::HttpsConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use sync_wrapper::SyncWrapper;
use tokio::sync::RwLock;
use tower::{util::BoxService, Service, ServiceBuilder, ServiceExt};
use tower_http::{
    classify::{NeverClassifyEos, ServerErrorsFailureClass},
    set_header::SetRequestHeaderLayer,
    trace::{DefaultOnFailure, ResponseBody, TraceLayer},
};
use tracing::instrument;

use crate::error::HttpClientResult;

const USER_AGENT: &str = concat!(
    "Avatar-Composition-as-a-Service/",
    env!("CARGO_PKG_VERSION"),
    " (+https://github.com/sxdgoth/jogang)"
);

type TraceResponseBody =
    ResponseBody<Incoming, NeverClassifyEos<ServerErrorsFailureClass>, (), (), DefaultOnFailure>;
type BoxedTracedResponse = BoxService<
    Request<Empty<Bytes>>,
    Response<TraceResponseBody>,
    hyper_util::client::legacy::Error,
>;

/// Rate limited, traced http client shared by every request to the asset server.
pub struct AvatarHttpClient {
    inner: RwLock<SyncWrapper<BoxedTracedResponse>>,
}

impl AvatarHttpClient {
    #[must_use]
    pub fn new(rate_limit_per_second: u64) -> Self {
        create_http_client(rate_limit_per_second)
    }

    #[instrument(skip(self))]
    pub(crate) async fn do_request(
        &self,
        url: &str,
        method: Method,
    ) -> HttpClientResult<(StatusCode, Bytes)> {
        let request = Request::builder()
            .method(method)
            .uri(url)
            .body(Empty::<Bytes>::new())?;

        // Only the rate limiter needs exclusive access, the request itself runs unlocked.
        let response = {
            let mut client = self.inner.write().await;
            let service = client.get_mut().ready().await?;

            service.call(request)
        };

        let response = response.await?;
        let status = response.status();

        let body = response.into_body().collect().await?.to_bytes();

        Ok((status, body))
    }
}

fn create_http_client(rate_limit_per_second: u64) -> AvatarHttpClient {
    let https = HttpsConnector::new();

    let client = Client::builder(TokioExecutor::new()).build::<_, Empty<Bytes>>(https);

    let tracing = TraceLayer::new_for_http().on_body_chunk(()).on_eos(());
    let service = ServiceBuilder::new()
        .boxed()
        .rate_limit(rate_limit_per_second.max(1), Duration::from_secs(1))
        .layer(tracing)
        .layer(SetRequestHeaderLayer::overriding(
            HeaderName::from_static("user-agent"),
            HeaderValue::from_static(USER_AGENT),
        ))
        .service(client);

    AvatarHttpClient {
        inner: RwLock::new(SyncWrapper::new(service)),
    }
}
