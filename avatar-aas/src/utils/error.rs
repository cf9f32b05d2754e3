use avatar_lib::errors::{CustomizationError, DocumentError, FetchError, RenderError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AvatarServiceError {
    #[error("Render error: {0}")]
    RenderError(#[from] RenderError),
    #[error("Asset error: {0}")]
    FetchError(#[from] FetchError),
    #[error("Svg error: {0}")]
    DocumentError(#[from] DocumentError),
    #[error("Customization error: {0}")]
    CustomizationError(#[from] CustomizationError),
    #[error("Configuration error: {0}")]
    ConfigurationError(#[from] twelf::Error),
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("Session error: {0}")]
    SessionError(#[from] SessionError),
    #[error("Http client error: {0}")]
    HttpClientError(#[from] HttpClientError),
    #[error("Tracing error: {0}")]
    TracingError(#[from] TracingError),
    #[error("Io error: {1}: {0}")]
    ExplainedIoError(std::io::Error, String),
    #[error("No user logged in")]
    NoCurrentUser,
    #[error("No avatar has been initialized in container {0:?}")]
    UnknownContainer(String),
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Unable to read user profile: {0}")]
    InvalidProfile(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum HttpClientError {
    #[error("Invalid url: {0}")]
    UrlParseError(#[from] url::ParseError),
    #[error("Http error: {0}")]
    HttpRequestError(#[from] http::Error),
    #[error("Request error: {0}")]
    RequestError(#[from] hyper_util::client::legacy::Error),
    #[error("Response body error: {0}")]
    BodyError(#[from] hyper::Error),
}

#[derive(Error, Debug)]
pub enum TracingError {
    #[error("Invalid tracing filter: {0}")]
    InvalidFilter(#[from] tracing_subscriber::filter::ParseError),
    #[error("Unable to install the tracing subscriber: {0}")]
    InitError(#[from] tracing_subscriber::util::TryInitError),
}

pub type Result<T> = std::result::Result<T, AvatarServiceError>;
pub type HttpClientResult<T> = std::result::Result<T, HttpClientError>;

pub trait ExplainableExt<T> {
    fn explain_closure<O: FnOnce() -> String>(self, message: O) -> Result<T>;

    fn explain(self, message: String) -> Result<T>
    where
        Self: Sized,
    {
        self.explain_closure(move || message)
    }
}

impl<T> ExplainableExt<T> for std::result::Result<T, std::io::Error> {
    fn explain_closure<O: FnOnce() -> String>(self, message: O) -> Result<T> {
        self.map_err(|e| AvatarServiceError::ExplainedIoError(e, message()))
    }
}
