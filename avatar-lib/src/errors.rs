use thiserror::Error;

use crate::parts::View;

/// Failure to retrieve a single part document.
///
/// These are cached alongside successful documents, so they have to be cheap to clone.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("Request for {file_ref} returned status {status}")]
    UnexpectedStatus { file_ref: String, status: u16 },
    #[error("Unable to request {file_ref}: {message}")]
    Transport { file_ref: String, message: String },
    #[error("Request for {file_ref} timed out")]
    TimedOut { file_ref: String },
    #[error("Unable to read {file_ref}: {message}")]
    Io { file_ref: String, message: String },
    #[error("Invalid asset reference {0}")]
    InvalidReference(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DocumentError {
    #[error("Malformed svg document: {0}")]
    Malformed(String),
    #[error("Expected the root element to be <svg>, found <{0}>")]
    UnexpectedRoot(String),
    #[error("Document has no root element")]
    MissingRoot,
    #[error("Unable to write svg output: {0}")]
    Write(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    #[error("Invalid viewBox {0:?}, expected 4 numbers")]
    MalformedViewBox(String),
    #[error("viewBox {0:?} has a non-positive size")]
    DegenerateViewBox(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CustomizationError {
    #[error("Invalid skin color {0:?}, expected #rgb or #rrggbb")]
    InvalidColor(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    #[error("None of the parts for the {view} view could be loaded")]
    NoContentLoaded { view: View },
    #[error("The render was cancelled before it completed")]
    Cancelled,
    #[error("Unable to build output: {0}")]
    Output(#[from] DocumentError),
}

pub type Result<T> = std::result::Result<T, RenderError>;
pub type FetchResult<T> = std::result::Result<T, FetchError>;
pub type DocumentResult<T> = std::result::Result<T, DocumentError>;
pub type GeometryResult<T> = std::result::Result<T, GeometryError>;
