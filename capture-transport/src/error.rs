use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced while turning a payload into an encoded body.
#[derive(Error, Debug)]
pub enum EncodeError {
    #[error(transparent)]
    Compression(#[from] std::io::Error),
    #[error("failed to form encode body: {0}")]
    Form(#[from] serde_urlencoded::ser::Error),
}

/// A non-200 response from the collection endpoint.
///
/// Its `Display` form is the JSON document `{"StatusCode":<int>,"Body":"<text>"}`,
/// so callers that only see the error text can parse it back with `serde_json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StatusError {
    pub status_code: u16,
    pub body: String,
}

impl fmt::Display for StatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = serde_json::to_string(self).map_err(|_| fmt::Error)?;
        f.write_str(&json)
    }
}

/// Enumeration of errors returned when posting an encoded body.
#[derive(Error, Debug)]
pub enum TransportError {
    /// The request never produced a response: DNS, connect, timeout, etc.
    #[error(transparent)]
    Request(#[from] reqwest::Error),
    #[error("{0}")]
    Status(StatusError),
}

impl TransportError {
    /// The status code of the response, when one was received.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            TransportError::Status(status) => Some(status.status_code),
            TransportError::Request(error) => error.status().map(|s| s.as_u16()),
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, TransportError::Request(error) if error.is_timeout())
    }
}

/// Errors from `Transport::send_single` and `Transport::send_list`.
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("failed to encode payload: {0}")]
    Encode(#[from] EncodeError),
    #[error(transparent)]
    Transport(#[from] TransportError),
}
