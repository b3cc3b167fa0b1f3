//! Client-side helpers for shipping analytics events to a collection endpoint.
//!
//! Payloads are gzipped with pooled compressors, base64 encoded and wrapped in a
//! form body (`data=...&gzip=1` or `data_list=...&gzip=1`), then posted with a
//! bounded timeout. A non-200 response is turned into a [`StatusError`] whose text
//! is `{"StatusCode":<int>,"Body":"<text>"}`.
//!
//! ```rust,ignore
//! use capture_transport::{build_single, post};
//!
//! let body = build_single(r#"{"event":"$pageview","distinct_id":"user-1"}"#)?;
//! post("http://localhost:8106/sa", body, Duration::from_secs(5)).await?;
//! ```

pub mod config;
pub mod encode;
pub mod error;
pub mod pool;
pub mod properties;
pub mod transport;

pub use config::Config;
pub use encode::{build_list, build_single, compress, encode};
pub use error::{CaptureError, EncodeError, StatusError, TransportError};
pub use pool::{CompressorPool, COMPRESSOR_POOL};
pub use properties::{deep_copy, deep_copy_value, merge_defaults, Properties};
pub use transport::{post, Transport};

/// Milliseconds since the Unix epoch.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
