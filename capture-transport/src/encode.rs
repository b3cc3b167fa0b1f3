use base64::{engine::general_purpose, Engine as _};

use crate::error::EncodeError;
use crate::pool::COMPRESSOR_POOL;

/// Form field carrying a single encoded record.
pub const DATA_FIELD: &str = "data";
/// Form field carrying an encoded list of records.
pub const DATA_LIST_FIELD: &str = "data_list";
/// Always sent so the endpoint knows to decompress the data field.
pub const GZIP_FIELD: &str = "gzip";

/// Gzip a payload using the process-wide compressor pool.
pub fn compress(payload: &str) -> Result<Vec<u8>, EncodeError> {
    COMPRESSOR_POOL.compress(payload)
}

/// Gzip a payload and base64 encode it with the standard, padded alphabet.
pub fn encode(payload: &str) -> Result<String, EncodeError> {
    let compressed = compress(payload)?;
    Ok(general_purpose::STANDARD.encode(compressed))
}

/// Build a form-encoded body `data=<encoded>&gzip=1` for a single record.
pub fn build_single(payload: &str) -> Result<String, EncodeError> {
    build_form(DATA_FIELD, payload)
}

/// Build a form-encoded body `data_list=<encoded>&gzip=1` for a list of records.
pub fn build_list(payload: &str) -> Result<String, EncodeError> {
    build_form(DATA_LIST_FIELD, payload)
}

fn build_form(field: &str, payload: &str) -> Result<String, EncodeError> {
    let encoded = encode(payload)?;
    let pairs = [(field, encoded.as_str()), (GZIP_FIELD, "1")];

    Ok(serde_urlencoded::to_string(pairs)?)
}
