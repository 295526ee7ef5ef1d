use crate::ledger::ElectionLedger;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

/// Errors that can occur during encoding/decoding
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Failed to encode ledger: {0}")]
    EncodeError(String),

    #[error("Failed to decode ledger: {0}")]
    DecodeError(String),

    #[error("Invalid hex string: {0}")]
    InvalidHex(String),

    #[error("Invalid base64 string: {0}")]
    InvalidBase64(String),
}

/// Codec for ledger snapshots (postcard binary, with hex/base64 text forms)
pub struct LedgerCodec;

impl LedgerCodec {
    pub fn encode(ledger: &ElectionLedger) -> Result<Vec<u8>, CodecError> {
        Self::to_bytes(ledger)
    }

    /// Decode a snapshot. A snapshot that parses but breaks a ledger invariant
    /// (reused ids, duplicate candidates, counts not matching voters) is refused.
    pub fn decode(bytes: &[u8]) -> Result<ElectionLedger, CodecError> {
        let ledger: ElectionLedger = Self::from_bytes(bytes)?;
        ledger
            .validate()
            .map_err(|e| CodecError::DecodeError(e.to_string()))?;
        Ok(ledger)
    }

    /// Postcard encoding of a single stored record
    pub(crate) fn to_bytes<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, CodecError> {
        postcard::to_allocvec(value).map_err(|e| CodecError::EncodeError(e.to_string()))
    }

    pub(crate) fn from_bytes<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, CodecError> {
        postcard::from_bytes(bytes).map_err(|e| CodecError::DecodeError(e.to_string()))
    }

    pub fn encode_hex(ledger: &ElectionLedger) -> Result<String, CodecError> {
        Ok(hex::encode(Self::encode(ledger)?))
    }

    pub fn decode_hex(hex_str: &str) -> Result<ElectionLedger, CodecError> {
        let bytes = hex::decode(hex_str.trim()).map_err(|e| CodecError::InvalidHex(e.to_string()))?;
        Self::decode(&bytes)
    }

    /// URL-safe, no padding
    pub fn encode_base64(ledger: &ElectionLedger) -> Result<String, CodecError> {
        Ok(URL_SAFE_NO_PAD.encode(Self::encode(ledger)?))
    }

    pub fn decode_base64(b64_str: &str) -> Result<ElectionLedger, CodecError> {
        let bytes = URL_SAFE_NO_PAD
            .decode(b64_str.trim())
            .map_err(|e| CodecError::InvalidBase64(e.to_string()))?;
        Self::decode(&bytes)
    }
}
