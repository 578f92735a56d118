use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while unpacking an encrypted work envelope.
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Base64 decoding of the envelope failed: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error("Envelope is {len} bytes long, but a nonce plus ciphertext needs at least 13")]
    Format { len: usize },

    #[error("Authentication tag mismatch; the payload was tampered with or encrypted under a different key")]
    Authentication,
}

/// Errors that can occur while parsing a recovered payload as JSON.
#[derive(Error, Debug)]
pub enum PayloadError {
    #[error("Payload is not valid JSON and could not be repaired: {detail}")]
    Corrupt { detail: String },
}

/// Errors raised for a single compiled block record.
///
/// `MissingIdentity` is fatal for the surrounding actor; `Invalid` is caught
/// at the record boundary and degrades to a disabled placeholder block.
#[derive(Error, Debug, Clone)]
pub enum RecordError {
    #[error("Compiled record has no usable id/type: {detail}")]
    MissingIdentity { detail: String },

    #[error("Compiled record '{id}' ({block_type}) is malformed: {detail}")]
    Invalid {
        id: String,
        block_type: String,
        detail: String,
    },
}

impl RecordError {
    pub fn invalid(id: &str, block_type: &str, detail: impl Into<String>) -> Self {
        Self::Invalid {
            id: id.to_string(),
            block_type: block_type.to_string(),
            detail: detail.into(),
        }
    }

    /// True when the record could not even be identified, which aborts the
    /// whole work instead of degrading to a placeholder.
    pub fn is_identity_failure(&self) -> bool {
        matches!(self, Self::MissingIdentity { .. })
    }
}

/// Errors from the resource-fetch collaborator.
#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("Request to '{url}' failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Resource at '{url}' is unavailable: {reason}")]
    Unavailable { url: String, reason: String },
}

/// Errors from the file-output collaborator.
#[derive(Error, Debug)]
#[error("Could not write '{path}': {source}")]
pub struct IoError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

/// The top-level error returned by [`crate::Decompiler::decompile`].
///
/// Each variant names the stage that failed; the originating cause is kept
/// attached so callers can report a single terminal error per work.
#[derive(Error, Debug)]
pub enum DecompileError {
    #[error("Unsupported work type: {type_name}")]
    UnsupportedFormat { type_name: String },

    #[error("Work metadata is unusable: {detail}")]
    Metadata { detail: String },

    #[error("Compiled payload is missing '{field}'")]
    PayloadShape { field: &'static str },

    #[error("Actor '{actor_id}' contains an unidentifiable compiled record: {detail}")]
    MalformedRecord { actor_id: String, detail: String },

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Payload(#[from] PayloadError),

    #[error(transparent)]
    Network(#[from] NetworkError),

    #[error(transparent)]
    Io(#[from] IoError),
}
