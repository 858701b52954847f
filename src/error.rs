use crate::descriptor::DataType;
use crate::integrity::MessageHash;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SifError {
    #[error("invalid magic number in header")]
    InvalidMagic,

    #[error("unsupported image format version: {0}")]
    UnsupportedVersion(String),

    #[error("insufficient descriptor capacity to add data object")]
    InsufficientCapacity,

    #[error("object not found")]
    ObjectNotFound,

    #[error("a primary system partition already exists in the group")]
    PrimaryPartitionExists,

    #[error("invalid extra metadata: {0}")]
    InvalidExtra(&'static str),

    #[error("unexpected data type {got}, expected {want}")]
    UnexpectedDataType { got: DataType, want: DataType },

    #[error("unknown data type value {0}")]
    UnknownDataType(u32),

    #[error("signature not found")]
    SignatureNotFound,

    #[error("signature verification failed: {0}")]
    SignatureInvalid(String),

    #[error("digest mismatch for object {id}")]
    DigestMismatch { id: u32 },

    #[error("clearsigned message not found")]
    ClearsignedMessageNotFound,

    #[error("hash algorithm {0} not permitted")]
    DisallowedHashAlgorithm(MessageHash),

    #[error("object {id} not covered by a valid signature")]
    ObjectNotCovered { id: u32 },

    #[error("no objects found to sign")]
    NoObjects,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SifError>;
