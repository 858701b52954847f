//! Clear-sign operations
//!
//! Signing and verification of clear-signed messages are delegated to a
//! caller-supplied OpenPGP implementation through the two traits below. Any
//! mature implementation satisfies them; the crate itself never touches key
//! material or signature packets.

use crate::error::Result;
use std::fmt;

/// Hash algorithm named by a clear-signed message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageHash {
    Md5,
    Sha1,
    Ripemd160,
    Sha224,
    Sha256,
    Sha384,
    Sha512,
}

impl MessageHash {
    /// Whether the algorithm is in the permitted set for verification
    /// (the RFC 4880 hashes still recommended by NIST).
    pub fn is_permitted(self) -> bool {
        matches!(
            self,
            Self::Sha224 | Self::Sha256 | Self::Sha384 | Self::Sha512
        )
    }

    /// The armor header name of the algorithm.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Md5 => "MD5",
            Self::Sha1 => "SHA1",
            Self::Ripemd160 => "RIPEMD160",
            Self::Sha224 => "SHA224",
            Self::Sha256 => "SHA256",
            Self::Sha384 => "SHA384",
            Self::Sha512 => "SHA512",
        }
    }
}

impl fmt::Display for MessageHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A clear-signed message produced by a [`ClearsignEncoder`].
#[derive(Debug, Clone)]
pub struct SignedMessage {
    /// The complete armored clear-signed document.
    pub armored: String,
    /// Hash algorithm used for the signature.
    pub hash: MessageHash,
}

/// The outcome of verifying a clear-signed message.
#[derive(Debug, Clone)]
pub struct VerifiedMessage {
    /// Message plaintext recovered from the document.
    pub plaintext: Vec<u8>,
    /// Fingerprint of the signing entity.
    pub fingerprint: [u8; 20],
    /// Hash algorithm the signature was made with.
    pub hash: MessageHash,
}

/// Signs messages in clear-sign format on behalf of one entity.
pub trait ClearsignEncoder {
    /// Sign `plaintext`, generating signature timestamps from `time` when
    /// given (seconds since the Unix epoch).
    fn sign_message(&self, plaintext: &[u8], time: Option<i64>) -> Result<SignedMessage>;

    /// Fingerprint of the signing entity.
    fn fingerprint(&self) -> [u8; 20];
}

/// Verifies clear-signed messages against a keyring.
pub trait ClearsignDecoder {
    /// Locate the clear-signed block in `message`, check its signature, and
    /// return the plaintext and signing entity.
    ///
    /// Fails with [`SifError::ClearsignedMessageNotFound`] when no block is
    /// present and [`SifError::SignatureInvalid`] when no keyring entity
    /// matches or the signature does not check out.
    ///
    /// [`SifError::ClearsignedMessageNotFound`]: crate::SifError::ClearsignedMessageNotFound
    /// [`SifError::SignatureInvalid`]: crate::SifError::SignatureInvalid
    fn verify_message(&self, message: &[u8]) -> Result<VerifiedMessage>;
}
