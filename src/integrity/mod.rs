//! Image integrity
//!
//! Signing builds a canonical JSON digest list over a set of descriptors,
//! clear-signs it, and attaches the armored result as a new cryptographic
//! message object. Verification walks the attached signatures, checks each
//! against a keyring, recomputes the digests from the current object bytes,
//! and confirms that the required descriptors are all covered.
//!
//! The OpenPGP operations themselves live behind the [`ClearsignEncoder`]
//! and [`ClearsignDecoder`] traits.

mod clearsign;
mod digest;
mod metadata;
mod sign;
mod verify;

pub use clearsign::{
    ClearsignDecoder, ClearsignEncoder, MessageHash, SignedMessage, VerifiedMessage,
};
pub use sign::{SignOpts, Signer};
pub use verify::{SignatureInfo, Verifier, VerifyOpts, VerifyResult};

#[cfg(test)]
pub(crate) mod stub {
    //! A deterministic stand-in for an OpenPGP implementation, producing
    //! clear-signed-shaped documents over a keyed SHA-256 MAC.

    use super::clearsign::{
        ClearsignDecoder, ClearsignEncoder, MessageHash, SignedMessage, VerifiedMessage,
    };
    use crate::error::{Result, SifError};
    use sha2::{Digest, Sha256};

    #[derive(Clone)]
    pub(crate) struct StubEntity {
        secret: [u8; 32],
        fingerprint: [u8; 20],
        pub hash: MessageHash,
    }

    impl StubEntity {
        pub fn new(seed: u8) -> Self {
            let mut secret = [0u8; 32];
            for (i, b) in secret.iter_mut().enumerate() {
                *b = seed ^ i as u8;
            }
            let mut fingerprint = [0u8; 20];
            for (i, b) in fingerprint.iter_mut().enumerate() {
                *b = seed.wrapping_add(i as u8);
            }
            StubEntity {
                secret,
                fingerprint,
                hash: MessageHash::Sha256,
            }
        }

        pub fn fingerprint(&self) -> [u8; 20] {
            self.fingerprint
        }

        fn mac(&self, plaintext: &[u8]) -> String {
            let mut hasher = Sha256::new();
            hasher.update(self.secret);
            hasher.update(plaintext);
            hex::encode(hasher.finalize())
        }
    }

    impl ClearsignEncoder for StubEntity {
        fn sign_message(&self, plaintext: &[u8], time: Option<i64>) -> Result<SignedMessage> {
            let text = String::from_utf8_lossy(plaintext);
            let armored = format!(
                "-----BEGIN PGP SIGNED MESSAGE-----\n\
                 Hash: {}\n\
                 \n\
                 {}\n\
                 -----BEGIN PGP SIGNATURE-----\n\
                 Comment: created {}\n\
                 \n\
                 {}\n\
                 -----END PGP SIGNATURE-----\n",
                self.hash,
                text,
                time.unwrap_or(0),
                self.mac(plaintext)
            );
            Ok(SignedMessage {
                armored,
                hash: self.hash,
            })
        }

        fn fingerprint(&self) -> [u8; 20] {
            self.fingerprint
        }
    }

    pub(crate) struct StubKeyring {
        entities: Vec<StubEntity>,
    }

    impl StubKeyring {
        pub fn new(entities: Vec<StubEntity>) -> Self {
            StubKeyring { entities }
        }
    }

    impl ClearsignDecoder for StubKeyring {
        fn verify_message(&self, message: &[u8]) -> Result<VerifiedMessage> {
            let text = std::str::from_utf8(message)
                .map_err(|_| SifError::ClearsignedMessageNotFound)?;
            let rest = text
                .strip_prefix("-----BEGIN PGP SIGNED MESSAGE-----\n")
                .ok_or(SifError::ClearsignedMessageNotFound)?;
            let (hash_line, rest) = rest
                .split_once('\n')
                .ok_or(SifError::ClearsignedMessageNotFound)?;
            let hash_name = hash_line
                .strip_prefix("Hash: ")
                .ok_or(SifError::ClearsignedMessageNotFound)?;
            let hash = match hash_name {
                "MD5" => MessageHash::Md5,
                "SHA1" => MessageHash::Sha1,
                "RIPEMD160" => MessageHash::Ripemd160,
                "SHA224" => MessageHash::Sha224,
                "SHA256" => MessageHash::Sha256,
                "SHA384" => MessageHash::Sha384,
                "SHA512" => MessageHash::Sha512,
                other => {
                    return Err(SifError::SignatureInvalid(format!(
                        "unknown hash {other:?}"
                    )))
                }
            };

            let rest = rest
                .strip_prefix('\n')
                .ok_or(SifError::ClearsignedMessageNotFound)?;
            let (plaintext, rest) = rest
                .split_once("\n-----BEGIN PGP SIGNATURE-----\n")
                .ok_or(SifError::ClearsignedMessageNotFound)?;
            let (_, tail) = rest
                .split_once("\n\n")
                .ok_or(SifError::ClearsignedMessageNotFound)?;
            let mac = tail
                .lines()
                .next()
                .ok_or(SifError::ClearsignedMessageNotFound)?;

            for entity in &self.entities {
                if entity.mac(plaintext.as_bytes()) == mac {
                    return Ok(VerifiedMessage {
                        plaintext: plaintext.as_bytes().to_vec(),
                        fingerprint: entity.fingerprint,
                        hash,
                    });
                }
            }

            Err(SifError::SignatureInvalid(
                "message signed by an unknown entity".to_string(),
            ))
        }
    }
}
