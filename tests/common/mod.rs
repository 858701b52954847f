//! Shared test fixtures
//!
//! A deterministic stand-in for an OpenPGP implementation: clear-signed
//! documents are produced over a keyed SHA-256 MAC, armored with base64,
//! and verified by recomputing the MAC with each keyring entity.

#![allow(dead_code)]

use base64::prelude::*;
use sha2::{Digest, Sha256};
use sif::integrity::{
    ClearsignDecoder, ClearsignEncoder, MessageHash, SignedMessage, VerifiedMessage,
};
use sif::{Result, SifError};

pub const TEST_TIME: i64 = 1593475316;

#[derive(Clone)]
pub struct TestEntity {
    secret: [u8; 32],
    fingerprint: [u8; 20],
    pub hash: MessageHash,
}

impl TestEntity {
    pub fn new(seed: u8) -> Self {
        let mut secret = [0u8; 32];
        for (i, b) in secret.iter_mut().enumerate() {
            *b = seed ^ i as u8;
        }
        let mut fingerprint = [0u8; 20];
        for (i, b) in fingerprint.iter_mut().enumerate() {
            *b = seed.wrapping_add(i as u8);
        }
        TestEntity {
            secret,
            fingerprint,
            hash: MessageHash::Sha256,
        }
    }

    pub fn fingerprint(&self) -> [u8; 20] {
        self.fingerprint
    }

    fn mac(&self, plaintext: &[u8]) -> Vec<u8> {
        let mut hasher = Sha256::new();
        hasher.update(self.secret);
        hasher.update(plaintext);
        hasher.finalize().to_vec()
    }
}

impl ClearsignEncoder for TestEntity {
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
            BASE64_STANDARD.encode(self.mac(plaintext))
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

pub struct TestKeyring {
    entities: Vec<TestEntity>,
}

impl TestKeyring {
    pub fn new(entities: Vec<TestEntity>) -> Self {
        TestKeyring { entities }
    }
}

impl ClearsignDecoder for TestKeyring {
    fn verify_message(&self, message: &[u8]) -> Result<VerifiedMessage> {
        let text =
            std::str::from_utf8(message).map_err(|_| SifError::ClearsignedMessageNotFound)?;
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
                return Err(SifError::SignatureInvalid(format!("unknown hash {other:?}")));
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
        let sig = tail
            .lines()
            .next()
            .ok_or(SifError::ClearsignedMessageNotFound)?;
        let mac = BASE64_STANDARD
            .decode(sig)
            .map_err(|e| SifError::SignatureInvalid(e.to_string()))?;

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
