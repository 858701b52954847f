//! Object digests
//!
//! Digests are computed over the raw object bytes in place; alignment
//! padding around an object is never part of its digest.

use crate::descriptor::HashType;
use crate::error::Result;
use crate::image::COPY_CHUNK;
use crate::storage::Storage;
use blake2::{Blake2b512, Blake2s256};
use sha2::{Digest, Sha256, Sha384, Sha512};
use std::io::{Read, Seek, SeekFrom};

/// Name under which a hash type appears in digest lists.
pub(crate) fn digest_name(hash: HashType) -> &'static str {
    match hash {
        HashType::Sha256 => "sha256",
        HashType::Sha384 => "sha384",
        HashType::Sha512 => "sha512",
        HashType::Blake2s => "blake2s",
        HashType::Blake2b => "blake2b",
    }
}

/// Inverse of [`digest_name`].
pub(crate) fn hash_type_from_name(name: &str) -> Option<HashType> {
    match name {
        "sha256" => Some(HashType::Sha256),
        "sha384" => Some(HashType::Sha384),
        "sha512" => Some(HashType::Sha512),
        "blake2s" => Some(HashType::Blake2s),
        "blake2b" => Some(HashType::Blake2b),
        _ => None,
    }
}

/// Digest `size` bytes of `storage` starting at `offset`.
pub(crate) fn digest_object<S: Storage>(
    storage: &mut S,
    offset: u64,
    size: u64,
    hash: HashType,
) -> Result<Vec<u8>> {
    storage.seek(SeekFrom::Start(offset))?;
    match hash {
        HashType::Sha256 => digest_chunks::<Sha256, S>(storage, size),
        HashType::Sha384 => digest_chunks::<Sha384, S>(storage, size),
        HashType::Sha512 => digest_chunks::<Sha512, S>(storage, size),
        HashType::Blake2s => digest_chunks::<Blake2s256, S>(storage, size),
        HashType::Blake2b => digest_chunks::<Blake2b512, S>(storage, size),
    }
}

fn digest_chunks<D: Digest, S: Storage>(storage: &mut S, size: u64) -> Result<Vec<u8>> {
    let mut hasher = D::new();
    let mut buf = vec![0u8; COPY_CHUNK];
    let mut remaining = size;
    while remaining > 0 {
        let n = remaining.min(COPY_CHUNK as u64) as usize;
        storage.read_exact(&mut buf[..n])?;
        hasher.update(&buf[..n]);
        remaining -= n as u64;
    }
    Ok(hasher.finalize().to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_sha256_digest() {
        let mut storage = Cursor::new(b"abc".to_vec());
        let digest = digest_object(&mut storage, 0, 3, HashType::Sha256).unwrap();
        assert_eq!(
            hex::encode(digest),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_digest_respects_offset_and_size() {
        let mut storage = Cursor::new(b"xxabcxx".to_vec());
        let digest = digest_object(&mut storage, 2, 3, HashType::Sha256).unwrap();
        assert_eq!(
            hex::encode(digest),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_digest_lengths() {
        let mut storage = Cursor::new(vec![0u8; 100]);
        let cases = [
            (HashType::Sha256, 32),
            (HashType::Sha384, 48),
            (HashType::Sha512, 64),
            (HashType::Blake2s, 32),
            (HashType::Blake2b, 64),
        ];
        for (hash, len) in cases {
            let digest = digest_object(&mut storage, 0, 100, hash).unwrap();
            assert_eq!(digest.len(), len, "{hash}");
        }
    }

    #[test]
    fn test_name_round_trip() {
        for hash in [
            HashType::Sha256,
            HashType::Sha384,
            HashType::Sha512,
            HashType::Blake2s,
            HashType::Blake2b,
        ] {
            assert_eq!(hash_type_from_name(digest_name(hash)), Some(hash));
        }
        assert_eq!(hash_type_from_name("md5"), None);
    }
}
