//! Verification
//!
//! The verifier locates candidate clear-signed signature objects, has the
//! oracle check each one against the keyring, recomputes every digest the
//! signed document claims, and finally confirms that the union of valid
//! signatures covers everything the caller requires.

use crate::descriptor::{CryptoFormat, DataType, Descriptor, Link, MessageKind};
use crate::error::{Result, SifError};
use crate::image::FileImage;
use crate::integrity::clearsign::{ClearsignDecoder, MessageHash};
use crate::integrity::digest::{digest_object, hash_type_from_name};
use crate::integrity::metadata::DigestList;
use crate::storage::Storage;
use std::collections::BTreeSet;
use tracing::debug;

/// Options for [`Verifier::new`], declaring what must be covered.
///
/// With no groups or objects named, every live descriptor other than the
/// signature objects themselves must be covered.
#[derive(Debug, Clone, Default)]
pub struct VerifyOpts {
    groups: Vec<u32>,
    objects: Vec<u32>,
}

impl VerifyOpts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require coverage of every object in group `group_id`. May be
    /// repeated.
    pub fn with_group(mut self, group_id: u32) -> Self {
        self.groups.push(group_id);
        self
    }

    /// Require coverage of exactly the given object ids.
    pub fn with_objects(mut self, ids: &[u32]) -> Self {
        self.objects = ids.to_vec();
        self
    }
}

/// One accepted signature.
#[derive(Debug, Clone)]
pub struct SignatureInfo {
    /// Id of the signature object.
    pub id: u32,
    /// Fingerprint of the signing entity.
    pub fingerprint: [u8; 20],
    /// Hash algorithm of the signature.
    pub hash: MessageHash,
}

/// Outcome of a successful verification.
#[derive(Debug, Clone)]
pub struct VerifyResult {
    /// Ids of all descriptors covered by valid signatures, ascending.
    pub verified: Vec<u32>,
    /// The signatures that were checked, in slot order.
    pub signatures: Vec<SignatureInfo>,
}

/// Verifies the contents of an image.
pub struct Verifier<'a, S: Storage> {
    image: &'a mut FileImage<S>,
    decoder: &'a dyn ClearsignDecoder,
    opts: VerifyOpts,
}

impl<'a, S: Storage> Verifier<'a, S> {
    pub fn new(
        image: &'a mut FileImage<S>,
        decoder: &'a dyn ClearsignDecoder,
        opts: VerifyOpts,
    ) -> Self {
        Verifier {
            image,
            decoder,
            opts,
        }
    }

    /// Run verification.
    ///
    /// Fails with [`SifError::SignatureNotFound`] when no candidate
    /// signature object exists, [`SifError::DigestMismatch`] naming the
    /// first object whose bytes no longer match a signed digest, and
    /// [`SifError::ObjectNotCovered`] when a required descriptor is not
    /// covered by any valid signature.
    pub fn verify(self) -> Result<VerifyResult> {
        let required = self.required_ids()?;

        let candidates: Vec<(u32, u64, u64)> = self
            .image
            .descriptors()
            .filter(|d| is_clearsign_signature(d))
            .filter(|d| self.references_target(d, &required))
            .map(|d| (d.id(), d.offset() as u64, d.size() as u64))
            .collect();

        if candidates.is_empty() {
            return Err(SifError::SignatureNotFound);
        }

        let mut covered = BTreeSet::new();
        let mut signatures = Vec::with_capacity(candidates.len());

        for (id, offset, size) in candidates {
            let message = self.image.read_range(offset, size as usize)?;
            let verified = self.decoder.verify_message(&message)?;

            if !verified.hash.is_permitted() {
                return Err(SifError::DisallowedHashAlgorithm(verified.hash));
            }

            let list: DigestList = serde_json::from_slice(&verified.plaintext)?;
            for entry in &list.one.descriptors {
                let hash = hash_type_from_name(&entry.algorithm).ok_or_else(|| {
                    SifError::SignatureInvalid(format!(
                        "unknown digest algorithm {:?}",
                        entry.algorithm
                    ))
                })?;

                let (offset, size) = {
                    let d = self.image.get_descriptor(entry.id)?;
                    (d.offset() as u64, d.size() as u64)
                };
                let value = digest_object(&mut self.image.storage, offset, size, hash)?;
                if hex::encode(value) != entry.digest {
                    return Err(SifError::DigestMismatch { id: entry.id });
                }

                covered.insert(entry.id);
            }

            debug!(
                id,
                fingerprint = %hex::encode(verified.fingerprint),
                "signature verified"
            );

            signatures.push(SignatureInfo {
                id,
                fingerprint: verified.fingerprint,
                hash: verified.hash,
            });
        }

        for &id in &required {
            if !covered.contains(&id) {
                return Err(SifError::ObjectNotCovered { id });
            }
        }

        Ok(VerifyResult {
            verified: covered.into_iter().collect(),
            signatures,
        })
    }

    /// The ids whose coverage the caller requires.
    fn required_ids(&self) -> Result<Vec<u32>> {
        if !self.opts.objects.is_empty() {
            let mut ids = self.opts.objects.clone();
            ids.sort_unstable();
            ids.dedup();
            for &id in &ids {
                self.image.get_descriptor(id)?;
            }
            return Ok(ids);
        }

        if !self.opts.groups.is_empty() {
            let mut ids = Vec::new();
            for &group_id in &self.opts.groups {
                let members = self.image.descriptors_in_group(group_id);
                if members.is_empty() {
                    return Err(SifError::ObjectNotFound);
                }
                ids.extend(members.iter().map(|d| d.id()));
            }
            ids.sort_unstable();
            ids.dedup();
            return Ok(ids);
        }

        Ok(self
            .image
            .descriptors()
            .filter(|d| !is_clearsign_signature(d))
            .map(|d| d.id())
            .collect())
    }

    /// Whether a signature object's link references one of the required
    /// descriptors or a group containing one. Unlinked signatures are
    /// always considered.
    fn references_target(&self, signature: &Descriptor, required: &[u32]) -> bool {
        match signature.link() {
            Link::None => true,
            Link::Object(id) => required.contains(&id),
            Link::Group(group_id) => self
                .image
                .descriptors_in_group(group_id)
                .iter()
                .any(|d| required.contains(&d.id())),
        }
    }
}

pub(crate) fn is_clearsign_signature(d: &Descriptor) -> bool {
    d.data_type() == DataType::CryptoMessage
        && matches!(
            d.crypto_message_metadata(),
            Ok(meta) if meta.format == CryptoFormat::OpenPgp
                && meta.kind == MessageKind::ClearSignature
        )
}
