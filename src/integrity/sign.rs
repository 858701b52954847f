//! Signing
//!
//! A signer selects sets of descriptors, digests their objects into a
//! canonical JSON document, clear-signs the document, and attaches the
//! result as a new cryptographic message object linked to what it covers.

use crate::descriptor::{CryptoFormat, DataType, HashType, Link, MessageKind};
use crate::error::{Result, SifError};
use crate::image::{unix_now, FileImage};
use crate::input::DescriptorInput;
use crate::integrity::clearsign::ClearsignEncoder;
use crate::integrity::digest::{digest_name, digest_object};
use crate::integrity::metadata::{DescriptorDigest, DescriptorDigests, DigestList};
use crate::mutate::AddOpts;
use crate::storage::Storage;
use std::io::Cursor;
use tracing::debug;

/// Options for [`Signer::new`].
///
/// With no groups or objects named, one signature is produced per group,
/// covering every live descriptor in it, and one per ungrouped descriptor.
#[derive(Debug, Clone, Default)]
pub struct SignOpts {
    groups: Vec<u32>,
    objects: Vec<u32>,
    time: Option<i64>,
    deterministic: bool,
    hash: Option<HashType>,
}

impl SignOpts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sign the objects of group `group_id`. May be repeated.
    pub fn with_group(mut self, group_id: u32) -> Self {
        self.groups.push(group_id);
        self
    }

    /// Sign exactly the given object ids with a single signature.
    pub fn with_objects(mut self, ids: &[u32]) -> Self {
        self.objects = ids.to_vec();
        self
    }

    /// Generate signature timestamps and object times from `time`.
    pub fn with_time(mut self, time: i64) -> Self {
        self.time = Some(time);
        self
    }

    /// Default the time source to 0 for byte-identical output.
    pub fn deterministic(mut self) -> Self {
        self.deterministic = true;
        self
    }

    /// Digest algorithm for the digest list. Defaults to SHA-256.
    pub fn with_hash(mut self, hash: HashType) -> Self {
        self.hash = Some(hash);
        self
    }
}

struct SignTask {
    ids: Vec<u32>,
    link: Link,
}

/// Signs the contents of an image.
pub struct Signer<'a, S: Storage> {
    image: &'a mut FileImage<S>,
    encoder: &'a dyn ClearsignEncoder,
    tasks: Vec<SignTask>,
    time: i64,
    deterministic: bool,
    hash: HashType,
}

impl<'a, S: Storage> Signer<'a, S> {
    /// Prepare a signer over `image`, resolving the selection in `opts`.
    ///
    /// Fails with [`SifError::NoObjects`] when there is nothing to sign and
    /// [`SifError::ObjectNotFound`] when a named group or object has no
    /// live descriptor.
    pub fn new(
        image: &'a mut FileImage<S>,
        encoder: &'a dyn ClearsignEncoder,
        opts: SignOpts,
    ) -> Result<Self> {
        let mut tasks = Vec::new();

        if !opts.objects.is_empty() {
            let mut ids = opts.objects.clone();
            ids.sort_unstable();
            ids.dedup();

            for &id in &ids {
                image.get_descriptor(id)?;
            }

            tasks.push(SignTask {
                link: target_link(image, &ids),
                ids,
            });
        } else if !opts.groups.is_empty() {
            for &group_id in &opts.groups {
                tasks.push(SignTask {
                    ids: group_object_ids(image, group_id)?,
                    link: Link::Group(group_id),
                });
            }
        } else {
            for group_id in image.group_ids() {
                tasks.push(SignTask {
                    ids: group_object_ids(image, group_id)?,
                    link: Link::Group(group_id),
                });
            }
            for d in image.ungrouped_descriptors() {
                tasks.push(SignTask {
                    ids: vec![d.id()],
                    link: Link::Object(d.id()),
                });
            }
            if tasks.is_empty() {
                return Err(SifError::NoObjects);
            }
        }

        let time = opts
            .time
            .unwrap_or_else(|| if opts.deterministic { 0 } else { unix_now() });

        Ok(Signer {
            image,
            encoder,
            tasks,
            time,
            deterministic: opts.deterministic,
            hash: opts.hash.unwrap_or(HashType::Sha256),
        })
    }

    /// Produce and attach one signature object per selected set.
    pub fn sign(self) -> Result<()> {
        for task in &self.tasks {
            let list = digest_list(self.image, &task.ids, self.hash)?;
            let plaintext = serde_json::to_vec(&list)?;

            let signed = self.encoder.sign_message(&plaintext, Some(self.time))?;

            let input = DescriptorInput::new(
                DataType::CryptoMessage,
                Cursor::new(signed.armored.into_bytes()),
            )
            .with_crypto_message_metadata(CryptoFormat::OpenPgp, MessageKind::ClearSignature)?
            .with_link(task.link)
            .ungrouped();

            let mut add_opts = AddOpts::new().with_time(self.time);
            if self.deterministic {
                add_opts = add_opts.deterministic();
            }
            self.image.add_object(input, add_opts)?;

            debug!(covered = ?task.ids, link = ?task.link, "attached signature object");
        }

        Ok(())
    }
}

fn group_object_ids<S: Storage>(image: &FileImage<S>, group_id: u32) -> Result<Vec<u32>> {
    let mut ids: Vec<u32> = image
        .descriptors_in_group(group_id)
        .iter()
        .map(|d| d.id())
        .collect();
    if ids.is_empty() {
        return Err(SifError::ObjectNotFound);
    }
    ids.sort_unstable();
    Ok(ids)
}

/// Link for a targeted signature: a single object links to that object, a
/// set within one group links to the group, anything else stays unlinked.
fn target_link<S: Storage>(image: &FileImage<S>, ids: &[u32]) -> Link {
    if ids.len() == 1 {
        return Link::Object(ids[0]);
    }

    let mut groups = ids.iter().filter_map(|&id| {
        image
            .get_descriptor(id)
            .ok()
            .filter(|d| d.group_id != 0)
            .map(|d| d.group_id())
    });

    match groups.next() {
        Some(first) if groups.all(|g| g == first) => Link::Group(first),
        _ => Link::None,
    }
}

fn digest_list<S: Storage>(
    image: &mut FileImage<S>,
    ids: &[u32],
    hash: HashType,
) -> Result<DigestList> {
    let mut descriptors = Vec::with_capacity(ids.len());
    for &id in ids {
        let (offset, size) = {
            let d = image.get_descriptor(id)?;
            (d.offset() as u64, d.size() as u64)
        };
        let value = digest_object(&mut image.storage, offset, size, hash)?;
        descriptors.push(DescriptorDigest {
            id,
            algorithm: digest_name(hash).to_string(),
            digest: hex::encode(value),
        });
    }

    Ok(DigestList {
        one: DescriptorDigests { descriptors },
    })
}
