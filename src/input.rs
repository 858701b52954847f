//! Descriptor inputs
//!
//! A [`DescriptorInput`] stages everything needed to add one data object:
//! content type, a payload reader (streamed exactly once during commit),
//! and optional name, grouping, link, alignment, and type-specific
//! metadata. The object size is always counted while the payload is copied,
//! never taken from the caller.

use crate::descriptor::{
    self, CryptoFormat, DataType, FsType, HashType, Link, MessageKind, PartType, SbomFormat,
    DEFAULT_GROUP, EXTRA_LEN, NAME_LEN,
};
use crate::error::{Result, SifError};
use std::io::Read;

/// Staged description of a data object to be added to an image.
pub struct DescriptorInput {
    pub(crate) data_type: DataType,
    pub(crate) reader: Box<dyn Read>,
    pub(crate) group: Option<u32>,
    pub(crate) link: Link,
    pub(crate) alignment: Option<u64>,
    pub(crate) name: String,
    pub(crate) extra: [u8; EXTRA_LEN],
}

impl DescriptorInput {
    /// Stage a new data object with content streamed from `reader`.
    ///
    /// The object joins the default group; use [`ungrouped`](Self::ungrouped)
    /// or [`with_group_id`](Self::with_group_id) to change that.
    pub fn new(data_type: DataType, reader: impl Read + 'static) -> Self {
        DescriptorInput {
            data_type,
            reader: Box::new(reader),
            group: Some(DEFAULT_GROUP),
            link: Link::None,
            alignment: None,
            name: String::new(),
            extra: [0u8; EXTRA_LEN],
        }
    }

    /// Set the object name.
    pub fn with_name(mut self, name: &str) -> Result<Self> {
        if name.len() >= NAME_LEN {
            return Err(SifError::InvalidExtra("name"));
        }
        self.name = name.to_string();
        Ok(self)
    }

    /// Place the object in group `group_id` instead of the default group.
    pub fn with_group_id(mut self, group_id: u32) -> Self {
        self.group = Some(group_id);
        self
    }

    /// Leave the object outside any group.
    pub fn ungrouped(mut self) -> Self {
        self.group = None;
        self
    }

    /// Link the object to another descriptor or to a group.
    pub fn with_link(mut self, link: Link) -> Self {
        self.link = link;
        self
    }

    /// Set the start alignment of the object bytes. Values of 0 or 1 mean
    /// no alignment; otherwise the default is the host page size (4096 in
    /// deterministic mode).
    pub fn with_alignment(mut self, alignment: u64) -> Self {
        self.alignment = Some(alignment);
        self
    }

    /// Attach partition metadata. Fails unless the object is a partition.
    pub fn with_partition_metadata(
        mut self,
        fs_type: FsType,
        part_type: PartType,
        arch: &str,
    ) -> Result<Self> {
        if self.data_type != DataType::Partition {
            return Err(SifError::InvalidExtra(
                "partition metadata on a non-partition object",
            ));
        }
        self.extra = descriptor::partition_extra(fs_type, part_type, arch)?;
        Ok(self)
    }

    /// Attach signature metadata. Fails unless the object is a signature.
    pub fn with_signature_metadata(
        mut self,
        hash_type: HashType,
        fingerprint: [u8; 20],
    ) -> Result<Self> {
        if self.data_type != DataType::Signature {
            return Err(SifError::InvalidExtra(
                "signature metadata on a non-signature object",
            ));
        }
        self.extra = descriptor::signature_extra(hash_type, fingerprint);
        Ok(self)
    }

    /// Attach cryptographic message metadata. Fails unless the object is a
    /// cryptographic message.
    pub fn with_crypto_message_metadata(
        mut self,
        format: CryptoFormat,
        kind: MessageKind,
    ) -> Result<Self> {
        if self.data_type != DataType::CryptoMessage {
            return Err(SifError::InvalidExtra(
                "crypto message metadata on a non-message object",
            ));
        }
        self.extra = descriptor::crypto_message_extra(format, kind);
        Ok(self)
    }

    /// Attach SBOM metadata. Fails unless the object is an SBOM.
    pub fn with_sbom_metadata(mut self, format: SbomFormat) -> Result<Self> {
        if self.data_type != DataType::Sbom {
            return Err(SifError::InvalidExtra("SBOM metadata on a non-SBOM object"));
        }
        self.extra = descriptor::sbom_extra(format);
        Ok(self)
    }
}
