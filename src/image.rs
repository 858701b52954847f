//! Image handles
//!
//! A [`FileImage`] binds a decoded header and descriptor table to the
//! storage holding the file bytes. It is the single owner of that storage:
//! all reads, mutations, and integrity operations go through it, one
//! operation at a time.

use crate::descriptor::{DataType, Descriptor, Link, PartType, DESCRIPTOR_SLOT_LEN};
use crate::error::{Result, SifError};
use crate::header::{Header, HEADER_LEN};
use crate::storage::Storage;
use std::fs::OpenOptions;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;
use tracing::debug;

/// Chunk size for streaming payload copies and digests.
pub(crate) const COPY_CHUNK: usize = 32 * 1024;

/// Object alignment applied in deterministic mode regardless of host.
pub(crate) const DETERMINISTIC_ALIGNMENT: u64 = 4096;

/// An image bound to its backing storage.
///
/// Obtained from [`create_container`](crate::create_container) or one of the
/// load functions; consumed by [`unload`](Self::unload).
pub struct FileImage<S: Storage> {
    pub(crate) storage: S,
    pub(crate) header: Header,
    pub(crate) slots: Vec<Option<Descriptor>>,
}

/// Load an image from a file on disk, opened read-write.
pub fn load_container_at_path<P: AsRef<Path>>(path: P) -> Result<FileImage<std::fs::File>> {
    let file = OpenOptions::new().read(true).write(true).open(path)?;
    load_container(file)
}

/// Load an image from storage, validating the header and reading the
/// descriptor table.
pub fn load_container<S: Storage>(mut storage: S) -> Result<FileImage<S>> {
    storage.seek(SeekFrom::Start(0))?;
    let mut buf = [0u8; HEADER_LEN];
    storage.read_exact(&mut buf)?;
    let header = Header::from_bytes(&buf)?;

    let capacity = header.descriptors_total as usize;
    storage.seek(SeekFrom::Start(header.descriptors_offset))?;

    let mut slots = Vec::with_capacity(capacity);
    let mut slot = [0u8; DESCRIPTOR_SLOT_LEN];
    for _ in 0..capacity {
        storage.read_exact(&mut slot)?;
        slots.push(Descriptor::from_bytes(&slot)?);
    }

    debug!(
        id = %header.id,
        used = header.descriptors_used,
        total = header.descriptors_total,
        "loaded container"
    );

    Ok(FileImage {
        storage,
        header,
        slots,
    })
}

impl<S: Storage> FileImage<S> {
    /// The global header.
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Iterate over the live descriptors, in slot order.
    pub fn descriptors(&self) -> impl Iterator<Item = &Descriptor> {
        self.slots.iter().flatten()
    }

    /// Look up a live descriptor by id.
    pub fn get_descriptor(&self, id: u32) -> Result<&Descriptor> {
        self.descriptors()
            .find(|d| d.id == id)
            .ok_or(SifError::ObjectNotFound)
    }

    /// Live descriptors belonging to group `group_id`.
    pub fn descriptors_in_group(&self, group_id: u32) -> Vec<&Descriptor> {
        self.descriptors()
            .filter(|d| d.group_id != 0 && d.group_id() == group_id)
            .collect()
    }

    /// Live descriptors whose link matches `link`.
    pub fn descriptors_linked_to(&self, link: Link) -> Vec<&Descriptor> {
        self.descriptors().filter(|d| d.link() == link).collect()
    }

    /// The primary system partition of the image, if any.
    pub fn primary_partition(&self) -> Option<&Descriptor> {
        self.descriptors().find(|d| is_primary(d))
    }

    /// The primary system partition within group `group_id`, if any.
    pub fn primary_partition_in_group(&self, group_id: u32) -> Option<&Descriptor> {
        self.descriptors_in_group(group_id)
            .into_iter()
            .find(|d| is_primary(d))
    }

    /// Sorted ids of the groups that have at least one live descriptor.
    pub fn group_ids(&self) -> Vec<u32> {
        let mut ids: Vec<u32> = self
            .descriptors()
            .filter(|d| d.group_id != 0)
            .map(|d| d.group_id())
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    /// Live descriptors outside any group.
    pub fn ungrouped_descriptors(&self) -> Vec<&Descriptor> {
        self.descriptors().filter(|d| d.group_id == 0).collect()
    }

    /// Read the payload bytes of object `id`.
    pub fn read_object(&mut self, id: u32) -> Result<Vec<u8>> {
        let descriptor = self.get_descriptor(id)?;
        let (offset, size) = (descriptor.offset as u64, descriptor.size as usize);
        self.read_range(offset, size)
    }

    pub(crate) fn read_range(&mut self, offset: u64, size: usize) -> Result<Vec<u8>> {
        self.storage.seek(SeekFrom::Start(offset))?;
        let mut data = vec![0u8; size];
        self.storage.read_exact(&mut data)?;
        Ok(data)
    }

    /// Flush the image and hand the backing storage back to the caller.
    ///
    /// No further operations are possible on the image.
    pub fn unload(mut self) -> Result<S> {
        self.storage.sync()?;
        debug!(id = %self.header.id, "unloaded container");
        Ok(self.storage)
    }

    /// End of the data area: `data_offset + data_size`, which equals the
    /// file length after every successful mutation.
    pub(crate) fn data_end(&self) -> u64 {
        self.header.data_offset + self.header.data_size
    }

    pub(crate) fn next_free_slot(&self) -> Option<usize> {
        self.slots.iter().position(|s| s.is_none())
    }

    pub(crate) fn max_id(&self) -> u32 {
        self.descriptors().map(|d| d.id).max().unwrap_or(0)
    }

    pub(crate) fn write_header(&mut self) -> Result<()> {
        let bytes = self.header.to_bytes()?;
        self.storage.seek(SeekFrom::Start(0))?;
        self.storage.write_all(&bytes)?;
        Ok(())
    }

    pub(crate) fn write_slot(&mut self, index: usize) -> Result<()> {
        let bytes = match &self.slots[index] {
            Some(descriptor) => descriptor.to_bytes()?,
            None => [0u8; DESCRIPTOR_SLOT_LEN],
        };
        let offset = self.header.descriptors_offset + (index * DESCRIPTOR_SLOT_LEN) as u64;
        self.storage.seek(SeekFrom::Start(offset))?;
        self.storage.write_all(&bytes)?;
        Ok(())
    }
}

pub(crate) fn is_primary(d: &Descriptor) -> bool {
    d.data_type == DataType::Partition
        && matches!(
            d.partition_metadata(),
            Ok(meta) if meta.part_type == PartType::PrimSys
        )
}

/// Current time in seconds since the Unix epoch.
pub(crate) fn unix_now() -> i64 {
    match std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH) {
        Ok(d) => d.as_secs() as i64,
        Err(_) => 0,
    }
}

/// Round `offset` up to the next multiple of `alignment`. Alignments of 0
/// and 1 are equivalent and mean no alignment.
pub(crate) fn next_aligned(offset: u64, alignment: u64) -> u64 {
    if alignment <= 1 {
        return offset;
    }
    offset.div_ceil(alignment) * alignment
}

#[cfg(unix)]
pub(crate) fn host_page_size() -> u64 {
    match unsafe { libc::sysconf(libc::_SC_PAGESIZE) } {
        n if n > 0 => n as u64,
        _ => DETERMINISTIC_ALIGNMENT,
    }
}

#[cfg(not(unix))]
pub(crate) fn host_page_size() -> u64 {
    DETERMINISTIC_ALIGNMENT
}
