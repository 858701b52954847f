//! Container mutations
//!
//! Add, delete, and primary-partition promotion. Every mutation writes in
//! the order data bytes, descriptor slot, header; a reader that observes
//! the new header therefore sees the complete mutation, and a crash mid
//! payload leaves a stale data-area tail with the slot still free.

use crate::arch::ARCH_UNKNOWN;
use crate::descriptor::{DataType, Descriptor, PartType, GROUP_FLAG};
use crate::error::{Result, SifError};
use crate::header::{fixed_str, get_u32};
use crate::image::{
    host_page_size, is_primary, next_aligned, unix_now, FileImage, COPY_CHUNK,
    DETERMINISTIC_ALIGNMENT,
};
use crate::input::DescriptorInput;
use crate::storage::Storage;
use std::io::{Read, Seek, SeekFrom, Write};
use tracing::debug;

/// Options for [`FileImage::add_object`].
#[derive(Debug, Clone, Copy, Default)]
pub struct AddOpts {
    time: Option<i64>,
    deterministic: bool,
}

impl AddOpts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stamp the new object and the header with `time`.
    pub fn with_time(mut self, time: i64) -> Self {
        self.time = Some(time);
        self
    }

    /// Default the timestamp to 0 and the object alignment to 4096 instead
    /// of the host page size.
    pub fn deterministic(mut self) -> Self {
        self.deterministic = true;
        self
    }
}

/// Options for [`FileImage::delete_object`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DeleteOpts {
    zero: bool,
    compact: bool,
    time: Option<i64>,
    deterministic: bool,
}

impl DeleteOpts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the object bytes with zeroes.
    pub fn zero(mut self, zero: bool) -> Self {
        self.zero = zero;
        self
    }

    /// Reclaim the object extent. Only the last object in the data area can
    /// be reclaimed; elsewhere this degrades to plain slot invalidation.
    pub fn compact(mut self, compact: bool) -> Self {
        self.compact = compact;
        self
    }

    /// Stamp the header modification time with `time`.
    pub fn with_time(mut self, time: i64) -> Self {
        self.time = Some(time);
        self
    }

    /// Default the timestamp to 0.
    pub fn deterministic(mut self) -> Self {
        self.deterministic = true;
        self
    }
}

/// Options for [`FileImage::set_prim_part`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SetOpts {
    time: Option<i64>,
    deterministic: bool,
}

impl SetOpts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stamp the header modification time with `time`.
    pub fn with_time(mut self, time: i64) -> Self {
        self.time = Some(time);
        self
    }

    /// Default the timestamp to 0.
    pub fn deterministic(mut self) -> Self {
        self.deterministic = true;
        self
    }
}

impl<S: Storage> FileImage<S> {
    /// Add the staged data object to the image.
    ///
    /// The payload is streamed into the data area at the next aligned
    /// offset, and the object receives id `max(live ids) + 1`. Adding a
    /// second primary system partition to a group fails with
    /// [`SifError::PrimaryPartitionExists`].
    pub fn add_object(&mut self, input: DescriptorInput, opts: AddOpts) -> Result<()> {
        let slot_index = self
            .next_free_slot()
            .ok_or(SifError::InsufficientCapacity)?;

        let primary = input_is_primary(&input);
        if primary {
            if let Some(group_id) = input.group {
                if self.primary_partition_in_group(group_id).is_some() {
                    return Err(SifError::PrimaryPartitionExists);
                }
            }
        }

        let time = opts
            .time
            .unwrap_or_else(|| if opts.deterministic { 0 } else { unix_now() });
        let alignment = input.alignment.unwrap_or(if opts.deterministic {
            DETERMINISTIC_ALIGNMENT
        } else {
            host_page_size()
        });

        let data_end = self.data_end();
        let offset = next_aligned(data_end, alignment);

        // Stream the payload, counting the actual byte length.
        self.storage.seek(SeekFrom::Start(offset))?;
        let mut reader = input.reader;
        let mut buf = vec![0u8; COPY_CHUNK];
        let mut size: u64 = 0;
        loop {
            let n = reader.read(&mut buf)?;
            if n == 0 {
                break;
            }
            self.storage.write_all(&buf[..n])?;
            size += n as u64;
        }

        let size_with_padding = offset - data_end + size;
        let id = self.max_id() + 1;

        let descriptor = Descriptor {
            data_type: input.data_type,
            id,
            group_id: input.group.map(|g| GROUP_FLAG | g).unwrap_or(0),
            linked_id: input.link.to_raw(),
            offset: offset as i64,
            size: size as i64,
            size_with_padding: size_with_padding as i64,
            created_at: time,
            modified_at: time,
            uid: 0,
            gid: 0,
            name: input.name,
            extra: input.extra,
        };

        self.slots[slot_index] = Some(descriptor);
        self.write_slot(slot_index)?;

        if primary {
            self.header.arch = fixed_str(&input.extra[8..11]);
        }
        self.header.descriptors_used += 1;
        self.header.data_size += size_with_padding;
        self.header.modified_at = time;
        self.write_header()?;

        debug!(id, ?offset, size, "added data object");

        Ok(())
    }

    /// Delete the data object with id `id`.
    ///
    /// Fails with [`SifError::ObjectNotFound`] when no live descriptor has
    /// that id. The freed slot is zeroed; the id is never handed out again
    /// while larger ids remain live.
    pub fn delete_object(&mut self, id: u32, opts: DeleteOpts) -> Result<()> {
        let (index, descriptor) = self
            .slots
            .iter()
            .enumerate()
            .find_map(|(i, s)| {
                s.as_ref()
                    .filter(|d| d.id == id)
                    .map(|d| (i, d.clone()))
            })
            .ok_or(SifError::ObjectNotFound)?;

        let time = opts
            .time
            .unwrap_or_else(|| if opts.deterministic { 0 } else { unix_now() });

        let offset = descriptor.offset as u64;
        let size = descriptor.size as u64;
        let size_with_padding = descriptor.size_with_padding as u64;
        let was_primary = is_primary(&descriptor);
        let is_tail = offset + size == self.data_end();
        let reclaim = opts.compact && is_tail;

        if reclaim {
            self.storage.set_len(self.data_end() - size_with_padding)?;
        } else if opts.zero {
            self.zero_range(offset, size)?;
        }

        self.slots[index] = None;
        self.write_slot(index)?;

        if reclaim {
            self.header.data_size -= size_with_padding;
        }
        if was_primary {
            self.header.arch = ARCH_UNKNOWN.to_string();
        }
        self.header.descriptors_used -= 1;
        self.header.modified_at = time;
        self.write_header()?;

        debug!(id, reclaimed = reclaim, "deleted data object");

        Ok(())
    }

    /// Promote the partition with id `id` to primary system partition.
    ///
    /// Any existing primary in the same group is demoted to a plain system
    /// partition, and the header architecture is refreshed from the
    /// promoted partition.
    pub fn set_prim_part(&mut self, id: u32, opts: SetOpts) -> Result<()> {
        let target_index = self
            .slots
            .iter()
            .position(|s| matches!(s, Some(d) if d.id == id))
            .ok_or(SifError::ObjectNotFound)?;

        let (meta, target_grouped, target_group) = match &self.slots[target_index] {
            Some(d) => (d.partition_metadata()?, d.group_id != 0, d.group_id()),
            None => return Err(SifError::ObjectNotFound),
        };

        let time = opts
            .time
            .unwrap_or_else(|| if opts.deterministic { 0 } else { unix_now() });

        let demote_index = if target_grouped {
            self.slots.iter().position(|s| {
                matches!(s, Some(d) if d.id != id
                    && d.group_id != 0
                    && d.group_id() == target_group
                    && is_primary(d))
            })
        } else {
            None
        };

        if let Some(index) = demote_index {
            if let Some(d) = self.slots[index].as_mut() {
                d.extra[4..8].copy_from_slice(&(PartType::System as u32).to_le_bytes());
            }
            self.write_slot(index)?;
        }

        if let Some(d) = self.slots[target_index].as_mut() {
            d.extra[4..8].copy_from_slice(&(PartType::PrimSys as u32).to_le_bytes());
        }
        self.write_slot(target_index)?;

        self.header.arch = meta.arch.clone();
        self.header.modified_at = time;
        self.write_header()?;

        debug!(id, demoted = ?demote_index, "set primary system partition");

        Ok(())
    }

    fn zero_range(&mut self, offset: u64, size: u64) -> Result<()> {
        self.storage.seek(SeekFrom::Start(offset))?;
        let zeroes = vec![0u8; COPY_CHUNK];
        let mut remaining = size;
        while remaining > 0 {
            let n = remaining.min(COPY_CHUNK as u64) as usize;
            self.storage.write_all(&zeroes[..n])?;
            remaining -= n as u64;
        }
        Ok(())
    }
}

fn input_is_primary(input: &DescriptorInput) -> bool {
    input.data_type == DataType::Partition
        && PartType::from_u32(get_u32(&input.extra, 4)) == Some(PartType::PrimSys)
}
