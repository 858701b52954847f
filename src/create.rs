//! Container creation
//!
//! Creation writes the header, reserves a zeroed descriptor table, and
//! commits any initial descriptor inputs through the ordinary add path, so
//! a container built in one call is byte-identical to one built
//! incrementally with the same options.

use crate::arch::ARCH_UNKNOWN;
use crate::descriptor::DESCRIPTOR_SLOT_LEN;
use crate::error::{Result, SifError};
use crate::header::{Header, DEFAULT_LAUNCH_SCRIPT, HEADER_LEN};
use crate::image::{unix_now, FileImage};
use crate::input::DescriptorInput;
use crate::mutate::AddOpts;
use crate::storage::Storage;
use std::fs::OpenOptions;
use std::path::Path;
use tracing::debug;
use uuid::Uuid;

/// Number of descriptor slots reserved when no capacity is specified.
pub const DEFAULT_DESCRIPTOR_CAPACITY: u64 = 48;

/// Options for [`create_container`].
///
/// Defaults: current time, random v4 UUID, the standard launch script,
/// capacity of [`DEFAULT_DESCRIPTOR_CAPACITY`] slots, and no initial
/// descriptors. In deterministic mode the defaults become time 0, the nil
/// UUID, and an empty launch script, so two creations with identical
/// options produce byte-identical files.
pub struct CreateOpts {
    launch_script: Option<String>,
    id: Option<Uuid>,
    capacity: u64,
    descriptors: Vec<DescriptorInput>,
    time: Option<i64>,
    deterministic: bool,
}

impl Default for CreateOpts {
    fn default() -> Self {
        CreateOpts {
            launch_script: None,
            id: None,
            capacity: DEFAULT_DESCRIPTOR_CAPACITY,
            descriptors: Vec::new(),
            time: None,
            deterministic: false,
        }
    }
}

impl CreateOpts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place `script` in the header launch script field.
    pub fn with_launch_script(mut self, script: &str) -> Result<Self> {
        if script.len() >= 32 {
            return Err(SifError::InvalidExtra("launch script"));
        }
        self.launch_script = Some(script.to_string());
        Ok(self)
    }

    /// Set the image UUID instead of generating one.
    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = Some(id);
        self
    }

    /// Reserve `capacity` descriptor slots.
    pub fn with_descriptor_capacity(mut self, capacity: u64) -> Self {
        self.capacity = capacity;
        self
    }

    /// Commit `descriptors` as part of creation.
    pub fn with_descriptors(mut self, descriptors: Vec<DescriptorInput>) -> Self {
        self.descriptors = descriptors;
        self
    }

    /// Stamp creation and initial objects with `time` (seconds since the
    /// Unix epoch) instead of the current time.
    pub fn with_time(mut self, time: i64) -> Self {
        self.time = Some(time);
        self
    }

    /// Suppress all nondeterministic inputs; see the type-level docs.
    pub fn deterministic(mut self) -> Self {
        self.deterministic = true;
        self
    }
}

/// Create a new container in `storage`, replacing any existing content.
pub fn create_container<S: Storage>(mut storage: S, opts: CreateOpts) -> Result<FileImage<S>> {
    let CreateOpts {
        launch_script,
        id,
        capacity,
        descriptors,
        time,
        deterministic,
    } = opts;

    if descriptors.len() as u64 > capacity {
        return Err(SifError::InsufficientCapacity);
    }

    let now = time.unwrap_or_else(|| if deterministic { 0 } else { unix_now() });
    let id = id.unwrap_or_else(|| if deterministic { Uuid::nil() } else { Uuid::new_v4() });
    let launch_script = launch_script.unwrap_or_else(|| {
        if deterministic {
            String::new()
        } else {
            DEFAULT_LAUNCH_SCRIPT.to_string()
        }
    });

    let descriptors_size = capacity * DESCRIPTOR_SLOT_LEN as u64;
    let data_offset = HEADER_LEN as u64 + descriptors_size;

    let header = Header {
        launch_script,
        arch: ARCH_UNKNOWN.to_string(),
        id,
        created_at: now,
        modified_at: now,
        descriptors_total: capacity,
        descriptors_used: 0,
        descriptors_offset: HEADER_LEN as u64,
        descriptors_size,
        data_offset,
        data_size: 0,
    };

    storage.set_len(0)?;

    let mut image = FileImage {
        storage,
        header,
        slots: vec![None; capacity as usize],
    };

    image.write_header()?;
    // Zero-extend through the descriptor table up to the data area.
    image.storage.set_len(data_offset)?;

    for input in descriptors {
        let mut add_opts = AddOpts::new().with_time(now);
        if deterministic {
            add_opts = add_opts.deterministic();
        }
        image.add_object(input, add_opts)?;
    }

    image.storage.sync()?;

    debug!(id = %image.header.id, capacity, "created container");

    Ok(image)
}

/// Create a new container file at `path`, truncating any existing file.
pub fn create_container_at_path<P: AsRef<Path>>(
    path: P,
    opts: CreateOpts,
) -> Result<FileImage<std::fs::File>> {
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)?;

    create_container(file, opts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::DataType;
    use crate::header::MAGIC;
    use std::io::Cursor;

    fn test_id() -> Uuid {
        Uuid::parse_str("3fa802cc-358b-45e3-bcc0-69dc7a45f9f8").unwrap()
    }

    #[test]
    fn test_empty_deterministic_create() {
        let opts = CreateOpts::new()
            .deterministic()
            .with_id(test_id())
            .with_time(1593475316);

        let image = create_container(Cursor::new(Vec::new()), opts).unwrap();
        let bytes = image.unload().unwrap().into_inner();

        assert_eq!(bytes.len(), 128 + 48 * DESCRIPTOR_SLOT_LEN);
        assert_eq!(&bytes[32..42], &MAGIC);
        // Deterministic default launch script is empty.
        assert_eq!(&bytes[0..32], &[0u8; 32]);
    }

    #[test]
    fn test_create_is_deterministic() {
        let build = || {
            let opts = CreateOpts::new()
                .deterministic()
                .with_id(test_id())
                .with_time(1593475316)
                .with_descriptors(vec![DescriptorInput::new(
                    DataType::Generic,
                    Cursor::new(vec![0xfa, 0xce]),
                )]);
            create_container(Cursor::new(Vec::new()), opts)
                .unwrap()
                .unload()
                .unwrap()
                .into_inner()
        };

        assert_eq!(build(), build());
    }

    #[test]
    fn test_insufficient_capacity() {
        let opts = CreateOpts::new()
            .deterministic()
            .with_descriptor_capacity(0)
            .with_descriptors(vec![DescriptorInput::new(
                DataType::Generic,
                Cursor::new(vec![0xfa, 0xce]),
            )]);

        assert!(matches!(
            create_container(Cursor::new(Vec::new()), opts),
            Err(SifError::InsufficientCapacity)
        ));
    }

    #[test]
    fn test_launch_script_recorded() {
        let opts = CreateOpts::new()
            .deterministic()
            .with_launch_script("#!/usr/bin/env run-script\n")
            .unwrap();

        let image = create_container(Cursor::new(Vec::new()), opts).unwrap();
        assert_eq!(image.header().launch_script(), "#!/usr/bin/env run-script\n");
    }

    #[test]
    fn test_nondeterministic_defaults() {
        let image = create_container(Cursor::new(Vec::new()), CreateOpts::new()).unwrap();
        assert_eq!(image.header().launch_script(), DEFAULT_LAUNCH_SCRIPT);
        assert_ne!(image.header().id(), Uuid::nil());
        assert!(image.header().created_at() > 0);
    }
}
