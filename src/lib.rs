//! Singularity Image Format (SIF)
//!
//! A single-file container format aggregating a launch script, a fixed
//! 128-byte global header, a dense table of object descriptors, and a data
//! area of opaque objects (root filesystem partitions, definition files,
//! signatures, SBOMs, cryptographic messages, generic blobs).
//!
//! ## Layout
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ Global header (128 bytes)                   │
//! │  - launch script, magic "SIF_MAGIC"         │
//! │  - version, arch, UUID, timestamps          │
//! │  - descriptor table and data area geometry  │
//! ├─────────────────────────────────────────────┤
//! │ Descriptor table (capacity × 589 bytes)     │
//! │  - type, id, group, link                    │
//! │  - object offset and size                   │
//! │  - name and type-specific extra metadata    │
//! ├─────────────────────────────────────────────┤
//! │ Data area                                   │
//! │  - opaque objects, packed with alignment    │
//! │    padding                                  │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! All multi-byte fields are little-endian. The file length always equals
//! `data_offset + data_size`, and mutations write data bytes, then the
//! descriptor slot, then the header, so a crash never leaves a live
//! descriptor pointing at missing bytes.
//!
//! ## Example
//!
//! ```
//! use std::io::Cursor;
//! use sif::{create_container, AddOpts, CreateOpts, DataType, DescriptorInput};
//!
//! # fn main() -> sif::Result<()> {
//! let opts = CreateOpts::new().deterministic().with_time(1593475316);
//! let mut image = create_container(Cursor::new(Vec::new()), opts)?;
//!
//! let input = DescriptorInput::new(DataType::GenericJson, Cursor::new(b"{}".to_vec()))
//!     .with_name("data.json")?;
//! image.add_object(input, AddOpts::new().with_time(1593475316).deterministic())?;
//!
//! assert_eq!(image.header().descriptors_used(), 1);
//! # Ok(())
//! # }
//! ```
//!
//! ## Integrity
//!
//! The [`integrity`] module signs canonical digest lists over chosen
//! descriptors and verifies them later, with the OpenPGP clear-sign
//! operations supplied by the caller through a pair of traits.

pub mod arch;
pub mod create;
pub mod descriptor;
pub mod error;
pub mod header;
pub mod image;
pub mod input;
pub mod integrity;
pub mod mutate;
pub mod storage;

pub use create::{
    create_container, create_container_at_path, CreateOpts, DEFAULT_DESCRIPTOR_CAPACITY,
};
pub use descriptor::{
    CryptoFormat, CryptoMessageMetadata, DataType, Descriptor, FsType, HashType, Link,
    MessageKind, PartType, PartitionMetadata, SbomFormat, SignatureMetadata, DEFAULT_GROUP,
    DESCRIPTOR_LEN, DESCRIPTOR_SLOT_LEN,
};
pub use error::{Result, SifError};
pub use header::{Header, DEFAULT_LAUNCH_SCRIPT, HEADER_LEN, MAGIC, VERSION};
pub use image::{load_container, load_container_at_path, FileImage};
pub use input::DescriptorInput;
pub use mutate::{AddOpts, DeleteOpts, SetOpts};
pub use storage::Storage;
